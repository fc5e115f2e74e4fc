//! Error types for the schema registry.

use crate::def::DefKind;

/// Error from a local validation on the mutable def graph.
///
/// The offending input is never inserted; the graph stays consistent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchemaError {
    /// A def or field was given an empty name where one is required.
    EmptyName,
    /// A field was added to a message without a number.
    MissingNumber { field: String },
    /// Field numbers must be positive.
    InvalidNumber { field: String, number: i64 },
    /// The message already has a field with this name.
    DuplicateFieldName { message: String, field: String },
    /// The message already has a field with this number.
    DuplicateFieldNumber { message: String, number: u32 },
    /// A field referenced a oneof index the message does not have.
    UnknownOneof { message: String, index: usize },
    /// The message already has a oneof with this name.
    DuplicateOneof { message: String, oneof: String },
    /// The enum already has a value with this name.
    DuplicateEnumName { enum_name: String, value: String },
    /// The enum already has a value with this number.
    DuplicateEnumNumber { enum_name: String, number: i32 },
    /// The transaction already holds a def with this name.
    DuplicateSymbol { name: String },
    /// Extension range end precedes its start.
    ExtensionRangeInverted { message: String, start: u32, end: u32 },
    /// Too many has-bit fields to index.
    HasbitOverflow { message: String },
    /// The message footprint no longer fits in a 16-bit offset.
    OffsetOverflow { message: String },
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "def name must not be empty"),
            Self::MissingNumber { field } => {
                write!(f, "field `{field}` has no number")
            }
            Self::InvalidNumber { field, number } => {
                write!(f, "field `{field}` has invalid number {number}")
            }
            Self::DuplicateFieldName { message, field } => {
                write!(f, "message `{message}` already has a field named `{field}`")
            }
            Self::DuplicateFieldNumber { message, number } => {
                write!(f, "message `{message}` already has a field with number {number}")
            }
            Self::UnknownOneof { message, index } => {
                write!(f, "message `{message}` has no oneof with index {index}")
            }
            Self::DuplicateOneof { message, oneof } => {
                write!(f, "message `{message}` already has a oneof named `{oneof}`")
            }
            Self::DuplicateEnumName { enum_name, value } => {
                write!(f, "enum `{enum_name}` already has a value named `{value}`")
            }
            Self::DuplicateEnumNumber { enum_name, number } => {
                write!(f, "enum `{enum_name}` already has a value with number {number}")
            }
            Self::DuplicateSymbol { name } => {
                write!(f, "symbol `{name}` is already staged")
            }
            Self::ExtensionRangeInverted { message, start, end } => {
                write!(
                    f,
                    "message `{message}` has inverted extension range [{start}, {end})"
                )
            }
            Self::HasbitOverflow { message } => {
                write!(f, "message `{message}` has too many has-bit fields")
            }
            Self::OffsetOverflow { message } => {
                write!(f, "message `{message}` layout exceeds the 16-bit offset space")
            }
        }
    }
}

impl std::error::Error for SchemaError {}

/// Why a single sub-reference failed to link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkFailure {
    /// No def with any candidate name exists.
    NotFound,
    /// The name resolved, but to the wrong kind of def.
    WrongKind { expected: DefKind, found: DefKind },
    /// The field needs a sub-def but no type name was ever set.
    MissingTypeName,
}

/// A single unresolved or mis-typed sub-reference, reported from commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkError {
    /// Fully-qualified `Message.field` the reference lives on.
    pub context: String,
    /// The type name as written on the field.
    pub symbol: String,
    pub failure: LinkFailure,
}

impl std::fmt::Display for LinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.failure {
            LinkFailure::NotFound => {
                write!(f, "{}: `{}` is not defined", self.context, self.symbol)
            }
            LinkFailure::WrongKind { expected, found } => write!(
                f,
                "{}: `{}` resolved to a {found:?} def, expected {expected:?}",
                self.context, self.symbol
            ),
            LinkFailure::MissingTypeName => {
                write!(f, "{}: sub-def field has no type name", self.context)
            }
        }
    }
}

/// Structured status from a failed commit.
///
/// Collects every linkage failure in the transaction rather than stopping at
/// the first. The symbol table is untouched and the transaction keeps its
/// defs for a retry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitError {
    pub errors: Vec<LinkError>,
}

impl std::fmt::Display for CommitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "commit failed with {} linkage error(s)", self.errors.len())?;
        for e in &self.errors {
            write!(f, "\n  {e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CommitError {}
