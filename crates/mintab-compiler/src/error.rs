//! Error type for generation.

use mintab_schema::{CommitError, SchemaError};

/// Error from building or emitting a file.
///
/// Every variant carries enough context for a driver to print a diagnostic
/// and exit non-zero.
#[derive(Debug)]
pub enum GenError {
    /// Unrecognized `key[=value]` generator parameter.
    UnknownParameter(String),
    /// Invalid descriptor input (duplicate names, bad numbers, layout).
    Schema(SchemaError),
    /// The file's defs failed to link.
    Commit(CommitError),
    /// An extension's extendee did not resolve.
    UnresolvedExtendee { extension: String, symbol: String },
    /// An extension's extendee resolved to a non-message.
    ExtendeeNotMessage { extension: String, symbol: String },
    /// An extension's value type did not resolve.
    UnresolvedExtensionType { extension: String, symbol: String },
    /// A def named by the descriptor is missing from the symbol table.
    MissingDef(String),
    /// Writing to an output sink failed.
    Io(std::io::Error),
}

impl std::fmt::Display for GenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownParameter(key) => write!(f, "unknown parameter: {key}"),
            Self::Schema(e) => write!(f, "invalid descriptor: {e}"),
            Self::Commit(e) => write!(f, "{e}"),
            Self::UnresolvedExtendee { extension, symbol } => {
                write!(f, "extension `{extension}`: extendee `{symbol}` is not defined")
            }
            Self::ExtendeeNotMessage { extension, symbol } => {
                write!(f, "extension `{extension}`: extendee `{symbol}` is not a message")
            }
            Self::UnresolvedExtensionType { extension, symbol } => {
                write!(f, "extension `{extension}`: type `{symbol}` is not defined")
            }
            Self::MissingDef(name) => {
                write!(f, "def `{name}` is not installed in the symbol table")
            }
            Self::Io(e) => write!(f, "failed to write output: {e}"),
        }
    }
}

impl std::error::Error for GenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Schema(e) => Some(e),
            Self::Commit(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SchemaError> for GenError {
    fn from(e: SchemaError) -> Self {
        Self::Schema(e)
    }
}

impl From<CommitError> for GenError {
    fn from(e: CommitError) -> Self {
        Self::Commit(e)
    }
}

impl From<std::io::Error> for GenError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
