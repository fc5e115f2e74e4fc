//! Parsed descriptor input model.
//!
//! The compiler does not parse `.proto` text; a driver hands it a parsed
//! file descriptor. The structs here mirror descriptor.proto closely enough
//! that a driver can serialize one to JSON and feed it in.

use serde::Deserialize;

use mintab_schema::{DefaultValue, FieldType, Label};

/// Proto syntax revision of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Syntax {
    #[default]
    Proto2,
    Proto3,
}

/// A parsed `.proto` file.
#[derive(Debug, Clone, Deserialize)]
pub struct FileDescriptor {
    /// File name as imported, e.g. `pkg/api.proto`.
    pub name: String,
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub syntax: Syntax,
    /// Imported file names.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Indices into `dependencies` that are re-exported (`import public`).
    #[serde(default)]
    pub public_dependencies: Vec<usize>,
    #[serde(default)]
    pub messages: Vec<MessageDescriptor>,
    #[serde(default)]
    pub enums: Vec<EnumDescriptor>,
    #[serde(default)]
    pub extensions: Vec<FieldDescriptor>,
}

impl FileDescriptor {
    pub fn public_dependency_names(&self) -> impl Iterator<Item = &str> {
        self.public_dependencies
            .iter()
            .filter_map(|&i| self.dependencies.get(i))
            .map(String::as_str)
    }
}

/// A message type, possibly with nested types.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageDescriptor {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    /// Oneof declaration names; fields join via `oneof_index`.
    #[serde(default)]
    pub oneofs: Vec<String>,
    #[serde(default)]
    pub extension_ranges: Vec<TagRange>,
    #[serde(default)]
    pub nested_messages: Vec<MessageDescriptor>,
    #[serde(default)]
    pub nested_enums: Vec<EnumDescriptor>,
    #[serde(default)]
    pub nested_extensions: Vec<FieldDescriptor>,
    #[serde(default)]
    pub message_set_wire_format: bool,
    /// Synthesized map-entry messages.
    #[serde(default)]
    pub map_entry: bool,
}

/// A half-open extension number range `[start, end)`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TagRange {
    pub start: u32,
    pub end: u32,
}

/// A message field or extension.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub number: u32,
    #[serde(default)]
    pub label: Label,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Target type for message/group/enum fields. Resolved against the
    /// enclosing scope; a leading dot makes it fully qualified.
    #[serde(default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub default: Option<DefaultValue>,
    /// Index into the containing message's `oneofs`.
    #[serde(default)]
    pub oneof_index: Option<usize>,
    /// Explicit `[packed = ...]` option; the syntax default applies when
    /// absent.
    #[serde(default)]
    pub packed: Option<bool>,
    /// Proto3 fields marked with the `optional` keyword track presence.
    #[serde(default)]
    pub proto3_optional: bool,
    /// For extensions: the extended message's type name.
    #[serde(default)]
    pub extendee: Option<String>,
}

impl FieldDescriptor {
    /// Whether repeated values use the packed encoding under `syntax`.
    pub fn is_packed(&self, syntax: Syntax) -> bool {
        if self.label != Label::Repeated || !self.field_type.is_packable() {
            return false;
        }
        self.packed.unwrap_or(syntax == Syntax::Proto3)
    }

    /// Whether a singular field tracks explicit presence under `syntax`.
    pub fn has_presence(&self, syntax: Syntax) -> bool {
        match syntax {
            Syntax::Proto2 => true,
            Syntax::Proto3 => self.proto3_optional || self.oneof_index.is_some(),
        }
    }
}

/// An enum type.
#[derive(Debug, Clone, Deserialize)]
pub struct EnumDescriptor {
    pub name: String,
    #[serde(default)]
    pub values: Vec<EnumValueDescriptor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnumValueDescriptor {
    pub name: String,
    pub number: i32,
}
