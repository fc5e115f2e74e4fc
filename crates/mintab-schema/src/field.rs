//! Field definitions.
//!
//! A [`FieldDef`] cannot stand on its own; once added to a [`MessageDef`]
//! it is owned by that message. Name and number must be set before the add
//! (the two field indices are keyed on them); everything else may be set any
//! time before the containing def is installed in a symbol table.
//!
//! [`MessageDef`]: crate::MessageDef

use std::any::Any;
use std::sync::{Arc, OnceLock, Weak};

use mintab_core::wire::WireType;

use crate::def::{Def, DefKind};
use crate::layout::ByPlatform;

/// Proto field type codes, matching descriptor.proto's `Type` numbering.
/// Deserializes from descriptor.proto's lowercase spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum FieldType {
    Double = 1,
    Float = 2,
    Int64 = 3,
    UInt64 = 4,
    Int32 = 5,
    Fixed64 = 6,
    Fixed32 = 7,
    Bool = 8,
    String = 9,
    Group = 10,
    Message = 11,
    Bytes = 12,
    UInt32 = 13,
    Enum = 14,
    SFixed32 = 15,
    SFixed64 = 16,
    SInt32 = 17,
    SInt64 = 18,
}

impl FieldType {
    /// Raw descriptor type code.
    #[inline]
    pub fn descriptor_type(self) -> u8 {
        self as u8
    }

    /// Whether values of this type are sub-messages.
    #[inline]
    pub fn is_sub_message(self) -> bool {
        matches!(self, Self::Group | Self::Message)
    }

    /// Whether values of this type are length-delimited byte payloads.
    #[inline]
    pub fn is_string_kind(self) -> bool {
        matches!(self, Self::String | Self::Bytes)
    }

    /// Whether a field of this type carries a reference to another def.
    #[inline]
    pub fn has_sub_def(self) -> bool {
        self.is_sub_message() || self == Self::Enum
    }

    /// The def kind a sub-reference of this type must resolve to.
    pub fn expected_sub_kind(self) -> Option<DefKind> {
        if self.is_sub_message() {
            Some(DefKind::Message)
        } else if self == Self::Enum {
            Some(DefKind::Enum)
        } else {
            None
        }
    }

    /// Wire type for a single (non-packed) value.
    pub fn wire_type(self) -> WireType {
        match self {
            Self::Int32
            | Self::Int64
            | Self::UInt32
            | Self::UInt64
            | Self::SInt32
            | Self::SInt64
            | Self::Bool
            | Self::Enum => WireType::Varint,
            Self::Fixed64 | Self::SFixed64 | Self::Double => WireType::Fixed64,
            Self::Fixed32 | Self::SFixed32 | Self::Float => WireType::Fixed32,
            Self::String | Self::Bytes | Self::Message => WireType::Delimited,
            Self::Group => WireType::StartGroup,
        }
    }

    /// Whether repeated values of this type may use the packed encoding.
    pub fn is_packable(self) -> bool {
        !matches!(self.wire_type(), WireType::Delimited | WireType::StartGroup)
    }
}

/// Field cardinality, matching descriptor.proto's `Label`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    #[default]
    Optional,
    Required,
    Repeated,
}

/// Default value for a singular scalar or string field.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultValue {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    /// Enum defaults are carried by number so emitters need not pull in the
    /// enum's definitions.
    Enum(i32),
}

/// Opaque per-field user payload.
///
/// Runtimes attach accessor tables or closure state here; the registry
/// stores and returns it untouched.
pub type UserValue = Arc<dyn Any + Send + Sync>;

/// A single field of a message.
pub struct FieldDef {
    name: String,
    number: u32,
    field_type: FieldType,
    label: Label,
    default: Option<DefaultValue>,
    fval: Option<UserValue>,
    accessor: Option<UserValue>,
    /// Target type name for sub-message/enum fields, as written in the
    /// descriptor. Retained after linking so `dup` can sever back to it.
    type_name: Option<String>,
    /// Resolved sub-def, patched in at commit. Non-owning: the symbol table
    /// keeps the target alive.
    sub: OnceLock<Weak<Def>>,
    /// Index into the containing message's oneof list.
    oneof: Option<usize>,
    packed: bool,
    /// Whether a singular field tracks explicit presence. Proto3 implicit
    /// fields clear this; sub-messages use pointer-null presence regardless.
    has_presence: bool,

    // Assigned by the layout planner.
    hasbit: Option<u16>,
    offset: ByPlatform<u16>,
}

impl FieldDef {
    pub fn new() -> Self {
        Self {
            name: String::new(),
            number: 0,
            field_type: FieldType::Int32,
            label: Label::Optional,
            default: None,
            fval: None,
            accessor: None,
            type_name: None,
            sub: OnceLock::new(),
            oneof: None,
            packed: false,
            has_presence: true,
            hasbit: None,
            offset: ByPlatform::default(),
        }
    }

    // Name and number key the message's two field indices, so they are only
    // settable while the field is still free-standing. `MessageDef::add_field`
    // takes the field by value, which retires these for good.

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_number(&mut self, number: u32) {
        self.number = number;
    }

    pub fn set_type(&mut self, field_type: FieldType) {
        self.field_type = field_type;
    }

    pub fn set_label(&mut self, label: Label) {
        self.label = label;
    }

    pub fn set_default(&mut self, default: DefaultValue) {
        self.default = Some(default);
    }

    pub fn set_fval(&mut self, fval: UserValue) {
        self.fval = Some(fval);
    }

    pub fn set_accessor(&mut self, accessor: UserValue) {
        self.accessor = Some(accessor);
    }

    /// Name of the message or enum this field refers to. Must be resolvable
    /// when the transaction holding the containing message is committed.
    pub fn set_type_name(&mut self, name: impl Into<String>) {
        self.type_name = Some(name.into());
    }

    pub fn set_oneof(&mut self, index: usize) {
        self.oneof = Some(index);
    }

    pub fn set_packed(&mut self, packed: bool) {
        self.packed = packed;
    }

    pub fn set_has_presence(&mut self, has_presence: bool) {
        self.has_presence = has_presence;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn label(&self) -> Label {
        self.label
    }

    pub fn is_repeated(&self) -> bool {
        self.label == Label::Repeated
    }

    pub fn is_required(&self) -> bool {
        self.label == Label::Required
    }

    pub fn default(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    pub fn fval(&self) -> Option<&UserValue> {
        self.fval.as_ref()
    }

    pub fn accessor(&self) -> Option<&UserValue> {
        self.accessor.as_ref()
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn oneof(&self) -> Option<usize> {
        self.oneof
    }

    pub fn packed(&self) -> bool {
        self.packed
    }

    pub fn has_presence(&self) -> bool {
        self.has_presence
    }

    /// The resolved sub-def. `None` until the containing message has been
    /// committed to a symbol table (or for fields without a sub-def).
    pub fn sub(&self) -> Option<Arc<Def>> {
        self.sub.get().and_then(Weak::upgrade)
    }

    /// Kind of the sub-reference as currently known: `Unresolved` before
    /// linkage, the target's kind after.
    pub fn sub_kind(&self) -> Option<DefKind> {
        if !self.field_type.has_sub_def() {
            return None;
        }
        match self.sub() {
            Some(def) => Some(def.kind()),
            None => Some(DefKind::Unresolved),
        }
    }

    /// Whether this field gets a has-bit from the layout planner.
    ///
    /// Repeated fields, oneof members, sub-messages (pointer-null presence),
    /// and proto3 implicit fields do not.
    pub fn needs_hasbit(&self) -> bool {
        !self.is_repeated()
            && self.oneof.is_none()
            && !self.field_type.is_sub_message()
            && self.has_presence
    }

    /// Has-bit index assigned by the layout planner.
    pub fn hasbit(&self) -> Option<u16> {
        self.hasbit
    }

    /// Storage offsets assigned by the layout planner.
    pub fn offset(&self) -> ByPlatform<u16> {
        self.offset
    }

    pub(crate) fn set_hasbit(&mut self, hasbit: Option<u16>) {
        self.hasbit = hasbit;
    }

    pub(crate) fn set_offset(&mut self, offset: ByPlatform<u16>) {
        self.offset = offset;
    }

    pub(crate) fn link(&self, target: Weak<Def>) {
        // A field is linked exactly once, at commit.
        let _ = self.sub.set(target);
    }

    /// Deep copy with the sub-link severed back to the target's
    /// fully-qualified name.
    pub fn dup(&self) -> Self {
        let type_name = match self.sub() {
            Some(def) => Some(def.full_name().to_owned()),
            None => self.type_name.clone(),
        };
        Self {
            name: self.name.clone(),
            number: self.number,
            field_type: self.field_type,
            label: self.label,
            default: self.default.clone(),
            fval: self.fval.clone(),
            accessor: self.accessor.clone(),
            type_name,
            sub: OnceLock::new(),
            oneof: self.oneof,
            packed: self.packed,
            has_presence: self.has_presence,
            hasbit: self.hasbit,
            offset: self.offset,
        }
    }
}

impl Default for FieldDef {
    fn default() -> Self {
        Self::new()
    }
}

// The user payloads are opaque, so Debug is written by hand.
impl std::fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("number", &self.number)
            .field("field_type", &self.field_type)
            .field("label", &self.label)
            .field("type_name", &self.type_name)
            .field("oneof", &self.oneof)
            .field("packed", &self.packed)
            .field("has_presence", &self.has_presence)
            .field("hasbit", &self.hasbit)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_predicates() {
        assert!(FieldType::Message.is_sub_message());
        assert!(FieldType::Group.is_sub_message());
        assert!(!FieldType::Enum.is_sub_message());
        assert!(FieldType::Enum.has_sub_def());
        assert!(FieldType::String.is_string_kind());
        assert!(!FieldType::Int32.has_sub_def());
    }

    #[test]
    fn wire_types() {
        assert_eq!(FieldType::Int32.wire_type(), WireType::Varint);
        assert_eq!(FieldType::Double.wire_type(), WireType::Fixed64);
        assert_eq!(FieldType::Float.wire_type(), WireType::Fixed32);
        assert_eq!(FieldType::String.wire_type(), WireType::Delimited);
        assert!(!FieldType::String.is_packable());
        assert!(FieldType::SInt64.is_packable());
    }

    #[test]
    fn hasbit_eligibility() {
        let mut f = FieldDef::new();
        f.set_name("a");
        f.set_number(1);
        assert!(f.needs_hasbit());

        f.set_label(Label::Repeated);
        assert!(!f.needs_hasbit());

        f.set_label(Label::Optional);
        f.set_type(FieldType::Message);
        assert!(!f.needs_hasbit());

        f.set_type(FieldType::Int32);
        f.set_oneof(0);
        assert!(!f.needs_hasbit());
    }

    #[test]
    fn dup_severs_nothing_when_unlinked() {
        let mut f = FieldDef::new();
        f.set_name("sub");
        f.set_number(4);
        f.set_type(FieldType::Message);
        f.set_type_name(".pkg.Other");

        let d = f.dup();
        assert_eq!(d.type_name(), Some(".pkg.Other"));
        assert_eq!(d.sub_kind(), Some(DefKind::Unresolved));
    }
}
