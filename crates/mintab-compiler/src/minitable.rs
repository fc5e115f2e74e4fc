//! Mini-table construction.
//!
//! A mini-table is the compact per-message descriptor the runtime's
//! decode/encode paths consume: a field array in ascending-number order, a
//! sub-reference array for message/enum targets, and the small header
//! scalars (`size`, `dense_below`, extension mode, fast-table mask,
//! required count). Offsets and representations are computed for both
//! 32-bit and 64-bit targets.

use mintab_schema::{ByPlatform, Def, FieldDef, FieldType, MessageDef, Platform};

/// Extension mode of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtMode {
    NonExtendable,
    Extendable,
    IsMessageSet,
}

impl ExtMode {
    /// Symbolic C initializer.
    pub fn symbol(self) -> &'static str {
        match self {
            ExtMode::NonExtendable => "kUpb_ExtMode_NonExtendable",
            ExtMode::Extendable => "kUpb_ExtMode_Extendable",
            ExtMode::IsMessageSet => "kUpb_ExtMode_IsMessageSet",
        }
    }
}

/// Presence encoding of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// No presence tracking.
    None,
    /// Has-bit index as assigned by the layout planner (0-based).
    Hasbit(u16),
    /// Oneof member; carries the discriminator slot offset.
    Oneof(ByPlatform<u16>),
}

impl Presence {
    /// The emitted `int16_t` encoding: has-bit indices shift up by one so
    /// zero keeps meaning "no presence", oneof members store the bitwise
    /// complement of the case offset (always negative).
    pub fn encoded(self, platform: Platform) -> i16 {
        match self {
            Presence::None => 0,
            Presence::Hasbit(index) => (index + 1) as i16,
            Presence::Oneof(offset) => !(offset.get(platform) as i16),
        }
    }
}

/// Field kind, the low bits of the mode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FieldKind {
    Map = 0,
    Array = 1,
    Scalar = 2,
}

impl FieldKind {
    pub fn symbol(self) -> &'static str {
        match self {
            FieldKind::Map => "kUpb_FieldMode_Map",
            FieldKind::Array => "kUpb_FieldMode_Array",
            FieldKind::Scalar => "kUpb_FieldMode_Scalar",
        }
    }
}

/// Storage representation class, the high bits of the mode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FieldRep {
    Byte1 = 0,
    Byte4 = 1,
    StringView = 2,
    Byte8 = 3,
}

impl FieldRep {
    pub fn symbol(self) -> &'static str {
        match self {
            FieldRep::Byte1 => "kUpb_FieldRep_1Byte",
            FieldRep::Byte4 => "kUpb_FieldRep_4Byte",
            FieldRep::StringView => "kUpb_FieldRep_StringView",
            FieldRep::Byte8 => "kUpb_FieldRep_8Byte",
        }
    }
}

/// Bit layout of the mode byte.
pub const FIELD_REP_SHIFT: u8 = 6;
pub const LABEL_FLAG_PACKED: u8 = 4;
pub const LABEL_FLAG_EXTENSION: u8 = 8;
pub const LABEL_FLAG_ALTERNATE: u8 = 16;

/// A sub-reference to another def's mini-table, by fully-qualified name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sub {
    Message(String),
    Enum(String),
}

/// One entry of a mini-table's field array.
#[derive(Debug, Clone)]
pub struct MiniTableField {
    pub number: u32,
    pub offset: ByPlatform<u16>,
    pub presence: Presence,
    /// Index into the message's sub array, if the field has a target.
    pub sub_index: Option<u16>,
    /// Wire-type descriptor. Open enums are rewritten to `int32` here (with
    /// the Alternate flag) since their value sets cannot be validated.
    pub descriptor_type: u8,
    pub kind: FieldKind,
    pub packed: bool,
    pub extension: bool,
    pub alternate: bool,
    pub rep: ByPlatform<FieldRep>,
}

impl MiniTableField {
    /// Pack kind, flags and representation into the mode byte.
    pub fn mode(&self, platform: Platform) -> u8 {
        let mut mode = self.kind as u8;
        if self.packed {
            mode |= LABEL_FLAG_PACKED;
        }
        if self.extension {
            mode |= LABEL_FLAG_EXTENSION;
        }
        if self.alternate {
            mode |= LABEL_FLAG_ALTERNATE;
        }
        mode | ((self.rep.get(platform) as u8) << FIELD_REP_SHIFT)
    }
}

/// The compact per-message descriptor.
#[derive(Debug, Clone)]
pub struct MiniTable {
    pub full_name: String,
    /// Fields in ascending number order.
    pub fields: Vec<MiniTableField>,
    /// One entry per field with a sub-message or closed-enum target, in
    /// field order.
    pub subs: Vec<Sub>,
    pub size: ByPlatform<u16>,
    pub ext_mode: ExtMode,
    /// Length of the longest field prefix numbered exactly `1..N`.
    pub dense_below: u8,
    /// `(fast_table_len - 1) << 3`, or `0xff` when there is no fast table.
    pub table_mask: u8,
    pub required_count: u16,
}

impl MiniTable {
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field_by_number(&self, number: u32) -> Option<&MiniTableField> {
        self.fields
            .binary_search_by_key(&number, |f| f.number)
            .ok()
            .map(|i| &self.fields[i])
    }
}

/// Representation class of a field's storage slot.
pub fn field_rep(field: &FieldDef, platform: Platform) -> FieldRep {
    rep_for(field.field_type(), field.is_repeated(), platform)
}

/// Representation class from raw type and cardinality (for extensions,
/// which have no `FieldDef`).
pub fn rep_for(field_type: FieldType, repeated: bool, platform: Platform) -> FieldRep {
    let ptr_rep = match platform {
        Platform::P32 => FieldRep::Byte4,
        Platform::P64 => FieldRep::Byte8,
    };
    if repeated {
        return ptr_rep;
    }
    match field_type {
        FieldType::Bool => FieldRep::Byte1,
        FieldType::String | FieldType::Bytes => FieldRep::StringView,
        FieldType::Double
        | FieldType::Int64
        | FieldType::UInt64
        | FieldType::SInt64
        | FieldType::Fixed64
        | FieldType::SFixed64 => FieldRep::Byte8,
        FieldType::Message | FieldType::Group => ptr_rep,
        _ => FieldRep::Byte4,
    }
}

fn is_map_field(field: &FieldDef) -> bool {
    field.is_repeated()
        && field
            .sub()
            .and_then(|d| d.as_message().map(MessageDef::is_map_entry))
            .unwrap_or(false)
}

/// Build the mini-table for a laid-out message.
///
/// `closed_enum` decides whether an enum target has a closed value set
/// (proto2); open enums decay to plain `int32` fields with the Alternate
/// flag and get no sub entry.
pub fn build_minitable(msg: &MessageDef, closed_enum: impl Fn(&Def) -> bool) -> MiniTable {
    let mut numbers: Vec<u32> = msg.fields().map(FieldDef::number).collect();
    numbers.sort_unstable();

    let mut fields = Vec::with_capacity(numbers.len());
    let mut subs = Vec::new();

    for &number in &numbers {
        let f = msg.field_by_number(number).expect("field is indexed");

        let mut descriptor_type = f.field_type().descriptor_type();
        let mut alternate = false;
        let mut sub_index = None;

        if f.field_type().is_sub_message() {
            let target = match f.sub() {
                Some(def) => def.full_name().to_owned(),
                None => f.type_name().unwrap_or_default().to_owned(),
            };
            sub_index = Some(subs.len() as u16);
            subs.push(Sub::Message(target));
        } else if f.field_type() == FieldType::Enum {
            match f.sub() {
                Some(def) if closed_enum(&def) => {
                    sub_index = Some(subs.len() as u16);
                    subs.push(Sub::Enum(def.full_name().to_owned()));
                }
                _ => {
                    descriptor_type = FieldType::Int32.descriptor_type();
                    alternate = true;
                }
            }
        }

        let kind = if is_map_field(f) {
            FieldKind::Map
        } else if f.is_repeated() {
            FieldKind::Array
        } else {
            FieldKind::Scalar
        };

        let presence = if let Some(oneof) = f.oneof() {
            Presence::Oneof(msg.oneofs()[oneof].case_offset())
        } else if let Some(index) = f.hasbit() {
            Presence::Hasbit(index)
        } else {
            Presence::None
        };

        fields.push(MiniTableField {
            number,
            offset: f.offset(),
            presence,
            sub_index,
            descriptor_type,
            kind,
            packed: f.packed(),
            extension: false,
            alternate,
            rep: ByPlatform {
                p32: field_rep(f, Platform::P32),
                p64: field_rep(f, Platform::P64),
            },
        });
    }

    let mut dense_below = 0u8;
    for (i, field) in fields.iter().enumerate() {
        if field.number as usize == i + 1 && dense_below < u8::MAX {
            dense_below = (i + 1) as u8;
        } else {
            break;
        }
    }

    let required_count = msg.fields().filter(|f| f.is_required()).count() as u16;

    let ext_mode = if msg.is_extendable() {
        if msg.message_set_wire_format() {
            ExtMode::IsMessageSet
        } else {
            ExtMode::Extendable
        }
    } else {
        ExtMode::NonExtendable
    };

    MiniTable {
        full_name: msg.full_name().to_owned(),
        fields,
        subs,
        size: msg.size(),
        ext_mode,
        dense_below,
        table_mask: 0xff,
        required_count,
    }
}

/// Mini-table for a closed (proto2) enum: a presence bitmask over the value
/// window `[0, 64)` plus an explicit sorted list for everything outside it.
#[derive(Debug, Clone)]
pub struct EnumMiniTable {
    pub full_name: String,
    pub mask_limit: u32,
    mask: u64,
    /// Values outside the mask window, sorted.
    pub values: Vec<i32>,
}

impl EnumMiniTable {
    pub fn value_count(&self) -> u32 {
        self.values.len() as u32
    }

    /// Raw table data: the mask words followed by the explicit values.
    pub fn data_words(&self) -> Vec<u32> {
        let mut words = vec![self.mask as u32, (self.mask >> 32) as u32];
        words.extend(self.values.iter().map(|&v| v as u32));
        words
    }
}

/// Build the validation table for a closed enum.
pub fn build_enum_table(full_name: &str, values: impl Iterator<Item = i32>) -> EnumMiniTable {
    const MASK_LIMIT: u32 = 64;
    let mut mask = 0u64;
    let mut rest = Vec::new();
    for value in values {
        if (0..MASK_LIMIT as i32).contains(&value) {
            mask |= 1 << value;
        } else {
            rest.push(value);
        }
    }
    rest.sort_unstable();
    EnumMiniTable {
        full_name: full_name.to_owned(),
        mask_limit: MASK_LIMIT,
        mask,
        values: rest,
    }
}
