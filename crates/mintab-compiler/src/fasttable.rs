//! Fast-decode dispatch table construction.
//!
//! The fast path indexes a sparse table by `(encoded_tag & 0xf8) >> 3` and
//! jumps straight to a specialized decoder. Slots are assigned in hotness
//! order (required fields first, then ascending number); a hotter field
//! keeps its slot against later contenders. Fields the fast path cannot
//! represent are skipped silently and take the generic dispatcher at
//! runtime.

use mintab_core::wire::{self, WireType};
use mintab_schema::{FieldDef, MessageDef};

use crate::minitable::{FieldKind, MiniTable, Presence};

/// Fallback dispatcher occupying unassigned slots.
pub const GENERIC_DISPATCH: &str = "_upb_FastDecoder_DecodeGeneric";

/// One slot of the fast-decode table: a specialized decoder symbol and its
/// packed 64-bit metadata word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastTableEntry {
    pub function: String,
    pub data: u64,
}

impl FastTableEntry {
    fn generic() -> Self {
        Self {
            function: GENERIC_DISPATCH.to_owned(),
            data: 0,
        }
    }

    pub fn is_generic(&self) -> bool {
        self.function == GENERIC_DISPATCH
    }
}

/// Mask written into the mini-table: `(len - 1) << 3`, or `0xff` when the
/// table is too small to be useful.
pub fn table_mask(len: usize) -> u8 {
    if len > 1 {
        debug_assert!(len.is_power_of_two());
        ((len - 1) << 3) as u8
    } else {
        0xff
    }
}

/// Wire type the field's values are encoded with on the wire.
fn field_wire_type(field: &FieldDef) -> WireType {
    if field.packed() {
        WireType::Delimited
    } else {
        field.field_type().wire_type()
    }
}

/// Fields in hotness order: required first, then by ascending number.
fn hotness_order(msg: &MessageDef) -> Vec<&FieldDef> {
    let mut fields: Vec<&FieldDef> = msg.fields().collect();
    fields.sort_by_key(|f| (!f.is_required(), f.number()));
    fields
}

/// Build the fast-decode table for a message. The result's length is the
/// smallest power of two covering every assigned slot (empty when nothing
/// is representable).
pub fn build_fast_table(msg: &MessageDef, mt: &MiniTable) -> Vec<FastTableEntry> {
    let mut table: Vec<FastTableEntry> = Vec::new();

    for field in hotness_order(msg) {
        let wire_type = field_wire_type(field);
        let Some(slot) = wire::fast_table_slot(field.number(), wire_type) else {
            continue;
        };
        let slot = slot as usize;
        let Some(entry) = fill_entry(msg, mt, field, wire_type) else {
            continue;
        };
        while slot >= table.len() {
            let size = (table.len() * 2).max(1);
            table.resize(size, FastTableEntry::generic());
        }
        if !table[slot].is_generic() {
            // A hotter field already owns this slot.
            continue;
        }
        table[slot] = entry;
    }

    table
}

/// Encode one field's dispatch entry, or `None` if the fast path cannot
/// represent it.
///
/// The data word layout:
///
/// ```text
///                  48                32                16                 0
/// |--------|--------|--------|--------|--------|--------|--------|--------|
/// |   offset (16)   |case offset (16) |presence| submsg |  exp. tag (16)  |
/// |--------|--------|--------|--------|--------|--------|--------|--------|
/// ```
///
/// `presence` is the has-bit index for singular fields (63 when absent) and
/// the field number for oneof members.
fn fill_entry(
    msg: &MessageDef,
    mt: &MiniTable,
    field: &FieldDef,
    wire_type: WireType,
) -> Option<FastTableEntry> {
    let mt_field = mt.field_by_number(field.number())?;

    let type_code = match mt_field.descriptor_type {
        8 => "b1",          // bool
        5 | 13 => "v4",     // int32, uint32
        3 | 4 => "v8",      // int64, uint64
        7 | 15 | 2 => "f4", // fixed32, sfixed32, float
        6 | 16 | 1 => "f8", // fixed64, sfixed64, double
        17 => "z4",         // sint32
        18 => "z8",         // sint64
        9 => "s",           // string
        12 => "b",          // bytes
        11 => "m",          // message
        // Closed enums would need value validation; groups and the rest
        // have no specialized decoder.
        _ => return None,
    };

    let cardinality = match mt_field.kind {
        FieldKind::Map => return None,
        FieldKind::Array => {
            if mt_field.packed {
                "p"
            } else {
                "r"
            }
        }
        FieldKind::Scalar => {
            if field.oneof().is_some() {
                "o"
            } else {
                "s"
            }
        }
    };

    let expected_tag = wire::encoded_tag(field.number(), wire_type);
    let mut data = (mt_field.offset.p64 as u64) << 48 | expected_tag;

    match mt_field.presence {
        Presence::Oneof(case_offset) => {
            if field.number() >= 256 {
                return None;
            }
            data |= (field.number() as u64) << 24;
            data |= (case_offset.p64 as u64) << 32;
        }
        Presence::Hasbit(index) => {
            if index >= 32 {
                return None;
            }
            data |= (index as u64) << 24;
        }
        Presence::None => {
            // High unused bit marks "no has-bit".
            data |= 63 << 24;
        }
    }

    let tag_len = wire::tag_len(expected_tag);
    let function = if field.field_type().is_sub_message() {
        let sub_index = mt_field.sub_index.unwrap_or(0);
        if sub_index > 255 {
            return None;
        }
        data |= (sub_index as u64) << 16;
        let bucket = sub_size_bucket(msg, field);
        format!("upb_p{cardinality}{type_code}_{tag_len}bt_max{bucket}b")
    } else {
        format!("upb_p{cardinality}{type_code}_{tag_len}bt")
    };

    Some(FastTableEntry { function, data })
}

/// Size ceiling for a sub-message, from `{64, 128, 192, 256, max}`.
///
/// The size of a sub-message is only guaranteed when it lives in the same
/// file; cross-file targets collapse to `max`.
fn sub_size_bucket(msg: &MessageDef, field: &FieldDef) -> String {
    let Some(target) = field.sub() else {
        return "max".to_owned();
    };
    if target.file() != msg.file() {
        return "max".to_owned();
    }
    let Some(sub_msg) = target.as_message() else {
        return "max".to_owned();
    };
    let size = u32::from(sub_msg.size().p64) + 8;
    for bucket in [64u32, 128, 192, 256] {
        if size <= bucket {
            return bucket.to_string();
        }
    }
    "max".to_owned()
}
