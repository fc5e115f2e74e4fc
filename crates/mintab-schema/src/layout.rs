//! Field layout planner.
//!
//! Packs has-bits and field storage into a message footprint: has-bits for
//! required fields first, then optional fields; storage assigned greedily in
//! decreasing size-class order under natural alignment, with a stable
//! tie-break by field number. Runs once per target platform, since pointers
//! and string views have different footprints on 32-bit and 64-bit targets.

use crate::error::SchemaError;
use crate::field::{FieldDef, FieldType};
use crate::msg::MessageDef;

/// Target pointer width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    P32,
    P64,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::P32, Platform::P64];

    #[inline]
    pub fn ptr_size(self) -> u16 {
        match self {
            Platform::P32 => 4,
            Platform::P64 => 8,
        }
    }
}

/// A value computed for both target platforms.
///
/// The two variants agree on content and count but may differ on offsets and
/// pointer-sized footprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ByPlatform<T> {
    pub p32: T,
    pub p64: T,
}

impl<T: Copy> ByPlatform<T> {
    pub fn uniform(value: T) -> Self {
        Self {
            p32: value,
            p64: value,
        }
    }

    #[inline]
    pub fn get(self, platform: Platform) -> T {
        match platform {
            Platform::P32 => self.p32,
            Platform::P64 => self.p64,
        }
    }

    pub fn set(&mut self, platform: Platform, value: T) {
        match platform {
            Platform::P32 => self.p32 = value,
            Platform::P64 => self.p64 = value,
        }
    }
}

/// Storage footprint `(size, align)` of a field's slot on one platform.
///
/// Repeated (and map) fields store an array pointer; strings store a
/// pointer-aligned string view; sub-messages store a pointer.
pub fn storage(field: &FieldDef, platform: Platform) -> (u16, u16) {
    if field.is_repeated() {
        let ptr = platform.ptr_size();
        return (ptr, ptr);
    }
    scalar_storage(field.field_type(), platform)
}

fn scalar_storage(field_type: FieldType, platform: Platform) -> (u16, u16) {
    let ptr = platform.ptr_size();
    match field_type {
        FieldType::Bool => (1, 1),
        FieldType::Float
        | FieldType::Int32
        | FieldType::UInt32
        | FieldType::SInt32
        | FieldType::Fixed32
        | FieldType::SFixed32
        | FieldType::Enum => (4, 4),
        FieldType::Double
        | FieldType::Int64
        | FieldType::UInt64
        | FieldType::SInt64
        | FieldType::Fixed64
        | FieldType::SFixed64 => (8, 8),
        FieldType::String | FieldType::Bytes => (2 * ptr, ptr),
        FieldType::Message | FieldType::Group => (ptr, ptr),
    }
}

#[inline]
fn round_up(value: u32, align: u32) -> u32 {
    value.div_ceil(align) * align
}

/// What occupies one storage slot.
enum Slot {
    /// Index into the message's field vec.
    Field(usize),
    /// Discriminator slot for the oneof at this index.
    OneofCase(usize),
    /// Shared data slot for the oneof at this index.
    OneofData(usize),
}

struct Item {
    slot: Slot,
    size: u16,
    align: u16,
    /// `(field number, rank)`: the deterministic tie-break. Oneof slots key
    /// on their smallest member number, case before data.
    key: (u32, u8),
}

impl MessageDef {
    /// Assign has-bit indices and storage offsets to every field.
    ///
    /// Call once all fields have been added. Writes per-field has-bits and
    /// per-platform offsets, the message sizes, and the has-bit byte count
    /// back onto the def.
    pub fn layout(&mut self) -> Result<(), SchemaError> {
        if self.extension_end() < self.extension_start() {
            return Err(SchemaError::ExtensionRangeInverted {
                message: self.full_name().to_owned(),
                start: self.extension_start(),
                end: self.extension_end(),
            });
        }

        self.assign_hasbits()?;
        let p32 = self.assign_offsets(Platform::P32)?;
        let p64 = self.assign_offsets(Platform::P64)?;
        self.set_size(ByPlatform { p32, p64 });
        Ok(())
    }

    fn assign_hasbits(&mut self) -> Result<(), SchemaError> {
        let mut with_hasbit: Vec<(usize, u32, bool)> = self
            .fields()
            .enumerate()
            .filter(|(_, f)| f.needs_hasbit())
            .map(|(i, f)| (i, f.number(), f.is_required()))
            .collect();
        // Required fields take the lowest indices; numbers break ties.
        with_hasbit.sort_by_key(|&(_, number, required)| (!required, number));

        if with_hasbit.len() > 0x7fff {
            return Err(SchemaError::HasbitOverflow {
                message: self.full_name().to_owned(),
            });
        }

        let count = with_hasbit.len();
        let assignments: Vec<(usize, u16)> = with_hasbit
            .into_iter()
            .enumerate()
            .map(|(bit, (slot, _, _))| (slot, bit as u16))
            .collect();

        for f in self.fields_mut() {
            f.set_hasbit(None);
        }
        for (slot, bit) in assignments {
            self.fields_mut()[slot].set_hasbit(Some(bit));
        }
        self.set_hasbit_bytes(count.div_ceil(8) as u16);
        Ok(())
    }

    fn assign_offsets(&mut self, platform: Platform) -> Result<u16, SchemaError> {
        let mut items: Vec<Item> = Vec::new();

        for (i, f) in self.fields().enumerate() {
            if f.oneof().is_some() {
                continue;
            }
            let (size, align) = storage(f, platform);
            items.push(Item {
                slot: Slot::Field(i),
                size,
                align,
                key: (f.number(), 0),
            });
        }
        for (oi, oneof) in self.oneofs().iter().enumerate() {
            let Some(&min_number) = oneof.field_numbers().iter().min() else {
                continue;
            };
            items.push(Item {
                slot: Slot::OneofCase(oi),
                size: 4,
                align: 4,
                key: (min_number, 0),
            });
            let (mut size, mut align) = (0, 1);
            for &number in oneof.field_numbers() {
                let member = self
                    .field_by_number(number)
                    .expect("oneof member is indexed");
                let (s, a) = storage(member, platform);
                size = size.max(s);
                align = align.max(a);
            }
            items.push(Item {
                slot: Slot::OneofData(oi),
                size,
                align,
                key: (min_number, 1),
            });
        }

        items.sort_by(|a, b| b.size.cmp(&a.size).then(a.key.cmp(&b.key)));

        let mut cursor = u32::from(self.hasbit_bytes());
        let mut max_align = 1u32;
        let mut field_offsets: Vec<(usize, u16)> = Vec::new();
        let mut case_offsets: Vec<(usize, u16)> = Vec::new();

        for item in &items {
            let align = u32::from(item.align);
            max_align = max_align.max(align);
            cursor = round_up(cursor, align);
            if cursor + u32::from(item.size) > u32::from(u16::MAX) {
                return Err(SchemaError::OffsetOverflow {
                    message: self.full_name().to_owned(),
                });
            }
            let offset = cursor as u16;
            match item.slot {
                Slot::Field(i) => field_offsets.push((i, offset)),
                Slot::OneofCase(oi) => case_offsets.push((oi, offset)),
                Slot::OneofData(oi) => {
                    for &number in self.oneofs()[oi].field_numbers() {
                        let idx = self
                            .fields()
                            .position(|f| f.number() == number)
                            .expect("oneof member is indexed");
                        field_offsets.push((idx, offset));
                    }
                }
            }
            cursor += u32::from(item.size);
        }

        for (i, offset) in field_offsets {
            let f = &mut self.fields_mut()[i];
            let mut o = f.offset();
            o.set(platform, offset);
            f.set_offset(o);
        }
        for (oi, offset) in case_offsets {
            let oneof = &mut self.oneofs_mut()[oi];
            let mut o = oneof.case_offset();
            o.set(platform, offset);
            oneof.set_case_offset(o);
        }

        Ok(round_up(cursor, max_align) as u16)
    }
}
