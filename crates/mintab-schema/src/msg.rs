//! Message definitions.

use indexmap::IndexMap;
use mintab_core::IntTable;

use crate::def::DefHeader;
use crate::error::SchemaError;
use crate::field::FieldDef;
use crate::layout::ByPlatform;

/// A oneof declaration inside a message.
///
/// Members share a single data slot; a small integer discriminator records
/// which member (if any) is set. Both offsets are assigned by the layout
/// planner.
#[derive(Debug, Clone)]
pub struct OneofDef {
    name: String,
    /// Field numbers of the members, in declaration order.
    fields: Vec<u32>,
    case_offset: ByPlatform<u16>,
}

impl OneofDef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_numbers(&self) -> &[u32] {
        &self.fields
    }

    /// Offset of the discriminator slot.
    pub fn case_offset(&self) -> ByPlatform<u16> {
        self.case_offset
    }

    pub(crate) fn set_case_offset(&mut self, offset: ByPlatform<u16>) {
        self.case_offset = offset;
    }
}

/// A single `.proto` message type.
///
/// Fields are owned exclusively by the message and indexed two ways: by
/// number (dense fast path for small numbers, hashed beyond) and by name.
/// Both indices always describe the same field set.
#[derive(Debug)]
pub struct MessageDef {
    header: DefHeader,
    fields: Vec<FieldDef>,
    by_number: IntTable<usize>,
    by_name: IndexMap<String, usize>,
    oneofs: Vec<OneofDef>,

    size: ByPlatform<u16>,
    hasbit_bytes: u16,
    extension_start: u32,
    extension_end: u32,
    message_set_wire_format: bool,
    /// Synthesized map-entry messages get restricted accessor emission.
    map_entry: bool,
}

impl MessageDef {
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            header: DefHeader::new(full_name.into()),
            fields: Vec::new(),
            by_number: IntTable::new(),
            by_name: IndexMap::new(),
            oneofs: Vec::new(),
            size: ByPlatform::default(),
            hasbit_bytes: 0,
            extension_start: 0,
            extension_end: 0,
            message_set_wire_format: false,
            map_entry: false,
        }
    }

    pub fn full_name(&self) -> &str {
        &self.header.full_name
    }

    pub fn file(&self) -> &str {
        &self.header.file
    }

    pub fn set_file(&mut self, file: impl Into<String>) {
        self.header.file = file.into();
    }

    /// Declare a oneof; returns its index for `FieldDef::set_oneof`.
    pub fn add_oneof(&mut self, name: impl Into<String>) -> Result<usize, SchemaError> {
        let name = name.into();
        if self.oneofs.iter().any(|o| o.name == name) {
            return Err(SchemaError::DuplicateOneof {
                message: self.full_name().to_owned(),
                oneof: name,
            });
        }
        self.oneofs.push(OneofDef {
            name,
            fields: Vec::new(),
            case_offset: ByPlatform::default(),
        });
        Ok(self.oneofs.len() - 1)
    }

    /// Add a field, transferring ownership to the message.
    ///
    /// Atomic: on failure the field is dropped and the message (both
    /// indices, every oneof) is unchanged.
    pub fn add_field(&mut self, field: FieldDef) -> Result<(), SchemaError> {
        if field.name().is_empty() {
            return Err(SchemaError::EmptyName);
        }
        if field.number() == 0 {
            return Err(SchemaError::MissingNumber {
                field: field.name().to_owned(),
            });
        }
        if self.by_name.contains_key(field.name()) {
            return Err(SchemaError::DuplicateFieldName {
                message: self.full_name().to_owned(),
                field: field.name().to_owned(),
            });
        }
        if self.by_number.contains_key(field.number()) {
            return Err(SchemaError::DuplicateFieldNumber {
                message: self.full_name().to_owned(),
                number: field.number(),
            });
        }
        if let Some(idx) = field.oneof() {
            if idx >= self.oneofs.len() {
                return Err(SchemaError::UnknownOneof {
                    message: self.full_name().to_owned(),
                    index: idx,
                });
            }
        }

        let slot = self.fields.len();
        self.by_number.insert(field.number(), slot);
        self.by_name.insert(field.name().to_owned(), slot);
        if let Some(idx) = field.oneof() {
            self.oneofs[idx].fields.push(field.number());
        }
        self.fields.push(field);
        Ok(())
    }

    pub fn field_by_number(&self, number: u32) -> Option<&FieldDef> {
        self.by_number.get(number).map(|&i| &self.fields[i])
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldDef> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// Iterate fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter()
    }

    pub(crate) fn fields_mut(&mut self) -> &mut [FieldDef] {
        &mut self.fields
    }

    pub fn oneofs(&self) -> &[OneofDef] {
        &self.oneofs
    }

    pub(crate) fn oneofs_mut(&mut self) -> &mut [OneofDef] {
        &mut self.oneofs
    }

    pub fn size(&self) -> ByPlatform<u16> {
        self.size
    }

    pub fn hasbit_bytes(&self) -> u16 {
        self.hasbit_bytes
    }

    /// Extension number range `[start, end)`; `end` is exclusive.
    pub fn extension_start(&self) -> u32 {
        self.extension_start
    }

    pub fn extension_end(&self) -> u32 {
        self.extension_end
    }

    pub fn is_extendable(&self) -> bool {
        self.extension_end > self.extension_start
    }

    pub fn message_set_wire_format(&self) -> bool {
        self.message_set_wire_format
    }

    pub fn is_map_entry(&self) -> bool {
        self.map_entry
    }

    pub fn set_size(&mut self, size: ByPlatform<u16>) {
        self.size = size;
    }

    pub fn set_hasbit_bytes(&mut self, bytes: u16) {
        self.hasbit_bytes = bytes;
    }

    pub fn set_extension_start(&mut self, start: u32) {
        self.extension_start = start;
    }

    pub fn set_extension_end(&mut self, end: u32) {
        self.extension_end = end;
    }

    pub fn set_message_set_wire_format(&mut self, on: bool) {
        self.message_set_wire_format = on;
    }

    pub fn set_map_entry(&mut self, on: bool) {
        self.map_entry = on;
    }

    /// Deep copy with every linked sub-reference demoted to the target's
    /// fully-qualified name. The copy is mutable and relocatable across
    /// symbol tables; severing the links is what breaks reference cycles.
    pub fn dup(&self) -> Self {
        Self {
            header: self.header.dup(),
            fields: self.fields.iter().map(FieldDef::dup).collect(),
            by_number: self.by_number.clone(),
            by_name: self.by_name.clone(),
            oneofs: self.oneofs.clone(),
            size: self.size,
            hasbit_bytes: self.hasbit_bytes,
            extension_start: self.extension_start,
            extension_end: self.extension_end,
            message_set_wire_format: self.message_set_wire_format,
            map_entry: self.map_entry,
        }
    }

    pub(crate) fn header(&self) -> &DefHeader {
        &self.header
    }
}
