//! Enum definitions.

use indexmap::IndexMap;
use mintab_core::IntTable;

use crate::def::DefHeader;
use crate::error::SchemaError;

/// A single `.proto` enum type with bidirectional name/number maps.
#[derive(Debug)]
pub struct EnumDef {
    header: DefHeader,
    /// Name to number, in declaration order.
    ntoi: IndexMap<String, i32>,
    /// Number to name. Keys are the `i32` bit pattern so negative values
    /// index cleanly.
    iton: IntTable<String>,
    default: i32,
}

impl EnumDef {
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            header: DefHeader::new(full_name.into()),
            ntoi: IndexMap::new(),
            iton: IntTable::new(),
            default: 0,
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

    pub fn default_value(&self) -> i32 {
        self.default
    }

    pub fn set_default(&mut self, value: i32) {
        self.default = value;
    }

    /// Add a value. Fails if either the name or the number already exists;
    /// on failure nothing is inserted.
    pub fn add_value(&mut self, name: impl Into<String>, number: i32) -> Result<(), SchemaError> {
        let name = name.into();
        if name.is_empty() {
            return Err(SchemaError::EmptyName);
        }
        if self.ntoi.contains_key(&name) {
            return Err(SchemaError::DuplicateEnumName {
                enum_name: self.full_name().to_owned(),
                value: name,
            });
        }
        if self.iton.contains_key(number as u32) {
            return Err(SchemaError::DuplicateEnumNumber {
                enum_name: self.full_name().to_owned(),
                number,
            });
        }
        self.iton.insert(number as u32, name.clone());
        self.ntoi.insert(name, number);
        Ok(())
    }

    pub fn number_by_name(&self, name: &str) -> Option<i32> {
        self.ntoi.get(name).copied()
    }

    pub fn name_by_number(&self, number: i32) -> Option<&str> {
        self.iton.get(number as u32).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ntoi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ntoi.is_empty()
    }

    /// Iterate `(name, number)` pairs in declaration order.
    pub fn values(&self) -> impl Iterator<Item = (&str, i32)> {
        self.ntoi.iter().map(|(n, &v)| (n.as_str(), v))
    }

    /// Deep copy; enums have no cross-def links to sever.
    pub fn dup(&self) -> Self {
        Self {
            header: self.header.dup(),
            ntoi: self.ntoi.clone(),
            iton: self.iton.clone(),
            default: self.default,
        }
    }

    pub(crate) fn header(&self) -> &DefHeader {
        &self.header
    }
}
