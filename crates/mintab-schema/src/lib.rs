//! Protobuf schema registry.
//!
//! Defs (messages, fields, enums) are built mutably, staged in a
//! [`SymbolTxn`], and committed into a [`SymbolTable`] in one atomic
//! operation that resolves all cross-def references. Once installed, defs
//! are immutable and reference-counted; replaced defs are retired and
//! reclaimed by [`SymbolTable::gc`] when the last outside reference drops.
//!
//! ```
//! use mintab_schema::{Def, FieldDef, FieldType, MessageDef, SymbolTable, SymbolTxn};
//!
//! let mut msg = MessageDef::new("pkg.Pair");
//! let mut f = FieldDef::new();
//! f.set_name("key");
//! f.set_number(1);
//! f.set_type(FieldType::String);
//! msg.add_field(f).unwrap();
//! msg.layout().unwrap();
//!
//! let table = SymbolTable::new();
//! let mut txn = SymbolTxn::new();
//! txn.add(Def::Message(msg)).unwrap();
//! table.commit(&mut txn).unwrap();
//! assert!(table.lookup("pkg.Pair").is_some());
//! ```

mod def;
mod enums;
mod error;
mod field;
mod msg;
mod symtab;
mod txn;

pub mod layout;

#[cfg(test)]
mod symtab_tests;

pub use def::{Def, DefKind};
pub use enums::EnumDef;
pub use error::{CommitError, LinkError, LinkFailure, SchemaError};
pub use field::{DefaultValue, FieldDef, FieldType, Label, UserValue};
pub use layout::{ByPlatform, Platform};
pub use msg::{MessageDef, OneofDef};
pub use symtab::SymbolTable;
pub use txn::SymbolTxn;
