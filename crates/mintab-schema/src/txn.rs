//! Symbol transactions.
//!
//! A transaction stages a batch of mutable defs keyed by fully-qualified
//! name, to be installed into a symbol table in one atomic commit.
//! Transactions are single-owner; they are neither `Sync` to share nor
//! meaningful to use concurrently.

use indexmap::IndexMap;

use crate::def::Def;
use crate::error::SchemaError;

/// A staged batch of defs awaiting commit.
#[derive(Debug, Default)]
pub struct SymbolTxn {
    defs: IndexMap<String, Def>,
}

impl SymbolTxn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a def under its fully-qualified name.
    ///
    /// Fails on an unnamed def or a name already staged; the def is dropped
    /// and the transaction is unchanged.
    pub fn add(&mut self, def: Def) -> Result<(), SchemaError> {
        let name = def.full_name().to_owned();
        if name.is_empty() {
            return Err(SchemaError::EmptyName);
        }
        if self.defs.contains_key(&name) {
            return Err(SchemaError::DuplicateSymbol { name });
        }
        self.defs.insert(name, def);
        Ok(())
    }

    /// Borrow a staged def by name.
    pub fn get(&self, name: &str) -> Option<&Def> {
        self.defs.get(name)
    }

    /// Iterate staged defs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Def)> {
        self.defs.iter().map(|(n, d)| (n.as_str(), d))
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Drain the staged defs. Only called by a commit that can no longer
    /// fail; a failed commit must leave the transaction intact for retry.
    pub(crate) fn take(&mut self) -> IndexMap<String, Def> {
        std::mem::take(&mut self.defs)
    }
}
