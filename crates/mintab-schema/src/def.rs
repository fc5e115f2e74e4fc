//! Base def machinery: the kind tag and the shared header.
//!
//! Defs are mutable (and single-owner) when first created. Committing a
//! transaction wraps them in `Arc` and installs a back-reference to the
//! owning symbol table; from then on they are frozen. The invariant "mutable
//! iff the back-reference is absent" is enforced statically: every mutator
//! takes `&mut self`, and installed defs are only reachable through `Arc`.

use std::sync::{OnceLock, Weak};

use crate::enums::EnumDef;
use crate::msg::MessageDef;
use crate::symtab::SymbolTable;

/// The kinds of defs, corresponding 1:1 with declarations in a `.proto`
/// file. `Service` is declared for filtering but has no constructor yet;
/// `Unresolved` is the kind reported for a sub-reference before linkage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefKind {
    Message,
    Enum,
    Service,
    Unresolved,
}

/// State shared by every def kind.
#[derive(Debug, Default)]
pub(crate) struct DefHeader {
    pub(crate) full_name: String,
    /// Descriptor file the def came from; used for cross-file decisions in
    /// the compiler.
    pub(crate) file: String,
    /// Set when the def is installed. A def is mutable iff this is unset.
    pub(crate) symtab: OnceLock<Weak<SymbolTable>>,
}

impl DefHeader {
    pub(crate) fn new(full_name: String) -> Self {
        Self {
            full_name,
            file: String::new(),
            symtab: OnceLock::new(),
        }
    }

    pub(crate) fn dup(&self) -> Self {
        Self {
            full_name: self.full_name.clone(),
            file: self.file.clone(),
            symtab: OnceLock::new(),
        }
    }
}

/// A schema node: message or enum.
#[derive(Debug)]
pub enum Def {
    Message(MessageDef),
    Enum(EnumDef),
}

impl Def {
    pub fn kind(&self) -> DefKind {
        match self {
            Def::Message(_) => DefKind::Message,
            Def::Enum(_) => DefKind::Enum,
        }
    }

    pub fn full_name(&self) -> &str {
        &self.header().full_name
    }

    /// Descriptor file this def came from, if recorded.
    pub fn file(&self) -> &str {
        &self.header().file
    }

    pub fn as_message(&self) -> Option<&MessageDef> {
        match self {
            Def::Message(m) => Some(m),
            Def::Enum(_) => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumDef> {
        match self {
            Def::Enum(e) => Some(e),
            Def::Message(_) => None,
        }
    }

    /// Whether the def has been installed in a symbol table.
    pub fn is_frozen(&self) -> bool {
        self.header().symtab.get().is_some()
    }

    /// The owning symbol table, once installed.
    pub fn symtab(&self) -> Option<std::sync::Arc<SymbolTable>> {
        self.header().symtab.get().and_then(Weak::upgrade)
    }

    /// Deep copy with cross-def links severed into name stubs. The copy is
    /// mutable and can be staged into any transaction.
    pub fn dup(&self) -> Def {
        match self {
            Def::Message(m) => Def::Message(m.dup()),
            Def::Enum(e) => Def::Enum(e.dup()),
        }
    }

    pub(crate) fn header(&self) -> &DefHeader {
        match self {
            Def::Message(m) => m.header(),
            Def::Enum(e) => e.header(),
        }
    }

    pub(crate) fn install(&self, symtab: Weak<SymbolTable>) {
        let installed = self.header().symtab.set(symtab).is_ok();
        debug_assert!(installed, "def installed twice: {}", self.full_name());
    }
}
