//! Generator entry point.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use mintab_schema::{SymbolTable, SymbolTxn};

use crate::descriptor::{FileDescriptor, Syntax};
use crate::emit;
use crate::error::GenError;
use crate::file_layout::FileLayout;
use crate::params::GeneratorParams;
use crate::schema;

/// Compiles parsed file descriptors into accessor headers and mini-table
/// sources.
///
/// Files must be added dependency-first so cross-file type names resolve.
/// The generator owns the symbol table; a driver typically feeds it every
/// file of a compilation and calls [`generate`](Self::generate) for each
/// file it wants output for.
pub struct Generator {
    symtab: Arc<SymbolTable>,
    syntaxes: HashMap<String, Syntax>,
}

impl Generator {
    pub fn new() -> Self {
        Self {
            symtab: SymbolTable::new(),
            syntaxes: HashMap::new(),
        }
    }

    /// Install a file's defs into the symbol table without emitting.
    pub fn add_file(&mut self, file: &FileDescriptor) -> Result<(), GenError> {
        let mut txn = SymbolTxn::new();
        schema::stage_file(&mut txn, file)?;
        self.symtab.commit(&mut txn)?;
        self.syntaxes.insert(file.name.clone(), file.syntax);
        Ok(())
    }

    /// The symbol table holding every installed def.
    pub fn symtab(&self) -> &Arc<SymbolTable> {
        &self.symtab
    }

    pub(crate) fn syntaxes(&self) -> &HashMap<String, Syntax> {
        &self.syntaxes
    }

    /// Emit the header and source streams for `file`, installing its defs
    /// first if they are not present yet.
    pub fn generate(
        &mut self,
        file: &FileDescriptor,
        params: &GeneratorParams,
        header: &mut dyn Write,
        source: &mut dyn Write,
    ) -> Result<(), GenError> {
        if !self.syntaxes.contains_key(&file.name) {
            self.add_file(file)?;
        }
        let layout = FileLayout::build(&self.symtab, file, &self.syntaxes, params.fasttable)?;
        header.write_all(emit::header_text(&layout).as_bytes())?;
        source.write_all(emit::source_text(&layout).as_bytes())?;
        Ok(())
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}
