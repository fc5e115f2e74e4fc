//! Per-file compilation state.
//!
//! A [`FileLayout`] pairs every message of an input file with its built
//! mini-table (and fast-decode table when enabled), collects the file's
//! enums and extensions, and fixes the deterministic emission order:
//! messages and enums by fully-qualified name, fields by number, extensions
//! by fully-qualified name.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use mintab_core::ident::to_c_ident;
use mintab_schema::{ByPlatform, Def, FieldType, Label, MessageDef, Platform, SymbolTable};

use crate::descriptor::{FieldDescriptor, FileDescriptor, MessageDescriptor, Syntax};
use crate::error::GenError;
use crate::fasttable::{self, FastTableEntry};
use crate::minitable::{
    self, EnumMiniTable, FieldKind, MiniTable, MiniTableField, Presence, Sub,
};
use crate::names;
use crate::schema::qualified;

/// An extension, resolved and ready to emit.
#[derive(Debug, Clone)]
pub struct ExtensionInfo {
    /// Fully-qualified name (`scope.name`).
    pub full_name: String,
    /// C identifier of the declaring scope (message or package).
    pub ident_base: String,
    pub descriptor: FieldDescriptor,
    /// Resolved extendee's fully-qualified name.
    pub extendee: String,
    /// Whether the extendee is defined in another file.
    pub extendee_cross_file: bool,
    pub field: MiniTableField,
    pub sub: Option<Sub>,
    /// Resolved value type for message/enum extensions.
    pub target: Option<Arc<Def>>,
}

impl ExtensionInfo {
    /// Name of the emitted extension record.
    pub fn layout_name(&self) -> String {
        names::extension_layout(&self.ident_base, &self.descriptor.name)
    }
}

/// Everything the emitters need for one input file.
pub struct FileLayout<'a> {
    pub file: &'a FileDescriptor,
    messages: Vec<Arc<Def>>,
    minitables: IndexMap<String, MiniTable>,
    fast_tables: IndexMap<String, Vec<FastTableEntry>>,
    enums: Vec<Arc<Def>>,
    enum_tables: Vec<EnumMiniTable>,
    extensions: Vec<ExtensionInfo>,
}

impl<'a> FileLayout<'a> {
    /// Build the layout for `file`, whose defs must already be committed to
    /// `symtab`. `syntaxes` maps every known file to its proto revision.
    pub fn build(
        symtab: &Arc<SymbolTable>,
        file: &'a FileDescriptor,
        syntaxes: &HashMap<String, Syntax>,
        fasttable_enabled: bool,
    ) -> Result<Self, GenError> {
        let closed_enum = |def: &Def| {
            matches!(
                syntaxes.get(def.file()).copied().unwrap_or_default(),
                Syntax::Proto2
            )
        };

        // Messages, sorted by fully-qualified name.
        let mut message_names = Vec::new();
        for m in &file.messages {
            collect_message_names(&file.package, m, &mut message_names);
        }
        message_names.sort();
        let mut messages = Vec::with_capacity(message_names.len());
        for name in &message_names {
            let def = symtab
                .lookup(name)
                .filter(|d| d.as_message().is_some())
                .ok_or_else(|| GenError::MissingDef(name.clone()))?;
            messages.push(def);
        }

        let mut minitables = IndexMap::new();
        let mut fast_tables = IndexMap::new();
        for def in &messages {
            let msg = def.as_message().expect("filtered to messages");
            let mut mt = minitable::build_minitable(msg, closed_enum);
            if fasttable_enabled {
                let table = fasttable::build_fast_table(msg, &mt);
                mt.table_mask = fasttable::table_mask(table.len());
                fast_tables.insert(mt.full_name.clone(), table);
            }
            minitables.insert(mt.full_name.clone(), mt);
        }

        // Enums, sorted by fully-qualified name.
        let mut enum_names = Vec::new();
        for m in &file.messages {
            collect_enum_names(&file.package, m, &mut enum_names);
        }
        for e in &file.enums {
            enum_names.push(qualified(&file.package, &e.name));
        }
        enum_names.sort();
        let mut enums = Vec::with_capacity(enum_names.len());
        for name in &enum_names {
            let def = symtab
                .lookup(name)
                .filter(|d| d.as_enum().is_some())
                .ok_or_else(|| GenError::MissingDef(name.clone()))?;
            enums.push(def);
        }

        // Closed-enum validation tables, proto2 files only.
        let enum_tables = if file.syntax == Syntax::Proto2 {
            enums
                .iter()
                .map(|def| {
                    let e = def.as_enum().expect("filtered to enums");
                    minitable::build_enum_table(e.full_name(), e.values().map(|(_, n)| n))
                })
                .collect()
        } else {
            Vec::new()
        };

        // Extensions, file-level then per-message, sorted by full name.
        let mut extensions = Vec::new();
        for ext in &file.extensions {
            extensions.push(build_extension(
                symtab,
                file,
                &file.package,
                to_c_ident(&file.package),
                ext,
                &closed_enum,
            )?);
        }
        let mut scopes: Vec<(String, &MessageDescriptor)> = Vec::new();
        for m in &file.messages {
            collect_message_scopes(&file.package, m, &mut scopes);
        }
        for (scope, desc) in &scopes {
            for ext in &desc.nested_extensions {
                extensions.push(build_extension(
                    symtab,
                    file,
                    scope,
                    names::message_name(scope),
                    ext,
                    &closed_enum,
                )?);
            }
        }
        extensions.sort_by(|a, b| a.full_name.cmp(&b.full_name));

        Ok(Self {
            file,
            messages,
            minitables,
            fast_tables,
            enums,
            enum_tables,
            extensions,
        })
    }

    /// This file's messages with their mini-tables, by fully-qualified name.
    pub fn messages(&self) -> impl Iterator<Item = (&MessageDef, &MiniTable)> {
        self.messages.iter().zip(self.minitables.values()).map(|(def, mt)| {
            (def.as_message().expect("filtered to messages"), mt)
        })
    }

    /// This file's enums, by fully-qualified name.
    pub fn enums(&self) -> &[Arc<Def>] {
        &self.enums
    }

    pub fn enum_tables(&self) -> &[EnumMiniTable] {
        &self.enum_tables
    }

    pub fn extensions(&self) -> &[ExtensionInfo] {
        &self.extensions
    }

    pub fn fast_table(&self, fqname: &str) -> Option<&[FastTableEntry]> {
        self.fast_tables.get(fqname).map(Vec::as_slice)
    }
}

fn collect_message_names(scope: &str, desc: &MessageDescriptor, out: &mut Vec<String>) {
    let fqname = qualified(scope, &desc.name);
    for nested in &desc.nested_messages {
        collect_message_names(&fqname, nested, out);
    }
    out.push(fqname);
}

fn collect_enum_names(scope: &str, desc: &MessageDescriptor, out: &mut Vec<String>) {
    let fqname = qualified(scope, &desc.name);
    for e in &desc.nested_enums {
        out.push(qualified(&fqname, &e.name));
    }
    for nested in &desc.nested_messages {
        collect_enum_names(&fqname, nested, out);
    }
}

fn collect_message_scopes<'d>(
    scope: &str,
    desc: &'d MessageDescriptor,
    out: &mut Vec<(String, &'d MessageDescriptor)>,
) {
    let fqname = qualified(scope, &desc.name);
    for nested in &desc.nested_messages {
        collect_message_scopes(&fqname, nested, out);
    }
    out.push((fqname, desc));
}

fn build_extension(
    symtab: &Arc<SymbolTable>,
    file: &FileDescriptor,
    scope: &str,
    ident_base: String,
    desc: &FieldDescriptor,
    closed_enum: &dyn Fn(&Def) -> bool,
) -> Result<ExtensionInfo, GenError> {
    let full_name = qualified(scope, &desc.name);

    let extendee_symbol = desc.extendee.clone().unwrap_or_default();
    let extendee_def = symtab.resolve(scope, &extendee_symbol).ok_or_else(|| {
        GenError::UnresolvedExtendee {
            extension: full_name.clone(),
            symbol: extendee_symbol.clone(),
        }
    })?;
    if extendee_def.as_message().is_none() {
        return Err(GenError::ExtendeeNotMessage {
            extension: full_name,
            symbol: extendee_symbol,
        });
    }

    let mut descriptor_type = desc.field_type.descriptor_type();
    let mut alternate = false;
    let mut sub = None;
    let mut target = None;

    if desc.field_type.has_sub_def() {
        let symbol = desc.type_name.clone().unwrap_or_default();
        let def = symtab.resolve(scope, &symbol).ok_or_else(|| {
            GenError::UnresolvedExtensionType {
                extension: full_name.clone(),
                symbol: symbol.clone(),
            }
        })?;
        if desc.field_type.is_sub_message() {
            sub = Some(Sub::Message(def.full_name().to_owned()));
        } else if closed_enum(&def) {
            sub = Some(Sub::Enum(def.full_name().to_owned()));
        } else {
            descriptor_type = FieldType::Int32.descriptor_type();
            alternate = true;
        }
        target = Some(def);
    }

    let kind = if desc.label == Label::Repeated {
        FieldKind::Array
    } else {
        FieldKind::Scalar
    };

    let field = MiniTableField {
        number: desc.number,
        offset: ByPlatform::default(),
        presence: Presence::None,
        sub_index: sub.is_some().then_some(0),
        descriptor_type,
        kind,
        packed: desc.is_packed(file.syntax),
        extension: true,
        alternate,
        rep: ByPlatform {
            p32: minitable::rep_for(desc.field_type, desc.label == Label::Repeated, Platform::P32),
            p64: minitable::rep_for(desc.field_type, desc.label == Label::Repeated, Platform::P64),
        },
    };

    Ok(ExtensionInfo {
        full_name,
        ident_base,
        descriptor: desc.clone(),
        extendee: extendee_def.full_name().to_owned(),
        extendee_cross_file: extendee_def.file() != file.name,
        field,
        sub,
        target,
    })
}
