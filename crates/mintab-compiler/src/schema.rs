//! Staging parsed descriptors into the schema registry.
//!
//! Walks a file descriptor, builds mutable defs with fully-qualified names,
//! runs the layout planner on every message, and stages the whole file in
//! one transaction. Relative type names stay as written; the symbol table
//! resolves them at commit.

use mintab_schema::{Def, EnumDef, FieldDef, MessageDef, SchemaError, SymbolTxn};

use crate::descriptor::{EnumDescriptor, FileDescriptor, MessageDescriptor};

pub(crate) fn qualified(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_owned()
    } else {
        format!("{scope}.{name}")
    }
}

/// Stage every def of `file` into `txn`.
pub fn stage_file(txn: &mut SymbolTxn, file: &FileDescriptor) -> Result<(), SchemaError> {
    for message in &file.messages {
        stage_message(txn, file, &file.package, message)?;
    }
    for enum_desc in &file.enums {
        stage_enum(txn, file, &file.package, enum_desc)?;
    }
    Ok(())
}

fn stage_message(
    txn: &mut SymbolTxn,
    file: &FileDescriptor,
    scope: &str,
    desc: &MessageDescriptor,
) -> Result<(), SchemaError> {
    let fqname = qualified(scope, &desc.name);
    let mut msg = MessageDef::new(&fqname);
    msg.set_file(&file.name);
    msg.set_message_set_wire_format(desc.message_set_wire_format);
    msg.set_map_entry(desc.map_entry);

    // The def carries the hull of the declared ranges; extendability is all
    // the compiler needs downstream.
    if let Some(start) = desc.extension_ranges.iter().map(|r| r.start).min() {
        let end = desc.extension_ranges.iter().map(|r| r.end).max().unwrap_or(start);
        msg.set_extension_start(start);
        msg.set_extension_end(end);
    }

    for oneof in &desc.oneofs {
        msg.add_oneof(oneof)?;
    }

    for fd in &desc.fields {
        let mut f = FieldDef::new();
        f.set_name(&fd.name);
        f.set_number(fd.number);
        f.set_type(fd.field_type);
        f.set_label(fd.label);
        if let Some(type_name) = &fd.type_name {
            f.set_type_name(type_name);
        }
        if let Some(default) = &fd.default {
            f.set_default(default.clone());
        }
        if let Some(oneof) = fd.oneof_index {
            f.set_oneof(oneof);
        }
        f.set_packed(fd.is_packed(file.syntax));
        f.set_has_presence(fd.has_presence(file.syntax));
        msg.add_field(f)?;
    }

    msg.layout()?;
    txn.add(Def::Message(msg))?;

    for nested in &desc.nested_messages {
        stage_message(txn, file, &fqname, nested)?;
    }
    for nested in &desc.nested_enums {
        stage_enum(txn, file, &fqname, nested)?;
    }
    Ok(())
}

fn stage_enum(
    txn: &mut SymbolTxn,
    file: &FileDescriptor,
    scope: &str,
    desc: &EnumDescriptor,
) -> Result<(), SchemaError> {
    let mut e = EnumDef::new(qualified(scope, &desc.name));
    e.set_file(&file.name);
    for value in &desc.values {
        e.add_value(&value.name, value.number)?;
    }
    if let Some(first) = desc.values.first() {
        e.set_default(first.number);
    }
    txn.add(Def::Enum(e))
}
