//! Mini-table source emission.

use std::collections::BTreeSet;

use mintab_schema::Platform;

use crate::file_layout::{ExtensionInfo, FileLayout};
use crate::minitable::{EnumMiniTable, FieldRep, MiniTable, MiniTableField, Sub};
use crate::names;

use super::{file_warning, int_pair, size_pair};

const MESSAGES_INIT: &str = "messages_layout";
const ENUMS_INIT: &str = "enums_layout";
const EXTENSIONS_INIT: &str = "extensions_layout";

/// Produce the `.upb.c` text for a file.
pub fn source_text(layout: &FileLayout<'_>) -> String {
    let file = layout.file;
    let mut out = String::new();
    file_warning(&file.name, &mut out);

    out.push_str("#include <stddef.h>\n");
    out.push_str("#include \"upb/internal/array.h\"\n");
    out.push_str("#include \"upb/msg_internal.h\"\n");
    out.push_str(&format!(
        "#include \"{}\"\n",
        names::header_filename(&file.name)
    ));
    for dep in &file.dependencies {
        out.push_str(&format!("#include \"{}\"\n", names::header_filename(dep)));
    }
    out.push_str("\n#include \"upb/port_def.inc\"\n\n");

    let msg_count = write_messages(layout, &mut out);
    let ext_count = write_extensions(layout, &mut out);
    let enum_count = write_enums(layout, &mut out);

    out.push_str(&format!(
        "const upb_MiniTable_File {} = {{\n",
        names::file_layout_name(&file.name)
    ));
    out.push_str(&format!(
        "  {},\n",
        if msg_count > 0 { MESSAGES_INIT } else { "NULL" }
    ));
    out.push_str(&format!(
        "  {},\n",
        if enum_count > 0 { ENUMS_INIT } else { "NULL" }
    ));
    out.push_str(&format!(
        "  {},\n",
        if ext_count > 0 { EXTENSIONS_INIT } else { "NULL" }
    ));
    out.push_str(&format!("  {msg_count},\n"));
    out.push_str(&format!("  {enum_count},\n"));
    out.push_str(&format!("  {ext_count},\n"));
    out.push_str("};\n\n");

    out.push_str("#include \"upb/port_undef.inc\"\n\n");
    out
}

/// Symbolic mode initializer, matching the mode byte bit layout.
fn mode_init(field: &MiniTableField) -> String {
    let mut init = field.kind.symbol().to_owned();
    if field.packed {
        init.push_str(" | kUpb_LabelFlags_IsPacked");
    }
    if field.extension {
        init.push_str(" | kUpb_LabelFlags_IsExtension");
    }
    if field.alternate {
        init.push_str(" | kUpb_LabelFlags_IsAlternate");
    }

    let rep32 = field.rep.get(Platform::P32);
    let rep64 = field.rep.get(Platform::P64);
    let rep = if rep32 == rep64 {
        rep64.symbol().to_owned()
    } else {
        debug_assert_eq!(rep32, FieldRep::Byte4);
        debug_assert_eq!(rep64, FieldRep::Byte8);
        format!("UPB_SIZE({}, {})", rep32.symbol(), rep64.symbol())
    };
    init.push_str(&format!(" | ({rep} << kUpb_FieldRep_Shift)"));
    init
}

fn field_literal(field: &MiniTableField) -> String {
    let sub = match field.sub_index {
        Some(index) => index.to_string(),
        None => "kUpb_NoSub".to_owned(),
    };
    format!(
        "{{{}, {}, {}, {}, {}, {}}}",
        field.number,
        size_pair(field.offset),
        int_pair(
            field.presence.encoded(Platform::P32),
            field.presence.encoded(Platform::P64)
        ),
        sub,
        field.descriptor_type,
        mode_init(field),
    )
}

fn write_message(layout: &FileLayout<'_>, mt: &MiniTable, out: &mut String) {
    let msg_name = names::message_name(&mt.full_name);
    let init = names::message_init(&mt.full_name);

    let mut submsgs_ref = "NULL".to_owned();
    if !mt.subs.is_empty() {
        let array = format!("{msg_name}_submsgs");
        submsgs_ref = format!("&{array}[0]");
        out.push_str(&format!(
            "static const upb_MiniTable_Sub {array}[{}] = {{\n",
            mt.subs.len()
        ));
        for sub in &mt.subs {
            match sub {
                Sub::Message(fqname) => out.push_str(&format!(
                    "  {{.submsg = &{}}},\n",
                    names::message_init(fqname)
                )),
                Sub::Enum(fqname) => out.push_str(&format!(
                    "  {{.subenum = &{}}},\n",
                    names::enum_init(fqname)
                )),
            }
        }
        out.push_str("};\n\n");
    }

    let mut fields_ref = "NULL".to_owned();
    if !mt.fields.is_empty() {
        let array = format!("{msg_name}__fields");
        fields_ref = format!("&{array}[0]");
        out.push_str(&format!(
            "static const upb_MiniTable_Field {array}[{}] = {{\n",
            mt.fields.len()
        ));
        for field in &mt.fields {
            out.push_str(&format!("  {},\n", field_literal(field)));
        }
        out.push_str("};\n\n");
    }

    out.push_str(&format!("const upb_MiniTable {init} = {{\n"));
    out.push_str(&format!("  {submsgs_ref},\n"));
    out.push_str(&format!("  {fields_ref},\n"));
    out.push_str(&format!(
        "  {}, {}, {}, {}, {}, {},\n",
        size_pair(mt.size),
        mt.field_count(),
        mt.ext_mode.symbol(),
        mt.dense_below,
        mt.table_mask,
        mt.required_count,
    ));
    if let Some(table) = layout.fast_table(&mt.full_name) {
        if !table.is_empty() {
            out.push_str("  UPB_FASTTABLE_INIT({\n");
            for entry in table {
                out.push_str(&format!(
                    "    {{0x{:016x}, &{}}},\n",
                    entry.data, entry.function
                ));
            }
            out.push_str("  }),\n");
        }
    }
    out.push_str("};\n\n");
}

fn write_messages(layout: &FileLayout<'_>, out: &mut String) -> usize {
    let minitables: Vec<&MiniTable> = layout.messages().map(|(_, mt)| mt).collect();
    if minitables.is_empty() {
        return 0;
    }

    for mt in &minitables {
        write_message(layout, mt, out);
    }

    out.push_str(&format!(
        "static const upb_MiniTable *{MESSAGES_INIT}[{}] = {{\n",
        minitables.len()
    ));
    for mt in &minitables {
        out.push_str(&format!("  &{},\n", names::message_init(&mt.full_name)));
    }
    out.push_str("};\n\n");
    minitables.len()
}

fn write_extension(ext: &ExtensionInfo, out: &mut String) {
    out.push_str(&format!(
        "const upb_MiniTable_Extension {} = {{\n",
        ext.layout_name()
    ));
    out.push_str(&format!("  {},\n", field_literal(&ext.field)));
    out.push_str(&format!("  &{},\n", names::message_init(&ext.extendee)));
    match &ext.sub {
        Some(Sub::Message(fqname)) => out.push_str(&format!(
            "  {{.submsg = &{}}},\n",
            names::message_init(fqname)
        )),
        Some(Sub::Enum(fqname)) => out.push_str(&format!(
            "  {{.subenum = &{}}},\n",
            names::enum_init(fqname)
        )),
        None => out.push_str("  {.submsg = NULL},\n"),
    }
    out.push_str("};\n");
}

fn write_extensions(layout: &FileLayout<'_>, out: &mut String) -> usize {
    let exts = layout.extensions();
    if exts.is_empty() {
        return 0;
    }

    // Mini-tables referenced by the records, by full name.
    let mut forward: BTreeSet<&str> = BTreeSet::new();
    for ext in exts {
        forward.insert(&ext.extendee);
        if let Some(Sub::Message(fqname)) = &ext.sub {
            forward.insert(fqname);
        }
    }
    for fqname in &forward {
        out.push_str(&format!(
            "extern const upb_MiniTable {};\n",
            names::message_init(fqname)
        ));
    }
    out.push('\n');

    for ext in exts {
        write_extension(ext, out);
    }

    out.push_str(&format!(
        "\nstatic const upb_MiniTable_Extension *{EXTENSIONS_INIT}[{}] = {{\n",
        exts.len()
    ));
    for ext in exts {
        out.push_str(&format!("  &{},\n", ext.layout_name()));
    }
    out.push_str("};\n\n");
    exts.len()
}

fn write_enum(table: &EnumMiniTable, out: &mut String) {
    out.push_str(&format!(
        "const upb_MiniTable_Enum {} = {{\n",
        names::enum_init(&table.full_name)
    ));
    out.push_str(&format!("    {},\n", table.mask_limit));
    out.push_str(&format!("    {},\n", table.value_count()));
    out.push_str("    {\n");
    for word in table.data_words() {
        out.push_str(&format!("        0x{word:x},\n"));
    }
    out.push_str("    },\n");
    out.push_str("};\n\n");
}

fn write_enums(layout: &FileLayout<'_>, out: &mut String) -> usize {
    let tables = layout.enum_tables();
    if tables.is_empty() {
        return 0;
    }

    for table in tables {
        write_enum(table, out);
    }

    out.push_str(&format!(
        "static const upb_MiniTable_Enum *{ENUMS_INIT}[{}] = {{\n",
        tables.len()
    ));
    for table in tables {
        out.push_str(&format!("  &{},\n", names::enum_init(&table.full_name)));
    }
    out.push_str("};\n\n");
    tables.len()
}
