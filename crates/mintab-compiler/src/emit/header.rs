//! Accessor header emission.

use std::collections::BTreeSet;

use mintab_core::ident::{to_c_ident, to_preproc};
use mintab_schema::{FieldDef, Label, MessageDef, OneofDef};

use crate::file_layout::{ExtensionInfo, FileLayout};
use crate::names;

use super::{TypeRef, ctype, default_literal, file_warning, has_nonzero_default, size_lg2, size_pair};

/// Produce the `.upb.h` text for a file.
pub fn header_text(layout: &FileLayout<'_>) -> String {
    let file = layout.file;
    let mut out = String::new();
    file_warning(&file.name, &mut out);

    let guard = to_preproc(&file.name);
    out.push_str(&format!("#ifndef {guard}_UPB_H_\n"));
    out.push_str(&format!("#define {guard}_UPB_H_\n\n"));
    out.push_str("#include \"upb/decode.h\"\n");
    out.push_str("#include \"upb/decode_fast.h\"\n");
    out.push_str("#include \"upb/encode.h\"\n\n");
    out.push_str("#include \"upb/internal/array.h\"\n");
    out.push_str("#include \"upb/msg_internal.h\"\n");

    let public_deps: Vec<&str> = file.public_dependency_names().collect();
    for (i, dep) in public_deps.iter().enumerate() {
        if i == 0 {
            out.push_str("/* Public Imports. */\n");
        }
        out.push_str(&format!("#include \"{}\"\n", names::header_filename(dep)));
        if i == public_deps.len() - 1 {
            out.push('\n');
        }
    }

    out.push_str("#include \"upb/port_def.inc\"\n\n");
    out.push_str("#ifdef __cplusplus\n");
    out.push_str("extern \"C\" {\n");
    out.push_str("#endif\n\n");

    // Forward declarations for this file's types.
    for (msg, _) in layout.messages() {
        let name = names::message_name(msg.full_name());
        out.push_str(&format!("typedef struct {name} {name};\n"));
    }
    for (msg, _) in layout.messages() {
        out.push_str(&format!(
            "extern const upb_MiniTable {};\n",
            names::message_init(msg.full_name())
        ));
    }
    for ext in layout.extensions() {
        out.push_str(&format!(
            "extern const upb_MiniTable_Extension {};\n",
            ext.layout_name()
        ));
    }

    // Types used as sub-messages but defined elsewhere, by full name.
    let mut forward: BTreeSet<String> = BTreeSet::new();
    for (msg, _) in layout.messages() {
        for f in msg.fields() {
            if !f.field_type().is_sub_message() {
                continue;
            }
            if let Some(target) = f.sub() {
                if target.file() != file.name {
                    forward.insert(target.full_name().to_owned());
                }
            }
        }
    }
    for ext in layout.extensions() {
        if ext.extendee_cross_file {
            forward.insert(ext.extendee.clone());
        }
    }
    for fqname in &forward {
        out.push_str(&format!("struct {};\n", names::message_name(fqname)));
    }
    for fqname in &forward {
        out.push_str(&format!(
            "extern const upb_MiniTable {};\n",
            names::message_init(fqname)
        ));
    }

    if layout.messages().next().is_some() {
        out.push('\n');
    }

    for def in layout.enums() {
        let e = def.as_enum().expect("enum list holds enums");
        let mut values: Vec<(&str, i32)> = e.values().collect();
        values.sort_by_key(|&(_, number)| number);

        out.push_str("typedef enum {\n");
        for (i, (name, number)) in values.iter().enumerate() {
            let comma = if i == values.len() - 1 { "" } else { "," };
            out.push_str(&format!(
                "  {} = {number}{comma}\n",
                names::enum_value_symbol(e.full_name(), name)
            ));
        }
        out.push_str(&format!("}} {};\n\n", to_c_ident(e.full_name())));
    }

    out.push('\n');

    for table in layout.enum_tables() {
        out.push_str(&format!(
            "extern const upb_MiniTable_Enum {};\n",
            names::enum_init(&table.full_name)
        ));
    }

    out.push('\n');

    for (msg, _) in layout.messages() {
        message_in_header(msg, &file.name, &mut out);
    }

    for ext in layout.extensions() {
        extension_in_header(ext, &file.name, &mut out);
    }

    out.push_str(&format!(
        "extern const upb_MiniTable_File {};\n\n",
        names::file_layout_name(&file.name)
    ));

    out.push_str("#ifdef __cplusplus\n");
    out.push_str("}  /* extern \"C\" */\n");
    out.push_str("#endif\n\n");
    out.push_str("#include \"upb/port_undef.inc\"\n\n");
    out.push_str(&format!("#endif  /* {guard}_UPB_H_ */\n"));

    out
}

fn message_in_header(msg: &MessageDef, file_name: &str, out: &mut String) {
    out.push_str(&format!("/* {} */\n\n", msg.full_name()));
    let msg_name = names::message_name(msg.full_name());

    if !msg.is_map_entry() {
        message_functions(&msg_name, &names::message_init(msg.full_name()), out);
    }

    for oneof in msg.oneofs() {
        if !oneof.field_numbers().is_empty() {
            oneof_in_header(msg, &msg_name, oneof, out);
        }
    }

    for field in fields_by_number(msg) {
        hazzer(msg, &msg_name, field, out);
        if field.is_repeated() {
            repeated_clear(&msg_name, field, out);
        } else {
            clear(msg, &msg_name, field, file_name, out);
        }
        getter(msg, &msg_name, field, file_name, out);
    }

    out.push('\n');

    for field in fields_by_number(msg) {
        setter(msg, &msg_name, field, file_name, out);
    }

    out.push('\n');
}

fn fields_by_number(msg: &MessageDef) -> impl Iterator<Item = &FieldDef> {
    let mut numbers: Vec<u32> = msg.fields().map(FieldDef::number).collect();
    numbers.sort_unstable();
    numbers
        .into_iter()
        .map(|n| msg.field_by_number(n).expect("field is indexed"))
}

fn message_functions(m: &str, init: &str, out: &mut String) {
    out.push_str(&format!("UPB_INLINE {m}* {m}_new(upb_Arena* arena) {{\n"));
    out.push_str(&format!("  return ({m}*)_upb_Message_New(&{init}, arena);\n"));
    out.push_str("}\n");
    out.push_str(&format!(
        "UPB_INLINE {m}* {m}_parse(const char* buf, size_t size, upb_Arena* arena) {{\n"
    ));
    out.push_str(&format!("  {m}* ret = {m}_new(arena);\n"));
    out.push_str("  if (!ret) return NULL;\n");
    out.push_str(&format!(
        "  if (upb_Decode(buf, size, ret, &{init}, NULL, 0, arena) != kUpb_DecodeStatus_Ok) {{\n"
    ));
    out.push_str("    return NULL;\n");
    out.push_str("  }\n");
    out.push_str("  return ret;\n");
    out.push_str("}\n");
    out.push_str(&format!(
        "UPB_INLINE {m}* {m}_parse_ex(const char* buf, size_t size,\n"
    ));
    out.push_str("                           const upb_ExtensionRegistry* extreg,\n");
    out.push_str("                           int options, upb_Arena* arena) {\n");
    out.push_str(&format!("  {m}* ret = {m}_new(arena);\n"));
    out.push_str("  if (!ret) return NULL;\n");
    out.push_str(&format!(
        "  if (upb_Decode(buf, size, ret, &{init}, extreg, options, arena) !=\n"
    ));
    out.push_str("      kUpb_DecodeStatus_Ok) {\n");
    out.push_str("    return NULL;\n");
    out.push_str("  }\n");
    out.push_str("  return ret;\n");
    out.push_str("}\n");
    out.push_str(&format!(
        "UPB_INLINE char* {m}_serialize(const {m}* msg, upb_Arena* arena, size_t* len) {{\n"
    ));
    out.push_str("  char* ptr;\n");
    out.push_str(&format!("  (void)upb_Encode(msg, &{init}, 0, arena, &ptr, len);\n"));
    out.push_str("  return ptr;\n");
    out.push_str("}\n");
    out.push_str(&format!(
        "UPB_INLINE char* {m}_serialize_ex(const {m}* msg, int options,\n"
    ));
    out.push_str("                                 upb_Arena* arena, size_t* len) {\n");
    out.push_str("  char* ptr;\n");
    out.push_str(&format!(
        "  (void)upb_Encode(msg, &{init}, options, arena, &ptr, len);\n"
    ));
    out.push_str("  return ptr;\n");
    out.push_str("}\n");
}

fn oneof_in_header(msg: &MessageDef, m: &str, oneof: &OneofDef, out: &mut String) {
    out.push_str("typedef enum {\n");
    for &number in oneof.field_numbers() {
        let field = msg.field_by_number(number).expect("oneof member is indexed");
        out.push_str(&format!("  {m}_{} = {number},\n", field.name()));
    }
    out.push_str(&format!("  {m}_NOT_SET = 0\n"));
    out.push_str(&format!("}} {m}_{}_oneofcases;\n", oneof.name()));

    let o = oneof.name();
    out.push_str(&format!(
        "UPB_INLINE {m}_{o}_oneofcases {m}_{o}_case(const {m}* msg) {{\n"
    ));
    out.push_str(&format!(
        "  return ({m}_{o}_oneofcases)*UPB_PTR_AT(msg, {}, int32_t);\n",
        size_pair(oneof.case_offset())
    ));
    out.push_str("}\n");
}

fn hazzer(msg: &MessageDef, m: &str, field: &FieldDef, out: &mut String) {
    let name = field.name();
    if let Some(index) = field.hasbit() {
        out.push_str(&format!(
            "UPB_INLINE bool {m}_has_{name}(const {m}* msg) {{\n"
        ));
        out.push_str(&format!("  return _upb_hasbit(msg, {});\n", index + 1));
        out.push_str("}\n");
    } else if let Some(oneof) = field.oneof() {
        out.push_str(&format!(
            "UPB_INLINE bool {m}_has_{name}(const {m}* msg) {{\n"
        ));
        out.push_str(&format!(
            "  return _upb_getoneofcase(msg, {}) == {};\n",
            size_pair(msg.oneofs()[oneof].case_offset()),
            field.number()
        ));
        out.push_str("}\n");
    } else if field.field_type().is_sub_message() {
        out.push_str(&format!(
            "UPB_INLINE bool {m}_has_{name}(const {m}* msg) {{\n"
        ));
        out.push_str(&format!(
            "  return _upb_has_submsg_nohasbit(msg, {});\n",
            size_pair(field.offset())
        ));
        out.push_str("}\n");
    }
}

fn repeated_clear(m: &str, field: &FieldDef, out: &mut String) {
    out.push_str(&format!(
        "UPB_INLINE void {m}_clear_{}(const {m}* msg) {{\n",
        field.name()
    ));
    out.push_str(&format!(
        "  _upb_array_detach(msg, {});\n",
        size_pair(field.offset())
    ));
    out.push_str("}\n");
}

fn clear(msg: &MessageDef, m: &str, field: &FieldDef, file_name: &str, out: &mut String) {
    // Map entry keys and values cannot be cleared.
    if msg.is_map_entry() {
        return;
    }
    let name = field.name();
    let r = TypeRef::of_field(field, file_name);

    if let Some(oneof) = field.oneof() {
        let default = if field.field_type().is_string_kind() {
            "upb_StringView_FromDataAndSize(NULL, 0)"
        } else {
            "0"
        };
        out.push_str(&format!(
            "UPB_INLINE void {m}_clear_{name}(const {m}* msg) {{\n"
        ));
        out.push_str(&format!(
            "  UPB_WRITE_ONEOF(msg, {}, {}, {default}, {}, {m}_NOT_SET);\n",
            ctype(&r, false),
            size_pair(field.offset()),
            size_pair(msg.oneofs()[oneof].case_offset()),
        ));
        out.push_str("}\n");
        return;
    }

    if field.field_type().is_sub_message() {
        out.push_str(&format!(
            "UPB_INLINE void {m}_clear_{name}(const {m}* msg) {{\n"
        ));
        out.push_str(&format!(
            "  *UPB_PTR_AT(msg, {}, const upb_Message*) = NULL;\n",
            size_pair(field.offset())
        ));
        out.push_str("}\n");
        return;
    }

    let zero = if field.field_type().is_string_kind() {
        "upb_StringView_FromDataAndSize(NULL, 0)"
    } else {
        "0"
    };
    out.push_str(&format!(
        "UPB_INLINE void {m}_clear_{name}(const {m}* msg) {{\n"
    ));
    out.push_str(&format!(
        "  *UPB_PTR_AT(msg, {}, {}) = {zero};\n",
        size_pair(field.offset()),
        ctype(&r, false),
    ));
    if let Some(index) = field.hasbit() {
        out.push_str(&format!("  _upb_clearhas(msg, {});\n", index + 1));
    }
    out.push_str("}\n");
}

/// Key/value fields of a map field's synthesized entry message.
fn map_entry_fields(
    field: &FieldDef,
) -> Option<(std::sync::Arc<mintab_schema::Def>, u32, u32)> {
    let entry = field.sub()?;
    if !entry.as_message()?.is_map_entry() {
        return None;
    }
    Some((entry, 1, 2))
}

fn entry_field(entry: &mintab_schema::Def, number: u32) -> &FieldDef {
    entry
        .as_message()
        .expect("map entry is a message")
        .field_by_number(number)
        .expect("map entry has key and value")
}

fn is_map_field(field: &FieldDef) -> bool {
    field.is_repeated()
        && field
            .sub()
            .and_then(|d| d.as_message().map(MessageDef::is_map_entry))
            .unwrap_or(false)
}

fn sizeof_or_zero(field: &FieldDef, expr: &str) -> String {
    if field.field_type().is_string_kind() {
        "0".to_owned()
    } else {
        format!("sizeof({expr})")
    }
}

fn getter(msg: &MessageDef, m: &str, field: &FieldDef, file_name: &str, out: &mut String) {
    let name = field.name();
    let r = TypeRef::of_field(field, file_name);
    let offset = size_pair(field.offset());

    if is_map_field(field) {
        let (entry, key_num, val_num) = map_entry_fields(field).expect("map field has an entry");
        let key = entry_field(&entry, key_num);
        let val = entry_field(&entry, val_num);
        let key_type = ctype(&TypeRef::of_field(key, file_name), false);
        let val_type = ctype(&TypeRef::of_field(val, file_name), false);

        out.push_str(&format!(
            "UPB_INLINE size_t {m}_{name}_size(const {m}* msg) {{\n"
        ));
        out.push_str(&format!("  return _upb_msg_map_size(msg, {offset});\n"));
        out.push_str("}\n");

        out.push_str(&format!(
            "UPB_INLINE bool {m}_{name}_get(const {m}* msg, {key_type} key, {val_type}* val) {{\n"
        ));
        out.push_str(&format!(
            "  return _upb_msg_map_get(msg, {offset}, &key, {}, val, {});\n",
            sizeof_or_zero(key, "key"),
            sizeof_or_zero(val, "*val"),
        ));
        out.push_str("}\n");

        out.push_str(&format!(
            "UPB_INLINE {} {m}_{name}_next(const {m}* msg, size_t* iter) {{\n",
            ctype(&r, true)
        ));
        out.push_str(&format!(
            "  return ({})_upb_msg_map_next(msg, {offset}, iter);\n",
            ctype(&r, true)
        ));
        out.push_str("}\n");
        return;
    }

    if msg.is_map_entry() {
        out.push_str(&format!(
            "UPB_INLINE {} {m}_{name}(const {m}* msg) {{\n",
            ctype(&r, true)
        ));
        out.push_str(&format!("  {} ret;\n", ctype(&r, false)));
        out.push_str(&format!(
            "  _upb_msg_map_{name}(msg, &ret, {});\n",
            sizeof_or_zero(field, "ret")
        ));
        out.push_str("  return ret;\n");
        out.push_str("}\n");
        return;
    }

    if field.is_repeated() {
        out.push_str(&format!(
            "UPB_INLINE {} const* {m}_{name}(const {m}* msg, size_t* len) {{\n",
            ctype(&r, true)
        ));
        out.push_str(&format!(
            "  return ({} const*)_upb_array_accessor(msg, {offset}, len);\n",
            ctype(&r, true)
        ));
        out.push_str("}\n");
        return;
    }

    if let Some(oneof) = field.oneof() {
        out.push_str(&format!(
            "UPB_INLINE {} {m}_{name}(const {m}* msg) {{\n",
            ctype(&r, true)
        ));
        out.push_str(&format!(
            "  return UPB_READ_ONEOF(msg, {}, {offset}, {}, {}, {});\n",
            ctype(&r, true),
            size_pair(msg.oneofs()[oneof].case_offset()),
            field.number(),
            default_literal(&r),
        ));
        out.push_str("}\n");
        return;
    }

    out.push_str(&format!(
        "UPB_INLINE {} {m}_{name}(const {m}* msg) {{\n",
        ctype(&r, true)
    ));
    if has_nonzero_default(&r) {
        out.push_str(&format!(
            "  return {m}_has_{name}(msg) ? *UPB_PTR_AT(msg, {offset}, {}) : {};\n",
            ctype(&r, true),
            default_literal(&r),
        ));
    } else {
        out.push_str(&format!(
            "  return *UPB_PTR_AT(msg, {offset}, {});\n",
            ctype(&r, true)
        ));
    }
    out.push_str("}\n");
}

fn setter(msg: &MessageDef, m: &str, field: &FieldDef, file_name: &str, out: &mut String) {
    let name = field.name();
    let r = TypeRef::of_field(field, file_name);
    let offset = size_pair(field.offset());

    if is_map_field(field) {
        let (entry, key_num, val_num) = map_entry_fields(field).expect("map field has an entry");
        let key = entry_field(&entry, key_num);
        let val = entry_field(&entry, val_num);
        let key_type = ctype(&TypeRef::of_field(key, file_name), false);
        let val_type = ctype(&TypeRef::of_field(val, file_name), false);

        out.push_str(&format!(
            "UPB_INLINE void {m}_{name}_clear({m}* msg) {{ _upb_msg_map_clear(msg, {offset}); }}\n"
        ));

        out.push_str(&format!(
            "UPB_INLINE bool {m}_{name}_set({m}* msg, {key_type} key, {val_type} val, upb_Arena* a) {{\n"
        ));
        out.push_str(&format!(
            "  return _upb_msg_map_set(msg, {offset}, &key, {}, &val, {}, a);\n",
            sizeof_or_zero(key, "key"),
            sizeof_or_zero(val, "val"),
        ));
        out.push_str("}\n");

        out.push_str(&format!(
            "UPB_INLINE bool {m}_{name}_delete({m}* msg, {key_type} key) {{\n"
        ));
        out.push_str(&format!(
            "  return _upb_msg_map_delete(msg, {offset}, &key, {});\n",
            sizeof_or_zero(key, "key"),
        ));
        out.push_str("}\n");

        out.push_str(&format!(
            "UPB_INLINE {} {m}_{name}_nextmutable({m}* msg, size_t* iter) {{\n",
            ctype(&r, false)
        ));
        out.push_str(&format!(
            "  return ({})_upb_msg_map_next(msg, {offset}, iter);\n",
            ctype(&r, false)
        ));
        out.push_str("}\n");
        return;
    }

    if field.is_repeated() {
        repeated_setters(m, field, &r, &offset, out);
        return;
    }

    // Map entry keys cannot be mutated.
    if msg.is_map_entry() && field.number() == 1 {
        return;
    }

    out.push_str(&format!(
        "UPB_INLINE void {m}_set_{name}({m} *msg, {} value) {{\n",
        ctype(&r, false)
    ));
    if msg.is_map_entry() {
        let size = if field.field_type().is_string_kind() {
            "0".to_owned()
        } else {
            format!("sizeof({})", ctype(&r, false))
        };
        out.push_str(&format!("  _upb_msg_map_set_value(msg, &value, {size});\n"));
    } else if let Some(oneof) = field.oneof() {
        out.push_str(&format!(
            "  UPB_WRITE_ONEOF(msg, {}, {offset}, value, {}, {});\n",
            ctype(&r, false),
            size_pair(msg.oneofs()[oneof].case_offset()),
            field.number(),
        ));
    } else {
        if let Some(index) = field.hasbit() {
            out.push_str(&format!("  _upb_sethas(msg, {});\n", index + 1));
        }
        out.push_str(&format!(
            "  *UPB_PTR_AT(msg, {offset}, {}) = value;\n",
            ctype(&r, false)
        ));
    }
    out.push_str("}\n");

    // Singular sub-messages also get a mutable accessor that creates the
    // sub-message on demand.
    if field.field_type().is_sub_message() && !msg.is_map_entry() {
        let (fqname, cross) = r.target.as_ref().expect("sub-message fields are linked after commit");
        let target = names::message_name(fqname);
        let s = if *cross { "struct " } else { "" };
        out.push_str(&format!(
            "UPB_INLINE {s}{target}* {m}_mutable_{name}({m}* msg, upb_Arena* arena) {{\n"
        ));
        out.push_str(&format!(
            "  {s}{target}* sub = ({s}{target}*){m}_{name}(msg);\n"
        ));
        out.push_str("  if (sub == NULL) {\n");
        out.push_str(&format!(
            "    sub = ({s}{target}*)_upb_Message_New(&{}, arena);\n",
            names::message_init(fqname)
        ));
        out.push_str("    if (!sub) return NULL;\n");
        out.push_str(&format!("    {m}_set_{name}(msg, sub);\n"));
        out.push_str("  }\n");
        out.push_str("  return sub;\n");
        out.push_str("}\n");
    }
}

fn repeated_setters(m: &str, field: &FieldDef, r: &TypeRef<'_>, offset: &str, out: &mut String) {
    let name = field.name();
    out.push_str(&format!(
        "UPB_INLINE {}* {m}_mutable_{name}({m}* msg, size_t* len) {{\n",
        ctype(r, false)
    ));
    out.push_str(&format!(
        "  return ({}*)_upb_array_mutable_accessor(msg, {offset}, len);\n",
        ctype(r, false)
    ));
    out.push_str("}\n");

    out.push_str(&format!(
        "UPB_INLINE {}* {m}_resize_{name}({m}* msg, size_t len, upb_Arena* arena) {{\n",
        ctype(r, false)
    ));
    out.push_str(&format!(
        "  return ({}*)_upb_Array_Resize_accessor2(msg, {offset}, len, {}, arena);\n",
        ctype(r, false),
        size_lg2(r),
    ));
    out.push_str("}\n");

    if field.field_type().is_sub_message() {
        let (fqname, cross) = r.target.as_ref().expect("sub-message fields are linked after commit");
        let target = names::message_name(fqname);
        let s = if *cross { "struct " } else { "" };
        out.push_str(&format!(
            "UPB_INLINE {s}{target}* {m}_add_{name}({m}* msg, upb_Arena* arena) {{\n"
        ));
        out.push_str(&format!(
            "  {s}{target}* sub = ({s}{target}*)_upb_Message_New(&{}, arena);\n",
            names::message_init(fqname)
        ));
        out.push_str(&format!(
            "  bool ok = _upb_Array_Append_accessor2(msg, {offset}, {}, &sub, arena);\n",
            size_lg2(r),
        ));
        out.push_str("  if (!ok) return NULL;\n");
        out.push_str("  return sub;\n");
        out.push_str("}\n");
    } else {
        out.push_str(&format!(
            "UPB_INLINE bool {m}_add_{name}({m}* msg, {} val, upb_Arena* arena) {{\n",
            ctype(r, false)
        ));
        out.push_str(&format!(
            "  return _upb_Array_Append_accessor2(msg, {offset}, {}, &val, arena);\n",
            size_lg2(r),
        ));
        out.push_str("}\n");
    }
}

fn extension_in_header(ext: &ExtensionInfo, file_name: &str, out: &mut String) {
    let base = &ext.ident_base;
    let name = &ext.descriptor.name;
    let extendee = names::message_name(&ext.extendee);
    let layout_name = ext.layout_name();
    let r = TypeRef::of_extension(ext, file_name);

    out.push_str(&format!(
        "UPB_INLINE bool {base}_has_{name}(const struct {extendee}* msg) {{\n"
    ));
    out.push_str(&format!(
        "  return _upb_Message_Getext(msg, &{layout_name}) != NULL;\n"
    ));
    out.push_str("}\n");

    out.push_str(&format!(
        "UPB_INLINE void {base}_clear_{name}(struct {extendee}* msg) {{\n"
    ));
    out.push_str(&format!("  _upb_Message_Clearext(msg, &{layout_name});\n"));
    out.push_str("}\n");

    if ext.descriptor.label == Label::Repeated {
        // Repeated extension values go through the runtime's generic array
        // API; no specialized accessors exist for them.
    } else if ext.descriptor.field_type.is_sub_message() {
        let t = ctype(&r, true);
        out.push_str(&format!(
            "UPB_INLINE {t} {base}_{name}(const struct {extendee}* msg) {{\n"
        ));
        out.push_str(&format!(
            "  const upb_Message_Extension* ext = _upb_Message_Getext(msg, &{layout_name});\n"
        ));
        out.push_str("  UPB_ASSERT(ext);\n");
        out.push_str(&format!("  return *UPB_PTR_AT(&ext->data, 0, {t});\n"));
        out.push_str("}\n");

        out.push_str(&format!(
            "UPB_INLINE void {base}_set_{name}(struct {extendee}* msg, {t} ext, upb_Arena* arena) {{\n"
        ));
        out.push_str("  const upb_Message_Extension* msg_ext =\n");
        out.push_str(&format!(
            "      _upb_Message_GetOrCreateExtension(msg, &{layout_name}, arena);\n"
        ));
        out.push_str("  UPB_ASSERT(msg_ext);\n");
        out.push_str(&format!("  *UPB_PTR_AT(&msg_ext->data, 0, {t}) = ext;\n"));
        out.push_str("}\n");
    } else {
        let t = ctype(&r, true);
        out.push_str(&format!(
            "UPB_INLINE {t} {base}_{name}(const struct {extendee}* msg) {{\n"
        ));
        out.push_str(&format!(
            "  const upb_Message_Extension* ext = _upb_Message_Getext(msg, &{layout_name});\n"
        ));
        out.push_str(&format!(
            "  return ext ? *UPB_PTR_AT(&ext->data, 0, {t}) : {};\n",
            default_literal(&r)
        ));
        out.push_str("}\n");
    }
}
