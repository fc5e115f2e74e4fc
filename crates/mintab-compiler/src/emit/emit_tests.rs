use indoc::indoc;

use crate::descriptor::FileDescriptor;
use crate::{Generator, GeneratorParams};

/// Run the generator over `jsons` (dependencies first, target last) and
/// return the header and source text.
fn generate(jsons: &[&str], params: &str) -> (String, String) {
    let files: Vec<FileDescriptor> = jsons
        .iter()
        .map(|j| serde_json::from_str(j).unwrap())
        .collect();
    let mut g = Generator::new();
    for file in &files[..files.len() - 1] {
        g.add_file(file).unwrap();
    }
    let params = GeneratorParams::parse(params).unwrap();
    let (mut header, mut source) = (Vec::new(), Vec::new());
    g.generate(files.last().unwrap(), &params, &mut header, &mut source)
        .unwrap();
    (
        String::from_utf8(header).unwrap(),
        String::from_utf8(source).unwrap(),
    )
}

const THREE_FIELDS: &str = r#"{
    "name": "t.proto",
    "messages": [{
        "name": "M",
        "fields": [
            {"name": "a", "number": 1, "type": "int32", "label": "required"},
            {"name": "b", "number": 2, "type": "string"},
            {"name": "c", "number": 3, "type": "int32", "label": "repeated"}
        ]
    }]
}"#;

#[test]
fn empty_message_source() {
    let (_, source) = generate(
        &[r#"{"name": "test.proto", "messages": [{"name": "M"}]}"#],
        "",
    );

    insta::assert_snapshot!(source.trim_end(), @r###"
    /* This file was generated by the mintab compiler from the input
     * file:
     *
     *     test.proto
     *
     * Do not edit -- your changes will be discarded when the file is
     * regenerated. */

    #include <stddef.h>
    #include "upb/internal/array.h"
    #include "upb/msg_internal.h"
    #include "test.upb.h"

    #include "upb/port_def.inc"

    const upb_MiniTable M_msg_init = {
      NULL,
      NULL,
      0, 0, kUpb_ExtMode_NonExtendable, 0, 255, 0,
    };

    static const upb_MiniTable *messages_layout[1] = {
      &M_msg_init,
    };

    const upb_MiniTable_File test_proto_upb_file_layout = {
      messages_layout,
      NULL,
      NULL,
      1,
      0,
      0,
    };

    #include "upb/port_undef.inc"
    "###);
}

#[test]
fn header_guard_and_includes() {
    let (header, _) = generate(
        &[r#"{"name": "dir/test.proto", "messages": [{"name": "M"}]}"#],
        "",
    );

    assert!(header.starts_with("/* This file was generated by the mintab compiler"));
    assert!(header.contains("#ifndef DIR_TEST_PROTO_UPB_H_"));
    assert!(header.contains("#define DIR_TEST_PROTO_UPB_H_"));
    assert!(header.contains("#include \"upb/decode_fast.h\""));
    assert!(header.contains("typedef struct M M;"));
    assert!(header.contains("extern const upb_MiniTable M_msg_init;"));
    assert!(header.contains("extern const upb_MiniTable_File dir_test_proto_upb_file_layout;"));
    assert!(header.trim_end().ends_with("#endif  /* DIR_TEST_PROTO_UPB_H_ */"));
}

#[test]
fn scalar_accessors() {
    let (header, _) = generate(&[THREE_FIELDS], "");

    // Hazzers use the shifted has-bit encoding (index 0 emits as 1).
    assert!(header.contains(
        "UPB_INLINE bool M_has_a(const M* msg) {\n  return _upb_hasbit(msg, 1);\n}\n"
    ));
    assert!(header.contains(
        "UPB_INLINE bool M_has_b(const M* msg) {\n  return _upb_hasbit(msg, 2);\n}\n"
    ));

    assert!(header.contains(
        "UPB_INLINE int32_t M_a(const M* msg) {\n  return *UPB_PTR_AT(msg, UPB_SIZE(12, 32), int32_t);\n}\n"
    ));
    assert!(header.contains(
        "UPB_INLINE void M_set_a(M *msg, int32_t value) {\n  _upb_sethas(msg, 1);\n  *UPB_PTR_AT(msg, UPB_SIZE(12, 32), int32_t) = value;\n}\n"
    ));
    assert!(header.contains(
        "  *UPB_PTR_AT(msg, UPB_SIZE(4, 8), upb_StringView) = upb_StringView_FromDataAndSize(NULL, 0);\n  _upb_clearhas(msg, 2);\n"
    ));

    // Repeated accessors: mutable / resize / add.
    assert!(header.contains(
        "UPB_INLINE int32_t const* M_c(const M* msg, size_t* len) {\n  return (int32_t const*)_upb_array_accessor(msg, UPB_SIZE(16, 24), len);\n}\n"
    ));
    assert!(header.contains("UPB_INLINE int32_t* M_mutable_c(M* msg, size_t* len) {"));
    assert!(header.contains(
        "  return (int32_t*)_upb_Array_Resize_accessor2(msg, UPB_SIZE(16, 24), len, 2, arena);\n"
    ));
    assert!(header.contains(
        "UPB_INLINE bool M_add_c(M* msg, int32_t val, upb_Arena* arena) {"
    ));
}

#[test]
fn message_lifecycle_functions() {
    let (header, _) = generate(&[THREE_FIELDS], "");
    assert!(header.contains("UPB_INLINE M* M_new(upb_Arena* arena) {"));
    assert!(header.contains(
        "UPB_INLINE M* M_parse(const char* buf, size_t size, upb_Arena* arena) {"
    ));
    assert!(header.contains("UPB_INLINE char* M_serialize_ex(const M* msg, int options,"));
}

#[test]
fn three_fields_source_tables() {
    let (_, source) = generate(&[THREE_FIELDS], "fasttable");

    assert!(source.contains("static const upb_MiniTable_Field M__fields[3] = {"));
    assert!(source.contains(
        "  {1, UPB_SIZE(12, 32), 1, kUpb_NoSub, 5, kUpb_FieldMode_Scalar | (kUpb_FieldRep_4Byte << kUpb_FieldRep_Shift)},\n"
    ));
    assert!(source.contains(
        "  {2, UPB_SIZE(4, 8), 2, kUpb_NoSub, 9, kUpb_FieldMode_Scalar | (kUpb_FieldRep_StringView << kUpb_FieldRep_Shift)},\n"
    ));
    assert!(source.contains(
        "  {3, UPB_SIZE(16, 24), 0, kUpb_NoSub, 5, kUpb_FieldMode_Array | (UPB_SIZE(kUpb_FieldRep_4Byte, kUpb_FieldRep_8Byte) << kUpb_FieldRep_Shift)},\n"
    ));

    assert!(source.contains(
        "  UPB_SIZE(20, 40), 3, kUpb_ExtMode_NonExtendable, 3, 24, 1,\n"
    ));

    assert!(source.contains("  UPB_FASTTABLE_INIT({\n"));
    assert!(source.contains("    {0x0000000000000000, &_upb_FastDecoder_DecodeGeneric},\n"));
    assert!(source.contains("    {0x0020000000000008, &upb_psv4_1bt},\n"));
    assert!(source.contains("    {0x0008000001000012, &upb_pss_1bt},\n"));
    assert!(source.contains("    {0x001800003f000018, &upb_prv4_1bt},\n"));
}

#[test]
fn oneof_discriminants_and_accessors() {
    let (header, _) = generate(
        &[r#"{
            "name": "t.proto",
            "messages": [{
                "name": "M",
                "oneofs": ["x"],
                "fields": [
                    {"name": "a", "number": 1, "type": "int32", "oneof_index": 0},
                    {"name": "b", "number": 2, "type": "int32", "oneof_index": 0}
                ]
            }]
        }"#],
        "",
    );

    assert!(header.contains(
        "typedef enum {\n  M_a = 1,\n  M_b = 2,\n  M_NOT_SET = 0\n} M_x_oneofcases;\n"
    ));
    assert!(header.contains(
        "UPB_INLINE M_x_oneofcases M_x_case(const M* msg) {\n  return (M_x_oneofcases)*UPB_PTR_AT(msg, 0, int32_t);\n}\n"
    ));
    // Getters read the case and fall back to the zero default.
    assert!(header.contains(
        "UPB_INLINE int32_t M_a(const M* msg) {\n  return UPB_READ_ONEOF(msg, int32_t, 4, 0, 1, _upb_Int32_FromI(0));\n}\n"
    ));
    assert!(header.contains(
        "UPB_INLINE bool M_has_b(const M* msg) {\n  return _upb_getoneofcase(msg, 0) == 2;\n}\n"
    ));
    assert!(header.contains(
        "  UPB_WRITE_ONEOF(msg, int32_t, 4, value, 0, 1);\n"
    ));
}

#[test]
fn submessage_accessors_and_forward_decls() {
    let dep = r#"{"name": "dep.proto", "messages": [{"name": "Other"}]}"#;
    let main = r#"{
        "name": "main.proto",
        "dependencies": ["dep.proto"],
        "messages": [{
            "name": "M",
            "fields": [
                {"name": "o", "number": 1, "type": "message", "type_name": ".Other"}
            ]
        }]
    }"#;
    let (header, source) = generate(&[dep, main], "");

    // Cross-file targets are forward-declared and referenced with `struct`.
    assert!(header.contains("struct Other;\n"));
    assert!(header.contains("extern const upb_MiniTable Other_msg_init;\n"));
    assert!(header.contains(
        "UPB_INLINE const struct Other* M_o(const M* msg) {"
    ));
    assert!(header.contains(
        "UPB_INLINE bool M_has_o(const M* msg) {\n  return _upb_has_submsg_nohasbit(msg, 0);\n}\n"
    ));
    assert!(header.contains("UPB_INLINE struct Other* M_mutable_o(M* msg, upb_Arena* arena) {"));

    assert!(source.contains("#include \"dep.upb.h\"\n"));
    assert!(source.contains("static const upb_MiniTable_Sub M_submsgs[1] = {\n  {.submsg = &Other_msg_init},\n};\n"));
}

#[test]
fn map_accessors() {
    let (header, _) = generate(
        &[r#"{
            "name": "t.proto",
            "syntax": "proto3",
            "messages": [{
                "name": "M",
                "fields": [{"name": "counts", "number": 1, "type": "message",
                            "type_name": "M.CountsEntry", "label": "repeated"}],
                "nested_messages": [{
                    "name": "CountsEntry",
                    "map_entry": true,
                    "fields": [
                        {"name": "key", "number": 1, "type": "string"},
                        {"name": "value", "number": 2, "type": "int32"}
                    ]
                }]
            }]
        }"#],
        "",
    );

    assert!(header.contains("UPB_INLINE size_t M_counts_size(const M* msg) {"));
    assert!(header.contains(
        "UPB_INLINE bool M_counts_get(const M* msg, upb_StringView key, int32_t* val) {"
    ));
    assert!(header.contains(
        "UPB_INLINE bool M_counts_set(M* msg, upb_StringView key, int32_t val, upb_Arena* a) {"
    ));
    assert!(header.contains("UPB_INLINE bool M_counts_delete(M* msg, upb_StringView key) {"));

    // Map entries only get getters plus a value setter; map entry messages
    // have no lifecycle functions.
    assert!(header.contains("  _upb_msg_map_key(msg, &ret, 0);\n"));
    assert!(header.contains("  _upb_msg_map_value(msg, &ret, sizeof(ret));\n"));
    assert!(header.contains(
        "UPB_INLINE void M_CountsEntry_set_value(M_CountsEntry *msg, int32_t value) {\n  _upb_msg_map_set_value(msg, &value, sizeof(int32_t));\n}\n"
    ));
    assert!(!header.contains("M_CountsEntry_set_key"));
    assert!(!header.contains("M_CountsEntry_new"));
}

#[test]
fn proto2_enums() {
    let (header, source) = generate(
        &[r#"{
            "name": "t.proto",
            "package": "pkg",
            "enums": [{"name": "Color", "values": [
                {"name": "RED", "number": 0},
                {"name": "BLUE", "number": 2}
            ]}]
        }"#],
        "",
    );

    assert!(header.contains(
        "typedef enum {\n  pkg_RED = 0,\n  pkg_BLUE = 2\n} pkg_Color;\n"
    ));
    assert!(header.contains("extern const upb_MiniTable_Enum pkg_Color_enum_init;\n"));

    assert!(source.contains(indoc! {"
        const upb_MiniTable_Enum pkg_Color_enum_init = {
            64,
            0,
            {
                0x5,
                0x0,
            },
        };
    "}));
    assert!(source.contains("static const upb_MiniTable_Enum *enums_layout[1] = {\n  &pkg_Color_enum_init,\n};\n"));
}

#[test]
fn proto3_enums_have_no_tables() {
    let (header, source) = generate(
        &[r#"{
            "name": "t.proto",
            "syntax": "proto3",
            "enums": [{"name": "E", "values": [{"name": "A", "number": 0}]}]
        }"#],
        "",
    );
    assert!(header.contains("typedef enum {\n  A = 0\n} E;\n"));
    assert!(!header.contains("upb_MiniTable_Enum"));
    assert!(!source.contains("enums_layout"));
}

#[test]
fn extensions() {
    let (header, source) = generate(
        &[r#"{
            "name": "t.proto",
            "package": "pkg",
            "messages": [{
                "name": "Base",
                "extension_ranges": [{"start": 100, "end": 200}]
            }],
            "extensions": [{
                "name": "ext1", "number": 100, "type": "int32", "extendee": "Base"
            }]
        }"#],
        "",
    );

    assert!(header.contains("extern const upb_MiniTable_Extension pkg_ext1_ext;\n"));
    assert!(header.contains(
        "UPB_INLINE bool pkg_has_ext1(const struct pkg_Base* msg) {\n  return _upb_Message_Getext(msg, &pkg_ext1_ext) != NULL;\n}\n"
    ));
    assert!(header.contains(
        "UPB_INLINE void pkg_clear_ext1(struct pkg_Base* msg) {\n  _upb_Message_Clearext(msg, &pkg_ext1_ext);\n}\n"
    ));
    assert!(header.contains(
        "  return ext ? *UPB_PTR_AT(&ext->data, 0, int32_t) : _upb_Int32_FromI(0);\n"
    ));

    assert!(source.contains(indoc! {"
        const upb_MiniTable_Extension pkg_ext1_ext = {
          {100, 0, 0, kUpb_NoSub, 5, kUpb_FieldMode_Scalar | kUpb_LabelFlags_IsExtension | (kUpb_FieldRep_4Byte << kUpb_FieldRep_Shift)},
          &pkg_Base_msg_init,
          {.submsg = NULL},
        };
    "}));
    assert!(source.contains(
        "static const upb_MiniTable_Extension *extensions_layout[1] = {\n  &pkg_ext1_ext,\n};\n"
    ));
    // Extendable mini-table mode.
    assert!(source.contains("kUpb_ExtMode_Extendable"));
}

#[test]
fn nonzero_defaults_guard_getters() {
    let (header, _) = generate(
        &[r#"{
            "name": "t.proto",
            "messages": [{
                "name": "M",
                "fields": [{"name": "n", "number": 1, "type": "int32",
                            "default": {"int32": 41}}]
            }]
        }"#],
        "",
    );
    assert!(header.contains(
        "  return M_has_n(msg) ? *UPB_PTR_AT(msg, 4, int32_t) : _upb_Int32_FromI(41);\n"
    ));
}

#[test]
fn unknown_parameter_is_rejected() {
    let err = GeneratorParams::parse("fastable").unwrap_err();
    assert_eq!(err.to_string(), "unknown parameter: fastable");
}
