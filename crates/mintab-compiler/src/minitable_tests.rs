use mintab_schema::Platform;

use crate::Generator;
use crate::descriptor::FileDescriptor;
use crate::file_layout::FileLayout;
use crate::minitable::{
    ExtMode, FieldKind, FieldRep, Presence, Sub, build_enum_table,
};

fn parse(json: &str) -> FileDescriptor {
    serde_json::from_str(json).unwrap()
}

fn generator_for(files: &[&FileDescriptor]) -> Generator {
    let mut g = Generator::new();
    for file in files {
        g.add_file(file).unwrap();
    }
    g
}

#[test]
fn empty_message() {
    let file = parse(r#"{"name": "t.proto", "messages": [{"name": "M"}]}"#);
    let g = generator_for(&[&file]);
    let layout = FileLayout::build(g.symtab(), &file, g.syntaxes(), false).unwrap();
    let (_, mt) = layout.messages().next().unwrap();

    assert_eq!(mt.field_count(), 0);
    assert_eq!(mt.size.p32, 0);
    assert_eq!(mt.size.p64, 0);
    assert_eq!(mt.required_count, 0);
    assert_eq!(mt.dense_below, 0);
    assert_eq!(mt.table_mask, 0xff);
    assert_eq!(mt.ext_mode, ExtMode::NonExtendable);
    assert!(mt.subs.is_empty());
}

#[test]
fn three_scalar_fields() {
    let file = parse(
        r#"{
            "name": "t.proto",
            "messages": [{
                "name": "M",
                "fields": [
                    {"name": "a", "number": 1, "type": "int32", "label": "required"},
                    {"name": "b", "number": 2, "type": "string"},
                    {"name": "c", "number": 3, "type": "int32", "label": "repeated"}
                ]
            }]
        }"#,
    );
    let g = generator_for(&[&file]);
    let layout = FileLayout::build(g.symtab(), &file, g.syntaxes(), false).unwrap();
    let (_, mt) = layout.messages().next().unwrap();

    assert_eq!(mt.field_count(), 3);
    assert_eq!(mt.dense_below, 3);
    assert_eq!(mt.required_count, 1);
    assert_eq!(mt.table_mask, 0xff);

    let numbers: Vec<u32> = mt.fields.iter().map(|f| f.number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);

    let a = mt.field_by_number(1).unwrap();
    assert_eq!(a.presence, Presence::Hasbit(0));
    assert_eq!(a.presence.encoded(Platform::P64), 1);
    assert_eq!(a.rep.p64, FieldRep::Byte4);
    assert_eq!(a.kind, FieldKind::Scalar);

    let b = mt.field_by_number(2).unwrap();
    assert_eq!(b.presence, Presence::Hasbit(1));
    assert_eq!(b.rep.p32, FieldRep::StringView);
    assert_eq!(b.rep.p64, FieldRep::StringView);

    let c = mt.field_by_number(3).unwrap();
    assert_eq!(c.presence, Presence::None);
    assert_eq!(c.presence.encoded(Platform::P32), 0);
    assert_eq!(c.kind, FieldKind::Array);
    assert_eq!(c.rep.p32, FieldRep::Byte4);
    assert_eq!(c.rep.p64, FieldRep::Byte8);

    assert_eq!(mt.size.p32, 20);
    assert_eq!(mt.size.p64, 40);
}

#[test]
fn dense_below_stops_at_the_first_gap() {
    let file = parse(
        r#"{
            "name": "t.proto",
            "messages": [{
                "name": "M",
                "fields": [
                    {"name": "a", "number": 1, "type": "int32"},
                    {"name": "b", "number": 2, "type": "int32"},
                    {"name": "c", "number": 5, "type": "int32"}
                ]
            }]
        }"#,
    );
    let g = generator_for(&[&file]);
    let layout = FileLayout::build(g.symtab(), &file, g.syntaxes(), false).unwrap();
    let (_, mt) = layout.messages().next().unwrap();
    assert_eq!(mt.dense_below, 2);
}

#[test]
fn extension_modes() {
    let file = parse(
        r#"{
            "name": "t.proto",
            "messages": [
                {"name": "Plain"},
                {"name": "Open", "extension_ranges": [{"start": 100, "end": 200}]},
                {"name": "Set", "extension_ranges": [{"start": 4, "end": 2147483647}],
                 "message_set_wire_format": true}
            ]
        }"#,
    );
    let g = generator_for(&[&file]);
    let layout = FileLayout::build(g.symtab(), &file, g.syntaxes(), false).unwrap();

    let modes: Vec<(String, ExtMode)> = layout
        .messages()
        .map(|(_, mt)| (mt.full_name.clone(), mt.ext_mode))
        .collect();
    assert_eq!(
        modes,
        vec![
            ("Open".to_owned(), ExtMode::Extendable),
            ("Plain".to_owned(), ExtMode::NonExtendable),
            ("Set".to_owned(), ExtMode::IsMessageSet),
        ]
    );
}

#[test]
fn closed_enum_field_keeps_its_sub() {
    let file = parse(
        r#"{
            "name": "t.proto",
            "enums": [{"name": "E", "values": [{"name": "A", "number": 0}]}],
            "messages": [{
                "name": "M",
                "fields": [{"name": "e", "number": 1, "type": "enum", "type_name": "E"}]
            }]
        }"#,
    );
    let g = generator_for(&[&file]);
    let layout = FileLayout::build(g.symtab(), &file, g.syntaxes(), false).unwrap();
    let (_, mt) = layout.messages().next().unwrap();

    let e = mt.field_by_number(1).unwrap();
    assert_eq!(e.descriptor_type, 14);
    assert!(!e.alternate);
    assert_eq!(e.sub_index, Some(0));
    assert_eq!(mt.subs, vec![Sub::Enum("E".to_owned())]);
}

#[test]
fn open_enum_field_decays_to_int32() {
    let file = parse(
        r#"{
            "name": "t.proto",
            "syntax": "proto3",
            "enums": [{"name": "E", "values": [{"name": "A", "number": 0}]}],
            "messages": [{
                "name": "M",
                "fields": [{"name": "e", "number": 1, "type": "enum", "type_name": "E"}]
            }]
        }"#,
    );
    let g = generator_for(&[&file]);
    let layout = FileLayout::build(g.symtab(), &file, g.syntaxes(), false).unwrap();
    let (_, mt) = layout.messages().next().unwrap();

    let e = mt.field_by_number(1).unwrap();
    assert_eq!(e.descriptor_type, 5);
    assert!(e.alternate);
    assert_eq!(e.sub_index, None);
    assert!(mt.subs.is_empty());
}

#[test]
fn map_fields_get_map_mode() {
    let file = parse(
        r#"{
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
        }"#,
    );
    let g = generator_for(&[&file]);
    let layout = FileLayout::build(g.symtab(), &file, g.syntaxes(), false).unwrap();

    let (_, mt) = layout
        .messages()
        .find(|(m, _)| m.full_name() == "M")
        .unwrap();
    let counts = mt.field_by_number(1).unwrap();
    assert_eq!(counts.kind, FieldKind::Map);
    assert_eq!(counts.sub_index, Some(0));
    assert_eq!(mt.subs, vec![Sub::Message("M.CountsEntry".to_owned())]);
}

#[test]
fn sub_indexes_follow_field_order() {
    let file = parse(
        r#"{
            "name": "t.proto",
            "enums": [{"name": "E", "values": [{"name": "A", "number": 0}]}],
            "messages": [
                {"name": "Child"},
                {"name": "M", "fields": [
                    {"name": "x", "number": 4, "type": "message", "type_name": "Child"},
                    {"name": "e", "number": 2, "type": "enum", "type_name": "E"},
                    {"name": "plain", "number": 1, "type": "int32"}
                ]}
            ]
        }"#,
    );
    let g = generator_for(&[&file]);
    let layout = FileLayout::build(g.symtab(), &file, g.syntaxes(), false).unwrap();
    let (_, mt) = layout
        .messages()
        .find(|(m, _)| m.full_name() == "M")
        .unwrap();

    // Ascending number order: field 2 (enum) takes sub 0, field 4 takes 1.
    assert_eq!(mt.field_by_number(1).unwrap().sub_index, None);
    assert_eq!(mt.field_by_number(2).unwrap().sub_index, Some(0));
    assert_eq!(mt.field_by_number(4).unwrap().sub_index, Some(1));
    assert_eq!(
        mt.subs,
        vec![Sub::Enum("E".to_owned()), Sub::Message("Child".to_owned())]
    );
}

#[test]
fn oneof_presence_is_the_complement_of_the_case_offset() {
    let file = parse(
        r#"{
            "name": "t.proto",
            "messages": [{
                "name": "M",
                "oneofs": ["x"],
                "fields": [
                    {"name": "a", "number": 1, "type": "int32", "oneof_index": 0},
                    {"name": "b", "number": 2, "type": "int32", "oneof_index": 0}
                ]
            }]
        }"#,
    );
    let g = generator_for(&[&file]);
    let layout = FileLayout::build(g.symtab(), &file, g.syntaxes(), false).unwrap();
    let (msg, mt) = layout.messages().next().unwrap();

    let case_offset = msg.oneofs()[0].case_offset();
    let a = mt.field_by_number(1).unwrap();
    let b = mt.field_by_number(2).unwrap();
    assert_eq!(a.presence, Presence::Oneof(case_offset));
    assert_eq!(a.presence, b.presence);
    assert_eq!(
        a.presence.encoded(Platform::P64),
        !(case_offset.p64 as i16)
    );
    assert!(a.presence.encoded(Platform::P64) < 0);
}

#[test]
fn enum_table_masks_small_values() {
    let table = build_enum_table("E", [0, 1, 5, 75, -1].into_iter());
    assert_eq!(table.mask_limit, 64);
    assert_eq!(table.value_count(), 2);
    // Out-of-window values are sorted; negatives keep their bit pattern.
    assert_eq!(table.values, vec![-1, 75]);
    assert_eq!(table.data_words(), vec![0x23, 0x0, 0xffffffff, 75]);
}

#[test]
fn enum_table_with_only_masked_values() {
    let table = build_enum_table("E", [0, 63].into_iter());
    assert_eq!(table.value_count(), 0);
    assert_eq!(table.data_words(), vec![0x1, 0x8000_0000]);
}
