use std::sync::Arc;

use crate::def::{Def, DefKind};
use crate::enums::EnumDef;
use crate::error::LinkFailure;
use crate::field::{FieldDef, FieldType, Label};
use crate::msg::MessageDef;
use crate::symtab::SymbolTable;
use crate::txn::SymbolTxn;

fn message(name: &str) -> MessageDef {
    MessageDef::new(name)
}

fn sub_field(name: &str, number: u32, type_name: &str) -> FieldDef {
    let mut f = FieldDef::new();
    f.set_name(name);
    f.set_number(number);
    f.set_type(FieldType::Message);
    f.set_label(Label::Optional);
    f.set_type_name(type_name);
    f
}

fn scalar_field(name: &str, number: u32) -> FieldDef {
    let mut f = FieldDef::new();
    f.set_name(name);
    f.set_number(number);
    f.set_type(FieldType::Int32);
    f
}

#[test]
fn commit_installs_and_freezes() {
    let table = SymbolTable::new();
    let mut txn = SymbolTxn::new();
    txn.add(Def::Message(message("pkg.M"))).unwrap();
    table.commit(&mut txn).unwrap();

    assert!(txn.is_empty());
    let def = table.lookup("pkg.M").unwrap();
    assert!(def.is_frozen());
    assert!(Arc::ptr_eq(&def.symtab().unwrap(), &table));
    assert_eq!(table.len(), 1);
}

#[test]
fn commit_links_within_the_batch() {
    let table = SymbolTable::new();

    let mut parent = message("pkg.Parent");
    parent.add_field(sub_field("child", 1, "Child")).unwrap();

    let mut txn = SymbolTxn::new();
    txn.add(Def::Message(parent)).unwrap();
    txn.add(Def::Message(message("pkg.Child"))).unwrap();
    table.commit(&mut txn).unwrap();

    let parent = table.lookup("pkg.Parent").unwrap();
    let child = parent
        .as_message()
        .unwrap()
        .field_by_name("child")
        .unwrap()
        .sub()
        .unwrap();
    assert_eq!(child.full_name(), "pkg.Child");
    assert_eq!(
        parent
            .as_message()
            .unwrap()
            .field_by_name("child")
            .unwrap()
            .sub_kind(),
        Some(DefKind::Message)
    );
}

#[test]
fn commit_links_against_the_existing_table() {
    let table = SymbolTable::new();
    let mut txn = SymbolTxn::new();
    txn.add(Def::Message(message("pkg.Child"))).unwrap();
    table.commit(&mut txn).unwrap();

    let mut parent = message("pkg.Parent");
    parent.add_field(sub_field("child", 1, "pkg.Child")).unwrap();
    let mut txn = SymbolTxn::new();
    txn.add(Def::Message(parent)).unwrap();
    table.commit(&mut txn).unwrap();

    let parent = table.lookup("pkg.Parent").unwrap();
    let sub = parent
        .as_message()
        .unwrap()
        .field_by_name("child")
        .unwrap()
        .sub()
        .unwrap();
    assert!(Arc::ptr_eq(&sub, &table.lookup("pkg.Child").unwrap()));
}

#[test]
fn nearest_scope_wins() {
    // Message A.B holds a field of type `B`; with both A.B and A.B.B
    // installed, the nested def shadows its ancestor.
    let table = SymbolTable::new();

    let mut outer = message("A.B");
    outer.add_field(sub_field("f", 1, "B")).unwrap();

    let mut txn = SymbolTxn::new();
    txn.add(Def::Message(outer)).unwrap();
    txn.add(Def::Message(message("A.B.B"))).unwrap();
    table.commit(&mut txn).unwrap();

    let outer = table.lookup("A.B").unwrap();
    let target = outer
        .as_message()
        .unwrap()
        .field_by_name("f")
        .unwrap()
        .sub()
        .unwrap();
    assert_eq!(target.full_name(), "A.B.B");
}

#[test]
fn resolution_law() {
    let table = SymbolTable::new();
    let mut txn = SymbolTxn::new();
    txn.add(Def::Message(message("a.D"))).unwrap();
    txn.add(Def::Message(message("a.b.c.D"))).unwrap();
    table.commit(&mut txn).unwrap();

    // First hit along a.b.c.D, a.b.D, a.D, D.
    let hit = table.resolve("a.b.c", "D").unwrap();
    assert_eq!(hit.full_name(), "a.b.c.D");

    let hit = table.resolve("a.b", "D").unwrap();
    assert_eq!(hit.full_name(), "a.D");

    // A leading dot skips the search.
    assert!(table.resolve("a.b.c", ".D").is_none());
    let hit = table.resolve("a.b.c", ".a.D").unwrap();
    assert_eq!(hit.full_name(), "a.D");
}

#[test]
fn unresolved_name_fails_commit_atomically() {
    let table = SymbolTable::new();

    let mut good = message("pkg.Good");
    good.add_field(scalar_field("x", 1)).unwrap();
    let mut bad = message("pkg.Bad");
    bad.add_field(sub_field("missing", 1, "Nowhere")).unwrap();

    let mut txn = SymbolTxn::new();
    txn.add(Def::Message(good)).unwrap();
    txn.add(Def::Message(bad)).unwrap();

    let err = table.commit(&mut txn).unwrap_err();
    assert_eq!(err.errors.len(), 1);
    assert_eq!(err.errors[0].symbol, "Nowhere");
    assert_eq!(err.errors[0].failure, LinkFailure::NotFound);

    // Nothing installed; the transaction keeps both defs for a retry.
    assert!(table.is_empty());
    assert_eq!(txn.len(), 2);

    // Supplying the missing def makes the same transaction commit.
    txn.add(Def::Message(message("pkg.Nowhere"))).unwrap();
    table.commit(&mut txn).unwrap();
    assert_eq!(table.len(), 3);
}

#[test]
fn kind_mismatch_fails_commit() {
    let table = SymbolTable::new();

    let mut m = message("pkg.M");
    let mut f = FieldDef::new();
    f.set_name("e");
    f.set_number(1);
    f.set_type(FieldType::Enum);
    f.set_type_name("pkg.NotAnEnum");
    m.add_field(f).unwrap();

    let mut txn = SymbolTxn::new();
    txn.add(Def::Message(m)).unwrap();
    txn.add(Def::Message(message("pkg.NotAnEnum"))).unwrap();

    let err = table.commit(&mut txn).unwrap_err();
    assert_eq!(
        err.errors[0].failure,
        LinkFailure::WrongKind {
            expected: DefKind::Enum,
            found: DefKind::Message,
        }
    );
    assert!(table.is_empty());
}

#[test]
fn failed_commit_leaves_previous_version_visible() {
    let table = SymbolTable::new();
    let mut txn = SymbolTxn::new();
    txn.add(Def::Message(message("M"))).unwrap();
    table.commit(&mut txn).unwrap();

    let mut v2 = message("M");
    v2.add_field(sub_field("f", 1, "Gone")).unwrap();
    let mut txn = SymbolTxn::new();
    txn.add(Def::Message(v2)).unwrap();
    assert!(table.commit(&mut txn).is_err());

    let current = table.lookup("M").unwrap();
    assert_eq!(current.as_message().unwrap().num_fields(), 0);
}

#[test]
fn getdefs_filters_by_kind() {
    let table = SymbolTable::new();
    let mut txn = SymbolTxn::new();
    txn.add(Def::Message(message("M"))).unwrap();
    txn.add(Def::Enum(EnumDef::new("E"))).unwrap();
    table.commit(&mut txn).unwrap();

    assert_eq!(table.getdefs(None).len(), 2);
    let msgs = table.getdefs(Some(DefKind::Message));
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].full_name(), "M");
    assert!(table.getdefs(Some(DefKind::Service)).is_empty());
}

#[test]
fn replaced_defs_are_retired_until_unreferenced() {
    let table = SymbolTable::new();
    let mut txn = SymbolTxn::new();
    txn.add(Def::Message(message("M"))).unwrap();
    table.commit(&mut txn).unwrap();

    // A reader takes a counted reference across the replacing commit.
    let old = table.lookup("M").unwrap();

    let mut v2 = message("M");
    v2.add_field(scalar_field("x", 1)).unwrap();
    let mut txn = SymbolTxn::new();
    txn.add(Def::Message(v2)).unwrap();
    table.commit(&mut txn).unwrap();

    // The reader still sees the old def; new lookups see the new one.
    assert_eq!(old.as_message().unwrap().num_fields(), 0);
    assert_eq!(
        table.lookup("M").unwrap().as_message().unwrap().num_fields(),
        1
    );

    assert_eq!(table.retired_count(), 1);
    table.gc();
    assert_eq!(table.retired_count(), 1, "held def must survive gc");

    drop(old);
    table.gc();
    assert_eq!(table.retired_count(), 0);
}

#[test]
fn gc_keeps_retired_defs_reachable_from_held_ones() {
    let table = SymbolTable::new();

    let mut parent = message("Parent");
    parent.add_field(sub_field("child", 1, "Child")).unwrap();
    let mut txn = SymbolTxn::new();
    txn.add(Def::Message(parent)).unwrap();
    txn.add(Def::Message(message("Child"))).unwrap();
    table.commit(&mut txn).unwrap();

    let held_parent = table.lookup("Parent").unwrap();

    // Replace both; only the old parent is externally held.
    let mut txn = SymbolTxn::new();
    let mut parent2 = message("Parent");
    parent2.add_field(sub_field("child", 1, "Child")).unwrap();
    txn.add(Def::Message(parent2)).unwrap();
    txn.add(Def::Message(message("Child"))).unwrap();
    table.commit(&mut txn).unwrap();
    assert_eq!(table.retired_count(), 2);

    // The old child is reachable from the held old parent, so gc must keep
    // both alive.
    table.gc();
    assert_eq!(table.retired_count(), 2);
    let old_child = held_parent
        .as_message()
        .unwrap()
        .field_by_name("child")
        .unwrap()
        .sub()
        .unwrap();
    assert_eq!(old_child.full_name(), "Child");

    drop(old_child);
    drop(held_parent);
    table.gc();
    assert_eq!(table.retired_count(), 0);
}

#[test]
fn dup_roundtrip_across_tables() {
    let table = SymbolTable::new();

    let mut parent = message("pkg.Parent");
    parent.add_field(sub_field("child", 1, "pkg.Child")).unwrap();
    parent.add_field(scalar_field("x", 2)).unwrap();
    let mut txn = SymbolTxn::new();
    txn.add(Def::Message(parent)).unwrap();
    txn.add(Def::Message(message("pkg.Child"))).unwrap();
    table.commit(&mut txn).unwrap();

    let original = table.lookup("pkg.Parent").unwrap();
    let original = original.as_message().unwrap();

    // The dup is mutable and carries name stubs instead of links.
    let copy = original.dup();
    assert_eq!(
        copy.field_by_name("child").unwrap().type_name(),
        Some("pkg.Child")
    );
    assert_eq!(
        copy.field_by_name("child").unwrap().sub_kind(),
        Some(DefKind::Unresolved)
    );

    // Re-committing into a fresh table yields a structurally equal def.
    let other = SymbolTable::new();
    let mut txn = SymbolTxn::new();
    txn.add(Def::Message(copy)).unwrap();
    txn.add(Def::Message(message("pkg.Child"))).unwrap();
    other.commit(&mut txn).unwrap();

    let copied = other.lookup("pkg.Parent").unwrap();
    let copied = copied.as_message().unwrap();
    assert_eq!(copied.num_fields(), original.num_fields());
    for f in original.fields() {
        let g = copied.field_by_name(f.name()).unwrap();
        assert_eq!(g.number(), f.number());
        assert_eq!(g.field_type(), f.field_type());
        assert_eq!(g.label(), f.label());
    }
    let relinked = copied.field_by_name("child").unwrap().sub().unwrap();
    assert!(Arc::ptr_eq(&relinked, &other.lookup("pkg.Child").unwrap()));
}

#[test]
fn commit_requires_type_names_on_sub_fields() {
    let table = SymbolTable::new();
    let mut m = message("M");
    let mut f = FieldDef::new();
    f.set_name("sub");
    f.set_number(1);
    f.set_type(FieldType::Message);
    m.add_field(f).unwrap();

    let mut txn = SymbolTxn::new();
    txn.add(Def::Message(m)).unwrap();
    let err = table.commit(&mut txn).unwrap_err();
    assert_eq!(err.errors[0].failure, LinkFailure::MissingTypeName);
}

#[test]
fn after_commit_no_sub_reference_stays_unresolved() {
    let table = SymbolTable::new();

    let mut m = message("M");
    m.add_field(sub_field("a", 1, "Other")).unwrap();
    let mut e = FieldDef::new();
    e.set_name("e");
    e.set_number(2);
    e.set_type(FieldType::Enum);
    e.set_type_name("E");
    m.add_field(e).unwrap();

    let mut enum_def = EnumDef::new("E");
    enum_def.add_value("ZERO", 0).unwrap();

    let mut txn = SymbolTxn::new();
    txn.add(Def::Message(m)).unwrap();
    txn.add(Def::Message(message("Other"))).unwrap();
    txn.add(Def::Enum(enum_def)).unwrap();
    table.commit(&mut txn).unwrap();

    for def in table.getdefs(Some(DefKind::Message)) {
        for f in def.as_message().unwrap().fields() {
            if let Some(kind) = f.sub_kind() {
                assert_ne!(kind, DefKind::Unresolved);
            }
        }
    }
}
