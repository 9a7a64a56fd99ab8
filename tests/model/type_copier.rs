use std::collections::HashSet;

use typegraft::copier::{copy_types, TypeCopier};
use typegraft::model::{Architecture, Binary, EnumEntry, StructField, Type, TypeDefinition};
use typegraft::{TypeDefinitionKey, TypeDefinitionKind};

use crate::common::{all_references, foo_bar_model, linked_list_model, record};

#[test]
fn copy_foo_into_empty_model() {
    let (source, foo, _) = foo_bar_model();
    let mut destination = Binary::new(Architecture::X86_64);

    let mut copier = TypeCopier::new(&source, &mut destination);
    let copied = copier.copy_type_into(&foo).unwrap();
    copier.finalize();

    assert_eq!(destination.type_definitions.len(), 2);
    assert!(destination.verify());

    let new_foo = destination.resolve(&copied).unwrap();
    assert_eq!(new_foo.kind(), TypeDefinitionKind::Struct);
    assert_eq!(new_foo.custom_name, "");
    assert_eq!(new_foo.original_name, "Foo");

    let field = &new_foo.as_struct().unwrap().fields[0];
    assert_eq!(field.custom_name, "");
    assert_eq!(field.original_name, "state");

    let new_bar_key = field.field_type.definition().unwrap();
    let new_bar = destination.get(&new_bar_key).unwrap();
    assert_eq!(new_bar.kind(), TypeDefinitionKind::Enum);
    assert_eq!(new_bar.original_name, "Bar");
    let entries: Vec<&str> = new_bar
        .as_enum()
        .unwrap()
        .entries
        .iter()
        .map(|e| e.original_name.as_str())
        .collect();
    assert_eq!(entries, vec!["Off", "On"]);
}

#[test]
fn closure_is_complete_and_nothing_else_is_copied() {
    let (source, keys) = linked_list_model();
    let mut destination = Binary::new(Architecture::X86_64);

    let mut copier = TypeCopier::new(&source, &mut destination);
    copier.copy_type_into(&keys.visit).unwrap();
    let copied = copier.finalize();

    // visit_fn, Node, Payload, size_t
    assert_eq!(copied.len(), 4);
    assert!(!copied.contains_key(&keys.unrelated.id));
    assert_eq!(destination.type_definitions.len(), 4);

    for reference in all_references(&destination) {
        assert!(destination.contains(&reference), "{} dangles", reference);
    }
    assert!(destination.verify());
}

#[test]
fn self_reference_points_at_the_clone() {
    let (source, keys) = linked_list_model();
    let mut destination = Binary::new(Architecture::X86_64);

    let mut copier = TypeCopier::new(&source, &mut destination);
    let copied = copier.copy_type_into(&keys.node).unwrap();
    copier.finalize();

    let new_node = destination.resolve(&copied).unwrap();
    let next = &new_node.as_struct().unwrap().fields[0];
    assert_eq!(next.field_type.definition(), copied.key());
}

#[test]
fn copied_ids_do_not_collide_with_destination() {
    let (source, foo, _) = foo_bar_model();
    let (mut destination, _, _) = foo_bar_model();
    let before: HashSet<u64> = destination.type_definitions.keys().map(|k| k.id).collect();

    let mut copier = TypeCopier::new(&source, &mut destination);
    copier.copy_type_into(&foo).unwrap();
    let copied = copier.finalize();

    assert_eq!(destination.type_definitions.len(), 4);
    for new_id in copied.values() {
        assert!(!before.contains(new_id));
    }
    let ids: HashSet<u64> = destination.type_definitions.keys().map(|k| k.id).collect();
    assert_eq!(ids.len(), 4);
    assert!(destination.validate().is_ok());

    // The pre-existing Foo shares its source IDs with the copy but must not be rewritten.
    let old_foo = destination.get(&foo).unwrap().as_struct().unwrap();
    assert_eq!(
        old_foo.fields[0].field_type.definition(),
        Some(TypeDefinitionKey::new(1, TypeDefinitionKind::Enum))
    );
}

#[test]
fn scrubbed_enum_names_still_validate() {
    let mut source = Binary::new(Architecture::X86_64);
    let mut ready = EnumEntry::new(0, "Ready");
    ready.original_name = "STATE_0".to_string();
    let renamed = EnumEntry::new(1, "STATE_0");
    let state = record(
        &mut source,
        TypeDefinition::new_enum(Type::unsigned(4), vec![ready, renamed]),
    );
    assert!(source.validate().is_ok());

    let mut destination = Binary::new(Architecture::X86_64);
    copy_types(&source, &mut destination, &[state]).unwrap();
    assert!(destination.validate().is_ok());

    let summary = typegraft::passes::convert_all_functions_to_raw(&mut destination);
    assert!(summary.input_valid);
}

#[test]
fn copying_twice_is_idempotent() {
    let (source, foo, _) = foo_bar_model();
    let mut destination = Binary::new(Architecture::X86_64);

    let mut copier = TypeCopier::new(&source, &mut destination);
    let first = copier.copy_type_into(&foo).unwrap();
    let second = copier.copy_type_into(&foo).unwrap();
    assert_eq!(first, second);
    assert_eq!(copier.new_types().count(), 2);
    copier.finalize();

    assert_eq!(destination.type_definitions.len(), 2);
}

#[test]
fn shared_dependencies_are_copied_once() {
    let (mut source, foo, bar) = foo_bar_model();
    let baz = record(
        &mut source,
        TypeDefinition::new_struct(8, vec![StructField::new(4, Type::defined(bar))])
            .with_custom_name("Baz"),
    );
    let mut destination = Binary::new(Architecture::X86_64);

    let copied = copy_types(&source, &mut destination, &[foo, baz]).unwrap();
    assert_eq!(destination.type_definitions.len(), 3);

    let target_of = |key: TypeDefinitionKey| {
        destination.get(&key).unwrap().as_struct().unwrap().fields[0]
            .field_type
            .definition()
    };
    let from_foo = target_of(copied[0].key().unwrap());
    let from_baz = target_of(copied[1].key().unwrap());
    assert!(from_foo.is_some());
    assert_eq!(from_foo, from_baz);
}

#[test]
fn original_names_win_over_custom_names() {
    let (source, keys) = linked_list_model();
    let mut destination = Binary::new(Architecture::X86_64);

    let copied = copy_types(&source, &mut destination, &[keys.node]).unwrap();
    let node = destination.resolve(&copied[0]).unwrap();
    // Node carried both names: the recovered one is kept.
    assert_eq!(node.original_name, "list_node");
    assert_eq!(node.custom_name, "");

    let payload_key = node.as_struct().unwrap().fields[1]
        .field_type
        .definition()
        .unwrap();
    let payload = destination.get(&payload_key).unwrap();
    assert_eq!(payload.original_name, "Payload");

    for definition in destination.type_definitions.values() {
        assert!(definition.custom_name.is_empty());
    }
}

#[test]
fn source_model_is_not_modified() {
    let (source, keys) = linked_list_model();
    let snapshot = source.clone();
    let mut destination = Binary::new(Architecture::X86_64);

    copy_types(&source, &mut destination, &[keys.visit, keys.unrelated]).unwrap();
    assert_eq!(source, snapshot);
    assert!(destination.functions.is_empty());
}

#[test]
fn unknown_root_leaves_destination_untouched() {
    let (source, _, _) = foo_bar_model();
    let mut destination = Binary::new(Architecture::X86_64);
    let missing = TypeDefinitionKey::new(1234, TypeDefinitionKind::Typedef);

    let mut copier = TypeCopier::new(&source, &mut destination);
    assert!(copier.copy_type_into(&missing).is_err());
    copier.finalize();
    assert!(destination.type_definitions.is_empty());
}

#[test]
fn dangling_source_is_rejected_without_panicking() {
    let (mut source, foo, bar) = foo_bar_model();
    source.erase_type(&bar);
    let mut destination = Binary::new(Architecture::X86_64);

    let err = copy_types(&source, &mut destination, &[foo]).unwrap_err();
    assert!(matches!(err, typegraft::ModelError::DanglingReference { to, .. } if to == bar));
    assert!(destination.type_definitions.is_empty());
}
