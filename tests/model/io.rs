use typegraft::copier::copy_types;
use typegraft::model::{Architecture, Binary};
use typegraft::passes::run_pass;
use typegraft::{ModelError, PassConfig, TypeDefinitionKind};

use crate::common::linked_list_model;
use crate::common::test_utils::{create_temp_file, save_to_temp};

#[test]
fn save_and_load_round_trip() {
    let (model, _) = linked_list_model();
    let file = save_to_temp(&model);

    let loaded = Binary::load(file.path()).unwrap();
    assert_eq!(loaded, model);
    assert!(loaded.verify());
}

#[test]
fn loaded_model_continues_id_allocation() {
    let (model, keys) = linked_list_model();
    let file = save_to_temp(&model);
    let loaded = Binary::load(file.path()).unwrap();

    let mut destination = loaded.clone();
    let copied = copy_types(&model, &mut destination, &[keys.node]).unwrap();
    let new_id = copied[0].key().unwrap().id;
    assert!(loaded.type_definitions.keys().all(|k| k.id < new_id));
    assert!(destination.verify());
}

#[test]
fn pass_on_loaded_model_survives_reload() {
    let (model, keys) = linked_list_model();
    let file = save_to_temp(&model);

    let mut loaded = Binary::load(file.path()).unwrap();
    let summary = run_pass(
        "convert-all-cabi-functions-to-raw",
        &mut loaded,
        &PassConfig::default(),
    )
    .unwrap();
    assert_eq!(summary.converted, 1);
    loaded.save(file.path()).unwrap();

    let reloaded = Binary::load(file.path()).unwrap();
    assert_eq!(reloaded, loaded);
    assert_eq!(
        reloaded.functions[0].prototype.key().map(|k| (k.id, k.kind)),
        Some((keys.visit.id, TypeDefinitionKind::RawFunction))
    );
}

#[test]
fn malformed_json_is_a_serialization_error() {
    let file = create_temp_file(br#"{"architecture": "X86_64", "type_definitions": [{"id": 1}]}"#);
    let err = Binary::load(file.path()).unwrap_err();
    assert!(matches!(err, ModelError::Serialization(_)));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Binary::load(dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(err, ModelError::Io(_)));
}

#[test]
fn minimal_document_loads() {
    let file = create_temp_file(br#"{"architecture": "AArch64"}"#);
    let model = Binary::load(file.path()).unwrap();
    assert_eq!(model.architecture, Architecture::AArch64);
    assert!(model.type_definitions.is_empty());
    assert!(model.verify());
}
