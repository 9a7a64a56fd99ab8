use typegraft::model::{
    Architecture, Binary, DefinitionReference, Function, Register, StructField, Type,
    TypeDefinition,
};
use typegraft::passes::{convert_all_functions_to_cabi, convert_all_functions_to_raw, run_pass};
use typegraft::{Abi, PassConfig, TypeDefinitionKey, TypeDefinitionKind};

use crate::common::{all_references, cabi_function, linked_list_model, raw_function, record};

fn bindings(model: &Binary, key: &TypeDefinitionKey) -> (Vec<(Register, Type)>, Vec<(Register, Type)>) {
    let raw = model.get(key).unwrap().as_raw_function().unwrap();
    let pairs = |list: &[typegraft::model::NamedTypedRegister]| {
        list.iter()
            .map(|r| (r.location, r.register_type.clone()))
            .collect::<Vec<_>>()
    };
    (pairs(&raw.arguments), pairs(&raw.return_values))
}

#[test]
fn raw_to_cabi_to_raw_preserves_bindings() {
    let mut model = Binary::new(Architecture::X86_64);
    let point = record(&mut model, TypeDefinition::new_struct(16, vec![]));
    let arguments = vec![
        (Register::Rdi, Type::signed(8)),
        (Register::Rsi, Type::pointer_to(Type::defined(point), 8)),
        (Register::Xmm0, Type::float(8)),
    ];
    let returns = vec![(Register::Rax, Type::signed(4))];
    let key = record(&mut model, raw_function(&arguments, &returns));

    let summary = convert_all_functions_to_cabi(&mut model, None);
    assert_eq!(summary.converted, 1);
    let cabi_key = TypeDefinitionKey::new(key.id, TypeDefinitionKind::CabiFunction);
    let cabi = model.get(&cabi_key).unwrap().as_cabi_function().unwrap();
    assert_eq!(cabi.arguments.len(), 3);
    assert_eq!(cabi.return_type, Type::signed(4));

    let summary = convert_all_functions_to_raw(&mut model);
    assert_eq!(summary.converted, 1);
    assert!(summary.output_valid);

    let (new_arguments, new_returns) = bindings(&model, &key);
    assert_eq!(new_arguments, arguments);
    assert_eq!(new_returns, returns);
}

#[test]
fn cabi_to_raw_to_cabi_through_the_stack() {
    let mut model = Binary::new(Architecture::X86_64);
    let point = record(&mut model, TypeDefinition::new_struct(12, vec![]));
    let mut arguments: Vec<Type> = (0..7).map(|_| Type::signed(8)).collect();
    arguments.push(Type::defined(point));
    arguments.push(Type::unsigned(4));
    let key = record(
        &mut model,
        cabi_function(Abi::SystemVX86_64, Type::float(8), &arguments),
    );

    let summary = convert_all_functions_to_raw(&mut model);
    assert_eq!(summary.converted, 1);
    assert!(summary.output_valid);

    let raw_key = TypeDefinitionKey::new(key.id, TypeDefinitionKind::RawFunction);
    let raw = model.get(&raw_key).unwrap().as_raw_function().unwrap();
    assert_eq!(raw.arguments.len(), 6);
    assert_eq!(raw.return_values[0].location, Register::Xmm0);
    let stack_key = raw.stack_arguments_type.as_ref().unwrap().definition().unwrap();
    let stack = model.get(&stack_key).unwrap().as_struct().unwrap();
    let offsets: Vec<u64> = stack.fields.iter().map(|f| f.offset).collect();
    assert_eq!(offsets, vec![0, 8, 24]);
    assert_eq!(stack.size, 32);

    let summary = convert_all_functions_to_cabi(&mut model, Some(Abi::SystemVX86_64));
    assert_eq!(summary.converted, 1);
    let back = model.get(&key).unwrap().as_cabi_function().unwrap();
    let types: Vec<Type> = back.arguments.iter().map(|a| a.argument_type.clone()).collect();
    assert_eq!(types, arguments);
    assert_eq!(back.return_type, Type::float(8));
    assert!(model.verify());
}

#[test]
fn references_follow_the_converted_definition() {
    let (mut model, keys) = linked_list_model();
    let holder = record(
        &mut model,
        TypeDefinition::new_struct(
            8,
            vec![StructField::new(0, Type::pointer_to(Type::defined(keys.visit), 8))],
        ),
    );

    let summary = convert_all_functions_to_raw(&mut model);
    assert_eq!(summary.converted, 1);
    assert!(summary.output_valid);

    let new_visit = TypeDefinitionKey::new(keys.visit.id, TypeDefinitionKind::RawFunction);
    assert!(!model.contains(&keys.visit));
    assert!(model.contains(&new_visit));
    assert_eq!(model.functions[0].prototype.key(), Some(new_visit));

    let field = &model.get(&holder).unwrap().as_struct().unwrap().fields[0];
    assert_eq!(field.field_type.definition(), Some(new_visit));
    assert!(!all_references(&model).contains(&keys.visit));

    let raw = model.get(&new_visit).unwrap();
    assert_eq!(raw.custom_name, "visit_fn");
    let raw = raw.as_raw_function().unwrap();
    assert_eq!(raw.arguments[0].location, Register::Rdi);
    assert_eq!(raw.return_values[0].location, Register::Rax);
    assert_eq!(raw.return_values[0].register_type, Type::defined(keys.size_t));
}

#[test]
fn raw_seven_becomes_cabi_seven() {
    let mut model = Binary::new(Architecture::X86_64);
    model.record_new_type(
        raw_function(
            &[(Register::Rdi, Type::signed(8))],
            &[(Register::Rax, Type::signed(8))],
        )
        .with_id(7),
    );
    model.functions.push(Function::new(
        0x1000,
        DefinitionReference::new(TypeDefinitionKey::new(7, TypeDefinitionKind::RawFunction)),
    ));

    let summary = run_pass(
        "convert-all-raw-functions-to-cabi",
        &mut model,
        &PassConfig::with_abi(Abi::SystemVX86_64),
    )
    .unwrap();
    assert_eq!(summary.converted, 1);

    let seven = TypeDefinitionKey::new(7, TypeDefinitionKind::CabiFunction);
    let cabi = model.get(&seven).unwrap().as_cabi_function().unwrap();
    assert_eq!(cabi.abi, Abi::SystemVX86_64);
    assert_eq!(cabi.return_type, Type::signed(8));
    assert_eq!(cabi.arguments[0].argument_type, Type::signed(8));
    assert_eq!(model.functions[0].prototype.key(), Some(seven));
    assert_eq!(model.type_definitions.len(), 1);
}

#[test]
fn aarch64_models_default_to_aapcs64() {
    let mut model = Binary::new(Architecture::AArch64);
    let key = record(
        &mut model,
        raw_function(
            &[(Register::X0, Type::signed(8)), (Register::V0, Type::float(4))],
            &[(Register::X0, Type::unsigned(8))],
        ),
    );

    let summary = convert_all_functions_to_cabi(&mut model, None);
    assert_eq!(summary.converted, 1);
    let cabi_key = TypeDefinitionKey::new(key.id, TypeDefinitionKind::CabiFunction);
    let cabi = model.get(&cabi_key).unwrap().as_cabi_function().unwrap();
    assert_eq!(cabi.abi, Abi::Aapcs64);
    assert_eq!(cabi.arguments.len(), 2);
}

#[test]
fn inexpressible_prototypes_are_skipped() {
    let mut model = Binary::new(Architecture::X86_64);
    let two_returns = record(
        &mut model,
        raw_function(
            &[],
            &[(Register::Rax, Type::signed(8)), (Register::Rdx, Type::signed(8))],
        ),
    );
    let gap = record(
        &mut model,
        raw_function(&[(Register::Rdx, Type::signed(8))], &[]),
    );
    let fine = record(
        &mut model,
        raw_function(&[(Register::Rdi, Type::signed(8))], &[]),
    );

    let summary = convert_all_functions_to_cabi(&mut model, None);
    assert_eq!(summary.converted, 1);
    assert_eq!(summary.skipped, 2);
    assert!(summary.output_valid);
    assert!(model.contains(&two_returns));
    assert!(model.contains(&gap));
    assert!(!model.contains(&fine));
}

#[test]
fn foreign_abi_converts_nothing() {
    let mut model = Binary::new(Architecture::X86_64);
    let key = record(
        &mut model,
        raw_function(&[(Register::Rdi, Type::signed(8))], &[]),
    );
    let summary = convert_all_functions_to_cabi(&mut model, Some(Abi::Aapcs64));
    assert_eq!(summary.converted, 0);
    assert_eq!(summary.skipped, 1);
    assert!(model.contains(&key));
}
