//! Common test utilities and helpers.
//!
//! Model builders shared by the integration tests.
#![allow(dead_code)]

pub mod test_utils;

use typegraft::model::{
    Architecture, Argument, Binary, CabiFunctionType, DefinitionData, DefinitionReference,
    EnumEntry, Function, NamedTypedRegister, RawFunctionType, Register, StructField, Type,
    TypeDefinition, TypeDefinitionKey, UnionField,
};
use typegraft::Abi;

/// Key of a freshly recorded definition.
pub fn record(model: &mut Binary, definition: TypeDefinition) -> TypeDefinitionKey {
    model
        .record_new_type(definition)
        .key()
        .expect("record_new_type returns a set reference")
}

/// `struct Foo { Bar state; }` where `enum Bar : uint32_t { Off, On }`.
///
/// Returns the model and the keys of `Foo` and `Bar`.
pub fn foo_bar_model() -> (Binary, TypeDefinitionKey, TypeDefinitionKey) {
    let mut model = Binary::new(Architecture::X86_64);
    let bar = record(
        &mut model,
        TypeDefinition::new_enum(
            Type::unsigned(4),
            vec![EnumEntry::new(0, "Off"), EnumEntry::new(1, "On")],
        )
        .with_custom_name("Bar"),
    );
    let foo = record(
        &mut model,
        TypeDefinition::new_struct(4, vec![StructField::new(0, Type::defined(bar)).named("state")])
            .with_custom_name("Foo"),
    );
    (model, foo, bar)
}

/// Keys of the interesting definitions in [`linked_list_model`].
pub struct LinkedList {
    pub node: TypeDefinitionKey,
    pub payload: TypeDefinitionKey,
    pub size_t: TypeDefinitionKey,
    pub visit: TypeDefinitionKey,
    pub unrelated: TypeDefinitionKey,
}

/// A self-referencing list node, a union payload, a typedef, a prototype
/// walking the list and an unrelated struct.
pub fn linked_list_model() -> (Binary, LinkedList) {
    let mut model = Binary::new(Architecture::X86_64);

    let size_t = record(
        &mut model,
        TypeDefinition::new_typedef(Type::unsigned(8)).with_original_name("size_t"),
    );
    let payload = record(
        &mut model,
        TypeDefinition::new(DefinitionData::Union(typegraft::model::UnionDefinition {
            fields: vec![
                UnionField {
                    index: 0,
                    custom_name: "as_size".to_string(),
                    original_name: String::new(),
                    field_type: Type::defined(size_t),
                },
                UnionField {
                    index: 1,
                    custom_name: String::new(),
                    original_name: "as_double".to_string(),
                    field_type: Type::float(8),
                },
            ],
        }))
        .with_custom_name("Payload"),
    );

    // The node refers to itself, so its key must be known up front.
    let node = TypeDefinitionKey::new(10, typegraft::TypeDefinitionKind::Struct);
    record(
        &mut model,
        TypeDefinition::new_struct(
            16,
            vec![
                StructField::new(0, Type::pointer_to(Type::defined(node), 8)).named("next"),
                StructField::new(8, Type::defined(payload)).named("value"),
            ],
        )
        .with_id(node.id)
        .with_custom_name("Node")
        .with_original_name("list_node"),
    );

    let visit = record(
        &mut model,
        TypeDefinition::new(DefinitionData::CabiFunction(CabiFunctionType {
            abi: Abi::SystemVX86_64,
            return_type: Type::defined(size_t),
            arguments: vec![Argument::new(0, Type::pointer_to(Type::defined(node), 8))],
        }))
        .with_custom_name("visit_fn"),
    );

    let unrelated = record(
        &mut model,
        TypeDefinition::new_struct(8, vec![StructField::new(0, Type::signed(8))])
            .with_custom_name("Unrelated"),
    );

    model
        .functions
        .push(Function::new(0x401000, DefinitionReference::new(visit)));

    (
        model,
        LinkedList {
            node,
            payload,
            size_t,
            visit,
            unrelated,
        },
    )
}

/// Register-level prototype with the given argument and return registers.
pub fn raw_function(
    arguments: &[(Register, Type)],
    return_values: &[(Register, Type)],
) -> TypeDefinition {
    let bind = |list: &[(Register, Type)]| -> Vec<NamedTypedRegister> {
        list.iter()
            .map(|(register, ty)| NamedTypedRegister::new(*register, ty.clone()))
            .collect()
    };
    TypeDefinition::new(DefinitionData::RawFunction(RawFunctionType {
        arguments: bind(arguments),
        return_values: bind(return_values),
        preserved_registers: Vec::new(),
        final_stack_offset: 8,
        stack_arguments_type: None,
    }))
}

/// Calling-convention level prototype.
pub fn cabi_function(abi: Abi, return_type: Type, arguments: &[Type]) -> TypeDefinition {
    TypeDefinition::new(DefinitionData::CabiFunction(CabiFunctionType {
        abi,
        return_type,
        arguments: arguments
            .iter()
            .enumerate()
            .map(|(index, ty)| Argument::new(index as u64, ty.clone()))
            .collect(),
    }))
}

/// Every non-empty reference in `model`.
pub fn all_references(model: &Binary) -> Vec<TypeDefinitionKey> {
    let mut keys = Vec::new();
    model.visit_references(&mut |reference| keys.extend(reference.key()));
    keys
}
