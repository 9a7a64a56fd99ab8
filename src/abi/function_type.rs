//! Conversion between calling-convention level and register level prototypes.

use tracing::trace;

use crate::abi::{classify, Abi, ArgumentAllocator, Location, ValueClass};
use crate::model::{
    Argument, Binary, CabiFunctionType, DefinitionData, NamedTypedRegister, RawFunctionType,
    StructField, Type, TypeDefinition,
};

/// Lower a calling-convention level prototype to registers.
///
/// Always succeeds. Arguments that do not fit in registers are described by
/// a new stack-arguments struct recorded into `model`.
pub fn convert_to_raw(function: &CabiFunctionType, model: &mut Binary) -> RawFunctionType {
    let abi = function.abi;
    let pointer_size = abi.architecture().pointer_size();
    let mut allocator = ArgumentAllocator::new(abi);
    let mut arguments = Vec::new();
    let mut return_values = Vec::new();
    let mut stack_fields = Vec::new();

    match classify(&function.return_type, model) {
        None => {}
        Some(ValueClass::Integer) => return_values.push(NamedTypedRegister::new(
            abi.integer_return_register(),
            function.return_type.clone(),
        )),
        Some(ValueClass::Float) => return_values.push(NamedTypedRegister::new(
            abi.vector_return_register(),
            function.return_type.clone(),
        )),
        Some(ValueClass::Memory) => {
            // Returned through a caller-provided buffer whose address comes
            // back in the integer return register.
            let pointer = Type::pointer_to(function.return_type.clone(), pointer_size);
            let location = match abi.indirect_return_register() {
                Some(register) => register,
                None => match allocator.allocate(ValueClass::Integer, pointer_size) {
                    Location::Register(register) => register,
                    Location::Stack { .. } => unreachable!("first argument slot is a register"),
                },
            };
            let mut hidden = NamedTypedRegister::new(location, pointer.clone());
            hidden.original_name = "return_buffer".to_string();
            arguments.push(hidden);
            return_values.push(NamedTypedRegister::new(
                abi.integer_return_register(),
                pointer,
            ));
        }
    }

    for argument in &function.arguments {
        let ty = &argument.argument_type;
        let class = classify(ty, model).unwrap_or(ValueClass::Memory);
        let size = ty.size(model).unwrap_or(pointer_size);
        match allocator.allocate(class, size) {
            Location::Register(register) => arguments.push(NamedTypedRegister {
                location: register,
                custom_name: argument.custom_name.clone(),
                original_name: argument.original_name.clone(),
                register_type: ty.clone(),
            }),
            Location::Stack { offset } => {
                let mut field = StructField::new(offset, ty.clone());
                field.custom_name = argument.custom_name.clone();
                field.original_name = argument.original_name.clone();
                stack_fields.push(field);
            }
        }
    }

    let stack_arguments_type = if stack_fields.is_empty() {
        None
    } else {
        let stack_struct = TypeDefinition::new_struct(allocator.stack_size(), stack_fields)
            .with_original_name("stack_arguments");
        let reference = model.record_new_type(stack_struct);
        trace!(stack_arguments = %reference, "recorded stack arguments struct");
        Some(Type::Defined {
            definition: reference,
            is_const: false,
        })
    };

    RawFunctionType {
        arguments,
        return_values,
        preserved_registers: abi.callee_saved_registers().to_vec(),
        final_stack_offset: abi.architecture().call_push_size(),
        stack_arguments_type,
    }
}

/// Lift a register level prototype to `abi`, if it is expressible there.
///
/// Every register argument must sit exactly where the ABI would put a value
/// of its type, stack arguments must sit at the ABI's offsets, and at most
/// one value may be returned, in the ABI's first return register.
pub fn try_convert_to_cabi(
    function: &RawFunctionType,
    model: &Binary,
    abi: Abi,
) -> Option<CabiFunctionType> {
    let architecture = abi.architecture();
    let registers = function
        .arguments
        .iter()
        .chain(function.return_values.iter());
    if registers
        .clone()
        .any(|r| r.location.architecture() != architecture)
    {
        return None;
    }
    if registers.clone().any(|r| {
        r.register_type
            .size(model)
            .map_or(true, |size| !r.location.can_contain(size))
    }) {
        return None;
    }

    let return_type = match function.return_values.as_slice() {
        [] => Type::void(),
        [value] => {
            let expected = match classify(&value.register_type, model)? {
                ValueClass::Integer => abi.integer_return_register(),
                ValueClass::Float => abi.vector_return_register(),
                ValueClass::Memory => return None,
            };
            if value.location != expected {
                return None;
            }
            value.register_type.clone()
        }
        _ => return None,
    };

    let mut allocator = ArgumentAllocator::new(abi);
    let mut arguments = Vec::new();

    for register in &function.arguments {
        let ty = &register.register_type;
        let class = classify(ty, model)?;
        if class == ValueClass::Memory {
            return None;
        }
        let size = ty.size(model)?;
        if allocator.allocate(class, size) != Location::Register(register.location) {
            return None;
        }
        let mut argument = Argument::new(arguments.len() as u64, ty.clone());
        argument.custom_name = register.custom_name.clone();
        argument.original_name = register.original_name.clone();
        arguments.push(argument);
    }

    if let Some(stack) = &function.stack_arguments_type {
        let key = stack.definition()?;
        let DefinitionData::Struct(layout) = &model.get(&key)?.data else {
            return None;
        };
        let mut fields: Vec<&StructField> = layout.fields.iter().collect();
        fields.sort_by_key(|f| f.offset);
        for field in fields {
            let ty = &field.field_type;
            let class = classify(ty, model)?;
            let size = ty.size(model)?;
            if allocator.allocate(class, size) != (Location::Stack { offset: field.offset }) {
                return None;
            }
            let mut argument = Argument::new(arguments.len() as u64, ty.clone());
            argument.custom_name = field.custom_name.clone();
            argument.original_name = field.original_name.clone();
            arguments.push(argument);
        }
    }

    Some(CabiFunctionType {
        abi,
        return_type,
        arguments,
    })
}
