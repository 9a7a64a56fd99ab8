//! Bulk conversion of function prototypes between their calling-convention
//! level (`CabiFunction`) and register level (`RawFunction`) forms.
//!
//! A converted definition keeps its numeric ID under its new kind; every
//! reference in the model is migrated to the new key and the old definition
//! is erased.

use tracing::{debug, info, warn};

use crate::abi::{convert_to_raw, try_convert_to_cabi, Abi};
use crate::model::{Binary, DefinitionData, TypeDefinition, TypeDefinitionKey, TypeDefinitionKind};
use crate::span_trace;

/// Outcome of one bulk conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    /// Definitions replaced by their converted form
    pub converted: usize,
    /// Definitions left untouched because they were not expressible
    pub skipped: usize,
    /// Whether the input model verified; nothing is converted otherwise
    pub input_valid: bool,
    /// Whether the model verified after conversion
    pub output_valid: bool,
}

/// Repoint every reference to `old` at `new`, then erase `old`.
///
/// Afterwards nothing in `model` resolves to `old`.
pub fn replace_references(model: &mut Binary, old: &TypeDefinitionKey, new: &TypeDefinitionKey) {
    let mut replaced = 0usize;
    model.visit_references_mut(&mut |reference| {
        if reference.key() == Some(*old) {
            reference.set(*new);
            replaced += 1;
        }
    });
    model.erase_type(old);
    debug!(old = %old, new = %new, replaced, "migrated references");
}

/// Record `data` under the ID of `old`, carrying its names and comment, and
/// migrate the model to it.
fn replace_definition(model: &mut Binary, old: &TypeDefinitionKey, data: DefinitionData) {
    let Some(previous) = model.get(old) else {
        panic!("{} vanished during conversion", old)
    };
    let mut replacement = TypeDefinition::new(data).with_id(old.id);
    replacement.custom_name = previous.custom_name.clone();
    replacement.original_name = previous.original_name.clone();
    replacement.comment = previous.comment.clone();

    let new = model.record_new_type(replacement);
    let Some(new) = new.key() else {
        unreachable!("record_new_type returns a set reference")
    };
    replace_references(model, old, &new);
}

fn check_input(model: &Binary, direction: &str) -> bool {
    match model.validate() {
        Ok(()) => true,
        Err(error) => {
            warn!(%error, direction, "input model verification failed, nothing converted");
            false
        }
    }
}

fn check_output(model: &Binary, direction: &str) -> bool {
    match model.validate() {
        Ok(()) => true,
        Err(error) => {
            warn!(%error, direction, "result model verification failed");
            false
        }
    }
}

/// Convert every `CabiFunction` definition to a `RawFunction` one.
///
/// Lowering always succeeds; arguments passed on the stack produce a new
/// stack-arguments struct definition. An invalid input model is left
/// unchanged.
pub fn convert_all_functions_to_raw(model: &mut Binary) -> ConversionSummary {
    let span = span_trace!(
        "convert_all_functions_to_raw",
        definitions = model.type_definitions.len()
    );
    let _guard = span.enter();

    let mut summary = ConversionSummary::default();
    if !check_input(model, "to-raw") {
        return summary;
    }
    summary.input_valid = true;

    for key in model.keys_of_kind(TypeDefinitionKind::CabiFunction) {
        let Some(function) = model.get(&key).and_then(TypeDefinition::as_cabi_function) else {
            continue;
        };
        let function = function.clone();
        let raw = convert_to_raw(&function, model);
        replace_definition(model, &key, DefinitionData::RawFunction(raw));
        summary.converted += 1;
    }

    summary.output_valid = check_output(model, "to-raw");
    info!(
        converted = summary.converted,
        output_valid = summary.output_valid,
        "converted prototypes to raw"
    );
    summary
}

/// Convert every `RawFunction` definition expressible under `abi` to a
/// `CabiFunction` one.
///
/// `None` targets the model's default ABI. Definitions that cannot be
/// expressed are skipped. An invalid input model is left unchanged.
///
/// # Panics
///
/// Panics if a converted prototype returns a type whose definition is
/// missing from the model.
pub fn convert_all_functions_to_cabi(model: &mut Binary, abi: Option<Abi>) -> ConversionSummary {
    let abi = abi.unwrap_or_else(|| model.default_abi());
    let span = span_trace!(
        "convert_all_functions_to_cabi",
        abi = %abi,
        definitions = model.type_definitions.len()
    );
    let _guard = span.enter();

    let mut summary = ConversionSummary::default();
    if !check_input(model, "to-cabi") {
        return summary;
    }
    summary.input_valid = true;

    if abi.architecture() != model.architecture {
        warn!(
            %abi,
            architecture = %model.architecture,
            "target ABI does not match the model architecture"
        );
    }

    for key in model.keys_of_kind(TypeDefinitionKind::RawFunction) {
        let converted = match model.get(&key).and_then(TypeDefinition::as_raw_function) {
            Some(raw) => try_convert_to_cabi(raw, model, abi),
            None => continue,
        };
        let Some(function) = converted else {
            debug!(key = %key, %abi, "prototype not expressible, skipped");
            summary.skipped += 1;
            continue;
        };

        if let Some(returned) = function.return_type.definition() {
            assert!(
                model.contains(&returned),
                "return type {} of converted {} is not in the model",
                returned,
                key
            );
        }

        replace_definition(model, &key, DefinitionData::CabiFunction(function));
        summary.converted += 1;
    }

    summary.output_valid = check_output(model, "to-cabi");
    info!(
        converted = summary.converted,
        skipped = summary.skipped,
        output_valid = summary.output_valid,
        "converted prototypes to cabi"
    );
    summary
}
