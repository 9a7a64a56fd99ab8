//! Model passes and their registry.
//!
//! A pass transforms a [`Binary`] in place. Passes never fail the caller:
//! problems are logged and reported through the returned
//! [`ConversionSummary`].

pub mod convert_function_types;

use crate::config::PassConfig;
use crate::error::{ModelError, Result};
use crate::model::Binary;

pub use convert_function_types::{
    convert_all_functions_to_cabi, convert_all_functions_to_raw, replace_references,
    ConversionSummary,
};

/// A named, registered model pass.
#[derive(Debug, Clone, Copy)]
pub struct ModelPass {
    pub name: &'static str,
    pub description: &'static str,
    pub run: fn(&mut Binary, &PassConfig) -> ConversionSummary,
}

fn run_to_raw(model: &mut Binary, _config: &PassConfig) -> ConversionSummary {
    convert_all_functions_to_raw(model)
}

fn run_to_cabi(model: &mut Binary, config: &PassConfig) -> ConversionSummary {
    convert_all_functions_to_cabi(model, config.target_abi)
}

static PASSES: [ModelPass; 2] = [
    ModelPass {
        name: "convert-all-cabi-functions-to-raw",
        description: "Converts every CABI function type into a raw function type",
        run: run_to_raw,
    },
    ModelPass {
        name: "convert-all-raw-functions-to-cabi",
        description: "Converts as many raw function types as possible into CABI function types",
        run: run_to_cabi,
    },
];

/// Every registered pass, in registration order.
pub fn registered_passes() -> &'static [ModelPass] {
    &PASSES
}

pub fn find_pass(name: &str) -> Option<&'static ModelPass> {
    PASSES.iter().find(|pass| pass.name == name)
}

/// Run the pass called `name` on `model`.
pub fn run_pass(name: &str, model: &mut Binary, config: &PassConfig) -> Result<ConversionSummary> {
    let pass = find_pass(name).ok_or_else(|| ModelError::UnknownPass(name.to_string()))?;
    tracing::info!(pass = pass.name, "running model pass");
    Ok((pass.run)(model, config))
}
