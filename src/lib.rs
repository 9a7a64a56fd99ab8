//! typegraft: type model manipulation for binary analysis.
//!
//! - [`model`]: the type model of a binary
//! - [`copier`]: transplanting type definitions between models
//! - [`abi`]: calling conventions and prototype lowering/lifting
//! - [`passes`]: bulk model passes and their registry

/// Calling conventions
pub mod abi;
pub mod config;
/// Cross-model type copying
pub mod copier;
pub mod error;
pub mod logging;
/// Type model
pub mod model;
/// Model passes
pub mod passes;

pub use abi::Abi;
pub use config::{LoggingConfig, PassConfig, TypegraftConfig};
pub use copier::{copy_types, TypeCopier};
pub use error::{ModelError, Result};
pub use model::{Binary, DefinitionReference, TypeDefinition, TypeDefinitionKey, TypeDefinitionKind};
pub use passes::{run_pass, ConversionSummary};
