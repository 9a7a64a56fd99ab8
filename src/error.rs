//! Error types for the typegraft model toolkit.
//!
//! Recoverable failures (bad input models, unknown names, I/O) are reported
//! through [`ModelError`]. Broken internal invariants are not errors: they
//! panic, because they mean the model was corrupted by a logic defect.

use thiserror::Error;

use crate::model::TypeDefinitionKey;

/// Main error type for model operations.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A key was looked up that the model does not contain
    #[error("Type definition not found: {0}")]
    DefinitionNotFound(TypeDefinitionKey),

    /// A reference points at a definition the model does not contain
    #[error("Dangling reference from {from} to {to}")]
    DanglingReference {
        from: String,
        to: TypeDefinitionKey,
    },

    /// Two definitions share the same numeric ID
    #[error("Duplicate type definition ID: {0}")]
    DuplicateId(u64),

    /// A definition carries an ID the model cannot accept
    #[error("Invalid type definition ID for {0}")]
    InvalidId(TypeDefinitionKey),

    /// A definition is structurally malformed
    #[error("Invalid definition {key}: {reason}")]
    InvalidDefinition {
        key: TypeDefinitionKey,
        reason: String,
    },

    /// An ABI or register set does not belong to the model's architecture
    #[error("Architecture mismatch: {0}")]
    ArchitectureMismatch(String),

    /// ABI name could not be parsed
    #[error("Unknown ABI: {0}")]
    UnknownAbi(String),

    /// Register name could not be parsed
    #[error("Unknown register: {0}")]
    UnknownRegister(String),

    /// Type definition kind name could not be parsed
    #[error("Unknown type definition kind: {0}")]
    UnknownKind(String),

    /// Requested pass is not registered
    #[error("Unknown pass: {0}")]
    UnknownPass(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for model operations
pub type Result<T> = std::result::Result<T, ModelError>;
