//! Type definition identity and identifier-based references.
//!
//! A definition is identified by its `(ID, Kind)` pair. References never
//! point at memory: they store the key and are resolved against whichever
//! model they are looked up in.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// The different kinds of type definitions in a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TypeDefinitionKind {
    /// C-style struct with fields at explicit offsets
    Struct,
    /// C-style union
    Union,
    /// Enumeration over an integer primitive
    Enum,
    /// Type alias
    Typedef,
    /// Function type expressed at the calling-convention level
    CabiFunction,
    /// Function type expressed at the register level
    RawFunction,
}

impl TypeDefinitionKind {
    pub fn value(&self) -> &'static str {
        match self {
            TypeDefinitionKind::Struct => "struct",
            TypeDefinitionKind::Union => "union",
            TypeDefinitionKind::Enum => "enum",
            TypeDefinitionKind::Typedef => "typedef",
            TypeDefinitionKind::CabiFunction => "cabi-function",
            TypeDefinitionKind::RawFunction => "raw-function",
        }
    }

    /// Check if this kind describes a function prototype.
    pub fn is_function(&self) -> bool {
        matches!(
            self,
            TypeDefinitionKind::CabiFunction | TypeDefinitionKind::RawFunction
        )
    }
}

impl fmt::Display for TypeDefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDefinitionKind::Struct => write!(f, "Struct"),
            TypeDefinitionKind::Union => write!(f, "Union"),
            TypeDefinitionKind::Enum => write!(f, "Enum"),
            TypeDefinitionKind::Typedef => write!(f, "Typedef"),
            TypeDefinitionKind::CabiFunction => write!(f, "CabiFunction"),
            TypeDefinitionKind::RawFunction => write!(f, "RawFunction"),
        }
    }
}

impl FromStr for TypeDefinitionKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "struct" => Ok(TypeDefinitionKind::Struct),
            "union" => Ok(TypeDefinitionKind::Union),
            "enum" => Ok(TypeDefinitionKind::Enum),
            "typedef" => Ok(TypeDefinitionKind::Typedef),
            "cabi-function" | "cabifunction" => Ok(TypeDefinitionKind::CabiFunction),
            "raw-function" | "rawfunction" => Ok(TypeDefinitionKind::RawFunction),
            _ => Err(ModelError::UnknownKind(s.to_string())),
        }
    }
}

/// Stable identity of a type definition within one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeDefinitionKey {
    pub id: u64,
    pub kind: TypeDefinitionKind,
}

impl TypeDefinitionKey {
    pub fn new(id: u64, kind: TypeDefinitionKind) -> Self {
        Self { id, kind }
    }
}

impl fmt::Display for TypeDefinitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.id, self.kind)
    }
}

/// Non-owning, possibly empty reference to a type definition.
///
/// Several references may alias the same key. Whether a reference resolves
/// depends on the model it is looked up in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DefinitionReference(Option<TypeDefinitionKey>);

impl DefinitionReference {
    pub fn new(key: TypeDefinitionKey) -> Self {
        Self(Some(key))
    }

    /// An unset reference.
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn key(&self) -> Option<TypeDefinitionKey> {
        self.0
    }

    /// Repoint this reference at another key.
    pub fn set(&mut self, key: TypeDefinitionKey) {
        self.0 = Some(key);
    }
}

impl From<TypeDefinitionKey> for DefinitionReference {
    fn from(key: TypeDefinitionKey) -> Self {
        Self::new(key)
    }
}

impl fmt::Display for DefinitionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(key) => write!(f, "/TypeDefinitions/{}", key),
            None => write!(f, "<empty>"),
        }
    }
}
