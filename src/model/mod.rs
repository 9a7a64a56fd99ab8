//! Typed model of a binary's data and function types.
//!
//! The model is an in-memory document: a [`Binary`] owns every
//! [`TypeDefinition`], definitions refer to each other through
//! [`DefinitionReference`] keys, and passes transform it in place.

pub mod binary;
pub mod definition;
pub mod key;
pub mod register;
pub mod types;

pub use binary::{Binary, Function};
pub use definition::{
    Argument, CabiFunctionType, CustomAndOriginalName, DefinitionData, EnumDefinition, EnumEntry,
    NamedTypedRegister, RawFunctionType, StructDefinition, StructField, TypeDefinition,
    TypedefDefinition, UnionDefinition, UnionField,
};
pub use key::{DefinitionReference, TypeDefinitionKey, TypeDefinitionKind};
pub use register::{Architecture, Register, RegisterKind};
pub use types::{PrimitiveKind, Type};
