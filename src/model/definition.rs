//! Type definitions: the nodes of a model's type graph.
//!
//! Every definition carries a `(ID, Kind)` identity, a user-assigned
//! `custom_name`, a name recovered from the binary (`original_name`) and a
//! kind-specific payload. [`TypeDefinition::edges`] lists every [`Type`] the
//! definition structurally references; reference visitation walks exactly
//! those types, so graph construction and reference rewriting always agree.

use serde::{Deserialize, Serialize};

use crate::abi::Abi;
use crate::model::binary::Binary;
use crate::model::key::{DefinitionReference, TypeDefinitionKey, TypeDefinitionKind};
use crate::model::register::Register;
use crate::model::types::{Type, MAX_TYPE_DEPTH};

/// Elements that carry both a user-assigned and a recovered name.
pub trait CustomAndOriginalName {
    fn custom_name_mut(&mut self) -> &mut String;
    fn original_name_mut(&mut self) -> &mut String;
}

macro_rules! impl_custom_and_original_name {
    ($($ty:ty),* $(,)?) => {
        $(impl CustomAndOriginalName for $ty {
            fn custom_name_mut(&mut self) -> &mut String {
                &mut self.custom_name
            }

            fn original_name_mut(&mut self) -> &mut String {
                &mut self.original_name
            }
        })*
    };
}

/// A field in a struct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructField {
    /// Offset from the start of the struct in bytes
    pub offset: u64,
    #[serde(default)]
    pub custom_name: String,
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub comment: String,
    pub field_type: Type,
}

impl StructField {
    pub fn new(offset: u64, field_type: Type) -> Self {
        Self {
            offset,
            custom_name: String::new(),
            original_name: String::new(),
            comment: String::new(),
            field_type,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.custom_name = name.to_string();
        self
    }
}

/// A field in a union; all fields start at offset 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnionField {
    pub index: u64,
    #[serde(default)]
    pub custom_name: String,
    #[serde(default)]
    pub original_name: String,
    pub field_type: Type,
}

/// A named value of an enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumEntry {
    pub value: u64,
    #[serde(default)]
    pub custom_name: String,
    #[serde(default)]
    pub original_name: String,
}

impl EnumEntry {
    pub fn new(value: u64, name: &str) -> Self {
        Self {
            value,
            custom_name: name.to_string(),
            original_name: String::new(),
        }
    }
}

/// An argument of a calling-convention level prototype.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Argument {
    pub index: u64,
    #[serde(default)]
    pub custom_name: String,
    #[serde(default)]
    pub original_name: String,
    pub argument_type: Type,
}

impl Argument {
    pub fn new(index: u64, argument_type: Type) -> Self {
        Self {
            index,
            custom_name: String::new(),
            original_name: String::new(),
            argument_type,
        }
    }
}

/// A register together with the type of the value it holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedTypedRegister {
    pub location: Register,
    #[serde(default)]
    pub custom_name: String,
    #[serde(default)]
    pub original_name: String,
    pub register_type: Type,
}

impl NamedTypedRegister {
    pub fn new(location: Register, register_type: Type) -> Self {
        Self {
            location,
            custom_name: String::new(),
            original_name: String::new(),
            register_type,
        }
    }
}

impl_custom_and_original_name!(
    TypeDefinition,
    StructField,
    UnionField,
    EnumEntry,
    Argument,
    NamedTypedRegister,
);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructDefinition {
    pub size: u64,
    pub fields: Vec<StructField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnionDefinition {
    pub fields: Vec<UnionField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumDefinition {
    /// Integer primitive the enum is stored as
    pub underlying_type: Type,
    pub entries: Vec<EnumEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypedefDefinition {
    pub underlying_type: Type,
}

/// Function type expressed at the calling-convention level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CabiFunctionType {
    pub abi: Abi,
    pub return_type: Type,
    pub arguments: Vec<Argument>,
}

/// Function type expressed at the register level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawFunctionType {
    pub arguments: Vec<NamedTypedRegister>,
    pub return_values: Vec<NamedTypedRegister>,
    #[serde(default)]
    pub preserved_registers: Vec<Register>,
    /// Stack pointer adjustment performed by the callee's return
    #[serde(default)]
    pub final_stack_offset: u64,
    /// Struct describing the arguments passed on the stack
    #[serde(default)]
    pub stack_arguments_type: Option<Type>,
}

/// Kind-specific payload of a type definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DefinitionData {
    Struct(StructDefinition),
    Union(UnionDefinition),
    Enum(EnumDefinition),
    Typedef(TypedefDefinition),
    CabiFunction(CabiFunctionType),
    RawFunction(RawFunctionType),
}

/// A node of the type graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeDefinition {
    /// Numeric identifier, 0 until the definition is recorded in a model
    pub id: u64,
    #[serde(default)]
    pub custom_name: String,
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub comment: String,
    pub data: DefinitionData,
}

impl TypeDefinition {
    /// Create an unrecorded definition (ID 0).
    pub fn new(data: DefinitionData) -> Self {
        Self {
            id: 0,
            custom_name: String::new(),
            original_name: String::new(),
            comment: String::new(),
            data,
        }
    }

    pub fn new_struct(size: u64, fields: Vec<StructField>) -> Self {
        Self::new(DefinitionData::Struct(StructDefinition { size, fields }))
    }

    pub fn new_enum(underlying_type: Type, entries: Vec<EnumEntry>) -> Self {
        Self::new(DefinitionData::Enum(EnumDefinition {
            underlying_type,
            entries,
        }))
    }

    pub fn new_typedef(underlying_type: Type) -> Self {
        Self::new(DefinitionData::Typedef(TypedefDefinition { underlying_type }))
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }

    pub fn with_custom_name(mut self, name: &str) -> Self {
        self.custom_name = name.to_string();
        self
    }

    pub fn with_original_name(mut self, name: &str) -> Self {
        self.original_name = name.to_string();
        self
    }

    pub fn kind(&self) -> TypeDefinitionKind {
        match &self.data {
            DefinitionData::Struct(_) => TypeDefinitionKind::Struct,
            DefinitionData::Union(_) => TypeDefinitionKind::Union,
            DefinitionData::Enum(_) => TypeDefinitionKind::Enum,
            DefinitionData::Typedef(_) => TypeDefinitionKind::Typedef,
            DefinitionData::CabiFunction(_) => TypeDefinitionKind::CabiFunction,
            DefinitionData::RawFunction(_) => TypeDefinitionKind::RawFunction,
        }
    }

    pub fn key(&self) -> TypeDefinitionKey {
        TypeDefinitionKey::new(self.id, self.kind())
    }

    /// Display name: custom name, then original name, then a synthetic one.
    pub fn name(&self) -> String {
        if !self.custom_name.is_empty() {
            self.custom_name.clone()
        } else if !self.original_name.is_empty() {
            self.original_name.clone()
        } else {
            format!("{}_{}", self.kind().value().replace('-', "_"), self.id)
        }
    }

    /// Every type this definition structurally refers to.
    pub fn edges(&self) -> Vec<&Type> {
        match &self.data {
            DefinitionData::Struct(s) => s.fields.iter().map(|f| &f.field_type).collect(),
            DefinitionData::Union(u) => u.fields.iter().map(|f| &f.field_type).collect(),
            DefinitionData::Enum(e) => vec![&e.underlying_type],
            DefinitionData::Typedef(t) => vec![&t.underlying_type],
            DefinitionData::CabiFunction(f) => std::iter::once(&f.return_type)
                .chain(f.arguments.iter().map(|a| &a.argument_type))
                .collect(),
            DefinitionData::RawFunction(f) => f
                .arguments
                .iter()
                .chain(f.return_values.iter())
                .map(|r| &r.register_type)
                .chain(f.stack_arguments_type.iter())
                .collect(),
        }
    }

    /// Mutable counterpart of [`TypeDefinition::edges`].
    pub fn edges_mut(&mut self) -> Vec<&mut Type> {
        match &mut self.data {
            DefinitionData::Struct(s) => s.fields.iter_mut().map(|f| &mut f.field_type).collect(),
            DefinitionData::Union(u) => u.fields.iter_mut().map(|f| &mut f.field_type).collect(),
            DefinitionData::Enum(e) => vec![&mut e.underlying_type],
            DefinitionData::Typedef(t) => vec![&mut t.underlying_type],
            DefinitionData::CabiFunction(f) => std::iter::once(&mut f.return_type)
                .chain(f.arguments.iter_mut().map(|a| &mut a.argument_type))
                .collect(),
            DefinitionData::RawFunction(f) => f
                .arguments
                .iter_mut()
                .chain(f.return_values.iter_mut())
                .map(|r| &mut r.register_type)
                .chain(f.stack_arguments_type.iter_mut())
                .collect(),
        }
    }

    pub fn visit_references(&self, visitor: &mut dyn FnMut(&DefinitionReference)) {
        for edge in self.edges() {
            edge.visit_references(visitor);
        }
    }

    pub fn visit_references_mut(&mut self, visitor: &mut dyn FnMut(&mut DefinitionReference)) {
        for edge in self.edges_mut() {
            edge.visit_references_mut(visitor);
        }
    }

    /// Call `visitor` on this definition and every nested element carrying
    /// both a custom and an original name.
    pub fn visit_names_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn CustomAndOriginalName)) {
        visitor(self);
        match &mut self.data {
            DefinitionData::Struct(s) => s.fields.iter_mut().for_each(|f| visitor(f)),
            DefinitionData::Union(u) => u.fields.iter_mut().for_each(|f| visitor(f)),
            DefinitionData::Enum(e) => e.entries.iter_mut().for_each(|e| visitor(e)),
            DefinitionData::Typedef(_) => {}
            DefinitionData::CabiFunction(f) => f.arguments.iter_mut().for_each(|a| visitor(a)),
            DefinitionData::RawFunction(f) => f
                .arguments
                .iter_mut()
                .chain(f.return_values.iter_mut())
                .for_each(|r| visitor(r)),
        }
    }

    /// Size in bytes. Function types are unsized.
    pub fn size(&self, model: &Binary) -> Option<u64> {
        self.size_at_depth(model, 0)
    }

    pub(crate) fn size_at_depth(&self, model: &Binary, depth: usize) -> Option<u64> {
        if depth > MAX_TYPE_DEPTH {
            return None;
        }
        match &self.data {
            DefinitionData::Struct(s) => Some(s.size),
            DefinitionData::Union(u) => u.fields.iter().try_fold(0u64, |max, f| {
                Some(max.max(f.field_type.size_at_depth(model, depth + 1)?))
            }),
            DefinitionData::Enum(e) => e.underlying_type.size_at_depth(model, depth + 1),
            DefinitionData::Typedef(t) => t.underlying_type.size_at_depth(model, depth + 1),
            DefinitionData::CabiFunction(_) | DefinitionData::RawFunction(_) => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructDefinition> {
        match &self.data {
            DefinitionData::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumDefinition> {
        match &self.data {
            DefinitionData::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_cabi_function(&self) -> Option<&CabiFunctionType> {
        match &self.data {
            DefinitionData::CabiFunction(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_raw_function(&self) -> Option<&RawFunctionType> {
        match &self.data {
            DefinitionData::RawFunction(f) => Some(f),
            _ => None,
        }
    }
}
