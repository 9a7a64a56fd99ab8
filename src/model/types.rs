//! Qualified type expressions.
//!
//! A [`Type`] is what fields, arguments and register bindings are declared
//! with. It is either a primitive, a reference to a type definition, or a
//! pointer/array wrapping another type. Only `Defined` carries a reference;
//! primitives never produce graph edges.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::binary::Binary;
use crate::model::key::{DefinitionReference, TypeDefinitionKey};

/// Recursion limit when computing sizes through nested definitions.
pub(crate) const MAX_TYPE_DEPTH: usize = 64;

/// Primitive type families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    /// The void type (size 0)
    Void,
    /// Any value of the given size
    Generic,
    /// Either a pointer or a number
    PointerOrNumber,
    /// A number of unknown signedness
    Number,
    Unsigned,
    Signed,
    Float,
}

impl PrimitiveKind {
    /// Check if values of this kind live in integer registers.
    pub fn is_integer_like(&self) -> bool {
        matches!(
            self,
            PrimitiveKind::Generic
                | PrimitiveKind::PointerOrNumber
                | PrimitiveKind::Number
                | PrimitiveKind::Unsigned
                | PrimitiveKind::Signed
        )
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveKind::Void => write!(f, "void"),
            PrimitiveKind::Generic => write!(f, "generic"),
            PrimitiveKind::PointerOrNumber => write!(f, "pointer_or_number"),
            PrimitiveKind::Number => write!(f, "number"),
            PrimitiveKind::Unsigned => write!(f, "uint"),
            PrimitiveKind::Signed => write!(f, "int"),
            PrimitiveKind::Float => write!(f, "float"),
        }
    }
}

/// A qualified type expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Primitive {
        kind: PrimitiveKind,
        size: u64,
        #[serde(default)]
        is_const: bool,
    },
    Defined {
        definition: DefinitionReference,
        #[serde(default)]
        is_const: bool,
    },
    Pointer {
        pointee: Box<Type>,
        pointer_size: u64,
        #[serde(default)]
        is_const: bool,
    },
    Array {
        element: Box<Type>,
        count: u64,
        #[serde(default)]
        is_const: bool,
    },
}

impl Type {
    pub fn primitive(kind: PrimitiveKind, size: u64) -> Self {
        Type::Primitive {
            kind,
            size,
            is_const: false,
        }
    }

    pub fn void() -> Self {
        Self::primitive(PrimitiveKind::Void, 0)
    }

    pub fn signed(size: u64) -> Self {
        Self::primitive(PrimitiveKind::Signed, size)
    }

    pub fn unsigned(size: u64) -> Self {
        Self::primitive(PrimitiveKind::Unsigned, size)
    }

    pub fn float(size: u64) -> Self {
        Self::primitive(PrimitiveKind::Float, size)
    }

    pub fn defined(key: TypeDefinitionKey) -> Self {
        Type::Defined {
            definition: DefinitionReference::new(key),
            is_const: false,
        }
    }

    pub fn pointer_to(pointee: Type, pointer_size: u64) -> Self {
        Type::Pointer {
            pointee: Box::new(pointee),
            pointer_size,
            is_const: false,
        }
    }

    pub fn array_of(element: Type, count: u64) -> Self {
        Type::Array {
            element: Box::new(element),
            count,
            is_const: false,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(
            self,
            Type::Primitive {
                kind: PrimitiveKind::Void,
                ..
            }
        )
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer { .. })
    }

    /// The definition this type ultimately names, looking through pointers
    /// and arrays. `None` for primitives and empty references.
    pub fn definition(&self) -> Option<TypeDefinitionKey> {
        match self {
            Type::Primitive { .. } => None,
            Type::Defined { definition, .. } => definition.key(),
            Type::Pointer { pointee, .. } => pointee.definition(),
            Type::Array { element, .. } => element.definition(),
        }
    }

    /// Call `visitor` on every reference inside this type expression.
    pub fn visit_references(&self, visitor: &mut dyn FnMut(&DefinitionReference)) {
        match self {
            Type::Primitive { .. } => {}
            Type::Defined { definition, .. } => visitor(definition),
            Type::Pointer { pointee, .. } => pointee.visit_references(visitor),
            Type::Array { element, .. } => element.visit_references(visitor),
        }
    }

    /// Call `visitor` on every reference inside this type expression, allowing
    /// it to be rewritten.
    pub fn visit_references_mut(&mut self, visitor: &mut dyn FnMut(&mut DefinitionReference)) {
        match self {
            Type::Primitive { .. } => {}
            Type::Defined { definition, .. } => visitor(definition),
            Type::Pointer { pointee, .. } => pointee.visit_references_mut(visitor),
            Type::Array { element, .. } => element.visit_references_mut(visitor),
        }
    }

    /// Size in bytes, resolving definitions against `model`.
    ///
    /// Returns `None` for unsized types (function types), dangling
    /// references, and recursive by-value layouts.
    pub fn size(&self, model: &Binary) -> Option<u64> {
        self.size_at_depth(model, 0)
    }

    pub(crate) fn size_at_depth(&self, model: &Binary, depth: usize) -> Option<u64> {
        if depth > MAX_TYPE_DEPTH {
            return None;
        }
        match self {
            Type::Primitive { size, .. } => Some(*size),
            Type::Pointer { pointer_size, .. } => Some(*pointer_size),
            Type::Array { element, count, .. } => element
                .size_at_depth(model, depth + 1)?
                .checked_mul(*count),
            Type::Defined { definition, .. } => model
                .resolve(definition)?
                .size_at_depth(model, depth + 1),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive {
                kind: PrimitiveKind::Void,
                ..
            } => write!(f, "void"),
            Type::Primitive { kind, size, .. } => write!(f, "{}{}_t", kind, size.saturating_mul(8)),
            Type::Defined { definition, .. } => write!(f, "{}", definition),
            Type::Pointer { pointee, .. } => write!(f, "{} *", pointee),
            Type::Array { element, count, .. } => write!(f, "{}[{}]", element, count),
        }
    }
}
