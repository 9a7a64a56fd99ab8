//! Calling conventions.
//!
//! Register tables and value classification for the ABIs the model can
//! express. The tables are deliberately simplified: scalars travel in
//! registers, aggregates and anything wider than a register travel on the
//! stack in 8-byte slots.
//!
//! ## x86_64 System V
//! - Integer args: RDI, RSI, RDX, RCX, R8, R9
//! - Float args: XMM0-XMM7
//! - Return: RAX (int), XMM0 (float)
//!
//! ## x86_64 Microsoft
//! - Integer args: RCX, RDX, R8, R9 (slots shared with XMM0-XMM3)
//! - Return: RAX (int), XMM0 (float)
//!
//! ## AArch64 AAPCS64
//! - Integer args: X0-X7
//! - Float args: V0-V7
//! - Return: X0 (int), V0 (float); indirect results through X8

pub mod function_type;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;
use crate::model::{Architecture, Binary, DefinitionData, PrimitiveKind, Register, Type};
use crate::model::types::MAX_TYPE_DEPTH;

pub use function_type::{convert_to_raw, try_convert_to_cabi};

/// Calling conventions a `CabiFunctionType` can be expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Abi {
    #[serde(rename = "SystemV_x86_64")]
    SystemVX86_64,
    #[serde(rename = "Microsoft_x86_64")]
    MicrosoftX86_64,
    #[serde(rename = "AAPCS64")]
    Aapcs64,
}

impl Abi {
    pub const ALL: &'static [Abi] = &[Abi::SystemVX86_64, Abi::MicrosoftX86_64, Abi::Aapcs64];

    pub fn name(&self) -> &'static str {
        match self {
            Abi::SystemVX86_64 => "SystemV_x86_64",
            Abi::MicrosoftX86_64 => "Microsoft_x86_64",
            Abi::Aapcs64 => "AAPCS64",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Abi::SystemVX86_64 => "System V AMD64 ABI (Linux, macOS, BSD)",
            Abi::MicrosoftX86_64 => "Microsoft x64 calling convention (Windows)",
            Abi::Aapcs64 => "ARM 64-bit Procedure Call Standard",
        }
    }

    pub fn architecture(&self) -> Architecture {
        match self {
            Abi::SystemVX86_64 | Abi::MicrosoftX86_64 => Architecture::X86_64,
            Abi::Aapcs64 => Architecture::AArch64,
        }
    }

    /// The ABI assumed for an architecture when a model does not name one.
    pub fn default_for(architecture: Architecture) -> Self {
        match architecture {
            Architecture::X86_64 => Abi::SystemVX86_64,
            Architecture::AArch64 => Abi::Aapcs64,
        }
    }

    pub fn integer_argument_registers(&self) -> &'static [Register] {
        use Register::*;
        match self {
            Abi::SystemVX86_64 => &[Rdi, Rsi, Rdx, Rcx, R8, R9],
            Abi::MicrosoftX86_64 => &[Rcx, Rdx, R8, R9],
            Abi::Aapcs64 => &[X0, X1, X2, X3, X4, X5, X6, X7],
        }
    }

    pub fn vector_argument_registers(&self) -> &'static [Register] {
        use Register::*;
        match self {
            Abi::SystemVX86_64 => &[Xmm0, Xmm1, Xmm2, Xmm3, Xmm4, Xmm5, Xmm6, Xmm7],
            Abi::MicrosoftX86_64 => &[Xmm0, Xmm1, Xmm2, Xmm3],
            Abi::Aapcs64 => &[V0, V1, V2, V3, V4, V5, V6, V7],
        }
    }

    pub fn integer_return_register(&self) -> Register {
        match self {
            Abi::SystemVX86_64 | Abi::MicrosoftX86_64 => Register::Rax,
            Abi::Aapcs64 => Register::X0,
        }
    }

    pub fn vector_return_register(&self) -> Register {
        match self {
            Abi::SystemVX86_64 | Abi::MicrosoftX86_64 => Register::Xmm0,
            Abi::Aapcs64 => Register::V0,
        }
    }

    /// Dedicated register for the hidden result pointer, if the ABI has one.
    /// Without one the pointer takes the first integer argument slot.
    pub fn indirect_return_register(&self) -> Option<Register> {
        match self {
            Abi::Aapcs64 => Some(Register::X8),
            Abi::SystemVX86_64 | Abi::MicrosoftX86_64 => None,
        }
    }

    pub fn callee_saved_registers(&self) -> &'static [Register] {
        use Register::*;
        match self {
            Abi::SystemVX86_64 => &[Rbx, Rbp, R12, R13, R14, R15],
            Abi::MicrosoftX86_64 => &[Rbx, Rbp, Rdi, Rsi, R12, R13, R14, R15],
            Abi::Aapcs64 => &[X19, X20, X21, X22, X23, X24, X25, X26, X27, X28, X29],
        }
    }

    /// Whether integer and vector arguments consume the same positional slots.
    pub fn positional_argument_slots(&self) -> bool {
        matches!(self, Abi::MicrosoftX86_64)
    }

    pub fn stack_slot_size(&self) -> u64 {
        8
    }
}

impl fmt::Display for Abi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Abi {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Abi::ALL
            .iter()
            .copied()
            .find(|abi| abi.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ModelError::UnknownAbi(s.to_string()))
    }
}

/// How a value travels across a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueClass {
    /// General purpose register
    Integer,
    /// Vector register
    Float,
    /// Stack memory
    Memory,
}

/// Classify a type for argument passing.
///
/// Returns `None` for `void`, unsized types and references that do not
/// resolve in `model`.
pub fn classify(ty: &Type, model: &Binary) -> Option<ValueClass> {
    classify_at_depth(ty, model, 0)
}

fn classify_at_depth(ty: &Type, model: &Binary, depth: usize) -> Option<ValueClass> {
    if depth > MAX_TYPE_DEPTH {
        return None;
    }
    match ty {
        Type::Primitive { kind, size, .. } => match kind {
            PrimitiveKind::Void => None,
            PrimitiveKind::Float if matches!(size, 4 | 8) => Some(ValueClass::Float),
            PrimitiveKind::Float => Some(ValueClass::Memory),
            _ if matches!(size, 1 | 2 | 4 | 8) => Some(ValueClass::Integer),
            _ => Some(ValueClass::Memory),
        },
        Type::Pointer { .. } => Some(ValueClass::Integer),
        Type::Array { .. } => Some(ValueClass::Memory),
        Type::Defined { definition, .. } => {
            let resolved = model.resolve(definition)?;
            match &resolved.data {
                DefinitionData::Enum(e) => classify_at_depth(&e.underlying_type, model, depth + 1),
                DefinitionData::Typedef(t) => {
                    classify_at_depth(&t.underlying_type, model, depth + 1)
                }
                DefinitionData::Struct(_) | DefinitionData::Union(_) => Some(ValueClass::Memory),
                DefinitionData::CabiFunction(_) | DefinitionData::RawFunction(_) => None,
            }
        }
    }
}

/// Where the allocator placed a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Location {
    Register(Register),
    Stack { offset: u64 },
}

/// Assigns argument locations in declaration order.
///
/// Used in both conversion directions so that a register-level prototype is
/// accepted exactly when it matches what the ABI would have produced.
#[derive(Debug, Clone)]
pub(crate) struct ArgumentAllocator {
    abi: Abi,
    next_integer: usize,
    next_vector: usize,
    next_position: usize,
    stack_offset: u64,
}

impl ArgumentAllocator {
    pub(crate) fn new(abi: Abi) -> Self {
        Self {
            abi,
            next_integer: 0,
            next_vector: 0,
            next_position: 0,
            stack_offset: 0,
        }
    }

    pub(crate) fn allocate(&mut self, class: ValueClass, size: u64) -> Location {
        let register = if self.abi.positional_argument_slots() {
            let position = self.next_position;
            self.next_position += 1;
            match class {
                ValueClass::Integer => self.abi.integer_argument_registers().get(position),
                ValueClass::Float => self.abi.vector_argument_registers().get(position),
                ValueClass::Memory => None,
            }
        } else {
            match class {
                ValueClass::Integer => {
                    let r = self.abi.integer_argument_registers().get(self.next_integer);
                    if r.is_some() {
                        self.next_integer += 1;
                    }
                    r
                }
                ValueClass::Float => {
                    let r = self.abi.vector_argument_registers().get(self.next_vector);
                    if r.is_some() {
                        self.next_vector += 1;
                    }
                    r
                }
                ValueClass::Memory => None,
            }
        };

        match register {
            Some(register) => Location::Register(*register),
            None => {
                let slot = self.abi.stack_slot_size();
                let offset = self.stack_offset;
                self.stack_offset = self
                    .stack_offset
                    .saturating_add(size.max(1).div_ceil(slot).saturating_mul(slot));
                Location::Stack { offset }
            }
        }
    }

    /// Total bytes of stack arguments allocated so far.
    pub(crate) fn stack_size(&self) -> u64 {
        self.stack_offset
    }
}
