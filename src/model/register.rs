//! Register types for register-level function prototypes.
//!
//! This module defines the Register enum and RegisterKind for the
//! architectures the model supports, together with the architecture each
//! register belongs to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// CPU architecture of the binary a model describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Architecture {
    /// 64-bit x86
    X86_64,
    /// 64-bit ARM
    AArch64,
}

impl Architecture {
    /// Pointer size in bytes.
    pub fn pointer_size(&self) -> u64 {
        8
    }

    /// Bytes pushed on the stack by a call instruction.
    pub fn call_push_size(&self) -> u64 {
        match self {
            Architecture::X86_64 => 8,
            Architecture::AArch64 => 0,
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::X86_64 => write!(f, "x86_64"),
            Architecture::AArch64 => write!(f, "aarch64"),
        }
    }
}

/// Types of CPU registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegisterKind {
    /// General purpose registers (rax, x0, etc.)
    General,
    /// SIMD/Vector registers (xmm, v)
    Vector,
    /// Stack pointer
    StackPointer,
}

impl fmt::Display for RegisterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterKind::General => write!(f, "General"),
            RegisterKind::Vector => write!(f, "Vector"),
            RegisterKind::StackPointer => write!(f, "StackPointer"),
        }
    }
}

macro_rules! registers {
    ($($variant:ident => ($name:literal, $arch:ident, $kind:ident, $bits:literal)),* $(,)?) => {
        /// CPU register usable in a register-level prototype.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum Register {
            $($variant,)*
        }

        impl Register {
            /// All known registers.
            pub const ALL: &'static [Register] = &[$(Register::$variant,)*];

            /// Register name (e.g., "rax", "xmm0", "x8")
            pub fn name(&self) -> &'static str {
                match self {
                    $(Register::$variant => $name,)*
                }
            }

            pub fn architecture(&self) -> Architecture {
                match self {
                    $(Register::$variant => Architecture::$arch,)*
                }
            }

            pub fn kind(&self) -> RegisterKind {
                match self {
                    $(Register::$variant => RegisterKind::$kind,)*
                }
            }

            /// Size in bits
            pub fn size(&self) -> u16 {
                match self {
                    $(Register::$variant => $bits,)*
                }
            }
        }
    };
}

registers! {
    Rax => ("rax", X86_64, General, 64),
    Rbx => ("rbx", X86_64, General, 64),
    Rcx => ("rcx", X86_64, General, 64),
    Rdx => ("rdx", X86_64, General, 64),
    Rsi => ("rsi", X86_64, General, 64),
    Rdi => ("rdi", X86_64, General, 64),
    Rbp => ("rbp", X86_64, General, 64),
    Rsp => ("rsp", X86_64, StackPointer, 64),
    R8 => ("r8", X86_64, General, 64),
    R9 => ("r9", X86_64, General, 64),
    R10 => ("r10", X86_64, General, 64),
    R11 => ("r11", X86_64, General, 64),
    R12 => ("r12", X86_64, General, 64),
    R13 => ("r13", X86_64, General, 64),
    R14 => ("r14", X86_64, General, 64),
    R15 => ("r15", X86_64, General, 64),
    Xmm0 => ("xmm0", X86_64, Vector, 128),
    Xmm1 => ("xmm1", X86_64, Vector, 128),
    Xmm2 => ("xmm2", X86_64, Vector, 128),
    Xmm3 => ("xmm3", X86_64, Vector, 128),
    Xmm4 => ("xmm4", X86_64, Vector, 128),
    Xmm5 => ("xmm5", X86_64, Vector, 128),
    Xmm6 => ("xmm6", X86_64, Vector, 128),
    Xmm7 => ("xmm7", X86_64, Vector, 128),
    X0 => ("x0", AArch64, General, 64),
    X1 => ("x1", AArch64, General, 64),
    X2 => ("x2", AArch64, General, 64),
    X3 => ("x3", AArch64, General, 64),
    X4 => ("x4", AArch64, General, 64),
    X5 => ("x5", AArch64, General, 64),
    X6 => ("x6", AArch64, General, 64),
    X7 => ("x7", AArch64, General, 64),
    X8 => ("x8", AArch64, General, 64),
    X19 => ("x19", AArch64, General, 64),
    X20 => ("x20", AArch64, General, 64),
    X21 => ("x21", AArch64, General, 64),
    X22 => ("x22", AArch64, General, 64),
    X23 => ("x23", AArch64, General, 64),
    X24 => ("x24", AArch64, General, 64),
    X25 => ("x25", AArch64, General, 64),
    X26 => ("x26", AArch64, General, 64),
    X27 => ("x27", AArch64, General, 64),
    X28 => ("x28", AArch64, General, 64),
    X29 => ("x29", AArch64, General, 64),
    X30 => ("x30", AArch64, General, 64),
    Sp => ("sp", AArch64, StackPointer, 64),
    V0 => ("v0", AArch64, Vector, 128),
    V1 => ("v1", AArch64, Vector, 128),
    V2 => ("v2", AArch64, Vector, 128),
    V3 => ("v3", AArch64, Vector, 128),
    V4 => ("v4", AArch64, Vector, 128),
    V5 => ("v5", AArch64, Vector, 128),
    V6 => ("v6", AArch64, Vector, 128),
    V7 => ("v7", AArch64, Vector, 128),
}

impl Register {
    /// Check if this is a general purpose register
    pub fn is_general(&self) -> bool {
        self.kind() == RegisterKind::General
    }

    /// Check if this is a vector/SIMD register
    pub fn is_vector(&self) -> bool {
        self.kind() == RegisterKind::Vector
    }

    /// Get the size in bytes (rounded up)
    pub fn size_bytes(&self) -> u64 {
        u64::from(self.size()).div_ceil(8)
    }

    /// Check if this register can contain a value of the given size in bytes
    pub fn can_contain(&self, value_size: u64) -> bool {
        value_size <= self.size_bytes()
    }

    /// Get a summary of the register
    pub fn summary(&self) -> String {
        format!(
            "{} {}bit {} ({})",
            self.name(),
            self.size(),
            self.kind(),
            self.architecture()
        )
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Register {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        Register::ALL
            .iter()
            .copied()
            .find(|r| r.name() == lowered)
            .ok_or_else(|| ModelError::UnknownRegister(s.to_string()))
    }
}
