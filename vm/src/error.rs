//! Runtime error types for the resolution pipeline, interpreter and
//! debugger: one enum that wraps the lower layer's errors
//! ([`microcore_asm::AsmError`]) and adds the failures that can only
//! happen once a program is actually running.

use microcore_asm::AsmError;
use thiserror::Error;

/// Errors raised anywhere in `microcore_vm`: resolution, execution, or
/// debugger misuse.
#[derive(Debug, Error)]
pub enum VmError {
    /// Wraps a failure from the static instruction-set model.
    #[error(transparent)]
    Asm(#[from] AsmError),

    /// One or more symbol references never matched a function, global, or
    /// label. Carries every unresolved reference found in a single pass.
    #[error("unresolved symbol(s): {}", .0.join(", "))]
    UnresolvedSymbol(Vec<String>),

    /// A memory access was not 4-byte aligned.
    #[error("unaligned access at {address:#x}")]
    UnalignedAccess { address: u32 },

    /// A memory access fell outside the mapped buffer.
    #[error("segfault: access at {address:#x} ({len} bytes) exceeds {bound:#x}")]
    Segfault { address: u32, len: u32, bound: u32 },

    /// The interpreter driver was called with parameters that make no
    /// sense (e.g. an empty program, a step count of zero where one was
    /// required).
    #[error("bad parameters: {0}")]
    BadParameters(String),

    /// The fetched word at PC did not decode to a well-formed instruction.
    #[error("bad instruction at {pc:#x}: {source}")]
    BadInstruction { pc: u32, source: AsmError },

    /// The debugger was asked to operate on a breakpoint id, address, or
    /// register it does not recognize.
    #[error("debugger misuse: {0}")]
    DebuggerMisuse(String),
}

impl VmError {
    /// The program counter at the time of the fault, when known.
    pub fn pc(&self) -> Option<u32> {
        match self {
            Self::BadInstruction { pc, .. } => Some(*pc),
            _ => None,
        }
    }
}
