//! Resolution pipeline, interpreter and debugger core for the microcore
//! 32-bit processor toolchain.
//!
//! `microcore_asm` describes what an instruction *is*; this crate turns a
//! parsed program into addresses (`resolve`), runs it (`interpreter`), and
//! lets a caller observe and control a run (`debugger`) - the same split
//! `fuel-vm` draws against `fuel-asm`, just without the storage/consensus
//! concerns `fuel-vm` carries for its blockchain host.

pub mod debugger;
pub mod error;
pub mod interpreter;
pub mod memory;
pub mod program;
pub mod registers;
pub mod resolve;

pub use debugger::{disassemble_instruction, Debugger, StopReason};
pub use error::VmError;
pub use interpreter::{Cpu, ExecuteContext, RunState};
pub use memory::MemoryBus;
pub use program::{
    Function, Global, GlobalKind, InstructionEntry, Label, LayoutParams, MemoryLayout, ProgramFile, SymbolKind,
    SymbolReference, Usage,
};
pub use registers::RegisterBank;
