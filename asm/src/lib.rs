//! The instruction set model: register files, the opcode table, operand
//! encoding, condition codes, and the ASCII frame renderer used to
//! document operand layouts.
//!
//! This crate only ever describes what an instruction *is*. It never runs
//! one - that is `microcore_vm`'s job, kept as a separate crate so the
//! static model can be depended on without pulling in a register bank,
//! memory bus, or execute loop.

pub mod bitview;
pub mod cond;
pub mod error;
pub mod frame;
pub mod instruction;
pub mod opcode;
pub mod operand;
pub mod register;
pub mod value;

pub use bitview::BitView;
pub use cond::{compute_cpsr, test_condition, ConditionCode, Cpsr};
pub use error::AsmError;
pub use instruction::{descriptor, Instruction, InstructionDescriptor, OperandValue, RawInstruction};
pub use opcode::{Opcode, OPCODE_BITS, TOTAL_OPCODES};
pub use operand::{OperandDescriptor, OperandKind, OperandRole};
pub use register::{RegisterClass, RegisterId, RegisterMetaClass, StateRegister};
pub use value::{Value, ValueType};
