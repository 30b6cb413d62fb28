//! Encoding/decoding error kinds for the instruction model.
//!
//! Everything here is a *static* failure to encode, decode, or look up
//! something in the opcode/register tables - never a runtime fault, which
//! is `microcore_vm::VmError`'s concern instead.

use thiserror::Error;

/// Failures raised by the instruction set model (component group A-F).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsmError {
    /// A decoded opcode field did not map to any known [`crate::opcode::Opcode`].
    #[error("invalid opcode: {0:#x}")]
    InvalidOpCode(u32),

    /// An operand failed to parse, decode, or fit its declared encoding.
    #[error("invalid instruction: {0}")]
    InvalidInstruction(String),

    /// An operand held a register of a class the operand's metaclass does
    /// not admit.
    #[error("register {register:?} is not a member of metaclass {metaclass:?}")]
    WrongRegisterClass {
        /// The encoded `(class, index)` register that was rejected.
        register: crate::register::RegisterId,
        /// The metaclass that rejected it.
        metaclass: crate::register::RegisterMetaClass,
    },

    /// No register exists with the given name or encoded value.
    #[error("unknown register: {0}")]
    UnknownRegister(String),
}
