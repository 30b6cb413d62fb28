//! Per-operand descriptors: the static contract each instruction operand
//! must satisfy, independent of any particular instance's value.

use crate::register::RegisterMetaClass;
use crate::value::ValueType;

/// Whether an operand is a register reference or an immediate constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OperandKind {
    Register,
    Immediate,
}

/// Whether an instruction reads or writes an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OperandRole {
    Source,
    Destination,
}

/// The static contract for one operand slot of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OperandDescriptor {
    pub kind: OperandKind,
    pub role: OperandRole,
    pub value_type: ValueType,
    /// Only meaningful for [`OperandKind::Register`] operands.
    pub metaclass: Option<RegisterMetaClass>,
    /// First bit of this operand's field within the 32-bit instruction word.
    pub bit_pos: u32,
    /// Width, in bits, of this operand's encoding field. `0` marks a "tied"
    /// operand: its value is aliased to another operand and it occupies no
    /// bits of its own.
    pub bit_width: u32,
    /// Index of this operand within the instruction's operand list.
    pub index: usize,
    /// Whether this operand is absent from the assembly-text operand list
    /// (used for tied operands).
    pub hidden: bool,
}

impl OperandDescriptor {
    /// A tied operand occupies no bits of the instruction word; its value
    /// is aliased to another operand instead.
    pub fn is_tied(&self) -> bool {
        self.bit_width == 0
    }
}
