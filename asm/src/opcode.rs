//! The fixed opcode set.
//!
//! An `Opcode` is a closed, exhaustively-matched tag - the set never grows
//! at runtime, so unlike the operand/instruction model (data-driven tables,
//! see [`crate::instruction`]) this is a plain Rust enum with explicit
//! discriminants, the same shape as `fuel_asm::Opcode`.

use core::fmt;
use core::str::FromStr;

use crate::error::AsmError;

/// Total number of opcodes in the set, including `NOP`.
pub const TOTAL_OPCODES: u32 = 18;

/// `ceil(log2(TOTAL_OPCODES))`. Every instruction word reserves this many
/// low bits for the opcode field.
pub const OPCODE_BITS: u32 = 5;

/// The fixed opcode set, in their canonical binary-code order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Opcode {
    Nop = 0,
    MovImm16H = 1,
    MovImm16L = 2,
    Mov = 3,
    Ld = 4,
    St = 5,
    Add = 6,
    Sub = 7,
    Mul = 8,
    Div = 9,
    Mod = 10,
    Cmp = 11,
    Jmp = 12,
    CJmp = 13,
    Lsl = 14,
    Lsr = 15,
    Asl = 16,
    Asr = 17,
}

impl Opcode {
    /// The canonical uppercase mnemonic, as it would appear in assembly text.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Nop => "NOP",
            Self::MovImm16H => "MOVIMM16H",
            Self::MovImm16L => "MOVIMM16L",
            Self::Mov => "MOV",
            Self::Ld => "LD",
            Self::St => "ST",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::Div => "DIV",
            Self::Mod => "MOD",
            Self::Cmp => "CMP",
            Self::Jmp => "JMP",
            Self::CJmp => "CJMP",
            Self::Lsl => "LSL",
            Self::Lsr => "LSR",
            Self::Asl => "ASL",
            Self::Asr => "ASR",
        }
    }

    /// Decode a binary opcode field. Fails for any value `>= TOTAL_OPCODES`.
    pub fn decode(value: u32) -> Result<Self, AsmError> {
        use strum::IntoEnumIterator;
        Self::iter()
            .find(|op| *op as u32 == value)
            .ok_or(AsmError::InvalidOpCode(value))
    }

    /// Encode to the binary opcode field.
    pub const fn encode(self) -> u32 {
        self as u32
    }
}

impl FromStr for Opcode {
    type Err = AsmError;

    /// Mnemonic lookup is case-insensitive; the canonical form is uppercase.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use strum::IntoEnumIterator;
        let upper = s.to_ascii_uppercase();
        Self::iter()
            .find(|op| op.mnemonic() == upper)
            .ok_or_else(|| AsmError::InvalidInstruction(format!("unknown mnemonic: {s}")))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
