//! Register classes, metaclasses, descriptors and encoding.
//!
//! Two register classes exist: [`RegisterClass::State`] (`pc`, `sp`, `lr`,
//! `cpsr`) and [`RegisterClass::GeneralPurpose`] (`r0..r15`). A register
//! encodes as `(class_bits << index_bits) | index`, where both bit widths
//! are derived from the fixed class/register counts below rather than
//! hand-picked, so the scheme keeps working if a class ever grows.

use core::fmt;

use crate::error::AsmError;

/// `ceil(log2(n))`, saturating to `0` for `n <= 1`.
const fn bits_for(n: u32) -> u32 {
    if n <= 1 {
        0
    } else {
        32 - (n - 1).leading_zeros()
    }
}

/// Number of distinct register classes.
pub const TOTAL_REGISTER_CLASSES: u32 = 2;
/// Bits needed to select a register class.
pub const CLASS_BITS: u32 = bits_for(TOTAL_REGISTER_CLASSES);

/// Number of architectural state registers.
pub const STATE_REGISTER_COUNT: u32 = 4;
/// Number of general-purpose integer registers.
pub const GP_REGISTER_COUNT: u32 = 16;

/// Bits needed to index into the largest register class.
pub const INDEX_BITS: u32 = {
    let gp = bits_for(GP_REGISTER_COUNT);
    let state = bits_for(STATE_REGISTER_COUNT);
    if gp > state {
        gp
    } else {
        state
    }
};

/// Total bits needed to encode a class-qualified register reference.
pub const REGISTER_FIELD_BITS: u32 = CLASS_BITS + INDEX_BITS;

/// The two register classes the ISA defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum RegisterClass {
    /// Fixed architectural registers: `pc`, `sp`, `lr`, `cpsr`.
    State = 0,
    /// General-purpose integer registers `r0..r15`.
    GeneralPurpose = 1,
}

impl RegisterClass {
    fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0 => Some(Self::State),
            1 => Some(Self::GeneralPurpose),
            _ => None,
        }
    }

    fn register_count(self) -> u32 {
        match self {
            Self::State => STATE_REGISTER_COUNT,
            Self::GeneralPurpose => GP_REGISTER_COUNT,
        }
    }
}

/// The four fixed architectural state registers, in their canonical index
/// order. `Cpsr`'s index is the "fixed canonical index" referred to
/// throughout the interpreter and condition-code unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum StateRegister {
    Pc = 0,
    Sp = 1,
    Lr = 2,
    Cpsr = 3,
}

impl StateRegister {
    const ALL: [Self; 4] = [Self::Pc, Self::Sp, Self::Lr, Self::Cpsr];

    fn name(self) -> &'static str {
        match self {
            Self::Pc => "pc",
            Self::Sp => "sp",
            Self::Lr => "lr",
            Self::Cpsr => "cpsr",
        }
    }

    fn from_index(index: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|r| *r as u8 == index)
    }
}

/// A class-qualified register reference: the same value the opcode
/// encoding holds, and what `ExecuteContext::getRegister`/`setRegister`
/// dispatch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegisterId {
    pub class: RegisterClass,
    pub index: u8,
}

impl RegisterId {
    /// The program counter.
    pub const PC: Self = Self {
        class: RegisterClass::State,
        index: StateRegister::Pc as u8,
    };
    /// The stack pointer.
    pub const SP: Self = Self {
        class: RegisterClass::State,
        index: StateRegister::Sp as u8,
    };
    /// The link register.
    pub const LR: Self = Self {
        class: RegisterClass::State,
        index: StateRegister::Lr as u8,
    };
    /// The current program status register.
    pub const CPSR: Self = Self {
        class: RegisterClass::State,
        index: StateRegister::Cpsr as u8,
    };

    /// A general-purpose register `rN`.
    ///
    /// # Panics
    /// Panics if `n >= GP_REGISTER_COUNT`; only used with literal indices.
    pub const fn gp(n: u8) -> Self {
        assert!((n as u32) < GP_REGISTER_COUNT);
        Self {
            class: RegisterClass::GeneralPurpose,
            index: n,
        }
    }

    /// Encode as `(class_bits << index_bits) | index`.
    pub fn encode(self) -> u32 {
        ((self.class as u32) << INDEX_BITS) | self.index as u32
    }

    /// Decode a class-qualified register value, validating class and index
    /// bounds.
    pub fn decode(value: u32) -> Result<Self, AsmError> {
        let index = (value & ((1 << INDEX_BITS) - 1)) as u8;
        let class_bits = value >> INDEX_BITS;
        let class = RegisterClass::from_bits(class_bits)
            .ok_or_else(|| AsmError::UnknownRegister(format!("encoded value {value:#x}")))?;
        if (index as u32) >= class.register_count() {
            return Err(AsmError::UnknownRegister(format!(
                "encoded value {value:#x} (index {index} out of range for {class:?})"
            )));
        }
        Ok(Self { class, index })
    }

    /// Look up a register by its textual name: either a custom name (`pc`,
    /// `sp`, `lr`, `cpsr`) or the default `r{index}` form.
    pub fn from_name(name: &str) -> Result<Self, AsmError> {
        let lower = name.to_ascii_lowercase();
        if let Some(state) = StateRegister::ALL.into_iter().find(|r| r.name() == lower) {
            return Ok(Self {
                class: RegisterClass::State,
                index: state as u8,
            });
        }
        if let Some(digits) = lower.strip_prefix('r') {
            if let Ok(index) = digits.parse::<u8>() {
                if (index as u32) < GP_REGISTER_COUNT {
                    return Ok(Self {
                        class: RegisterClass::GeneralPurpose,
                        index,
                    });
                }
            }
        }
        Err(AsmError::UnknownRegister(name.to_string()))
    }

    /// The canonical assembly-text name for this register.
    pub fn name(self) -> String {
        match self.class {
            RegisterClass::State => StateRegister::from_index(self.index)
                .map(StateRegister::name)
                .unwrap_or("?")
                .to_string(),
            RegisterClass::GeneralPurpose => format!("r{}", self.index),
        }
    }
}

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

bitflags::bitflags! {
    /// A named union of register classes that are interchangeable as an
    /// instruction operand.
    #[derive(Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct RegisterMetaClass: u8 {
        /// Architectural state registers only.
        const STATE = 0b01;
        /// General-purpose integer registers only.
        const GENERAL_PURPOSE = 0b10;
        /// Any 32-bit integer register, state or general-purpose.
        const ANY = Self::STATE.bits | Self::GENERAL_PURPOSE.bits;
    }
}

impl RegisterMetaClass {
    /// Whether a register of `class` is admitted by this metaclass.
    pub fn admits(self, class: RegisterClass) -> bool {
        let bit = match class {
            RegisterClass::State => Self::STATE,
            RegisterClass::GeneralPurpose => Self::GENERAL_PURPOSE,
        };
        self.contains(bit)
    }

    /// Validate that `register` is a member of this metaclass.
    pub fn check(self, register: RegisterId) -> Result<(), AsmError> {
        if self.admits(register.class) {
            Ok(())
        } else {
            Err(AsmError::WrongRegisterClass {
                register,
                metaclass: self,
            })
        }
    }
}

impl fmt::Debug for RegisterMetaClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegisterMetaClass({:#04b})", self.bits())
    }
}
