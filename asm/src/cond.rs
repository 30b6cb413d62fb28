//! ARM-style condition-code unit: CPSR computation and the 15 predicates
//! `CJMP` evaluates.

use core::fmt;

bitflags::bitflags! {
    /// The four independent CPSR flags. Bit positions are part of the
    /// external contract: Z=0, N=1, C=2, V=3.
    #[derive(Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Cpsr: u32 {
        /// Zero: `lhs == rhs`.
        const Z = 1 << 0;
        /// Negative: bit 31 of `lhs - rhs` is set.
        const N = 1 << 1;
        /// Carry: `lhs >= rhs` (no borrow, unsigned comparison).
        const C = 1 << 2;
        /// Overflow: signed overflow occurred in `lhs - rhs`.
        const V = 1 << 3;
    }
}

impl fmt::Debug for Cpsr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cpsr {{ Z={} N={} C={} V={} }}",
            self.contains(Self::Z) as u8,
            self.contains(Self::N) as u8,
            self.contains(Self::C) as u8,
            self.contains(Self::V) as u8,
        )
    }
}

/// `diff = lhs - rhs` in 32-bit unsigned wrap-around, with Z/N/C/V set
/// independently of one another.
pub fn compute_cpsr(lhs: u32, rhs: u32) -> Cpsr {
    let (diff, _) = lhs.overflowing_sub(rhs);
    let mut flags = Cpsr::empty();
    if lhs == rhs {
        flags |= Cpsr::Z;
    }
    if diff & 0x8000_0000 != 0 {
        flags |= Cpsr::N;
    }
    if lhs >= rhs {
        flags |= Cpsr::C;
    }
    let lhs_sign = (lhs as i32) < 0;
    let rhs_sign = (rhs as i32) < 0;
    let diff_sign = (diff as i32) < 0;
    if lhs_sign != rhs_sign && diff_sign != lhs_sign {
        flags |= Cpsr::V;
    }
    flags
}

/// A 4-bit condition code, `0..14`, plus the `Invalid` sentinel for any
/// out-of-range encoded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ConditionCode {
    Eq = 0,
    Ne = 1,
    Cs = 2,
    Cc = 3,
    Mi = 4,
    Pl = 5,
    Vs = 6,
    Vc = 7,
    Hi = 8,
    Ls = 9,
    Ge = 10,
    Lt = 11,
    Gt = 12,
    Le = 13,
    Al = 14,
    /// Sentinel for any 4-bit value outside `0..14`. Kept distinct from
    /// `Al` so a garbage register value never silently behaves as "always".
    Invalid = 15,
}

impl ConditionCode {
    /// Decode a 4-bit condition-code value as stored in a general-purpose
    /// register.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Eq,
            1 => Self::Ne,
            2 => Self::Cs,
            3 => Self::Cc,
            4 => Self::Mi,
            5 => Self::Pl,
            6 => Self::Vs,
            7 => Self::Vc,
            8 => Self::Hi,
            9 => Self::Ls,
            10 => Self::Ge,
            11 => Self::Lt,
            12 => Self::Gt,
            13 => Self::Le,
            14 => Self::Al,
            _ => Self::Invalid,
        }
    }

    /// The fixed pairwise involution used by the codegen path. `Al` and
    /// `Invalid` map to themselves.
    pub fn opposite(self) -> Self {
        match self {
            Self::Eq => Self::Ne,
            Self::Ne => Self::Eq,
            Self::Cs => Self::Cc,
            Self::Cc => Self::Cs,
            Self::Mi => Self::Pl,
            Self::Pl => Self::Mi,
            Self::Vs => Self::Vc,
            Self::Vc => Self::Vs,
            Self::Hi => Self::Ls,
            Self::Ls => Self::Hi,
            Self::Ge => Self::Lt,
            Self::Lt => Self::Ge,
            Self::Gt => Self::Le,
            Self::Le => Self::Gt,
            Self::Al => Self::Al,
            Self::Invalid => Self::Invalid,
        }
    }
}

/// Evaluate a condition code against a CPSR snapshot.
pub fn test_condition(cpsr: Cpsr, code: ConditionCode) -> bool {
    let z = cpsr.contains(Cpsr::Z);
    let n = cpsr.contains(Cpsr::N);
    let c = cpsr.contains(Cpsr::C);
    let v = cpsr.contains(Cpsr::V);
    match code {
        ConditionCode::Eq => z,
        ConditionCode::Ne => !z,
        ConditionCode::Cs => c,
        ConditionCode::Cc => !c,
        ConditionCode::Mi => n,
        ConditionCode::Pl => !n,
        ConditionCode::Vs => v,
        ConditionCode::Vc => !v,
        ConditionCode::Hi => c && !z,
        ConditionCode::Ls => !c || z,
        ConditionCode::Ge => n == v,
        ConditionCode::Lt => n != v,
        ConditionCode::Gt => !z && (n == v),
        ConditionCode::Le => z || (n != v),
        ConditionCode::Al => true,
        ConditionCode::Invalid => false,
    }
}
