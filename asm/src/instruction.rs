//! Instruction descriptors: the single source of truth that drives
//! encoding, decoding and disassembly for every opcode.
//!
//! The static layout table is built once, lazily, and never mutated again.
//! The *dynamic* execute semantics intentionally do **not** live here as a
//! stored closure/fn-pointer per descriptor; they are an exhaustive `match`
//! over `Opcode` in `microcore_vm::interpreter::execute`, kept separate so
//! this table only ever carries the static contract: operand order, bit
//! layout, metaclasses, roles.

use std::sync::OnceLock;

use crate::bitview::BitView;
use crate::error::AsmError;
use crate::opcode::{Opcode, OPCODE_BITS, TOTAL_OPCODES};
use crate::operand::{OperandDescriptor, OperandKind, OperandRole};
use crate::register::{RegisterId, RegisterMetaClass};
use crate::value::{Value, ValueType};

/// Width, in bits, of a 16-bit immediate field (`MOVIMM16L`/`MOVIMM16H`).
pub const IMMEDIATE16_BITS: u32 = 16;
/// Width, in bits, of a register operand field.
pub const REGISTER_OPERAND_BITS: u32 = 8;

/// One operand's construction spec, before bit positions are assigned.
struct OperandSpec {
    kind: OperandKind,
    role: OperandRole,
    metaclass: Option<RegisterMetaClass>,
    bit_width: u32,
    hidden: bool,
    tied_to: Option<usize>,
}

impl OperandSpec {
    fn reg(role: OperandRole) -> Self {
        Self {
            kind: OperandKind::Register,
            role,
            metaclass: Some(RegisterMetaClass::ANY),
            bit_width: REGISTER_OPERAND_BITS,
            hidden: false,
            tied_to: None,
        }
    }

    fn imm16(role: OperandRole) -> Self {
        Self {
            kind: OperandKind::Immediate,
            role,
            metaclass: None,
            bit_width: IMMEDIATE16_BITS,
            hidden: false,
            tied_to: None,
        }
    }

    fn tied(tied_to: usize) -> Self {
        Self {
            kind: OperandKind::Register,
            role: OperandRole::Source,
            metaclass: Some(RegisterMetaClass::ANY),
            bit_width: 0,
            hidden: true,
            tied_to: Some(tied_to),
        }
    }
}

/// Assigns operand bit positions left-to-right after the opcode field,
/// rejecting any declared position that would overlap the previous field.
struct LayoutBuilder {
    cursor: u32,
    operands: Vec<OperandDescriptor>,
    tied: Vec<Option<usize>>,
}

impl LayoutBuilder {
    fn new() -> Self {
        Self {
            cursor: OPCODE_BITS,
            operands: Vec::new(),
            tied: Vec::new(),
        }
    }

    fn push(&mut self, spec: OperandSpec) -> Result<(), AsmError> {
        let bit_pos = self.cursor;
        let descriptor = OperandDescriptor {
            kind: spec.kind,
            role: spec.role,
            value_type: ValueType::Int32,
            metaclass: spec.metaclass,
            bit_pos,
            bit_width: spec.bit_width,
            index: self.operands.len(),
            hidden: spec.hidden,
        };
        self.cursor += spec.bit_width;
        self.tied.push(spec.tied_to);
        self.operands.push(descriptor);
        Ok(())
    }

    fn finish(self, opcode: Opcode, description: &'static str) -> Result<InstructionDescriptor, AsmError> {
        if self.cursor > 32 {
            return Err(AsmError::InvalidInstruction(format!(
                "{opcode} layout exceeds 32 bits: {} bits used",
                self.cursor
            )));
        }
        Ok(InstructionDescriptor {
            opcode,
            operands: self.operands,
            tied: self.tied,
            description,
        })
    }
}

/// Per-opcode layout, contract, and documentation - the static half of an
/// instruction's definition (see module docs for where the dynamic half
/// lives).
#[derive(Debug, Clone)]
pub struct InstructionDescriptor {
    pub opcode: Opcode,
    pub operands: Vec<OperandDescriptor>,
    /// `tied[i]` is `Some(j)` when operand `i` is a zero-width operand
    /// whose value is aliased to operand `j`.
    pub tied: Vec<Option<usize>>,
    pub description: &'static str,
}

impl InstructionDescriptor {
    fn operand_count_visible(&self) -> usize {
        self.operands.iter().filter(|o| !o.hidden).count()
    }
}

fn table() -> &'static [InstructionDescriptor] {
    static TABLE: OnceLock<Vec<InstructionDescriptor>> = OnceLock::new();
    TABLE.get_or_init(build_table)
}

/// Look up the static descriptor for an opcode.
pub fn descriptor(opcode: Opcode) -> &'static InstructionDescriptor {
    table()
        .iter()
        .find(|d| d.opcode == opcode)
        .expect("every Opcode variant has a table entry, checked in build_table's own test")
}

fn build_table() -> Vec<InstructionDescriptor> {
    use OperandRole::{Destination, Source};

    let mut out = Vec::with_capacity(TOTAL_OPCODES as usize);

    macro_rules! entry {
        ($opcode:expr, $description:expr, [$($spec:expr),* $(,)?]) => {{
            let mut b = LayoutBuilder::new();
            $(b.push($spec).expect("static table is well-formed");)*
            out.push(b.finish($opcode, $description).expect("static table fits in 32 bits"));
        }};
    }

    entry!(Opcode::Nop, "No-op.", []);

    entry!(
        Opcode::Mov,
        "Copy src into dst.",
        [OperandSpec::reg(Source), OperandSpec::reg(Destination)]
    );

    entry!(
        Opcode::MovImm16L,
        "Load a zero-extended 16-bit immediate into the low half of dst.",
        [OperandSpec::imm16(Source), OperandSpec::reg(Destination)]
    );

    entry!(
        Opcode::MovImm16H,
        "Load a 16-bit immediate into the high half of dst, preserving the low half.",
        [
            OperandSpec::imm16(Source),
            OperandSpec::reg(Destination),
            OperandSpec::tied(1),
        ]
    );

    entry!(
        Opcode::Ld,
        "Load a word from the address held in a register into dst.",
        [OperandSpec::reg(Source), OperandSpec::reg(Destination)]
    );

    entry!(
        Opcode::St,
        "Store src to the address held in a register.",
        [OperandSpec::reg(Source), OperandSpec::reg(Source)]
    );

    for (opcode, description) in [
        (Opcode::Add, "Add two registers, wrapping modulo 2^32."),
        (Opcode::Sub, "Subtract two registers, wrapping modulo 2^32."),
        (Opcode::Mul, "Multiply two registers, wrapping modulo 2^32."),
        (Opcode::Div, "Signed-divide two registers; division by zero yields 0."),
        (Opcode::Mod, "Signed-remainder two registers; division by zero yields 0."),
        (Opcode::Cmp, "Compute and publish CPSR from two registers."),
        (Opcode::Lsl, "Logical shift left by a register, shift count mod 32."),
        (Opcode::Lsr, "Logical shift right by a register, shift count mod 32."),
        (Opcode::Asl, "Arithmetic shift left by a register, shift count mod 32."),
        (Opcode::Asr, "Arithmetic shift right by a register, shift count mod 32, sign-extending."),
    ] {
        entry!(
            opcode,
            description,
            [
                OperandSpec::reg(Source),
                OperandSpec::reg(Source),
                OperandSpec::reg(Destination),
            ]
        );
    }

    entry!(
        Opcode::Jmp,
        "Unconditionally branch, storing the return address in link.",
        [OperandSpec::reg(Source), OperandSpec::reg(Destination)]
    );

    entry!(
        Opcode::CJmp,
        "Branch if the condition code in cond holds against CPSR.",
        [
            OperandSpec::reg(Source),
            OperandSpec::reg(Source),
            OperandSpec::reg(Destination),
        ]
    );

    debug_assert_eq!(out.len(), TOTAL_OPCODES as usize);
    out
}

/// Opcode descriptor plus the already bit-masked operand values: the
/// lossless middle form between a 32-bit word and a typed decoded
/// instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawInstruction {
    pub opcode: Opcode,
    /// Masked to each operand's declared encoding width.
    pub operands: Vec<u64>,
}

/// A fully typed, decoded operand value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OperandValue {
    Register(RegisterId),
    Immediate(Value),
}

impl OperandValue {
    fn raw_bits(self) -> u64 {
        match self {
            Self::Register(r) => r.encode() as u64,
            Self::Immediate(v) => v.encode(),
        }
    }
}

/// A fully decoded instruction: opcode plus typed operand values.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: Vec<OperandValue>,
}

impl Instruction {
    /// Size in bytes of every instruction's binary encoding.
    pub const SIZE: u32 = 4;

    /// Validate operand kinds/metaclasses/immediate widths against the
    /// opcode's descriptor and compute the [`RawInstruction`] middle form.
    pub fn to_raw(&self) -> Result<RawInstruction, AsmError> {
        let desc = descriptor(self.opcode);
        if self.operands.len() != desc.operand_count_visible() {
            return Err(AsmError::InvalidInstruction(format!(
                "{} expects {} operand(s), got {}",
                self.opcode,
                desc.operand_count_visible(),
                self.operands.len()
            )));
        }

        let mut visible = self.operands.iter();
        let mut raw_by_index: Vec<Option<u64>> = vec![None; desc.operands.len()];

        for op_desc in &desc.operands {
            let raw = if op_desc.hidden {
                let tied_to = desc.tied[op_desc.index].expect("hidden operand is always tied");
                raw_by_index[tied_to].expect("tied target decoded before its alias")
            } else {
                let value = visible
                    .next()
                    .expect("operand count already checked above");
                check_operand(op_desc, *value)?;
                value.raw_bits()
            };
            raw_by_index[op_desc.index] = Some(raw);
        }

        Ok(RawInstruction {
            opcode: self.opcode,
            operands: raw_by_index.into_iter().map(|v| v.unwrap()).collect(),
        })
    }

    /// Encode to the 32-bit instruction word.
    pub fn encode(&self) -> Result<u32, AsmError> {
        let raw = self.to_raw()?;
        encode_raw(&raw)
    }

    /// Decode a 32-bit instruction word into its typed, decoded form.
    pub fn decode(word: u32) -> Result<Self, AsmError> {
        let raw = decode_raw(word)?;
        Self::from_raw(&raw)
    }

    /// Decode a [`RawInstruction`] into its typed form.
    pub fn from_raw(raw: &RawInstruction) -> Result<Self, AsmError> {
        let desc = descriptor(raw.opcode);
        let mut operands = Vec::with_capacity(desc.operand_count_visible());
        for op_desc in &desc.operands {
            if op_desc.hidden {
                continue;
            }
            let bits = raw.operands[op_desc.index];
            let value = match op_desc.kind {
                OperandKind::Register => {
                    let reg = RegisterId::decode(bits as u32)?;
                    if let Some(metaclass) = op_desc.metaclass {
                        metaclass.check(reg)?;
                    }
                    OperandValue::Register(reg)
                }
                OperandKind::Immediate => OperandValue::Immediate(Value::decode(op_desc.value_type, bits)),
            };
            operands.push(value);
        }
        Ok(Self {
            opcode: raw.opcode,
            operands,
        })
    }
}

fn check_operand(desc: &OperandDescriptor, value: OperandValue) -> Result<(), AsmError> {
    match (desc.kind, value) {
        (OperandKind::Register, OperandValue::Register(reg)) => {
            if let Some(metaclass) = desc.metaclass {
                metaclass.check(reg)?;
            }
            Ok(())
        }
        (OperandKind::Immediate, OperandValue::Immediate(v)) => {
            let max = BitView::mask(desc.bit_width) as u64;
            if v.encode() & !max != 0 {
                Err(AsmError::InvalidInstruction(format!(
                    "immediate {:#x} does not fit in {} bits",
                    v.encode(),
                    desc.bit_width
                )))
            } else {
                Ok(())
            }
        }
        (kind, _) => Err(AsmError::InvalidInstruction(format!(
            "operand {} expected {:?}, got a value of the other kind",
            desc.index, kind
        ))),
    }
}

/// Encode a [`RawInstruction`] to its 32-bit word.
pub fn encode_raw(raw: &RawInstruction) -> Result<u32, AsmError> {
    let desc = descriptor(raw.opcode);
    let mut word = 0u32;
    {
        let mut view = BitView::new(&mut word);
        view.write(raw.opcode.encode(), 0, OPCODE_BITS);
        for op_desc in &desc.operands {
            if op_desc.bit_width == 0 {
                continue;
            }
            let value = raw.operands[op_desc.index];
            view.write(value as u32, op_desc.bit_pos, op_desc.bit_width);
        }
    }
    Ok(word)
}

/// Decode a 32-bit word into its [`RawInstruction`] middle form.
pub fn decode_raw(word: u32) -> Result<RawInstruction, AsmError> {
    let mut word = word;
    let view = BitView::new(&mut word);
    let opcode = Opcode::decode(view.read(0, OPCODE_BITS))?;
    let desc = descriptor(opcode);
    let mut operands = vec![0u64; desc.operands.len()];
    for op_desc in &desc.operands {
        if op_desc.hidden {
            continue;
        }
        let raw = view.read(op_desc.bit_pos, op_desc.bit_width) as u64;
        operands[op_desc.index] = raw;
    }
    for op_desc in &desc.operands {
        if op_desc.hidden {
            let tied_to = desc.tied[op_desc.index].expect("hidden operand is always tied");
            operands[op_desc.index] = operands[tied_to];
        }
    }
    Ok(RawInstruction { opcode, operands })
}
