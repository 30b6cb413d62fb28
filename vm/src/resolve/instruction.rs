//! Instruction resolver: converts every instruction entry between its
//! text, raw, and decoded representations, filling in whichever are
//! missing.

use std::str::FromStr;

use microcore_asm::{descriptor, Instruction, OperandKind, OperandValue, Opcode, RegisterId, Value};

use crate::error::VmError;
use crate::program::{ProgramFile, SymbolKind, Usage};

/// Resolve the text/raw/instruction representations of every instruction
/// in `program`. Requires symbols and memory layout to already be
/// resolved: any symbolic immediate operand is substituted from the
/// layout-assigned address, masked per its `@lo`/`@hi` usage.
pub fn resolve(program: &ProgramFile) -> Result<ProgramFile, VmError> {
    let mut resolved = program.clone();

    for entry in &mut resolved.instructions {
        if entry.instruction.is_none() {
            if let Some(text) = &entry.text {
                entry.instruction = Some(parse_text(text, entry.symbol.as_ref(), program)?);
            } else if let Some(raw) = &entry.raw {
                entry.instruction = Some(Instruction::from_raw(raw).map_err(VmError::from)?);
            }
        }

        if let Some(instruction) = &entry.instruction {
            if entry.raw.is_none() {
                entry.raw = Some(instruction.to_raw().map_err(VmError::from)?);
            }
            if entry.word.is_none() {
                entry.word = Some(instruction.encode().map_err(VmError::from)?);
            }
        }
    }

    Ok(resolved)
}

fn symbol_address(program: &ProgramFile, kind: &SymbolKind) -> Result<u32, VmError> {
    match kind {
        SymbolKind::Unknown => Err(VmError::UnresolvedSymbol(vec![
            "symbol reference reached instruction resolution unresolved".to_string(),
        ])),
        SymbolKind::Function(name) => {
            let function = program
                .functions
                .get(name)
                .ok_or_else(|| VmError::BadParameters(format!("unknown function {name}")))?;
            let (start, _) = function
                .instruction_ranges
                .first()
                .ok_or_else(|| VmError::BadParameters(format!("function {name} has no instruction ranges")))?;
            program.instructions[*start]
                .address
                .ok_or_else(|| VmError::BadParameters("memory layout not resolved".to_string()))
        }
        SymbolKind::Label(name) => {
            let label = program
                .labels
                .iter()
                .find(|l| &l.name == name)
                .ok_or_else(|| VmError::BadParameters(format!("unknown label {name}")))?;
            let index = label
                .instruction_index
                .ok_or_else(|| VmError::BadParameters(format!("label {name} is unattached")))?;
            program.instructions[index]
                .address
                .ok_or_else(|| VmError::BadParameters("memory layout not resolved".to_string()))
        }
        SymbolKind::Global(name) => program
            .globals
            .iter()
            .find(|g| &g.name == name)
            .and_then(|g| g.address)
            .ok_or_else(|| VmError::BadParameters(format!("unknown global {name}"))),
    }
}

fn apply_usage(address: u32, usage: Usage) -> u32 {
    match usage {
        Usage::Full => address,
        Usage::Lo => address & 0xFFFF,
        Usage::Hi => (address >> 16) & 0xFFFF,
    }
}

fn parse_immediate(token: &str) -> Result<u32, VmError> {
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|_| VmError::BadParameters(format!("bad hex immediate: {token}")))
    } else {
        token
            .parse::<i64>()
            .map(|v| v as u32)
            .map_err(|_| VmError::BadParameters(format!("bad immediate: {token}")))
    }
}

fn parse_text(
    text: &str,
    symbol: Option<&crate::program::SymbolReference>,
    program: &ProgramFile,
) -> Result<Instruction, VmError> {
    let text = text.split("//").next().unwrap_or(text).trim();
    let (mnemonic, rest) = text
        .split_once(char::is_whitespace)
        .unwrap_or((text, ""));
    let opcode = Opcode::from_str(mnemonic).map_err(VmError::from)?;
    let desc = descriptor(opcode);

    let tokens: Vec<&str> = if rest.trim().is_empty() {
        Vec::new()
    } else {
        rest.split(',').map(str::trim).collect()
    };

    let visible: Vec<_> = desc.operands.iter().filter(|o| !o.hidden).collect();
    if tokens.len() != visible.len() {
        return Err(VmError::Asm(microcore_asm::AsmError::InvalidInstruction(format!(
            "{opcode} expects {} operand(s), got {}",
            visible.len(),
            tokens.len()
        ))));
    }

    let mut operands = Vec::with_capacity(visible.len());
    for (token, op_desc) in tokens.iter().zip(visible) {
        let value = if crate::program::SymbolReference::is_symbol_token(token) {
            let reference = symbol
                .ok_or_else(|| VmError::BadParameters(format!("unexpected symbol operand: {token}")))?;
            let address = symbol_address(program, &reference.kind)?;
            OperandValue::Immediate(Value::from_u32(apply_usage(address, reference.usage)))
        } else {
            match op_desc.kind {
                OperandKind::Register => OperandValue::Register(RegisterId::from_name(token).map_err(VmError::from)?),
                OperandKind::Immediate => OperandValue::Immediate(Value::from_u32(parse_immediate(token)?)),
            }
        };
        operands.push(value);
    }

    Ok(Instruction { opcode, operands })
}
