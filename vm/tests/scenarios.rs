//! End-to-end scenario tests, one per literal scenario in this system's
//! testable-properties list. Each builds a tiny program directly as
//! encoded words (bypassing the text resolver, which has its own unit
//! tests) and drives it through a real [`Cpu`] or [`Debugger`].

use microcore_asm::{ConditionCode, Instruction, Opcode, OperandValue, RegisterId, Value};
use microcore_vm::{Cpu, Debugger, MemoryBus, StopReason};

fn word(opcode: Opcode, operands: Vec<OperandValue>) -> u32 {
    Instruction { opcode, operands }.encode().unwrap()
}

fn imm(v: u32) -> OperandValue {
    OperandValue::Immediate(Value::from_u32(v))
}

fn r(id: RegisterId) -> OperandValue {
    OperandValue::Register(id)
}

fn load_program(words: &[u32]) -> MemoryBus {
    let mut memory = MemoryBus::new(words.len().max(4));
    for (index, w) in words.iter().enumerate() {
        memory.write(index as u32 * 4, *w).unwrap();
    }
    memory
}

#[test]
fn s1_32_bit_constant_load() {
    let words = [
        word(Opcode::MovImm16L, vec![imm(0x5678), r(RegisterId::gp(0))]),
        word(Opcode::MovImm16H, vec![imm(0x1234), r(RegisterId::gp(0))]),
        word(Opcode::Nop, vec![]),
    ];
    let memory = load_program(&words);
    let mut cpu = Cpu::new(memory, 0, 12);

    cpu.step().unwrap();
    cpu.step().unwrap();
    cpu.step().unwrap();

    assert_eq!(cpu.registers().get(RegisterId::gp(0)), 0x1234_5678);
    assert_eq!(cpu.registers().pc(), 12);
}

#[test]
fn s2_comparison_and_signed_branch() {
    let cc_gt_target: u32 = 24;
    let words = [
        word(Opcode::MovImm16L, vec![imm(5), r(RegisterId::gp(0))]),
        word(Opcode::MovImm16L, vec![imm(3), r(RegisterId::gp(1))]),
        word(
            Opcode::Cmp,
            vec![r(RegisterId::gp(0)), r(RegisterId::gp(1)), r(RegisterId::gp(2))],
        ),
        word(Opcode::MovImm16L, vec![imm(cc_gt_target), r(RegisterId::gp(3))]),
        word(Opcode::MovImm16L, vec![imm(ConditionCode::Gt as u32), r(RegisterId::gp(4))]),
        word(
            Opcode::CJmp,
            vec![r(RegisterId::gp(4)), r(RegisterId::gp(3)), r(RegisterId::gp(5))],
        ),
        word(Opcode::Nop, vec![]),
    ];
    let memory = load_program(&words);
    let mut cpu = Cpu::new(memory, 0, 28);

    for _ in 0..6 {
        cpu.step().unwrap();
    }

    let cpsr = microcore_asm::Cpsr::from_bits_truncate(cpu.registers().get(RegisterId::CPSR));
    assert!(!cpsr.contains(microcore_asm::Cpsr::Z));
    assert!(!cpsr.contains(microcore_asm::Cpsr::N));
    assert!(cpsr.contains(microcore_asm::Cpsr::C));
    assert!(!cpsr.contains(microcore_asm::Cpsr::V));
    assert!(microcore_asm::test_condition(cpsr, ConditionCode::Gt));

    assert_eq!(cpu.registers().pc(), cc_gt_target);
    assert_eq!(cpu.registers().get(RegisterId::gp(5)), 20 + 4);
}

#[test]
fn s3_memory_round_trip() {
    let words = [
        word(Opcode::St, vec![r(RegisterId::gp(0)), r(RegisterId::gp(1))]),
        word(Opcode::Ld, vec![r(RegisterId::gp(1)), r(RegisterId::gp(2))]),
    ];
    let mut memory = MemoryBus::new(0x100 / 4 + 1);
    for (index, w) in words.iter().enumerate() {
        memory.write(index as u32 * 4, *w).unwrap();
    }
    let mut cpu = Cpu::new(memory, 0, 8);
    cpu.registers_mut().set(RegisterId::gp(0), 0xCAFE_BABE);
    cpu.registers_mut().set(RegisterId::gp(1), 0x100);

    cpu.step().unwrap();
    cpu.step().unwrap();

    assert_eq!(cpu.registers().get(RegisterId::gp(2)), 0xCAFE_BABE);
    assert_eq!(cpu.memory().read(0x100).unwrap(), 0xCAFE_BABE);
}

#[test]
fn s4_division_by_zero() {
    let words = [word(
        Opcode::Div,
        vec![r(RegisterId::gp(0)), r(RegisterId::gp(1)), r(RegisterId::gp(2))],
    )];
    let memory = load_program(&words);
    let mut cpu = Cpu::new(memory, 0, 4);
    cpu.registers_mut().set(RegisterId::gp(0), 42);
    cpu.registers_mut().set(RegisterId::gp(1), 0);

    cpu.step().unwrap();

    assert_eq!(cpu.registers().get(RegisterId::gp(2)), 0);
    assert_eq!(cpu.registers().pc(), 4);
}

#[test]
fn s5_breakpoint_fires_before_execute() {
    let words = [
        word(Opcode::Nop, vec![]),
        word(Opcode::MovImm16L, vec![imm(0xFF), r(RegisterId::gp(0))]),
    ];
    let memory = load_program(&words);
    let cpu = Cpu::new(memory, 0, 8);
    let mut debugger = Debugger::new(cpu, None);
    debugger.set_breakpoint(4);

    let reason = debugger.cont(|| false).unwrap();
    assert_eq!(reason, StopReason::Breakpoint(4));
    assert_eq!(debugger.read_register(RegisterId::gp(0)), 0);

    debugger.step_instructions(1).unwrap();
    assert_eq!(debugger.read_register(RegisterId::gp(0)), 0xFF);
}

#[test]
fn s6_unresolved_symbol_fails_before_layout_or_instruction_resolution() {
    use microcore_vm::{InstructionEntry, LayoutParams, ProgramFile, SymbolKind, SymbolReference, Usage};

    let mut program = ProgramFile::new("s6.asm");
    program.instructions.push(InstructionEntry {
        text: Some("JMP @undefined_symbol, lr".to_string()),
        symbol: Some(SymbolReference {
            name: "undefined_symbol".to_string(),
            usage: Usage::Full,
            kind: SymbolKind::Unknown,
        }),
        line: Some(1),
        ..Default::default()
    });

    let err = microcore_vm::resolve::pipeline(&program, LayoutParams::default()).unwrap_err();
    match err {
        microcore_vm::VmError::UnresolvedSymbol(names) => {
            assert_eq!(names.len(), 1);
            assert!(names[0].contains("undefined_symbol"));
            assert!(names[0].contains("line 1"));
        }
        other => panic!("expected UnresolvedSymbol, got {other:?}"),
    }
    // Layout never ran: no instruction has been assigned an address.
    assert!(program.instructions[0].address.is_none());
}
