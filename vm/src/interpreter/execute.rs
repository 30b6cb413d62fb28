//! The dynamic half of instruction semantics: one exhaustive `match` over
//! [`Opcode`], in place of a closure stored per descriptor.
//! `microcore_asm::instruction::descriptor` still owns the *static*
//! contract (operand order, bit layout, metaclasses); this module owns
//! only what each opcode *does* once its operands are resolved.

use microcore_asm::{compute_cpsr, test_condition, ConditionCode, Cpsr, Instruction, Opcode, OperandValue, RegisterId};

use crate::error::VmError;
use crate::interpreter::ExecuteContext;

fn reg(operand: &OperandValue) -> RegisterId {
    match operand {
        OperandValue::Register(r) => *r,
        OperandValue::Immediate(_) => unreachable!("descriptor guarantees this operand is a register"),
    }
}

fn imm(operand: &OperandValue) -> u32 {
    match operand {
        OperandValue::Immediate(v) => v.as_u32(),
        OperandValue::Register(_) => unreachable!("descriptor guarantees this operand is an immediate"),
    }
}

fn alu(ctx: &mut dyn ExecuteContext, ops: &[OperandValue], f: impl Fn(u32, u32) -> u32) {
    let a = ctx.get_register(reg(&ops[0]));
    let b = ctx.get_register(reg(&ops[1]));
    ctx.set_register(reg(&ops[2]), f(a, b));
}

fn shift(ctx: &mut dyn ExecuteContext, ops: &[OperandValue], f: impl Fn(u32, u32) -> u32) {
    let value = ctx.get_register(reg(&ops[0]));
    let count = ctx.get_register(reg(&ops[1])) & 0x1F;
    ctx.set_register(reg(&ops[2]), f(value, count));
}

fn branch_and_link(ctx: &mut dyn ExecuteContext, target: RegisterId, link: RegisterId) {
    let return_address = ctx.get_pc() + Instruction::SIZE;
    let destination = ctx.get_register(target);
    ctx.set_register(link, return_address);
    ctx.set_pc(destination);
}

/// Execute one decoded instruction against `ctx`, per the contract table
/// in spec.md §4.E. Never advances `pc` on its own behalf except for
/// `JMP`/taken `CJMP`; the interpreter's `step` handles the common
/// `pc += 4` case by comparing `pc` before and after this call.
pub fn dispatch(instruction: &Instruction, ctx: &mut dyn ExecuteContext) -> Result<(), VmError> {
    let ops = &instruction.operands;
    match instruction.opcode {
        Opcode::Nop => {}

        Opcode::Mov => {
            let value = ctx.get_register(reg(&ops[0]));
            ctx.set_register(reg(&ops[1]), value);
        }

        Opcode::MovImm16L => {
            let value = imm(&ops[0]) & 0xFFFF;
            ctx.set_register(reg(&ops[1]), value);
        }

        Opcode::MovImm16H => {
            let high = imm(&ops[0]) & 0xFFFF;
            let dst = reg(&ops[1]);
            let low = ctx.get_register(dst) & 0xFFFF;
            ctx.set_register(dst, (high << 16) | low);
        }

        Opcode::Ld => {
            let address = ctx.get_register(reg(&ops[0]));
            let value = ctx.read_memory32(address)?;
            ctx.set_register(reg(&ops[1]), value);
        }

        Opcode::St => {
            let value = ctx.get_register(reg(&ops[0]));
            let address = ctx.get_register(reg(&ops[1]));
            ctx.write_memory32(address, value)?;
        }

        Opcode::Add => alu(ctx, ops, u32::wrapping_add),
        Opcode::Sub => alu(ctx, ops, u32::wrapping_sub),
        Opcode::Mul => alu(ctx, ops, u32::wrapping_mul),

        Opcode::Div => {
            let a = ctx.get_register(reg(&ops[0])) as i32;
            let b = ctx.get_register(reg(&ops[1])) as i32;
            let result = if b == 0 { 0 } else { a.wrapping_div(b) as u32 };
            ctx.set_register(reg(&ops[2]), result);
        }

        Opcode::Mod => {
            let a = ctx.get_register(reg(&ops[0])) as i32;
            let b = ctx.get_register(reg(&ops[1])) as i32;
            let result = if b == 0 { 0 } else { a.wrapping_rem(b) as u32 };
            ctx.set_register(reg(&ops[2]), result);
        }

        Opcode::Cmp => {
            let lhs = ctx.get_register(reg(&ops[0]));
            let rhs = ctx.get_register(reg(&ops[1]));
            let cpsr = compute_cpsr(lhs, rhs);
            ctx.set_register(reg(&ops[2]), cpsr.bits());
            ctx.set_register(RegisterId::CPSR, cpsr.bits());
        }

        Opcode::Jmp => branch_and_link(ctx, reg(&ops[0]), reg(&ops[1])),

        Opcode::CJmp => {
            let code = ConditionCode::from_u8(ctx.get_register(reg(&ops[0])) as u8);
            let cpsr = Cpsr::from_bits_truncate(ctx.get_register(RegisterId::CPSR));
            if test_condition(cpsr, code) {
                branch_and_link(ctx, reg(&ops[1]), reg(&ops[2]));
            }
        }

        Opcode::Lsl => shift(ctx, ops, |v, n| v << n),
        Opcode::Lsr => shift(ctx, ops, |v, n| v >> n),
        Opcode::Asl => shift(ctx, ops, |v, n| v << n),
        Opcode::Asr => shift(ctx, ops, |v, n| ((v as i32) >> n) as u32),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBus;
    use crate::registers::RegisterBank;

    struct TestCtx {
        registers: RegisterBank,
        memory: MemoryBus,
        pc: u32,
    }

    impl TestCtx {
        fn new() -> Self {
            Self {
                registers: RegisterBank::new(),
                memory: MemoryBus::new(16),
                pc: 0x100,
            }
        }
    }

    impl ExecuteContext for TestCtx {
        fn get_register(&self, id: RegisterId) -> u32 {
            if id == RegisterId::PC {
                self.pc
            } else {
                self.registers.get(id)
            }
        }
        fn set_register(&mut self, id: RegisterId, value: u32) {
            if id == RegisterId::PC {
                self.pc = value;
            } else {
                self.registers.set(id, value);
            }
        }
        fn get_pc(&self) -> u32 {
            self.pc
        }
        fn set_pc(&mut self, value: u32) {
            self.pc = value;
        }
        fn read_memory32(&self, address: u32) -> Result<u32, VmError> {
            self.memory.read(address)
        }
        fn write_memory32(&mut self, address: u32, value: u32) -> Result<(), VmError> {
            self.memory.write(address, value)
        }
    }

    fn instr(opcode: Opcode, operands: Vec<OperandValue>) -> Instruction {
        Instruction { opcode, operands }
    }

    #[test]
    fn movimm16h_preserves_low_half() {
        let mut ctx = TestCtx::new();
        ctx.set_register(RegisterId::gp(0), 0x5678);
        dispatch(
            &instr(
                Opcode::MovImm16H,
                vec![
                    OperandValue::Immediate(microcore_asm::Value::from_u32(0x1234)),
                    OperandValue::Register(RegisterId::gp(0)),
                ],
            ),
            &mut ctx,
        )
        .unwrap();
        assert_eq!(ctx.get_register(RegisterId::gp(0)), 0x1234_5678);
    }

    #[test]
    fn div_by_zero_yields_zero_without_error() {
        let mut ctx = TestCtx::new();
        ctx.set_register(RegisterId::gp(0), 42);
        ctx.set_register(RegisterId::gp(1), 0);
        dispatch(
            &instr(
                Opcode::Div,
                vec![
                    OperandValue::Register(RegisterId::gp(0)),
                    OperandValue::Register(RegisterId::gp(1)),
                    OperandValue::Register(RegisterId::gp(2)),
                ],
            ),
            &mut ctx,
        )
        .unwrap();
        assert_eq!(ctx.get_register(RegisterId::gp(2)), 0);
    }

    #[test]
    fn asr_sign_extends() {
        let mut ctx = TestCtx::new();
        ctx.set_register(RegisterId::gp(0), (-8i32) as u32);
        ctx.set_register(RegisterId::gp(1), 1);
        dispatch(
            &instr(
                Opcode::Asr,
                vec![
                    OperandValue::Register(RegisterId::gp(0)),
                    OperandValue::Register(RegisterId::gp(1)),
                    OperandValue::Register(RegisterId::gp(2)),
                ],
            ),
            &mut ctx,
        )
        .unwrap();
        assert_eq!(ctx.get_register(RegisterId::gp(2)) as i32, -4);
    }

    #[test]
    fn shift_count_is_taken_modulo_32() {
        let mut ctx = TestCtx::new();
        ctx.set_register(RegisterId::gp(0), 1);
        ctx.set_register(RegisterId::gp(1), 33); // 33 & 0x1F == 1
        dispatch(
            &instr(
                Opcode::Lsl,
                vec![
                    OperandValue::Register(RegisterId::gp(0)),
                    OperandValue::Register(RegisterId::gp(1)),
                    OperandValue::Register(RegisterId::gp(2)),
                ],
            ),
            &mut ctx,
        )
        .unwrap();
        assert_eq!(ctx.get_register(RegisterId::gp(2)), 2);
    }

    #[test]
    fn cmp_publishes_cpsr_register_and_destination() {
        let mut ctx = TestCtx::new();
        ctx.set_register(RegisterId::gp(0), 5);
        ctx.set_register(RegisterId::gp(1), 3);
        dispatch(
            &instr(
                Opcode::Cmp,
                vec![
                    OperandValue::Register(RegisterId::gp(0)),
                    OperandValue::Register(RegisterId::gp(1)),
                    OperandValue::Register(RegisterId::gp(2)),
                ],
            ),
            &mut ctx,
        )
        .unwrap();
        assert_eq!(ctx.get_register(RegisterId::gp(2)), ctx.get_register(RegisterId::CPSR));
        assert_eq!(ctx.get_register(RegisterId::CPSR), Cpsr::C.bits());
    }

    #[test]
    fn jmp_sets_link_to_pc_plus_four_and_branches() {
        let mut ctx = TestCtx::new();
        ctx.pc = 0x200;
        ctx.set_register(RegisterId::gp(0), 0x400);
        dispatch(
            &instr(
                Opcode::Jmp,
                vec![
                    OperandValue::Register(RegisterId::gp(0)),
                    OperandValue::Register(RegisterId::gp(1)),
                ],
            ),
            &mut ctx,
        )
        .unwrap();
        assert_eq!(ctx.get_pc(), 0x400);
        assert_eq!(ctx.get_register(RegisterId::gp(1)), 0x204);
    }

    #[test]
    fn cjmp_does_not_branch_when_condition_is_false() {
        let mut ctx = TestCtx::new();
        ctx.pc = 0x200;
        ctx.set_register(RegisterId::CPSR, 0); // Z=0
        ctx.set_register(RegisterId::gp(0), ConditionCode::Eq as u8 as u32);
        ctx.set_register(RegisterId::gp(1), 0x400);
        dispatch(
            &instr(
                Opcode::CJmp,
                vec![
                    OperandValue::Register(RegisterId::gp(0)),
                    OperandValue::Register(RegisterId::gp(1)),
                    OperandValue::Register(RegisterId::gp(2)),
                ],
            ),
            &mut ctx,
        )
        .unwrap();
        assert_eq!(ctx.get_pc(), 0x200);
    }
}
