//! CPU state and the fetch-decode-execute loop.
//!
//! [`Cpu`] owns the register bank and memory bus exclusively. The dynamic
//! half of instruction semantics (the exhaustive opcode match) lives in
//! [`execute`], kept separate from the loop itself so the loop's job -
//! fetch, decode, advance `pc` - stays readable independent of what any
//! given opcode does.

pub mod execute;

use microcore_asm::{Instruction, RegisterId};

use crate::error::VmError;
use crate::memory::MemoryBus;
use crate::registers::RegisterBank;

/// The interface instruction semantics consume. Implemented by [`Cpu`];
/// kept as a trait (rather than passing `&mut Cpu` directly) so
/// [`execute::dispatch`] only ever touches the four operations an
/// instruction is allowed to perform.
pub trait ExecuteContext {
    /// Read a class-qualified register.
    fn get_register(&self, id: RegisterId) -> u32;
    /// Write a class-qualified register.
    fn set_register(&mut self, id: RegisterId, value: u32);
    /// The current program counter.
    fn get_pc(&self) -> u32;
    /// Overwrite the program counter.
    fn set_pc(&mut self, value: u32);
    /// Read a 32-bit word from memory.
    fn read_memory32(&self, address: u32) -> Result<u32, VmError>;
    /// Write a 32-bit word to memory.
    fn write_memory32(&mut self, address: u32, value: u32) -> Result<(), VmError>;
}

/// The run-state of one [`Cpu`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Never stepped.
    Idle,
    /// Mid-`step`/`run`; only observed transiently by an external driver.
    Running,
    /// Stopped cleanly after a step, a breakpoint, or a debugger command.
    Stopped,
    /// Halted on an execute-side or memory-bus error; holds why.
    Faulted,
}

/// One CPU: a register bank, a memory bus, the bounds of the code section,
/// and the current [`RunState`]. Owned exclusively by whoever drives it -
/// the debugger never touches registers or memory except through this type.
#[derive(Debug, Clone)]
pub struct Cpu {
    registers: RegisterBank,
    memory: MemoryBus,
    code_start: u32,
    code_end: u32,
    state: RunState,
}

impl Cpu {
    /// Build a CPU with a fresh, zeroed register bank, `pc` initialized to
    /// `code_start`, and the given memory bus. `[code_start, code_end)` is
    /// the range of addresses `step` will fetch instructions from; any
    /// other `pc` value fails fast as soon as `step` is called.
    pub fn new(memory: MemoryBus, code_start: u32, code_end: u32) -> Self {
        let mut registers = RegisterBank::new();
        registers.set_pc(code_start);
        Self {
            registers,
            memory,
            code_start,
            code_end,
            state: RunState::Idle,
        }
    }

    pub fn registers(&self) -> &RegisterBank {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut RegisterBank {
        &mut self.registers
    }

    pub fn memory(&self) -> &MemoryBus {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut MemoryBus {
        &mut self.memory
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Fetch, decode and execute the instruction at `pc`, then advance `pc`
    /// by [`Instruction::SIZE`] unless the instruction itself set it (a
    /// jump or taken `CJMP`). On success the CPU ends the step `Stopped`;
    /// on failure it ends `Faulted` and the error is returned for the
    /// caller (an outer driver, or the debugger) to report.
    #[tracing::instrument(skip(self), fields(pc = self.registers.pc()))]
    pub fn step(&mut self) -> Result<(), VmError> {
        self.state = RunState::Running;
        match self.step_inner() {
            Ok(()) => {
                self.state = RunState::Stopped;
                Ok(())
            }
            Err(err) => {
                self.state = RunState::Faulted;
                Err(err)
            }
        }
    }

    fn step_inner(&mut self) -> Result<(), VmError> {
        let pc = self.registers.pc();
        if pc % 4 != 0 {
            return Err(VmError::UnalignedAccess { address: pc });
        }
        if pc < self.code_start || pc >= self.code_end {
            return Err(VmError::Segfault {
                address: pc,
                len: Instruction::SIZE,
                bound: self.code_end,
            });
        }

        let word = self.memory.read(pc)?;
        let instruction = Instruction::decode(word).map_err(|source| VmError::BadInstruction { pc, source })?;
        tracing::trace!(?instruction, "decoded instruction");

        execute::dispatch(&instruction, self)?;

        if self.registers.pc() == pc {
            self.registers.set_pc(pc + Instruction::SIZE);
        }
        Ok(())
    }

    /// Run until `should_stop` returns `true` (checked before each
    /// instruction, so it can implement breakpoints or a cancellation
    /// flag) or `step` returns an error. Returns `Ok(())` if stopped by
    /// `should_stop`; the error, if any, is surfaced to the caller rather
    /// than swallowed.
    pub fn run(&mut self, mut should_stop: impl FnMut(&Cpu) -> bool) -> Result<(), VmError> {
        while !should_stop(self) {
            self.step()?;
        }
        Ok(())
    }
}

impl ExecuteContext for Cpu {
    fn get_register(&self, id: RegisterId) -> u32 {
        self.registers.get(id)
    }

    fn set_register(&mut self, id: RegisterId, value: u32) {
        self.registers.set(id, value);
    }

    fn get_pc(&self) -> u32 {
        self.registers.pc()
    }

    fn set_pc(&mut self, value: u32) {
        self.registers.set_pc(value);
    }

    fn read_memory32(&self, address: u32) -> Result<u32, VmError> {
        self.memory.read(address)
    }

    fn write_memory32(&mut self, address: u32, value: u32) -> Result<(), VmError> {
        self.memory.write(address, value)
    }
}
