pub mod control;
pub mod execution;
pub mod fpu;
pub mod instruction;
pub mod interpreter;
pub mod mmu;
pub mod register;

use enum_map::{enum_map, Enum, EnumMap};

use {
    control::{Control, Interrupt},
    fpu::Fpu,
    register::{GetRegister, Register, SetRegister},
};

pub const RESET_VECTOR: u32 = 0xBFC0_0000;
pub const SCRATCHPAD_SIZE: usize = 16 * 1024;

#[derive(Enum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Kernel,
    Supervisor,
    User,
}

pub struct State {
    pub program_counter: u32,
    pub branch_target: u32,
    pub is_branching: bool,
    pub delay_slot: u8,
    pub current_instruction: u32,
    pub next_instruction: u32,
    pub registers: EnumMap<Register, u128>,
    pub shift_amount: u32,
    pub control: Control,
    pub fpu: Fpu,
}

impl State {
    pub fn new() -> State {
        State {
            program_counter: RESET_VECTOR,
            branch_target: 0,
            is_branching: false,
            delay_slot: 0,
            current_instruction: 0,
            next_instruction: 0,
            registers: enum_map! { _ => 0 },
            shift_amount: 0,
            control: Control::new(),
            fpu: Fpu::new(),
        }
    }
}

impl Default for State {
    fn default() -> Self {
        State::new()
    }
}

pub struct Core {
    pub state: State,
    pub mode: Mode,
    scratchpad: Box<[u8]>,
}

impl Default for Core {
    fn default() -> Self {
        Core::new()
    }
}

impl Core {
    pub fn new() -> Core {
        let mut core = Core {
            state: State::new(),
            mode: Mode::Kernel,
            scratchpad: vec![0; SCRATCHPAD_SIZE].into_boxed_slice(),
        };
        core.reset();
        core
    }

    pub fn reset(&mut self) {
        self.state = State::new();
        self.mode = self.state.control.mode();
        self.scratchpad.fill(0);
    }

    pub fn set_entry_point(&mut self, program_counter: u32) {
        self.state.program_counter = program_counter;
        self.cancel_branch();
    }

    pub fn get_register<T>(&self, register: Register) -> T
    where
        u128: GetRegister<T>,
    {
        self.state.registers[register].get_register()
    }

    pub fn set_register<T>(&mut self, register: Register, value: T)
    where
        u128: SetRegister<T>,
    {
        if register == Register::Zero {
            return;
        }
        self.state.registers[register].set_register(value);
    }

    pub fn request_interrupt(&mut self, line: Interrupt) {
        self.state.control.request_interrupt(line);
    }

    pub fn clear_interrupt(&mut self, line: Interrupt) {
        self.state.control.clear_interrupt(line);
    }

    pub(crate) fn cancel_branch(&mut self) {
        self.state.is_branching = false;
        self.state.delay_slot = 0;
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Tiny assembler and machine setup shared by the core tests.

    use crate::emotion_engine::bus::Bus;

    use super::{control::Status, register::Register, Core};

    pub const PROGRAM_START: u32 = 0x0000_1000;

    pub fn special(rs: Register, rt: Register, rd: Register, sa: u32, function: u32) -> u32 {
        (rs as u32) << 21 | (rt as u32) << 16 | (rd as u32) << 11 | sa << 6 | function
    }

    pub fn immediate(opcode: u32, rs: Register, rt: Register, imm: u16) -> u32 {
        opcode << 26 | (rs as u32) << 21 | (rt as u32) << 16 | imm as u32
    }

    pub fn regimm(rt: u32, rs: Register, imm: u16) -> u32 {
        1 << 26 | (rs as u32) << 21 | rt << 16 | imm as u32
    }

    pub fn mmi(rs: Register, rt: Register, rd: Register, sa: u32, function: u32) -> u32 {
        0x1C << 26 | special(rs, rt, rd, sa, function)
    }

    /// Kernel mode with normal vectors and interrupts off, program loaded at
    /// `PROGRAM_START`.
    pub fn machine(program: &[u32]) -> (Core, Bus) {
        let mut core = Core::new();
        let mut bus = Bus::new();
        core.state.control.set_status(Status(0));
        core.mode = core.state.control.mode();
        for (index, word) in program.iter().enumerate() {
            bus.write(PROGRAM_START + 4 * index as u32, *word);
        }
        core.set_entry_point(PROGRAM_START);
        (core, bus)
    }
}
