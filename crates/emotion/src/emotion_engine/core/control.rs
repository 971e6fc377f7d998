use derive_more::Display;
use enum_map::{enum_map, Enum, EnumMap};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use tracing::{debug, trace};

use crate::bits::Bits;

use super::Mode;

const PROCESSOR_ID: u32 = 0x2E20;

const NORMAL_BASE: u32 = 0x8000_0000;
const BOOTSTRAP_BASE: u32 = 0xBFC0_0200;

const TLB_REFILL_VECTOR: u32 = 0x000;
const COMMON_VECTOR: u32 = 0x180;
const INTERRUPT_VECTOR: u32 = 0x200;

// Coprocessor 0
#[derive(Debug)]
pub struct Control {
    registers: EnumMap<Register, u32>,
    // Latched interrupt lines, already positioned as Cause.IP bits.
    pending_interrupts: u32,
}

impl Default for Control {
    fn default() -> Self {
        Control::new()
    }
}

impl Control {
    pub fn new() -> Control {
        let mut control = Control {
            registers: enum_map! { _ => 0 },
            pending_interrupts: 0,
        };
        control.reset();
        control
    }

    /// Every register reads zero after reset except `PrId`.
    pub fn reset(&mut self) {
        self.registers = enum_map! {
            Register::PrId => PROCESSOR_ID,
            _ => 0,
        };
        self.pending_interrupts = 0;
    }

    /// Advance `Count`, latching the timer line when it reaches `Compare`.
    pub fn step(&mut self, cycles: u32) {
        let before = self.registers[Register::Count];
        self.registers[Register::Count] = before.wrapping_add(cycles);
        let compare = self.registers[Register::Compare];
        if cycles != 0 && compare.wrapping_sub(before).wrapping_sub(1) < cycles {
            trace!("Count reached Compare {:#010x}", compare);
            self.request_interrupt(Interrupt::Timer);
        }
    }

    pub fn get_register(&self, register: Register) -> u32 {
        self.registers[register]
    }

    pub fn set_register(&mut self, register: Register, value: u32) {
        debug!("Setting control register {} to {:#010x}", register, value);
        match register {
            Register::PrId => {}
            Register::Compare => {
                self.registers[register] = value;
                self.clear_interrupt(Interrupt::Timer);
            }
            _ => self.registers[register] = value,
        }
    }

    pub fn status(&self) -> Status {
        Status(self.registers[Register::Status])
    }

    pub fn set_status(&mut self, status: Status) {
        self.registers[Register::Status] = status.0;
    }

    pub fn cause(&self) -> Cause {
        Cause(self.registers[Register::Cause])
    }

    pub fn set_cause(&mut self, cause: Cause) {
        self.registers[Register::Cause] = cause.0;
    }

    pub fn request_interrupt(&mut self, line: Interrupt) {
        self.pending_interrupts |= 1 << line.cause_bit();
    }

    pub fn clear_interrupt(&mut self, line: Interrupt) {
        self.pending_interrupts &= !(1 << line.cause_bit());
    }

    /// Take a level 1 exception and return the address of its handler.
    pub fn raise(
        &mut self,
        exception: Exception,
        program_counter: u32,
        in_delay_slot: bool,
    ) -> u32 {
        let mut status = self.status();
        let mut cause = self.cause();
        cause.set_exception_code(exception.code());
        if let Some(address) = exception.bad_address() {
            self.registers[Register::BadVAddr] = address;
        }
        let vector = if status.exception_level() {
            COMMON_VECTOR
        } else {
            if in_delay_slot {
                self.registers[Register::Epc] = program_counter.wrapping_sub(4);
                cause.set_branch_delay(true);
            } else {
                self.registers[Register::Epc] = program_counter;
                cause.set_branch_delay(false);
            }
            status.set_exception_level(true);
            match exception {
                Exception::TlbRefillLoad(_) | Exception::TlbRefillStore(_) => TLB_REFILL_VECTOR,
                Exception::Interrupt => INTERRUPT_VECTOR,
                _ => COMMON_VECTOR,
            }
        };
        self.set_status(status);
        self.set_cause(cause);
        let base = if status.bootstrap_vectors() {
            BOOTSTRAP_BASE
        } else {
            NORMAL_BASE
        };
        debug!(
            "Exception {} at {:#010x} (delay slot: {}), vector {:#010x}",
            exception,
            program_counter,
            in_delay_slot,
            base + vector
        );
        base + vector
    }

    /// Leave the current exception level and return the address to resume at.
    pub fn exception_return(&mut self) -> u32 {
        let mut status = self.status();
        let target = if status.error_level() {
            status.set_error_level(false);
            self.registers[Register::ErrorEpc]
        } else {
            status.set_exception_level(false);
            self.registers[Register::Epc]
        };
        self.set_status(status);
        target
    }

    /// Per-step bookkeeping: publish latched lines into Cause, and report whether
    /// an interrupt should be delivered now.
    pub fn update_interrupts(&mut self) -> bool {
        let mut cause = self.cause();
        cause.set_interrupts_pending(self.pending_interrupts);
        self.set_cause(cause);
        let status = self.status();
        status.interrupts_enabled()
            && status.master_interrupts_enabled()
            && !status.exception_level()
            && !status.error_level()
            && cause.interrupts_pending() & status.interrupt_mask() != 0
    }

    pub fn mode(&self) -> Mode {
        let status = self.status();
        if status.exception_level() || status.error_level() {
            return Mode::Kernel;
        }
        match status.kernel_supervisor_user() {
            0b00 => Mode::Kernel,
            0b01 => Mode::Supervisor,
            _ => Mode::User,
        }
    }
}

const INTERRUPT_LINES: u32 = 0b1000_1100_0000_0000;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Status(pub u32);

impl Status {
    // IE
    pub fn interrupts_enabled(self) -> bool {
        self.0.bit(0)
    }

    pub fn set_interrupts_enabled(&mut self, value: bool) {
        self.0.set_bit(0, value);
    }

    // EXL
    pub fn exception_level(self) -> bool {
        self.0.bit(1)
    }

    pub fn set_exception_level(&mut self, value: bool) {
        self.0.set_bit(1, value);
    }

    // ERL
    pub fn error_level(self) -> bool {
        self.0.bit(2)
    }

    pub fn set_error_level(&mut self, value: bool) {
        self.0.set_bit(2, value);
    }

    // KSU
    pub fn kernel_supervisor_user(self) -> u32 {
        self.0.bits(3..5)
    }

    pub fn set_kernel_supervisor_user(&mut self, value: u32) {
        self.0.set_bits(3..5, value);
    }

    // IM2, IM3, IM7
    pub fn interrupt_mask(self) -> u32 {
        self.0 & INTERRUPT_LINES
    }

    // EIE
    pub fn master_interrupts_enabled(self) -> bool {
        self.0.bit(16)
    }

    pub fn set_master_interrupts_enabled(&mut self, value: bool) {
        self.0.set_bit(16, value);
    }

    // BEV
    pub fn bootstrap_vectors(self) -> bool {
        self.0.bit(22)
    }

    pub fn set_bootstrap_vectors(&mut self, value: bool) {
        self.0.set_bit(22, value);
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Cause(pub u32);

impl Cause {
    // ExcCode
    pub fn exception_code(self) -> u32 {
        self.0.bits(2..7)
    }

    pub fn set_exception_code(&mut self, code: u32) {
        self.0.set_bits(2..7, code);
    }

    // IP2, IP3, IP7
    pub fn interrupts_pending(self) -> u32 {
        self.0 & INTERRUPT_LINES
    }

    pub fn set_interrupts_pending(&mut self, lines: u32) {
        self.0 = self.0 & !INTERRUPT_LINES | lines & INTERRUPT_LINES;
    }

    // BD
    pub fn branch_delay(self) -> bool {
        self.0.bit(31)
    }

    pub fn set_branch_delay(&mut self, value: bool) {
        self.0.set_bit(31, value);
    }
}

/// External interrupt inputs of the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum, Display)]
pub enum Interrupt {
    // INTC
    Int0,
    // DMAC
    Int1,
    // Count == Compare
    Timer,
}

impl Interrupt {
    fn cause_bit(self) -> u32 {
        match self {
            Interrupt::Int0 => 10,
            Interrupt::Int1 => 11,
            Interrupt::Timer => 15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Exception {
    #[display("interrupt")]
    Interrupt,
    #[display("TLB refill on load at {_0:#010x}")]
    TlbRefillLoad(u32),
    #[display("TLB refill on store at {_0:#010x}")]
    TlbRefillStore(u32),
    #[display("address error on load at {_0:#010x}")]
    AddressErrorLoad(u32),
    #[display("address error on store at {_0:#010x}")]
    AddressErrorStore(u32),
    #[display("syscall")]
    Syscall,
    #[display("breakpoint")]
    Breakpoint,
    #[display("trap")]
    Trap,
}

impl Exception {
    pub fn code(self) -> u32 {
        match self {
            Exception::Interrupt => 0,
            Exception::TlbRefillLoad(_) => 2,
            Exception::TlbRefillStore(_) => 3,
            Exception::AddressErrorLoad(_) => 4,
            Exception::AddressErrorStore(_) => 5,
            Exception::Syscall => 8,
            Exception::Breakpoint => 9,
            Exception::Trap => 13,
        }
    }

    fn bad_address(self) -> Option<u32> {
        match self {
            Exception::TlbRefillLoad(address)
            | Exception::TlbRefillStore(address)
            | Exception::AddressErrorLoad(address)
            | Exception::AddressErrorStore(address) => Some(address),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Enum, Display, FromPrimitive)]
pub enum Register {
    Index,
    Random,
    EntryLo0,
    EntryLo1,
    Context,
    PageMask,
    Wired,
    Undefined7,
    BadVAddr,
    Count,
    EntryHi,
    Compare,
    Status,
    Cause,
    Epc,
    PrId,
    Config,
    Undefined17,
    Undefined18,
    Undefined19,
    Undefined20,
    Undefined21,
    Undefined22,
    BadPAddr,
    Debug,
    Perf,
    Undefined26,
    Undefined27,
    TagLo,
    TagHi,
    ErrorEpc,
    Undefined31,
}

impl From<u32> for Register {
    fn from(value: u32) -> Self {
        Register::from_u32(value & 0b11111).unwrap_or(Register::Index)
    }
}
