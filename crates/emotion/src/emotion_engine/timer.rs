use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use tracing::{debug, trace, warn};

use crate::bits::Bits;

use super::peripheral::Peripheral;

const BASE: u32 = 0x1000_0000;
const STRIDE: u32 = 0x800;

/// The four bus-clocked EE timers.
pub struct Timer {
    timers: [TimerRegisters; 4],
    interrupts: u8,
}

#[derive(Default, Clone)]
struct TimerRegisters {
    count: u16,
    mode: Mode,
    compare: u16,
    hold: u16,
    prescaler: u32,
}

#[derive(Default, Clone, Copy)]
struct Mode(u16);

impl Mode {
    const EQUAL_FLAG: u16 = 10;
    const OVERFLOW_FLAG: u16 = 11;

    // CLKS
    pub fn selection(self) -> ClockSelection {
        ClockSelection::from_u16(self.0.bits(0..=1)).unwrap_or(ClockSelection::BusClock)
    }

    // ZRET
    pub fn zero_return(self) -> bool {
        self.0.bit(6)
    }

    // CUE
    pub fn count_up_enable(self) -> bool {
        self.0.bit(7)
    }

    // CMPE
    pub fn compare_interrupt_enable(self) -> bool {
        self.0.bit(8)
    }

    // OVFE
    pub fn overflow_interrupt_enable(self) -> bool {
        self.0.bit(9)
    }

    // EQUF
    pub fn equal_flag(self) -> bool {
        self.0.bit(Self::EQUAL_FLAG)
    }

    pub fn set_equal_flag(&mut self, value: bool) {
        self.0.set_bit(Self::EQUAL_FLAG, value);
    }

    // OVFF
    pub fn overflow_flag(self) -> bool {
        self.0.bit(Self::OVERFLOW_FLAG)
    }

    pub fn set_overflow_flag(&mut self, value: bool) {
        self.0.set_bit(Self::OVERFLOW_FLAG, value);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
enum ClockSelection {
    BusClock = 0b00,
    BusClockDiv16 = 0b01,
    BusClockDiv256 = 0b10,
    HBlank = 0b11,
}

impl ClockSelection {
    fn divider(self) -> Option<u32> {
        match self {
            ClockSelection::BusClock => Some(1),
            ClockSelection::BusClockDiv16 => Some(16),
            ClockSelection::BusClockDiv256 => Some(256),
            // Driven by the CRTC, which is not modelled.
            ClockSelection::HBlank => None,
        }
    }
}

impl Default for Timer {
    fn default() -> Self {
        Timer::new()
    }
}

impl Timer {
    pub fn new() -> Timer {
        Timer {
            timers: Default::default(),
            interrupts: 0,
        }
    }

    fn index(address: u32) -> usize {
        (address.wrapping_sub(BASE) / STRIDE) as usize
    }

    /// Advance every running timer by one bus cycle.
    pub fn step(&mut self) {
        for (index, timer) in self.timers.iter_mut().enumerate() {
            let mode = timer.mode;
            if !mode.count_up_enable() {
                continue;
            }
            let Some(divider) = mode.selection().divider() else {
                continue;
            };
            timer.prescaler += 1;
            if timer.prescaler < divider {
                continue;
            }
            timer.prescaler = 0;
            let (count, overflowed) = timer.count.overflowing_add(1);
            timer.count = count;
            if count == timer.compare {
                if mode.compare_interrupt_enable() && !mode.equal_flag() {
                    timer.mode.set_equal_flag(true);
                    self.interrupts |= 1 << index;
                }
                if mode.zero_return() {
                    timer.count = 0;
                }
            }
            if overflowed && mode.overflow_interrupt_enable() && !mode.overflow_flag() {
                timer.mode.set_overflow_flag(true);
                self.interrupts |= 1 << index;
            }
        }
    }

    /// Timers that raised an interrupt since the last call, one bit per timer.
    pub fn take_interrupts(&mut self) -> u8 {
        std::mem::take(&mut self.interrupts)
    }
}

impl Peripheral for Timer {
    fn read32(&mut self, address: u32) -> u32 {
        let index = Timer::index(address);
        let Some(timer) = self.timers.get(index) else {
            warn!("Invalid TIMER read at {:#010x}", address);
            return 0;
        };
        match address & 0x7FF {
            0x00 => timer.count as u32,
            0x10 => timer.mode.0 as u32,
            0x20 => timer.compare as u32,
            0x30 if index < 2 => timer.hold as u32,
            _ => {
                warn!("Invalid TIMER read at {:#010x}", address);
                0
            }
        }
    }

    fn write32(&mut self, address: u32, value: u32) {
        let index = Timer::index(address);
        let Some(timer) = self.timers.get_mut(index) else {
            warn!("Invalid TIMER write of {:#x} at {:#010x}", value, address);
            return;
        };
        let value = value as u16;
        match address & 0x7FF {
            0x00 => {
                timer.count = value;
                timer.prescaler = 0;
                trace!("Timer {} count: {:#06x}", index, value);
            }
            0x10 => {
                // The flags are cleared by writing 1.
                let mut mode = Mode(value);
                mode.set_equal_flag(timer.mode.equal_flag() && !value.bit(Mode::EQUAL_FLAG));
                mode.set_overflow_flag(
                    timer.mode.overflow_flag() && !value.bit(Mode::OVERFLOW_FLAG),
                );
                timer.mode = mode;
                debug!("Timer {} mode: {:#014b}", index, mode.0);
            }
            0x20 => {
                timer.compare = value;
                trace!("Timer {} compare: {:#06x}", index, value);
            }
            0x30 if index < 2 => timer.hold = value,
            _ => warn!("Invalid TIMER write of {:#x} at {:#010x}", value, address),
        }
    }

    fn retained_bits(&mut self, address: u32) -> u32 {
        match address & 0x7FF {
            0x10 => !(1 << Mode::EQUAL_FLAG | 1 << Mode::OVERFLOW_FLAG),
            _ => u32::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUE: u32 = 1 << 7;
    const CMPE: u32 = 1 << 8;
    const OVFE: u32 = 1 << 9;
    const ZRET: u32 = 1 << 6;

    #[test]
    fn counts_only_when_enabled() {
        let mut timer = Timer::new();
        timer.step();
        assert_eq!(timer.read32(0x1000_0000), 0);
        timer.write32(0x1000_0010, CUE);
        timer.step();
        timer.step();
        assert_eq!(timer.read32(0x1000_0000), 2);
    }

    #[test]
    fn prescaler_divides_bus_clock() {
        let mut timer = Timer::new();
        timer.write32(0x1000_0810, CUE | 0b01);
        for _ in 0..33 {
            timer.step();
        }
        assert_eq!(timer.read32(0x1000_0800), 2);
    }

    #[test]
    fn compare_raises_once_until_acknowledged() {
        let mut timer = Timer::new();
        timer.write32(0x1000_1020, 3);
        timer.write32(0x1000_1010, CUE | CMPE | ZRET);
        for _ in 0..3 {
            timer.step();
        }
        assert_eq!(timer.take_interrupts(), 0b100);
        assert_eq!(timer.read32(0x1000_1000), 0);
        assert!(timer.read32(0x1000_1010) & 1 << 10 != 0);

        for _ in 0..3 {
            timer.step();
        }
        assert_eq!(timer.take_interrupts(), 0);

        timer.write32(0x1000_1010, CUE | CMPE | ZRET | 1 << 10);
        assert_eq!(timer.read32(0x1000_1010) & 1 << 10, 0);
    }

    #[test]
    fn overflow_interrupt() {
        let mut timer = Timer::new();
        timer.write32(0x1000_1800, 0xFFFF);
        timer.write32(0x1000_1810, CUE | OVFE);
        timer.step();
        assert_eq!(timer.take_interrupts(), 0b1000);
        assert_eq!(timer.read32(0x1000_1800), 0);
    }

    #[test]
    fn byte_write_to_mode_keeps_pending_flags() {
        let mut timer = Timer::new();
        timer.write32(0x1000_0020, 1);
        timer.write32(0x1000_0000, 0xFFFF);
        timer.write32(0x1000_0010, CUE | CMPE | OVFE);
        timer.step();
        timer.step();
        let mode = timer.read32(0x1000_0010);
        assert_eq!(mode & (1 << 10 | 1 << 11), 1 << 10 | 1 << 11);

        // Rewrite CLKS and CUE in the low byte only.
        timer.write8(0x1000_0010, (CUE | 0b01) as u8);
        let mode = timer.read32(0x1000_0010);
        assert_eq!(mode & (1 << 10 | 1 << 11), 1 << 10 | 1 << 11);
        assert_eq!(mode & 0x3FF, CUE | CMPE | OVFE | 0b01);

        // OVFF is bit 3 of the high byte.
        timer.write8(0x1000_0011, 1 << 3);
        let mode = timer.read32(0x1000_0010);
        assert_eq!(mode & (1 << 10 | 1 << 11), 1 << 10);
    }

    #[test]
    fn hold_only_exists_on_first_two_timers() {
        let mut timer = Timer::new();
        timer.write32(0x1000_0830, 0x1234);
        timer.write32(0x1000_1030, 0x5678);
        assert_eq!(timer.read32(0x1000_0830), 0x1234);
        assert_eq!(timer.read32(0x1000_1030), 0);
    }
}
