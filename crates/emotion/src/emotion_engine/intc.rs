use derive_more::Display;
use tracing::{trace, warn};

use crate::bits::Bits;

use super::peripheral::Peripheral;

pub const STATUS_ADDRESS: u32 = 0x1000_F000;
pub const MASK_ADDRESS: u32 = 0x1000_F010;

/// Interrupt controller. Every source latches a bit in I_STAT; the controller
/// drives INT0 of the core while any unmasked bit is set.
#[derive(Debug, Default)]
pub struct Intc {
    status: u32, // I_STAT
    mask: u32,   // I_MASK
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum InterruptSource {
    Gs = 0,
    Sbus = 1,
    VBlankStart = 2,
    VBlankEnd = 3,
    Vif0 = 4,
    Vif1 = 5,
    Vu0 = 6,
    Vu1 = 7,
    Ipu = 8,
    Timer0 = 9,
    Timer1 = 10,
    Timer2 = 11,
    Timer3 = 12,
    Sfifo = 13,
    Vu0Watchdog = 14,
}

impl InterruptSource {
    pub fn timer(index: usize) -> InterruptSource {
        match index {
            0 => InterruptSource::Timer0,
            1 => InterruptSource::Timer1,
            2 => InterruptSource::Timer2,
            _ => InterruptSource::Timer3,
        }
    }
}

impl Intc {
    pub fn new() -> Intc {
        Intc::default()
    }

    pub fn raise(&mut self, source: InterruptSource) {
        trace!("INTC source {} raised", source);
        self.status.set_bit(source as u32, true);
    }

    /// Level of the INT0 line.
    pub fn pending(&self) -> bool {
        self.status & self.mask != 0
    }
}

impl Peripheral for Intc {
    fn read32(&mut self, address: u32) -> u32 {
        match address {
            STATUS_ADDRESS => self.status,
            MASK_ADDRESS => self.mask,
            _ => {
                warn!("Unknown INTC read at {:#010x}", address);
                0
            }
        }
    }

    fn write32(&mut self, address: u32, value: u32) {
        match address {
            // Writing 1 acknowledges a source.
            STATUS_ADDRESS => self.status &= !value,
            // Writing 1 toggles a mask bit.
            MASK_ADDRESS => self.mask ^= value.bits(0..15),
            _ => warn!(
                "Unknown INTC write of {:#010x} at {:#010x}",
                value, address
            ),
        }
        trace!("I_STAT={:#06x} I_MASK={:#06x}", self.status, self.mask);
    }

    fn retained_bits(&mut self, _address: u32) -> u32 {
        0
    }
}
