use tracing::{trace, warn};

use crate::bits::Bits;

use super::peripheral::Peripheral;

pub const RICM_ADDRESS: u32 = 0x1000_F430;
pub const DRD_ADDRESS: u32 = 0x1000_F440;

// Number of RDRAM devices reported to the boot ROM's enumeration.
const DEVICES: u32 = 2;

/// Memory controller hub. Only the command handshake the boot ROM uses to
/// size RDRAM is emulated.
#[derive(Debug, Default, Clone)]
pub struct Rdram {
    mch_ricm: u32,
    mch_drd: u32,
    sdevid: u32,
}

impl Rdram {
    pub fn new() -> Rdram {
        Rdram::default()
    }
}

impl Peripheral for Rdram {
    fn write32(&mut self, address: u32, value: u32) {
        match address {
            RICM_ADDRESS => {
                let sa = value.bits(16..24);
                let sbc = value.bits(6..10);
                if sa == 0x21 && sbc == 0x1 && !self.mch_drd.bit(7) {
                    self.sdevid = 0;
                }
                self.mch_ricm = value.bits(0..31);
                trace!("MCH_RICM = {:#010x}", self.mch_ricm);
            }
            DRD_ADDRESS => self.mch_drd = value,
            _ => warn!(
                "Invalid RDRAM write of {:#010x} at {:#010x}",
                value, address
            ),
        }
    }

    fn read32(&mut self, address: u32) -> u32 {
        match address {
            RICM_ADDRESS => 0,
            DRD_ADDRESS => {
                if self.mch_ricm.bits(6..10) != 0 {
                    return 0;
                }
                match self.mch_ricm.bits(16..24) {
                    0x21 if self.sdevid < DEVICES => {
                        self.sdevid += 1;
                        0x1F
                    }
                    0x23 => 0x0D0D,
                    0x24 => 0x0090,
                    0x40 => self.mch_ricm.bits(0..5),
                    _ => 0,
                }
            }
            _ => {
                warn!("Invalid RDRAM read at {:#010x}", address);
                0
            }
        }
    }
}
