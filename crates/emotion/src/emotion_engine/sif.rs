use tracing::{info, warn};

use crate::bits::Bits;

use super::peripheral::Peripheral;

// SMFLG bit the IOP sets once its kernel is up.
const IOP_READY: u32 = 16;

/// Mailbox registers between the EE and the IOP. The IOP side is not
/// emulated, so it is reported as booted.
#[derive(Debug, Default)]
pub struct Sif {
    main_command: u32, // MSCOM, written by the EE
    sub_command: u32,  // SMCOM, written by the IOP
    main_flag: u32,    // MSFLG
    sub_flag: u32,     // SMFLG
    control: u32,      // CTRL
    bd6: u32,
}

impl Sif {
    pub fn new() -> Sif {
        Sif {
            sub_flag: 1 << IOP_READY,
            ..Default::default()
        }
    }

    fn name(address: u32) -> Option<&'static str> {
        Some(match address & 0xFF {
            0x00 => "SIF_MSCOM",
            0x10 => "SIF_SMCOM",
            0x20 => "SIF_MSFLG",
            0x30 => "SIF_SMFLG",
            0x40 => "SIF_CTRL",
            0x60 => "SIF_BD6",
            _ => return None,
        })
    }
}

impl Peripheral for Sif {
    fn read32(&mut self, address: u32) -> u32 {
        match address & 0xFF {
            0x00 => self.main_command,
            0x10 => self.sub_command,
            0x20 => self.main_flag,
            0x30 => self.sub_flag,
            0x40 => self.control,
            0x60 => self.bd6,
            _ => {
                warn!("Invalid SIF read at {:#010x}", address);
                0
            }
        }
    }

    fn write32(&mut self, address: u32, value: u32) {
        let Some(name) = Sif::name(address) else {
            warn!("Invalid SIF write of {:#010x} at {:#010x}", value, address);
            return;
        };
        info!("{} = {:#010x}", name, value);
        match address & 0xFF {
            0x00 => self.main_command = value,
            // Only the IOP writes SMCOM.
            0x10 => {}
            0x20 => self.main_flag |= value,
            // The EE clears SMFLG bits by writing 1.
            0x30 => self.sub_flag &= !value,
            0x40 => {
                let mut control = value | 0xF000_0000;
                control.set_bit(0, true);
                self.control = control;
            }
            _ => self.bd6 = value,
        }
    }

    fn retained_bits(&mut self, address: u32) -> u32 {
        match address & 0xFF {
            0x30 => 0,
            _ => u32::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iop_reports_ready() {
        let mut sif = Sif::new();
        assert_eq!(sif.read32(0x1000_F230), 1 << IOP_READY);
    }

    #[test]
    fn mailbox_and_flags() {
        let mut sif = Sif::new();
        sif.write32(0x1000_F200, 0x1234);
        sif.write32(0x1000_F210, 0x5678);
        sif.write32(0x1000_F220, 0b01);
        sif.write32(0x1000_F220, 0b10);
        sif.write32(0x1000_F230, 1 << IOP_READY);
        assert_eq!(sif.read32(0x1000_F200), 0x1234);
        assert_eq!(sif.read32(0x1000_F210), 0);
        assert_eq!(sif.read32(0x1000_F220), 0b11);
        assert_eq!(sif.read32(0x1000_F230), 0);
    }

    #[test]
    fn byte_write_to_sub_flag_keeps_ready_bit() {
        let mut sif = Sif::new();
        sif.write8(0x1000_F230, 0x01);
        assert_eq!(sif.read32(0x1000_F230), 1 << IOP_READY);
    }

    #[test]
    fn control_forces_fixed_bits() {
        let mut sif = Sif::new();
        sif.write32(0x1000_F240, 0x100);
        assert_eq!(sif.read32(0x1000_F240), 0xF000_0101);
    }
}
