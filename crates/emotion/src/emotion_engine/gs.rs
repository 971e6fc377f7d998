use derive_more::Display;
use enum_map::{enum_map, Enum, EnumMap};
use tracing::{debug, warn};

use crate::bits::Bits;

use super::peripheral::Peripheral;

// CSR
const SIGNAL: u64 = 0;
const FINISH: u64 = 1;
const HSYNC: u64 = 2;
const VSYNC: u64 = 3;
const EDGE_WRITE: u64 = 4;
const FIELD: u64 = 13;
const REVISION: u64 = 0x1B << 16;
const EVENT_FLAGS: u64 = 1 << SIGNAL | 1 << FINISH | 1 << HSYNC | 1 << VSYNC | 1 << EDGE_WRITE;

// IMR
const VSYNC_MASK: u64 = 11;

/// Privileged register file of the graphics synthesizer. Drawing is out of
/// scope; the registers hold their raw values.
#[derive(Debug)]
pub struct Gs {
    registers: EnumMap<PrivilegedRegister, u64>,
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Enum)]
pub enum PrivilegedRegister {
    #[display("PMODE")]
    PcrtcMode,
    #[display("SMODE1")]
    SyncMode1,
    #[display("SMODE2")]
    SyncMode2,
    #[display("SRFSH")]
    DramRefresh,
    #[display("SYNCH1")]
    Synch1,
    #[display("SYNCH2")]
    Synch2,
    #[display("SYNCV")]
    Syncv,
    #[display("DISPFB1")]
    DisplayFrameBuffer1,
    #[display("DISPLAY1")]
    Display1,
    #[display("DISPFB2")]
    DisplayFrameBuffer2,
    #[display("DISPLAY2")]
    Display2,
    #[display("EXTBUF")]
    WriteBuffer,
    #[display("EXTDATA")]
    WriteData,
    #[display("EXTWRITE")]
    WriteStart,
    #[display("BGCOLOR")]
    BackgroundColor,
    #[display("CSR")]
    Status,
    #[display("IMR")]
    InterruptMask,
    #[display("BUSDIR")]
    BusDirection,
    #[display("SIGLBLID")]
    SignalLabelId,
}

impl PrivilegedRegister {
    pub fn from_address(address: u32) -> Option<PrivilegedRegister> {
        Some(match address & !0xF {
            0x1200_0000 => PrivilegedRegister::PcrtcMode,
            0x1200_0010 => PrivilegedRegister::SyncMode1,
            0x1200_0020 => PrivilegedRegister::SyncMode2,
            0x1200_0030 => PrivilegedRegister::DramRefresh,
            0x1200_0040 => PrivilegedRegister::Synch1,
            0x1200_0050 => PrivilegedRegister::Synch2,
            0x1200_0060 => PrivilegedRegister::Syncv,
            0x1200_0070 => PrivilegedRegister::DisplayFrameBuffer1,
            0x1200_0080 => PrivilegedRegister::Display1,
            0x1200_0090 => PrivilegedRegister::DisplayFrameBuffer2,
            0x1200_00A0 => PrivilegedRegister::Display2,
            0x1200_00B0 => PrivilegedRegister::WriteBuffer,
            0x1200_00C0 => PrivilegedRegister::WriteData,
            0x1200_00D0 => PrivilegedRegister::WriteStart,
            0x1200_00E0 => PrivilegedRegister::BackgroundColor,
            0x1200_1000 => PrivilegedRegister::Status,
            0x1200_1010 => PrivilegedRegister::InterruptMask,
            0x1200_1040 => PrivilegedRegister::BusDirection,
            0x1200_1080 => PrivilegedRegister::SignalLabelId,
            _ => return None,
        })
    }
}

impl Default for Gs {
    fn default() -> Self {
        Gs::new()
    }
}

impl Gs {
    pub fn new() -> Gs {
        Gs {
            registers: enum_map! {
                PrivilegedRegister::Status => REVISION,
                PrivilegedRegister::InterruptMask => 0x7F00,
                _ => 0,
            },
        }
    }

    /// Latch the vertical sync event. Returns whether the GS interrupt line
    /// should be raised.
    pub fn vblank(&mut self) -> bool {
        let mut status = self.registers[PrivilegedRegister::Status];
        status.set_bit(VSYNC, true);
        status.set_bit(FIELD, !status.bit(FIELD));
        self.registers[PrivilegedRegister::Status] = status;
        !self.registers[PrivilegedRegister::InterruptMask].bit(VSYNC_MASK)
    }
}

impl Peripheral for Gs {
    fn read64(&mut self, address: u32) -> u64 {
        match PrivilegedRegister::from_address(address) {
            Some(register) => self.registers[register],
            None => {
                warn!("Invalid GS read at {:#010x}", address);
                0
            }
        }
    }

    fn write64(&mut self, address: u32, value: u64) {
        let Some(register) = PrivilegedRegister::from_address(address) else {
            warn!("Invalid GS write of {:#x} at {:#010x}", value, address);
            return;
        };
        debug!("{} = {:#018x}", register, value);
        match register {
            PrivilegedRegister::Status => {
                // Event flags are acknowledged by writing 1.
                self.registers[register] &= !(value & EVENT_FLAGS);
            }
            _ => self.registers[register] = value,
        }
    }

    fn read32(&mut self, address: u32) -> u32 {
        let value = self.read64(address & !0b111);
        (value >> ((address & 0b100) * 8)) as u32
    }

    fn write32(&mut self, address: u32, value: u32) {
        let aligned_address = address & !0b111;
        let offset_bits = (address & 0b100) as u64 * 8;
        let existing = match PrivilegedRegister::from_address(aligned_address) {
            // Writing back the event flags would acknowledge them.
            Some(PrivilegedRegister::Status) => 0,
            _ => self.read64(aligned_address),
        };
        let value = existing & !u64::mask(offset_bits..offset_bits + 32)
            | (value as u64) << offset_bits;
        self.write64(aligned_address, value);
    }

    fn retained_bits(&mut self, address: u32) -> u32 {
        match PrivilegedRegister::from_address(address) {
            Some(PrivilegedRegister::Status) => 0,
            _ => u32::MAX,
        }
    }
}
