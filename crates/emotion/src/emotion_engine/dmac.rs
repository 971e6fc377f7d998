use derive_more::Display;
use enum_map::{Enum, EnumMap};
use tracing::{debug, trace, warn};

use super::peripheral::Peripheral;

pub const ENABLE_READ_ADDRESS: u32 = 0x1000_F520;
pub const ENABLE_WRITE_ADDRESS: u32 = 0x1000_F590;

// D_STAT: channel interrupt status in the low half, masks in the high half.
const STATUS_FLAGS: u32 = 0x0000_E3FF;
const MASK_FLAGS: u32 = 0x63FF_0000;

/// DMA controller register file. Transfers are not performed; software sees
/// registers that hold what it writes.
#[derive(Debug)]
pub struct Dmac {
    control: u32,            // D_CTRL
    status: u32,             // D_STAT
    priority_control: u32,   // D_PCR
    skip_quad_word: u32,     // D_SQWC
    ring_buffer_size: u32,   // D_RBSR
    ring_buffer_offset: u32, // D_RBOR
    stall_address: u32,      // D_STADR
    hold: u32,               // D_ENABLER, written through D_ENABLEW
    channels: EnumMap<Channel, ChannelRegisters>,
}

#[derive(Debug, Display, Enum, Copy, Clone, PartialEq, Eq)]
pub enum Channel {
    Vif0,
    Vif1,
    Gif,
    FromIpu,
    ToIpu,
    Sif0,
    Sif1,
    Sif2,
    FromSpr,
    ToSpr,
}

impl Channel {
    fn from_address(address: u32) -> Option<Channel> {
        Some(match address {
            0x1000_8000..0x1000_9000 => Channel::Vif0,
            0x1000_9000..0x1000_A000 => Channel::Vif1,
            0x1000_A000..0x1000_B000 => Channel::Gif,
            0x1000_B000..0x1000_B400 => Channel::FromIpu,
            0x1000_B400..0x1000_C000 => Channel::ToIpu,
            0x1000_C000..0x1000_C400 => Channel::Sif0,
            0x1000_C400..0x1000_C800 => Channel::Sif1,
            0x1000_C800..0x1000_D000 => Channel::Sif2,
            0x1000_D000..0x1000_D400 => Channel::FromSpr,
            0x1000_D400..0x1000_E000 => Channel::ToSpr,
            _ => return None,
        })
    }
}

#[derive(Debug, Default, Clone)]
struct ChannelRegisters {
    control: u32,                   // CHCR
    memory_address: u32,            // MADR
    quad_word_count: u32,           // QWC
    tag_address: u32,               // TADR
    tag_address_save_0: u32,        // ASR0
    tag_address_save_1: u32,        // ASR1
    scratchpad_memory_address: u32, // SADR
}

impl ChannelRegisters {
    fn register(&mut self, offset: u32) -> Option<&mut u32> {
        Some(match offset {
            0x00 => &mut self.control,
            0x10 => &mut self.memory_address,
            0x20 => &mut self.quad_word_count,
            0x30 => &mut self.tag_address,
            0x40 => &mut self.tag_address_save_0,
            0x50 => &mut self.tag_address_save_1,
            0x80 => &mut self.scratchpad_memory_address,
            _ => return None,
        })
    }
}

impl Default for Dmac {
    fn default() -> Self {
        Dmac::new()
    }
}

impl Dmac {
    pub fn new() -> Dmac {
        Dmac {
            control: 0,
            status: 0,
            priority_control: 0,
            skip_quad_word: 0,
            ring_buffer_size: 0,
            ring_buffer_offset: 0,
            stall_address: 0,
            hold: 0x1201,
            channels: Default::default(),
        }
    }

    fn global_register(&mut self, address: u32) -> Option<&mut u32> {
        Some(match address {
            0x1000_E000 => &mut self.control,
            0x1000_E010 => &mut self.status,
            0x1000_E020 => &mut self.priority_control,
            0x1000_E030 => &mut self.skip_quad_word,
            0x1000_E040 => &mut self.ring_buffer_size,
            0x1000_E050 => &mut self.ring_buffer_offset,
            0x1000_E060 => &mut self.stall_address,
            ENABLE_READ_ADDRESS | ENABLE_WRITE_ADDRESS => &mut self.hold,
            _ => return None,
        })
    }
}

impl Peripheral for Dmac {
    fn read32(&mut self, address: u32) -> u32 {
        let value = match Channel::from_address(address) {
            Some(channel) => self.channels[channel]
                .register(address & 0xFF)
                .map(|register| *register),
            None => self.global_register(address).map(|register| *register),
        };
        value.unwrap_or_else(|| {
            warn!("Invalid DMAC read at {:#010x}", address);
            0
        })
    }

    fn write32(&mut self, address: u32, value: u32) {
        if let Some(channel) = Channel::from_address(address) {
            match self.channels[channel].register(address & 0xFF) {
                Some(register) => {
                    trace!("DMAC {} {:#04x} = {:#010x}", channel, address & 0xFF, value);
                    *register = value;
                }
                None => warn!("Invalid DMAC write of {:#010x} at {:#010x}", value, address),
            }
            return;
        }
        match address {
            0x1000_E010 => {
                // Writing 1 clears a status bit and toggles a mask bit.
                self.status &= !(value & STATUS_FLAGS);
                self.status ^= value & MASK_FLAGS;
            }
            ENABLE_READ_ADDRESS => {
                warn!("Write of {:#010x} to read-only D_ENABLER", value);
                return;
            }
            _ => match self.global_register(address) {
                Some(register) => *register = value,
                None => {
                    warn!("Invalid DMAC write of {:#010x} at {:#010x}", value, address);
                    return;
                }
            },
        }
        debug!("DMAC {:#010x} = {:#010x}", address, value);
    }

    fn retained_bits(&mut self, address: u32) -> u32 {
        match address {
            0x1000_E010 => 0,
            _ => u32::MAX,
        }
    }
}
