use std::ops::Range;

use tracing::trace;

use crate::{bytes::Bytes, emotion_engine::bus::Bus};

use super::Core;

const SCRATCHPAD: Range<u32> = 0x7000_0000..0x7000_4000;
const UNCACHED_ACCELERATED: Range<u32> = 0x3010_0000..0x3200_0000;
const UNCACHED_ACCELERATED_OFFSET: u32 = 0x1000_0000;
const PHYSICAL_MASK: u32 = 0x1FFF_FFFF;

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum PhysicalAddress {
    Scratchpad(usize),
    Bus(u32),
}

/// Fixed segment mapping. The TLB is not consulted.
pub fn virtual_to_physical(virtual_address: u32) -> PhysicalAddress {
    if SCRATCHPAD.contains(&virtual_address) {
        return PhysicalAddress::Scratchpad((virtual_address - SCRATCHPAD.start) as usize);
    }
    let address = if UNCACHED_ACCELERATED.contains(&virtual_address) {
        virtual_address - UNCACHED_ACCELERATED_OFFSET
    } else {
        virtual_address
    };
    PhysicalAddress::Bus(address & PHYSICAL_MASK)
}

impl Core {
    pub fn read_virtual<T: Bytes>(&self, bus: &mut Bus, address: u32) -> T {
        match virtual_to_physical(address) {
            PhysicalAddress::Scratchpad(offset) => {
                let value = T::from_bytes(&self.scratchpad[offset..offset + T::WIDTH]);
                trace!("Read from scratchpad at {:#06x}", offset);
                value
            }
            PhysicalAddress::Bus(physical_address) => bus.read(physical_address),
        }
    }

    pub fn write_virtual<T: Bytes>(&mut self, bus: &mut Bus, address: u32, value: T) {
        match virtual_to_physical(address) {
            PhysicalAddress::Scratchpad(offset) => {
                trace!("Write to scratchpad at {:#06x}", offset);
                self.scratchpad[offset..offset + T::WIDTH]
                    .copy_from_slice(value.to_bytes().as_ref());
            }
            PhysicalAddress::Bus(physical_address) => bus.write(physical_address, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments() {
        assert_eq!(virtual_to_physical(0x8010_0000), PhysicalAddress::Bus(0x0010_0000));
        assert_eq!(virtual_to_physical(0xBFC0_0100), PhysicalAddress::Bus(0x1FC0_0100));
        assert_eq!(virtual_to_physical(0xB000_F000), PhysicalAddress::Bus(0x1000_F000));
        assert_eq!(virtual_to_physical(0x7000_3FF0), PhysicalAddress::Scratchpad(0x3FF0));
        assert_eq!(virtual_to_physical(0x7000_4000), PhysicalAddress::Bus(0x1000_4000));
    }

    #[test]
    fn uncached_accelerated_alias() {
        assert_eq!(virtual_to_physical(0x3010_0000), PhysicalAddress::Bus(0x0010_0000));
        assert_eq!(virtual_to_physical(0x31FF_FFF0), PhysicalAddress::Bus(0x01FF_FFF0));
        assert_eq!(virtual_to_physical(0x3200_0000), PhysicalAddress::Bus(0x1200_0000));
    }

    #[test]
    fn scratchpad_bypasses_the_bus() {
        let mut core = Core::new();
        let mut bus = Bus::new();
        core.write_virtual(&mut bus, 0x7000_0010, 0x1234_5678u32);
        assert_eq!(core.read_virtual::<u32>(&mut bus, 0x7000_0010), 0x1234_5678);
        assert_eq!(core.read_virtual::<u16>(&mut bus, 0x7000_0012), 0x1234);
        assert_eq!(bus.read::<u32>(0x0000_0010), 0);
    }

    #[test]
    fn alias_reaches_main_memory() {
        let mut core = Core::new();
        let mut bus = Bus::new();
        core.write_virtual(&mut bus, 0x3010_0040, 0xCAFEu16);
        assert_eq!(core.read_virtual::<u16>(&mut bus, 0x8010_0040), 0xCAFE);
    }
}
