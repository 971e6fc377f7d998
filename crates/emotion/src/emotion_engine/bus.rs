use std::ops::Range;

use thiserror::Error;
use tracing::{trace, warn};

use crate::bytes::{convert, Bytes};

use super::peripheral::{Peripheral, SharedPeripheral};

pub const MAIN_MEMORY_SIZE: usize = 32 * 1024 * 1024;
pub const BOOT_MEMORY_SIZE: usize = 4 * 1024 * 1024;
pub const IOP_MEMORY_SIZE: usize = 2 * 1024 * 1024;

const MAIN_MEMORY: Range<u32> = 0x0000_0000..0x1000_0000;
const BOOT_MEMORY: Range<u32> = 0x1FC0_0000..0x2000_0000;
const IOP_MEMORY: Range<u32> = 0x1C00_0000..0x1C20_0000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BusError {
    #[error("no device mapped at {0:#010x}")]
    Unmapped(u32),
}

/// Where a peripheral is mapped. A single address claims its whole 16-byte
/// register slot.
#[derive(Debug, Clone)]
pub enum Region {
    Address(u32),
    Range(Range<u32>),
}

impl Region {
    pub fn contains(&self, address: u32) -> bool {
        match self {
            Region::Address(start) => address & !0xF == *start,
            Region::Range(range) => range.contains(&address),
        }
    }
}

pub struct Bus {
    pub main_memory: Box<[u8]>,
    pub boot_memory: Box<[u8]>,
    pub iop_memory: Box<[u8]>,
    peripherals: Vec<(Region, SharedPeripheral)>,
}

impl Default for Bus {
    fn default() -> Self {
        Bus::new()
    }
}

impl Bus {
    pub fn new() -> Bus {
        Bus {
            main_memory: vec![0; MAIN_MEMORY_SIZE].into_boxed_slice(),
            boot_memory: vec![0; BOOT_MEMORY_SIZE].into_boxed_slice(),
            iop_memory: vec![0; IOP_MEMORY_SIZE].into_boxed_slice(),
            peripherals: Vec::new(),
        }
    }

    /// Map a device. Earlier registrations win where regions overlap.
    pub fn register(&mut self, region: Region, device: SharedPeripheral) {
        self.peripherals.push((region, device));
    }

    fn peripheral(&self, address: u32) -> Option<&SharedPeripheral> {
        self.peripherals
            .iter()
            .find(|(region, _)| region.contains(address))
            .map(|(_, device)| device)
    }

    pub fn try_read<T: Bytes>(&self, address: u32) -> Result<T, BusError> {
        if MAIN_MEMORY.contains(&address) {
            let address = address as usize & (MAIN_MEMORY_SIZE - 1);
            return Ok(T::from_bytes(&self.main_memory[address..address + T::WIDTH]));
        }
        if BOOT_MEMORY.contains(&address) {
            let address = address as usize & (BOOT_MEMORY_SIZE - 1);
            return Ok(T::from_bytes(&self.boot_memory[address..address + T::WIDTH]));
        }
        if IOP_MEMORY.contains(&address) {
            let address = address as usize & (IOP_MEMORY_SIZE - 1);
            return Ok(T::from_bytes(&self.iop_memory[address..address + T::WIDTH]));
        }
        let device = self.peripheral(address).ok_or(BusError::Unmapped(address))?;
        let value = read_peripheral(&mut *device.borrow_mut(), address);
        trace!("Read from peripheral at {:#010x}", address);
        Ok(value)
    }

    pub fn try_write<T: Bytes>(&mut self, address: u32, value: T) -> Result<(), BusError> {
        if MAIN_MEMORY.contains(&address) {
            let address = address as usize & (MAIN_MEMORY_SIZE - 1);
            self.main_memory[address..address + T::WIDTH]
                .copy_from_slice(value.to_bytes().as_ref());
            return Ok(());
        }
        if BOOT_MEMORY.contains(&address) {
            trace!("Dropped write to boot memory at {:#010x}", address);
            return Ok(());
        }
        if IOP_MEMORY.contains(&address) {
            let address = address as usize & (IOP_MEMORY_SIZE - 1);
            self.iop_memory[address..address + T::WIDTH].copy_from_slice(value.to_bytes().as_ref());
            return Ok(());
        }
        let device = self.peripheral(address).ok_or(BusError::Unmapped(address))?;
        trace!("Write to peripheral at {:#010x}", address);
        write_peripheral(&mut *device.borrow_mut(), address, value);
        Ok(())
    }

    pub fn read<T: Bytes>(&self, address: u32) -> T {
        self.try_read(address).unwrap_or_else(|error| {
            warn!("Bus error on {}-byte read: {}", T::WIDTH, error);
            T::default()
        })
    }

    pub fn write<T: Bytes>(&mut self, address: u32, value: T) {
        if let Err(error) = self.try_write(address, value) {
            warn!("Bus error on {}-byte write: {}", T::WIDTH, error);
        }
    }
}

fn read_peripheral<T: Bytes>(device: &mut dyn Peripheral, address: u32) -> T {
    match T::WIDTH {
        1 => convert(device.read8(address)),
        2 => convert(device.read16(address)),
        4 => convert(device.read32(address)),
        8 => convert(device.read64(address)),
        _ => {
            let low = device.read64(address) as u128;
            let high = device.read64(address + 8) as u128;
            convert(high << 64 | low)
        }
    }
}

fn write_peripheral<T: Bytes>(device: &mut dyn Peripheral, address: u32, value: T) {
    let value: u128 = convert(value);
    match T::WIDTH {
        1 => device.write8(address, value as u8),
        2 => device.write16(address, value as u16),
        4 => device.write32(address, value as u32),
        8 => device.write64(address, value as u64),
        _ => {
            device.write64(address, value as u64);
            device.write64(address + 8, (value >> 64) as u64);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    #[derive(Default)]
    struct Recorder {
        writes: Vec<(u32, u32)>,
        reads: Vec<u32>,
    }

    impl Peripheral for Recorder {
        fn read32(&mut self, address: u32) -> u32 {
            self.reads.push(address);
            0x0BAD_F00D
        }

        fn write32(&mut self, address: u32, value: u32) {
            self.writes.push((address, value));
        }
    }

    #[test]
    fn main_memory_is_mirrored() {
        let mut bus = Bus::new();
        bus.write(0x0000_0100, 0xAABB_CCDDu32);
        assert_eq!(bus.read::<u32>(0x0200_0100), 0xAABB_CCDD);
        assert_eq!(bus.read::<u8>(0x0000_0101), 0xCC);
    }

    #[test]
    fn boot_memory_is_read_only() {
        let mut bus = Bus::new();
        bus.boot_memory[0..4].copy_from_slice(&[1, 2, 3, 4]);
        bus.write(0x1FC0_0000, 0u32);
        assert_eq!(bus.read::<u32>(0x1FC0_0000), 0x0403_0201);
    }

    #[test]
    fn iop_memory() {
        let mut bus = Bus::new();
        bus.write(0x1C00_0010, 0x1122_3344_5566_7788u64);
        assert_eq!(bus.iop_memory[0x10], 0x88);
        assert_eq!(bus.read::<u64>(0x1C00_0010), 0x1122_3344_5566_7788);
    }

    #[test]
    fn single_address_claims_a_register_slot() {
        let region = Region::Address(0x1000_F000);
        assert!(region.contains(0x1000_F000));
        assert!(region.contains(0x1000_F00C));
        assert!(!region.contains(0x1000_F010));
    }

    #[test]
    fn first_registration_wins() {
        let mut bus = Bus::new();
        let first = Rc::new(RefCell::new(Recorder::default()));
        let second = Rc::new(RefCell::new(Recorder::default()));
        bus.register(Region::Address(0x1000_F000), first.clone());
        bus.register(Region::Range(0x1000_8000..0x1001_0000), second.clone());
        bus.write(0x1000_F000, 1u32);
        bus.write(0x1000_F010, 2u32);
        assert_eq!(first.borrow().writes, vec![(0x1000_F000, 1)]);
        assert_eq!(second.borrow().writes, vec![(0x1000_F010, 2)]);
    }

    #[test]
    fn wide_peripheral_accesses_are_split() {
        let mut bus = Bus::new();
        let device = Rc::new(RefCell::new(Recorder::default()));
        bus.register(Region::Range(0x1000_2000..0x1000_3000), device.clone());
        bus.write(0x1000_2000, 0x4444_4444_3333_3333_2222_2222_1111_1111u128);
        assert_eq!(
            device.borrow().writes,
            vec![
                (0x1000_2000, 0x1111_1111),
                (0x1000_2004, 0x2222_2222),
                (0x1000_2008, 0x3333_3333),
                (0x1000_200C, 0x4444_4444),
            ]
        );
        assert_eq!(bus.read::<u16>(0x1000_2012), 0x0BAD);
        assert_eq!(device.borrow().reads, vec![0x1000_2010]);
    }

    #[test]
    fn unmapped_access_is_a_bus_error() {
        let mut bus = Bus::new();
        assert_eq!(bus.try_read::<u32>(0x1400_0000), Err(BusError::Unmapped(0x1400_0000)));
        assert_eq!(bus.try_write(0x1400_0000, 1u8), Err(BusError::Unmapped(0x1400_0000)));
        assert_eq!(bus.read::<u64>(0x1400_0000), 0);
    }
}
