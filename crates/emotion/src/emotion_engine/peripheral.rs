use std::{cell::RefCell, rc::Rc};

/// A memory-mapped register file on the EE bus.
///
/// Addresses are physical. Devices only have to implement the 32-bit accessors;
/// narrower accesses read-modify-write the containing word and 64-bit accesses
/// are split into two words.
pub trait Peripheral {
    fn read32(&mut self, address: u32) -> u32;
    fn write32(&mut self, address: u32, value: u32);

    /// Bits of the word at `address` that a narrow write carries over from
    /// the current value. Write-1-to-clear and toggle fields must be left out,
    /// so that the other lanes are written as zero.
    fn retained_bits(&mut self, _address: u32) -> u32 {
        u32::MAX
    }

    fn read8(&mut self, address: u32) -> u8 {
        let shift = (address & 0b11) * 8;
        (self.read32(address & !0b11) >> shift) as u8
    }

    fn read16(&mut self, address: u32) -> u16 {
        let shift = (address & 0b10) * 8;
        (self.read32(address & !0b11) >> shift) as u16
    }

    fn read64(&mut self, address: u32) -> u64 {
        let low = self.read32(address) as u64;
        let high = self.read32(address + 4) as u64;
        high << 32 | low
    }

    fn write8(&mut self, address: u32, value: u8) {
        let aligned = address & !0b11;
        let shift = (address & 0b11) * 8;
        let current = self.read32(aligned) & self.retained_bits(aligned);
        let word = current & !(0xFF << shift) | (value as u32) << shift;
        self.write32(aligned, word);
    }

    fn write16(&mut self, address: u32, value: u16) {
        let aligned = address & !0b11;
        let shift = (address & 0b10) * 8;
        let current = self.read32(aligned) & self.retained_bits(aligned);
        let word = current & !(0xFFFF << shift) | (value as u32) << shift;
        self.write32(aligned, word);
    }

    fn write64(&mut self, address: u32, value: u64) {
        self.write32(address, value as u32);
        self.write32(address + 4, (value >> 32) as u32);
    }
}

pub type SharedPeripheral = Rc<RefCell<dyn Peripheral>>;
