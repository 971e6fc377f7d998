use std::collections::HashMap;

use tracing::trace;

use super::peripheral::Peripheral;

/// Stand-in for a unit whose registers only need to hold what software
/// writes, such as the VIFs and the IPU. Unwritten registers read 0.
#[derive(Debug)]
pub struct RegisterFile {
    name: &'static str,
    registers: HashMap<u32, u32>,
}

impl RegisterFile {
    pub fn new(name: &'static str) -> RegisterFile {
        RegisterFile {
            name,
            registers: HashMap::new(),
        }
    }
}

impl Peripheral for RegisterFile {
    fn read32(&mut self, address: u32) -> u32 {
        let value = self.registers.get(&address).copied().unwrap_or(0);
        trace!("{} read {:#010x} = {:#010x}", self.name, address, value);
        value
    }

    fn write32(&mut self, address: u32, value: u32) {
        trace!("{} write {:#010x} = {:#010x}", self.name, address, value);
        self.registers.insert(address, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_written_values() {
        let mut vif = RegisterFile::new("VIF0");
        assert_eq!(vif.read32(0x1000_3800), 0);
        vif.write32(0x1000_3800, 0xF);
        vif.write64(0x1000_3810, 0x1111_2222_3333_4444);
        assert_eq!(vif.read32(0x1000_3800), 0xF);
        assert_eq!(vif.read32(0x1000_3814), 0x1111_2222);
        assert_eq!(vif.read16(0x1000_3812), 0x3333);
    }
}
