use serde::{Deserialize, Serialize};

use super::{RamTarget, ROM_BANK_SIZE};

/// MBC2: 4-bit ROM bank register and 512 half-bytes of built-in RAM.
///
/// Both registers live in 0x0000-0x3FFF; address bit 8 picks which one a
/// write hits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Mbc2 {
    ram_enable: bool,
    rom_bank: u8,
}

impl Default for Mbc2 {
    fn default() -> Self {
        Self {
            ram_enable: false,
            rom_bank: 1,
        }
    }
}

impl Mbc2 {
    pub(super) fn write_control(&mut self, addr: u16, value: u8) {
        if addr >= 0x4000 {
            return;
        }
        if addr & 0x0100 == 0 {
            self.ram_enable = (value & 0x0F) == 0x0A;
        } else {
            self.rom_bank = match value & 0x0F {
                0 => 1,
                bank => bank,
            };
        }
    }

    pub(super) fn rom_offset(&self, addr: u16, rom_banks: usize) -> usize {
        let bank = if addr < 0x4000 { 0 } else { self.rom_bank as usize };
        (bank % rom_banks) * ROM_BANK_SIZE + (addr as usize & 0x3FFF)
    }

    /// The 512-entry RAM repeats across the whole 0xA000-0xBFFF window.
    pub(super) fn ram_target(&self, addr: u16) -> RamTarget {
        if !self.ram_enable {
            return RamTarget::Unmapped;
        }
        RamTarget::Nibble(addr as usize & 0x01FF)
    }

    pub(super) fn rom_bank(&self) -> usize {
        self.rom_bank as usize
    }
}
