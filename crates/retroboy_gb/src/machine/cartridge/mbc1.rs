use serde::{Deserialize, Serialize};

use super::{RamTarget, ROM_BANK_SIZE, RAM_BANK_SIZE};

/// MBC1 bank registers.
///
/// `bank1` is the 5-bit ROM bank register (0x2000-0x3FFF) and `bank2` the
/// 2-bit register at 0x4000-0x5FFF that supplies ROM bits 5-6 or the RAM
/// bank depending on `mode`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Mbc1 {
    ram_enable: bool,
    bank1: u8,
    bank2: u8,
    mode: bool,
}

impl Default for Mbc1 {
    fn default() -> Self {
        Self {
            ram_enable: false,
            bank1: 1,
            bank2: 0,
            mode: false,
        }
    }
}

impl Mbc1 {
    pub(super) fn write_control(&mut self, addr: u16, value: u8) {
        match addr {
            0x0000..=0x1FFF => self.ram_enable = (value & 0x0F) == 0x0A,
            0x2000..=0x3FFF => {
                // Bank 0 is not selectable through the low register.
                self.bank1 = match value & 0x1F {
                    0 => 1,
                    bank => bank,
                };
            }
            0x4000..=0x5FFF => self.bank2 = value & 0x03,
            0x6000..=0x7FFF => self.mode = (value & 0x01) != 0,
            _ => {}
        }
    }

    pub(super) fn rom_offset(&self, addr: u16, rom_banks: usize) -> usize {
        let bank = if addr < 0x4000 {
            if self.mode {
                (self.bank2 as usize) << 5
            } else {
                0
            }
        } else {
            ((self.bank2 as usize) << 5) | self.bank1 as usize
        };
        (bank % rom_banks) * ROM_BANK_SIZE + (addr as usize & 0x3FFF)
    }

    pub(super) fn ram_target(&self, addr: u16, ram_len: usize) -> RamTarget {
        if !self.ram_enable || ram_len == 0 {
            return RamTarget::Unmapped;
        }
        let bank = if self.mode { self.bank2 as usize } else { 0 };
        let offset = bank * RAM_BANK_SIZE + (addr as usize & 0x1FFF);
        RamTarget::Ram(offset % ram_len)
    }

    pub(super) fn rom_bank(&self) -> usize {
        ((self.bank2 as usize) << 5) | self.bank1 as usize
    }
}
