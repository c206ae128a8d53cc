use serde::{Deserialize, Serialize};

use super::{RamTarget, ROM_BANK_SIZE, RAM_BANK_SIZE};

/// MBC5: 9-bit ROM bank (bank 0 is selectable) and 4-bit RAM bank.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Mbc5 {
    ram_enable: bool,
    rom_bank: u16,
    ram_bank: u8,
    rumble: bool,
}

impl Mbc5 {
    pub(super) fn new(rumble: bool) -> Self {
        Self {
            rom_bank: 1,
            rumble,
            ..Self::default()
        }
    }

    pub(super) fn write_control(&mut self, addr: u16, value: u8) {
        match addr {
            0x0000..=0x1FFF => self.ram_enable = (value & 0x0F) == 0x0A,
            0x2000..=0x2FFF => self.rom_bank = (self.rom_bank & 0x100) | value as u16,
            0x3000..=0x3FFF => {
                self.rom_bank = (self.rom_bank & 0x0FF) | (((value & 0x01) as u16) << 8)
            }
            0x4000..=0x5FFF => {
                // Rumble carts wire bit 3 to the motor.
                self.ram_bank = if self.rumble { value & 0x07 } else { value & 0x0F };
            }
            _ => {}
        }
    }

    pub(super) fn rom_offset(&self, addr: u16, rom_banks: usize) -> usize {
        let bank = if addr < 0x4000 { 0 } else { self.rom_bank as usize };
        (bank % rom_banks) * ROM_BANK_SIZE + (addr as usize & 0x3FFF)
    }

    pub(super) fn ram_target(&self, addr: u16, ram_len: usize) -> RamTarget {
        if !self.ram_enable || ram_len == 0 {
            return RamTarget::Unmapped;
        }
        let offset = self.ram_bank as usize * RAM_BANK_SIZE + (addr as usize & 0x1FFF);
        RamTarget::Ram(offset % ram_len)
    }

    pub(super) fn rom_bank(&self) -> usize {
        self.rom_bank as usize
    }
}
