use serde::{Deserialize, Serialize};

use super::rtc::Rtc;
use super::{RamTarget, ROM_BANK_SIZE, RAM_BANK_SIZE};

/// MBC3 with optional real-time clock.
///
/// 0x4000-0x5FFF selects either a RAM bank (0x00-0x03) or one of the RTC
/// registers (0x08-0x0C) for the 0xA000-0xBFFF window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Mbc3 {
    ram_enable: bool,
    rom_bank: u8,
    select: u8,
    rtc: Option<Rtc>,
}

impl Mbc3 {
    pub(super) fn new(has_rtc: bool) -> Self {
        Self {
            ram_enable: false,
            rom_bank: 1,
            select: 0,
            rtc: has_rtc.then(Rtc::default),
        }
    }

    pub(super) fn write_control(&mut self, addr: u16, value: u8) {
        match addr {
            0x0000..=0x1FFF => self.ram_enable = (value & 0x0F) == 0x0A,
            0x2000..=0x3FFF => {
                self.rom_bank = match value & 0x7F {
                    0 => 1,
                    bank => bank,
                };
            }
            0x4000..=0x5FFF => self.select = value & 0x0F,
            0x6000..=0x7FFF => {
                if let Some(rtc) = &mut self.rtc {
                    rtc.write_latch(value);
                }
            }
            _ => {}
        }
    }

    pub(super) fn rom_offset(&self, addr: u16, rom_banks: usize) -> usize {
        let bank = if addr < 0x4000 { 0 } else { self.rom_bank as usize };
        (bank % rom_banks) * ROM_BANK_SIZE + (addr as usize & 0x3FFF)
    }

    pub(super) fn ram_target(&self, addr: u16, ram_len: usize) -> RamTarget {
        if !self.ram_enable {
            return RamTarget::Unmapped;
        }
        match self.select {
            0x00..=0x03 if ram_len > 0 => {
                let offset = self.select as usize * RAM_BANK_SIZE + (addr as usize & 0x1FFF);
                RamTarget::Ram(offset % ram_len)
            }
            0x08..=0x0C if self.rtc.is_some() => RamTarget::Clock,
            _ => RamTarget::Unmapped,
        }
    }

    pub(super) fn check_layout(&self, live: &Mbc3) -> Result<(), String> {
        match (&self.rtc, &live.rtc) {
            (Some(rtc), Some(_)) => rtc.check_layout(),
            (None, None) => Ok(()),
            _ => Err("RTC presence differs from the loaded cartridge".to_string()),
        }
    }

    pub(super) fn read_clock(&self) -> u8 {
        self.rtc.as_ref().map_or(0xFF, |rtc| rtc.read(self.select))
    }

    pub(super) fn write_clock(&mut self, value: u8) {
        if let Some(rtc) = &mut self.rtc {
            rtc.write(self.select, value);
        }
    }

    pub(super) fn tick(&mut self, cycles: u32) {
        if let Some(rtc) = &mut self.rtc {
            rtc.tick(cycles);
        }
    }

    pub(super) fn rom_bank(&self) -> usize {
        self.rom_bank as usize
    }
}
