use serde::{Deserialize, Serialize};

use crate::machine::CYCLES_PER_SECOND;

const SECONDS: usize = 0;
const MINUTES: usize = 1;
const HOURS: usize = 2;
const DAY_LOW: usize = 3;
const DAY_HIGH: usize = 4;

const DAY_HIGH_BIT8: u8 = 0x01;
const DAY_HIGH_HALT: u8 = 0x40;
const DAY_HIGH_CARRY: u8 = 0x80;

/// Writable bits of each register.
const MASKS: [u8; 5] = [0x3F, 0x3F, 0x1F, 0xFF, 0xC1];

/// MBC3 real-time clock.
///
/// Registers 0x08-0x0C map to `regs[0..5]`. The clock counts emulated
/// cycles rather than host time, so a session replays identically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Rtc {
    regs: [u8; 5],
    latched: [u8; 5],
    subsecond: u32,
    /// Last value written to 0x6000-0x7FFF; a 0x00 -> 0x01 sequence latches.
    last_latch_write: Option<u8>,
}

impl Rtc {
    pub(super) fn check_layout(&self) -> Result<(), String> {
        let in_mask = |regs: &[u8; 5]| regs.iter().zip(MASKS).all(|(&r, m)| r & !m == 0);
        if !in_mask(&self.regs) || !in_mask(&self.latched) {
            return Err(format!("RTC registers {:02X?} exceed their widths", self.regs));
        }
        if self.subsecond >= CYCLES_PER_SECOND {
            return Err(format!("RTC sub-second counter at {}", self.subsecond));
        }
        Ok(())
    }

    pub(super) fn tick(&mut self, cycles: u32) {
        if self.regs[DAY_HIGH] & DAY_HIGH_HALT != 0 {
            return;
        }
        self.subsecond += cycles;
        while self.subsecond >= CYCLES_PER_SECOND {
            self.subsecond -= CYCLES_PER_SECOND;
            self.advance_second();
        }
    }

    fn advance_second(&mut self) {
        // Out-of-range values written by software count up to the field's
        // bit width before wrapping, without carrying.
        self.regs[SECONDS] = (self.regs[SECONDS] + 1) & 0x3F;
        if self.regs[SECONDS] != 60 {
            return;
        }
        self.regs[SECONDS] = 0;

        self.regs[MINUTES] = (self.regs[MINUTES] + 1) & 0x3F;
        if self.regs[MINUTES] != 60 {
            return;
        }
        self.regs[MINUTES] = 0;

        self.regs[HOURS] = (self.regs[HOURS] + 1) & 0x1F;
        if self.regs[HOURS] != 24 {
            return;
        }
        self.regs[HOURS] = 0;

        let day = self.day().wrapping_add(1);
        if day > 0x1FF {
            self.set_day(0);
            self.regs[DAY_HIGH] |= DAY_HIGH_CARRY;
        } else {
            self.set_day(day);
        }
    }

    fn day(&self) -> u16 {
        (((self.regs[DAY_HIGH] & DAY_HIGH_BIT8) as u16) << 8) | self.regs[DAY_LOW] as u16
    }

    fn set_day(&mut self, day: u16) {
        self.regs[DAY_LOW] = day as u8;
        self.regs[DAY_HIGH] = (self.regs[DAY_HIGH] & !DAY_HIGH_BIT8) | ((day >> 8) as u8 & 0x01);
    }

    pub(super) fn write_latch(&mut self, value: u8) {
        if self.last_latch_write == Some(0x00) && value == 0x01 {
            self.latched = self.regs;
            log::debug!("RTC latched: {:02X?}", self.latched);
        }
        self.last_latch_write = Some(value);
    }

    /// Read a latched register; `select` is the 0x08-0x0C bank value.
    pub(super) fn read(&self, select: u8) -> u8 {
        let index = (select - 0x08) as usize;
        self.latched[index] & MASKS[index]
    }

    pub(super) fn write(&mut self, select: u8, value: u8) {
        let index = (select - 0x08) as usize;
        if index == SECONDS {
            self.subsecond = 0;
        }
        self.regs[index] = value & MASKS[index];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latch(rtc: &mut Rtc) {
        rtc.write_latch(0x00);
        rtc.write_latch(0x01);
    }

    #[test]
    fn counts_emulated_seconds() {
        let mut rtc = Rtc::default();
        rtc.tick(CYCLES_PER_SECOND * 61);
        latch(&mut rtc);
        assert_eq!(rtc.read(0x08), 1);
        assert_eq!(rtc.read(0x09), 1);
    }

    #[test]
    fn latch_requires_zero_then_one() {
        let mut rtc = Rtc::default();
        rtc.tick(CYCLES_PER_SECOND * 5);
        rtc.write_latch(0x01);
        assert_eq!(rtc.read(0x08), 0);
        rtc.write_latch(0x00);
        rtc.write_latch(0x01);
        assert_eq!(rtc.read(0x08), 5);

        // Latched values stay frozen while the clock keeps running.
        rtc.tick(CYCLES_PER_SECOND * 3);
        assert_eq!(rtc.read(0x08), 5);
    }

    #[test]
    fn layout_check_rejects_out_of_width_registers() {
        let mut rtc = Rtc::default();
        rtc.write(0x08, 0xFF);
        assert_eq!(rtc.check_layout(), Ok(()));

        rtc.regs[SECONDS] = 0xFF;
        assert!(rtc.check_layout().is_err());

        let mut rtc = Rtc::default();
        rtc.latched[HOURS] = 0x20;
        assert!(rtc.check_layout().is_err());

        let mut rtc = Rtc::default();
        rtc.subsecond = CYCLES_PER_SECOND;
        assert!(rtc.check_layout().is_err());
    }

    #[test]
    fn halt_stops_the_clock() {
        let mut rtc = Rtc::default();
        rtc.write(0x0C, 0x40);
        rtc.tick(CYCLES_PER_SECOND * 10);
        latch(&mut rtc);
        assert_eq!(rtc.read(0x08), 0);
    }

    #[test]
    fn day_counter_overflow_sets_carry() {
        let mut rtc = Rtc::default();
        rtc.write(0x0B, 0xFF);
        rtc.write(0x0C, 0x01);
        rtc.write(0x0A, 23);
        rtc.write(0x09, 59);
        rtc.write(0x08, 59);
        rtc.tick(CYCLES_PER_SECOND);
        latch(&mut rtc);
        assert_eq!(rtc.read(0x0B), 0);
        assert_eq!(rtc.read(0x0C) & 0x81, 0x80);
    }
}
