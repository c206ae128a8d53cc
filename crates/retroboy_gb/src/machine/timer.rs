/// Timer / divider unit.
///
/// A free-running 16-bit counter advances once per T-cycle; DIV exposes its
/// upper byte. TIMA counts falling edges of the counter bit picked by
/// TAC[1:0], gated by the TAC enable bit. Register access lives in
/// `timer/io.rs`.
mod io;

use serde::{Deserialize, Serialize};

use crate::interrupts::Interrupts;

/// T-cycles between a TIMA overflow and the TMA reload / interrupt request.
const RELOAD_DELAY: u8 = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Timer {
    /// Hidden system counter; DIV is bits 15:8.
    counter: u16,
    tima: u8,
    tma: u8,
    /// Lower three bits of TAC.
    tac: u8,
    /// Counts down after an overflow while TIMA reads 0x00.
    reload_delay: u8,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    pub(crate) fn new() -> Self {
        Self {
            counter: 0,
            tima: 0,
            tma: 0,
            tac: 0,
            reload_delay: 0,
        }
    }

    /// DMG state at PC=0x0100: DIV reads 0xAB.
    pub(crate) fn init_dmg(&mut self) {
        *self = Self::new();
        self.counter = 0xABCC;
    }

    #[inline]
    fn enabled(&self) -> bool {
        (self.tac & 0x04) != 0
    }

    /// Selected counter bit for TAC[1:0]:
    /// - 00 → bit 9 (4096 Hz)
    /// - 01 → bit 3 (262144 Hz)
    /// - 10 → bit 5 (65536 Hz)
    /// - 11 → bit 7 (16384 Hz)
    #[inline]
    fn counter_mask(tac: u8) -> u16 {
        match tac & 0x03 {
            0x00 => 1 << 9,
            0x01 => 1 << 3,
            0x02 => 1 << 5,
            _ => 1 << 7,
        }
    }

    /// Timer input line: enable bit AND the selected counter bit.
    #[inline]
    fn input(&self) -> bool {
        self.enabled() && (self.counter & Self::counter_mask(self.tac)) != 0
    }

    #[inline]
    fn increment_tima(&mut self) {
        let (next, overflow) = self.tima.overflowing_add(1);
        self.tima = next;
        if overflow {
            self.reload_delay = RELOAD_DELAY;
        }
    }

    pub(crate) fn tick(&mut self, cycles: u32, requests: &mut Interrupts) {
        for _ in 0..cycles {
            self.tick_tcycle(requests);
        }
    }

    fn tick_tcycle(&mut self, requests: &mut Interrupts) {
        if self.reload_delay > 0 {
            self.reload_delay -= 1;
            if self.reload_delay == 0 {
                self.tima = self.tma;
                requests.insert(Interrupts::TIMER);
            }
        }

        let before = self.input();
        self.counter = self.counter.wrapping_add(1);
        if before && !self.input() {
            self.increment_tima();
        }
    }
}
