use serde::{Deserialize, Serialize};

use super::envelope::{Envelope, Length};

const DIVISORS: [u32; 8] = [8, 16, 32, 48, 64, 80, 96, 112];

/// Channel 4: LFSR noise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct Noise {
    pub(super) enabled: bool,
    pub(super) dac: bool,
    lfsr: u16,
    shift: u8,
    narrow: bool,
    divisor: u8,
    timer: u32,
    pub(super) length: Length,
    pub(super) envelope: Envelope,
}

impl Noise {
    pub(super) fn new() -> Self {
        Self {
            enabled: false,
            dac: false,
            lfsr: 0x7FFF,
            shift: 0,
            narrow: false,
            divisor: 0,
            timer: 0,
            length: Length::default(),
            envelope: Envelope::default(),
        }
    }

    fn period(&self) -> u32 {
        DIVISORS[self.divisor as usize] << self.shift
    }

    pub(super) fn check_layout(&self) -> Result<(), String> {
        if self.divisor > 7 || self.shift > 15 || self.lfsr > 0x7FFF {
            return Err(format!(
                "divisor {} shift {} LFSR {:04X}",
                self.divisor, self.shift, self.lfsr
            ));
        }
        self.length.check_layout(64)?;
        self.envelope.check_layout()
    }

    pub(super) fn write_length(&mut self, value: u8) {
        self.length.load(64, (value & 0x3F) as u16);
    }

    pub(super) fn write_envelope(&mut self, value: u8) {
        self.envelope.write(value);
        self.dac = value & 0xF8 != 0;
        if !self.dac {
            self.enabled = false;
        }
    }

    pub(super) fn write_polynomial(&mut self, value: u8) {
        self.shift = value >> 4;
        self.narrow = value & 0x08 != 0;
        self.divisor = value & 0x07;
    }

    pub(super) fn write_control(&mut self, value: u8) {
        self.length.enabled = value & 0x40 != 0;
        if value & 0x80 != 0 {
            self.enabled = self.dac;
            self.length.trigger(64);
            self.timer = self.period();
            self.envelope.trigger();
            self.lfsr = 0x7FFF;
        }
    }

    fn clock_lfsr(&mut self) {
        let bit = (self.lfsr ^ (self.lfsr >> 1)) & 1;
        self.lfsr = (self.lfsr >> 1) | (bit << 14);
        if self.narrow {
            self.lfsr = (self.lfsr & !0x40) | (bit << 6);
        }
    }

    pub(super) fn step(&mut self, cycles: u32) {
        // Shifts 14 and 15 never clock the LFSR.
        if self.shift >= 14 {
            return;
        }
        let mut remaining = cycles;
        while remaining > 0 {
            if self.timer == 0 {
                self.timer = self.period();
            }
            let step = remaining.min(self.timer);
            self.timer -= step;
            remaining -= step;
            if self.timer == 0 {
                self.clock_lfsr();
            }
        }
    }

    pub(super) fn clock_length(&mut self) {
        if self.length.clock() {
            self.enabled = false;
        }
    }

    pub(super) fn output(&self) -> u8 {
        if !self.enabled || self.lfsr & 1 != 0 {
            return 0;
        }
        self.envelope.volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_mode_repeats_every_127_steps() {
        let mut ch = Noise::new();
        ch.write_polynomial(0x08);
        ch.clock_lfsr();
        let first = ch.lfsr & 0x7F;
        for _ in 0..126 {
            ch.clock_lfsr();
            assert_ne!(ch.lfsr & 0x7F, first);
        }
        ch.clock_lfsr();
        assert_eq!(ch.lfsr & 0x7F, first);
    }

    #[test]
    fn output_follows_inverted_lfsr_bit() {
        let mut ch = Noise::new();
        ch.write_envelope(0xA0);
        ch.write_control(0x80);
        // 0x7FFF has bit 0 set: silent until a zero is shifted down.
        assert_eq!(ch.output(), 0);
        let mut heard = false;
        for _ in 0..32 {
            ch.step(8);
            heard |= ch.output() == 10;
        }
        assert!(heard);
    }
}
