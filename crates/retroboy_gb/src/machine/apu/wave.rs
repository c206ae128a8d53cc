use serde::{Deserialize, Serialize};

use super::envelope::Length;

/// Channel 3: 32 4-bit samples played from wave RAM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct Wave {
    pub(super) enabled: bool,
    pub(super) dac: bool,
    pub(super) ram: [u8; 16],
    volume_code: u8,
    frequency: u16,
    timer: u32,
    position: u8,
    pub(super) length: Length,
}

impl Wave {
    pub(super) fn new() -> Self {
        Self {
            enabled: false,
            dac: false,
            // DMG wave RAM comes up in a pseudo-random pattern; this one is common.
            ram: [
                0x84, 0x40, 0x43, 0xAA, 0x2D, 0x78, 0x92, 0x3C, 0x60, 0x59, 0x59, 0xB0, 0x34,
                0xB8, 0x2E, 0xDA,
            ],
            volume_code: 0,
            frequency: 0,
            timer: 0,
            position: 0,
            length: Length::default(),
        }
    }

    fn period(&self) -> u32 {
        (2048 - self.frequency as u32) * 2
    }

    pub(super) fn check_layout(&self) -> Result<(), String> {
        if self.frequency > 2047 || self.position > 31 || self.volume_code > 3 {
            return Err(format!(
                "frequency {} position {} volume code {}",
                self.frequency, self.position, self.volume_code
            ));
        }
        self.length.check_layout(256)
    }

    pub(super) fn write_dac(&mut self, value: u8) {
        self.dac = value & 0x80 != 0;
        if !self.dac {
            self.enabled = false;
        }
    }

    pub(super) fn write_length(&mut self, value: u8) {
        self.length.load(256, value as u16);
    }

    pub(super) fn write_volume(&mut self, value: u8) {
        self.volume_code = (value >> 5) & 0x03;
    }

    pub(super) fn write_frequency_low(&mut self, value: u8) {
        self.frequency = (self.frequency & 0x0700) | value as u16;
    }

    pub(super) fn write_control(&mut self, value: u8) {
        self.frequency = (self.frequency & 0x00FF) | (((value & 0x07) as u16) << 8);
        self.length.enabled = value & 0x40 != 0;
        if value & 0x80 != 0 {
            self.enabled = self.dac;
            self.length.trigger(256);
            self.timer = self.period();
            self.position = 0;
        }
    }

    pub(super) fn step(&mut self, cycles: u32) {
        let mut remaining = cycles;
        while remaining > 0 {
            if self.timer == 0 {
                self.timer = self.period();
            }
            let step = remaining.min(self.timer);
            self.timer -= step;
            remaining -= step;
            if self.timer == 0 {
                self.position = (self.position + 1) & 0x1F;
            }
        }
    }

    pub(super) fn clock_length(&mut self) {
        if self.length.clock() {
            self.enabled = false;
        }
    }

    fn sample(&self) -> u8 {
        let byte = self.ram[(self.position / 2) as usize];
        if self.position % 2 == 0 {
            byte >> 4
        } else {
            byte & 0x0F
        }
    }

    pub(super) fn output(&self) -> u8 {
        if !self.enabled {
            return 0;
        }
        match self.volume_code {
            0 => 0,
            code => self.sample() >> (code - 1),
        }
    }
}
