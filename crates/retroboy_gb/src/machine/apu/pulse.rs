use serde::{Deserialize, Serialize};

use super::envelope::{Envelope, Length};

const DUTY_TABLE: [[u8; 8]; 4] = [
    [0, 0, 0, 0, 0, 0, 0, 1], // 12.5%
    [1, 0, 0, 0, 0, 0, 0, 1], // 25%
    [1, 0, 0, 0, 0, 1, 1, 1], // 50%
    [0, 1, 1, 1, 1, 1, 1, 0], // 75%
];

/// Channel 1 frequency sweep (NR10), clocked at 128 Hz.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub(super) struct Sweep {
    period: u8,
    negate: bool,
    shift: u8,
    timer: u8,
    shadow: u16,
    enabled: bool,
}

impl Sweep {
    fn next_frequency(&self) -> u16 {
        let delta = self.shadow >> self.shift;
        if self.negate {
            self.shadow.wrapping_sub(delta)
        } else {
            self.shadow + delta
        }
    }
}

/// Square-wave channel (1 with sweep, 2 without).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct Pulse {
    pub(super) enabled: bool,
    pub(super) dac: bool,
    duty: u8,
    duty_pos: u8,
    pub(super) frequency: u16,
    timer: u32,
    pub(super) length: Length,
    pub(super) envelope: Envelope,
    sweep: Option<Sweep>,
}

impl Pulse {
    pub(super) fn new(with_sweep: bool) -> Self {
        Self {
            enabled: false,
            dac: false,
            duty: 0,
            duty_pos: 0,
            frequency: 0,
            timer: 0,
            length: Length::default(),
            envelope: Envelope::default(),
            sweep: with_sweep.then(Sweep::default),
        }
    }

    fn period(&self) -> u32 {
        (2048 - self.frequency as u32) * 4
    }

    pub(super) fn check_layout(&self) -> Result<(), String> {
        if self.frequency > 2047 || self.duty > 3 || self.duty_pos > 7 {
            return Err(format!(
                "frequency {} duty {} position {}",
                self.frequency, self.duty, self.duty_pos
            ));
        }
        if let Some(sweep) = &self.sweep {
            if sweep.shift > 7 || sweep.period > 7 || sweep.timer > 8 || sweep.shadow > 2047 {
                return Err(format!("sweep {sweep:?} out of range"));
            }
        }
        self.length.check_layout(64)?;
        self.envelope.check_layout()
    }

    pub(super) fn write_sweep(&mut self, value: u8) {
        if let Some(sweep) = &mut self.sweep {
            sweep.period = (value >> 4) & 0x07;
            sweep.negate = value & 0x08 != 0;
            sweep.shift = value & 0x07;
        }
    }

    pub(super) fn write_duty_length(&mut self, value: u8) {
        self.duty = value >> 6;
        self.length.load(64, (value & 0x3F) as u16);
    }

    pub(super) fn write_envelope(&mut self, value: u8) {
        self.envelope.write(value);
        self.dac = value & 0xF8 != 0;
        if !self.dac {
            self.enabled = false;
        }
    }

    pub(super) fn write_frequency_low(&mut self, value: u8) {
        self.frequency = (self.frequency & 0x0700) | value as u16;
    }

    /// NRx4: frequency high bits, length enable, trigger.
    pub(super) fn write_control(&mut self, value: u8) {
        self.frequency = (self.frequency & 0x00FF) | (((value & 0x07) as u16) << 8);
        self.length.enabled = value & 0x40 != 0;
        if value & 0x80 != 0 {
            self.trigger();
        }
    }

    fn trigger(&mut self) {
        self.enabled = self.dac;
        self.length.trigger(64);
        self.timer = self.period();
        self.envelope.trigger();

        let frequency = self.frequency;
        let mut overflow = false;
        if let Some(sweep) = &mut self.sweep {
            sweep.shadow = frequency;
            sweep.timer = if sweep.period == 0 { 8 } else { sweep.period };
            sweep.enabled = sweep.period != 0 || sweep.shift != 0;
            overflow = sweep.shift != 0 && sweep.next_frequency() > 2047;
        }
        if overflow {
            self.enabled = false;
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
                self.duty_pos = (self.duty_pos + 1) & 0x07;
            }
        }
    }

    pub(super) fn clock_length(&mut self) {
        if self.length.clock() {
            self.enabled = false;
        }
    }

    pub(super) fn clock_sweep(&mut self) {
        let Some(sweep) = &mut self.sweep else {
            return;
        };
        if sweep.timer > 0 {
            sweep.timer -= 1;
        }
        if sweep.timer != 0 {
            return;
        }
        sweep.timer = if sweep.period == 0 { 8 } else { sweep.period };
        if !sweep.enabled || sweep.period == 0 {
            return;
        }

        let next = sweep.next_frequency();
        if next > 2047 {
            self.enabled = false;
            return;
        }
        if sweep.shift != 0 {
            sweep.shadow = next;
            self.frequency = next;
            // The new value is checked again immediately.
            if sweep.next_frequency() > 2047 {
                self.enabled = false;
            }
        }
    }

    /// Digital output 0-15.
    pub(super) fn output(&self) -> u8 {
        if !self.enabled {
            return 0;
        }
        DUTY_TABLE[self.duty as usize][self.duty_pos as usize] * self.envelope.volume
    }
}
