use serde::{Deserialize, Serialize};

/// Volume envelope (NRx2), clocked at 64 Hz by the frame sequencer.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub(super) struct Envelope {
    initial: u8,
    add: bool,
    period: u8,
    pub(super) volume: u8,
    timer: u8,
}

impl Envelope {
    pub(super) fn write(&mut self, value: u8) {
        self.initial = value >> 4;
        self.add = value & 0x08 != 0;
        self.period = value & 0x07;
    }

    pub(super) fn check_layout(&self) -> Result<(), String> {
        if self.initial > 15 || self.volume > 15 || self.period > 7 || self.timer > 7 {
            return Err(format!("envelope {self:?} out of range"));
        }
        Ok(())
    }

    pub(super) fn trigger(&mut self) {
        self.volume = self.initial;
        self.timer = self.period;
    }

    /// A period of 0 freezes the volume.
    pub(super) fn clock(&mut self) {
        if self.period == 0 {
            return;
        }
        if self.timer > 0 {
            self.timer -= 1;
        }
        if self.timer == 0 {
            self.timer = self.period;
            if self.add && self.volume < 15 {
                self.volume += 1;
            } else if !self.add && self.volume > 0 {
                self.volume -= 1;
            }
        }
    }
}

/// Length counter, clocked at 256 Hz.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub(super) struct Length {
    counter: u16,
    pub(super) enabled: bool,
}

impl Length {
    pub(super) fn load(&mut self, full: u16, value: u16) {
        self.counter = full - value;
    }

    pub(super) fn check_layout(&self, full: u16) -> Result<(), String> {
        if self.counter > full {
            return Err(format!("length counter {} above {full}", self.counter));
        }
        Ok(())
    }

    /// Reload to the full length if the counter ran out.
    pub(super) fn trigger(&mut self, full: u16) {
        if self.counter == 0 {
            self.counter = full;
        }
    }

    /// Returns `true` when the counter expires and the channel must stop.
    pub(super) fn clock(&mut self) -> bool {
        if self.enabled && self.counter > 0 {
            self.counter -= 1;
            return self.counter == 0;
        }
        false
    }
}
