//! Audio processing unit: four channels, the 512 Hz frame sequencer and a
//! stereo mixer that resamples to the host rate.
mod envelope;
mod noise;
mod pulse;
mod wave;

use serde::{Deserialize, Serialize};

use crate::config::CoreConfig;
use crate::machine::CYCLES_PER_SECOND;

use noise::Noise;
use pulse::Pulse;
use wave::Wave;

const FRAME_SEQUENCER_PERIOD: u32 = 8192;

/// Bits that read back as 1 for FF10-FF26.
const READ_MASKS: [u8; 0x17] = [
    0x80, 0x3F, 0x00, 0xFF, 0xBF, // NR10-NR14
    0xFF, 0x3F, 0x00, 0xFF, 0xBF, // unused, NR21-NR24
    0x7F, 0xFF, 0x9F, 0xFF, 0xBF, // NR30-NR34
    0xFF, 0xFF, 0x00, 0x00, 0xBF, // unused, NR41-NR44
    0x00, 0x00, 0x70, // NR50-NR52
];

/// Register values left behind by the DMG boot ROM (FF10-FF25), with the
/// trigger bits cleared.
const POST_BOOT_REGS: [(u16, u8); 19] = [
    (0xFF10, 0x80),
    (0xFF11, 0xBF),
    (0xFF12, 0xF3),
    (0xFF13, 0xFF),
    (0xFF14, 0x3F),
    (0xFF16, 0x3F),
    (0xFF17, 0x00),
    (0xFF18, 0xFF),
    (0xFF19, 0x3F),
    (0xFF1A, 0x7F),
    (0xFF1B, 0xFF),
    (0xFF1C, 0x9F),
    (0xFF1E, 0x3F),
    (0xFF20, 0xFF),
    (0xFF21, 0x00),
    (0xFF22, 0x00),
    (0xFF23, 0x3F),
    (0xFF24, 0x77),
    (0xFF25, 0xF3),
];

/// DC blocker coefficient, roughly a 20 Hz cutoff at common host rates.
const HIGH_PASS_ALPHA: f32 = 0.997;

/// Host-facing output settings, reapplied from [`CoreConfig`] after a state load.
#[derive(Debug, Clone)]
struct MixSettings {
    sample_rate: u32,
    volume: f32,
    channels: [bool; 4],
}

impl Default for MixSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            volume: 0.7,
            channels: [true; 4],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Apu {
    powered: bool,
    /// Raw register bytes for FF10-FF26, used for read-back.
    regs: [u8; 0x17],
    ch1: Pulse,
    ch2: Pulse,
    ch3: Wave,
    ch4: Noise,

    sequencer_timer: u32,
    sequencer_step: u8,
    /// Resampling accumulator in units of `sample_rate * cycles`.
    sample_phase: u64,
    high_pass: [(f32, f32); 2],

    #[serde(skip)]
    samples: Vec<f32>,
    #[serde(skip)]
    mix: MixSettings,
}

impl Apu {
    pub(crate) fn new(config: &CoreConfig) -> Self {
        let mut apu = Self {
            powered: true,
            regs: [0; 0x17],
            ch1: Pulse::new(true),
            ch2: Pulse::new(false),
            ch3: Wave::new(),
            ch4: Noise::new(),
            sequencer_timer: 0,
            sequencer_step: 0,
            sample_phase: 0,
            high_pass: [(0.0, 0.0); 2],
            samples: Vec::new(),
            mix: MixSettings::default(),
        };
        apu.apply_config(config);
        for (addr, value) in POST_BOOT_REGS {
            apu.write_reg(addr, value);
        }
        apu
    }

    pub(crate) fn apply_config(&mut self, config: &CoreConfig) {
        self.mix = MixSettings {
            sample_rate: config.sample_rate_or_default(),
            volume: config.volume.clamp(0.0, 1.0),
            channels: config.channels,
        };
    }

    /// Timer and channel fields a decoded snapshot must keep in range.
    pub(crate) fn check_layout(&self) -> Result<(), String> {
        if self.sequencer_timer >= FRAME_SEQUENCER_PERIOD || self.sequencer_step > 7 {
            return Err(format!(
                "frame sequencer at step {} timer {}",
                self.sequencer_step, self.sequencer_timer
            ));
        }
        if self.sample_phase >= CYCLES_PER_SECOND as u64 {
            return Err(format!("sample phase {} past one second", self.sample_phase));
        }
        self.ch1.check_layout().map_err(|e| format!("channel 1: {e}"))?;
        self.ch2.check_layout().map_err(|e| format!("channel 2: {e}"))?;
        self.ch3.check_layout().map_err(|e| format!("channel 3: {e}"))?;
        self.ch4.check_layout().map_err(|e| format!("channel 4: {e}"))
    }

    /// Drains the interleaved stereo samples produced so far.
    pub(crate) fn take_samples(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.samples)
    }

    pub(crate) fn read_reg(&self, addr: u16) -> u8 {
        match addr {
            0xFF26 => {
                let status = self.ch1.enabled as u8
                    | (self.ch2.enabled as u8) << 1
                    | (self.ch3.enabled as u8) << 2
                    | (self.ch4.enabled as u8) << 3;
                READ_MASKS[0x16] | (self.powered as u8) << 7 | status
            }
            0xFF10..=0xFF25 => {
                let index = (addr - 0xFF10) as usize;
                self.regs[index] | READ_MASKS[index]
            }
            0xFF30..=0xFF3F => self.ch3.ram[(addr - 0xFF30) as usize],
            _ => 0xFF,
        }
    }

    pub(crate) fn write_reg(&mut self, addr: u16, value: u8) {
        match addr {
            0xFF30..=0xFF3F => {
                self.ch3.ram[(addr - 0xFF30) as usize] = value;
                return;
            }
            0xFF26 => {
                self.write_power(value);
                return;
            }
            0xFF10..=0xFF25 if self.powered => {}
            _ => return,
        }

        self.regs[(addr - 0xFF10) as usize] = value;
        match addr {
            0xFF10 => self.ch1.write_sweep(value),
            0xFF11 => self.ch1.write_duty_length(value),
            0xFF12 => self.ch1.write_envelope(value),
            0xFF13 => self.ch1.write_frequency_low(value),
            0xFF14 => self.ch1.write_control(value),
            0xFF16 => self.ch2.write_duty_length(value),
            0xFF17 => self.ch2.write_envelope(value),
            0xFF18 => self.ch2.write_frequency_low(value),
            0xFF19 => self.ch2.write_control(value),
            0xFF1A => self.ch3.write_dac(value),
            0xFF1B => self.ch3.write_length(value),
            0xFF1C => self.ch3.write_volume(value),
            0xFF1D => self.ch3.write_frequency_low(value),
            0xFF1E => self.ch3.write_control(value),
            0xFF20 => self.ch4.write_length(value),
            0xFF21 => self.ch4.write_envelope(value),
            0xFF22 => self.ch4.write_polynomial(value),
            0xFF23 => self.ch4.write_control(value),
            _ => {}
        }
    }

    fn write_power(&mut self, value: u8) {
        let on = value & 0x80 != 0;
        if self.powered && !on {
            log::debug!("APU powered off");
            let ram = self.ch3.ram;
            self.regs = [0; 0x17];
            self.ch1 = Pulse::new(true);
            self.ch2 = Pulse::new(false);
            self.ch3 = Wave::new();
            self.ch3.ram = ram;
            self.ch4 = Noise::new();
        } else if !self.powered && on {
            log::debug!("APU powered on");
            self.sequencer_step = 0;
            self.sequencer_timer = 0;
        }
        self.powered = on;
    }

    pub(crate) fn tick(&mut self, cycles: u32) {
        let rate = self.mix.sample_rate as u64;
        let second = CYCLES_PER_SECOND as u64;
        let mut remaining = cycles;
        while remaining > 0 {
            let to_sequencer = FRAME_SEQUENCER_PERIOD - self.sequencer_timer;
            let to_sample = (second - self.sample_phase).div_ceil(rate);
            let step = remaining
                .min(to_sequencer)
                .min(u32::try_from(to_sample).unwrap_or(u32::MAX));

            if self.powered {
                self.ch1.step(step);
                self.ch2.step(step);
                self.ch3.step(step);
                self.ch4.step(step);

                self.sequencer_timer += step;
                if self.sequencer_timer == FRAME_SEQUENCER_PERIOD {
                    self.sequencer_timer = 0;
                    self.clock_sequencer();
                }
            }

            self.sample_phase += step as u64 * rate;
            while self.sample_phase >= second {
                self.sample_phase -= second;
                self.push_sample();
            }
            remaining -= step;
        }
    }

    fn clock_sequencer(&mut self) {
        let step = self.sequencer_step;
        if step % 2 == 0 {
            self.ch1.clock_length();
            self.ch2.clock_length();
            self.ch3.clock_length();
            self.ch4.clock_length();
        }
        if step == 2 || step == 6 {
            self.ch1.clock_sweep();
        }
        if step == 7 {
            self.ch1.envelope.clock();
            self.ch2.envelope.clock();
            self.ch4.envelope.clock();
        }
        self.sequencer_step = (step + 1) & 0x07;
    }

    fn push_sample(&mut self) {
        let (left, right) = self.mix_output();
        for (side, input) in [left, right].into_iter().enumerate() {
            let (prev_in, prev_out) = self.high_pass[side];
            let out = HIGH_PASS_ALPHA * (prev_out + input - prev_in);
            self.high_pass[side] = (input, out);
            self.samples.push(out.clamp(-1.0, 1.0));
        }
    }

    /// Mixes the four channels to a stereo pair in `[-1.0, 1.0]`.
    fn mix_output(&self) -> (f32, f32) {
        if !self.powered {
            return (0.0, 0.0);
        }
        let outputs = [
            (self.ch1.output(), self.ch1.dac),
            (self.ch2.output(), self.ch2.dac),
            (self.ch3.output(), self.ch3.dac),
            (self.ch4.output(), self.ch4.dac),
        ];
        let nr50 = self.regs[0x14];
        let nr51 = self.regs[0x15];

        let mut left = 0.0;
        let mut right = 0.0;
        for (i, (output, dac)) in outputs.into_iter().enumerate() {
            if !dac || !self.mix.channels[i] {
                continue;
            }
            let analog = output as f32 / 7.5 - 1.0;
            if nr51 & (0x10 << i) != 0 {
                left += analog;
            }
            if nr51 & (0x01 << i) != 0 {
                right += analog;
            }
        }

        let left_volume = (((nr50 >> 4) & 0x07) + 1) as f32 / 8.0;
        let right_volume = ((nr50 & 0x07) + 1) as f32 / 8.0;
        (
            left / 4.0 * left_volume * self.mix.volume,
            right / 4.0 * right_volume * self.mix.volume,
        )
    }
}
