use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::machine::CYCLES_PER_SECOND;

/// Grey ramp used when colorization is off, lightest shade first.
pub const GREY_PALETTE: [u32; 4] = [0x00FF_FFFF, 0x00AA_AAAA, 0x0055_5555, 0x0000_0000];
/// The classic pea-green DMG look.
pub const GREEN_PALETTE: [u32; 4] = [0x009B_BC0F, 0x008B_AC0F, 0x0030_6230, 0x000F_380F];

/// CPU-side visibility of VRAM and OAM while the PPU is using them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VramAccess {
    /// VRAM is locked during pixel transfer and OAM during OAM scan and
    /// pixel transfer. Locked reads return 0xFF and
    /// locked writes are dropped.
    #[default]
    Blocked,
    /// VRAM and OAM are always readable and writable.
    Open,
}

/// Host-tunable options for a [`GameBoy`](crate::GameBoy) session.
///
/// ```
/// use retroboy_gb::CoreConfig;
///
/// let config = CoreConfig::builder().sample_rate(48_000).colorize(true).build();
/// assert_eq!(config.sample_rate, 48_000);
/// ```
#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct CoreConfig {
    /// Output sample rate of the interleaved stereo audio stream. Rates
    /// above the CPU clock are capped at one sample per T-cycle.
    #[builder(default = 44_100)]
    pub sample_rate: u32,
    /// Master output volume applied after mixing, 0.0 to 1.0.
    #[builder(default = 0.7)]
    pub volume: f32,
    /// Per-channel enable mask (pulse 1, pulse 2, wave, noise).
    #[builder(default = [true; 4])]
    pub channels: [bool; 4],
    /// Use the green DMG palette instead of the grey ramp.
    #[builder(default = false)]
    pub colorize: bool,
    /// Overrides the palette selected by `colorize` when set.
    #[builder(default, setter(strip_option))]
    pub palette: Option<[u32; 4]>,
    #[builder(default)]
    pub vram_access: VramAccess,
    /// Upper bound on CPU steps executed by one `run_frame` call.
    #[builder(default = 200_000)]
    pub max_steps_per_frame: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl CoreConfig {
    pub fn resolved_palette(&self) -> [u32; 4] {
        match self.palette {
            Some(palette) => palette,
            None if self.colorize => GREEN_PALETTE,
            None => GREY_PALETTE,
        }
    }

    pub(crate) fn sample_rate_or_default(&self) -> u32 {
        match self.sample_rate {
            0 => {
                log::warn!("sample_rate of 0 requested, falling back to 44100 Hz");
                44_100
            }
            rate if rate > CYCLES_PER_SECOND => {
                log::warn!("sample_rate of {rate} Hz capped to {CYCLES_PER_SECOND} Hz");
                CYCLES_PER_SECOND
            }
            rate => rate,
        }
    }
}
