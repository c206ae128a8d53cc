mod apu;
mod bus;
mod cartridge;
mod gameboy;
mod joypad;
mod ppu;
mod serial;
mod state;
mod timer;

pub(crate) use bus::GameBoyBus;
pub use cartridge::{header_checksum, CartridgeHeader, MbcKind};
pub use gameboy::{FrameOutput, GameBoy};
pub use joypad::{Button, JoypadState};
pub use state::STATE_VERSION;

/// DMG master clock: T-cycles per emulated second.
pub const CYCLES_PER_SECOND: u32 = 4_194_304;
/// T-cycles in one full 154-line frame.
pub const CYCLES_PER_FRAME: u32 = 70_224;

#[cfg(test)]
mod tests;
