//! A Nintendo Game Boy (DMG) emulator core.
//!
//! [`GameBoy`] owns the whole machine. Hosts feed it input with
//! [`GameBoy::run_frame`] and get back pixels, audio and the interrupts the
//! frame raised; [`GameBoy::save_state`] and [`GameBoy::load_state`]
//! snapshot everything except the ROM.
mod config;
pub mod cpu;
mod error;
mod interrupts;
pub mod machine;
#[cfg(feature = "wasm")]
pub mod wasm;

pub use config::{CoreConfig, VramAccess, GREEN_PALETTE, GREY_PALETTE};
pub use error::{LoadError, StateError};
pub use interrupts::Interrupts;
pub use machine::{Button, CartridgeHeader, FrameOutput, GameBoy, JoypadState, MbcKind};

/// Logical screen width in pixels for the Game Boy DMG.
pub const SCREEN_WIDTH: usize = 160;
/// Logical screen height in pixels.
pub const SCREEN_HEIGHT: usize = 144;
