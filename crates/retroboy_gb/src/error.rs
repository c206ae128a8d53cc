use thiserror::Error;

/// Reasons a ROM image can be rejected by [`GameBoy::load_rom`](crate::GameBoy::load_rom).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("ROM should be at least 336 bytes to hold a header, was {len} bytes")]
    TooShort { len: usize },
    #[error("ROM length {len} is not a whole number of 16 KiB banks")]
    BadSize { len: usize },
    #[error("header checksum mismatch: header says {expected:02X}, computed {actual:02X}")]
    HeaderChecksum { expected: u8, actual: u8 },
    #[error("unsupported cartridge type byte {0:02X}")]
    UnsupportedMbc(u8),
    #[error("ROM size code {code:02X} declares {declared} bytes but image has {actual}")]
    RomSizeMismatch { code: u8, declared: usize, actual: usize },
    #[error("invalid RAM size code {0:02X}, expected 0 or 2-5")]
    BadRamSize(u8),
    #[error("battery RAM is {actual} bytes, cartridge expects {expected}")]
    BatteryRamSize { expected: usize, actual: usize },
}

/// Reasons a save-state buffer can be rejected by
/// [`GameBoy::load_state`](crate::GameBoy::load_state).
///
/// A rejected load never touches the running machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("not a save state (bad magic)")]
    BadMagic,
    #[error("save state format version {found} is not supported (expected {expected})")]
    VersionMismatch { expected: u16, found: u16 },
    #[error("save state is truncated ({len} bytes)")]
    Truncated { len: usize },
    #[error("save state belongs to a different cartridge")]
    CartridgeMismatch,
    #[error("save state body is corrupt: {0}")]
    Corrupt(String),
}
