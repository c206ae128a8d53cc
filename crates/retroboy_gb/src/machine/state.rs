//! Save-state container.
//!
//! Layout: `RBGS` magic, format version (`u16` LE), the cartridge header's
//! global checksum (`u16` LE), the SHA-1 of the ROM, then a `bincode` body
//! holding the CPU, the whole bus and the frame counter. ROM bytes are
//! never stored.
use serde::{Deserialize, Serialize};

use crate::cpu::Cpu;
use crate::error::StateError;

use super::{GameBoy, GameBoyBus};

const MAGIC: &[u8; 4] = b"RBGS";
/// Current save-state format version.
pub const STATE_VERSION: u16 = 1;
const HEADER_LEN: usize = 28;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    cpu: &'a Cpu,
    bus: &'a GameBoyBus,
    frames: u64,
}

#[derive(Deserialize)]
struct Snapshot {
    cpu: Cpu,
    bus: GameBoyBus,
    frames: u64,
}

impl GameBoy {
    pub fn save_state(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64 * 1024);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&STATE_VERSION.to_le_bytes());
        out.extend_from_slice(&self.header.global_checksum.to_le_bytes());
        out.extend_from_slice(&self.rom_sha1);

        let snapshot = SnapshotRef {
            cpu: &self.cpu,
            bus: &self.bus,
            frames: self.frames,
        };
        // Every field is a fixed-size value or a length-prefixed buffer, so
        // encoding into a Vec has no failure path.
        bincode::serialize_into(&mut out, &snapshot).expect("save state encodes into memory");
        out
    }

    /// Restore a state produced by [`save_state`](Self::save_state) for the
    /// same ROM. On error the running machine is left untouched.
    pub fn load_state(&mut self, bytes: &[u8]) -> Result<(), StateError> {
        let truncated = || StateError::Truncated { len: bytes.len() };
        let magic_len = bytes.len().min(MAGIC.len());
        if bytes[..magic_len] != MAGIC[..magic_len] {
            return Err(StateError::BadMagic);
        }
        let version = bytes.get(4..6).ok_or_else(truncated)?;
        let version = u16::from_le_bytes([version[0], version[1]]);
        if version != STATE_VERSION {
            return Err(StateError::VersionMismatch {
                expected: STATE_VERSION,
                found: version,
            });
        }
        if bytes.len() < HEADER_LEN {
            return Err(truncated());
        }

        let checksum = u16::from_le_bytes([bytes[6], bytes[7]]);
        if checksum != self.header.global_checksum || bytes[8..HEADER_LEN] != self.rom_sha1 {
            return Err(StateError::CartridgeMismatch);
        }

        let mut snapshot: Snapshot =
            bincode::deserialize(&bytes[HEADER_LEN..]).map_err(|err| match *err {
                bincode::ErrorKind::Io(ref io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
                    truncated()
                }
                _ => StateError::Corrupt(err.to_string()),
            })?;
        snapshot
            .bus
            .check_layout(&self.bus)
            .map_err(StateError::Corrupt)?;

        // Everything is validated; from here on the swap cannot fail.
        snapshot.bus.cartridge.attach_rom(self.bus.cartridge.take_rom());
        snapshot.bus.serial.output = std::mem::take(&mut self.bus.serial.output);
        snapshot.bus.apply_config(&self.config);
        self.cpu = snapshot.cpu;
        self.bus = snapshot.bus;
        self.frames = snapshot.frames;
        log::debug!("state loaded at frame {}", self.frames);
        Ok(())
    }
}
