mod header;
mod mbc1;
mod mbc2;
mod mbc3;
mod mbc5;
mod rtc;

use serde::{Deserialize, Serialize};

use crate::error::LoadError;

pub use header::{header_checksum, CartridgeHeader, MbcKind};
pub(crate) use header::{RAM_BANK_SIZE, ROM_BANK_SIZE};
use mbc1::Mbc1;
use mbc2::Mbc2;
use mbc3::Mbc3;
use mbc5::Mbc5;

/// Where an access to 0xA000-0xBFFF lands for the current bank state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RamTarget {
    Unmapped,
    Ram(usize),
    /// MBC2 built-in RAM: only the low nibble is stored.
    Nibble(usize),
    /// MBC3 RTC register selected through 0x4000-0x5FFF.
    Clock,
}

/// Bank controller state, chosen once from the header at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) enum Mbc {
    None,
    Mbc1(Mbc1),
    Mbc2(Mbc2),
    Mbc3(Mbc3),
    Mbc5(Mbc5),
}

impl Mbc {
    fn kind(&self) -> MbcKind {
        match self {
            Mbc::None => MbcKind::None,
            Mbc::Mbc1(_) => MbcKind::Mbc1,
            Mbc::Mbc2(_) => MbcKind::Mbc2,
            Mbc::Mbc3(_) => MbcKind::Mbc3,
            Mbc::Mbc5(_) => MbcKind::Mbc5,
        }
    }
}

/// Cartridge ROM, external RAM and bank controller.
///
/// The ROM image is not part of the serialized form; save states re-attach
/// it through [`Cartridge::attach_rom`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Cartridge {
    #[serde(skip)]
    rom: Vec<u8>,
    ram: Vec<u8>,
    mbc: Mbc,
    rom_banks: usize,
    battery: bool,
}

impl Cartridge {
    pub(crate) fn new(rom: &[u8], header: &CartridgeHeader) -> Self {
        let mbc = match header.mbc {
            MbcKind::None => Mbc::None,
            MbcKind::Mbc1 => Mbc::Mbc1(Mbc1::default()),
            MbcKind::Mbc2 => Mbc::Mbc2(Mbc2::default()),
            MbcKind::Mbc3 => Mbc::Mbc3(Mbc3::new(header.has_rtc)),
            MbcKind::Mbc5 => Mbc::Mbc5(Mbc5::new(header.has_rumble)),
        };

        log::info!(
            "Cartridge '{}': type {:02X} ({:?}), {} ROM banks, {} bytes RAM, battery: {}",
            header.title,
            header.cartridge_type,
            header.mbc,
            header.rom_banks(),
            header.ram_size,
            header.has_battery,
        );

        Self {
            rom: rom.to_vec(),
            ram: vec![0; header.ram_size],
            mbc,
            rom_banks: header.rom_banks().max(1),
            battery: header.has_battery,
        }
    }

    pub(crate) fn attach_rom(&mut self, rom: Vec<u8>) {
        self.rom = rom;
    }

    /// Moves the ROM out, leaving this cartridge unmapped.
    pub(crate) fn take_rom(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.rom)
    }

    /// A decoded snapshot must describe the same hardware as the cartridge
    /// that is plugged in.
    pub(crate) fn check_layout(&self, live: &Cartridge) -> Result<(), String> {
        if self.mbc.kind() != live.mbc.kind() || self.ram.len() != live.ram.len() {
            return Err(format!(
                "cartridge state is {:?} with {} bytes RAM, loaded cartridge is {:?} with {}",
                self.mbc.kind(),
                self.ram.len(),
                live.mbc.kind(),
                live.ram.len()
            ));
        }
        if self.rom_banks != live.rom_banks || self.battery != live.battery {
            return Err(format!(
                "cartridge state has {} ROM banks (battery: {}), loaded cartridge has {} (battery: {})",
                self.rom_banks, self.battery, live.rom_banks, live.battery
            ));
        }
        match (&self.mbc, &live.mbc) {
            (Mbc::Mbc3(saved), Mbc::Mbc3(live)) => saved.check_layout(live),
            _ => Ok(()),
        }
    }

    pub(crate) fn rom_read(&self, addr: u16) -> u8 {
        let offset = match &self.mbc {
            Mbc::None => addr as usize,
            Mbc::Mbc1(m) => m.rom_offset(addr, self.rom_banks),
            Mbc::Mbc2(m) => m.rom_offset(addr, self.rom_banks),
            Mbc::Mbc3(m) => m.rom_offset(addr, self.rom_banks),
            Mbc::Mbc5(m) => m.rom_offset(addr, self.rom_banks),
        };
        self.rom.get(offset).copied().unwrap_or(0xFF)
    }

    /// Writes to 0x0000-0x7FFF program the bank controller.
    pub(crate) fn rom_write(&mut self, addr: u16, value: u8) {
        match &mut self.mbc {
            Mbc::None => {}
            Mbc::Mbc1(m) => m.write_control(addr, value),
            Mbc::Mbc2(m) => m.write_control(addr, value),
            Mbc::Mbc3(m) => m.write_control(addr, value),
            Mbc::Mbc5(m) => m.write_control(addr, value),
        }
        if (0x2000..0x6000).contains(&addr) {
            log::debug!("MBC write {addr:04X}={value:02X}, ROM bank now {}", self.rom_bank());
        }
    }

    fn ram_target(&self, addr: u16) -> RamTarget {
        let len = self.ram.len();
        match &self.mbc {
            Mbc::None if len > 0 => RamTarget::Ram((addr as usize & 0x1FFF) % len),
            Mbc::None => RamTarget::Unmapped,
            Mbc::Mbc1(m) => m.ram_target(addr, len),
            Mbc::Mbc2(m) => m.ram_target(addr),
            Mbc::Mbc3(m) => m.ram_target(addr, len),
            Mbc::Mbc5(m) => m.ram_target(addr, len),
        }
    }

    pub(crate) fn ram_read(&self, addr: u16) -> u8 {
        match self.ram_target(addr) {
            RamTarget::Unmapped => 0xFF,
            RamTarget::Ram(offset) => self.ram.get(offset).copied().unwrap_or(0xFF),
            RamTarget::Nibble(offset) => 0xF0 | self.ram.get(offset).copied().unwrap_or(0x0F),
            RamTarget::Clock => match &self.mbc {
                Mbc::Mbc3(m) => m.read_clock(),
                _ => 0xFF,
            },
        }
    }

    pub(crate) fn ram_write(&mut self, addr: u16, value: u8) {
        match self.ram_target(addr) {
            RamTarget::Unmapped => {}
            RamTarget::Ram(offset) => {
                if let Some(slot) = self.ram.get_mut(offset) {
                    *slot = value;
                }
            }
            RamTarget::Nibble(offset) => {
                if let Some(slot) = self.ram.get_mut(offset) {
                    *slot = value & 0x0F;
                }
            }
            RamTarget::Clock => {
                if let Mbc::Mbc3(m) = &mut self.mbc {
                    m.write_clock(value);
                }
            }
        }
    }

    /// Advance cartridge-side clocks (the MBC3 RTC) by `cycles` T-cycles.
    pub(crate) fn tick(&mut self, cycles: u32) {
        if let Mbc::Mbc3(m) = &mut self.mbc {
            m.tick(cycles);
        }
    }

    /// Bank currently mapped at 0x4000-0x7FFF, before wrapping.
    pub(crate) fn rom_bank(&self) -> usize {
        match &self.mbc {
            Mbc::None => 1,
            Mbc::Mbc1(m) => m.rom_bank(),
            Mbc::Mbc2(m) => m.rom_bank(),
            Mbc::Mbc3(m) => m.rom_bank(),
            Mbc::Mbc5(m) => m.rom_bank(),
        }
    }

    pub(crate) fn battery_ram(&self) -> Option<&[u8]> {
        (self.battery && !self.ram.is_empty()).then_some(self.ram.as_slice())
    }

    pub(crate) fn load_battery_ram(&mut self, data: &[u8]) -> Result<(), LoadError> {
        if data.len() != self.ram.len() {
            log::warn!(
                "Rejecting battery RAM of {} bytes for a {}-byte cartridge RAM",
                data.len(),
                self.ram.len()
            );
            return Err(LoadError::BatteryRamSize {
                expected: self.ram.len(),
                actual: data.len(),
            });
        }
        self.ram.copy_from_slice(data);
        if matches!(self.mbc, Mbc::Mbc2(_)) {
            self.ram.iter_mut().for_each(|b| *b &= 0x0F);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// ROM whose every bank starts with its own bank number.
    fn banked_rom(cartridge_type: u8, rom_code: u8, ram_code: u8) -> Vec<u8> {
        let size = (32 * 1024) << rom_code;
        let mut rom = vec![0u8; size];
        for (bank, chunk) in rom.chunks_mut(ROM_BANK_SIZE).enumerate() {
            chunk[0] = bank as u8;
            chunk[1] = (bank >> 8) as u8;
        }
        rom[0x0147] = cartridge_type;
        rom[0x0148] = rom_code;
        rom[0x0149] = ram_code;
        rom[0x014D] = header_checksum(&rom);
        rom
    }

    fn load(rom: &[u8]) -> Cartridge {
        let header = CartridgeHeader::parse(rom).unwrap();
        Cartridge::new(rom, &header)
    }

    #[test]
    fn mbc1_bank_zero_reads_as_bank_one() {
        let rom = banked_rom(0x01, 0x02, 0x00);
        let mut cart = load(&rom);

        cart.rom_write(0x2000, 0x01);
        let bank1: Vec<u8> = (0x4000..0x4010).map(|a| cart.rom_read(a)).collect();
        cart.rom_write(0x2000, 0x00);
        let bank0: Vec<u8> = (0x4000..0x4010).map(|a| cart.rom_read(a)).collect();

        assert_eq!(bank0, bank1);
        assert_eq!(cart.rom_read(0x4000), 1);
    }

    #[test]
    fn mbc1_bank_index_wraps_to_bank_count() {
        // 128 KiB = 8 banks; selecting bank 9 lands on bank 1.
        let rom = banked_rom(0x01, 0x02, 0x00);
        let mut cart = load(&rom);
        cart.rom_write(0x2000, 0x09);
        assert_eq!(cart.rom_read(0x4000), 1);
    }

    #[test]
    fn mbc1_upper_bits_and_mode_one() {
        // 1 MiB = 64 banks.
        let rom = banked_rom(0x01, 0x05, 0x00);
        let mut cart = load(&rom);
        cart.rom_write(0x2000, 0x02);
        cart.rom_write(0x4000, 0x01);
        assert_eq!(cart.rom_read(0x4000), 0x22);
        assert_eq!(cart.rom_read(0x0000), 0x00);

        cart.rom_write(0x6000, 0x01);
        assert_eq!(cart.rom_read(0x0000), 0x20);
    }

    #[test]
    fn ram_disabled_reads_sentinel_and_drops_writes() {
        let rom = banked_rom(0x03, 0x01, 0x03);
        let mut cart = load(&rom);

        cart.ram_write(0xA000, 0x42);
        assert_eq!(cart.ram_read(0xA000), 0xFF);

        cart.rom_write(0x0000, 0x0A);
        assert_eq!(cart.ram_read(0xA000), 0x00);
        cart.ram_write(0xA000, 0x42);
        assert_eq!(cart.ram_read(0xA000), 0x42);

        cart.rom_write(0x0000, 0x00);
        assert_eq!(cart.ram_read(0xA000), 0xFF);
    }

    #[test]
    fn mbc1_ram_banks_only_switch_in_mode_one() {
        let rom = banked_rom(0x03, 0x01, 0x03);
        let mut cart = load(&rom);
        cart.rom_write(0x0000, 0x0A);
        cart.ram_write(0xA000, 0x11);

        cart.rom_write(0x4000, 0x01);
        assert_eq!(cart.ram_read(0xA000), 0x11);

        cart.rom_write(0x6000, 0x01);
        assert_eq!(cart.ram_read(0xA000), 0x00);
        cart.ram_write(0xA000, 0x22);
        cart.rom_write(0x4000, 0x00);
        assert_eq!(cart.ram_read(0xA000), 0x11);
    }

    #[test]
    fn mbc2_nibble_ram_and_bank_select_by_address_bit() {
        let rom = banked_rom(0x06, 0x02, 0x00);
        let mut cart = load(&rom);
        assert_eq!(cart.ram.len(), 512);

        cart.rom_write(0x0100, 0x03);
        assert_eq!(cart.rom_read(0x4000), 3);

        cart.rom_write(0x0000, 0x0A);
        cart.ram_write(0xA005, 0xAB);
        assert_eq!(cart.ram_read(0xA005), 0xFB);
        // 512-byte RAM mirrors across the window.
        assert_eq!(cart.ram_read(0xA205), 0xFB);
    }

    #[test]
    fn mbc3_rtc_registers_map_into_ram_window() {
        let rom = banked_rom(0x10, 0x02, 0x03);
        let mut cart = load(&rom);
        cart.rom_write(0x0000, 0x0A);
        cart.rom_write(0x4000, 0x08);
        cart.ram_write(0xA000, 30);
        cart.tick(crate::machine::CYCLES_PER_SECOND * 2);
        cart.rom_write(0x6000, 0x00);
        cart.rom_write(0x6000, 0x01);
        assert_eq!(cart.ram_read(0xA000), 32);

        cart.rom_write(0x4000, 0x01);
        cart.ram_write(0xA000, 0x77);
        assert_eq!(cart.ram_read(0xA000), 0x77);
    }

    #[test]
    fn mbc5_allows_bank_zero_and_ninth_bit() {
        // 8 MiB = 512 banks.
        let rom = banked_rom(0x19, 0x08, 0x00);
        let mut cart = load(&rom);
        cart.rom_write(0x2000, 0x00);
        assert_eq!(cart.rom_read(0x4000), 0);
        cart.rom_write(0x2000, 0x05);
        cart.rom_write(0x3000, 0x01);
        assert_eq!(cart.rom_read(0x4000), 0x05);
        assert_eq!(cart.rom_read(0x4001), 0x01);
    }

    #[test]
    fn battery_ram_round_trip_checks_size() {
        let rom = banked_rom(0x03, 0x01, 0x02);
        let mut cart = load(&rom);
        let image = vec![0x5A; 0x2000];
        cart.load_battery_ram(&image).unwrap();
        assert_eq!(cart.battery_ram(), Some(image.as_slice()));
        assert_eq!(
            cart.load_battery_ram(&[0; 16]),
            Err(LoadError::BatteryRamSize { expected: 0x2000, actual: 16 })
        );
    }

    #[test]
    fn header_rejects_bad_checksum_and_unknown_type() {
        let mut rom = banked_rom(0x01, 0x00, 0x00);
        rom[0x014D] ^= 0xFF;
        assert!(matches!(
            CartridgeHeader::parse(&rom),
            Err(LoadError::HeaderChecksum { .. })
        ));

        let rom = banked_rom(0xFC, 0x00, 0x00);
        assert_eq!(CartridgeHeader::parse(&rom), Err(LoadError::UnsupportedMbc(0xFC)));

        assert_eq!(
            CartridgeHeader::parse(&[0u8; 0x100]),
            Err(LoadError::TooShort { len: 0x100 })
        );
    }
}
