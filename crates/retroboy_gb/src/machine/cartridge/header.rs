use crate::error::LoadError;

pub(crate) const ROM_BANK_SIZE: usize = 0x4000;
pub(crate) const RAM_BANK_SIZE: usize = 0x2000;

const TITLE: std::ops::Range<usize> = 0x0134..0x0144;
const CARTRIDGE_TYPE: usize = 0x0147;
const ROM_SIZE: usize = 0x0148;
const RAM_SIZE: usize = 0x0149;
const HEADER_CHECKSUM: usize = 0x014D;
const GLOBAL_CHECKSUM: usize = 0x014E;

/// Memory bank controller family named by header byte 0x0147.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbcKind {
    None,
    Mbc1,
    Mbc2,
    Mbc3,
    Mbc5,
}

/// Decoded cartridge header (0x0100-0x014F).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartridgeHeader {
    pub title: String,
    pub cartridge_type: u8,
    pub mbc: MbcKind,
    pub has_ram: bool,
    pub has_battery: bool,
    pub has_rtc: bool,
    pub has_rumble: bool,
    pub rom_size: usize,
    pub ram_size: usize,
    pub header_checksum: u8,
    pub global_checksum: u16,
}

impl CartridgeHeader {
    /// Parse and validate the header of a full ROM image.
    pub fn parse(rom: &[u8]) -> Result<Self, LoadError> {
        if rom.len() < 0x0150 {
            return Err(LoadError::TooShort { len: rom.len() });
        }
        if rom.len() % ROM_BANK_SIZE != 0 {
            return Err(LoadError::BadSize { len: rom.len() });
        }

        let expected = rom[HEADER_CHECKSUM];
        let actual = header_checksum(rom);
        if expected != actual {
            return Err(LoadError::HeaderChecksum { expected, actual });
        }

        let cartridge_type = rom[CARTRIDGE_TYPE];
        let (mbc, has_ram, has_battery, has_rtc, has_rumble) = match cartridge_type {
            0x00 => (MbcKind::None, false, false, false, false),
            0x08 => (MbcKind::None, true, false, false, false),
            0x09 => (MbcKind::None, true, true, false, false),
            0x01 => (MbcKind::Mbc1, false, false, false, false),
            0x02 => (MbcKind::Mbc1, true, false, false, false),
            0x03 => (MbcKind::Mbc1, true, true, false, false),
            0x05 => (MbcKind::Mbc2, true, false, false, false),
            0x06 => (MbcKind::Mbc2, true, true, false, false),
            0x0F => (MbcKind::Mbc3, false, true, true, false),
            0x10 => (MbcKind::Mbc3, true, true, true, false),
            0x11 => (MbcKind::Mbc3, false, false, false, false),
            0x12 => (MbcKind::Mbc3, true, false, false, false),
            0x13 => (MbcKind::Mbc3, true, true, false, false),
            0x19 => (MbcKind::Mbc5, false, false, false, false),
            0x1A => (MbcKind::Mbc5, true, false, false, false),
            0x1B => (MbcKind::Mbc5, true, true, false, false),
            0x1C => (MbcKind::Mbc5, false, false, false, true),
            0x1D => (MbcKind::Mbc5, true, false, false, true),
            0x1E => (MbcKind::Mbc5, true, true, false, true),
            other => return Err(LoadError::UnsupportedMbc(other)),
        };

        let rom_code = rom[ROM_SIZE];
        if rom_code > 0x08 {
            return Err(LoadError::RomSizeMismatch {
                code: rom_code,
                declared: 0,
                actual: rom.len(),
            });
        }
        let rom_size = (32 * 1024) << rom_code;
        if rom_size != rom.len() {
            return Err(LoadError::RomSizeMismatch {
                code: rom_code,
                declared: rom_size,
                actual: rom.len(),
            });
        }

        let ram_code = rom[RAM_SIZE];
        let declared_ram = match ram_code {
            0x00 => 0,
            0x01 => 2 * 1024,
            0x02 => 8 * 1024,
            0x03 => 32 * 1024,
            0x04 => 128 * 1024,
            0x05 => 64 * 1024,
            other => return Err(LoadError::BadRamSize(other)),
        };
        // MBC2 carries 512 half-bytes on the controller itself; the header
        // RAM size is 0 for those carts.
        let ram_size = match (mbc, has_ram) {
            (MbcKind::Mbc2, _) => 512,
            (_, true) => declared_ram,
            (_, false) => 0,
        };

        let title = rom[TITLE]
            .iter()
            .take_while(|&&b| b != 0)
            .filter(|b| b.is_ascii_graphic() || **b == b' ')
            .map(|&b| b as char)
            .collect::<String>()
            .trim_end()
            .to_string();

        Ok(Self {
            title,
            cartridge_type,
            mbc,
            has_ram: ram_size > 0,
            has_battery,
            has_rtc,
            has_rumble,
            rom_size,
            ram_size,
            header_checksum: expected,
            global_checksum: u16::from_be_bytes([rom[GLOBAL_CHECKSUM], rom[GLOBAL_CHECKSUM + 1]]),
        })
    }

    pub fn rom_banks(&self) -> usize {
        self.rom_size / ROM_BANK_SIZE
    }
}

/// The boot ROM's header check: `x = x - byte - 1` over 0x0134..=0x014C.
pub fn header_checksum(rom: &[u8]) -> u8 {
    rom[0x0134..=0x014C]
        .iter()
        .fold(0u8, |x, &b| x.wrapping_sub(b).wrapping_sub(1))
}
