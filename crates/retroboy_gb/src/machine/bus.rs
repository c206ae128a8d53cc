use serde::{Deserialize, Serialize};

use super::{
    apu::Apu,
    cartridge::Cartridge,
    joypad::{Button, Joypad, JoypadState},
    ppu::Ppu,
    serial::Serial,
    timer::Timer,
};
use crate::config::{CoreConfig, VramAccess};
use crate::interrupts::Interrupts;

mod dma;
mod init;
mod read;
mod traits;
mod write;

const WRAM_SIZE: usize = 0x2000;
const HRAM_SIZE: usize = 0x7F;

/// Everything the CPU can see through its address space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct GameBoyBus {
    pub(crate) cartridge: Cartridge,
    wram: Vec<u8>,
    hram: Vec<u8>,
    pub(crate) ppu: Ppu,
    pub(crate) apu: Apu,
    pub(crate) timer: Timer,
    pub(crate) serial: Serial,
    pub(crate) joypad: Joypad,
    pub(crate) if_reg: Interrupts,
    /// IE keeps all eight bits; only the low five take part in dispatch.
    pub(crate) ie_reg: u8,
    dma_source: u8,
    /// T-cycles the CPU still owes for an OAM DMA started this instruction.
    dma_stall: u32,
    /// Interrupts requested by peripherals since the last `take_raised`.
    raised: Interrupts,
    /// T-cycles elapsed since power-on.
    pub(crate) cycles: u64,
    #[serde(skip)]
    vram_access: VramAccess,
}

impl GameBoyBus {
    pub(crate) fn new(cartridge: Cartridge, config: &CoreConfig) -> Self {
        let mut bus = Self {
            cartridge,
            wram: vec![0; WRAM_SIZE],
            hram: vec![0; HRAM_SIZE],
            ppu: Ppu::new(config.resolved_palette()),
            apu: Apu::new(config),
            timer: Timer::new(),
            serial: Serial::default(),
            joypad: Joypad::default(),
            if_reg: Interrupts::empty(),
            ie_reg: 0,
            dma_source: 0xFF,
            dma_stall: 0,
            raised: Interrupts::empty(),
            cycles: 0,
            vram_access: config.vram_access,
        };
        bus.apply_dmg_initial_io_state();
        bus
    }

    /// Reapplies the host-side settings that are not part of a save state.
    pub(crate) fn apply_config(&mut self, config: &CoreConfig) {
        self.vram_access = config.vram_access;
        self.ppu.set_palette(config.resolved_palette());
        self.apu.apply_config(config);
    }

    /// Sets IF bits on behalf of a peripheral.
    pub(crate) fn request(&mut self, requests: Interrupts) {
        if !requests.is_empty() {
            self.if_reg |= requests;
            self.raised |= requests;
        }
    }

    pub(crate) fn take_raised(&mut self) -> Interrupts {
        std::mem::take(&mut self.raised)
    }

    pub(crate) fn take_dma_stall(&mut self) -> u32 {
        std::mem::take(&mut self.dma_stall)
    }

    /// Advance every peripheral by `cycles` T-cycles.
    pub(crate) fn tick(&mut self, cycles: u32) {
        let mut requests = Interrupts::empty();
        self.timer.tick(cycles, &mut requests);
        self.serial.tick(cycles, &mut requests);
        self.ppu.tick(cycles, &mut requests);
        self.apu.tick(cycles);
        self.cartridge.tick(cycles);
        self.request(requests);
        self.cycles += cycles as u64;
    }

    pub(crate) fn set_joypad(&mut self, state: JoypadState) {
        let mut requests = Interrupts::empty();
        self.joypad.set_state(state, &mut requests);
        self.request(requests);
    }

    pub(crate) fn set_button(&mut self, button: Button, pressed: bool) {
        let mut requests = Interrupts::empty();
        self.joypad.set_button(button, pressed, &mut requests);
        self.request(requests);
    }

    /// Checks a decoded snapshot bus against the bus it would replace.
    pub(crate) fn check_layout(&self, live: &GameBoyBus) -> Result<(), String> {
        if self.wram.len() != WRAM_SIZE || self.hram.len() != HRAM_SIZE {
            return Err(format!(
                "internal RAM is {}+{} bytes, expected {}+{}",
                self.wram.len(),
                self.hram.len(),
                WRAM_SIZE,
                HRAM_SIZE
            ));
        }
        if self.dma_stall > dma::OAM_DMA_CYCLES {
            return Err(format!("OAM DMA stall of {} cycles", self.dma_stall));
        }
        self.cartridge.check_layout(&live.cartridge)?;
        self.ppu.check_layout()?;
        self.apu.check_layout()
    }

    fn vram_open(&self) -> bool {
        self.vram_access == VramAccess::Open || self.ppu.vram_accessible()
    }

    fn oam_open(&self) -> bool {
        self.vram_access == VramAccess::Open || self.ppu.oam_accessible()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::Bus;
    use crate::machine::cartridge::CartridgeHeader;

    fn rom() -> Vec<u8> {
        let mut rom = vec![0u8; 0x8000];
        for (i, byte) in rom.iter_mut().enumerate() {
            *byte = (i >> 8) as u8;
        }
        rom[0x0134..0x0144].fill(0);
        rom[0x0147] = 0x08;
        rom[0x0148] = 0x00;
        rom[0x0149] = 0x02;
        rom[0x014D] = crate::machine::cartridge::header_checksum(&rom);
        rom
    }

    fn bus_with(config: &CoreConfig) -> GameBoyBus {
        let rom = rom();
        let header = CartridgeHeader::parse(&rom).unwrap();
        GameBoyBus::new(Cartridge::new(&rom, &header), config)
    }

    fn bus() -> GameBoyBus {
        bus_with(&CoreConfig::default())
    }

    #[test]
    fn echo_ram_mirrors_wram() {
        let mut bus = bus();
        bus.write8(0xC123, 0x5A);
        assert_eq!(bus.read8(0xE123), 0x5A);
        bus.write8(0xFDFF, 0xA5);
        assert_eq!(bus.read8(0xDDFF), 0xA5);
    }

    #[test]
    fn unusable_and_unmapped_regions_read_ff() {
        let mut bus = bus();
        bus.write8(0xFEA0, 0x12);
        assert_eq!(bus.read8(0xFEA0), 0xFF);
        assert_eq!(bus.read8(0xFF03), 0xFF);
        assert_eq!(bus.read8(0xFF4C), 0xFF);
        assert_eq!(bus.read8(0xFF7F), 0xFF);
    }

    #[test]
    fn if_upper_bits_read_one() {
        let mut bus = bus();
        bus.write8(0xFF0F, 0x00);
        assert_eq!(bus.read8(0xFF0F), 0xE0);
        bus.write8(0xFF0F, 0xFF);
        assert_eq!(bus.read8(0xFF0F), 0xFF);
        assert_eq!(bus.if_reg, Interrupts::all());
    }

    #[test]
    fn word_access_is_little_endian() {
        let mut bus = bus();
        bus.write16(0xC000, 0xBEEF);
        assert_eq!(bus.read8(0xC000), 0xEF);
        assert_eq!(bus.read8(0xC001), 0xBE);
        assert_eq!(bus.read16(0xC000), 0xBEEF);
        bus.write16(0xFF80, 0x1234);
        assert_eq!(bus.read16(0xFF80), 0x1234);
    }

    #[test]
    fn vram_blocked_during_pixel_transfer() {
        let mut bus = bus();
        bus.write8(0xFF40, 0x00);
        bus.write8(0x8000, 0x42);
        bus.write8(0xFF40, 0x91);
        // OAM scan lasts 80 dots; step into mode 3.
        bus.tick(84);
        assert_eq!(bus.read8(0xFF41) & 0x03, 3);
        assert_eq!(bus.read8(0x8000), 0xFF);
        assert_eq!(bus.read8(0xFE00), 0xFF);
        bus.write8(0x8000, 0x99);
        bus.write8(0xFF40, 0x00);
        assert_eq!(bus.read8(0x8000), 0x42);
    }

    #[test]
    fn open_policy_ignores_ppu_mode() {
        let config = CoreConfig::builder().vram_access(VramAccess::Open).build();
        let mut bus = bus_with(&config);
        bus.write8(0xFF40, 0x00);
        bus.write8(0xFF40, 0x91);
        bus.tick(84);
        bus.write8(0x8000, 0x77);
        assert_eq!(bus.read8(0x8000), 0x77);
        bus.write8(0xFE00, 0x66);
        assert_eq!(bus.read8(0xFE00), 0x66);
    }

    #[test]
    fn oam_dma_copies_immediately_and_charges_stall() {
        let mut bus = bus();
        for i in 0..0xA0u16 {
            bus.write8(0xC000 + i, i as u8);
        }
        bus.write8(0xFF40, 0x00);
        bus.write8(0xFF46, 0xC0);
        assert_eq!(bus.read8(0xFF46), 0xC0);
        assert_eq!(bus.read8(0xFE00), 0x00);
        assert_eq!(bus.read8(0xFE9F), 0x9F);
        assert_eq!(bus.take_dma_stall(), 640);
        assert_eq!(bus.take_dma_stall(), 0);
    }

    #[test]
    fn timer_overflow_is_logged_as_raised() {
        let mut bus = bus();
        bus.take_raised();
        bus.write8(0xFF0F, 0x00);
        bus.write8(0xFF06, 0x00);
        bus.write8(0xFF05, 0xFF);
        bus.write8(0xFF07, 0x05); // 16 cycles per increment
        bus.tick(64);
        assert!(bus.if_reg.contains(Interrupts::TIMER));
        assert!(bus.take_raised().contains(Interrupts::TIMER));
        assert!(!bus.take_raised().contains(Interrupts::TIMER));
    }

    #[test]
    fn rom_writes_do_not_modify_rom() {
        let mut bus = bus();
        let before = bus.read8(0x1234);
        bus.write8(0x1234, !before);
        assert_eq!(bus.read8(0x1234), before);
    }

    #[test]
    fn cartridge_ram_on_plain_cart() {
        let mut bus = bus();
        bus.write8(0xA000, 0x3C);
        assert_eq!(bus.read8(0xA000), 0x3C);
    }
}
