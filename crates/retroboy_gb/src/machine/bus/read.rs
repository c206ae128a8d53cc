use super::GameBoyBus;

impl GameBoyBus {
    pub(super) fn read8_mmio(&mut self, addr: u16) -> u8 {
        match addr {
            // Cartridge ROM, routed through the mapper.
            0x0000..=0x7FFF => self.cartridge.rom_read(addr),

            0x8000..=0x9FFF => {
                if self.vram_open() {
                    self.ppu.vram[(addr - 0x8000) as usize]
                } else {
                    0xFF
                }
            }

            0xA000..=0xBFFF => self.cartridge.ram_read(addr),

            // Work RAM and its echo at E000-FDFF.
            0xC000..=0xFDFF => self.wram[(addr as usize - 0xC000) & 0x1FFF],

            0xFE00..=0xFE9F => {
                if self.oam_open() {
                    self.ppu.oam[(addr - 0xFE00) as usize]
                } else {
                    0xFF
                }
            }

            // Unusable area.
            0xFEA0..=0xFEFF => 0xFF,

            0xFF00 => self.joypad.read(),
            0xFF01 => self.serial.read_sb(),
            0xFF02 => self.serial.read_sc(),

            0xFF04 => self.timer.read_div(),
            0xFF05 => self.timer.read_tima(),
            0xFF06 => self.timer.read_tma(),
            0xFF07 => self.timer.read_tac(),

            0xFF0F => self.if_reg.bits() | 0b1110_0000,

            0xFF10..=0xFF3F => self.apu.read_reg(addr),

            0xFF46 => self.dma_source,
            0xFF40..=0xFF4B => self.ppu.read_reg(addr),

            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize],
            0xFFFF => self.ie_reg,

            // Unmapped I/O, including every CGB-only register.
            _ => 0xFF,
        }
    }
}
