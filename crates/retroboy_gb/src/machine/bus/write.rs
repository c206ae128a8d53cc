use super::GameBoyBus;
use crate::interrupts::Interrupts;

impl GameBoyBus {
    pub(super) fn write8_mmio(&mut self, addr: u16, value: u8) {
        match addr {
            // ROM is read-only; writes drive the MBC.
            0x0000..=0x7FFF => self.cartridge.rom_write(addr, value),

            0x8000..=0x9FFF => {
                if self.vram_open() {
                    self.ppu.vram[(addr - 0x8000) as usize] = value;
                }
            }

            0xA000..=0xBFFF => self.cartridge.ram_write(addr, value),

            0xC000..=0xFDFF => self.wram[(addr as usize - 0xC000) & 0x1FFF] = value,

            0xFE00..=0xFE9F => {
                if self.oam_open() {
                    self.ppu.oam[(addr - 0xFE00) as usize] = value;
                }
            }

            0xFEA0..=0xFEFF => {}

            0xFF00 => {
                let mut requests = Interrupts::empty();
                self.joypad.write(value, &mut requests);
                self.request(requests);
            }
            0xFF01 => self.serial.write_sb(value),
            0xFF02 => self.serial.write_sc(value),

            0xFF04 => self.timer.write_div(),
            0xFF05 => self.timer.write_tima(value),
            0xFF06 => self.timer.write_tma(value),
            0xFF07 => self.timer.write_tac(value),

            // Only the lower 5 bits exist.
            0xFF0F => self.if_reg = Interrupts::from_bits_truncate(value),

            0xFF10..=0xFF3F => self.apu.write_reg(addr, value),

            0xFF46 => self.do_oam_dma(value),
            0xFF40..=0xFF4B => {
                let mut requests = Interrupts::empty();
                self.ppu.write_reg(addr, value, &mut requests);
                self.request(requests);
            }

            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize] = value,
            0xFFFF => self.ie_reg = value,

            _ => {}
        }
    }
}
