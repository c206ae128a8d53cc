use super::GameBoyBus;

/// 160 M-cycles.
pub(super) const OAM_DMA_CYCLES: u32 = 640;

impl GameBoyBus {
    /// OAM DMA: copy 160 bytes from `value << 8` to FE00-FE9F.
    ///
    /// The copy happens at once; the scheduler then runs the rest of the
    /// machine for [`OAM_DMA_CYCLES`] while the CPU sits out.
    pub(super) fn do_oam_dma(&mut self, value: u8) {
        self.dma_source = value;
        let base = (value as u16) << 8;
        for i in 0..0xA0u16 {
            let byte = self.dma_read(base.wrapping_add(i));
            self.ppu.oam[i as usize] = byte;
        }
        self.dma_stall = OAM_DMA_CYCLES;
        log::debug!("OAM DMA from 0x{:04X}", base);
    }

    /// DMA reads bypass the PPU access locks; sources above DFFF hit the
    /// echo of WRAM.
    fn dma_read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x7FFF => self.cartridge.rom_read(addr),
            0x8000..=0x9FFF => self.ppu.vram[(addr - 0x8000) as usize],
            0xA000..=0xBFFF => self.cartridge.ram_read(addr),
            _ => self.wram[(addr as usize - 0xC000) & 0x1FFF],
        }
    }
}
