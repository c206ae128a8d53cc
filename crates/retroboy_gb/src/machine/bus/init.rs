use super::GameBoyBus;
use crate::interrupts::Interrupts;

impl GameBoyBus {
    /// Bring the I/O space to the state the DMG boot ROM leaves behind.
    ///
    /// The APU and PPU construct themselves in their post-boot state;
    /// this covers the rest.
    pub(super) fn apply_dmg_initial_io_state(&mut self) {
        // WRAM and HRAM power up with noise on hardware. A fixed-seed
        // xorshift keeps runs reproducible without handing software zeros.
        self.fill_internal_ram();

        self.timer.init_dmg();
        // VBlank is already requested when the boot ROM hands over.
        self.if_reg = Interrupts::VBLANK;
        self.ie_reg = 0x00;
        self.dma_source = 0xFF;
    }

    fn fill_internal_ram(&mut self) {
        let mut x: u32 = 0xC0DE_1234;
        let mut next_byte = || {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            x as u8
        };

        for byte in self.wram.iter_mut() {
            *byte = next_byte();
        }
        for byte in self.hram.iter_mut() {
            *byte = next_byte();
        }
    }
}
