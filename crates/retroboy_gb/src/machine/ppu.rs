//! Picture processing unit: dot-driven mode state machine and the LCD
//! registers (0xFF40-0xFF4B apart from DMA).
mod render;

use serde::{Deserialize, Serialize};

use crate::interrupts::Interrupts;
use crate::{SCREEN_HEIGHT, SCREEN_WIDTH};

pub(crate) const VRAM_SIZE: usize = 0x2000;
pub(crate) const OAM_SIZE: usize = 0xA0;

const DOTS_PER_LINE: u16 = 456;
const OAM_SCAN_DOTS: u16 = 80;
const TRANSFER_BASE_DOTS: u16 = 172;
const TRANSFER_MAX_DOTS: u16 = 289;
const SPRITE_PENALTY_DOTS: u16 = 6;
const LINES_PER_FRAME: u8 = 154;

/// STAT bits 0-1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PpuMode {
    HBlank = 0,
    VBlank = 1,
    OamScan = 2,
    Transfer = 3,
}

/// One OAM entry selected for the current line, in screen coordinates.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub(crate) struct Sprite {
    pub(crate) y: i16,
    pub(crate) x: i16,
    pub(crate) tile: u8,
    pub(crate) flags: u8,
    pub(crate) oam_index: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Ppu {
    pub(crate) vram: Vec<u8>,
    pub(crate) oam: Vec<u8>,

    lcdc: u8,
    /// Only the interrupt-select bits 3-6 are stored; mode and coincidence
    /// are computed on read.
    stat_select: u8,
    scy: u8,
    scx: u8,
    ly: u8,
    lyc: u8,
    bgp: u8,
    obp0: u8,
    obp1: u8,
    wy: u8,
    wx: u8,

    mode: PpuMode,
    /// Dot position within the current line (0..456).
    pub(crate) dot: u16,
    /// Length of pixel transfer for the current line.
    transfer_dots: u16,
    lyc_equal: bool,
    /// Combined STAT interrupt source line; requests fire on its rising edge.
    stat_line: bool,
    /// Set once LY == WY has been seen this frame.
    window_y_hit: bool,
    /// Internal window row counter; advances only on lines that drew the window.
    window_line: u8,
    line_sprites: Vec<Sprite>,

    frame: Vec<u32>,
    /// Set when the last VBlank line wraps back to line 0; cleared by the
    /// frame driver.
    pub(crate) frame_ready: bool,
    #[serde(skip)]
    palette: [u32; 4],
}

impl Ppu {
    pub(crate) fn new(palette: [u32; 4]) -> Self {
        let mut ppu = Self {
            vram: vec![0; VRAM_SIZE],
            oam: vec![0; OAM_SIZE],
            lcdc: 0x91,
            stat_select: 0,
            scy: 0,
            scx: 0,
            ly: 0,
            lyc: 0,
            bgp: 0xFC,
            obp0: 0xFF,
            obp1: 0xFF,
            wy: 0,
            wx: 0,
            mode: PpuMode::OamScan,
            dot: 0,
            transfer_dots: TRANSFER_BASE_DOTS,
            lyc_equal: true,
            stat_line: false,
            window_y_hit: false,
            window_line: 0,
            line_sprites: Vec::with_capacity(10),
            frame: vec![palette[0]; SCREEN_WIDTH * SCREEN_HEIGHT],
            frame_ready: false,
            palette,
        };
        ppu.start_line();
        ppu
    }

    pub(crate) fn set_palette(&mut self, palette: [u32; 4]) {
        self.palette = palette;
    }

    /// Buffer sizes and timing fields a decoded snapshot must satisfy before
    /// it can be ticked.
    pub(crate) fn check_layout(&self) -> Result<(), String> {
        if self.vram.len() != VRAM_SIZE || self.oam.len() != OAM_SIZE {
            return Err(format!(
                "video memory is {}+{} bytes, expected {}+{}",
                self.vram.len(),
                self.oam.len(),
                VRAM_SIZE,
                OAM_SIZE
            ));
        }
        if self.frame.len() != SCREEN_WIDTH * SCREEN_HEIGHT {
            return Err(format!("frame buffer holds {} pixels", self.frame.len()));
        }
        if self.line_sprites.len() > 10 {
            return Err(format!("{} sprites selected for one line", self.line_sprites.len()));
        }
        if self
            .line_sprites
            .iter()
            .any(|s| !(-16..144).contains(&s.y) || !(-8..248).contains(&s.x))
        {
            return Err("selected sprite lies outside the screen".to_string());
        }

        if self.ly >= LINES_PER_FRAME {
            return Err(format!("LY {} past the last line", self.ly));
        }
        if (self.ly as usize >= SCREEN_HEIGHT) != (self.mode == PpuMode::VBlank) {
            return Err(format!("mode {:?} on line {}", self.mode, self.ly));
        }
        if !(TRANSFER_BASE_DOTS..=TRANSFER_MAX_DOTS).contains(&self.transfer_dots) {
            return Err(format!("pixel transfer of {} dots", self.transfer_dots));
        }
        let (start, end) = match self.mode {
            PpuMode::OamScan => (0, OAM_SCAN_DOTS),
            PpuMode::Transfer => (OAM_SCAN_DOTS, OAM_SCAN_DOTS + self.transfer_dots),
            PpuMode::HBlank if self.lcd_enabled() => (OAM_SCAN_DOTS + self.transfer_dots, DOTS_PER_LINE),
            PpuMode::HBlank | PpuMode::VBlank => (0, DOTS_PER_LINE),
        };
        if !(start..end).contains(&self.dot) {
            return Err(format!("dot {} outside {:?} ({}..{})", self.dot, self.mode, start, end));
        }
        Ok(())
    }

    pub(crate) fn frame(&self) -> &[u32] {
        &self.frame
    }

    #[inline]
    pub(crate) fn lcd_enabled(&self) -> bool {
        (self.lcdc & 0x80) != 0
    }

    pub(crate) fn mode(&self) -> PpuMode {
        self.mode
    }

    pub(crate) fn ly(&self) -> u8 {
        self.ly
    }

    /// Whether the CPU may touch VRAM right now.
    pub(crate) fn vram_accessible(&self) -> bool {
        !self.lcd_enabled() || self.mode != PpuMode::Transfer
    }

    /// Whether the CPU may touch OAM right now.
    pub(crate) fn oam_accessible(&self) -> bool {
        !self.lcd_enabled() || matches!(self.mode, PpuMode::HBlank | PpuMode::VBlank)
    }

    pub(crate) fn read_reg(&self, addr: u16) -> u8 {
        match addr {
            0xFF40 => self.lcdc,
            0xFF41 => {
                let mode = if self.lcd_enabled() { self.mode as u8 } else { 0 };
                0x80 | self.stat_select | ((self.lyc_equal as u8) << 2) | mode
            }
            0xFF42 => self.scy,
            0xFF43 => self.scx,
            0xFF44 => self.ly,
            0xFF45 => self.lyc,
            0xFF47 => self.bgp,
            0xFF48 => self.obp0,
            0xFF49 => self.obp1,
            0xFF4A => self.wy,
            0xFF4B => self.wx,
            _ => 0xFF,
        }
    }

    pub(crate) fn write_reg(&mut self, addr: u16, value: u8, requests: &mut Interrupts) {
        match addr {
            0xFF40 => {
                let was_on = self.lcd_enabled();
                self.lcdc = value;
                match (was_on, self.lcd_enabled()) {
                    (true, false) => self.switch_off(),
                    (false, true) => self.switch_on(requests),
                    _ => {}
                }
            }
            0xFF41 => {
                self.stat_select = value & 0x78;
                self.update_stat_line(requests);
            }
            0xFF42 => self.scy = value,
            0xFF43 => self.scx = value,
            // LY is read-only.
            0xFF44 => {}
            0xFF45 => {
                self.lyc = value;
                self.update_coincidence(requests);
            }
            0xFF47 => self.bgp = value,
            0xFF48 => self.obp0 = value,
            0xFF49 => self.obp1 = value,
            0xFF4A => self.wy = value,
            0xFF4B => self.wx = value,
            _ => {}
        }
    }

    fn switch_off(&mut self) {
        log::debug!("LCD off at LY={} mode={:?}", self.ly, self.mode);
        self.ly = 0;
        self.dot = 0;
        self.mode = PpuMode::HBlank;
        self.stat_line = false;
        self.window_y_hit = false;
        self.window_line = 0;
        let blank = self.palette[0];
        self.frame.fill(blank);
    }

    fn switch_on(&mut self, requests: &mut Interrupts) {
        log::debug!("LCD on");
        self.ly = 0;
        self.dot = 0;
        self.start_line();
        self.update_coincidence(requests);
    }

    /// Advance the PPU by `cycles` dots (one dot per T-cycle on DMG).
    pub(crate) fn tick(&mut self, cycles: u32, requests: &mut Interrupts) {
        if !self.lcd_enabled() {
            return;
        }

        let mut remaining = cycles;
        while remaining > 0 {
            let boundary = match self.mode {
                PpuMode::OamScan => OAM_SCAN_DOTS,
                PpuMode::Transfer => OAM_SCAN_DOTS + self.transfer_dots,
                PpuMode::HBlank | PpuMode::VBlank => DOTS_PER_LINE,
            };
            let step = remaining.min((boundary - self.dot) as u32);
            self.dot += step as u16;
            remaining -= step;
            if self.dot == boundary {
                self.advance_mode(requests);
            }
        }
    }

    fn advance_mode(&mut self, requests: &mut Interrupts) {
        match self.mode {
            PpuMode::OamScan => {
                self.oam_scan();
                let penalty = SPRITE_PENALTY_DOTS * self.line_sprites.len() as u16;
                self.transfer_dots = (TRANSFER_BASE_DOTS + (self.scx & 0x07) as u16 + penalty)
                    .min(TRANSFER_MAX_DOTS);
                self.mode = PpuMode::Transfer;
            }
            PpuMode::Transfer => {
                self.render_scanline();
                self.mode = PpuMode::HBlank;
            }
            PpuMode::HBlank => {
                self.dot = 0;
                self.ly += 1;
                if self.ly as usize == SCREEN_HEIGHT {
                    self.mode = PpuMode::VBlank;
                    requests.insert(Interrupts::VBLANK);
                    log::debug!("VBlank start");
                } else {
                    self.start_line();
                }
                self.update_coincidence(requests);
            }
            PpuMode::VBlank => {
                self.dot = 0;
                self.ly += 1;
                if self.ly == LINES_PER_FRAME {
                    self.ly = 0;
                    self.window_line = 0;
                    self.window_y_hit = false;
                    self.frame_ready = true;
                    self.start_line();
                }
                self.update_coincidence(requests);
            }
        }
        self.update_stat_line(requests);
    }

    fn start_line(&mut self) {
        self.mode = PpuMode::OamScan;
        if self.ly == self.wy {
            self.window_y_hit = true;
        }
    }

    fn update_coincidence(&mut self, requests: &mut Interrupts) {
        self.lyc_equal = self.ly == self.lyc;
        self.update_stat_line(requests);
    }

    /// Recompute the ORed STAT source line and request on a rising edge.
    fn update_stat_line(&mut self, requests: &mut Interrupts) {
        if !self.lcd_enabled() {
            self.stat_line = false;
            return;
        }
        let mode_source = match self.mode {
            PpuMode::HBlank => self.stat_select & 0x08 != 0,
            PpuMode::VBlank => self.stat_select & 0x10 != 0,
            PpuMode::OamScan => self.stat_select & 0x20 != 0,
            PpuMode::Transfer => false,
        };
        let line = mode_source || (self.lyc_equal && self.stat_select & 0x40 != 0);
        if line && !self.stat_line {
            requests.insert(Interrupts::LCD_STAT);
            log::debug!("STAT rising edge: LY={} mode={:?}", self.ly, self.mode);
        }
        self.stat_line = line;
    }

    /// Select up to ten sprites overlapping this line, in OAM order.
    fn oam_scan(&mut self) {
        self.line_sprites.clear();
        let height: i16 = if self.lcdc & 0x04 != 0 { 16 } else { 8 };
        let ly = self.ly as i16;
        for (index, entry) in self.oam.chunks_exact(4).enumerate() {
            let y = entry[0] as i16 - 16;
            if ly < y || ly >= y + height {
                continue;
            }
            self.line_sprites.push(Sprite {
                y,
                x: entry[1] as i16 - 8,
                tile: entry[2],
                flags: entry[3],
                oam_index: index as u8,
            });
            if self.line_sprites.len() == 10 {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GREY_PALETTE;

    fn ppu() -> Ppu {
        Ppu::new(GREY_PALETTE)
    }

    #[test]
    fn mode_sequence_within_a_line() {
        let mut ppu = ppu();
        let mut req = Interrupts::empty();
        assert_eq!(ppu.mode(), PpuMode::OamScan);
        ppu.tick(79, &mut req);
        assert_eq!(ppu.mode(), PpuMode::OamScan);
        ppu.tick(1, &mut req);
        assert_eq!(ppu.mode(), PpuMode::Transfer);
        ppu.tick(172, &mut req);
        assert_eq!(ppu.mode(), PpuMode::HBlank);
        ppu.tick(456 - 252, &mut req);
        assert_eq!(ppu.ly(), 1);
        assert_eq!(ppu.mode(), PpuMode::OamScan);
    }

    #[test]
    fn vblank_requested_once_per_frame_at_line_144() {
        let mut ppu = ppu();
        let mut req = Interrupts::empty();
        ppu.tick(456 * 144 - 1, &mut req);
        assert!(!req.contains(Interrupts::VBLANK));
        ppu.tick(1, &mut req);
        assert!(req.contains(Interrupts::VBLANK));
        assert_eq!(ppu.ly(), 144);

        let mut count = 1;
        for _ in 0..(70_224 * 3 / 4) {
            let mut req = Interrupts::empty();
            ppu.tick(4, &mut req);
            if req.contains(Interrupts::VBLANK) {
                count += 1;
            }
        }
        assert_eq!(count, 4);
    }

    #[test]
    fn frame_completes_when_line_153_wraps() {
        let mut ppu = ppu();
        let mut req = Interrupts::empty();
        ppu.tick(456 * 144, &mut req);
        assert_eq!(ppu.mode(), PpuMode::VBlank);
        assert!(!ppu.frame_ready);
        ppu.tick(456 * 10 - 1, &mut req);
        assert!(!ppu.frame_ready);
        ppu.tick(1, &mut req);
        assert!(ppu.frame_ready);
        assert_eq!(ppu.ly(), 0);
        assert_eq!(ppu.mode(), PpuMode::OamScan);
    }

    #[test]
    fn window_shows_on_first_line_after_lcd_on() {
        let mut ppu = ppu();
        let mut req = Interrupts::empty();
        ppu.write_reg(0xFF40, 0x00, &mut req);
        ppu.vram[0x1C00..0x1C14].fill(1);
        ppu.vram[0x10..0x20].fill(0xFF);
        ppu.write_reg(0xFF4B, 7, &mut req);
        ppu.write_reg(0xFF40, 0xF1, &mut req);
        ppu.tick(252, &mut req);
        assert_eq!(ppu.mode(), PpuMode::HBlank);
        assert_eq!(ppu.frame()[0], GREY_PALETTE[3]);
        assert_eq!(ppu.frame()[SCREEN_WIDTH - 1], GREY_PALETTE[3]);
    }

    #[test]
    fn layout_check_rejects_impossible_timing() {
        let mut ppu = ppu();
        assert_eq!(ppu.check_layout(), Ok(()));

        ppu.dot = 500;
        assert!(ppu.check_layout().is_err());

        let mut ppu = self::ppu();
        let mut req = Interrupts::empty();
        ppu.tick(456 * 150, &mut req);
        assert_eq!(ppu.check_layout(), Ok(()));
        ppu.mode = PpuMode::OamScan;
        assert!(ppu.check_layout().is_err());

        let mut ppu = self::ppu();
        ppu.ly = 154;
        ppu.mode = PpuMode::VBlank;
        assert!(ppu.check_layout().is_err());

        let mut ppu = self::ppu();
        ppu.transfer_dots = 400;
        assert!(ppu.check_layout().is_err());
    }

    #[test]
    fn stat_fires_on_rising_edge_only() {
        let mut ppu = ppu();
        let mut req = Interrupts::empty();
        // HBlank and OAM sources both enabled: the line stays high across
        // the HBlank -> OAM boundary, so only one request per line.
        ppu.write_reg(0xFF41, 0x28, &mut req);
        assert_eq!(req, Interrupts::LCD_STAT);

        let mut req = Interrupts::empty();
        ppu.tick(80, &mut req);
        assert!(req.is_empty());
        ppu.tick(172, &mut req);
        assert_eq!(req, Interrupts::LCD_STAT);

        let mut req = Interrupts::empty();
        ppu.tick(456 - 252 + 80, &mut req);
        assert!(req.is_empty());
    }

    #[test]
    fn lyc_coincidence_requests_stat() {
        let mut ppu = ppu();
        let mut req = Interrupts::empty();
        ppu.write_reg(0xFF45, 3, &mut req);
        ppu.write_reg(0xFF41, 0x40, &mut req);
        assert!(req.is_empty());
        ppu.tick(456 * 3, &mut req);
        assert_eq!(req, Interrupts::LCD_STAT);
        assert_eq!(ppu.read_reg(0xFF41) & 0x04, 0x04);
    }

    #[test]
    fn lcd_off_freezes_and_blanks() {
        let mut ppu = ppu();
        let mut req = Interrupts::empty();
        ppu.tick(456 * 10 + 100, &mut req);
        ppu.write_reg(0xFF40, 0x11, &mut req);
        assert_eq!(ppu.ly(), 0);
        assert_eq!(ppu.read_reg(0xFF41) & 0x03, 0);
        ppu.tick(70_224, &mut req);
        assert_eq!(ppu.ly(), 0);
        assert!(ppu.frame().iter().all(|&p| p == GREY_PALETTE[0]));
        assert!(ppu.vram_accessible() && ppu.oam_accessible());
    }

    #[test]
    fn oam_scan_caps_at_ten_sprites() {
        let mut ppu = ppu();
        for i in 0..40 {
            ppu.oam[i * 4] = 16;
            ppu.oam[i * 4 + 1] = 8 + i as u8;
        }
        ppu.oam_scan();
        assert_eq!(ppu.line_sprites.len(), 10);
        assert_eq!(ppu.line_sprites[9].oam_index, 9);
    }
}
