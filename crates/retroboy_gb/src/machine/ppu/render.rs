use crate::SCREEN_WIDTH;

use super::Ppu;

const BG_MAP_LOW: usize = 0x1800;
const BG_MAP_HIGH: usize = 0x1C00;
const WINDOW_X_MAX: u8 = 166;

/// Map a 2-bit color index through a DMG palette register to a shade.
#[inline]
fn shade(palette: u8, color: u8) -> u8 {
    (palette >> (color * 2)) & 0x03
}

impl Ppu {
    /// Color index (0-3) of pixel `x` (0-7, left to right) of a tile row.
    #[inline]
    fn tile_pixel(&self, tile_addr: usize, row: usize, x: usize) -> u8 {
        let lo = self.vram[tile_addr + row * 2];
        let hi = self.vram[tile_addr + row * 2 + 1];
        let bit = 7 - x;
        (((hi >> bit) & 1) << 1) | ((lo >> bit) & 1)
    }

    /// VRAM offset of a background/window tile, honouring LCDC.4's
    /// unsigned (0x8000) or signed (0x9000) addressing.
    #[inline]
    fn bg_tile_addr(&self, tile_index: u8) -> usize {
        if self.lcdc & 0x10 != 0 {
            tile_index as usize * 16
        } else {
            (0x1000 + (tile_index as i8 as i32) * 16) as usize
        }
    }

    pub(super) fn render_scanline(&mut self) {
        let ly = self.ly as usize;
        // Color index of background/window per pixel, for sprite priority.
        let mut bg_colors = [0u8; SCREEN_WIDTH];
        let mut shades = [shade(self.bgp, 0); SCREEN_WIDTH];

        if self.lcdc & 0x01 != 0 {
            self.render_background(&mut bg_colors, &mut shades);
            self.render_window(&mut bg_colors, &mut shades);
        }
        if self.lcdc & 0x02 != 0 {
            self.render_sprites(&bg_colors, &mut shades);
        }

        let row = &mut self.frame[ly * SCREEN_WIDTH..(ly + 1) * SCREEN_WIDTH];
        for (pixel, &s) in row.iter_mut().zip(shades.iter()) {
            *pixel = self.palette[s as usize];
        }
    }

    fn render_background(&self, bg_colors: &mut [u8; SCREEN_WIDTH], shades: &mut [u8; SCREEN_WIDTH]) {
        let map = if self.lcdc & 0x08 != 0 { BG_MAP_HIGH } else { BG_MAP_LOW };
        let y = self.ly.wrapping_add(self.scy) as usize;
        let tile_row = y / 8;
        let row_in_tile = y % 8;

        for x in 0..SCREEN_WIDTH {
            let px = (x as u8).wrapping_add(self.scx) as usize;
            let tile_index = self.vram[map + tile_row * 32 + px / 8];
            let color = self.tile_pixel(self.bg_tile_addr(tile_index), row_in_tile, px % 8);
            bg_colors[x] = color;
            shades[x] = shade(self.bgp, color);
        }
    }

    fn render_window(&mut self, bg_colors: &mut [u8; SCREEN_WIDTH], shades: &mut [u8; SCREEN_WIDTH]) {
        if self.lcdc & 0x20 == 0 || !self.window_y_hit || self.wx > WINDOW_X_MAX {
            return;
        }
        let map = if self.lcdc & 0x40 != 0 { BG_MAP_HIGH } else { BG_MAP_LOW };
        let wy = self.window_line as usize;
        let start = self.wx as i16 - 7;

        for x in start.max(0) as usize..SCREEN_WIDTH {
            let wx = (x as i16 - start) as usize;
            let tile_index = self.vram[map + (wy / 8) * 32 + wx / 8];
            let color = self.tile_pixel(self.bg_tile_addr(tile_index), wy % 8, wx % 8);
            bg_colors[x] = color;
            shades[x] = shade(self.bgp, color);
        }
        self.window_line = self.window_line.wrapping_add(1);
    }

    fn render_sprites(&self, bg_colors: &[u8; SCREEN_WIDTH], shades: &mut [u8; SCREEN_WIDTH]) {
        let height: i16 = if self.lcdc & 0x04 != 0 { 16 } else { 8 };
        let bg_enabled = self.lcdc & 0x01 != 0;

        // DMG priority: smaller X first, OAM index breaks ties. The first
        // opaque sprite pixel claims the column even if BG then hides it.
        let mut order = self.line_sprites.clone();
        order.sort_by_key(|s| (s.x, s.oam_index));
        let mut claimed = [false; SCREEN_WIDTH];

        for sprite in &order {
            let mut row = self.ly as i16 - sprite.y;
            // LCDC.2 can shrink sprites after OAM scan picked them.
            if !(0..height).contains(&row) {
                continue;
            }
            if sprite.flags & 0x40 != 0 {
                row = height - 1 - row;
            }
            let tile = if height == 16 { sprite.tile & 0xFE } else { sprite.tile };
            let tile_addr = (tile as usize + (row as usize >> 3)) * 16;
            let palette = if sprite.flags & 0x10 != 0 { self.obp1 } else { self.obp0 };

            for px in 0..8i16 {
                let sx = sprite.x + px;
                if !(0..SCREEN_WIDTH as i16).contains(&sx) || claimed[sx as usize] {
                    continue;
                }
                let col = if sprite.flags & 0x20 != 0 { 7 - px } else { px };
                let color = self.tile_pixel(tile_addr, row as usize & 7, col as usize);
                // Color 0 is transparent.
                if color == 0 {
                    continue;
                }
                claimed[sx as usize] = true;
                let behind_bg = sprite.flags & 0x80 != 0 && bg_enabled && bg_colors[sx as usize] != 0;
                if !behind_bg {
                    shades[sx as usize] = shade(palette, color);
                }
            }
        }
    }
}
