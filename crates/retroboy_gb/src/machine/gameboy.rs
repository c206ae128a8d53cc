use sha1::{Digest, Sha1};

use crate::config::CoreConfig;
use crate::cpu::{Bus, Cpu};
use crate::error::LoadError;
use crate::interrupts::Interrupts;

use super::{
    cartridge::{Cartridge, CartridgeHeader},
    joypad::{Button, JoypadState},
    GameBoyBus, CYCLES_PER_FRAME,
};

/// What one call to [`GameBoy::run_frame`] produced.
#[derive(Debug)]
pub struct FrameOutput<'a> {
    /// 160x144 row-major `0x00RRGGBB` pixels.
    pub pixels: &'a [u32],
    /// Interleaved stereo samples at the configured rate.
    pub audio: Vec<f32>,
    /// Every interrupt a peripheral requested during the frame.
    pub interrupts: Interrupts,
}

/// One emulated DMG with its cartridge inserted.
///
/// ```no_run
/// use retroboy_gb::{GameBoy, JoypadState};
///
/// let rom = std::fs::read("game.gb").unwrap();
/// let mut gb = GameBoy::load_rom(&rom).unwrap();
/// let frame = gb.run_frame(JoypadState::START);
/// assert_eq!(frame.pixels.len(), 160 * 144);
/// ```
#[derive(Debug, Clone)]
pub struct GameBoy {
    pub(crate) cpu: Cpu,
    pub(crate) bus: GameBoyBus,
    pub(crate) header: CartridgeHeader,
    pub(crate) rom_sha1: [u8; 20],
    pub(crate) config: CoreConfig,
    pub(crate) frames: u64,
}

impl GameBoy {
    /// Validate `rom` and power on with the default configuration.
    pub fn load_rom(rom: &[u8]) -> Result<Self, LoadError> {
        Self::with_config(rom, CoreConfig::default())
    }

    pub fn with_config(rom: &[u8], config: CoreConfig) -> Result<Self, LoadError> {
        let header = CartridgeHeader::parse(rom)?;
        let cartridge = Cartridge::new(rom, &header);
        let bus = GameBoyBus::new(cartridge, &config);
        Ok(Self {
            cpu: Cpu::new(),
            bus,
            header,
            rom_sha1: Sha1::digest(rom).into(),
            config,
            frames: 0,
        })
    }

    /// Power-cycle the console. Battery-backed RAM survives.
    pub fn reset(&mut self) {
        let battery = self.bus.cartridge.battery_ram().map(<[u8]>::to_vec);
        let rom = self.bus.cartridge.take_rom();
        let mut cartridge = Cartridge::new(&[], &self.header);
        cartridge.attach_rom(rom);
        if let Some(ram) = battery {
            if let Err(err) = cartridge.load_battery_ram(&ram) {
                log::warn!("battery RAM lost on reset: {err}");
            }
        }
        self.cpu.reset();
        self.bus = GameBoyBus::new(cartridge, &self.config);
        self.frames = 0;
    }

    /// Latch `input` as the full button state and run until the next frame
    /// boundary.
    pub fn run_frame(&mut self, input: JoypadState) -> FrameOutput<'_> {
        self.bus.set_joypad(input);
        self.step_frame();
        let audio = self.bus.apu.take_samples();
        let interrupts = self.bus.take_raised();
        FrameOutput {
            pixels: self.bus.ppu.frame(),
            audio,
            interrupts,
        }
    }

    /// Run until the PPU wraps from line 153 back to line 0, so the frame's
    /// VBlank period (and any handler it triggers) is inside the frame. With
    /// the LCD off, run for one frame's worth of cycles instead.
    fn step_frame(&mut self) {
        self.bus.ppu.frame_ready = false;
        let mut elapsed = 0u32;

        for _ in 0..self.config.max_steps_per_frame {
            let cycles = self.cpu.step(&mut self.bus);
            self.bus.tick(cycles);
            // The CPU sits out an OAM DMA; everything else keeps running.
            let stall = self.bus.take_dma_stall();
            if stall > 0 {
                self.bus.tick(stall);
            }
            elapsed = elapsed.saturating_add(cycles + stall);

            let lcd_off_frame = !self.bus.ppu.lcd_enabled() && elapsed >= CYCLES_PER_FRAME;
            if self.bus.ppu.frame_ready || lcd_off_frame {
                self.frames += 1;
                return;
            }
        }

        log::warn!(
            "frame {} hit the step cap ({} steps, {} cycles) at PC=0x{:04X}, LY={} mode={:?}, cycle {}",
            self.frames,
            self.config.max_steps_per_frame,
            elapsed,
            self.cpu.regs.pc,
            self.bus.ppu.ly(),
            self.bus.ppu.mode(),
            self.bus.cycles
        );
        self.frames += 1;
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        self.bus.set_button(button, pressed);
    }

    pub fn buttons(&self) -> JoypadState {
        self.bus.joypad.state()
    }

    /// The most recent frame: 160x144 row-major `0x00RRGGBB`.
    pub fn frame_buffer(&self) -> &[u32] {
        self.bus.ppu.frame()
    }

    /// Drain audio produced since the last drain.
    pub fn take_audio(&mut self) -> Vec<f32> {
        self.bus.apu.take_samples()
    }

    /// External RAM of battery-backed carts, for the host to persist.
    pub fn battery_ram(&self) -> Option<&[u8]> {
        self.bus.cartridge.battery_ram()
    }

    pub fn load_battery_ram(&mut self, data: &[u8]) -> Result<(), LoadError> {
        self.bus.cartridge.load_battery_ram(data)
    }

    /// Every byte shifted out over the serial port so far.
    pub fn serial_output(&self) -> &[u8] {
        &self.bus.serial.output
    }

    pub fn title(&self) -> &str {
        &self.header.title
    }

    pub fn header(&self) -> &CartridgeHeader {
        &self.header
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    /// Frames completed since power-on.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Read through the CPU's view of the bus, including access locks.
    pub fn read8(&mut self, addr: u16) -> u8 {
        self.bus.read8(addr)
    }
}
