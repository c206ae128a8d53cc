use once_cell::sync::Lazy;

use super::{header_checksum, GameBoy, JoypadState, CYCLES_PER_FRAME};
use crate::cpu::Bus;
use crate::{Interrupts, StateError, SCREEN_HEIGHT, SCREEN_WIDTH};

/// Assemble a 32 KiB cartridge: `main` at 0x0150, `vblank` at 0x0200 (the
/// VBlank vector jumps there), with a valid header checksum.
fn build_rom(title: &str, cartridge_type: u8, ram_code: u8, main: &[u8], vblank: &[u8]) -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000];
    // Entry point: NOP; JP 0x0150.
    rom[0x100..0x104].copy_from_slice(&[0x00, 0xC3, 0x50, 0x01]);
    // VBlank vector: JP 0x0200.
    rom[0x40..0x43].copy_from_slice(&[0xC3, 0x00, 0x02]);
    rom[0x134..0x134 + title.len()].copy_from_slice(title.as_bytes());
    rom[0x147] = cartridge_type;
    rom[0x148] = 0x00;
    rom[0x149] = ram_code;
    rom[0x150..0x150 + main.len()].copy_from_slice(main);
    rom[0x200..0x200 + vblank.len()].copy_from_slice(vblank);
    rom[0x14D] = header_checksum(&rom);
    rom
}

/// Spins on `JR -2` forever.
static IDLE_ROM: Lazy<Vec<u8>> = Lazy::new(|| build_rom("IDLE", 0x00, 0x00, &[0x18, 0xFE], &[]));

/// Counts VBlanks at 0xC000 and stores 0x42 at 0xC001 from the handler.
static VBLANK_ROM: Lazy<Vec<u8>> = Lazy::new(|| {
    let main = [
        0xAF, // XOR A
        0xEA, 0x00, 0xC0, // LD (0xC000),A
        0xE0, 0x0F, // LDH (IF),A
        0x3E, 0x01, // LD A,0x01
        0xE0, 0xFF, // LDH (IE),A
        0xFB, // EI
        0x76, // HALT
        0x18, 0xFD, // JR -3
    ];
    let handler = [
        0x3E, 0x42, // LD A,0x42
        0xEA, 0x01, 0xC0, // LD (0xC001),A
        0x21, 0x00, 0xC0, // LD HL,0xC000
        0x34, // INC (HL)
        0xD9, // RETI
    ];
    build_rom("VBLANK", 0x00, 0x00, &main, &handler)
});

/// Counts HBlank STAT interrupts at 0xC002.
static HBLANK_STAT_ROM: Lazy<Vec<u8>> = Lazy::new(|| {
    let main = [
        0xAF, // XOR A
        0xEA, 0x02, 0xC0, // LD (0xC002),A
        0xE0, 0x0F, // LDH (IF),A
        0x3E, 0x08, // LD A,0x08
        0xE0, 0x41, // LDH (STAT),A
        0x3E, 0x02, // LD A,0x02
        0xE0, 0xFF, // LDH (IE),A
        0xFB, // EI
        0x76, // HALT
        0x18, 0xFD, // JR -3
    ];
    let mut rom = build_rom("HBLANK", 0x00, 0x00, &main, &[]);
    // STAT vector: JP 0x0240.
    rom[0x48..0x4B].copy_from_slice(&[0xC3, 0x40, 0x02]);
    rom[0x240..0x245].copy_from_slice(&[
        0x21, 0x02, 0xC0, // LD HL,0xC002
        0x34, // INC (HL)
        0xD9, // RETI
    ]);
    rom
});

/// Sets up all four sound channels and then idles, so frames carry audio.
static SOUND_ROM: Lazy<Vec<u8>> = Lazy::new(|| {
    let main = [
        0x3E, 0x80, 0xE0, 0x11, // NR11 duty 50%
        0x3E, 0xF0, 0xE0, 0x12, // NR12 volume 15
        0x3E, 0x00, 0xE0, 0x13, // NR13
        0x3E, 0x86, 0xE0, 0x14, // NR14 trigger, freq 0x600
        0x3E, 0xF1, 0xE0, 0x21, // NR42 volume 15, decreasing
        0x3E, 0x22, 0xE0, 0x22, // NR43
        0x3E, 0x80, 0xE0, 0x23, // NR44 trigger
        0x18, 0xFE, // JR -2
    ];
    build_rom("SOUND", 0x00, 0x00, &main, &[])
});

fn frames(gb: &mut GameBoy, inputs: &[JoypadState]) -> Vec<(Vec<u32>, Vec<f32>, Interrupts)> {
    inputs
        .iter()
        .map(|&input| {
            let out = gb.run_frame(input);
            (out.pixels.to_vec(), out.audio, out.interrupts)
        })
        .collect()
}

#[test]
fn run_frame_yields_full_palette_frame() {
    let mut gb = GameBoy::load_rom(&IDLE_ROM).unwrap();
    let palette = gb.config().resolved_palette();
    let out = gb.run_frame(JoypadState::empty());
    assert_eq!(out.pixels.len(), SCREEN_WIDTH * SCREEN_HEIGHT);
    assert!(out.pixels.iter().all(|p| palette.contains(p)));
    assert!(out.interrupts.contains(Interrupts::VBLANK));
    assert_eq!(gb.frame_count(), 1);
    assert_eq!(gb.frame_buffer().len(), SCREEN_WIDTH * SCREEN_HEIGHT);
}

#[test]
fn frames_end_when_line_153_wraps() {
    let mut gb = GameBoy::load_rom(&IDLE_ROM).unwrap();
    gb.run_frame(JoypadState::empty());
    let mut last = gb.bus.cycles;
    for _ in 0..5 {
        let out = gb.run_frame(JoypadState::empty());
        assert!(out.interrupts.contains(Interrupts::VBLANK));
        assert_eq!(gb.bus.ppu.ly(), 0);
        let elapsed = (gb.bus.cycles - last) as i64;
        assert!((elapsed - CYCLES_PER_FRAME as i64).abs() < 24, "frame took {elapsed} cycles");
        last = gb.bus.cycles;
    }
}

#[test]
fn vblank_handler_runs_within_its_frame() {
    let mut gb = GameBoy::load_rom(&VBLANK_ROM).unwrap();
    gb.run_frame(JoypadState::empty());
    assert_eq!(gb.read8(0xC001), 0x42);
    assert_eq!(gb.read8(0xC000), 1);
}

#[test]
fn vblank_handler_runs_once_per_frame() {
    let mut gb = GameBoy::load_rom(&VBLANK_ROM).unwrap();
    for _ in 0..5 {
        gb.run_frame(JoypadState::empty());
    }
    assert_eq!(gb.read8(0xC000), 5);

    gb.run_frame(JoypadState::empty());
    assert_eq!(gb.read8(0xC000), 6);
}

#[test]
fn hblank_stat_interrupt_fires_once_per_visible_line() {
    let mut gb = GameBoy::load_rom(&HBLANK_STAT_ROM).unwrap();
    let out = gb.run_frame(JoypadState::empty());
    assert!(out.interrupts.contains(Interrupts::LCD_STAT));
    assert_eq!(gb.read8(0xC002), 144);

    gb.run_frame(JoypadState::empty());
    assert_eq!(gb.read8(0xC002), 32);
}

#[test]
fn save_then_load_replays_identically() {
    let inputs = [
        JoypadState::empty(),
        JoypadState::A,
        JoypadState::A | JoypadState::RIGHT,
        JoypadState::empty(),
        JoypadState::START,
    ];
    let mut gb = GameBoy::load_rom(&SOUND_ROM).unwrap();
    frames(&mut gb, &inputs[..3]);

    let state = gb.save_state();
    let first = frames(&mut gb, &inputs);

    gb.load_state(&state).unwrap();
    assert_eq!(gb.save_state(), state);
    let second = frames(&mut gb, &inputs);

    assert_eq!(first, second);
    assert!(first.iter().any(|(_, audio, _)| audio.iter().any(|&s| s != 0.0)));
}

#[test]
fn same_rom_and_inputs_are_deterministic() {
    let inputs: Vec<JoypadState> = (0..8u8).map(|i| JoypadState::from_bits_truncate(1 << i)).collect();
    let mut a = GameBoy::load_rom(&SOUND_ROM).unwrap();
    let mut b = GameBoy::load_rom(&SOUND_ROM).unwrap();
    assert_eq!(frames(&mut a, &inputs), frames(&mut b, &inputs));
}

#[test]
fn state_from_other_cartridge_is_rejected_untouched() {
    let mut idle = GameBoy::load_rom(&IDLE_ROM).unwrap();
    idle.run_frame(JoypadState::empty());
    let foreign = idle.save_state();

    let mut gb = GameBoy::load_rom(&VBLANK_ROM).unwrap();
    gb.run_frame(JoypadState::empty());
    let before = gb.save_state();

    assert_eq!(gb.load_state(&foreign), Err(StateError::CartridgeMismatch));
    assert_eq!(gb.save_state(), before);
}

#[test]
fn malformed_states_report_their_cause() {
    let mut gb = GameBoy::load_rom(&IDLE_ROM).unwrap();
    gb.run_frame(JoypadState::empty());
    let state = gb.save_state();
    let before = gb.save_state();

    let mut wrong_magic = state.clone();
    wrong_magic[0] = b'X';
    assert_eq!(gb.load_state(&wrong_magic), Err(StateError::BadMagic));
    assert_eq!(gb.load_state(b"XB"), Err(StateError::BadMagic));

    assert_eq!(gb.load_state(&[]), Err(StateError::Truncated { len: 0 }));
    assert_eq!(gb.load_state(b"RB"), Err(StateError::Truncated { len: 2 }));
    assert_eq!(gb.load_state(&state[..4]), Err(StateError::Truncated { len: 4 }));
    assert_eq!(gb.load_state(&state[..5]), Err(StateError::Truncated { len: 5 }));
    assert_eq!(gb.load_state(&state[..20]), Err(StateError::Truncated { len: 20 }));

    let mut future = state.clone();
    future[4] = 9;
    assert_eq!(
        gb.load_state(&future),
        Err(StateError::VersionMismatch { expected: 1, found: 9 })
    );

    assert_eq!(gb.load_state(&state[..40]), Err(StateError::Truncated { len: 40 }));
    let half = state.len() / 2;
    assert_eq!(gb.load_state(&state[..half]), Err(StateError::Truncated { len: half }));
    assert_eq!(gb.save_state(), before);
}

#[test]
fn out_of_range_state_fields_are_rejected() {
    let mut gb = GameBoy::load_rom(&IDLE_ROM).unwrap();
    gb.run_frame(JoypadState::empty());
    let before = gb.save_state();

    let mut donor = GameBoy::load_rom(&IDLE_ROM).unwrap();
    donor.run_frame(JoypadState::empty());
    donor.bus.ppu.dot = 500;
    assert!(matches!(gb.load_state(&donor.save_state()), Err(StateError::Corrupt(_))));
    assert_eq!(gb.save_state(), before);

    let out = gb.run_frame(JoypadState::empty());
    assert_eq!(out.pixels.len(), SCREEN_WIDTH * SCREEN_HEIGHT);
}

#[test]
fn undefined_opcode_locks_but_frames_continue() {
    let rom = build_rom("LOCK", 0x00, 0x00, &[0xD3], &[]);
    let mut gb = GameBoy::load_rom(&rom).unwrap();
    for _ in 0..3 {
        let out = gb.run_frame(JoypadState::empty());
        assert_eq!(out.pixels.len(), SCREEN_WIDTH * SCREEN_HEIGHT);
    }
    assert!(gb.cpu().locked);
    assert_eq!(gb.frame_count(), 3);
}

#[test]
fn lcd_off_frames_run_a_full_frame_budget() {
    // XOR A; LDH (LCDC),A; JR -2
    let rom = build_rom("LCDOFF", 0x00, 0x00, &[0xAF, 0xE0, 0x40, 0x18, 0xFE], &[]);
    let mut gb = GameBoy::load_rom(&rom).unwrap();
    gb.run_frame(JoypadState::empty());
    let start = gb.bus.cycles;
    let out = gb.run_frame(JoypadState::empty());
    assert!(!out.interrupts.contains(Interrupts::VBLANK));
    let elapsed = gb.bus.cycles - start;
    assert!(elapsed >= CYCLES_PER_FRAME as u64 && elapsed < CYCLES_PER_FRAME as u64 + 16);
}

#[test]
fn serial_bytes_reach_host() {
    // LD A,'H'; LDH (SB),A; LD A,0x81; LDH (SC),A; JR -2
    let main = [0x3E, b'H', 0xE0, 0x01, 0x3E, 0x81, 0xE0, 0x02, 0x18, 0xFE];
    let rom = build_rom("SERIAL", 0x00, 0x00, &main, &[]);
    let mut gb = GameBoy::load_rom(&rom).unwrap();
    let out = gb.run_frame(JoypadState::empty());
    assert!(out.interrupts.contains(Interrupts::SERIAL));
    assert_eq!(gb.serial_output(), b"H");
}

#[test]
fn rtc_reads_hold_the_latched_time() {
    let rom = build_rom("CLOCK", 0x10, 0x02, &[0x18, 0xFE], &[]);
    let mut gb = GameBoy::load_rom(&rom).unwrap();
    gb.bus.write8(0x0000, 0x0A);
    gb.bus.write8(0x4000, 0x08);
    gb.bus.write8(0xA000, 5);
    assert_eq!(gb.read8(0xA000), 0);

    gb.bus.write8(0x6000, 0x00);
    gb.bus.write8(0x6000, 0x01);
    assert_eq!(gb.read8(0xA000), 5);

    // A little over one emulated second.
    for _ in 0..60 {
        gb.run_frame(JoypadState::empty());
    }
    assert_eq!(gb.read8(0xA000), 5);
    gb.bus.write8(0x6000, 0x01);
    assert_eq!(gb.read8(0xA000), 5);

    gb.bus.write8(0x6000, 0x00);
    gb.bus.write8(0x6000, 0x01);
    assert_eq!(gb.read8(0xA000), 6);
}

#[test]
fn run_frame_latches_buttons() {
    let mut gb = GameBoy::load_rom(&IDLE_ROM).unwrap();
    gb.run_frame(JoypadState::START);
    assert_eq!(gb.buttons(), JoypadState::START);
    gb.bus.write8(0xFF00, 0x10);
    assert_eq!(gb.read8(0xFF00) & 0x0F, 0x07);

    gb.set_button(super::Button::Start, false);
    assert_eq!(gb.read8(0xFF00) & 0x0F, 0x0F);
}

#[test]
fn reset_keeps_battery_ram() {
    let rom = build_rom("SAVE", 0x03, 0x02, &[0x18, 0xFE], &[]);
    let mut gb = GameBoy::load_rom(&rom).unwrap();
    assert_eq!(gb.title(), "SAVE");
    gb.bus.write8(0x0000, 0x0A);
    gb.bus.write8(0xA000, 0x5A);
    gb.run_frame(JoypadState::empty());

    gb.reset();
    assert_eq!(gb.frame_count(), 0);
    assert_eq!(gb.cpu().regs.pc, 0x0100);
    assert_eq!(gb.battery_ram().map(|ram| ram[0]), Some(0x5A));
    assert_eq!(gb.read8(0x0150), 0x18);
}

#[test]
fn battery_ram_round_trips_through_host() {
    let rom = build_rom("SAVE", 0x03, 0x02, &[0x18, 0xFE], &[]);
    let mut gb = GameBoy::load_rom(&rom).unwrap();
    let mut ram = vec![0u8; 0x2000];
    ram[0x10] = 0x99;
    gb.load_battery_ram(&ram).unwrap();
    gb.bus.write8(0x0000, 0x0A);
    assert_eq!(gb.read8(0xA010), 0x99);
    assert!(gb.load_battery_ram(&ram[..16]).is_err());
}
