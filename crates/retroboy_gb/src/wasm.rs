use crate::{Button, GameBoy, JoypadState, SCREEN_HEIGHT, SCREEN_WIDTH};
use js_sys::{Float32Array, Uint8Array};
use wasm_bindgen::prelude::*;
use web_sys::KeyboardEvent;

/// Browser-facing handle around one [`GameBoy`].
///
/// Input is latched between frames and handed to the core on each
/// `run_frame`.
#[wasm_bindgen]
pub struct EmuSession {
    gb: GameBoy,
    input: JoypadState,
    audio: Vec<f32>,
}

#[wasm_bindgen]
impl EmuSession {
    #[wasm_bindgen(constructor)]
    pub fn new(rom: Uint8Array) -> Result<EmuSession, JsValue> {
        let gb = GameBoy::load_rom(&rom.to_vec()).map_err(|err| JsValue::from_str(&err.to_string()))?;
        log::info!("loaded '{}'", gb.title());
        Ok(EmuSession {
            gb,
            input: JoypadState::empty(),
            audio: Vec::new(),
        })
    }

    #[wasm_bindgen]
    pub fn run_frame(&mut self) {
        let output = self.gb.run_frame(self.input);
        self.audio.extend_from_slice(&output.audio);
    }

    /// The current frame as RGBA bytes, ready for `ImageData`.
    #[wasm_bindgen]
    pub fn frame_rgba(&self) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(SCREEN_WIDTH * SCREEN_HEIGHT * 4);
        for &pixel in self.gb.frame_buffer() {
            rgba.extend_from_slice(&[(pixel >> 16) as u8, (pixel >> 8) as u8, pixel as u8, 0xFF]);
        }
        rgba
    }

    #[wasm_bindgen]
    pub fn take_audio(&mut self) -> Float32Array {
        let samples = std::mem::take(&mut self.audio);
        Float32Array::from(samples.as_slice())
    }

    #[wasm_bindgen]
    pub fn joypad_event(&mut self, code: u8, pressed: bool) {
        if let Some(button) = Button::from_code(code) {
            self.press(button, pressed);
        }
    }

    #[wasm_bindgen]
    pub fn set_key(&mut self, evt: KeyboardEvent, pressed: bool) {
        if let Some(button) = key2btn(&evt.key()) {
            self.press(button, pressed);
        }
    }

    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.gb.reset();
        self.input = JoypadState::empty();
        self.audio.clear();
    }

    #[wasm_bindgen]
    pub fn save_state(&self) -> Vec<u8> {
        self.gb.save_state()
    }

    #[wasm_bindgen]
    pub fn load_state(&mut self, data: Uint8Array) -> Result<(), JsValue> {
        self.gb
            .load_state(&data.to_vec())
            .map_err(|err| JsValue::from_str(&err.to_string()))
    }
}

impl EmuSession {
    fn press(&mut self, button: Button, pressed: bool) {
        self.input.set(button.flag(), pressed);
        self.gb.set_button(button, pressed);
    }
}

fn key2btn(key: &str) -> Option<Button> {
    match key {
        "ArrowRight" => Some(Button::Right),
        "ArrowLeft" => Some(Button::Left),
        "ArrowUp" => Some(Button::Up),
        "ArrowDown" => Some(Button::Down),
        "z" | "Z" => Some(Button::A),
        "x" | "X" => Some(Button::B),
        "Shift" => Some(Button::Select),
        "Enter" => Some(Button::Start),
        _ => None,
    }
}
