use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::interrupts::Interrupts;

bitflags! {
    /// Button latch. The low nibble is the action group and the high nibble
    /// the d-pad, each in P1 bit order.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct JoypadState: u8 {
        const A = 1 << 0;
        const B = 1 << 1;
        const SELECT = 1 << 2;
        const START = 1 << 3;
        const RIGHT = 1 << 4;
        const LEFT = 1 << 5;
        const UP = 1 << 6;
        const DOWN = 1 << 7;
    }
}

/// A single Game Boy button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Right,
    Left,
    Up,
    Down,
    A,
    B,
    Select,
    Start,
}

impl Button {
    /// Host button codes: 0 Right, 1 Left, 2 Up, 3 Down, 4 A, 5 B,
    /// 6 Select, 7 Start.
    pub fn from_code(code: u8) -> Option<Button> {
        Some(match code {
            0 => Button::Right,
            1 => Button::Left,
            2 => Button::Up,
            3 => Button::Down,
            4 => Button::A,
            5 => Button::B,
            6 => Button::Select,
            7 => Button::Start,
            _ => return None,
        })
    }

    pub fn flag(self) -> JoypadState {
        match self {
            Button::Right => JoypadState::RIGHT,
            Button::Left => JoypadState::LEFT,
            Button::Up => JoypadState::UP,
            Button::Down => JoypadState::DOWN,
            Button::A => JoypadState::A,
            Button::B => JoypadState::B,
            Button::Select => JoypadState::SELECT,
            Button::Start => JoypadState::START,
        }
    }
}

/// P1 (0xFF00) register and button latch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Joypad {
    /// Bits 5 (action) and 4 (d-pad); 0 selects a group.
    select: u8,
    pressed: JoypadState,
}

impl Default for Joypad {
    fn default() -> Self {
        Self {
            select: 0x30,
            pressed: JoypadState::empty(),
        }
    }
}

impl Joypad {
    /// Active-low input lines P10-P13 for the current selection.
    fn lines(&self) -> u8 {
        let mut low = 0x0F;
        if self.select & 0x10 == 0 {
            low &= !(self.pressed.bits() >> 4) & 0x0F;
        }
        if self.select & 0x20 == 0 {
            low &= !self.pressed.bits() & 0x0F;
        }
        low
    }

    pub(crate) fn read(&self) -> u8 {
        0xC0 | self.select | self.lines()
    }

    pub(crate) fn write(&mut self, value: u8, requests: &mut Interrupts) {
        let before = self.lines();
        self.select = value & 0x30;
        self.raise_on_falling_edge(before, requests);
    }

    pub(crate) fn set_state(&mut self, state: JoypadState, requests: &mut Interrupts) {
        let before = self.lines();
        self.pressed = state;
        self.raise_on_falling_edge(before, requests);
    }

    pub(crate) fn set_button(&mut self, button: Button, pressed: bool, requests: &mut Interrupts) {
        let mut state = self.pressed;
        state.set(button.flag(), pressed);
        self.set_state(state, requests);
    }

    pub(crate) fn state(&self) -> JoypadState {
        self.pressed
    }

    fn raise_on_falling_edge(&self, before: u8, requests: &mut Interrupts) {
        let fell = before & !self.lines() & 0x0F;
        if fell != 0 {
            requests.insert(Interrupts::JOYPAD);
        }
    }
}
