//! Sharp LR35902 interpreter.
//!
//! [`Cpu::step`] runs one instruction (or one interrupt dispatch, or one idle
//! slice while halted) and returns the T-cycles it took. The CPU never
//! advances peripherals itself; the frame driver ticks the bus afterwards.
mod alu;
mod bus;
mod cb;
mod exec;
mod interrupts;
mod operands;
mod regs;


use serde::{Deserialize, Serialize};

pub use bus::Bus;
pub use regs::{Flag, Registers};

/// Cycles reported for each step spent halted, stopped or locked.
const IDLE_CYCLES: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cpu {
    pub regs: Registers,
    pub ime: bool,
    /// Instructions left (including the current one) before a pending EI
    /// sets IME.
    ei_delay: u8,
    pub halted: bool,
    pub stopped: bool,
    /// The next opcode fetch does not advance PC.
    halt_bug: bool,
    /// An undefined opcode was executed; the core idles until reset.
    pub locked: bool,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    /// A CPU in the state the DMG boot ROM hands over at 0x0100.
    pub fn new() -> Self {
        Self {
            regs: Registers::dmg_post_boot(),
            ime: false,
            ei_delay: 0,
            halted: false,
            stopped: false,
            halt_bug: false,
            locked: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Execute one instruction or interrupt dispatch and return its cost in
    /// T-cycles.
    pub fn step<B: Bus>(&mut self, bus: &mut B) -> u32 {
        if self.locked {
            return IDLE_CYCLES;
        }

        if self.stopped {
            // STOP ends when any joypad line is pulled low.
            if bus.read8(0xFF00) & 0x0F == 0x0F {
                return IDLE_CYCLES;
            }
            log::debug!("STOP released by joypad");
            self.stopped = false;
        }

        let pending = self.pending_interrupts(bus);
        if self.halted {
            if pending.is_empty() {
                return IDLE_CYCLES;
            }
            self.halted = false;
        }

        if self.ime && !pending.is_empty() {
            return self.service_interrupt(bus, pending);
        }

        let opcode = self.fetch8(bus);
        let cycles = self.execute(bus, opcode);
        self.advance_ei_delay();
        cycles
    }
}
