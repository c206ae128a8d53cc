use crate::cpu::{Bus, Cpu, IDLE_CYCLES};

impl Cpu {
    pub(super) fn exec_halt<B: Bus>(&mut self, bus: &mut B) -> u32 {
        if !self.ime && !self.pending_interrupts(bus).is_empty() {
            // HALT bug: the CPU keeps running and the next opcode byte is
            // fetched twice.
            self.halt_bug = true;
        } else {
            self.halted = true;
        }
        4
    }

    /// STOP is two bytes long; the padding byte is consumed and ignored.
    pub(super) fn exec_stop<B: Bus>(&mut self, bus: &mut B) -> u32 {
        let _padding = self.fetch8(bus);
        self.stopped = true;
        log::debug!("STOP at PC=0x{:04X}", self.regs.pc.wrapping_sub(2));
        4
    }

    pub(super) fn exec_di(&mut self) -> u32 {
        self.ime = false;
        self.ei_delay = 0;
        4
    }

    /// IME is set once the instruction after EI has completed.
    pub(super) fn exec_ei(&mut self) -> u32 {
        if !self.ime && self.ei_delay == 0 {
            self.ei_delay = 2;
        }
        4
    }

    /// Undefined opcodes hang the real CPU until power-off. Here it idles
    /// so the rest of the machine keeps running.
    pub(super) fn lock(&mut self, opcode: u8) -> u32 {
        log::warn!(
            "CPU locked: undefined opcode 0x{:02X} at PC=0x{:04X} (SP=0x{:04X} AF=0x{:04X} BC=0x{:04X} DE=0x{:04X} HL=0x{:04X})",
            opcode,
            self.regs.pc.wrapping_sub(1),
            self.regs.sp,
            self.regs.af(),
            self.regs.bc(),
            self.regs.de(),
            self.regs.hl(),
        );
        self.locked = true;
        IDLE_CYCLES
    }
}
