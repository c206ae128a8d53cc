use crate::cpu::{Bus, Cpu};

impl Cpu {
    /// PUSH rr. The pair encoding here uses AF in place of SP.
    pub(super) fn exec_push<B: Bus>(&mut self, bus: &mut B, p: u8) -> u32 {
        let value = if p == 3 { self.regs.af() } else { self.read_rp(p) };
        self.push16(bus, value);
        16
    }

    pub(super) fn exec_pop<B: Bus>(&mut self, bus: &mut B, p: u8) -> u32 {
        let value = self.pop16(bus);
        if p == 3 {
            self.regs.set_af(value);
        } else {
            self.write_rp(p, value);
        }
        12
    }

    pub(super) fn exec_call<B: Bus>(&mut self, bus: &mut B, taken: bool) -> u32 {
        let addr = self.fetch16(bus);
        if !taken {
            return 12;
        }
        let ret = self.regs.pc;
        self.push16(bus, ret);
        self.regs.pc = addr;
        24
    }

    pub(super) fn exec_ret<B: Bus>(&mut self, bus: &mut B) -> u32 {
        self.regs.pc = self.pop16(bus);
        16
    }

    pub(super) fn exec_ret_cc<B: Bus>(&mut self, bus: &mut B, taken: bool) -> u32 {
        if !taken {
            return 8;
        }
        self.regs.pc = self.pop16(bus);
        20
    }

    /// RETI enables IME immediately, without the EI delay.
    pub(super) fn exec_reti<B: Bus>(&mut self, bus: &mut B) -> u32 {
        self.regs.pc = self.pop16(bus);
        self.ime = true;
        self.ei_delay = 0;
        16
    }

    pub(super) fn exec_rst<B: Bus>(&mut self, bus: &mut B, y: u8) -> u32 {
        let ret = self.regs.pc;
        self.push16(bus, ret);
        self.regs.pc = y as u16 * 8;
        16
    }
}
