use crate::cpu::{Bus, Cpu, Flag};

impl Cpu {
    pub(super) fn exec_inc_rp(&mut self, p: u8) -> u32 {
        let value = self.read_rp(p).wrapping_add(1);
        self.write_rp(p, value);
        8
    }

    pub(super) fn exec_dec_rp(&mut self, p: u8) -> u32 {
        let value = self.read_rp(p).wrapping_sub(1);
        self.write_rp(p, value);
        8
    }

    pub(super) fn exec_add_hl_rp(&mut self, p: u8) -> u32 {
        let value = self.read_rp(p);
        self.alu_add_hl(value);
        8
    }

    pub(super) fn exec_inc_r<B: Bus>(&mut self, bus: &mut B, y: u8) -> u32 {
        let value = self.read_r8(bus, y);
        let result = self.alu_inc(value);
        self.write_r8(bus, y, result);
        if y == 6 {
            12
        } else {
            4
        }
    }

    pub(super) fn exec_dec_r<B: Bus>(&mut self, bus: &mut B, y: u8) -> u32 {
        let value = self.read_r8(bus, y);
        let result = self.alu_dec(value);
        self.write_r8(bus, y, result);
        if y == 6 {
            12
        } else {
            4
        }
    }

    /// RLCA, RRCA, RLA, RRA: like their CB forms but Z is always cleared.
    pub(super) fn exec_rotate_a(&mut self, y: u8) -> u32 {
        self.regs.a = self.alu_shift(y, self.regs.a);
        self.regs.set_flag(Flag::Z, false);
        4
    }

    pub(super) fn exec_daa(&mut self) -> u32 {
        self.alu_daa();
        4
    }

    pub(super) fn exec_cpl(&mut self) -> u32 {
        self.regs.a = !self.regs.a;
        self.regs.set_flag(Flag::N, true);
        self.regs.set_flag(Flag::H, true);
        4
    }

    pub(super) fn exec_scf(&mut self) -> u32 {
        self.regs.set_flag(Flag::N, false);
        self.regs.set_flag(Flag::H, false);
        self.regs.set_flag(Flag::C, true);
        4
    }

    pub(super) fn exec_ccf(&mut self) -> u32 {
        let carry = self.regs.flag(Flag::C);
        self.regs.set_flag(Flag::N, false);
        self.regs.set_flag(Flag::H, false);
        self.regs.set_flag(Flag::C, !carry);
        4
    }

    pub(super) fn exec_alu_r<B: Bus>(&mut self, bus: &mut B, y: u8, z: u8) -> u32 {
        let value = self.read_r8(bus, z);
        self.alu(y, value);
        if z == 6 {
            8
        } else {
            4
        }
    }

    pub(super) fn exec_alu_d8<B: Bus>(&mut self, bus: &mut B, y: u8) -> u32 {
        let value = self.fetch8(bus);
        self.alu(y, value);
        8
    }

    pub(super) fn exec_add_sp_e8<B: Bus>(&mut self, bus: &mut B) -> u32 {
        let offset = self.fetch8(bus);
        self.regs.sp = self.alu_sp_offset(offset);
        16
    }
}
