use crate::cpu::{Bus, Cpu};

impl Cpu {
    pub(super) fn exec_ld_rp_d16<B: Bus>(&mut self, bus: &mut B, p: u8) -> u32 {
        let value = self.fetch16(bus);
        self.write_rp(p, value);
        12
    }

    /// Address for the (BC), (DE), (HL+), (HL-) forms, applying the HL
    /// post-increment or post-decrement.
    fn indirect_addr(&mut self, p: u8) -> u16 {
        match p {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => {
                let hl = self.regs.hl();
                self.regs.set_hl(hl.wrapping_add(1));
                hl
            }
            _ => {
                let hl = self.regs.hl();
                self.regs.set_hl(hl.wrapping_sub(1));
                hl
            }
        }
    }

    pub(super) fn exec_ld_indirect_a<B: Bus>(&mut self, bus: &mut B, p: u8) -> u32 {
        let addr = self.indirect_addr(p);
        bus.write8(addr, self.regs.a);
        8
    }

    pub(super) fn exec_ld_a_indirect<B: Bus>(&mut self, bus: &mut B, p: u8) -> u32 {
        let addr = self.indirect_addr(p);
        self.regs.a = bus.read8(addr);
        8
    }

    pub(super) fn exec_ld_r_d8<B: Bus>(&mut self, bus: &mut B, y: u8) -> u32 {
        let value = self.fetch8(bus);
        self.write_r8(bus, y, value);
        if y == 6 {
            12
        } else {
            8
        }
    }

    pub(super) fn exec_ld_r_r<B: Bus>(&mut self, bus: &mut B, y: u8, z: u8) -> u32 {
        debug_assert!(!(y == 6 && z == 6), "0x76 is HALT");
        let value = self.read_r8(bus, z);
        self.write_r8(bus, y, value);
        if y == 6 || z == 6 {
            8
        } else {
            4
        }
    }

    pub(super) fn exec_ld_a16_sp<B: Bus>(&mut self, bus: &mut B) -> u32 {
        let addr = self.fetch16(bus);
        bus.write16(addr, self.regs.sp);
        20
    }

    /// LDH (a8),A and LDH A,(a8).
    pub(super) fn exec_ldh_a8<B: Bus>(&mut self, bus: &mut B, load_a: bool) -> u32 {
        let addr = 0xFF00 | self.fetch8(bus) as u16;
        if load_a {
            self.regs.a = bus.read8(addr);
        } else {
            bus.write8(addr, self.regs.a);
        }
        12
    }

    /// LD (C),A and LD A,(C).
    pub(super) fn exec_ldh_c<B: Bus>(&mut self, bus: &mut B, load_a: bool) -> u32 {
        let addr = 0xFF00 | self.regs.c as u16;
        if load_a {
            self.regs.a = bus.read8(addr);
        } else {
            bus.write8(addr, self.regs.a);
        }
        8
    }

    pub(super) fn exec_ld_a16_a<B: Bus>(&mut self, bus: &mut B, load_a: bool) -> u32 {
        let addr = self.fetch16(bus);
        if load_a {
            self.regs.a = bus.read8(addr);
        } else {
            bus.write8(addr, self.regs.a);
        }
        16
    }

    pub(super) fn exec_ld_hl_sp_e8<B: Bus>(&mut self, bus: &mut B) -> u32 {
        let offset = self.fetch8(bus);
        let value = self.alu_sp_offset(offset);
        self.regs.set_hl(value);
        12
    }
}
