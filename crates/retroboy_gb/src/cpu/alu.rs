use super::{Cpu, Flag};

impl Cpu {
    /// The eight accumulator operations selected by opcode bits 3-5:
    /// ADD, ADC, SUB, SBC, AND, XOR, OR, CP.
    pub(super) fn alu(&mut self, op: u8, value: u8) {
        match op & 0x07 {
            0 => self.alu_add(value, false),
            1 => self.alu_add(value, true),
            2 => self.regs.a = self.alu_sub(value, false),
            3 => self.regs.a = self.alu_sub(value, true),
            4 => {
                self.regs.a &= value;
                self.regs.set_flags(self.regs.a == 0, false, true, false);
            }
            5 => {
                self.regs.a ^= value;
                self.regs.set_flags(self.regs.a == 0, false, false, false);
            }
            6 => {
                self.regs.a |= value;
                self.regs.set_flags(self.regs.a == 0, false, false, false);
            }
            _ => {
                // CP discards the difference.
                self.alu_sub(value, false);
            }
        }
    }

    fn alu_add(&mut self, value: u8, with_carry: bool) {
        let a = self.regs.a;
        let carry = (with_carry && self.regs.flag(Flag::C)) as u8;
        let sum = a as u16 + value as u16 + carry as u16;
        let half = (a & 0x0F) + (value & 0x0F) + carry > 0x0F;
        self.regs.a = sum as u8;
        self.regs.set_flags(sum as u8 == 0, false, half, sum > 0xFF);
    }

    fn alu_sub(&mut self, value: u8, with_carry: bool) -> u8 {
        let a = self.regs.a;
        let carry = (with_carry && self.regs.flag(Flag::C)) as u8;
        let result = a.wrapping_sub(value).wrapping_sub(carry);
        let half = (a & 0x0F) < (value & 0x0F) + carry;
        let borrow = (a as u16) < value as u16 + carry as u16;
        self.regs.set_flags(result == 0, true, half, borrow);
        result
    }

    /// INC r: C is preserved.
    pub(super) fn alu_inc(&mut self, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        self.regs.set_flag(Flag::Z, result == 0);
        self.regs.set_flag(Flag::N, false);
        self.regs.set_flag(Flag::H, value & 0x0F == 0x0F);
        result
    }

    /// DEC r: C is preserved.
    pub(super) fn alu_dec(&mut self, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        self.regs.set_flag(Flag::Z, result == 0);
        self.regs.set_flag(Flag::N, true);
        self.regs.set_flag(Flag::H, value & 0x0F == 0);
        result
    }

    /// ADD HL,rr: Z is preserved, H and C come from bits 11 and 15.
    pub(super) fn alu_add_hl(&mut self, value: u16) {
        let hl = self.regs.hl();
        self.regs.set_flag(Flag::N, false);
        self.regs.set_flag(Flag::H, (hl & 0x0FFF) + (value & 0x0FFF) > 0x0FFF);
        self.regs.set_flag(Flag::C, hl as u32 + value as u32 > 0xFFFF);
        self.regs.set_hl(hl.wrapping_add(value));
    }

    /// SP plus a signed immediate, shared by ADD SP,e8 and LD HL,SP+e8.
    /// Flags come from the unsigned low-byte addition.
    pub(super) fn alu_sp_offset(&mut self, offset: u8) -> u16 {
        let sp = self.regs.sp;
        let half = (sp & 0x000F) + (offset as u16 & 0x000F) > 0x000F;
        let carry = (sp & 0x00FF) + offset as u16 > 0x00FF;
        self.regs.set_flags(false, false, half, carry);
        sp.wrapping_add(offset as i8 as u16)
    }

    pub(super) fn alu_daa(&mut self) {
        let mut a = self.regs.a;
        let mut carry = self.regs.flag(Flag::C);
        if self.regs.flag(Flag::N) {
            if carry {
                a = a.wrapping_sub(0x60);
            }
            if self.regs.flag(Flag::H) {
                a = a.wrapping_sub(0x06);
            }
        } else {
            if carry || a > 0x99 {
                a = a.wrapping_add(0x60);
                carry = true;
            }
            if self.regs.flag(Flag::H) || a & 0x0F > 0x09 {
                a = a.wrapping_add(0x06);
            }
        }
        self.regs.a = a;
        self.regs.set_flag(Flag::Z, a == 0);
        self.regs.set_flag(Flag::H, false);
        self.regs.set_flag(Flag::C, carry);
    }

    /// Rotates and shifts shared by the CB table (`op` = bits 3-5) and the
    /// accumulator forms RLCA/RRCA/RLA/RRA.
    pub(super) fn alu_shift(&mut self, op: u8, value: u8) -> u8 {
        let carry_in = self.regs.flag(Flag::C) as u8;
        let (result, carry) = match op & 0x07 {
            0 => (value.rotate_left(1), value & 0x80 != 0),
            1 => (value.rotate_right(1), value & 0x01 != 0),
            2 => ((value << 1) | carry_in, value & 0x80 != 0),
            3 => ((value >> 1) | (carry_in << 7), value & 0x01 != 0),
            4 => (value << 1, value & 0x80 != 0),
            5 => ((value >> 1) | (value & 0x80), value & 0x01 != 0),
            6 => (value.rotate_left(4), false),
            _ => (value >> 1, value & 0x01 != 0),
        };
        self.regs.set_flags(result == 0, false, false, carry);
        result
    }
}
