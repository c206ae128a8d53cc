use super::{Bus, Cpu, Flag};

impl Cpu {
    /// CB-prefixed table: rotates/shifts, BIT, RES and SET.
    ///
    /// Register forms take 8 cycles. On (HL), BIT takes 12 and the
    /// read-modify-write forms take 16.
    pub(super) fn execute_cb<B: Bus>(&mut self, bus: &mut B) -> u32 {
        let opcode = self.fetch8(bus);
        let x = opcode >> 6;
        let y = (opcode >> 3) & 0x07;
        let z = opcode & 0x07;
        let value = self.read_r8(bus, z);

        let result = match x {
            0 => self.alu_shift(y, value),
            1 => {
                self.regs.set_flag(Flag::Z, value & (1 << y) == 0);
                self.regs.set_flag(Flag::N, false);
                self.regs.set_flag(Flag::H, true);
                return if z == 6 { 12 } else { 8 };
            }
            2 => value & !(1 << y),
            _ => value | (1 << y),
        };

        self.write_r8(bus, z, result);
        if z == 6 {
            16
        } else {
            8
        }
    }
}
