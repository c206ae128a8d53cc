use crate::cpu::{Bus, Cpu};

impl Cpu {
    /// JR e8 / JR cc,e8. The offset is relative to the next instruction.
    pub(super) fn exec_jr<B: Bus>(&mut self, bus: &mut B, taken: bool) -> u32 {
        let offset = self.fetch8(bus) as i8;
        if taken {
            self.regs.pc = self.regs.pc.wrapping_add(offset as u16);
            12
        } else {
            8
        }
    }

    pub(super) fn exec_jp<B: Bus>(&mut self, bus: &mut B, taken: bool) -> u32 {
        let addr = self.fetch16(bus);
        if taken {
            self.regs.pc = addr;
            16
        } else {
            12
        }
    }
}
