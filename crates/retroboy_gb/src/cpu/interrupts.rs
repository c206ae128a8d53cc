use super::{Bus, Cpu};
use crate::interrupts::Interrupts;

/// Cost of an interrupt dispatch: two idle M-cycles, the PC push and the jump.
const DISPATCH_CYCLES: u32 = 20;

impl Cpu {
    /// `IE & IF`, limited to the five real sources.
    pub(super) fn pending_interrupts<B: Bus>(&self, bus: &mut B) -> Interrupts {
        Interrupts::from_bits_truncate(bus.read8(0xFFFF) & bus.read8(0xFF0F))
    }

    pub(super) fn service_interrupt<B: Bus>(&mut self, bus: &mut B, pending: Interrupts) -> u32 {
        let Some(irq) = pending.highest_priority() else {
            return 0;
        };
        self.ime = false;
        self.ei_delay = 0;

        let pc = self.regs.pc;
        self.push16(bus, pc);
        let flags = bus.read8(0xFF0F);
        bus.write8(0xFF0F, flags & !irq.bits());
        self.regs.pc = irq.vector();

        log::debug!(
            "interrupt {:?}: vector=0x{:04X} from pc=0x{:04X} sp=0x{:04X}",
            irq,
            self.regs.pc,
            pc,
            self.regs.sp,
        );
        DISPATCH_CYCLES
    }

    /// Counts down a pending EI after each executed instruction.
    #[inline]
    pub(super) fn advance_ei_delay(&mut self) {
        if self.ei_delay > 0 {
            self.ei_delay -= 1;
            if self.ei_delay == 0 {
                self.ime = true;
            }
        }
    }
}
