use serde::{Deserialize, Serialize};

use crate::interrupts::Interrupts;

/// T-cycles per bit with the internal 8192 Hz shift clock.
const CYCLES_PER_BIT: u32 = 512;

/// Serial port (SB/SC) with no link partner attached.
///
/// An internally clocked transfer shifts eight bits out over 4096 T-cycles,
/// shifting in 1s from the open line, then raises the serial interrupt.
/// Bytes sent are kept in `output` since test ROMs print through the port.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Serial {
    sb: u8,
    sc: u8,
    /// Bits still to shift in the active transfer.
    bits_remaining: u8,
    /// Cycles until the next bit shifts.
    bit_timer: u32,
    #[serde(skip)]
    pub(crate) output: Vec<u8>,
}

impl Serial {
    pub(crate) fn read_sb(&self) -> u8 {
        self.sb
    }

    pub(crate) fn write_sb(&mut self, value: u8) {
        self.sb = value;
    }

    pub(crate) fn read_sc(&self) -> u8 {
        self.sc | 0x7E
    }

    pub(crate) fn write_sc(&mut self, value: u8) {
        self.sc = value & 0x81;
        // Start bit with the internal clock selected.
        if (self.sc & 0x81) == 0x81 {
            self.output.push(self.sb);
            self.bits_remaining = 8;
            self.bit_timer = CYCLES_PER_BIT;
        } else {
            self.bits_remaining = 0;
        }
    }

    pub(crate) fn tick(&mut self, cycles: u32, requests: &mut Interrupts) {
        if self.bits_remaining == 0 {
            return;
        }
        let mut cycles = cycles;
        while cycles > 0 && self.bits_remaining > 0 {
            let step = cycles.min(self.bit_timer);
            cycles -= step;
            self.bit_timer -= step;
            if self.bit_timer == 0 {
                self.sb = (self.sb << 1) | 0x01;
                self.bits_remaining -= 1;
                self.bit_timer = CYCLES_PER_BIT;
                if self.bits_remaining == 0 {
                    self.sc &= !0x80;
                    requests.insert(Interrupts::SERIAL);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_transfer_completes_after_eight_bits() {
        let mut serial = Serial::default();
        serial.write_sb(b'A');
        serial.write_sc(0x81);
        assert_eq!(serial.output, b"A");

        let mut req = Interrupts::empty();
        serial.tick(CYCLES_PER_BIT * 8 - 1, &mut req);
        assert!(req.is_empty());
        assert_eq!(serial.read_sc() & 0x80, 0x80);

        serial.tick(1, &mut req);
        assert_eq!(req, Interrupts::SERIAL);
        assert_eq!(serial.read_sc(), 0x7F);
        assert_eq!(serial.read_sb(), 0xFF);
    }

    #[test]
    fn external_clock_never_completes() {
        let mut serial = Serial::default();
        serial.write_sc(0x80);
        let mut req = Interrupts::empty();
        serial.tick(100_000, &mut req);
        assert!(req.is_empty());
        assert!(serial.output.is_empty());
    }
}
