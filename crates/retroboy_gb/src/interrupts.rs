use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Interrupt sources as laid out in IF (0xFF0F) and IE (0xFFFF).
    ///
    /// Bit order is also service priority: the lowest set bit wins.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Interrupts: u8 {
        const VBLANK = 1 << 0;
        const LCD_STAT = 1 << 1;
        const TIMER = 1 << 2;
        const SERIAL = 1 << 3;
        const JOYPAD = 1 << 4;
    }
}

impl Interrupts {
    /// Jump target used when servicing the given single interrupt bit.
    pub fn vector(self) -> u16 {
        0x0040 + (self.bits().trailing_zeros() as u16) * 8
    }

    /// The interrupt that would be serviced first out of this set.
    pub fn highest_priority(self) -> Option<Interrupts> {
        if self.is_empty() {
            None
        } else {
            Interrupts::from_bits(1 << self.bits().trailing_zeros())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vectors_follow_bit_order() {
        assert_eq!(Interrupts::VBLANK.vector(), 0x40);
        assert_eq!(Interrupts::LCD_STAT.vector(), 0x48);
        assert_eq!(Interrupts::TIMER.vector(), 0x50);
        assert_eq!(Interrupts::SERIAL.vector(), 0x58);
        assert_eq!(Interrupts::JOYPAD.vector(), 0x60);
    }

    #[test]
    fn priority_picks_lowest_bit() {
        let set = Interrupts::JOYPAD | Interrupts::TIMER | Interrupts::LCD_STAT;
        assert_eq!(set.highest_priority(), Some(Interrupts::LCD_STAT));
        assert_eq!(Interrupts::empty().highest_priority(), None);
    }
}
