use super::Timer;

impl Timer {
    pub(crate) fn read_div(&self) -> u8 {
        (self.counter >> 8) as u8
    }

    /// Any write clears the counter; a falling input edge caused by the
    /// reset still ticks TIMA.
    pub(crate) fn write_div(&mut self) {
        let before = self.input();
        self.counter = 0;
        if before && !self.input() {
            self.increment_tima();
        }
    }

    pub(crate) fn read_tima(&self) -> u8 {
        self.tima
    }

    /// Writing TIMA while a reload is pending cancels the reload and the
    /// interrupt.
    pub(crate) fn write_tima(&mut self, value: u8) {
        self.tima = value;
        self.reload_delay = 0;
    }

    pub(crate) fn read_tma(&self) -> u8 {
        self.tma
    }

    pub(crate) fn write_tma(&mut self, value: u8) {
        self.tma = value;
    }

    pub(crate) fn read_tac(&self) -> u8 {
        self.tac | 0b1111_1000
    }

    /// Disabling the timer or switching the clock source while the input
    /// line is high produces one extra TIMA increment.
    pub(crate) fn write_tac(&mut self, value: u8) {
        let before = self.input();
        self.tac = value & 0x07;
        if before && !self.input() {
            self.increment_tima();
        }
    }
}
