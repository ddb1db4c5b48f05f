//! Programmer trait definitions

/// How long reset is released by [`IspLink::reset_pulse`], in milliseconds
pub const RESET_PULSE_MS: u32 = 1;

/// Byte-level link to the target
///
/// A link clocks bytes in and out over SCK/MOSI/MISO and owns the target's
/// RESET line. Transfers cannot fail: a broken wire only produces wrong
/// bits, which the protocol layer detects through its echo checks.
///
/// RESET is active low on the target. `set_reset(true)` pulls the line low
/// and holds the target in reset, which is what enables serial programming.
pub trait IspLink {
    /// Exchange one byte, MSB first, and return the byte clocked in
    fn transfer(&mut self, byte: u8) -> u8;

    /// Hold (`true`) or release (`false`) the target in reset
    fn set_reset(&mut self, asserted: bool);

    /// Sleep for at least `ms` milliseconds
    fn delay_ms(&mut self, ms: u32);

    /// Release reset briefly and assert it again
    ///
    /// Forces the target back to a known state before the next
    /// programming-enable attempt.
    fn reset_pulse(&mut self) {
        self.set_reset(false);
        self.delay_ms(RESET_PULSE_MS);
        self.set_reset(true);
    }

    /// Return all lines to an inert, high-impedance state
    fn release(&mut self) {}
}

impl<L: IspLink + ?Sized> IspLink for &mut L {
    fn transfer(&mut self, byte: u8) -> u8 {
        (**self).transfer(byte)
    }

    fn set_reset(&mut self, asserted: bool) {
        (**self).set_reset(asserted)
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }

    fn reset_pulse(&mut self) {
        (**self).reset_pulse()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

#[cfg(feature = "alloc")]
impl<L: IspLink + ?Sized> IspLink for alloc::boxed::Box<L> {
    fn transfer(&mut self, byte: u8) -> u8 {
        (**self).transfer(byte)
    }

    fn set_reset(&mut self, asserted: bool) {
        (**self).set_reset(asserted)
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }

    fn reset_pulse(&mut self) {
        (**self).reset_pulse()
    }

    fn release(&mut self) {
        (**self).release()
    }
}
