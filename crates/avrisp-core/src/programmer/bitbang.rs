//! Bitbang ISP helpers
//!
//! Programmers that drive SCK/MOSI/MISO from software-controlled GPIO pins
//! implement [`BitbangIsp`] and use [`transfer`] to build their
//! [`IspLink`](super::IspLink) implementation.
//!
//! ## Timing
//!
//! The target samples MOSI on the rising edge of SCK and shifts MISO out on
//! the falling edge. Each clock level is held for [`BitbangIsp::bit_delay`];
//! serial programming needs SCK high and low phases longer than two target
//! clock cycles, so the margin must be generous for slow-clocked parts.

/// Trait for low-level bitbang ISP operations
pub trait BitbangIsp {
    /// Set clock line value
    fn set_sck(&mut self, high: bool);

    /// Set MOSI line value
    fn set_mosi(&mut self, high: bool);

    /// Get MISO line value
    fn get_miso(&self) -> bool;

    /// Hold the current clock level long enough for the target to sample it
    fn bit_delay(&self);
}

/// Exchange one byte, MSB first
///
/// For each bit the outgoing bit is put on MOSI, SCK is raised, the level is
/// held, MISO is sampled, and SCK is lowered again with an equal hold.
pub fn transfer<P: BitbangIsp + ?Sized>(pins: &mut P, byte: u8) -> u8 {
    let mut result = 0u8;
    for i in (0..8).rev() {
        pins.set_mosi((byte >> i) & 1 != 0);
        pins.set_sck(true);
        pins.bit_delay();
        result <<= 1;
        if pins.get_miso() {
            result |= 1;
        }
        pins.set_sck(false);
        pins.bit_delay();
    }
    result
}
