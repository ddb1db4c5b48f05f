//! Programming, dump and fuse passes
//!
//! Each pass runs to completion or stops at the first error. Records are
//! handled strictly in the order they are decoded, and a page is always
//! written before its buffer is reopened at another base.

mod dump;
mod fuses;
mod program;
mod session;

pub use dump::{dump_eeprom, dump_flash, dump_region};
pub use fuses::{backup_fuses, parse_fuse_text, restore_fuses, write_fuse_text};
pub use program::{program_eeprom, program_flash};
pub use session::{
    run_session, SessionOptions, SessionReport, EEPROM_BACKUP, EEPROM_INPUT, FIRMWARE_BACKUP,
    FIRMWARE_INPUT, FUSES_BACKUP, FUSES_INPUT,
};

use crate::chip::MemoryRegion;

/// Statistics from one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Number of HEX records consumed
    pub records: usize,
    /// Number of pages committed
    pub pages_written: usize,
    /// Number of bytes written to the target
    pub bytes_written: usize,
    /// Number of HEX lines emitted by a dump
    pub lines_emitted: usize,
}

/// Progress callback for passes
pub trait PassProgress {
    /// Called before the chip is erased
    fn erasing(&mut self);

    /// Called when a programming pass starts
    fn programming(&mut self, region: MemoryRegion);

    /// Called when a dump starts, with the number of bytes to read
    fn dumping(&mut self, region: MemoryRegion, total: usize);

    /// Called with the address reached so far
    fn progress(&mut self, address: usize);

    /// Called when the pass is complete
    fn complete(&mut self, stats: &PassStats);
}

/// A no-op progress reporter
pub struct NoProgress;

impl PassProgress for NoProgress {
    fn erasing(&mut self) {}
    fn programming(&mut self, _region: MemoryRegion) {}
    fn dumping(&mut self, _region: MemoryRegion, _total: usize) {}
    fn progress(&mut self, _address: usize) {}
    fn complete(&mut self, _stats: &PassStats) {}
}

impl<P: PassProgress + ?Sized> PassProgress for &mut P {
    fn erasing(&mut self) {
        (**self).erasing()
    }
    fn programming(&mut self, region: MemoryRegion) {
        (**self).programming(region)
    }
    fn dumping(&mut self, region: MemoryRegion, total: usize) {
        (**self).dumping(region, total)
    }
    fn progress(&mut self, address: usize) {
        (**self).progress(address)
    }
    fn complete(&mut self, stats: &PassStats) {
        (**self).complete(stats)
    }
}
