//! Fuse and lock bytes

use bitflags::bitflags;

use super::types::FLASH_SIZE;

/// One of the four configuration bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FuseKind {
    /// Lock bits
    Lock,
    /// Low fuse byte
    Low,
    /// High fuse byte
    High,
    /// Extended fuse byte
    Extended,
}

impl FuseKind {
    /// All kinds, in the order they are restored
    pub const ALL: [FuseKind; 4] = [Self::Low, Self::High, Self::Extended, Self::Lock];

    /// Short name used in logs
    pub const fn name(self) -> &'static str {
        match self {
            Self::Lock => "lock",
            Self::Low => "low",
            Self::High => "high",
            Self::Extended => "extended",
        }
    }
}

/// Values of all four configuration bytes
///
/// Every field is read and written on its own; setting one never touches
/// the others.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FuseSet {
    /// Lock bits
    pub lock: u8,
    /// Low fuse
    pub low: u8,
    /// High fuse
    pub high: u8,
    /// Extended fuse
    pub extended: u8,
}

impl FuseSet {
    /// Get the value of one byte
    pub const fn get(&self, kind: FuseKind) -> u8 {
        match kind {
            FuseKind::Lock => self.lock,
            FuseKind::Low => self.low,
            FuseKind::High => self.high,
            FuseKind::Extended => self.extended,
        }
    }

    /// Set the value of one byte
    pub fn set(&mut self, kind: FuseKind, value: u8) {
        match kind {
            FuseKind::Lock => self.lock = value,
            FuseKind::Low => self.low = value,
            FuseKind::High => self.high = value,
            FuseKind::Extended => self.extended = value,
        }
    }
}

bitflags! {
    /// High fuse bits
    ///
    /// A programmed fuse reads as 0, so "set" here means "unprogrammed".
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HighFuse: u8 {
        /// Reset vector points at the application (unprogrammed)
        const BOOTRST  = 1 << 0;
        /// Boot section size, bit 0
        const BOOTSZ0  = 1 << 1;
        /// Boot section size, bit 1
        const BOOTSZ1  = 1 << 2;
        /// EEPROM is erased by chip erase (unprogrammed)
        const EESAVE   = 1 << 3;
        /// Watchdog not forced on (unprogrammed)
        const WDTON    = 1 << 4;
        /// Serial programming disabled (unprogrammed)
        const SPIEN    = 1 << 5;
        /// debugWIRE disabled (unprogrammed)
        const DWEN     = 1 << 6;
        /// External reset enabled (unprogrammed)
        const RSTDISBL = 1 << 7;

        /// Both boot size bits
        const BOOTSZ = Self::BOOTSZ0.bits() | Self::BOOTSZ1.bits();
    }
}

impl HighFuse {
    /// Boot section size in bytes selected by BOOTSZ1:0
    pub fn boot_section_bytes(self) -> usize {
        let words = match (self & Self::BOOTSZ).bits() >> 1 {
            0b11 => 256,
            0b10 => 512,
            0b01 => 1024,
            _ => 2048,
        };
        words * 2
    }

    /// Whether chip erase preserves the EEPROM
    pub fn eeprom_preserved(self) -> bool {
        !self.contains(Self::EESAVE)
    }
}

/// End of the application section for a given high fuse
///
/// Flash dumps stop here: the boot section is not part of the firmware.
pub fn application_end(high_fuse: u8) -> usize {
    FLASH_SIZE - HighFuse::from_bits_retain(high_fuse).boot_section_bytes()
}
