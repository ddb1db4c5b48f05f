//! Memory geometry and device identification for the supported parts

use core::fmt;

/// Flash capacity in bytes
pub const FLASH_SIZE: usize = 32 * 1024;
/// Flash page size in bytes (64 words)
pub const FLASH_PAGE_SIZE: usize = 128;
/// Flash page size in 16-bit words
pub const FLASH_PAGE_WORDS: usize = FLASH_PAGE_SIZE / 2;
/// EEPROM capacity in bytes
pub const EEPROM_SIZE: usize = 1024;
/// EEPROM page size in bytes
pub const EEPROM_PAGE_SIZE: usize = 4;
/// Largest page size of any region
pub const MAX_PAGE_SIZE: usize = FLASH_PAGE_SIZE;
/// Value of an erased flash or EEPROM cell
pub const ERASED_VALUE: u8 = 0xFF;

/// Non-volatile memory region of the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryRegion {
    /// Program memory (word organised, page written)
    Flash,
    /// Data EEPROM
    Eeprom,
}

impl MemoryRegion {
    /// Capacity of the region in bytes
    pub const fn size(self) -> usize {
        match self {
            Self::Flash => FLASH_SIZE,
            Self::Eeprom => EEPROM_SIZE,
        }
    }

    /// Page size of the region in bytes
    pub const fn page_size(self) -> usize {
        match self {
            Self::Flash => FLASH_PAGE_SIZE,
            Self::Eeprom => EEPROM_PAGE_SIZE,
        }
    }

    /// Base address of the page containing `addr`
    pub const fn page_base(self, addr: u16) -> u16 {
        addr - (addr % self.page_size() as u16)
    }

    /// Check that `len` bytes starting at `addr` fit inside the region
    pub fn contains(self, addr: u32, len: usize) -> bool {
        (addr as u64) + (len as u64) <= self.size() as u64
    }

    /// Short lowercase name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Flash => "flash",
            Self::Eeprom => "eeprom",
        }
    }
}

impl fmt::Display for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A supported part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Part {
    /// Marketing name
    pub name: &'static str,
    /// Signature bytes as read with the `0x30` frame
    pub signature: [u8; 3],
}

/// Parts sharing the 32 KiB / 1 KiB geometry above
pub const SUPPORTED_PARTS: &[Part] = &[
    Part {
        name: "ATmega328P",
        signature: [0x1E, 0x95, 0x0F],
    },
    Part {
        name: "ATmega328",
        signature: [0x1E, 0x95, 0x14],
    },
];

/// Three signature bytes identifying the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceSignature(pub [u8; 3]);

impl DeviceSignature {
    /// Look up the part for this signature
    pub fn part(&self) -> Option<&'static Part> {
        SUPPORTED_PARTS.iter().find(|p| p.signature == self.0)
    }

    /// Whether this signature belongs to a supported part
    pub fn is_supported(&self) -> bool {
        self.part().is_some()
    }

    /// Name of the part, or "unknown"
    pub fn part_name(&self) -> &'static str {
        self.part().map(|p| p.name).unwrap_or("unknown")
    }
}

impl fmt::Display for DeviceSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X} {:02X} {:02X} ({})",
            self.0[0],
            self.0[1],
            self.0[2],
            self.part_name()
        )
    }
}
