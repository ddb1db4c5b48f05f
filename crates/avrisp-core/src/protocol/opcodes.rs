//! Serial programming instruction set
//!
//! Every instruction is a 4-byte frame. The reply is whatever the target
//! shifts out during the 4th byte; during bytes 2 and 3 it echoes the byte
//! received before, which is how programming-enable is checked.

// ============================================================================
// Programming control
// ============================================================================

/// First byte of programming-enable, chip-erase and fuse/lock writes
pub const WRITE_CONTROL: u8 = 0xAC;
/// Second byte of programming-enable; echoed back during the 3rd byte
pub const PROGRAMMING_ENABLE: u8 = 0x53;
/// Second byte of chip erase
pub const CHIP_ERASE: u8 = 0x80;
/// Poll RDY/BSY
pub const POLL_READY: u8 = 0xF0;
/// Busy flag in the poll reply
pub const BUSY_BIT: u8 = 0x01;

// ============================================================================
// Identification and configuration
// ============================================================================

/// Read signature byte (index in byte 3)
pub const READ_SIGNATURE: u8 = 0x30;
/// Read lock bits
pub const READ_LOCK: [u8; 2] = [0x58, 0x00];
/// Read low fuse
pub const READ_FUSE_LOW: [u8; 2] = [0x50, 0x00];
/// Read high fuse
pub const READ_FUSE_HIGH: [u8; 2] = [0x58, 0x08];
/// Read extended fuse
pub const READ_FUSE_EXTENDED: [u8; 2] = [0x50, 0x08];
/// Write lock bits (second byte, after [`WRITE_CONTROL`])
pub const WRITE_LOCK: u8 = 0xE0;
/// Write low fuse (second byte, after [`WRITE_CONTROL`])
pub const WRITE_FUSE_LOW: u8 = 0xA0;
/// Write high fuse (second byte, after [`WRITE_CONTROL`])
pub const WRITE_FUSE_HIGH: u8 = 0xA8;
/// Write extended fuse (second byte, after [`WRITE_CONTROL`])
pub const WRITE_FUSE_EXTENDED: u8 = 0xA4;

// ============================================================================
// EEPROM
// ============================================================================

/// Read EEPROM byte
pub const READ_EEPROM: u8 = 0xA0;
/// Write EEPROM byte
pub const WRITE_EEPROM: u8 = 0xC0;
/// Load EEPROM page buffer byte
pub const LOAD_EEPROM_PAGE: u8 = 0xC1;
/// Write EEPROM page
pub const WRITE_EEPROM_PAGE: u8 = 0xC2;

// ============================================================================
// Flash
// ============================================================================

/// Read flash low byte
pub const READ_FLASH_LOW: u8 = 0x20;
/// Read flash high byte
pub const READ_FLASH_HIGH: u8 = 0x28;
/// Load flash page buffer low byte
pub const LOAD_FLASH_LOW: u8 = 0x40;
/// Load flash page buffer high byte
pub const LOAD_FLASH_HIGH: u8 = 0x48;
/// Write flash page
pub const WRITE_FLASH_PAGE: u8 = 0x4C;
/// Load extended address byte
pub const LOAD_EXTENDED_ADDRESS: u8 = 0x4D;
