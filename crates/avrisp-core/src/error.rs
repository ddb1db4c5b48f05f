//! Error types for avrisp-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

use crate::chip::MemoryRegion;
use crate::hex::RecordType;

/// Why a HEX line failed to decode
///
/// The variants follow the order in which a line is checked, so the first
/// problem found is the one reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Line is shorter than the smallest possible record
    TooShort,
    /// Line does not start with `:`
    WrongStart,
    /// Byte count is not hex or exceeds the line capacity
    WrongLength,
    /// Address high byte is not hex
    WrongAddressHigh,
    /// Address low byte is not hex
    WrongAddressLow,
    /// Record type is not hex or not a known type
    WrongType,
    /// A data byte is not hex
    WrongData,
    /// Checksum is not hex or does not match
    WrongChecksum,
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Link errors
    /// Target did not echo the programming-enable probe after all retries
    SyncFailed,
    /// A command was issued before programming mode was entered
    NotSynchronized,
    /// A flash page write was attempted before a chip erase
    NotErased,
    /// Target stayed busy longer than the ready timeout
    Timeout,
    /// Signature does not belong to a supported part
    UnsupportedSignature([u8; 3]),

    // HEX input errors
    /// A HEX line failed to decode
    Parse {
        /// 1-based line number
        line: u32,
        /// What was wrong with it
        kind: ParseError,
    },
    /// Record type is valid HEX but not handled by this pass
    UnexpectedType {
        /// 1-based line number
        line: u32,
        /// Type found
        record_type: RecordType,
    },
    /// End or extended address record with unexpected length or address
    MalformedRecord {
        /// 1-based line number
        line: u32,
    },
    /// Input ended before an end-of-file record
    UnexpectedEof,
    /// Fuse file does not follow the `LB:XX` / `L:XX;H:XX;E:XX` layout
    FuseFormat,

    // Memory errors
    /// Readback after a write did not match
    Verify {
        /// Region that was written
        region: MemoryRegion,
        /// Address of the first mismatching byte
        addr: u16,
        /// Byte that was written
        expected: u8,
        /// Byte that was read back
        found: u8,
    },
    /// Access outside the capacity of the region
    AddressOutOfRange {
        /// Region that was addressed
        region: MemoryRegion,
        /// First address of the access
        addr: u32,
        /// Length of the access
        len: usize,
    },

    // Resource errors
    /// A working buffer is too small for the data offered
    Resource,
    /// Named file does not exist
    NotFound,
    /// Storage read or write failed
    Io,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort => write!(f, "HEX line too short"),
            Self::WrongStart => write!(f, "HEX line has wrong start"),
            Self::WrongLength => write!(f, "HEX line has wrong length"),
            Self::WrongAddressHigh | Self::WrongAddressLow => {
                write!(f, "HEX line has wrong address")
            }
            Self::WrongType => write!(f, "HEX line has wrong type"),
            Self::WrongData => write!(f, "HEX line has wrong data"),
            Self::WrongChecksum => write!(f, "HEX line has wrong checksum"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SyncFailed => write!(f, "target did not enter programming mode"),
            Self::NotSynchronized => write!(f, "programming mode not entered"),
            Self::NotErased => write!(f, "flash must be erased before a page write"),
            Self::Timeout => write!(f, "target stayed busy too long"),
            Self::UnsupportedSignature(sig) => write!(
                f,
                "unexpected AVR signature {:02X} {:02X} {:02X}",
                sig[0], sig[1], sig[2]
            ),
            Self::Parse { line, kind } => write!(f, "line {}: {}", line, kind),
            Self::UnexpectedType { line, record_type } => {
                write!(f, "line {}: unexpected record type {:?}", line, record_type)
            }
            Self::MalformedRecord { line } => write!(f, "line {}: malformed record", line),
            Self::UnexpectedEof => write!(f, "HEX input ended without end record"),
            Self::FuseFormat => write!(f, "fuse file has wrong format"),
            Self::Verify {
                region,
                addr,
                expected,
                found,
            } => write!(
                f,
                "{} verify failed at 0x{:04X}: expected 0x{:02X}, found 0x{:02X}",
                region, addr, expected, found
            ),
            Self::AddressOutOfRange { region, addr, len } => write!(
                f,
                "{} access 0x{:04X}+{} out of range",
                region, addr, len
            ),
            Self::Resource => write!(f, "buffer too small"),
            Self::NotFound => write!(f, "file not found"),
            Self::Io => write!(f, "I/O error"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseError {}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
