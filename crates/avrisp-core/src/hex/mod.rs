//! Intel HEX codec
//!
//! Decodes and encodes single records of the form `:LLAAAATTDD..DDCC`,
//! where `LL` is the byte count, `AAAA` the big-endian 16-bit address, `TT`
//! the record type, `DD..DD` the data and `CC` the two's-complement checksum
//! of every byte before it.
//!
//! Records are limited to [`HEX_LINE_CAPACITY`] data bytes, the size used for
//! every line this crate generates. Longer records are rejected as
//! [`ParseError::WrongLength`].

mod reader;

use core::fmt;

use heapless::Vec;

use crate::error::ParseError;

pub use reader::{LineReader, LINE_BUFFER_LEN};

/// Maximum number of data bytes in one record
pub const HEX_LINE_CAPACITY: usize = 16;
/// Length of the shortest record (`:00000001FF`)
pub const MIN_LINE_LEN: usize = 11;
/// Length of the longest record this codec produces or accepts
pub const MAX_LINE_LEN: usize = MIN_LINE_LEN + 2 * HEX_LINE_CAPACITY;

/// The end-of-file record
pub const END_RECORD: &str = ":00000001FF";

/// Intel HEX record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordType {
    /// `00` data
    Data = 0x00,
    /// `01` end of file
    EndOfFile = 0x01,
    /// `02` extended segment address
    ExtendedSegmentAddress = 0x02,
    /// `03` start segment address
    StartSegmentAddress = 0x03,
    /// `04` extended linear address
    ExtendedLinearAddress = 0x04,
    /// `05` start linear address
    StartLinearAddress = 0x05,
}

impl RecordType {
    /// Decode a type code
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Self::Data),
            0x01 => Some(Self::EndOfFile),
            0x02 => Some(Self::ExtendedSegmentAddress),
            0x03 => Some(Self::StartSegmentAddress),
            0x04 => Some(Self::ExtendedLinearAddress),
            0x05 => Some(Self::StartLinearAddress),
            _ => None,
        }
    }

    /// The type code
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// One decoded record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexRecord {
    /// Record type
    pub record_type: RecordType,
    /// 16-bit load offset
    pub address: u16,
    /// Data bytes
    pub data: Vec<u8, HEX_LINE_CAPACITY>,
}

impl HexRecord {
    /// Build a record, rejecting more than [`HEX_LINE_CAPACITY`] data bytes
    pub fn new(record_type: RecordType, address: u16, data: &[u8]) -> Result<Self, ParseError> {
        let data = Vec::from_slice(data).map_err(|_| ParseError::WrongLength)?;
        Ok(Self {
            record_type,
            address,
            data,
        })
    }

    /// A data record
    pub fn data(address: u16, data: &[u8]) -> Result<Self, ParseError> {
        Self::new(RecordType::Data, address, data)
    }

    /// The end-of-file record
    pub fn end_of_file() -> Self {
        Self {
            record_type: RecordType::EndOfFile,
            address: 0,
            data: Vec::new(),
        }
    }

    /// Number of data bytes
    pub fn byte_count(&self) -> u8 {
        self.data.len() as u8
    }

    /// Checksum byte for this record
    pub fn checksum(&self) -> u8 {
        let [hi, lo] = self.address.to_be_bytes();
        let mut sum = self.byte_count().wrapping_add(hi).wrapping_add(lo);
        sum = sum.wrapping_add(self.record_type.as_u8());
        for &b in self.data.iter() {
            sum = sum.wrapping_add(b);
        }
        sum.wrapping_neg()
    }

    /// Encode to text, with uppercase digits and without line terminator
    pub fn encode(&self) -> HexLine {
        let mut line = HexLine {
            buf: [0; MAX_LINE_LEN],
            len: 0,
        };
        let [hi, lo] = self.address.to_be_bytes();
        line.push(b':');
        line.push_byte(self.byte_count());
        line.push_byte(hi);
        line.push_byte(lo);
        line.push_byte(self.record_type.as_u8());
        for &b in &self.data {
            line.push_byte(b);
        }
        line.push_byte(self.checksum());
        line
    }
}

/// An encoded record
#[derive(Clone, PartialEq, Eq)]
pub struct HexLine {
    buf: [u8; MAX_LINE_LEN],
    len: usize,
}

impl HexLine {
    /// The encoded text as ASCII bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    // Records hold at most HEX_LINE_CAPACITY bytes, so MAX_LINE_LEN always fits
    fn push(&mut self, c: u8) {
        self.buf[self.len] = c;
        self.len += 1;
    }

    fn push_byte(&mut self, value: u8) {
        const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
        self.push(DIGITS[(value >> 4) as usize]);
        self.push(DIGITS[(value & 0x0F) as usize]);
    }
}

impl fmt::Display for HexLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &c in self.as_bytes() {
            fmt::Write::write_char(f, c as char)?;
        }
        Ok(())
    }
}

impl fmt::Debug for HexLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HexLine({})", self)
    }
}

/// Encode a data record
pub fn encode_data_record(address: u16, data: &[u8]) -> Result<HexLine, ParseError> {
    HexRecord::data(address, data).map(|record| record.encode())
}

/// Encode the end-of-file record
pub fn encode_end_record() -> HexLine {
    HexRecord::end_of_file().encode()
}

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

/// Parse two hex digits into a byte
pub fn parse_byte(pair: &[u8]) -> Option<u8> {
    match pair {
        [hi, lo] => Some((hex_digit(*hi)? << 4) | hex_digit(*lo)?),
        _ => None,
    }
}

/// Two hex digits at `index`, or `None` if missing or not hex
fn field(line: &[u8], index: usize) -> Option<u8> {
    line.get(index..index + 2).and_then(parse_byte)
}

/// Strip trailing `\r` / `\n`
pub fn strip_line_ending(mut line: &[u8]) -> &[u8] {
    while let [rest @ .., b'\r' | b'\n'] = line {
        line = rest;
    }
    line
}

/// Decode one line
///
/// Line-ending characters are stripped first. Anything after the checksum
/// is ignored.
pub fn decode_line(line: &[u8]) -> Result<HexRecord, ParseError> {
    let line = strip_line_ending(line);

    if line.len() < MIN_LINE_LEN {
        return Err(ParseError::TooShort);
    }
    if line[0] != b':' {
        return Err(ParseError::WrongStart);
    }
    let len = field(line, 1)
        .filter(|&n| n as usize <= HEX_LINE_CAPACITY)
        .ok_or(ParseError::WrongLength)?;
    let hi = field(line, 3).ok_or(ParseError::WrongAddressHigh)?;
    let lo = field(line, 5).ok_or(ParseError::WrongAddressLow)?;
    let record_type = field(line, 7)
        .and_then(RecordType::from_u8)
        .ok_or(ParseError::WrongType)?;

    let mut sum = len
        .wrapping_add(hi)
        .wrapping_add(lo)
        .wrapping_add(record_type.as_u8());
    let mut data = Vec::new();
    for i in 0..len as usize {
        let b = field(line, 9 + i * 2).ok_or(ParseError::WrongData)?;
        data.push(b).map_err(|_| ParseError::WrongLength)?;
        sum = sum.wrapping_add(b);
    }

    let expected = sum.wrapping_neg();
    field(line, 9 + len as usize * 2)
        .filter(|&crc| crc == expected)
        .ok_or(ParseError::WrongChecksum)?;

    Ok(HexRecord {
        record_type,
        address: u16::from_be_bytes([hi, lo]),
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::ToString;

    const SCENARIO_LINE: &str = ":10000000214601360121470136007EFE09D2190141";

    #[test]
    fn test_decode_data_record() {
        let record = decode_line(SCENARIO_LINE.as_bytes()).unwrap();
        assert_eq!(record.record_type, RecordType::Data);
        assert_eq!(record.address, 0);
        assert_eq!(
            record.data.as_slice(),
            &[
                0x21, 0x46, 0x01, 0x36, 0x01, 0x21, 0x47, 0x01, 0x36, 0x00, 0x7E, 0xFE, 0x09,
                0xD2, 0x19, 0x01
            ]
        );
        assert_eq!(record.checksum(), 0x41);
    }

    #[test]
    fn test_decode_end_record() {
        let record = decode_line(b":00000001FF\r\n").unwrap();
        assert_eq!(record, HexRecord::end_of_file());
        assert_eq!(encode_end_record().as_bytes(), END_RECORD.as_bytes());
    }

    #[test]
    fn test_wrong_checksum() {
        let line = ":10000000214601360121470136007EFE09D2190140";
        assert_eq!(decode_line(line.as_bytes()), Err(ParseError::WrongChecksum));
        // Sixteen data bytes with the checksum digits missing altogether
        let line = ":10000000214601360121470136007EFE09D21901";
        assert_eq!(decode_line(line.as_bytes()), Err(ParseError::WrongChecksum));
    }

    /// Encode `record` but transmit `checksum` in place of the real one
    fn line_with_checksum(record: &HexRecord, checksum: u8) -> ([u8; MAX_LINE_LEN], usize) {
        let text = record.encode();
        let len = text.as_bytes().len();
        let mut bytes = [0u8; MAX_LINE_LEN];
        bytes[..len].copy_from_slice(text.as_bytes());
        let [hi, lo] = hex_pair(checksum);
        bytes[len - 2] = hi;
        bytes[len - 1] = lo;
        (bytes, len)
    }

    #[test]
    fn test_bit_flips_break_checksum() {
        let record = decode_line(SCENARIO_LINE.as_bytes()).unwrap();

        for bit in 0..8 {
            let (bytes, len) = line_with_checksum(&record, record.checksum() ^ (1 << bit));
            assert_eq!(decode_line(&bytes[..len]), Err(ParseError::WrongChecksum));
        }

        // Any data byte flipped, checksum left as it was
        for index in 0..record.data.len() {
            for bit in 0..8 {
                let mut flipped = record.clone();
                flipped.data[index] ^= 1 << bit;
                let (bytes, len) = line_with_checksum(&flipped, record.checksum());
                assert_eq!(
                    decode_line(&bytes[..len]),
                    Err(ParseError::WrongChecksum),
                    "data byte {} bit {}",
                    index,
                    bit
                );
            }
        }
    }

    fn hex_pair(value: u8) -> [u8; 2] {
        const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
        [DIGITS[(value >> 4) as usize], DIGITS[(value & 0xF) as usize]]
    }

    #[test]
    fn test_error_order() {
        assert_eq!(decode_line(b":0000001FF"), Err(ParseError::TooShort));
        assert_eq!(decode_line(b""), Err(ParseError::TooShort));
        assert_eq!(decode_line(b";00000001FF"), Err(ParseError::WrongStart));
        assert_eq!(decode_line(b":G0000001FF"), Err(ParseError::WrongLength));
        assert_eq!(
            decode_line(b":110000000000000000000000000000000000000000EF"),
            Err(ParseError::WrongLength)
        );
        assert_eq!(
            decode_line(b":00X00001FF"),
            Err(ParseError::WrongAddressHigh)
        );
        assert_eq!(
            decode_line(b":0000Z001FF"),
            Err(ParseError::WrongAddressLow)
        );
        assert_eq!(decode_line(b":00000006FA"), Err(ParseError::WrongType));
        assert_eq!(decode_line(b":01000000QQ00"), Err(ParseError::WrongData));
        // Declared data runs past the end of the line
        assert_eq!(decode_line(b":0400000001"), Err(ParseError::WrongData));
        assert_eq!(decode_line(b":00000001F"), Err(ParseError::TooShort));
        assert_eq!(decode_line(b":00000001GG"), Err(ParseError::WrongChecksum));
    }

    #[test]
    fn test_all_record_types_accepted() {
        for code in 0u8..=5 {
            let record_type = RecordType::from_u8(code).unwrap();
            let record = HexRecord::new(record_type, 0, &[0x12, 0x34]).unwrap();
            let line = record.encode();
            assert_eq!(decode_line(line.as_bytes()).unwrap(), record);
        }
    }

    #[test]
    fn test_lowercase_round_trip_normalises() {
        let lower = SCENARIO_LINE.to_ascii_lowercase();
        let record = decode_line(lower.as_bytes()).unwrap();
        assert_eq!(record.encode().to_string(), SCENARIO_LINE);
    }

    #[test]
    fn test_encode_data_record() {
        let line = encode_data_record(0x0100, &[0x0C, 0x94, 0x34, 0x00]).unwrap();
        assert_eq!(line.to_string(), ":040100000C94340027");
        assert_eq!(
            encode_data_record(0, &[0u8; HEX_LINE_CAPACITY + 1]),
            Err(ParseError::WrongLength)
        );
    }

    #[test]
    fn test_mixed_case_digits() {
        assert_eq!(parse_byte(b"aF"), Some(0xAF));
        assert_eq!(parse_byte(b"0g"), None);
        assert_eq!(parse_byte(b"0"), None);
    }
}
