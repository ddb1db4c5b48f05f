//! Line splitting over a byte source

use crate::error::{Error, Result};
use crate::io::LineSource;

use super::{HEX_LINE_CAPACITY, MIN_LINE_LEN};

/// Size of the line buffer: the longest record plus `\r\n`
pub const LINE_BUFFER_LEN: usize = HEX_LINE_CAPACITY * 2 + MIN_LINE_LEN + 2;

/// Splits a byte stream into `\n`-terminated lines held in a fixed buffer
///
/// Line terminators are not included in returned lines. A line longer than
/// the buffer is consumed up to its terminator and reported as
/// [`Error::Resource`]. Empty lines are skipped.
pub struct LineReader<S> {
    source: S,
    buf: [u8; LINE_BUFFER_LEN],
    len: usize,
    line: u32,
}

impl<S: LineSource> LineReader<S> {
    /// Wrap a byte source
    pub fn new(source: S) -> Self {
        Self {
            source,
            buf: [0; LINE_BUFFER_LEN],
            len: 0,
            line: 0,
        }
    }

    /// 1-based number of the line last returned
    pub fn line_number(&self) -> u32 {
        self.line
    }

    /// Read the next non-empty line, or `None` at end of stream
    pub fn next_line(&mut self) -> Result<Option<&[u8]>> {
        loop {
            self.len = 0;
            let mut overflow = false;
            let mut seen_any = false;

            loop {
                match self.source.read_byte()? {
                    None => break,
                    Some(b'\n') => {
                        seen_any = true;
                        break;
                    }
                    Some(byte) => {
                        seen_any = true;
                        if self.len < LINE_BUFFER_LEN {
                            self.buf[self.len] = byte;
                            self.len += 1;
                        } else {
                            overflow = true;
                        }
                    }
                }
            }

            if !seen_any {
                return Ok(None);
            }
            self.line += 1;
            if overflow {
                log::warn!("hex: line {} exceeds {} bytes", self.line, LINE_BUFFER_LEN);
                return Err(Error::Resource);
            }

            while self.len > 0 && self.buf[self.len - 1] == b'\r' {
                self.len -= 1;
            }
            if self.len > 0 {
                return Ok(Some(&self.buf[..self.len]));
            }
        }
    }

    /// Consume the reader and return the source
    pub fn into_inner(self) -> S {
        self.source
    }
}
