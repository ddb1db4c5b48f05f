//! Byte-stream interface to the storage holding HEX and fuse files
//!
//! The core never opens files itself. A host implements these traits over
//! whatever it has (a directory, an SD card, a slice in memory).

use crate::error::{Error, Result};

/// Source of bytes read line by line
pub trait LineSource {
    /// Read the next byte, or `None` at end of stream
    fn read_byte(&mut self) -> Result<Option<u8>>;
}

/// Sink for generated text
pub trait LineSink {
    /// Write all of `bytes`
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Push buffered data to the medium
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Named files on removable media
pub trait Storage {
    /// Reader returned by [`Storage::open`]
    type Reader: LineSource;
    /// Writer returned by [`Storage::create`]
    type Writer: LineSink;

    /// Whether a file with this name exists
    fn exists(&mut self, name: &str) -> bool;

    /// Open an existing file for reading
    fn open(&mut self, name: &str) -> Result<Self::Reader>;

    /// Create or truncate a file for writing
    fn create(&mut self, name: &str) -> Result<Self::Writer>;
}

impl LineSource for &[u8] {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        match self.split_first() {
            Some((&byte, rest)) => {
                *self = rest;
                Ok(Some(byte))
            }
            None => Ok(None),
        }
    }
}

impl<S: LineSource + ?Sized> LineSource for &mut S {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        (**self).read_byte()
    }
}

impl<W: LineSink + ?Sized> LineSink for &mut W {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_all(bytes)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

#[cfg(feature = "alloc")]
impl LineSink for alloc::vec::Vec<u8> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

/// Sink writing into a fixed buffer; overflowing it is a resource error
impl<const N: usize> LineSink for heapless::Vec<u8, N> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.extend_from_slice(bytes).map_err(|_| Error::Resource)
    }
}
