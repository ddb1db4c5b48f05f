//! Page accumulation buffer

use crate::chip::{MemoryRegion, ERASED_VALUE, MAX_PAGE_SIZE};
use crate::error::{Error, Result};

/// One page of flash or EEPROM being assembled before it is written
///
/// Opened at a page-aligned base, pre-filled with the erased value, and
/// handed to [`write_page`](super::write_page) once complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBuffer {
    region: MemoryRegion,
    base: u16,
    data: [u8; MAX_PAGE_SIZE],
}

impl PageBuffer {
    /// Open the page containing `addr`
    pub fn new(region: MemoryRegion, addr: u16) -> Self {
        Self {
            region,
            base: region.page_base(addr),
            data: [ERASED_VALUE; MAX_PAGE_SIZE],
        }
    }

    /// Region the page belongs to
    pub fn region(&self) -> MemoryRegion {
        self.region
    }

    /// Page-aligned base address
    pub fn base(&self) -> u16 {
        self.base
    }

    /// Whether `addr` falls inside this page
    pub fn contains(&self, addr: u16) -> bool {
        self.region.page_base(addr) == self.base
    }

    /// Store one byte at its absolute address
    pub fn set(&mut self, addr: u16, value: u8) -> Result<()> {
        if !self.contains(addr) {
            return Err(Error::AddressOutOfRange {
                region: self.region,
                addr: addr as u32,
                len: 1,
            });
        }
        self.data[(addr - self.base) as usize] = value;
        Ok(())
    }

    /// Page contents
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.region.page_size()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_opens_aligned_and_erased() {
        let page = PageBuffer::new(MemoryRegion::Flash, 0x0185);
        assert_eq!(page.base(), 0x0180);
        assert_eq!(page.as_slice().len(), 128);
        assert!(page.as_slice().iter().all(|&b| b == ERASED_VALUE));

        let page = PageBuffer::new(MemoryRegion::Eeprom, 0x0007);
        assert_eq!(page.base(), 0x0004);
        assert_eq!(page.as_slice().len(), 4);
    }

    #[test]
    fn test_set_rejects_other_page() {
        let mut page = PageBuffer::new(MemoryRegion::Flash, 0);
        page.set(0x7F, 0x12).unwrap();
        assert_eq!(page.as_slice()[0x7F], 0x12);
        assert!(matches!(
            page.set(0x80, 0),
            Err(Error::AddressOutOfRange { addr: 0x80, .. })
        ));
    }
}
