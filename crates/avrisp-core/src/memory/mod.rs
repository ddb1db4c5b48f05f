//! Typed flash, EEPROM and fuse access
//!
//! Every operation here is a fixed sequence of 4-byte frames issued through
//! an [`IspSession`] that is already in programming mode. Writes always wait
//! for the target's write cycle to finish before returning.
//!
//! Flash is word organised: a byte address selects a word with its upper
//! bits and the low or high byte of that word with bit 0.

mod page;

pub use page::PageBuffer;

use crate::chip::{DeviceSignature, FuseKind, FuseSet, MemoryRegion, FLASH_PAGE_WORDS};
use crate::error::{Error, Result};
use crate::programmer::IspLink;
use crate::protocol::{opcodes, Frame, IspSession};

fn check_range(region: MemoryRegion, addr: u16, len: usize) -> Result<()> {
    if region.contains(addr as u32, len) {
        Ok(())
    } else {
        Err(Error::AddressOutOfRange {
            region,
            addr: addr as u32,
            len,
        })
    }
}

fn read_frame(region: MemoryRegion, addr: u16) -> Frame {
    match region {
        MemoryRegion::Flash => {
            let word = addr >> 1;
            let opcode = if addr & 1 == 0 {
                opcodes::READ_FLASH_LOW
            } else {
                opcodes::READ_FLASH_HIGH
            };
            [opcode, (word >> 8) as u8, word as u8, 0x00]
        }
        MemoryRegion::Eeprom => {
            let [hi, lo] = addr.to_be_bytes();
            [opcodes::READ_EEPROM, hi, lo, 0x00]
        }
    }
}

/// Read one byte
pub fn read_byte<L: IspLink>(
    session: &mut IspSession<L>,
    region: MemoryRegion,
    addr: u16,
) -> Result<u8> {
    check_range(region, addr, 1)?;
    session.command(read_frame(region, addr))
}

/// Read `buf.len()` bytes starting at `addr`
pub fn read<L: IspLink>(
    session: &mut IspSession<L>,
    region: MemoryRegion,
    addr: u16,
    buf: &mut [u8],
) -> Result<()> {
    check_range(region, addr, buf.len())?;
    for (offset, byte) in buf.iter_mut().enumerate() {
        *byte = session.command(read_frame(region, addr + offset as u16))?;
    }
    Ok(())
}

fn verify_byte<L: IspLink>(
    session: &mut IspSession<L>,
    region: MemoryRegion,
    addr: u16,
    expected: u8,
) -> Result<()> {
    let found = session.command(read_frame(region, addr))?;
    if found != expected {
        log::error!(
            "{} verify failed at 0x{:04X}: wrote 0x{:02X}, read 0x{:02X}",
            region,
            addr,
            expected,
            found
        );
        return Err(Error::Verify {
            region,
            addr,
            expected,
            found,
        });
    }
    Ok(())
}

/// Write one EEPROM byte, optionally reading it back
pub fn write_eeprom_byte<L: IspLink>(
    session: &mut IspSession<L>,
    addr: u16,
    value: u8,
    verify: bool,
) -> Result<()> {
    check_range(MemoryRegion::Eeprom, addr, 1)?;
    let [hi, lo] = addr.to_be_bytes();
    session.command([opcodes::WRITE_EEPROM, hi, lo, value])?;
    session.wait_ready()?;
    if verify {
        verify_byte(session, MemoryRegion::Eeprom, addr, value)?;
    }
    Ok(())
}

/// Load a page into the target's page latch, commit it and optionally verify
///
/// Flash pages are loaded as 64 low/high byte pairs and committed with the
/// word address of the page. EEPROM pages are loaded as 4 bytes and committed
/// with the byte address. Verification compares every byte of the page and
/// stops at the first mismatch.
///
/// Flash programming can only clear bits, so a flash page is refused with
/// [`Error::NotErased`] until [`erase_chip`] has run in this session.
pub fn write_page<L: IspLink>(
    session: &mut IspSession<L>,
    page: &PageBuffer,
    verify: bool,
) -> Result<()> {
    let region = page.region();
    let base = page.base();
    let data = page.as_slice();
    check_range(region, base, data.len())?;
    if region == MemoryRegion::Flash && !session.is_erased() {
        return Err(Error::NotErased);
    }

    match region {
        MemoryRegion::Flash => {
            for i in 0..FLASH_PAGE_WORDS {
                let index = i as u8;
                session.command([opcodes::LOAD_FLASH_LOW, 0x00, index, data[2 * i]])?;
                session.command([opcodes::LOAD_FLASH_HIGH, 0x00, index, data[2 * i + 1]])?;
            }
            let word_base = (base / 2) & 0xFFC0;
            let [hi, lo] = word_base.to_be_bytes();
            session.command([opcodes::WRITE_FLASH_PAGE, hi, lo, 0x00])?;
        }
        MemoryRegion::Eeprom => {
            for (i, &byte) in data.iter().enumerate() {
                session.command([opcodes::LOAD_EEPROM_PAGE, 0x00, i as u8, byte])?;
            }
            let [hi, lo] = (base & 0xFFFC).to_be_bytes();
            session.command([opcodes::WRITE_EEPROM_PAGE, hi, lo, 0x00])?;
        }
    }
    session.wait_ready()?;
    log::debug!("{}: wrote page at 0x{:04X}", region, base);

    if verify {
        for (offset, &expected) in data.iter().enumerate() {
            verify_byte(session, region, base + offset as u16, expected)?;
        }
    }
    Ok(())
}

/// Erase flash (and EEPROM unless EESAVE is programmed) and clear the lock bits
pub fn erase_chip<L: IspLink>(session: &mut IspSession<L>) -> Result<()> {
    log::debug!("isp: chip erase");
    session.command([opcodes::WRITE_CONTROL, opcodes::CHIP_ERASE, 0x00, 0x00])?;
    session.wait_ready()?;
    session.mark_erased();
    Ok(())
}

/// Read one fuse or the lock byte
pub fn read_fuse<L: IspLink>(session: &mut IspSession<L>, kind: FuseKind) -> Result<u8> {
    let [b0, b1] = match kind {
        FuseKind::Lock => opcodes::READ_LOCK,
        FuseKind::Low => opcodes::READ_FUSE_LOW,
        FuseKind::High => opcodes::READ_FUSE_HIGH,
        FuseKind::Extended => opcodes::READ_FUSE_EXTENDED,
    };
    session.command([b0, b1, 0x00, 0x00])
}

/// Write one fuse or the lock byte
///
/// The new value only takes effect once programming mode is re-entered.
pub fn write_fuse<L: IspLink>(
    session: &mut IspSession<L>,
    kind: FuseKind,
    value: u8,
) -> Result<()> {
    let opcode = match kind {
        FuseKind::Lock => opcodes::WRITE_LOCK,
        FuseKind::Low => opcodes::WRITE_FUSE_LOW,
        FuseKind::High => opcodes::WRITE_FUSE_HIGH,
        FuseKind::Extended => opcodes::WRITE_FUSE_EXTENDED,
    };
    log::debug!("isp: write {} fuse 0x{:02X}", kind.name(), value);
    session.command([opcodes::WRITE_CONTROL, opcode, 0x00, value])?;
    session.wait_ready()
}

/// Read all four fuse bytes
pub fn read_fuses<L: IspLink>(session: &mut IspSession<L>) -> Result<FuseSet> {
    let mut fuses = FuseSet::default();
    for kind in FuseKind::ALL {
        fuses.set(kind, read_fuse(session, kind)?);
    }
    Ok(fuses)
}

/// Read the three signature bytes
pub fn read_signature<L: IspLink>(session: &mut IspSession<L>) -> Result<DeviceSignature> {
    let mut signature = [0u8; 3];
    for (i, byte) in signature.iter_mut().enumerate() {
        *byte = session.command([opcodes::READ_SIGNATURE, 0x00, i as u8, 0x00])?;
    }
    Ok(DeviceSignature(signature))
}

/// Set the upper address byte used by subsequent flash page writes
pub fn set_extended_address<L: IspLink>(session: &mut IspSession<L>, value: u8) -> Result<()> {
    session.command([opcodes::LOAD_EXTENDED_ADDRESS, 0x00, value, 0x00])?;
    Ok(())
}
