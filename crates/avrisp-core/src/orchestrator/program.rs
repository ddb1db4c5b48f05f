//! HEX to target programming passes

use crate::chip::MemoryRegion;
use crate::error::{Error, Result};
use crate::hex::{decode_line, HexRecord, LineReader, RecordType};
use crate::io::LineSource;
use crate::memory::{self, PageBuffer};
use crate::programmer::IspLink;
use crate::protocol::IspSession;

use super::{PassProgress, PassStats};

/// Read records until the end record, handing data and extended address
/// records to `handle`
///
/// Returns the number of records consumed, end record included.
fn for_each_record<S, F>(source: S, mut handle: F) -> Result<usize>
where
    S: LineSource,
    F: FnMut(u32, &HexRecord) -> Result<()>,
{
    let mut reader = LineReader::new(source);
    let mut records = 0;
    loop {
        let text = reader.next_line()?.ok_or(Error::UnexpectedEof)?;
        let decoded = decode_line(text);
        let line = reader.line_number();
        let record = decoded.map_err(|kind| {
            log::error!("line {}: {}", line, kind);
            Error::Parse { line, kind }
        })?;
        records += 1;

        match record.record_type {
            RecordType::EndOfFile => {
                if !record.data.is_empty() || record.address != 0 {
                    return Err(Error::MalformedRecord { line });
                }
                return Ok(records);
            }
            RecordType::ExtendedLinearAddress => {
                if record.data.len() != 2 || record.address != 0 {
                    return Err(Error::MalformedRecord { line });
                }
                handle(line, &record)?;
            }
            RecordType::Data => handle(line, &record)?,
            record_type => return Err(Error::UnexpectedType { line, record_type }),
        }
    }
}

fn check_record(region: MemoryRegion, record: &HexRecord) -> Result<()> {
    let len = record.data.len();
    if region.contains(record.address as u32, len) {
        Ok(())
    } else {
        log::error!(
            "{}: record at 0x{:04X}+{} beyond end of region",
            region,
            record.address,
            len
        );
        Err(Error::AddressOutOfRange {
            region,
            addr: record.address as u32,
            len,
        })
    }
}

fn flush_page<L: IspLink, P: PassProgress + ?Sized>(
    session: &mut IspSession<L>,
    page: &PageBuffer,
    stats: &mut PassStats,
    progress: &mut P,
) -> Result<()> {
    memory::write_page(session, page, true)?;
    let len = page.as_slice().len();
    stats.pages_written += 1;
    stats.bytes_written += len;
    progress.progress(page.base() as usize + len);
    Ok(())
}

/// Erase the chip and program flash from a HEX stream
///
/// Data is gathered into one open page at a time; the page is committed and
/// verified when a byte for another page arrives and at the end record.
/// Extended linear address records are forwarded to the target at once, using
/// only their low data byte.
pub fn program_flash<L, S, P>(
    session: &mut IspSession<L>,
    source: S,
    progress: &mut P,
) -> Result<PassStats>
where
    L: IspLink,
    S: LineSource,
    P: PassProgress + ?Sized,
{
    progress.erasing();
    memory::erase_chip(session)?;
    progress.programming(MemoryRegion::Flash);

    let mut stats = PassStats::default();
    let mut open: Option<PageBuffer> = None;

    let records = for_each_record(source, |line, record| {
        if record.record_type == RecordType::ExtendedLinearAddress {
            log::debug!("line {}: extended address 0x{:02X}", line, record.data[1]);
            return memory::set_extended_address(session, record.data[1]);
        }

        check_record(MemoryRegion::Flash, record)?;
        for (offset, &byte) in record.data.iter().enumerate() {
            let addr = record.address + offset as u16;
            if !open.as_ref().is_some_and(|page| page.contains(addr)) {
                if let Some(page) = open.take() {
                    flush_page(session, &page, &mut stats, progress)?;
                }
                open = Some(PageBuffer::new(MemoryRegion::Flash, addr));
            }
            if let Some(page) = open.as_mut() {
                page.set(addr, byte)?;
            }
        }
        Ok(())
    })?;
    stats.records = records;

    if let Some(page) = open.take() {
        flush_page(session, &page, &mut stats, progress)?;
    }

    log::info!(
        "flash: {} records, {} pages written",
        stats.records,
        stats.pages_written
    );
    progress.complete(&stats);
    Ok(stats)
}

/// Program EEPROM from a HEX stream, one verified byte at a time
pub fn program_eeprom<L, S, P>(
    session: &mut IspSession<L>,
    source: S,
    progress: &mut P,
) -> Result<PassStats>
where
    L: IspLink,
    S: LineSource,
    P: PassProgress + ?Sized,
{
    progress.programming(MemoryRegion::Eeprom);
    let mut stats = PassStats::default();

    let records = for_each_record(source, |line, record| {
        if record.record_type != RecordType::Data {
            return Err(Error::UnexpectedType {
                line,
                record_type: record.record_type,
            });
        }
        check_record(MemoryRegion::Eeprom, record)?;
        for (offset, &byte) in record.data.iter().enumerate() {
            memory::write_eeprom_byte(session, record.address + offset as u16, byte, true)?;
        }
        stats.bytes_written += record.data.len();
        progress.progress(record.address as usize + record.data.len());
        Ok(())
    })?;
    stats.records = records;

    log::info!(
        "eeprom: {} records, {} bytes written",
        stats.records,
        stats.bytes_written
    );
    progress.complete(&stats);
    Ok(stats)
}
