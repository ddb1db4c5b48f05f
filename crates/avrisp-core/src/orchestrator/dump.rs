//! Target to HEX dump passes

use crate::chip::{application_end, FuseKind, MemoryRegion, EEPROM_SIZE, ERASED_VALUE};
use crate::error::{Error, Result};
use crate::hex::{encode_data_record, encode_end_record, HEX_LINE_CAPACITY};
use crate::io::LineSink;
use crate::memory;
use crate::programmer::IspLink;
use crate::protocol::IspSession;

use super::{PassProgress, PassStats};

const LINE_END: &[u8] = b"\r\n";

/// Dump `[0, end)` of a region as HEX
///
/// Reads 16 bytes at a time. Lines that are entirely erased are left out.
/// The output always ends with the end record, which is counted in
/// [`PassStats::lines_emitted`].
pub fn dump_region<L, W, P>(
    session: &mut IspSession<L>,
    region: MemoryRegion,
    end: usize,
    mut sink: W,
    progress: &mut P,
) -> Result<PassStats>
where
    L: IspLink,
    W: LineSink,
    P: PassProgress + ?Sized,
{
    if end > region.size() {
        return Err(Error::AddressOutOfRange {
            region,
            addr: 0,
            len: end,
        });
    }
    progress.dumping(region, end);

    let mut stats = PassStats::default();
    let mut buf = [0u8; HEX_LINE_CAPACITY];
    let mut addr = 0;
    while addr < end {
        let chunk = &mut buf[..HEX_LINE_CAPACITY.min(end - addr)];
        memory::read(session, region, addr as u16, chunk)?;

        if chunk.iter().any(|&b| b != ERASED_VALUE) {
            let line = encode_data_record(addr as u16, chunk).map_err(|_| Error::Resource)?;
            sink.write_all(line.as_bytes())?;
            sink.write_all(LINE_END)?;
            stats.lines_emitted += 1;
        }
        addr += chunk.len();
        progress.progress(addr);
    }

    sink.write_all(encode_end_record().as_bytes())?;
    sink.write_all(LINE_END)?;
    sink.flush()?;
    stats.lines_emitted += 1;

    log::info!(
        "{}: dumped 0x{:04X} bytes in {} lines",
        region,
        end,
        stats.lines_emitted
    );
    progress.complete(&stats);
    Ok(stats)
}

/// Dump the application section of flash
///
/// The boot section selected by the high fuse is not included.
pub fn dump_flash<L, W, P>(
    session: &mut IspSession<L>,
    sink: W,
    progress: &mut P,
) -> Result<PassStats>
where
    L: IspLink,
    W: LineSink,
    P: PassProgress + ?Sized,
{
    let high = memory::read_fuse(session, FuseKind::High)?;
    let end = application_end(high);
    log::debug!(
        "flash: high fuse 0x{:02X}, application ends at 0x{:04X}",
        high,
        end
    );
    dump_region(session, MemoryRegion::Flash, end, sink, progress)
}

/// Dump all of EEPROM
pub fn dump_eeprom<L, W, P>(
    session: &mut IspSession<L>,
    sink: W,
    progress: &mut P,
) -> Result<PassStats>
where
    L: IspLink,
    W: LineSink,
    P: PassProgress + ?Sized,
{
    dump_region(session, MemoryRegion::Eeprom, EEPROM_SIZE, sink, progress)
}
