//! Fuse backup and restore
//!
//! Fuse files hold two `\r\n`-terminated lines:
//!
//! ```text
//! LB:FF
//! L:62;H:D9;E:FF
//! ```

use core::fmt::Write as _;

use crate::chip::{FuseKind, FuseSet};
use crate::error::{Error, Result};
use crate::hex::{parse_byte, LineReader};
use crate::io::{LineSink, LineSource};
use crate::memory;
use crate::programmer::IspLink;
use crate::protocol::IspSession;

const LOCK_LINE_LEN: usize = 5;
const FUSE_LINE_LEN: usize = 14;

/// Write a fuse set in the two-line text layout
pub fn write_fuse_text<W: LineSink>(fuses: &FuseSet, mut sink: W) -> Result<()> {
    let mut text: heapless::String<32> = heapless::String::new();
    write!(
        text,
        "LB:{:02X}\r\nL:{:02X};H:{:02X};E:{:02X}\r\n",
        fuses.lock, fuses.low, fuses.high, fuses.extended
    )
    .map_err(|_| Error::Resource)?;
    sink.write_all(text.as_bytes())?;
    sink.flush()
}

/// Check `prefix` at `at` and parse the two hex digits following it
fn field(line: &[u8], at: usize, prefix: &[u8]) -> Result<u8> {
    let start = at + prefix.len();
    if line.get(at..start) != Some(prefix) {
        return Err(Error::FuseFormat);
    }
    line.get(start..start + 2)
        .and_then(parse_byte)
        .ok_or(Error::FuseFormat)
}

fn next_line<S: LineSource>(reader: &mut LineReader<S>) -> Result<&[u8]> {
    match reader.next_line() {
        Ok(Some(line)) => Ok(line),
        Ok(None) | Err(Error::Resource) => Err(Error::FuseFormat),
        Err(e) => Err(e),
    }
}

/// Parse the two-line text layout
///
/// The layout is strict: `LB:XX` on the first line and `L:XX;H:XX;E:XX` on
/// the second, nothing more. Hex digits may be either case.
pub fn parse_fuse_text<S: LineSource>(source: S) -> Result<FuseSet> {
    let mut reader = LineReader::new(source);

    let line = next_line(&mut reader)?;
    if line.len() != LOCK_LINE_LEN {
        return Err(Error::FuseFormat);
    }
    let lock = field(line, 0, b"LB:")?;

    let line = next_line(&mut reader)?;
    if line.len() != FUSE_LINE_LEN || line[4] != b';' || line[9] != b';' {
        return Err(Error::FuseFormat);
    }
    Ok(FuseSet {
        lock,
        low: field(line, 0, b"L:")?,
        high: field(line, 5, b"H:")?,
        extended: field(line, 10, b"E:")?,
    })
}

/// Read all fuses and write them as text
pub fn backup_fuses<L: IspLink, W: LineSink>(
    session: &mut IspSession<L>,
    sink: W,
) -> Result<FuseSet> {
    let fuses = memory::read_fuses(session)?;
    log::info!(
        "fuses: lock 0x{:02X}, low 0x{:02X}, high 0x{:02X}, extended 0x{:02X}",
        fuses.lock,
        fuses.low,
        fuses.high,
        fuses.extended
    );
    write_fuse_text(&fuses, sink)?;
    Ok(fuses)
}

/// Restore fuses from text
///
/// The whole file is parsed before anything is written. Low, high and
/// extended fuses are written in that order, each followed by a reset and
/// a new programming-enable so it takes effect. The lock byte is written
/// last, and only if `with_lock` is set.
pub fn restore_fuses<L: IspLink, S: LineSource>(
    session: &mut IspSession<L>,
    source: S,
    with_lock: bool,
) -> Result<FuseSet> {
    let fuses = parse_fuse_text(source)?;

    for kind in FuseKind::ALL {
        if kind == FuseKind::Lock && !with_lock {
            log::info!("fuses: lock bits left unchanged");
            continue;
        }
        memory::write_fuse(session, kind, fuses.get(kind))?;
        session.resync()?;
    }

    log::info!("fuses: restored");
    Ok(fuses)
}
