//! Whole-session workflow
//!
//! A session synchronises with the target, checks its signature, backs up
//! fuses, EEPROM and flash, then programs whichever input files are present.

use crate::chip::{DeviceSignature, FuseSet};
use crate::error::{Error, Result};
use crate::io::Storage;
use crate::memory;
use crate::programmer::IspLink;
use crate::protocol::IspSession;

use super::{
    backup_fuses, dump_eeprom, dump_flash, program_eeprom, program_flash, restore_fuses,
    PassProgress, PassStats,
};

/// Fuse input file
pub const FUSES_INPUT: &str = "fuses.txt";
/// Fuse backup file
pub const FUSES_BACKUP: &str = "fuses.bak";
/// EEPROM input file
pub const EEPROM_INPUT: &str = "eeprom.hex";
/// EEPROM backup file
pub const EEPROM_BACKUP: &str = "eeprom.bak";
/// Flash input file
pub const FIRMWARE_INPUT: &str = "firmware.hex";
/// Flash backup file
pub const FIRMWARE_BACKUP: &str = "firmware.bak";

/// Session options
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    /// Also write the lock byte when restoring fuses
    pub write_lock: bool,
}

/// What a session did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// Signature of the target
    pub signature: Option<DeviceSignature>,
    /// Whether `fuses.bak` was written
    pub fuses_backed_up: bool,
    /// Whether `eeprom.bak` was written
    pub eeprom_backed_up: bool,
    /// Whether `firmware.bak` was written
    pub firmware_backed_up: bool,
    /// Result of programming `firmware.hex`, if present
    pub firmware: Option<PassStats>,
    /// Result of programming `eeprom.hex`, if present
    pub eeprom: Option<PassStats>,
    /// Fuses restored from `fuses.txt`, if present
    pub fuses: Option<FuseSet>,
}

/// Run one backup; failures are logged and reported as `false`
fn backup<T, F>(storage: &mut T, name: &str, pass: F) -> bool
where
    T: Storage,
    F: FnOnce(T::Writer) -> Result<()>,
{
    match storage.create(name).and_then(pass) {
        Ok(()) => {
            log::info!("backup: wrote {}", name);
            true
        }
        Err(e) => {
            log::warn!("backup: {} not written: {}", name, e);
            false
        }
    }
}

fn run_steps<L, T, P>(
    session: &mut IspSession<L>,
    storage: &mut T,
    options: SessionOptions,
    progress: &mut P,
    report: &mut SessionReport,
) -> Result<()>
where
    L: IspLink,
    T: Storage,
    P: PassProgress + ?Sized,
{
    session.begin()?;

    let signature = memory::read_signature(session)?;
    if !signature.is_supported() {
        log::error!("target: unsupported signature {}", signature);
        return Err(Error::UnsupportedSignature(signature.0));
    }
    log::info!("target: {}", signature);
    report.signature = Some(signature);

    report.fuses_backed_up = backup(storage, FUSES_BACKUP, |sink| {
        backup_fuses(session, sink).map(|_| ())
    });
    report.eeprom_backed_up = backup(storage, EEPROM_BACKUP, |sink| {
        dump_eeprom(session, sink, progress).map(|_| ())
    });
    report.firmware_backed_up = backup(storage, FIRMWARE_BACKUP, |sink| {
        dump_flash(session, sink, progress).map(|_| ())
    });

    if storage.exists(FIRMWARE_INPUT) {
        log::info!("programming {}", FIRMWARE_INPUT);
        let source = storage.open(FIRMWARE_INPUT)?;
        report.firmware = Some(program_flash(session, source, progress)?);
    } else {
        log::info!("{} not present, flash left as is", FIRMWARE_INPUT);
    }

    if storage.exists(EEPROM_INPUT) {
        log::info!("programming {}", EEPROM_INPUT);
        let source = storage.open(EEPROM_INPUT)?;
        report.eeprom = Some(program_eeprom(session, source, progress)?);
    } else {
        log::info!("{} not present, EEPROM left as is", EEPROM_INPUT);
    }

    if storage.exists(FUSES_INPUT) {
        log::info!("restoring {}", FUSES_INPUT);
        let source = storage.open(FUSES_INPUT)?;
        report.fuses = Some(restore_fuses(session, source, options.write_lock)?);
    } else {
        log::info!("{} not present, fuses left as is", FUSES_INPUT);
    }

    Ok(())
}

/// Run a full session against the files in `storage`
///
/// Steps run in a fixed order and the first failure ends the session.
/// Backup failures are only warned about. The link is released on every
/// exit path. On error the report gathered so far is discarded and the
/// error returned.
pub fn run_session<L, T, P>(
    session: &mut IspSession<L>,
    storage: &mut T,
    options: SessionOptions,
    progress: &mut P,
) -> Result<SessionReport>
where
    L: IspLink,
    T: Storage,
    P: PassProgress + ?Sized,
{
    let mut report = SessionReport::default();
    let result = run_steps(session, storage, options, progress, &mut report);
    session.release();

    match result {
        Ok(()) => {
            log::info!("session complete");
            Ok(report)
        }
        Err(e) => {
            log::error!("session failed: {}", e);
            Err(e)
        }
    }
}
