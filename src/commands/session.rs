//! Session command: back up, then program from a directory

use std::path::Path;

use avrisp_core::orchestrator::{
    run_session, SessionOptions, SessionReport, EEPROM_BACKUP, FIRMWARE_BACKUP, FUSES_BACKUP,
};
use avrisp_core::protocol::IspSession;

use super::IndicatifProgress;
use crate::programmers::open_programmer;
use crate::storage::DirStorage;

pub fn run(programmer: &str, dir: &Path, lock: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !dir.is_dir() {
        return Err(format!("Not a directory: {}", dir.display()).into());
    }

    let link = open_programmer(programmer)?;
    let mut session = IspSession::new(link);
    let mut storage = DirStorage::new(dir);
    let mut progress = IndicatifProgress::new();
    let options = SessionOptions { write_lock: lock };

    let report = run_session(&mut session, &mut storage, options, &mut progress)?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &SessionReport) {
    if let Some(signature) = &report.signature {
        println!("Target: {}", signature);
    }

    println!("Backups:");
    for (name, written) in [
        (FUSES_BACKUP, report.fuses_backed_up),
        (EEPROM_BACKUP, report.eeprom_backed_up),
        (FIRMWARE_BACKUP, report.firmware_backed_up),
    ] {
        let status = if written { "written" } else { "FAILED" };
        println!("  {:12} {}", name, status);
    }

    println!("Programmed:");
    match &report.firmware {
        Some(stats) => println!(
            "  flash        {} records, {} pages",
            stats.records, stats.pages_written
        ),
        None => println!("  flash        unchanged"),
    }
    match &report.eeprom {
        Some(stats) => println!(
            "  eeprom       {} records, {} bytes",
            stats.records, stats.bytes_written
        ),
        None => println!("  eeprom       unchanged"),
    }
    match &report.fuses {
        Some(fuses) => println!(
            "  fuses        L:{:02X} H:{:02X} E:{:02X}",
            fuses.low, fuses.high, fuses.extended
        ),
        None => println!("  fuses        unchanged"),
    }
}
