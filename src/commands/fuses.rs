//! Fuse and lock byte commands

use std::path::Path;

use avrisp_core::chip::FuseKind;
use avrisp_core::memory;
use avrisp_core::orchestrator::{backup_fuses, restore_fuses};

use super::open_target;
use crate::storage::{FileSink, FileSource};

/// Print all four bytes
pub fn run_read(programmer: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (mut session, _) = open_target(programmer)?;
    let fuses = memory::read_fuses(&mut session)?;
    session.release();

    for kind in FuseKind::ALL {
        println!("{:9} 0x{:02X}", kind.name(), fuses.get(kind));
    }
    Ok(())
}

pub fn run_backup(programmer: &str, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (mut session, _) = open_target(programmer)?;
    let sink = FileSink::create(output)?;
    let fuses = backup_fuses(&mut session, sink)?;
    session.release();

    println!(
        "Saved L:{:02X} H:{:02X} E:{:02X} LB:{:02X} to {}",
        fuses.low,
        fuses.high,
        fuses.extended,
        fuses.lock,
        output.display()
    );
    Ok(())
}

/// Write the fuses from a text file
///
/// The lock byte is only written when `lock` is set: once programmed it can
/// only be cleared by a chip erase.
pub fn run_restore(
    programmer: &str,
    input: &Path,
    lock: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = FileSource::open(input)?;
    let (mut session, _) = open_target(programmer)?;
    let fuses = restore_fuses(&mut session, source, lock)?;
    session.release();

    println!(
        "Wrote L:{:02X} H:{:02X} E:{:02X}{}",
        fuses.low,
        fuses.high,
        fuses.extended,
        if lock {
            format!(" LB:{:02X}", fuses.lock)
        } else {
            String::new()
        }
    );
    Ok(())
}
