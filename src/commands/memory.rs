//! Dump, program and erase commands

use std::path::Path;

use avrisp_core::chip::MemoryRegion;
use avrisp_core::memory;
use avrisp_core::orchestrator::{dump_eeprom, dump_flash, program_eeprom, program_flash};

use super::{open_target, IndicatifProgress};
use crate::cli::RegionArg;
use crate::storage::{FileSink, FileSource};

impl From<RegionArg> for MemoryRegion {
    fn from(region: RegionArg) -> Self {
        match region {
            RegionArg::Flash => MemoryRegion::Flash,
            RegionArg::Eeprom => MemoryRegion::Eeprom,
        }
    }
}

/// Dump a region to a HEX file
///
/// Flash dumps stop at the start of the boot section.
pub fn run_dump(
    programmer: &str,
    region: RegionArg,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let (mut session, _) = open_target(programmer)?;
    let sink = FileSink::create(output)?;
    let mut progress = IndicatifProgress::new();

    let stats = match MemoryRegion::from(region) {
        MemoryRegion::Flash => dump_flash(&mut session, sink, &mut progress)?,
        MemoryRegion::Eeprom => dump_eeprom(&mut session, sink, &mut progress)?,
    };
    session.release();

    println!(
        "Wrote {} lines to {}",
        stats.lines_emitted,
        output.display()
    );
    Ok(())
}

/// Program a region from a HEX file
pub fn run_program(
    programmer: &str,
    region: RegionArg,
    input: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = FileSource::open(input)?;
    let (mut session, _) = open_target(programmer)?;
    let mut progress = IndicatifProgress::new();

    let stats = match MemoryRegion::from(region) {
        MemoryRegion::Flash => program_flash(&mut session, source, &mut progress)?,
        MemoryRegion::Eeprom => program_eeprom(&mut session, source, &mut progress)?,
    };
    session.release();

    println!(
        "Programmed {} from {} ({} records)",
        MemoryRegion::from(region),
        input.display(),
        stats.records
    );
    Ok(())
}

/// Erase the whole chip
pub fn run_erase(programmer: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (mut session, _) = open_target(programmer)?;
    memory::erase_chip(&mut session)?;
    session.release();

    println!("Chip erased");
    Ok(())
}
