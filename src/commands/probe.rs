//! Probe command implementation

use avrisp_core::chip::{application_end, HighFuse, FLASH_SIZE};
use avrisp_core::memory;

use super::open_target;

/// Enter programming mode and print what the target reports
pub fn run_probe(programmer: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (mut session, signature) = open_target(programmer)?;
    let fuses = memory::read_fuses(&mut session)?;
    session.release();

    let high = HighFuse::from_bits_retain(fuses.high);
    let app_end = application_end(fuses.high);

    println!("Found AVR target:");
    println!("  Signature: {}", signature);
    println!(
        "  Fuses:     L:{:02X} H:{:02X} E:{:02X} LB:{:02X}",
        fuses.low, fuses.high, fuses.extended, fuses.lock
    );
    println!(
        "  Flash:     application 0x0000 - 0x{:04X}, boot section {} bytes",
        app_end - 1,
        FLASH_SIZE - app_end
    );
    println!(
        "  EEPROM:    {} by chip erase",
        if high.eeprom_preserved() {
            "preserved"
        } else {
            "cleared"
        }
    );
    Ok(())
}
