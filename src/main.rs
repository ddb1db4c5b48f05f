//! avrisp - AVR in-system programmer
//!
//! Programs ATmega328P-class targets over the serial programming interface
//! (SCK/MOSI/MISO plus RESET) and keeps a backup of everything it replaces.
//!
//! # Architecture
//!
//! - **avrisp-core** holds the protocol, the Intel HEX codec and every
//!   programming pass. It only talks to an `IspLink` and to byte streams.
//! - **Programmer crates** (dummy, linux_gpio) provide the `IspLink`.
//! - **This binary** maps CLI commands onto core passes, with files on disk
//!   standing in for the programmer's removable card.

mod cli;
mod commands;
mod programmers;
mod storage;

use clap::Parser;
use cli::{Cli, Commands, FuseCommands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match cli.command {
        Commands::Probe { programmer } => commands::probe::run_probe(&programmer),
        Commands::Session {
            programmer,
            dir,
            lock,
        } => commands::session::run(&programmer, &dir, lock),
        Commands::Dump {
            programmer,
            region,
            output,
        } => commands::memory::run_dump(&programmer, region, &output),
        Commands::Program {
            programmer,
            region,
            input,
        } => commands::memory::run_program(&programmer, region, &input),
        Commands::Erase { programmer } => commands::memory::run_erase(&programmer),
        Commands::Fuses(subcmd) => match subcmd {
            FuseCommands::Read { programmer } => commands::fuses::run_read(&programmer),
            FuseCommands::Backup { programmer, output } => {
                commands::fuses::run_backup(&programmer, &output)
            }
            FuseCommands::Restore {
                programmer,
                input,
                lock,
            } => commands::fuses::run_restore(&programmer, &input, lock),
        },
        Commands::ListProgrammers => {
            commands::list_programmers();
            Ok(())
        }
    }
}
