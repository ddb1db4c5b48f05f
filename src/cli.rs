//! CLI argument parsing

use crate::programmers;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Generate dynamic help text for the programmer argument
fn programmer_help() -> String {
    format!(
        "Programmer to use [available: {}]",
        programmers::programmer_names_short()
    )
}

#[derive(Parser)]
#[command(name = "avrisp")]
#[command(author, version, about = "AVR in-system programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Memory region selectable on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionArg {
    /// Program flash
    Flash,
    /// Data EEPROM
    Eeprom,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Enter programming mode and show the target signature and fuses
    Probe {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,
    },

    /// Back up the target, then program the input files found in a directory
    ///
    /// Writes fuses.bak, eeprom.bak and firmware.bak, then programs
    /// firmware.hex, eeprom.hex and fuses.txt if they exist.
    Session {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Directory holding the input and backup files
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Also write the lock byte from fuses.txt
        #[arg(long)]
        lock: bool,
    },

    /// Dump a memory region to an Intel HEX file
    Dump {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Region to dump
        #[arg(short, long, value_enum, default_value = "flash")]
        region: RegionArg,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Program a memory region from an Intel HEX file
    ///
    /// Programming flash erases the whole chip first.
    Program {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Region to program
        #[arg(short, long, value_enum, default_value = "flash")]
        region: RegionArg,

        /// Input HEX file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Erase flash and EEPROM, and clear the lock bits
    Erase {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,
    },

    /// Fuse and lock byte operations
    #[command(subcommand)]
    Fuses(FuseCommands),

    /// List supported programmers
    ListProgrammers,
}

#[derive(Subcommand)]
pub enum FuseCommands {
    /// Print the fuse and lock bytes
    Read {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,
    },

    /// Save the fuse and lock bytes to a text file
    Backup {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write the fuses from a text file
    Restore {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Input fuse file (LB:XX / L:XX;H:XX;E:XX)
        #[arg(short, long)]
        input: PathBuf,

        /// Also write the lock byte
        #[arg(long)]
        lock: bool,
    },
}
