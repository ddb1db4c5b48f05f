//! Man page generator for avrisp
//!
//! Usage: cargo run --bin gen-manpage -- [output-dir]
//!
//! Writes `avrisp.1` plus one `avrisp-<command>.1` page per subcommand.

use clap::{Command, CommandFactory};
use std::fs;
use std::path::PathBuf;

#[path = "../cli.rs"]
mod cli;
#[allow(dead_code)]
#[path = "../programmers.rs"]
mod programmers;

/// Pages to render as (page name, command), the top-level page first
fn pages(cmd: &Command) -> Vec<(String, Command)> {
    let name = cmd.get_name().to_string();
    let mut pages = vec![(name.clone(), cmd.clone())];
    for sub in cmd.get_subcommands().filter(|sub| !sub.is_hide_set()) {
        pages.push((format!("{}-{}", name, sub.get_name()), sub.clone()));
    }
    pages
}

fn main() -> std::io::Result<()> {
    let output_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));
    fs::create_dir_all(&output_dir)?;

    for (page, command) in pages(&cli::Cli::command()) {
        let mut buffer = Vec::new();
        let man = clap_mangen::Man::new(command).title(page.to_uppercase());
        man.render(&mut buffer)?;

        let output_path = output_dir.join(format!("{}.1", page));
        fs::write(&output_path, buffer)?;
        println!("{}", output_path.display());
    }
    Ok(())
}
