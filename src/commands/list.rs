//! List commands implementation

use avrisp_core::chip::SUPPORTED_PARTS;

use crate::programmers::available_programmers;

/// List all programmers enabled in this build, and the parts they can program
pub fn list_programmers() {
    let programmers = available_programmers();
    if programmers.is_empty() {
        println!("No programmers available (recompile with programmer features enabled)");
        return;
    }

    println!("Supported programmers:");
    println!();
    for p in &programmers {
        if p.aliases.is_empty() {
            println!("  {:12} - {}", p.name, p.description);
        } else {
            println!(
                "  {:12} - {} (aliases: {})",
                p.name,
                p.description,
                p.aliases.join(", ")
            );
        }
    }

    println!();
    println!("Supported parts:");
    for part in SUPPORTED_PARTS {
        println!(
            "  {:12} {:02X} {:02X} {:02X}",
            part.name, part.signature[0], part.signature[1], part.signature[2]
        );
    }
}
