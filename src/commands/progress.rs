//! Terminal progress display for programming and dump passes

use std::time::Duration;

use avrisp_core::chip::MemoryRegion;
use avrisp_core::orchestrator::{PassProgress, PassStats};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Create a progress bar for a byte range with a phase suffix
fn create_progress_bar_with_phase(
    total: u64,
    phase: &str,
) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} ({{eta}}) {}",
                phase
            ))?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn create_spinner_style() -> Result<ProgressStyle, Box<dyn std::error::Error>> {
    Ok(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?)
}

/// Progress reporter backed by indicatif
pub struct IndicatifProgress {
    multi: MultiProgress,
    current_bar: Option<ProgressBar>,
    phase: String,
}

impl IndicatifProgress {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            current_bar: None,
            phase: String::new(),
        }
    }

    fn create_bar(&mut self, total: u64, phase: String) {
        self.finish();
        let pb = self.multi.add(
            create_progress_bar_with_phase(total, &phase)
                .unwrap_or_else(|_| ProgressBar::new(total)),
        );
        self.phase = phase;
        self.current_bar = Some(pb);
    }

    fn create_spinner(&mut self, message: String) {
        self.finish();
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(create_spinner_style().unwrap_or_else(|_| ProgressStyle::default_spinner()));
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        self.phase = String::from("Erase");
        self.current_bar = Some(pb);
    }

    fn finish(&mut self) {
        if let Some(pb) = self.current_bar.take() {
            pb.finish_with_message(format!("{} complete", self.phase));
        }
    }
}

impl Default for IndicatifProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl PassProgress for IndicatifProgress {
    fn erasing(&mut self) {
        self.create_spinner("Erasing chip...".to_string());
    }

    fn programming(&mut self, region: MemoryRegion) {
        self.create_bar(region.size() as u64, format!("Programming {}", region));
    }

    fn dumping(&mut self, region: MemoryRegion, total: usize) {
        self.create_bar(total as u64, format!("Reading {}", region));
    }

    fn progress(&mut self, address: usize) {
        if let Some(pb) = &self.current_bar {
            pb.set_position(address as u64);
        }
    }

    fn complete(&mut self, stats: &PassStats) {
        self.finish();
        if stats.lines_emitted > 0 {
            println!("{} HEX lines written", stats.lines_emitted);
        } else {
            println!(
                "{} records, {} pages ({} bytes) written and verified",
                stats.records, stats.pages_written, stats.bytes_written
            );
        }
    }
}
