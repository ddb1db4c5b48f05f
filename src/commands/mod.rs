//! CLI command implementations
//!
//! Single-purpose commands (probe, dump, program, erase, fuses) open the
//! programmer, enter programming mode and refuse to go on unless the
//! signature is a supported part. The `session` command hands the whole
//! workflow to the core orchestrator instead.

pub mod fuses;
mod list;
pub mod memory;
pub mod probe;
mod progress;
pub mod session;

pub use list::list_programmers;
pub use progress::IndicatifProgress;

use avrisp_core::chip::DeviceSignature;
use avrisp_core::programmer::IspLink;
use avrisp_core::protocol::IspSession;
use avrisp_core::{memory as target, Error};

use crate::programmers::open_programmer;

/// Session over whichever programmer the CLI selected
pub type CliSession = IspSession<Box<dyn IspLink>>;

/// Open a programmer, enter programming mode and check the signature
pub fn open_target(
    programmer: &str,
) -> Result<(CliSession, DeviceSignature), Box<dyn std::error::Error>> {
    let link = open_programmer(programmer)?;
    let mut session = IspSession::new(link);
    session.begin()?;

    let signature = target::read_signature(&mut session)?;
    if !signature.is_supported() {
        return Err(Box::new(Error::UnsupportedSignature(signature.0)));
    }
    log::info!("Found {}", signature);
    Ok((session, signature))
}
