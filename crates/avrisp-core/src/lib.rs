//! avrisp-core - Core library for AVR in-system programming
//!
//! This crate provides everything needed to program an ATmega328-family
//! part over its serial programming interface: the bit-level link, the
//! 4-byte ISP command protocol, typed flash/EEPROM/fuse access, an Intel HEX
//! codec and the passes that turn a HEX stream into verified page writes
//! (and back again for backups). It is `no_std` compatible so the same code
//! can run on a host or on a stand-alone programmer board.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`)
//! - `alloc` - Enable `Box<dyn IspLink>` and `Vec<u8>` sinks
//!
//! # Example
//!
//! ```ignore
//! use avrisp_core::{memory, orchestrator, protocol::IspSession};
//!
//! fn flash<L: avrisp_core::programmer::IspLink>(link: L, hex: &[u8]) -> avrisp_core::Result<()> {
//!     let mut session = IspSession::new(link);
//!     session.begin()?;
//!     let signature = memory::read_signature(&mut session)?;
//!     println!("Found: {}", signature);
//!     let mut source = hex;
//!     orchestrator::program_flash(&mut session, &mut source, &mut orchestrator::NoProgress)?;
//!     session.release();
//!     Ok(())
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod chip;
pub mod error;
pub mod hex;
pub mod io;
pub mod memory;
pub mod orchestrator;
pub mod programmer;
pub mod protocol;

pub use error::{Error, ParseError, Result};
