//! Serial programming protocol
//!
//! This module contains the 4-byte command framing, the programming-enable
//! synchronisation loop and the session state machine built on top of an
//! [`IspLink`](crate::programmer::IspLink).

mod isp;
pub mod opcodes;

pub use isp::*;
