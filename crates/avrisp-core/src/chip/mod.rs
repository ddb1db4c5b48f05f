//! Target part definitions
//!
//! The programmer supports a single family with fixed geometry, so the
//! "database" is a handful of constants and two signatures.

mod fuses;
mod types;

pub use fuses::*;
pub use types::*;
