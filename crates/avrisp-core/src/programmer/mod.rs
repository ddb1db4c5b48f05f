//! Programmer traits and abstractions
//!
//! This module defines the link trait that all programmer backends
//! implement to talk to the target.

pub mod bitbang;
mod traits;

pub use bitbang::BitbangIsp;
pub use traits::*;
