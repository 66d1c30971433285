//! Hardware Abstraction Layer implementations.
//!
//! This module contains concrete implementations of the traits
//! defined in [`crate::traits`].
//!
//! # Available Implementations
//!
//! - `mock`: Test implementations for desktop development
//! - `embedded`: `embedded-hal` 1.0 adapters for real boards (requires `hardware` feature)

pub mod mock;

#[cfg(feature = "hardware")]
pub mod embedded;

pub use mock::*;

#[cfg(feature = "hardware")]
pub use embedded::*;
