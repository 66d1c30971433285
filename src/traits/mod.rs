//! Trait definitions for the adapter's external collaborators.
//!
//! This module defines the seams that let the control loop run on the
//! device or on a desktop with mocks:
//!
//! # Submodules
//!
//! - `hardware`: sensor, buttons, clock and delay
//! - `display`: byte-level transport to the OLED controller
//! - `pd`: USB Power Delivery sink stack
//!
//! # Hardware Abstraction
//!
//! - [`PowerSensor`]: voltage/current samples
//! - [`DigitalInput`]: active-low buttons
//! - [`Clock`]: wrapping millisecond counter
//! - [`Delay`]: blocking delay
//! - [`DisplayTransport`]: command/data sessions to the display
//! - [`PowerDelivery`]: capability discovery and voltage requests

pub mod display;
pub mod hardware;
pub mod pd;

pub use display::*;
pub use hardware::*;
pub use pd::*;
