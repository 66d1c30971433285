//! # pd-adapter
//!
//! Firmware core for a handheld USB Power Delivery PPS adapter: it negotiates
//! a programmable voltage from a PD charger, shows live telemetry on a small
//! OLED and lets the user trim the voltage with two buttons.
//!
//! ## Features
//!
//! - **Hardware abstraction**: Traits for the display bus, sensor, PD stack, buttons and timing
//! - **Self-contained text rendering**: 5x16 bitmap font drawn straight to SSD1306 RAM
//! - **Energy and charge metering**: Overflow-safe integration with automatic unit promotion
//! - **Cycling second line**: Power, energy, charge and elapsed time, four seconds each
//! - **Button control**: 20 mV steps with key-repeat settling, clamped to the source's PPS range
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - External collaborator abstractions
//! - `font` - Glyph table and unit strings
//! - `render` - Text renderer over a display transport
//! - `telemetry` - Energy/charge accumulator
//! - `scheduler` - What the display shows on each tick
//! - `input` - Button handling and voltage selection
//! - `adapter` - Main loop that ties everything together
//! - `hal` - Concrete implementations (mock for testing, `embedded-hal` for boards)
//!
//! ## Example
//!
//! ```rust
//! use pd_adapter::{
//!     AdapterConfig, PdAdapter, Peripherals,
//!     hal::{MockButtons, MockClock, MockDelay, MockDisplay, MockPd, MockSensor, MockTime},
//!     traits::Button,
//! };
//!
//! let time = MockTime::new();
//! let peripherals = Peripherals {
//!     display: MockDisplay::new(),
//!     sensor: MockSensor::new(9000, 500),
//!     pd: MockPd::pps(3300, 11000),
//!     clock: MockClock::new(&time),
//!     delay: MockDelay::new(&time),
//!     buttons: MockButtons::new(&time),
//! };
//!
//! let mut adapter = PdAdapter::new(AdapterConfig::default(), peripherals);
//! adapter.start().unwrap();
//!
//! // Tap INC once
//! adapter.buttons_mut().press_for(Button::Increase, 30);
//! adapter.tick();
//! assert_eq!(adapter.status().requested_mv, 5020);
//!
//! // Steady state: the held voltage is requested every tick
//! adapter.run_for(5);
//! assert_eq!(adapter.pd().last_request(), Some(5020));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

/// Main control loop, startup discovery and loop state.
pub mod adapter;
/// Loop configuration.
pub mod config;
/// Bitmap font and glyph strings.
pub mod font;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Button handling and requested-voltage selection.
pub mod input;
/// Text renderer for the SSD1306.
pub mod render;
/// Display line scheduling and unit selection.
pub mod scheduler;
/// Energy and charge accumulation.
pub mod telemetry;
/// Core traits for the adapter's external collaborators.
pub mod traits;

// Re-exports for convenience
pub use adapter::{
    AdapterState, AdapterStatus, PdAdapter, Peripherals, Phase, PpsRange, SourceCapabilities,
    StartupError,
};
pub use config::AdapterConfig;
pub use font::Glyph;
pub use input::{Adjustment, ButtonState, InputController, KeyRepeat, VoltageSelection};
pub use render::TextRenderer;
pub use scheduler::{DisplayMode, Reading};
pub use telemetry::{Measurement, Sample, Telemetry};
pub use traits::{
    Button, Clock, Delay, DigitalInput, DisplayTransport, PowerDelivery, PowerSensor,
    TransportMode,
};
