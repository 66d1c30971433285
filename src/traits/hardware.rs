//! Hardware abstraction traits for sensing, buttons and timing.
//!
//! This module defines the hardware interfaces the control loop polls once
//! per tick. Everything here is synchronous: the loop is single-threaded and
//! non-preemptive, so a blocking [`Delay`] freezes display and accumulation
//! for its duration.
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`PowerSensor`] | Voltage and current samples (INA219 or similar) |
//! | [`DigitalInput`] | Active-low push buttons |
//! | [`Clock`] | Wrapping 32-bit millisecond counter |
//! | [`Delay`] | Blocking millisecond delay |
//!
//! # Implementation
//!
//! For testing and desktop development, use the mock implementations
//! from [`crate::hal::mock`]. For boards with an `embedded-hal` 1.0 HAL, use
//! the adapters from `hal::embedded` (requires the `hardware` feature).
//!
//! # Example
//!
//! ```rust
//! use pd_adapter::traits::{Button, DigitalInput};
//! use pd_adapter::hal::{MockButtons, MockTime};
//!
//! let time = MockTime::new();
//! let mut buttons = MockButtons::new(&time);
//! assert!(buttons.read_pin(Button::Increase)); // released reads high
//!
//! buttons.hold(Button::Increase);
//! assert!(buttons.is_pressed(Button::Increase));
//! ```

/// One of the three front-panel buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Button {
    /// Clears the energy, charge and duration counters.
    Reset,
    /// Lowers the requested voltage by one step.
    Decrease,
    /// Raises the requested voltage by one step.
    Increase,
}

impl Button {
    /// All buttons in pin order (RST, DEC, INC).
    pub const ALL: [Button; 3] = [Button::Reset, Button::Decrease, Button::Increase];

    /// Returns the button name as a lowercase string.
    ///
    /// # Examples
    ///
    /// ```
    /// use pd_adapter::traits::Button;
    ///
    /// assert_eq!(Button::Reset.as_str(), "reset");
    /// assert_eq!(Button::Increase.as_str(), "increase");
    /// ```
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Button::Reset => "reset",
            Button::Decrease => "decrease",
            Button::Increase => "increase",
        }
    }
}

/// Digital input trait for the button pins.
///
/// Pins are wired with pull-ups, so a pressed button reads low.
/// [`read_pin`](Self::read_pin) returns the raw level; use
/// [`is_pressed`](Self::is_pressed) for the logical state.
pub trait DigitalInput {
    /// Returns the raw pin level (`true` = high = released).
    fn read_pin(&mut self, button: Button) -> bool;

    /// Returns true if the button is currently held down.
    fn is_pressed(&mut self, button: Button) -> bool {
        !self.read_pin(button)
    }
}

/// Voltage and current sensor trait.
///
/// Polled once per loop iteration. There is no error channel: implausible
/// current readings are clamped by the telemetry accumulator instead.
pub trait PowerSensor {
    /// Bus voltage in millivolts.
    fn read_voltage_mv(&mut self) -> u16;

    /// Load current in milliamps.
    ///
    /// A negative current on a shunt monitor shows up here as a very large
    /// unsigned value.
    fn read_current_ma(&mut self) -> u16;
}

/// Monotonic millisecond time source.
///
/// The counter is 32 bits wide and wraps silently after ~49.7 days; callers
/// must compute intervals with wrapping subtraction.
///
/// # Example
///
/// ```rust
/// use pd_adapter::traits::Clock;
/// use pd_adapter::hal::{MockClock, MockTime};
///
/// let time = MockTime::new();
/// let clock = MockClock::new(&time);
/// assert_eq!(clock.now_ms(), 0);
///
/// time.advance(100);
/// assert_eq!(clock.now_ms(), 100);
/// ```
pub trait Clock {
    /// Returns current time in milliseconds since an arbitrary epoch.
    fn now_ms(&self) -> u32;
}

/// Blocking delay trait.
///
/// Used for key-repeat throttling and negotiation pacing. The delay always
/// runs to completion; there is no cancellation.
pub trait Delay {
    /// Block for the specified number of milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Button Tests
    // =========================================================================

    #[test]
    fn button_names() {
        assert_eq!(Button::Reset.as_str(), "reset");
        assert_eq!(Button::Decrease.as_str(), "decrease");
        assert_eq!(Button::Increase.as_str(), "increase");
    }

    #[test]
    fn button_all_in_pin_order() {
        assert_eq!(
            Button::ALL,
            [Button::Reset, Button::Decrease, Button::Increase]
        );
    }

    // =========================================================================
    // DigitalInput Default Methods Tests
    // =========================================================================

    struct TestPins {
        levels: [bool; 3],
    }

    impl DigitalInput for TestPins {
        fn read_pin(&mut self, button: Button) -> bool {
            self.levels[button as usize]
        }
    }

    #[test]
    fn is_pressed_is_active_low() {
        let mut pins = TestPins {
            levels: [true, false, true],
        };
        assert!(!pins.is_pressed(Button::Reset));
        assert!(pins.is_pressed(Button::Decrease));
        assert!(!pins.is_pressed(Button::Increase));
    }
}
