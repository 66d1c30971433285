//! What the two display lines show on each tick.
//!
//! The first line always reads `<requested> mV  <measured> mV`. The second
//! line cycles every four seconds through power, energy, charge and elapsed
//! time, followed by the measured current.
//!
//! The choice is recomputed from the elapsed seconds on every tick, so a
//! skipped tick never leaves a stale metric on screen.
//!
//! ```text
//! ┌────────────────┐
//! │ 9000mV   8987mV│
//! │ 4520mW    503mA│  (power, then energy, charge, time)
//! └────────────────┘
//! ```

use crate::font::{self, Glyph};
use crate::render::{TextRenderer, LINE_1, LINE_2};
use crate::telemetry::{Measurement, Telemetry};
use crate::traits::DisplayTransport;

/// Largest value a five digit field holds.
const FIELD_MAX: u32 = u16::MAX as u32;

/// Largest micro-unit total still shown in milli-units.
const MILLI_RANGE_MAX: u32 = FIELD_MAX * 1000;

/// Metric shown on the second line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DisplayMode {
    /// Instantaneous power.
    Power,
    /// Energy since reset.
    Energy,
    /// Charge since reset.
    Charge,
    /// Time since reset.
    Elapsed,
}

impl DisplayMode {
    /// Seconds each mode stays on screen.
    pub const DWELL_SECONDS: u16 = 4;

    /// Mode for the given elapsed time: bits 2-3 of the seconds count.
    ///
    /// # Examples
    ///
    /// ```
    /// use pd_adapter::scheduler::DisplayMode;
    ///
    /// assert_eq!(DisplayMode::for_seconds(0), DisplayMode::Power);
    /// assert_eq!(DisplayMode::for_seconds(5), DisplayMode::Energy);
    /// assert_eq!(DisplayMode::for_seconds(9), DisplayMode::Charge);
    /// assert_eq!(DisplayMode::for_seconds(15), DisplayMode::Elapsed);
    /// assert_eq!(DisplayMode::for_seconds(16), DisplayMode::Power);
    /// ```
    pub const fn for_seconds(seconds: u16) -> Self {
        match (seconds >> 2) & 0x03 {
            0 => DisplayMode::Power,
            1 => DisplayMode::Energy,
            2 => DisplayMode::Charge,
            _ => DisplayMode::Elapsed,
        }
    }
}

/// A value ready to draw on the second line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reading {
    /// A five digit field followed by a three cell unit.
    Scaled {
        /// Value in the chosen unit.
        value: u16,
        /// Unit glyphs, terminated.
        unit: &'static [Glyph],
    },
    /// `HH:MM:SS`.
    Clock {
        /// Whole hours.
        hours: u8,
        /// Minutes, 0-59.
        minutes: u8,
        /// Seconds, 0-59.
        seconds: u8,
    },
}

impl Reading {
    /// Pick the reading for `mode`.
    ///
    /// Values that would not fit five digits move to the next larger unit.
    pub fn select(mode: DisplayMode, telemetry: &Telemetry, power_mw: u32) -> Self {
        match mode {
            DisplayMode::Power => Self::power(power_mw),
            DisplayMode::Energy => Self::accumulated(
                telemetry.energy_uwh(),
                font::MILLIWATT_HOURS,
                font::WATT_HOURS,
            ),
            DisplayMode::Charge => Self::accumulated(
                telemetry.charge_uah(),
                font::MILLIAMP_HOURS,
                font::AMP_HOURS,
            ),
            DisplayMode::Elapsed => Self::elapsed(telemetry.elapsed_seconds()),
        }
    }

    /// Power in mW, or W above 65535 mW.
    pub fn power(power_mw: u32) -> Self {
        if power_mw > FIELD_MAX {
            Self::scaled(power_mw / 1000, font::WATTS)
        } else {
            Self::scaled(power_mw, font::MILLIWATTS)
        }
    }

    /// A micro-unit total in milli-units, or whole units above 65 535 000.
    pub fn accumulated(micro: u32, milli_unit: &'static [Glyph], unit: &'static [Glyph]) -> Self {
        if micro > MILLI_RANGE_MAX {
            Self::scaled(micro / 1_000_000, unit)
        } else {
            Self::scaled(micro / 1000, milli_unit)
        }
    }

    /// Elapsed seconds split into hours, minutes and seconds.
    pub fn elapsed(total_seconds: u16) -> Self {
        let rest = total_seconds % 3600;
        Self::Clock {
            hours: (total_seconds / 3600) as u8,
            minutes: (rest / 60) as u8,
            seconds: (rest % 60) as u8,
        }
    }

    fn scaled(value: u32, unit: &'static [Glyph]) -> Self {
        Self::Scaled {
            value: u16::try_from(value).unwrap_or(u16::MAX),
            unit,
        }
    }

    /// Draw at the current cursor position. Always eight cells wide.
    pub fn draw<T: DisplayTransport>(&self, renderer: &mut TextRenderer<T>) {
        match *self {
            Reading::Scaled { value, unit } => {
                renderer.draw_int(value);
                renderer.draw_str(unit);
            }
            Reading::Clock {
                hours,
                minutes,
                seconds,
            } => {
                let zero = Glyph::digit(0);
                renderer.draw_two_digit(hours, zero);
                renderer.draw_char(Glyph::COLON);
                renderer.draw_two_digit(minutes, zero);
                renderer.draw_char(Glyph::COLON);
                renderer.draw_two_digit(seconds, zero);
            }
        }
    }
}

/// Draw both status lines.
///
/// Line 1: requested and measured voltage. Line 2: the metric for the
/// current four second window and the measured current.
pub fn draw_status<T: DisplayTransport>(
    renderer: &mut TextRenderer<T>,
    requested_mv: u16,
    measurement: &Measurement,
    telemetry: &Telemetry,
) {
    renderer.set_cursor(0, LINE_1);
    renderer.draw_int(requested_mv);
    renderer.draw_str(font::MILLIVOLTS);
    renderer.draw_char(Glyph::SPACE);
    renderer.draw_char(Glyph::SPACE);
    renderer.draw_int(measurement.voltage_mv);
    renderer.draw_str(font::MILLIVOLTS);

    renderer.set_cursor(0, LINE_2);
    let mode = DisplayMode::for_seconds(telemetry.elapsed_seconds());
    Reading::select(mode, telemetry, measurement.power_mw).draw(renderer);
    renderer.draw_char(Glyph::SPACE);
    renderer.draw_int(measurement.current_ma);
    renderer.draw_str(font::MILLIAMPS);
}
