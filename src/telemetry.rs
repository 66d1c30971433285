//! Energy and charge accumulation from instantaneous samples.
//!
//! [`Telemetry`] integrates power and current over the time between loop
//! iterations. Integration uses integer division, so every tick truncates a
//! fraction of a microwatt-hour; this is accepted for a live readout.
//!
//! # Example
//!
//! ```rust
//! use pd_adapter::telemetry::{Sample, Telemetry};
//!
//! let mut telemetry = Telemetry::new(0);
//! let m = telemetry.tick(3_600_000, Sample::new(5000, 1000));
//!
//! assert_eq!(m.power_mw, 5000);
//! assert_eq!(telemetry.energy_uwh(), 5_000_000); // 5000 mWh
//! assert_eq!(telemetry.charge_uah(), 1_000_000); // 1000 mAh
//! assert_eq!(telemetry.elapsed_seconds(), 3600);
//! ```

/// Default ceiling above which a current sample is treated as no load.
pub const DEFAULT_CURRENT_CEILING_MA: u16 = 6000;

/// mW*ms per uWh (and mA*ms per uAh).
const MILLI_MS_PER_MICRO_HOUR: u64 = 3600;

/// Raw sensor reading for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    /// Bus voltage in millivolts.
    pub voltage_mv: u16,
    /// Load current in milliamps.
    pub current_ma: u16,
}

impl Sample {
    /// Build a sample.
    pub const fn new(voltage_mv: u16, current_ma: u16) -> Self {
        Self {
            voltage_mv,
            current_ma,
        }
    }

    /// This sample with current above `ceiling_ma` replaced by 0.
    ///
    /// A shunt monitor reports reverse current as a huge unsigned value;
    /// treating it as no load keeps the counters sane.
    pub const fn clamped(self, ceiling_ma: u16) -> Self {
        Self {
            voltage_mv: self.voltage_mv,
            current_ma: if self.current_ma > ceiling_ma {
                0
            } else {
                self.current_ma
            },
        }
    }

    /// Instantaneous power in milliwatts.
    pub const fn power_mw(self) -> u32 {
        self.voltage_mv as u32 * self.current_ma as u32 / 1000
    }
}

/// What one tick measured, after clamping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Measurement {
    /// Bus voltage in millivolts.
    pub voltage_mv: u16,
    /// Load current in milliamps (0 if the raw sample was implausible).
    pub current_ma: u16,
    /// Instantaneous power in milliwatts.
    pub power_mw: u32,
    /// Milliseconds since the previous tick.
    pub interval_ms: u32,
}

/// Running totals since power-on or the last reset.
///
/// Energy and charge only grow between resets. They saturate at `u32::MAX`
/// instead of wrapping.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Telemetry {
    last_ms: u32,
    elapsed_ms: u32,
    elapsed_seconds: u16,
    energy_uwh: u32,
    charge_uah: u32,
    current_ceiling_ma: u16,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Telemetry {
    /// Start accumulating with the clock currently at `now_ms`.
    pub fn new(now_ms: u32) -> Self {
        Self {
            last_ms: now_ms,
            elapsed_ms: 0,
            elapsed_seconds: 0,
            energy_uwh: 0,
            charge_uah: 0,
            current_ceiling_ma: DEFAULT_CURRENT_CEILING_MA,
        }
    }

    /// Set the current sanity ceiling.
    pub fn with_current_ceiling(mut self, ceiling_ma: u16) -> Self {
        self.current_ceiling_ma = ceiling_ma;
        self
    }

    /// Integrate one sample taken at `now_ms`.
    ///
    /// The interval since the previous tick uses wrapping subtraction, so a
    /// counter rollover between ticks still yields the true interval.
    pub fn tick(&mut self, now_ms: u32, sample: Sample) -> Measurement {
        let sample = sample.clamped(self.current_ceiling_ma);

        let interval_ms = now_ms.wrapping_sub(self.last_ms);
        self.last_ms = now_ms;
        self.elapsed_ms = self.elapsed_ms.wrapping_add(interval_ms);
        self.elapsed_seconds = (self.elapsed_ms / 1000) as u16;

        let power_mw = sample.power_mw();
        let interval = u64::from(interval_ms);
        let energy = interval * u64::from(power_mw) / MILLI_MS_PER_MICRO_HOUR;
        let charge = interval * u64::from(sample.current_ma) / MILLI_MS_PER_MICRO_HOUR;
        self.energy_uwh = saturating_accumulate(self.energy_uwh, energy);
        self.charge_uah = saturating_accumulate(self.charge_uah, charge);

        Measurement {
            voltage_mv: sample.voltage_mv,
            current_ma: sample.current_ma,
            power_mw,
            interval_ms,
        }
    }

    /// Zero duration, energy and charge.
    ///
    /// The previous tick time is kept, so the next interval is measured from
    /// the last sample rather than from zero.
    pub fn reset(&mut self) {
        self.elapsed_ms = 0;
        self.elapsed_seconds = 0;
        self.energy_uwh = 0;
        self.charge_uah = 0;
    }

    /// Total time since reset in milliseconds.
    pub fn elapsed_ms(&self) -> u32 {
        self.elapsed_ms
    }

    /// Total time since reset in whole seconds, truncated to 16 bits.
    pub fn elapsed_seconds(&self) -> u16 {
        self.elapsed_seconds
    }

    /// Energy since reset in microwatt-hours.
    pub fn energy_uwh(&self) -> u32 {
        self.energy_uwh
    }

    /// Charge since reset in microamp-hours.
    pub fn charge_uah(&self) -> u32 {
        self.charge_uah
    }

    /// Timestamp of the last tick.
    pub fn last_ms(&self) -> u32 {
        self.last_ms
    }
}

fn saturating_accumulate(total: u32, increment: u64) -> u32 {
    let increment = u32::try_from(increment).unwrap_or(u32::MAX);
    total.saturating_add(increment)
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Sample Tests
    // =========================================================================

    #[test]
    fn sample_power_widens() {
        assert_eq!(Sample::new(20000, 5000).power_mw(), 100_000);
        assert_eq!(Sample::new(u16::MAX, u16::MAX).power_mw(), 4_294_836);
    }

    #[test]
    fn sample_clamps_above_ceiling() {
        assert_eq!(Sample::new(5000, 7000).clamped(6000).current_ma, 0);
        assert_eq!(Sample::new(5000, 6000).clamped(6000).current_ma, 6000);
        assert_eq!(Sample::new(5000, 6001).clamped(6000).voltage_mv, 5000);
    }

    // =========================================================================
    // Accumulation Tests
    // =========================================================================

    #[test]
    fn one_hour_at_five_watts() {
        let mut t = Telemetry::new(0);
        for step in 1..=1000u32 {
            t.tick(step * 3600, Sample::new(5000, 1000));
        }
        assert_eq!(t.energy_uwh(), 5_000_000);
        assert_eq!(t.charge_uah(), 1_000_000);
        assert_eq!(t.elapsed_seconds(), 3600);
    }

    #[test]
    fn fine_ticks_truncate_downwards() {
        let mut t = Telemetry::new(0);
        for step in 1..=3600u32 {
            t.tick(step * 1000, Sample::new(5000, 1000));
        }
        assert!(t.energy_uwh() <= 5_000_000);
        assert!(t.energy_uwh() >= 4_990_000);
        assert_eq!(t.charge_uah(), 3600 * 277);
    }

    #[test]
    fn implausible_current_is_no_load() {
        let mut t = Telemetry::new(0);
        let m = t.tick(1000, Sample::new(5000, 7000));
        assert_eq!(m.current_ma, 0);
        assert_eq!(m.power_mw, 0);
        assert_eq!(t.energy_uwh(), 0);
        assert_eq!(t.charge_uah(), 0);
        assert_eq!(t.elapsed_ms(), 1000);
    }

    #[test]
    fn custom_ceiling() {
        let mut t = Telemetry::new(0).with_current_ceiling(3000);
        let m = t.tick(10, Sample::new(5000, 3001));
        assert_eq!(m.current_ma, 0);
    }

    #[test]
    fn totals_are_monotonic() {
        let mut t = Telemetry::new(0);
        let mut now = 0u32;
        let mut last = (0, 0);
        for i in 0..500u32 {
            now += 7 + i % 13;
            t.tick(now, Sample::new(3300 + (i as u16 * 37) % 17000, (i as u16 * 101) % 6500));
            assert!(t.energy_uwh() >= last.0);
            assert!(t.charge_uah() >= last.1);
            last = (t.energy_uwh(), t.charge_uah());
        }
    }

    #[test]
    fn totals_saturate() {
        let mut t = Telemetry::new(0);
        t.tick(u32::MAX, Sample::new(20000, 6000));
        let saturated = t.energy_uwh();
        assert_eq!(saturated, u32::MAX);
        t.tick(u32::MAX.wrapping_add(1000), Sample::new(20000, 6000));
        assert_eq!(t.energy_uwh(), u32::MAX);
    }

    #[test]
    fn interval_survives_clock_wrap() {
        let mut t = Telemetry::new(u32::MAX - 499);
        let m = t.tick(500, Sample::new(5000, 0));
        assert_eq!(m.interval_ms, 1000);
        assert_eq!(t.elapsed_seconds(), 1);
    }

    // =========================================================================
    // Reset Tests
    // =========================================================================

    #[test]
    fn reset_zeroes_totals() {
        let mut t = Telemetry::new(0);
        t.tick(10_000, Sample::new(12000, 2000));
        t.reset();
        assert_eq!(t.elapsed_ms(), 0);
        assert_eq!(t.elapsed_seconds(), 0);
        assert_eq!(t.energy_uwh(), 0);
        assert_eq!(t.charge_uah(), 0);
    }

    #[test]
    fn reset_keeps_last_tick_time() {
        let mut t = Telemetry::new(0);
        t.tick(10_000, Sample::new(5000, 1000));
        t.reset();
        assert_eq!(t.last_ms(), 10_000);
        let m = t.tick(12_000, Sample::new(5000, 1000));
        assert_eq!(m.interval_ms, 2000);
        assert_eq!(t.elapsed_ms(), 2000);
    }
}
