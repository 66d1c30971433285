//! Control loop configuration.
//!
//! Every constant the loop uses lives here so a board or the simulator can
//! tune it without touching the loop itself. The defaults reproduce the
//! stock adapter firmware.
//!
//! # Example
//!
//! ```rust
//! use pd_adapter::config::AdapterConfig;
//!
//! // Use defaults
//! let config = AdapterConfig::default();
//! assert_eq!(config.step_mv, 20);
//!
//! // Or customize
//! let config = AdapterConfig::default()
//!     .with_step_mv(100)
//!     .with_renegotiate_every(4);
//! ```

use crate::telemetry::DEFAULT_CURRENT_CEILING_MA;

/// Loop constants for [`PdAdapter`](crate::adapter::PdAdapter).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AdapterConfig {
    /// Initial requested voltage and starting point of the discovered bounds (mV)
    pub default_mv: u16,
    /// Voltage change per button step (mV)
    pub step_mv: u16,
    /// Settle polls allowed after an adjustment before the next step
    pub key_repeat_budget: u8,
    /// Blocking delay used for settling and request pacing (ms)
    pub poll_interval_ms: u32,
    /// Current samples above this are treated as no load (mA)
    pub current_ceiling_ma: u16,
    /// Renegotiate on every Nth settled adjustment (0 behaves as 1)
    pub renegotiate_every: u8,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            default_mv: 5000,
            step_mv: 20,
            key_repeat_budget: 50,
            poll_interval_ms: 10,
            current_ceiling_ma: DEFAULT_CURRENT_CEILING_MA,
            renegotiate_every: 1,
        }
    }
}

impl AdapterConfig {
    /// Set the initial requested voltage
    pub fn with_default_mv(mut self, mv: u16) -> Self {
        self.default_mv = mv;
        self
    }

    /// Set the voltage step
    pub fn with_step_mv(mut self, mv: u16) -> Self {
        self.step_mv = mv;
        self
    }

    /// Set the key repeat budget
    pub fn with_key_repeat_budget(mut self, polls: u8) -> Self {
        self.key_repeat_budget = polls;
        self
    }

    /// Set the poll interval
    pub fn with_poll_interval_ms(mut self, ms: u32) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set the current sanity ceiling
    pub fn with_current_ceiling_ma(mut self, ma: u16) -> Self {
        self.current_ceiling_ma = ma;
        self
    }

    /// Set the renegotiation cadence
    pub fn with_renegotiate_every(mut self, every: u8) -> Self {
        self.renegotiate_every = every.max(1);
        self
    }

    /// Longest a single held-button step can block (ms)
    pub fn max_settle_ms(&self) -> u32 {
        u32::from(self.key_repeat_budget) * self.poll_interval_ms
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = AdapterConfig::default();
        assert_eq!(config.default_mv, 5000);
        assert_eq!(config.step_mv, 20);
        assert_eq!(config.key_repeat_budget, 50);
        assert_eq!(config.poll_interval_ms, 10);
        assert_eq!(config.current_ceiling_ma, 6000);
        assert_eq!(config.renegotiate_every, 1);
    }

    #[test]
    fn builder_pattern() {
        let config = AdapterConfig::default()
            .with_default_mv(9000)
            .with_step_mv(50)
            .with_key_repeat_budget(10)
            .with_poll_interval_ms(5)
            .with_current_ceiling_ma(3000)
            .with_renegotiate_every(3);

        assert_eq!(config.default_mv, 9000);
        assert_eq!(config.step_mv, 50);
        assert_eq!(config.key_repeat_budget, 10);
        assert_eq!(config.poll_interval_ms, 5);
        assert_eq!(config.current_ceiling_ma, 3000);
        assert_eq!(config.renegotiate_every, 3);
    }

    #[test]
    fn renegotiate_every_zero_is_one() {
        let config = AdapterConfig::default().with_renegotiate_every(0);
        assert_eq!(config.renegotiate_every, 1);
    }

    #[test]
    fn max_settle() {
        assert_eq!(AdapterConfig::default().max_settle_ms(), 500);
    }
}
