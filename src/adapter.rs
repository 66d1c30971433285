//! Main control loop that ties everything together.
//!
//! This module provides [`PdAdapter`], which owns the hardware collaborators
//! and the loop state and runs one iteration per [`tick`](PdAdapter::tick).
//!
//! # Overview
//!
//! Startup:
//! - Initialize and clear the display
//! - Connect to the PD source and read its programmable ranges
//! - Show "NO PPS" and stop if there is no programmable supply
//!
//! Every tick:
//! - Sample voltage and current, advance the energy/charge counters
//! - Service the buttons (reset, increase, decrease)
//! - Redraw both display lines
//! - Either wait out a button adjustment (and renegotiate), or re-request
//!   the held voltage and pause for one poll interval
//!
//! # Example
//!
//! ```rust
//! use pd_adapter::{AdapterConfig, PdAdapter, Peripherals};
//! use pd_adapter::hal::{
//!     MockButtons, MockClock, MockDelay, MockDisplay, MockPd, MockSensor, MockTime,
//! };
//!
//! let time = MockTime::new();
//! let peripherals = Peripherals {
//!     display: MockDisplay::new(),
//!     sensor: MockSensor::new(5000, 1000),
//!     pd: MockPd::pps(3300, 11000),
//!     clock: MockClock::new(&time),
//!     delay: MockDelay::new(&time),
//!     buttons: MockButtons::new(&time),
//! };
//!
//! let mut adapter = PdAdapter::new(AdapterConfig::default(), peripherals);
//! adapter.start().unwrap();
//! adapter.run_for(10);
//!
//! assert_eq!(adapter.display().line_text(0), " 5000mV   5000mV");
//! assert_eq!(adapter.pd().last_request(), Some(5000));
//! ```
//!
//! # Startup Fault
//!
//! ```rust
//! use pd_adapter::{AdapterConfig, PdAdapter, Peripherals, StartupError};
//! use pd_adapter::hal::{
//!     MockButtons, MockClock, MockDelay, MockDisplay, MockPd, MockSensor, MockTime,
//! };
//!
//! let time = MockTime::new();
//! let peripherals = Peripherals {
//!     display: MockDisplay::new(),
//!     sensor: MockSensor::new(5000, 0),
//!     pd: MockPd::fixed_only(),
//!     clock: MockClock::new(&time),
//!     delay: MockDelay::new(&time),
//!     buttons: MockButtons::new(&time),
//! };
//!
//! let mut adapter = PdAdapter::new(AdapterConfig::default(), peripherals);
//! assert_eq!(adapter.start(), Err(StartupError::NoProgrammableSource));
//! assert_eq!(adapter.display().text_at(1, 36, 6), "N0 PP5");
//! assert!(adapter.tick().is_none());
//! ```

use core::fmt;

use heapless::Vec;
use log::{debug, info, warn};

use crate::config::AdapterConfig;
use crate::font;
use crate::input::{InputController, KeyRepeat, RenegotiationCounter, VoltageSelection};
use crate::render::TextRenderer;
use crate::scheduler::{self, DisplayMode};
use crate::telemetry::{Measurement, Sample, Telemetry};
use crate::traits::{Clock, Delay, DigitalInput, DisplayTransport, PowerDelivery, PowerSensor};

/// Column of the "NO PPS" message.
pub const FAULT_COLUMN: u8 = 36;

/// Page of the "NO PPS" message (straddles both text lines).
pub const FAULT_PAGE: u8 = 1;

/// Most source objects one capabilities message can carry.
const MAX_SOURCE_OBJECTS: usize = 7;

// ============================================================================
// Startup Errors
// ============================================================================

/// Why the adapter could not start.
///
/// Both are fatal: the device shows "NO PPS" and must be power cycled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StartupError {
    /// No PD source answered.
    ConnectFailed,
    /// The source offers only fixed supplies.
    NoProgrammableSource,
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::ConnectFailed => write!(f, "no USB PD source connected"),
            StartupError::NoProgrammableSource => {
                write!(f, "source offers no programmable (PPS) supply")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for StartupError {}

// ============================================================================
// Source Capabilities
// ============================================================================

/// One programmable supply advertised by the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PpsRange {
    /// 1-based object position.
    pub position: u8,
    /// Lowest voltage in millivolts.
    pub min_mv: u16,
    /// Highest voltage in millivolts.
    pub max_mv: u16,
}

/// The programmable supplies found at startup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceCapabilities {
    ranges: Vec<PpsRange, MAX_SOURCE_OBJECTS>,
}

impl SourceCapabilities {
    /// Most source objects one capabilities message can carry.
    pub const MAX_OBJECTS: usize = MAX_SOURCE_OBJECTS;

    /// Connect and read every programmable range.
    pub fn discover<P: PowerDelivery>(pd: &mut P) -> Result<Self, StartupError> {
        if !pd.connect() {
            return Err(StartupError::ConnectFailed);
        }
        if pd.programmable_source_count() == 0 {
            return Err(StartupError::NoProgrammableSource);
        }

        let mut ranges = Vec::new();
        for position in pd.programmable_positions() {
            let range = PpsRange {
                position,
                min_mv: pd.min_voltage_mv(position),
                max_mv: pd.max_voltage_mv(position),
            };
            if ranges.push(range).is_err() {
                warn!("ignoring source objects from position {}", position);
                break;
            }
        }
        Ok(Self { ranges })
    }

    /// Discovered ranges in position order.
    pub fn ranges(&self) -> &[PpsRange] {
        &self.ranges
    }

    /// Smallest interval containing `start_mv` and every range.
    pub fn bounds(&self, start_mv: u16) -> (u16, u16) {
        self.ranges
            .iter()
            .fold((start_mv, start_mv), |(min, max), range| {
                (min.min(range.min_mv), max.max(range.max_mv))
            })
    }
}

// ============================================================================
// Loop State
// ============================================================================

/// Everything the loop mutates between ticks.
#[derive(Clone, Debug)]
pub struct AdapterState {
    /// Energy, charge and time counters.
    pub telemetry: Telemetry,
    /// Requested voltage and its bounds.
    pub selection: VoltageSelection,
    /// Key repeat bookkeeping.
    pub keys: KeyRepeat,
    /// Settled adjustments until the next renegotiation.
    pub renegotiation: RenegotiationCounter,
    /// What the last tick measured.
    pub last: Measurement,
    reset_held: bool,
}

impl AdapterState {
    /// State before discovery: bounds collapsed on the default voltage.
    pub fn new(config: &AdapterConfig, now_ms: u32) -> Self {
        Self {
            telemetry: Telemetry::new(now_ms).with_current_ceiling(config.current_ceiling_ma),
            selection: VoltageSelection::new(config.default_mv, config.default_mv, config.default_mv),
            keys: KeyRepeat::new(config.key_repeat_budget),
            renegotiation: RenegotiationCounter::new(config.renegotiate_every),
            last: Measurement::default(),
            reset_held: false,
        }
    }
}

/// Where the adapter is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Created, [`PdAdapter::start`] not called yet.
    Idle,
    /// Capabilities discovered, ticking.
    Running,
    /// Startup failed; nothing more will happen.
    Faulted(StartupError),
}

/// Snapshot of the adapter for UIs and logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdapterStatus {
    /// Requested voltage (mV)
    pub requested_mv: u16,
    /// Lowest selectable voltage (mV)
    pub min_mv: u16,
    /// Highest selectable voltage (mV)
    pub max_mv: u16,
    /// Measured voltage (mV)
    pub voltage_mv: u16,
    /// Measured current (mA)
    pub current_ma: u16,
    /// Instantaneous power (mW)
    pub power_mw: u32,
    /// Energy since reset (uWh)
    pub energy_uwh: u32,
    /// Charge since reset (uAh)
    pub charge_uah: u32,
    /// Seconds since reset
    pub elapsed_seconds: u16,
    /// Metric currently on the second line
    pub mode: DisplayMode,
}

// ============================================================================
// Adapter
// ============================================================================

/// The hardware collaborators the loop drives.
pub struct Peripherals<T, S, P, C, D, B> {
    /// Display transport.
    pub display: T,
    /// Voltage/current sensor.
    pub sensor: S,
    /// USB PD sink stack.
    pub pd: P,
    /// Millisecond clock.
    pub clock: C,
    /// Blocking delay.
    pub delay: D,
    /// RST/DEC/INC buttons.
    pub buttons: B,
}

/// The adapter's main loop.
///
/// # Type Parameters
///
/// - `T`: display transport ([`DisplayTransport`])
/// - `S`: voltage/current sensor ([`PowerSensor`])
/// - `P`: PD sink stack ([`PowerDelivery`])
/// - `C`: clock ([`Clock`])
/// - `D`: blocking delay ([`Delay`])
/// - `B`: buttons ([`DigitalInput`])
pub struct PdAdapter<T: DisplayTransport, S, P, C, D, B> {
    config: AdapterConfig,
    input: InputController,
    renderer: TextRenderer<T>,
    sensor: S,
    pd: P,
    clock: C,
    delay: D,
    buttons: B,
    capabilities: SourceCapabilities,
    state: AdapterState,
    phase: Phase,
}

impl<T, S, P, C, D, B> PdAdapter<T, S, P, C, D, B>
where
    T: DisplayTransport,
    S: PowerSensor,
    P: PowerDelivery,
    C: Clock,
    D: Delay,
    B: DigitalInput,
{
    /// Create an adapter. No hardware is touched until [`start`](Self::start).
    pub fn new(config: AdapterConfig, peripherals: Peripherals<T, S, P, C, D, B>) -> Self {
        let Peripherals {
            display,
            sensor,
            pd,
            clock,
            delay,
            buttons,
        } = peripherals;
        let state = AdapterState::new(&config, clock.now_ms());
        Self {
            input: InputController::new(&config),
            config,
            renderer: TextRenderer::new(display),
            sensor,
            pd,
            clock,
            delay,
            buttons,
            capabilities: SourceCapabilities::default(),
            state,
            phase: Phase::Idle,
        }
    }

    /// Bring up the display and negotiate with the source.
    ///
    /// On failure "NO PPS" is drawn and the adapter stays faulted: later
    /// ticks do nothing. On the device follow up with [`halt`](Self::halt).
    /// Once running, further calls return `Ok(())` and leave the bounds and
    /// counters as they are.
    pub fn start(&mut self) -> Result<(), StartupError> {
        match self.phase {
            Phase::Faulted(err) => return Err(err),
            Phase::Running => return Ok(()),
            Phase::Idle => {}
        }

        self.renderer.init();
        self.renderer.clear_screen();

        let capabilities = match SourceCapabilities::discover(&mut self.pd) {
            Ok(capabilities) => capabilities,
            Err(err) => {
                warn!("startup failed: {}", err);
                self.renderer.set_cursor(FAULT_COLUMN, FAULT_PAGE);
                self.renderer.draw_str(font::NO_PPS);
                self.phase = Phase::Faulted(err);
                return Err(err);
            }
        };

        for range in capabilities.ranges() {
            info!(
                "PPS object {}: {}-{} mV",
                range.position, range.min_mv, range.max_mv
            );
        }
        let (min_mv, max_mv) = capabilities.bounds(self.config.default_mv);
        info!("voltage range {}-{} mV", min_mv, max_mv);

        self.state = AdapterState::new(&self.config, self.clock.now_ms());
        self.state.selection = VoltageSelection::new(self.config.default_mv, min_mv, max_mv);
        self.capabilities = capabilities;
        self.phase = Phase::Running;
        Ok(())
    }

    /// Run one loop iteration.
    ///
    /// Returns what was measured, or `None` if the adapter is not running.
    pub fn tick(&mut self) -> Option<Measurement> {
        if self.phase != Phase::Running {
            return None;
        }

        let sample = Sample::new(self.sensor.read_voltage_mv(), self.sensor.read_current_ma());
        let measurement = self.state.telemetry.tick(self.clock.now_ms(), sample);

        let action = self.input.poll(
            &mut self.buttons,
            &mut self.state.selection,
            &mut self.state.keys,
        );
        if action.reset {
            if !self.state.reset_held {
                debug!(
                    "counters reset after {} s, {} uWh",
                    self.state.telemetry.elapsed_seconds(),
                    self.state.telemetry.energy_uwh()
                );
            }
            self.state.telemetry.reset();
        }
        self.state.reset_held = action.reset;

        scheduler::draw_status(
            &mut self.renderer,
            self.state.selection.requested_mv(),
            &measurement,
            &self.state.telemetry,
        );

        let settled = self
            .input
            .settle(&mut self.buttons, &mut self.delay, &mut self.state.keys);
        if settled {
            if self.state.renegotiation.settled() {
                debug!(
                    "renegotiating at {} mV",
                    self.state.selection.requested_mv()
                );
                self.pd.renegotiate();
            }
        } else {
            self.pd.request_voltage(self.state.selection.requested_mv());
            self.input.pace(&mut self.delay);
        }

        self.state.last = measurement;
        Some(measurement)
    }

    /// Run up to `ticks` iterations. Returns how many actually ran.
    pub fn run_for(&mut self, ticks: usize) -> usize {
        (0..ticks).take_while(|_| self.tick().is_some()).count()
    }

    /// Tick forever. Halts if the adapter is not running.
    pub fn run(&mut self) -> ! {
        loop {
            if self.tick().is_none() {
                self.halt();
            }
        }
    }

    /// Stop doing anything. The display keeps its last contents.
    pub fn halt(&mut self) -> ! {
        loop {
            self.delay.delay_ms(self.config.poll_interval_ms);
        }
    }

    /// Current snapshot.
    pub fn status(&self) -> AdapterStatus {
        let telemetry = &self.state.telemetry;
        AdapterStatus {
            requested_mv: self.state.selection.requested_mv(),
            min_mv: self.state.selection.min_mv(),
            max_mv: self.state.selection.max_mv(),
            voltage_mv: self.state.last.voltage_mv,
            current_ma: self.state.last.current_ma,
            power_mw: self.state.last.power_mw,
            energy_uwh: telemetry.energy_uwh(),
            charge_uah: telemetry.charge_uah(),
            elapsed_seconds: telemetry.elapsed_seconds(),
            mode: DisplayMode::for_seconds(telemetry.elapsed_seconds()),
        }
    }

    /// Lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Loop state.
    pub fn state(&self) -> &AdapterState {
        &self.state
    }

    /// Ranges found at startup (empty before a successful start).
    pub fn capabilities(&self) -> &SourceCapabilities {
        &self.capabilities
    }

    /// Configuration in use.
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Display transport.
    pub fn display(&self) -> &T {
        self.renderer.transport()
    }

    /// Mutable display transport.
    pub fn display_mut(&mut self) -> &mut T {
        self.renderer.transport_mut()
    }

    /// Sensor.
    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    /// Mutable sensor.
    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    /// PD stack.
    pub fn pd(&self) -> &P {
        &self.pd
    }

    /// Mutable PD stack.
    pub fn pd_mut(&mut self) -> &mut P {
        &mut self.pd
    }

    /// Mutable buttons.
    pub fn buttons_mut(&mut self) -> &mut B {
        &mut self.buttons
    }

    /// Delay.
    pub fn delay(&self) -> &D {
        &self.delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{
        MockButtons, MockClock, MockDelay, MockDisplay, MockPd, MockSensor, MockTime,
    };
    use crate::traits::Button;

    type TestAdapter =
        PdAdapter<MockDisplay, MockSensor, MockPd, MockClock, MockDelay, MockButtons>;

    fn adapter(pd: MockPd, sensor: MockSensor) -> (TestAdapter, MockTime) {
        adapter_with(AdapterConfig::default(), pd, sensor)
    }

    fn adapter_with(config: AdapterConfig, pd: MockPd, sensor: MockSensor) -> (TestAdapter, MockTime) {
        let time = MockTime::new();
        let peripherals = Peripherals {
            display: MockDisplay::new(),
            sensor,
            pd,
            clock: MockClock::new(&time),
            delay: MockDelay::new(&time),
            buttons: MockButtons::new(&time),
        };
        (PdAdapter::new(config, peripherals), time)
    }

    // =========================================================================
    // Capability Tests
    // =========================================================================

    #[test]
    fn discover_reads_programmable_positions() {
        let mut pd = MockPd::pps(3300, 11000).with_range(3300, 21000);
        let caps = SourceCapabilities::discover(&mut pd).unwrap();
        assert_eq!(
            caps.ranges(),
            &[
                PpsRange {
                    position: 5,
                    min_mv: 3300,
                    max_mv: 11000
                },
                PpsRange {
                    position: 6,
                    min_mv: 3300,
                    max_mv: 21000
                },
            ]
        );
        assert_eq!(caps.bounds(5000), (3300, 21000));
    }

    #[test]
    fn bounds_include_start_voltage() {
        let mut pd = MockPd::pps(9000, 11000);
        let caps = SourceCapabilities::discover(&mut pd).unwrap();
        assert_eq!(caps.bounds(5000), (5000, 11000));
    }

    #[test]
    fn discover_errors() {
        assert_eq!(
            SourceCapabilities::discover(&mut MockPd::detached()),
            Err(StartupError::ConnectFailed)
        );
        assert_eq!(
            SourceCapabilities::discover(&mut MockPd::fixed_only()),
            Err(StartupError::NoProgrammableSource)
        );
    }

    #[test]
    fn discover_caps_object_count() {
        let mut pd = MockPd::fixed_only();
        pd.fixed_mv.clear();
        for i in 0..9u16 {
            pd.programmable_mv.push((3300, 5000 + i * 1000));
        }
        let caps = SourceCapabilities::discover(&mut pd).unwrap();
        assert_eq!(caps.ranges().len(), SourceCapabilities::MAX_OBJECTS);
    }

    // =========================================================================
    // Startup Tests
    // =========================================================================

    #[test]
    fn start_sets_bounds() {
        let (mut a, _) = adapter(MockPd::pps(3300, 11000), MockSensor::new(5000, 0));
        assert_eq!(a.phase(), Phase::Idle);
        a.start().unwrap();
        assert_eq!(a.phase(), Phase::Running);
        let status = a.status();
        assert_eq!((status.min_mv, status.requested_mv, status.max_mv), (3300, 5000, 11000));
        assert!(a.display().initialized());
    }

    #[test]
    fn tick_before_start_does_nothing() {
        let (mut a, _) = adapter(MockPd::pps(3300, 11000), MockSensor::new(5000, 0));
        assert!(a.tick().is_none());
        assert_eq!(a.run_for(5), 0);
        assert!(a.pd().requests.is_empty());
    }

    #[test]
    fn failed_start_stays_faulted() {
        let (mut a, _) = adapter(MockPd::detached(), MockSensor::new(5000, 0));
        assert_eq!(a.start(), Err(StartupError::ConnectFailed));
        assert_eq!(a.phase(), Phase::Faulted(StartupError::ConnectFailed));
        assert_eq!(a.display().text_at(FAULT_PAGE, FAULT_COLUMN, 6), "N0 PP5");

        a.pd_mut().attached = true;
        assert_eq!(a.start(), Err(StartupError::ConnectFailed));
        assert_eq!(a.pd().connects, 1);
    }

    #[test]
    fn start_again_while_running_keeps_state() {
        let (mut a, time) = adapter(MockPd::pps(3300, 11000), MockSensor::new(5000, 1000));
        a.start().unwrap();
        time.set(10_000);
        a.tick();
        let energy = a.status().energy_uwh;
        assert!(energy > 0);

        a.pd_mut().programmable_mv = vec![(3300, 21000)];
        assert_eq!(a.start(), Ok(()));
        assert_eq!(a.pd().connects, 1);
        assert_eq!(a.status().max_mv, 11000);
        assert_eq!(a.status().energy_uwh, energy);
        assert_eq!(a.phase(), Phase::Running);
    }

    // =========================================================================
    // Tick Tests
    // =========================================================================

    #[test]
    fn idle_tick_requests_and_paces() {
        let (mut a, time) = adapter(MockPd::pps(3300, 11000), MockSensor::new(5000, 1000));
        a.start().unwrap();
        a.run_for(3);
        assert_eq!(a.pd().requests, vec![5000, 5000, 5000]);
        assert_eq!(a.pd().renegotiations, 0);
        assert_eq!(time.now(), 30);
        assert_eq!(a.sensor().samples, 3);
    }

    #[test]
    fn held_increase_settles_then_repeats() {
        let (mut a, time) = adapter(MockPd::pps(3300, 11000), MockSensor::new(5000, 0));
        a.start().unwrap();
        a.buttons_mut().hold(Button::Increase);

        a.tick();
        assert_eq!(a.status().requested_mv, 5020);
        assert_eq!(time.now(), 500);
        assert!(a.pd().requests.is_empty());
        assert_eq!(a.pd().renegotiations, 1);

        a.tick();
        assert_eq!(a.status().requested_mv, 5040);
        assert_eq!(time.now(), 500);
        assert_eq!(a.pd().renegotiations, 2);

        a.buttons_mut().release_all();
        a.tick();
        assert_eq!(a.pd().last_request(), Some(5040));
        assert_eq!(a.state().keys.budget(), 50);
    }

    #[test]
    fn renegotiation_cadence_follows_config() {
        let config = AdapterConfig::default().with_renegotiate_every(3);
        let (mut a, _) = adapter_with(config, MockPd::pps(3300, 11000), MockSensor::new(5000, 0));
        a.start().unwrap();
        a.buttons_mut().hold(Button::Decrease);
        a.run_for(7);
        assert_eq!(a.pd().renegotiations, 2);
        assert_eq!(a.status().requested_mv, 5000 - 7 * 20);
    }

    #[test]
    fn reset_clears_counters() {
        let (mut a, time) = adapter(MockPd::pps(3300, 11000), MockSensor::new(5000, 1000));
        a.start().unwrap();
        time.advance(10_000);
        a.tick();
        assert!(a.status().energy_uwh > 0);

        a.buttons_mut().hold(Button::Reset);
        a.tick();
        let status = a.status();
        assert_eq!(status.energy_uwh, 0);
        assert_eq!(status.charge_uah, 0);
        assert_eq!(status.elapsed_seconds, 0);
        assert_eq!(a.state().telemetry.elapsed_ms(), 0);
    }

    #[test]
    fn status_reports_last_measurement() {
        let (mut a, _) = adapter(MockPd::pps(3300, 11000), MockSensor::new(12000, 7000));
        a.start().unwrap();
        let m = a.tick().unwrap();
        assert_eq!(m.current_ma, 0);
        let status = a.status();
        assert_eq!(status.voltage_mv, 12000);
        assert_eq!(status.current_ma, 0);
        assert_eq!(status.mode, DisplayMode::Power);
    }
}
