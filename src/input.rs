//! Button handling and requested-voltage selection.
//!
//! Three active-low buttons drive the adapter:
//!
//! - **RST** clears the energy, charge and time counters.
//! - **INC** raises the requested voltage by one step.
//! - **DEC** lowers it by one step (ignored while INC is held).
//!
//! After an adjustment the controller waits, in short blocking polls, for
//! the button to be released or for the repeat budget to run out. The first
//! step of a press therefore pauses for the full budget, while a button
//! still held afterwards repeats once per loop iteration.
//!
//! # Example
//!
//! ```rust
//! use pd_adapter::hal::{MockButtons, MockTime};
//! use pd_adapter::input::{Adjustment, InputController, KeyRepeat, VoltageSelection};
//! use pd_adapter::traits::Button;
//! use pd_adapter::AdapterConfig;
//!
//! let time = MockTime::new();
//! let mut buttons = MockButtons::new(&time);
//! let controller = InputController::new(&AdapterConfig::default());
//! let mut selection = VoltageSelection::new(5000, 3300, 11000);
//! let mut keys = KeyRepeat::new(50);
//!
//! buttons.hold(Button::Increase);
//! let action = controller.poll(&mut buttons, &mut selection, &mut keys);
//! assert_eq!(action.adjustment, Adjustment::Increased);
//! assert_eq!(selection.requested_mv(), 5020);
//! ```

use crate::config::AdapterConfig;
use crate::traits::{Delay, DigitalInput};

pub use crate::traits::Button;

/// Requested output voltage and the range it may move in.
///
/// `min_mv <= requested_mv <= max_mv` always holds. The bounds are set
/// once from the source capabilities and never change afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VoltageSelection {
    requested_mv: u16,
    min_mv: u16,
    max_mv: u16,
}

impl VoltageSelection {
    /// Create a selection. `requested_mv` is clamped into `min_mv..=max_mv`,
    /// and swapped bounds are put in order.
    pub fn new(requested_mv: u16, min_mv: u16, max_mv: u16) -> Self {
        let (min_mv, max_mv) = if min_mv <= max_mv {
            (min_mv, max_mv)
        } else {
            (max_mv, min_mv)
        };
        Self {
            requested_mv: requested_mv.clamp(min_mv, max_mv),
            min_mv,
            max_mv,
        }
    }

    /// Raise the request by `step_mv`, saturating at the upper bound.
    pub fn increase(&mut self, step_mv: u16) {
        self.requested_mv = self.requested_mv.saturating_add(step_mv).min(self.max_mv);
    }

    /// Lower the request by `step_mv`, saturating at the lower bound.
    pub fn decrease(&mut self, step_mv: u16) {
        self.requested_mv = self.requested_mv.saturating_sub(step_mv).max(self.min_mv);
    }

    /// Currently requested voltage in millivolts.
    pub fn requested_mv(&self) -> u16 {
        self.requested_mv
    }

    /// Lowest selectable voltage in millivolts.
    pub fn min_mv(&self) -> u16 {
        self.min_mv
    }

    /// Highest selectable voltage in millivolts.
    pub fn max_mv(&self) -> u16 {
        self.max_mv
    }
}

/// Key repeat bookkeeping for one loop iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyRepeat {
    budget: u8,
    pending: bool,
}

impl KeyRepeat {
    /// Start with a full budget and nothing pending.
    pub fn new(budget: u8) -> Self {
        Self {
            budget,
            pending: false,
        }
    }

    /// Remaining settle polls.
    pub fn budget(&self) -> u8 {
        self.budget
    }

    /// True if an adjustment this iteration still has to settle.
    pub fn pending(&self) -> bool {
        self.pending
    }

    fn take_budget(&mut self) -> u8 {
        core::mem::take(&mut self.budget)
    }
}

/// Snapshot of the three buttons.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ButtonState {
    /// RST held.
    pub reset: bool,
    /// DEC held.
    pub decrease: bool,
    /// INC held.
    pub increase: bool,
}

impl ButtonState {
    /// Read all three pins.
    pub fn read<I: DigitalInput>(input: &mut I) -> Self {
        Self {
            reset: input.is_pressed(Button::Reset),
            decrease: input.is_pressed(Button::Decrease),
            increase: input.is_pressed(Button::Increase),
        }
    }
}

/// Result of the voltage buttons for one iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Adjustment {
    /// INC was held.
    Increased,
    /// DEC was held (and INC was not).
    Decreased,
    /// Neither was held.
    Idle,
}

/// What the buttons asked for this iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputAction {
    /// RST was held: clear the counters.
    pub reset: bool,
    /// Voltage button outcome.
    pub adjustment: Adjustment,
}

/// Counts settled adjustments and says when to renegotiate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenegotiationCounter {
    every: u8,
    remaining: u8,
}

impl RenegotiationCounter {
    /// Renegotiate on every `every`-th settled adjustment. Zero means every one.
    pub fn new(every: u8) -> Self {
        let every = every.max(1);
        Self {
            every,
            remaining: every,
        }
    }

    /// Record one settled adjustment. Returns true when it is time to renegotiate.
    pub fn settled(&mut self) -> bool {
        self.remaining -= 1;
        if self.remaining == 0 {
            self.remaining = self.every;
            true
        } else {
            false
        }
    }
}

/// Button evaluation with the loop's step and timing constants.
#[derive(Clone, Copy, Debug)]
pub struct InputController {
    step_mv: u16,
    repeat_budget: u8,
    poll_interval_ms: u32,
}

impl InputController {
    /// Controller using the step and timing from `config`.
    pub fn new(config: &AdapterConfig) -> Self {
        Self {
            step_mv: config.step_mv,
            repeat_budget: config.key_repeat_budget,
            poll_interval_ms: config.poll_interval_ms,
        }
    }

    /// Evaluate the buttons once.
    ///
    /// INC wins over DEC. With neither held the repeat budget is refilled.
    pub fn poll<I: DigitalInput>(
        &self,
        input: &mut I,
        selection: &mut VoltageSelection,
        keys: &mut KeyRepeat,
    ) -> InputAction {
        let buttons = ButtonState::read(input);
        let adjustment = if buttons.increase {
            selection.increase(self.step_mv);
            keys.pending = true;
            Adjustment::Increased
        } else if buttons.decrease {
            selection.decrease(self.step_mv);
            keys.pending = true;
            Adjustment::Decreased
        } else {
            keys.budget = self.repeat_budget;
            Adjustment::Idle
        };
        InputAction {
            reset: buttons.reset,
            adjustment,
        }
    }

    /// Wait out a pending adjustment.
    ///
    /// Blocks in `poll_interval_ms` steps while INC or DEC is held, at most
    /// for the remaining budget. Returns `true` if an adjustment settled,
    /// `false` if nothing was pending (the budget is then refilled).
    pub fn settle<I: DigitalInput, D: Delay>(
        &self,
        input: &mut I,
        delay: &mut D,
        keys: &mut KeyRepeat,
    ) -> bool {
        let mut budget = keys.take_budget();
        if !keys.pending {
            keys.budget = self.repeat_budget;
            return false;
        }
        while budget > 0 && Self::adjusting(input) {
            delay.delay_ms(self.poll_interval_ms);
            budget -= 1;
        }
        keys.pending = false;
        true
    }

    /// Blocking pause used between steady-state voltage requests.
    pub fn pace<D: Delay>(&self, delay: &mut D) {
        delay.delay_ms(self.poll_interval_ms);
    }

    fn adjusting<I: DigitalInput>(input: &mut I) -> bool {
        input.is_pressed(Button::Increase) || input.is_pressed(Button::Decrease)
    }
}
