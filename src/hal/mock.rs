//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for every external collaborator,
//! enabling development and testing on desktop without the adapter board.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockTime`] | - | Shared millisecond counter behind the time mocks |
//! | [`MockClock`] | [`Clock`] | Reads the shared counter |
//! | [`MockDelay`] | [`Delay`] | Advances the shared counter |
//! | [`MockButtons`] | [`DigitalInput`] | Held, released or timed presses |
//! | [`MockSensor`] | [`PowerSensor`] | Fixed voltage/current samples |
//! | [`MockPd`] | [`PowerDelivery`] | Scripted source capabilities, records requests |
//! | [`MockDisplay`] | [`DisplayTransport`] | SSD1306 framebuffer that decodes drawn text |
//!
//! The time mocks share one counter so that a blocking delay inside the
//! control loop moves the clock forward and releases timed button presses,
//! exactly as on the device.
//!
//! # Example
//!
//! ```rust
//! use pd_adapter::hal::{MockButtons, MockDelay, MockTime};
//! use pd_adapter::traits::{Button, Delay, DigitalInput};
//!
//! let time = MockTime::new();
//! let mut delay = MockDelay::new(&time);
//! let mut buttons = MockButtons::new(&time);
//!
//! buttons.press_for(Button::Increase, 25);
//! assert!(buttons.is_pressed(Button::Increase));
//!
//! delay.delay_ms(30);
//! assert_eq!(time.now(), 30);
//! assert!(!buttons.is_pressed(Button::Increase));
//! ```

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::Cell;

use crate::font::{Glyph, CELL_COLUMNS, FONT, GLYPH_BYTES};
use crate::render::{LINE_CELLS, PAGES, WIDTH};
use crate::traits::{
    Button, Clock, Delay, DigitalInput, DisplayTransport, PowerDelivery, PowerSensor,
    TransportMode,
};

// ============================================================================
// Time Mocks
// ============================================================================

/// Shared, controllable millisecond counter.
///
/// Cloning yields another handle to the same counter. The counter wraps at
/// `u32::MAX` like the device's tick counter.
#[derive(Clone, Debug, Default)]
pub struct MockTime {
    now_ms: Rc<Cell<u32>>,
}

impl MockTime {
    /// Creates a new counter starting at 0ms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current time in milliseconds.
    pub fn now(&self) -> u32 {
        self.now_ms.get()
    }

    /// Sets the current time in milliseconds.
    pub fn set(&self, ms: u32) {
        self.now_ms.set(ms);
    }

    /// Advances the counter, wrapping on overflow.
    pub fn advance(&self, ms: u32) {
        self.now_ms.set(self.now_ms.get().wrapping_add(ms));
    }
}

/// Mock clock reading a [`MockTime`].
#[derive(Clone, Debug)]
pub struct MockClock {
    time: MockTime,
}

impl MockClock {
    /// Creates a clock reading `time`.
    pub fn new(time: &MockTime) -> Self {
        Self { time: time.clone() }
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u32 {
        self.time.now()
    }
}

/// Mock delay that advances a [`MockTime`] instead of sleeping.
#[derive(Clone, Debug)]
pub struct MockDelay {
    time: MockTime,
    /// Number of `delay_ms` calls.
    pub calls: usize,
    /// Sum of all requested delays in milliseconds.
    pub total_ms: u64,
}

impl MockDelay {
    /// Creates a delay driving `time`.
    pub fn new(time: &MockTime) -> Self {
        Self {
            time: time.clone(),
            calls: 0,
            total_ms: 0,
        }
    }
}

impl Delay for MockDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.calls += 1;
        self.total_ms += u64::from(ms);
        self.time.advance(ms);
    }
}

// ============================================================================
// Button Mock
// ============================================================================

#[derive(Clone, Copy, Debug, Default)]
enum Hold {
    #[default]
    Released,
    Held,
    Until {
        since_ms: u32,
        duration_ms: u32,
    },
}

/// Mock buttons for testing.
///
/// A button can be held indefinitely, released, or pressed for a fixed
/// duration measured on the shared [`MockTime`].
#[derive(Clone, Debug)]
pub struct MockButtons {
    time: MockTime,
    holds: [Hold; 3],
    /// Number of pin reads performed.
    pub reads: usize,
}

impl MockButtons {
    /// Creates mock buttons with everything released.
    pub fn new(time: &MockTime) -> Self {
        Self {
            time: time.clone(),
            holds: [Hold::Released; 3],
            reads: 0,
        }
    }

    /// Hold `button` until [`release`](Self::release) is called.
    pub fn hold(&mut self, button: Button) {
        self.holds[button as usize] = Hold::Held;
    }

    /// Release `button`.
    pub fn release(&mut self, button: Button) {
        self.holds[button as usize] = Hold::Released;
    }

    /// Release every button.
    pub fn release_all(&mut self) {
        self.holds = [Hold::Released; 3];
    }

    /// Hold `button` for `duration_ms` from now.
    pub fn press_for(&mut self, button: Button, duration_ms: u32) {
        self.holds[button as usize] = Hold::Until {
            since_ms: self.time.now(),
            duration_ms,
        };
    }

    /// True if `button` is logically pressed right now.
    pub fn is_held(&self, button: Button) -> bool {
        match self.holds[button as usize] {
            Hold::Released => false,
            Hold::Held => true,
            Hold::Until {
                since_ms,
                duration_ms,
            } => self.time.now().wrapping_sub(since_ms) < duration_ms,
        }
    }
}

impl DigitalInput for MockButtons {
    fn read_pin(&mut self, button: Button) -> bool {
        self.reads += 1;
        !self.is_held(button)
    }
}

// ============================================================================
// Sensor Mock
// ============================================================================

/// Mock voltage/current sensor.
///
/// Returns whatever is stored in the public fields.
///
/// # Example
///
/// ```rust
/// use pd_adapter::hal::MockSensor;
/// use pd_adapter::traits::PowerSensor;
///
/// let mut sensor = MockSensor::new(5000, 1000);
/// assert_eq!(sensor.read_voltage_mv(), 5000);
/// assert_eq!(sensor.read_current_ma(), 1000);
/// assert_eq!(sensor.samples, 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct MockSensor {
    /// Voltage reading in millivolts.
    pub voltage_mv: u16,
    /// Current reading in milliamps.
    pub current_ma: u16,
    /// Number of voltage reads (one per sample).
    pub samples: usize,
}

impl MockSensor {
    /// Creates a sensor reporting a fixed sample.
    pub fn new(voltage_mv: u16, current_ma: u16) -> Self {
        Self {
            voltage_mv,
            current_ma,
            samples: 0,
        }
    }
}

impl PowerSensor for MockSensor {
    fn read_voltage_mv(&mut self) -> u16 {
        self.samples += 1;
        self.voltage_mv
    }

    fn read_current_ma(&mut self) -> u16 {
        self.current_ma
    }
}

// ============================================================================
// Power Delivery Mock
// ============================================================================

/// Mock USB PD sink stack.
///
/// Advertises a list of fixed supplies followed by a list of programmable
/// ranges, and records every request.
///
/// # Example
///
/// ```rust
/// use pd_adapter::hal::MockPd;
/// use pd_adapter::traits::PowerDelivery;
///
/// let mut pd = MockPd::pps(3300, 11000);
/// assert!(pd.connect());
/// assert_eq!(pd.programmable_positions(), 5..=5);
/// assert_eq!(pd.max_voltage_mv(5), 11000);
///
/// pd.request_voltage(9000);
/// assert_eq!(pd.last_request(), Some(9000));
/// ```
#[derive(Clone, Debug)]
pub struct MockPd {
    /// Whether `connect()` succeeds.
    pub attached: bool,
    /// Fixed supply voltages in millivolts (positions 1..).
    pub fixed_mv: Vec<u16>,
    /// Programmable ranges `(min, max)` in millivolts, after the fixed supplies.
    pub programmable_mv: Vec<(u16, u16)>,
    /// Every voltage passed to `request_voltage`, in order.
    pub requests: Vec<u16>,
    /// Number of `renegotiate` calls.
    pub renegotiations: usize,
    /// Number of `connect` calls.
    pub connects: usize,
}

impl MockPd {
    /// A typical 5/9/12/15V charger without programmable supplies.
    pub fn fixed_only() -> Self {
        Self {
            attached: true,
            fixed_mv: alloc::vec![5000, 9000, 12000, 15000],
            programmable_mv: Vec::new(),
            requests: Vec::new(),
            renegotiations: 0,
            connects: 0,
        }
    }

    /// A charger with one programmable range `min_mv..=max_mv`.
    pub fn pps(min_mv: u16, max_mv: u16) -> Self {
        Self::fixed_only().with_range(min_mv, max_mv)
    }

    /// A port with nothing attached.
    pub fn detached() -> Self {
        Self {
            attached: false,
            ..Self::fixed_only()
        }
    }

    /// Add another programmable range.
    pub fn with_range(mut self, min_mv: u16, max_mv: u16) -> Self {
        self.programmable_mv.push((min_mv, max_mv));
        self
    }

    /// Most recent requested voltage.
    pub fn last_request(&self) -> Option<u16> {
        self.requests.last().copied()
    }

    fn object(&self, position: u8) -> Option<(u16, u16)> {
        let index = usize::from(position).checked_sub(1)?;
        match self.fixed_mv.get(index) {
            Some(&mv) => Some((mv, mv)),
            None => self
                .programmable_mv
                .get(index - self.fixed_mv.len())
                .copied(),
        }
    }
}

impl PowerDelivery for MockPd {
    fn connect(&mut self) -> bool {
        self.connects += 1;
        self.attached
    }

    fn fixed_source_count(&self) -> u8 {
        self.fixed_mv.len() as u8
    }

    fn total_source_count(&self) -> u8 {
        (self.fixed_mv.len() + self.programmable_mv.len()) as u8
    }

    fn programmable_source_count(&self) -> u8 {
        self.programmable_mv.len() as u8
    }

    fn min_voltage_mv(&self, position: u8) -> u16 {
        self.object(position).map_or(0, |(min, _)| min)
    }

    fn max_voltage_mv(&self, position: u8) -> u16 {
        self.object(position).map_or(0, |(_, max)| max)
    }

    fn request_voltage(&mut self, mv: u16) {
        self.requests.push(mv);
    }

    fn renegotiate(&mut self) {
        self.renegotiations += 1;
    }
}

// ============================================================================
// Display Mock
// ============================================================================

/// One recorded transport session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionRecord {
    /// Mode selected by the control byte, `None` if it was missing or unknown.
    pub mode: Option<TransportMode>,
    /// Bytes after the control byte.
    pub payload: Vec<u8>,
    /// Whether the session was closed.
    pub closed: bool,
}

/// Mock SSD1306 on a byte transport.
///
/// Records every session and emulates the subset of the controller used by
/// the renderer: init, page window (`0x22`), column nibbles, start page and
/// vertical addressing. Data bytes land in a 128x4 page framebuffer, which
/// [`line_text`](Self::line_text) decodes back into characters.
///
/// # Example
///
/// ```
/// use pd_adapter::hal::MockDisplay;
/// use pd_adapter::traits::DisplayTransport;
///
/// let mut display = MockDisplay::new();
/// display.open();
/// display.write_byte(0x00); // command mode
/// display.write_byte(0xAF);
/// display.close();
///
/// assert_eq!(display.sessions().len(), 1);
/// assert!(display.display_on());
/// ```
#[derive(Clone, Debug)]
pub struct MockDisplay {
    framebuffer: [[u8; WIDTH as usize]; PAGES as usize],
    sessions: Vec<SessionRecord>,
    open: bool,
    awaiting_control: bool,
    /// Sessions opened while another was still open.
    pub overlapping_opens: usize,
    /// Bytes written outside any session.
    pub stray_bytes: usize,
    page_start: u8,
    page_end: u8,
    page: u8,
    column: u8,
    vertical: bool,
    display_on: bool,
}

impl Default for MockDisplay {
    fn default() -> Self {
        Self {
            framebuffer: [[0; WIDTH as usize]; PAGES as usize],
            sessions: Vec::new(),
            open: false,
            awaiting_control: false,
            overlapping_opens: 0,
            stray_bytes: 0,
            page_start: 0,
            page_end: PAGES - 1,
            page: 0,
            column: 0,
            vertical: false,
            display_on: false,
        }
    }
}

impl MockDisplay {
    /// Creates a blank display with the controller in reset state.
    pub fn new() -> Self {
        Self::default()
    }

    /// All sessions recorded since creation or the last [`clear_log`](Self::clear_log).
    pub fn sessions(&self) -> &[SessionRecord] {
        &self.sessions
    }

    /// Forget recorded sessions. The framebuffer is kept.
    pub fn clear_log(&mut self) {
        self.sessions.clear();
    }

    /// True while a session is open.
    pub fn session_open(&self) -> bool {
        self.open
    }

    /// True once the init sequence switched to vertical addressing and turned the panel on.
    pub fn initialized(&self) -> bool {
        self.vertical && self.display_on
    }

    /// True once the display-on command was received.
    pub fn display_on(&self) -> bool {
        self.display_on
    }

    /// Raw page framebuffer.
    pub fn framebuffer(&self) -> &[[u8; WIDTH as usize]; PAGES as usize] {
        &self.framebuffer
    }

    /// Decode the character cell `cell` of the text line starting at `page`.
    ///
    /// Returns `' '` for a blank cell and `'?'` for a pattern that is not in
    /// the font (or is not aligned to a cell).
    pub fn cell_char(&self, page: u8, cell: usize) -> char {
        self.char_at(page, cell * usize::from(CELL_COLUMNS))
    }

    /// Decode `cells` characters drawn from `column` onwards, for text that
    /// does not start on a cell boundary.
    pub fn text_at(&self, page: u8, column: u8, cells: usize) -> String {
        (0..cells)
            .map(|cell| self.char_at(page, usize::from(column) + cell * usize::from(CELL_COLUMNS)))
            .collect()
    }

    fn char_at(&self, page: u8, first: usize) -> char {
        let page = usize::from(page);
        let cell_columns = usize::from(CELL_COLUMNS);
        if page + 1 >= PAGES as usize || first + cell_columns > WIDTH as usize {
            return '?';
        }
        let spacing = cell_columns - GLYPH_BYTES / 2;
        let mut bitmap = [0u8; GLYPH_BYTES];
        for offset in 0..cell_columns {
            let column = first + offset;
            let (upper, lower) = (
                self.framebuffer[page][column],
                self.framebuffer[page + 1][column],
            );
            if offset < spacing {
                if upper != 0 || lower != 0 {
                    return '?';
                }
            } else {
                let i = (offset - spacing) * 2;
                bitmap[i] = upper;
                bitmap[i + 1] = lower;
            }
        }
        FONT.iter()
            .position(|glyph| *glyph == bitmap)
            .and_then(|index| Glyph::new(index as u8))
            .and_then(Glyph::to_char)
            .unwrap_or('?')
    }

    /// Decode the whole text line starting at `page`, without trailing blanks.
    pub fn line_text(&self, page: u8) -> String {
        let text: String = (0..LINE_CELLS).map(|cell| self.cell_char(page, cell)).collect();
        String::from(text.trim_end())
    }

    fn current(&mut self) -> Option<&mut SessionRecord> {
        if self.open {
            self.sessions.last_mut()
        } else {
            None
        }
    }

    fn apply_commands(&mut self, bytes: &[u8]) {
        let mut iter = bytes.iter().copied();
        while let Some(cmd) = iter.next() {
            match cmd {
                0x00..=0x0F => self.column = (self.column & 0xF0) | cmd,
                0x10..=0x17 => self.column = (self.column & 0x0F) | ((cmd & 0x07) << 4),
                0x20 => self.vertical = iter.next() == Some(0x01),
                0x22 => {
                    self.page_start = iter.next().unwrap_or(0) & (PAGES - 1);
                    self.page_end = iter.next().unwrap_or(PAGES - 1) & (PAGES - 1);
                    self.page = self.page_start;
                }
                0xA8 | 0xDA | 0x8D => {
                    iter.next();
                }
                0xAE => self.display_on = false,
                0xAF => self.display_on = true,
                0xB0..=0xB7 => self.page = cmd & (PAGES - 1),
                _ => {}
            }
        }
    }

    fn write_data(&mut self, byte: u8) {
        self.framebuffer[usize::from(self.page)][usize::from(self.column)] = byte;
        if self.page >= self.page_end {
            self.page = self.page_start;
            self.column = (self.column + 1) % WIDTH;
        } else {
            self.page += 1;
        }
    }
}

impl DisplayTransport for MockDisplay {
    fn open(&mut self) {
        if self.open {
            self.overlapping_opens += 1;
        }
        self.open = true;
        self.awaiting_control = true;
        self.sessions.push(SessionRecord::default());
    }

    fn write_byte(&mut self, byte: u8) {
        let awaiting_control = core::mem::replace(&mut self.awaiting_control, false);
        let Some(session) = self.current() else {
            self.stray_bytes += 1;
            return;
        };
        if awaiting_control {
            session.mode = TransportMode::from_control_byte(byte);
            return;
        }
        session.payload.push(byte);
        if session.mode == Some(TransportMode::Data) {
            self.write_data(byte);
        }
    }

    fn close(&mut self) {
        let mut commands = Vec::new();
        if let Some(session) = self.current() {
            session.closed = true;
            if session.mode == Some(TransportMode::Command) {
                commands = session.payload.clone();
            }
        }
        self.apply_commands(&commands);
        self.open = false;
        self.awaiting_control = false;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Time Mock Tests
    // =========================================================================

    #[test]
    fn clock_and_delay_share_time() {
        let time = MockTime::new();
        let clock = MockClock::new(&time);
        let mut delay = MockDelay::new(&time);

        delay.delay_ms(10);
        delay.delay_ms(15);
        assert_eq!(clock.now_ms(), 25);
        assert_eq!(delay.calls, 2);
        assert_eq!(delay.total_ms, 25);
    }

    #[test]
    fn time_wraps() {
        let time = MockTime::new();
        time.set(u32::MAX - 4);
        time.advance(10);
        assert_eq!(time.now(), 5);
    }

    // =========================================================================
    // MockButtons Tests
    // =========================================================================

    #[test]
    fn buttons_default_released() {
        let time = MockTime::new();
        let mut buttons = MockButtons::new(&time);
        for button in Button::ALL {
            assert!(buttons.read_pin(button));
        }
        assert_eq!(buttons.reads, 3);
    }

    #[test]
    fn buttons_hold_and_release() {
        let time = MockTime::new();
        let mut buttons = MockButtons::new(&time);
        buttons.hold(Button::Reset);
        assert!(buttons.is_pressed(Button::Reset));
        assert!(!buttons.is_pressed(Button::Decrease));
        buttons.release(Button::Reset);
        assert!(!buttons.is_pressed(Button::Reset));
    }

    #[test]
    fn buttons_timed_press_expires() {
        let time = MockTime::new();
        let mut buttons = MockButtons::new(&time);
        buttons.press_for(Button::Decrease, 100);
        time.advance(99);
        assert!(buttons.is_held(Button::Decrease));
        time.advance(1);
        assert!(!buttons.is_held(Button::Decrease));
    }

    // =========================================================================
    // MockPd Tests
    // =========================================================================

    #[test]
    fn pd_positions_are_one_based() {
        let pd = MockPd::pps(3300, 11000).with_range(3300, 21000);
        assert_eq!(pd.fixed_source_count(), 4);
        assert_eq!(pd.total_source_count(), 6);
        assert_eq!(pd.programmable_source_count(), 2);
        assert_eq!(pd.min_voltage_mv(1), 5000);
        assert_eq!(pd.max_voltage_mv(4), 15000);
        assert_eq!(pd.max_voltage_mv(6), 21000);
        assert_eq!(pd.min_voltage_mv(0), 0);
        assert_eq!(pd.min_voltage_mv(7), 0);
    }

    #[test]
    fn pd_detached_fails_connect() {
        let mut pd = MockPd::detached();
        assert!(!pd.connect());
        assert_eq!(pd.connects, 1);
    }

    #[test]
    fn pd_records_requests() {
        let mut pd = MockPd::pps(3300, 11000);
        assert_eq!(pd.last_request(), None);
        pd.request_voltage(5000);
        pd.request_voltage(5020);
        pd.renegotiate();
        assert_eq!(pd.requests, alloc::vec![5000, 5020]);
        assert_eq!(pd.renegotiations, 1);
    }

    // =========================================================================
    // MockDisplay Tests
    // =========================================================================

    fn session(display: &mut MockDisplay, mode: TransportMode, bytes: &[u8]) {
        display.open();
        display.write_byte(mode.control_byte());
        for &b in bytes {
            display.write_byte(b);
        }
        display.close();
    }

    #[test]
    fn display_records_sessions() {
        let mut display = MockDisplay::new();
        session(&mut display, TransportMode::Command, &[0x20, 0x01, 0xAF]);
        session(&mut display, TransportMode::Data, &[1, 2]);
        assert_eq!(display.sessions().len(), 2);
        assert_eq!(display.sessions()[0].mode, Some(TransportMode::Command));
        assert_eq!(display.sessions()[1].payload, alloc::vec![1, 2]);
        assert!(display.initialized());
        assert_eq!(display.overlapping_opens, 0);
    }

    #[test]
    fn display_vertical_addressing_fills_columns() {
        let mut display = MockDisplay::new();
        session(&mut display, TransportMode::Command, &[0x20, 0x01, 0x22, 2, 3, 0x05, 0x10, 0xB2]);
        session(&mut display, TransportMode::Data, &[0xAA, 0xBB, 0xCC, 0xDD]);
        let fb = display.framebuffer();
        assert_eq!(fb[2][5], 0xAA);
        assert_eq!(fb[3][5], 0xBB);
        assert_eq!(fb[2][6], 0xCC);
        assert_eq!(fb[3][6], 0xDD);
    }

    #[test]
    fn display_counts_stray_and_overlapping() {
        let mut display = MockDisplay::new();
        display.write_byte(0x40);
        display.open();
        display.open();
        display.close();
        assert_eq!(display.stray_bytes, 1);
        assert_eq!(display.overlapping_opens, 1);
    }

    #[test]
    fn display_decodes_glyph_cells() {
        let mut display = MockDisplay::new();
        session(&mut display, TransportMode::Command, &[0x20, 0x01, 0x22, 0, 1, 0x08, 0x10, 0xB0]);
        let mut bytes = alloc::vec![0u8; 6];
        bytes.extend_from_slice(&FONT[Glyph::W.index() as usize]);
        session(&mut display, TransportMode::Data, &bytes);
        assert_eq!(display.cell_char(0, 1), 'W');
        assert_eq!(display.line_text(0), " W");
    }

    #[test]
    fn display_unknown_pattern_decodes_as_question_mark() {
        let mut display = MockDisplay::new();
        session(&mut display, TransportMode::Command, &[0x20, 0x01, 0x22, 0, 1, 0x00, 0x10]);
        session(&mut display, TransportMode::Data, &[0xFF]);
        assert_eq!(display.cell_char(0, 0), '?');
    }
}
