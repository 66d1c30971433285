//! Text rendering onto the 128x32 OLED.
//!
//! This module provides [`TextRenderer`], which turns glyphs and numbers into
//! column bytes and positions them with the controller's addressing commands.
//!
//! # Overview
//!
//! The display is driven in vertical addressing mode. A text line covers two
//! pages (16 pixel rows), so the usable lines start at page 0 and page 2.
//! Every character cell is 8 columns: 3 blank columns followed by the 5
//! glyph columns, giving 16 cells per line.
//!
//! Each draw call runs inside exactly one transport session. The session is
//! a guard that closes on drop, so a session is closed on every path.
//!
//! # Example
//!
//! ```rust
//! use pd_adapter::font::{self, Glyph};
//! use pd_adapter::hal::MockDisplay;
//! use pd_adapter::render::{TextRenderer, LINE_1};
//!
//! let mut renderer = TextRenderer::new(MockDisplay::new());
//! renderer.init();
//! renderer.clear_screen();
//!
//! renderer.set_cursor(0, LINE_1);
//! renderer.draw_int(5000);
//! renderer.draw_str(font::MILLIVOLTS);
//!
//! assert_eq!(renderer.transport().line_text(LINE_1), " 5000mV");
//! ```

use crate::font::{self, Glyph, INT_DIGITS, SPACING_BYTES};
use crate::traits::{DisplayTransport, TransportMode};

/// Display width in pixel columns.
pub const WIDTH: u8 = 128;

/// Number of 8-row pages on the panel.
pub const PAGES: u8 = 4;

/// Pages spanned by one text line.
pub const LINE_PAGES: u8 = 2;

/// First text line (pages 0-1).
pub const LINE_1: u8 = 0;

/// Second text line (pages 2-3).
pub const LINE_2: u8 = 2;

/// Character cells per text line.
pub const LINE_CELLS: usize = (WIDTH / font::CELL_COLUMNS) as usize;

/// Fixed width of [`TextRenderer::draw_int`] fields, in cells.
pub const INT_FIELD_CELLS: usize = INT_DIGITS;

/// Controller setup, sent once at startup.
#[rustfmt::skip]
pub const INIT_SEQUENCE: [u8; 9] = [
    0xA8, 0x1F, // multiplex ratio for 32 rows
    0x20, 0x01, // vertical addressing mode
    0xDA, 0x02, // sequential COM pin configuration
    0x8D, 0x14, // charge pump on
    0xAF,       // display on
];

/// Command setting the page window.
const CMD_PAGE_RANGE: u8 = 0x22;
/// Command prefix for the high column nibble.
const CMD_COLUMN_HIGH: u8 = 0x10;
/// Command prefix for the start page.
const CMD_START_PAGE: u8 = 0xB0;

/// An open transport session.
///
/// Writes the control byte on creation and closes the transport when
/// dropped.
struct Session<'a, T: DisplayTransport> {
    transport: &'a mut T,
}

impl<'a, T: DisplayTransport> Session<'a, T> {
    fn begin(transport: &'a mut T, mode: TransportMode) -> Self {
        transport.open();
        transport.write_byte(mode.control_byte());
        Self { transport }
    }

    #[inline]
    fn write(&mut self, byte: u8) {
        self.transport.write_byte(byte);
    }

    fn write_all(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.write(byte);
        }
    }

    fn fill(&mut self, byte: u8, count: usize) {
        for _ in 0..count {
            self.write(byte);
        }
    }

    /// Spacing then glyph columns. The terminator draws nothing.
    fn plot(&mut self, glyph: Glyph) {
        if let Some(bitmap) = glyph.bitmap() {
            self.fill(0x00, SPACING_BYTES);
            self.write_all(bitmap);
        }
    }
}

impl<T: DisplayTransport> Drop for Session<'_, T> {
    fn drop(&mut self) {
        self.transport.close();
    }
}

/// Glyph renderer over a [`DisplayTransport`].
///
/// The renderer holds no cursor state of its own; the controller advances
/// its write pointer as bytes arrive. Call [`set_cursor`](Self::set_cursor)
/// before any draw that does not continue where the last one stopped.
pub struct TextRenderer<T: DisplayTransport> {
    transport: T,
}

impl<T: DisplayTransport> TextRenderer<T> {
    /// Create a renderer that owns `transport`.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Send the controller init sequence.
    pub fn init(&mut self) {
        let mut session = Session::begin(&mut self.transport, TransportMode::Command);
        session.write_all(&INIT_SEQUENCE);
    }

    /// Move the write pointer to `column` (0-127) of the line starting at `page`.
    ///
    /// Sets a two-page window starting at `page`, then the column as low
    /// and high nibble, then the start page.
    pub fn set_cursor(&mut self, column: u8, page: u8) {
        let column = column & (WIDTH - 1);
        let page = page & (PAGES - 1);
        let mut session = Session::begin(&mut self.transport, TransportMode::Command);
        session.write_all(&[
            CMD_PAGE_RANGE,
            page,
            page + 1,
            column & 0x0F,
            CMD_COLUMN_HIGH | (column >> 4),
            CMD_START_PAGE | page,
        ]);
    }

    /// Blank the text line starting at `page`.
    ///
    /// Writes one zero byte per column per page of the line, leaving the
    /// write pointer back at column 0.
    pub fn clear_line(&mut self, page: u8) {
        self.set_cursor(0, page);
        let mut session = Session::begin(&mut self.transport, TransportMode::Data);
        session.fill(0x00, WIDTH as usize * LINE_PAGES as usize);
    }

    /// Blank both text lines.
    pub fn clear_screen(&mut self) {
        self.clear_line(LINE_1);
        self.clear_line(LINE_2);
    }

    /// Draw one glyph at the write pointer.
    pub fn draw_char(&mut self, glyph: Glyph) {
        let mut session = Session::begin(&mut self.transport, TransportMode::Data);
        session.plot(glyph);
    }

    /// Draw a glyph string up to its terminator, in a single session.
    pub fn draw_str(&mut self, text: &[Glyph]) {
        let mut session = Session::begin(&mut self.transport, TransportMode::Data);
        for glyph in font::visible(text) {
            session.plot(glyph);
        }
    }

    /// Draw `value` right-aligned in a five cell field without leading zeros.
    pub fn draw_int(&mut self, value: u16) {
        self.draw_glyphs(&font::int_digits(value));
    }

    /// Draw `value` as two digits, with `lead` in place of a zero tens digit.
    pub fn draw_two_digit(&mut self, value: u8, lead: Glyph) {
        self.draw_glyphs(&font::two_digits(value, lead));
    }

    fn draw_glyphs<const N: usize>(&mut self, glyphs: &[Glyph; N]) {
        let mut session = Session::begin(&mut self.transport, TransportMode::Data);
        for &glyph in glyphs {
            session.plot(glyph);
        }
    }

    /// Borrow the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the renderer and return the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }
}
