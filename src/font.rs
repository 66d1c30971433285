//! 5x16 bitmap font and glyph-encoded strings.
//!
//! The font covers exactly what the adapter displays: digits, the unit
//! letters `A V W h m`, the letters of "NO PPS" (`E N P T`), a colon and a
//! space. Each glyph is 5 columns wide and 16 pixels tall. Because the
//! controller runs in vertical addressing mode over a two-page window, every
//! column is two bytes: upper page first, then lower page.
//!
//! Text is a slice of [`Glyph`]s terminated by [`Glyph::END`]. Rendering stops
//! at the first terminator or at the end of the slice, whichever comes first.
//!
//! # Example
//!
//! ```rust
//! use pd_adapter::font::{self, Glyph};
//!
//! assert_eq!(font::render_text(font::MILLIWATT_HOURS).as_str(), "mWh");
//! assert_eq!(Glyph::from_char('7'), Some(Glyph::digit(7)));
//! assert_eq!(font::int_digits(42), [Glyph::SPACE, Glyph::SPACE, Glyph::SPACE, Glyph::digit(4), Glyph::digit(2)]);
//! ```

/// Bytes per glyph (5 columns x 2 pages).
pub const GLYPH_BYTES: usize = 10;

/// Blank bytes emitted before every glyph (3 columns x 2 pages).
pub const SPACING_BYTES: usize = 6;

/// Width of one character cell in pixel columns.
pub const CELL_COLUMNS: u8 = 8;

/// Number of glyphs in the font.
pub const GLYPH_COUNT: usize = 21;

/// Field width used by [`int_digits`].
pub const INT_DIGITS: usize = 5;

/// Index into the font table.
///
/// Valid glyphs are `0..21`; [`Glyph::END`] (255) terminates a glyph string
/// and is never drawn. The only ways to build a `Glyph` are the associated
/// constants and the checked constructors, so a drawable glyph always has a
/// bitmap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Glyph(u8);

impl Glyph {
    /// Letter `A`.
    pub const A: Glyph = Glyph(10);
    /// Letter `V`.
    pub const V: Glyph = Glyph(11);
    /// Letter `W`.
    pub const W: Glyph = Glyph(12);
    /// Letter `h`.
    pub const H: Glyph = Glyph(13);
    /// Letter `m`.
    pub const M: Glyph = Glyph(14);
    /// Letter `E`.
    pub const E: Glyph = Glyph(15);
    /// Letter `N`.
    pub const N: Glyph = Glyph(16);
    /// Letter `P`.
    pub const P: Glyph = Glyph(17);
    /// Letter `T`.
    pub const T: Glyph = Glyph(18);
    /// Colon.
    pub const COLON: Glyph = Glyph(19);
    /// Blank cell.
    pub const SPACE: Glyph = Glyph(20);
    /// String terminator.
    pub const END: Glyph = Glyph(255);

    /// Glyph for a decimal digit. Values above 9 wrap to their last digit.
    #[inline]
    pub const fn digit(value: u8) -> Glyph {
        Glyph(value % 10)
    }

    /// Checked constructor from a raw table index.
    ///
    /// Returns `None` for indices outside the font; use [`Glyph::END`] for
    /// the terminator.
    pub const fn new(index: u8) -> Option<Glyph> {
        if (index as usize) < GLYPH_COUNT {
            Some(Glyph(index))
        } else {
            None
        }
    }

    /// Raw table index.
    #[inline]
    pub const fn index(self) -> u8 {
        self.0
    }

    /// True for the string terminator.
    #[inline]
    pub const fn is_end(self) -> bool {
        self.0 == Self::END.0
    }

    /// Column bytes for this glyph, or `None` for the terminator.
    pub fn bitmap(self) -> Option<&'static [u8; GLYPH_BYTES]> {
        FONT.get(self.0 as usize)
    }

    /// Map a character to its glyph.
    ///
    /// `O` maps to the digit zero, which is how "NO PPS" is spelled.
    ///
    /// # Examples
    ///
    /// ```
    /// use pd_adapter::font::Glyph;
    ///
    /// assert_eq!(Glyph::from_char('W'), Some(Glyph::W));
    /// assert_eq!(Glyph::from_char('O'), Some(Glyph::digit(0)));
    /// assert_eq!(Glyph::from_char('x'), None);
    /// ```
    pub fn from_char(c: char) -> Option<Glyph> {
        let glyph = match c {
            '0'..='9' => Glyph::digit(c as u8 - b'0'),
            'O' => Glyph::digit(0),
            'A' => Glyph::A,
            'V' => Glyph::V,
            'W' => Glyph::W,
            'h' => Glyph::H,
            'm' => Glyph::M,
            'E' => Glyph::E,
            'N' => Glyph::N,
            'P' => Glyph::P,
            'T' => Glyph::T,
            ':' => Glyph::COLON,
            ' ' => Glyph::SPACE,
            _ => return None,
        };
        Some(glyph)
    }

    /// Character this glyph draws. The terminator has none.
    pub const fn to_char(self) -> Option<char> {
        let c = match self.0 {
            0..=9 => (b'0' + self.0) as char,
            10 => 'A',
            11 => 'V',
            12 => 'W',
            13 => 'h',
            14 => 'm',
            15 => 'E',
            16 => 'N',
            17 => 'P',
            18 => 'T',
            19 => ':',
            20 => ' ',
            _ => return None,
        };
        Some(c)
    }
}

/// Font bitmaps, indexed by [`Glyph::index`].
#[rustfmt::skip]
pub static FONT: [[u8; GLYPH_BYTES]; GLYPH_COUNT] = [
    [0x7C, 0x1F, 0x02, 0x20, 0x02, 0x20, 0x02, 0x20, 0x7C, 0x1F], // 0
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x7C, 0x1F], // 1
    [0x00, 0x1F, 0x82, 0x20, 0x82, 0x20, 0x82, 0x20, 0x7C, 0x00], // 2
    [0x00, 0x00, 0x82, 0x20, 0x82, 0x20, 0x82, 0x20, 0x7C, 0x1F], // 3
    [0x7C, 0x00, 0x80, 0x00, 0x80, 0x00, 0x80, 0x00, 0x7C, 0x1F], // 4
    [0x7C, 0x00, 0x82, 0x20, 0x82, 0x20, 0x82, 0x20, 0x00, 0x1F], // 5
    [0x7C, 0x1F, 0x82, 0x20, 0x82, 0x20, 0x82, 0x20, 0x00, 0x1F], // 6
    [0x7C, 0x00, 0x02, 0x00, 0x02, 0x00, 0x02, 0x00, 0x7C, 0x1F], // 7
    [0x7C, 0x1F, 0x82, 0x20, 0x82, 0x20, 0x82, 0x20, 0x7C, 0x1F], // 8
    [0x7C, 0x00, 0x82, 0x20, 0x82, 0x20, 0x82, 0x20, 0x7C, 0x1F], // 9
    [0x7C, 0x3F, 0x82, 0x00, 0x82, 0x00, 0x82, 0x00, 0x7C, 0x3F], // A
    [0x7C, 0x03, 0x00, 0x0C, 0x00, 0x30, 0x00, 0x0C, 0x7C, 0x03], // V
    [0x7C, 0x1F, 0x00, 0x20, 0x00, 0x3F, 0x00, 0x20, 0x7C, 0x1F], // W
    [0x7C, 0x3F, 0x80, 0x00, 0x80, 0x00, 0x80, 0x00, 0x00, 0x3F], // h
    [0x00, 0x3F, 0x80, 0x00, 0x80, 0x3F, 0x80, 0x00, 0x00, 0x3F], // m
    [0x7C, 0x1F, 0x82, 0x20, 0x82, 0x20, 0x82, 0x20, 0x00, 0x00], // E
    [0x7C, 0x1F, 0x02, 0x00, 0x02, 0x00, 0x02, 0x00, 0x7C, 0x1F], // N
    [0x7C, 0x1F, 0x82, 0x00, 0x82, 0x00, 0x82, 0x00, 0x7C, 0x00], // P
    [0x02, 0x00, 0x02, 0x00, 0x7E, 0x3F, 0x02, 0x00, 0x02, 0x00], // T
    [0x00, 0x00, 0x30, 0x06, 0x30, 0x06, 0x00, 0x00, 0x00, 0x00], // :
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], // space
];

use Glyph as G;

/// "mA"
pub const MILLIAMPS: &[Glyph] = &[G::M, G::A, G::END];
/// "mV"
pub const MILLIVOLTS: &[Glyph] = &[G::M, G::V, G::END];
/// "mW "
pub const MILLIWATTS: &[Glyph] = &[G::M, G::W, G::SPACE, G::END];
/// "Ah "
pub const AMP_HOURS: &[Glyph] = &[G::A, G::H, G::SPACE, G::END];
/// "mAh"
pub const MILLIAMP_HOURS: &[Glyph] = &[G::M, G::A, G::H, G::END];
/// "W  "
pub const WATTS: &[Glyph] = &[G::W, G::SPACE, G::SPACE, G::END];
/// "Wh "
pub const WATT_HOURS: &[Glyph] = &[G::W, G::H, G::SPACE, G::END];
/// "mWh"
pub const MILLIWATT_HOURS: &[Glyph] = &[G::M, G::W, G::H, G::END];
/// "NO PPS"
pub const NO_PPS: &[Glyph] = &[G::N, G::digit(0), G::SPACE, G::P, G::P, G::digit(5), G::END];

/// Glyphs of `text` up to (not including) the first terminator.
pub fn visible(text: &[Glyph]) -> impl Iterator<Item = Glyph> + '_ {
    text.iter().copied().take_while(|g| !g.is_end())
}

/// Right-aligned five digit field for `value`.
///
/// Digits are taken with divisors 10000 down to 1. Leading zeros become
/// blanks until the first nonzero digit; the units digit is always drawn,
/// so zero renders as a single `0`.
pub fn int_digits(mut value: u16) -> [Glyph; INT_DIGITS] {
    let mut out = [Glyph::SPACE; INT_DIGITS];
    let mut divider: u16 = 10_000;
    let mut leading = true;
    for slot in out.iter_mut() {
        let digit = (value / divider) as u8;
        value %= divider;
        divider /= 10;
        if digit != 0 || divider == 0 {
            leading = false;
        }
        if !leading {
            *slot = Glyph::digit(digit);
        }
    }
    out
}

/// Two digit field for `value` (0-99).
///
/// When the tens digit is zero, `lead` is drawn in its place. Pass
/// [`Glyph::SPACE`] to suppress it or `Glyph::digit(0)` to keep it.
/// Values above 99 keep only their last two digits.
pub fn two_digits(value: u8, lead: Glyph) -> [Glyph; 2] {
    let tens = (value / 10) % 10;
    let first = if tens == 0 { lead } else { Glyph::digit(tens) };
    [first, Glyph::digit(value % 10)]
}

/// Text drawn by a glyph string, for logs and tests.
#[cfg(feature = "std")]
pub fn render_text(text: &[Glyph]) -> String {
    visible(text).filter_map(Glyph::to_char).collect()
}
