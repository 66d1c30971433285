//! Byte-level transport to the OLED controller.
//!
//! This module defines the [`DisplayTransport`] trait the text renderer
//! writes through. A transport moves raw bytes in sessions: `open`, a
//! control byte selecting [`TransportMode`], any number of payload bytes,
//! then `close`. Only one session is ever open at a time.

/// Payload interpretation for one transport session.
///
/// Sent as the first byte of every session (the SSD1306 control byte).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportMode {
    /// Payload bytes are controller commands.
    Command,
    /// Payload bytes are written to display RAM.
    Data,
}

impl TransportMode {
    /// The control byte that selects this mode.
    ///
    /// # Examples
    ///
    /// ```
    /// use pd_adapter::traits::TransportMode;
    ///
    /// assert_eq!(TransportMode::Command.control_byte(), 0x00);
    /// assert_eq!(TransportMode::Data.control_byte(), 0x40);
    /// ```
    #[inline]
    pub const fn control_byte(self) -> u8 {
        match self {
            TransportMode::Command => 0x00,
            TransportMode::Data => 0x40,
        }
    }

    /// Parse a control byte. Unknown values return `None`.
    pub const fn from_control_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(TransportMode::Command),
            0x40 => Some(TransportMode::Data),
            _ => None,
        }
    }
}

/// Display transport trait.
///
/// Implementors frame bytes for the physical bus (I2C start/stop, SPI chip
/// select, ...). The transport is assumed always available at this layer:
/// methods do not return errors. Adapters over fallible buses latch the
/// first fault for the caller to inspect out of band.
///
/// # Example
///
/// ```ignore
/// use pd_adapter::traits::DisplayTransport;
///
/// struct MyBus { /* ... */ }
///
/// impl DisplayTransport for MyBus {
///     fn open(&mut self) { /* START + address */ }
///     fn write_byte(&mut self, byte: u8) { /* shift out */ }
///     fn close(&mut self) { /* STOP */ }
/// }
/// ```
pub trait DisplayTransport {
    /// Begin a session addressed to the display controller.
    fn open(&mut self);

    /// Write one byte within the open session.
    ///
    /// The first byte of every session is the [`TransportMode`] control byte.
    fn write_byte(&mut self, byte: u8);

    /// End the current session.
    fn close(&mut self);
}
