//! `embedded-hal` 1.0 adapters for real boards.
//!
//! Wires generic HAL peripherals into the adapter's traits:
//!
//! - [`I2cTransport`]: SSD1306 over I2C
//! - [`PinButtons`]: three active-low button inputs
//! - [`HalDelay`]: blocking millisecond delay
//!
//! # Wiring
//!
//! - OLED SDA/SCL → board I2C, address 0x3C
//! - RST, DEC, INC → GPIO with pull-ups, button to GND

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use embedded_hal::i2c::I2c;
use heapless::Vec;
use log::warn;

use crate::traits::{Button, Delay, DigitalInput, DisplayTransport};

/// 7-bit I2C address of the SSD1306 (0x78 as a write byte).
pub const OLED_ADDRESS: u8 = 0x3C;

/// Payload bytes per I2C transaction, after the control byte.
const CHUNK: usize = 32;

// ============================================================================
// Display Transport
// ============================================================================

/// SSD1306 transport over an `embedded-hal` I2C bus.
///
/// Session bytes are buffered and sent in transactions of up to 32 payload
/// bytes, each prefixed with the session's control byte. The buffer is sent
/// as soon as it fills, so it always has room for the next byte.
///
/// The bus cannot report errors through [`DisplayTransport`]. Failed
/// transactions are logged and dropped, later ones are still attempted, and
/// the first error is kept for [`take_error`](Self::take_error).
pub struct I2cTransport<I2C: I2c> {
    i2c: I2C,
    address: u8,
    buffer: Vec<u8, { CHUNK + 1 }>,
    error: Option<I2C::Error>,
}

impl<I2C: I2c> I2cTransport<I2C> {
    /// Transport to a display at [`OLED_ADDRESS`].
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, OLED_ADDRESS)
    }

    /// Transport to a display at a custom 7-bit address.
    pub fn with_address(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            buffer: Vec::new(),
            error: None,
        }
    }

    /// The first bus error since the last call, if any.
    pub fn take_error(&mut self) -> Option<I2C::Error> {
        self.error.take()
    }

    /// Give back the bus.
    pub fn release(self) -> I2C {
        self.i2c
    }

    fn flush(&mut self) {
        if self.buffer.len() > 1 {
            if let Err(err) = self.i2c.write(self.address, &self.buffer) {
                warn!("display write failed: {:?}", err);
                self.error.get_or_insert(err);
            }
        }
        self.buffer.truncate(1);
    }
}

impl<I2C: I2c> DisplayTransport for I2cTransport<I2C> {
    fn open(&mut self) {
        self.buffer.clear();
    }

    fn write_byte(&mut self, byte: u8) {
        if self.buffer.push(byte).is_ok() && self.buffer.is_full() {
            self.flush();
        }
    }

    fn close(&mut self) {
        self.flush();
        self.buffer.clear();
    }
}

// ============================================================================
// Buttons
// ============================================================================

/// RST, DEC and INC buttons on three input pins.
///
/// Pins read low while pressed. A pin that fails to read counts as released.
pub struct PinButtons<RST, DEC, INC> {
    reset: RST,
    decrease: DEC,
    increase: INC,
}

impl<RST: InputPin, DEC: InputPin, INC: InputPin> PinButtons<RST, DEC, INC> {
    /// Bundle the three pins.
    pub fn new(reset: RST, decrease: DEC, increase: INC) -> Self {
        Self {
            reset,
            decrease,
            increase,
        }
    }
}

impl<RST: InputPin, DEC: InputPin, INC: InputPin> DigitalInput for PinButtons<RST, DEC, INC> {
    fn read_pin(&mut self, button: Button) -> bool {
        match button {
            Button::Reset => self.reset.is_high().unwrap_or(true),
            Button::Decrease => self.decrease.is_high().unwrap_or(true),
            Button::Increase => self.increase.is_high().unwrap_or(true),
        }
    }
}

// ============================================================================
// Delay
// ============================================================================

/// Blocking delay backed by any [`DelayNs`].
pub struct HalDelay<D>(pub D);

impl<D: DelayNs> Delay for HalDelay<D> {
    fn delay_ms(&mut self, ms: u32) {
        self.0.delay_ms(ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType as PinErrorType;
    use embedded_hal::i2c::{ErrorKind, ErrorType, Operation};

    #[derive(Default)]
    struct RecordingBus {
        writes: std::vec::Vec<(u8, std::vec::Vec<u8>)>,
        failures: usize,
    }

    impl ErrorType for RecordingBus {
        type Error = ErrorKind;
    }

    impl I2c for RecordingBus {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(ErrorKind::Bus);
            }
            for op in operations {
                if let Operation::Write(bytes) = op {
                    self.writes.push((address, bytes.to_vec()));
                }
            }
            Ok(())
        }
    }

    struct Pin(bool);

    impl PinErrorType for Pin {
        type Error = Infallible;
    }

    impl InputPin for Pin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Ok(self.0)
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.0)
        }
    }

    // =========================================================================
    // I2cTransport Tests
    // =========================================================================

    #[test]
    fn short_session_is_one_transaction() {
        let mut t = I2cTransport::new(RecordingBus::default());
        t.open();
        for b in [0x00, 0xA8, 0x1F] {
            t.write_byte(b);
        }
        t.close();
        let bus = t.release();
        assert_eq!(bus.writes, vec![(OLED_ADDRESS, vec![0x00, 0xA8, 0x1F])]);
    }

    #[test]
    fn long_session_is_chunked_with_control_byte() {
        let mut t = I2cTransport::new(RecordingBus::default());
        t.open();
        t.write_byte(0x40);
        for _ in 0..70 {
            t.write_byte(0xFF);
        }
        t.close();
        let bus = t.release();
        let lengths: std::vec::Vec<usize> = bus.writes.iter().map(|(_, w)| w.len()).collect();
        assert_eq!(lengths, vec![33, 33, 7]);
        assert!(bus.writes.iter().all(|(_, w)| w[0] == 0x40));
    }

    #[test]
    fn control_only_session_sends_nothing() {
        let mut t = I2cTransport::new(RecordingBus::default());
        t.open();
        t.write_byte(0x40);
        t.close();
        assert!(t.release().writes.is_empty());
    }

    #[test]
    fn first_error_is_latched() {
        let mut t = I2cTransport::new(RecordingBus {
            failures: 1,
            ..Default::default()
        });
        t.open();
        t.write_byte(0x00);
        t.write_byte(0xAF);
        t.close();
        assert_eq!(t.take_error(), Some(ErrorKind::Bus));
        assert_eq!(t.take_error(), None);
    }

    #[test]
    fn writes_resume_after_bus_error() {
        let mut t = I2cTransport::new(RecordingBus {
            failures: 1,
            ..Default::default()
        });
        for _ in 0..100 {
            t.open();
            t.write_byte(0x40);
            t.write_byte(0xAA);
            t.close();
        }
        assert_eq!(t.take_error(), Some(ErrorKind::Bus));
        let bus = t.release();
        assert_eq!(bus.writes.len(), 99);
        assert!(bus.writes.iter().all(|(_, w)| w == &[0x40, 0xAA]));
    }

    #[test]
    fn full_chunk_is_sent_without_empty_tail() {
        let mut t = I2cTransport::new(RecordingBus::default());
        t.open();
        t.write_byte(0x40);
        for _ in 0..CHUNK {
            t.write_byte(0x55);
        }
        t.close();
        let bus = t.release();
        assert_eq!(bus.writes.len(), 1);
        assert_eq!(bus.writes[0].1.len(), CHUNK + 1);
    }

    // =========================================================================
    // PinButtons Tests
    // =========================================================================

    #[test]
    fn pins_are_active_low() {
        let mut buttons = PinButtons::new(Pin(true), Pin(false), Pin(true));
        assert!(!buttons.is_pressed(Button::Reset));
        assert!(buttons.is_pressed(Button::Decrease));
        assert!(!buttons.is_pressed(Button::Increase));
    }
}
