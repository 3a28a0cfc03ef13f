//! Console report emission.
//!
//! Three line shapes are written whenever the liveness state machine or the
//! scheduler decides a change is worth surfacing, plus a boot banner and a
//! pair of non-normative diagnostic lines carried over from the original
//! firmware's failure paths. All writes are fire-and-forget: a console
//! write failure is not a bus fault and is never propagated.

use embedded_hal_nb::serial::{ErrorType, Write};
use nb::block;

/// Destination for status lines. Implemented by [`ConsoleReporter`] for a
/// concrete UART, and fakeable in tests.
pub trait Reporter {
    /// A device transitioned to (or re-affirmed) active status.
    fn active(&mut self, dev: u8, poll_interval_s: u16, description: &[u8], unit: &[u8]);
    /// A device transitioned to inactive status.
    fn inactive(&mut self, dev: u8);
    /// A poll succeeded; `value_text` is the exact substring received.
    fn poll(&mut self, dev: u8, value_text: &[u8]);
    /// Non-normative diagnostic carried over from the original firmware.
    fn crc_mismatch(&mut self, dev: u8);
    /// Non-normative diagnostic carried over from the original firmware.
    fn poll_timeout(&mut self, dev: u8);
    /// Boot banner.
    fn banner(&mut self);
}

/// Writes status lines to a UART, one byte at a time via `nb::block!`.
pub struct ConsoleReporter<U> {
    uart: U,
}

impl<U> ConsoleReporter<U>
where
    U: ErrorType + Write<u8>,
{
    /// Wraps a UART as a [`Reporter`].
    pub fn new(uart: U) -> Self {
        Self { uart }
    }

    fn put(&mut self, byte: u8) {
        let _ = block!(self.uart.write(byte));
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.put(b);
        }
    }

    fn write_decimal(&mut self, mut value: u32) {
        let mut digits = [0u8; 10];
        let mut len = 0;
        if value == 0 {
            self.put(b'0');
            return;
        }
        while value > 0 {
            digits[len] = b'0' + (value % 10) as u8;
            value /= 10;
            len += 1;
        }
        for i in (0..len).rev() {
            self.put(digits[i]);
        }
    }

    fn write_dev_id(&mut self, dev: u8) {
        self.write_decimal(dev as u32);
    }

    fn newline(&mut self) {
        self.put(b'\n');
    }
}

impl<U> Reporter for ConsoleReporter<U>
where
    U: ErrorType + Write<u8>,
{
    fn active(&mut self, dev: u8, poll_interval_s: u16, description: &[u8], unit: &[u8]) {
        self.write_bytes(b"ACTIVE ");
        self.write_dev_id(dev);
        self.put(b'|');
        self.write_decimal(poll_interval_s as u32);
        self.put(b'|');
        self.write_bytes(description);
        self.put(b'|');
        self.write_bytes(unit);
        self.newline();
    }

    fn inactive(&mut self, dev: u8) {
        self.write_bytes(b"INACTIVE ");
        self.write_dev_id(dev);
        self.newline();
    }

    fn poll(&mut self, dev: u8, value_text: &[u8]) {
        self.write_bytes(b"POLL ");
        self.write_dev_id(dev);
        self.put(b' ');
        self.write_bytes(value_text);
        self.newline();
    }

    fn crc_mismatch(&mut self, dev: u8) {
        self.write_bytes(b"CRC mismatch on device ");
        self.write_dev_id(dev);
        self.newline();
    }

    fn poll_timeout(&mut self, dev: u8) {
        self.write_bytes(b"Timeout from poll on device ");
        self.write_dev_id(dev);
        self.newline();
    }

    fn banner(&mut self) {
        self.write_bytes(b"Master initialised.");
        self.newline();
    }
}
