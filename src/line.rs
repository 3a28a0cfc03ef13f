//! Half-duplex RS-485 line driver.
//!
//! Owns the serial peripheral and the two direction-control GPIOs (`DE`/`RE`
//! on the transceiver), and implements the transmit/receive sequencing from
//! the exchange protocol: sync byte, guard delays around direction flips,
//! and the dual character/response timeout on receive.

use crate::clock::Clock;
use crate::config::BusMasterConfig;
use crate::consts::{MAX_DESCRIPTION, MAX_UNIT, START_OF_FRAME, SYNC_BYTE};
use crate::error::LineError;
use embedded_hal::digital::OutputPin;
use embedded_hal_nb::serial::{ErrorType, Read, Write};
use heapless::Vec;
use nb::block;

/// Upper bound on a single response frame, generous enough for the longest
/// discover response (`!DD:D` + interval digits + description + unit +
/// three separators + CRC) with headroom.
pub const MAX_FRAME_LEN: usize = MAX_DESCRIPTION + MAX_UNIT + 32;

/// Outcome of one [`LineDriver::recv`] attempt.
#[derive(Debug)]
pub enum RecvOutcome {
    /// A complete frame was received, sync-stripped of `CR`/`LF`/`NUL`.
    Frame(Vec<u8, MAX_FRAME_LEN>),
    /// Neither a character nor the overall response arrived in time.
    Timeout,
}

/// Drives a half-duplex RS-485 transceiver over one UART and two direction
/// GPIOs (`DE` and `RE`, asserted together).
pub struct LineDriver<U, DE, RE> {
    uart: U,
    de: DE,
    re: RE,
}

impl<U, DE, RE> LineDriver<U, DE, RE>
where
    U: ErrorType + Read<u8> + Write<u8>,
    DE: OutputPin,
    RE: OutputPin,
{
    /// Builds a new line driver, leaving the transceiver in receive mode.
    pub fn new(uart: U, de: DE, re: RE) -> Self {
        let mut this = Self { uart, de, re };
        let _ = this.set_rx_mode();
        this
    }

    fn set_tx_mode(&mut self) -> Result<(), LineError<U::Error>> {
        self.de.set_high().map_err(|_| LineError::Direction)?;
        self.re.set_high().map_err(|_| LineError::Direction)?;
        Ok(())
    }

    fn set_rx_mode(&mut self) -> Result<(), LineError<U::Error>> {
        self.de.set_low().map_err(|_| LineError::Direction)?;
        self.re.set_low().map_err(|_| LineError::Direction)?;
        Ok(())
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), LineError<U::Error>> {
        block!(self.uart.write(byte)).map_err(LineError::Serial)
    }

    fn flush(&mut self) -> Result<(), LineError<U::Error>> {
        block!(self.uart.flush()).map_err(LineError::Serial)
    }

    fn drain_rx(&mut self) {
        while self.uart.read().is_ok() {}
    }

    /// Transmits `body` (a frame built by [`crate::frame`]) plus its CRC and
    /// line terminator, then flips the transceiver back to receive.
    pub fn send<C: Clock>(
        &mut self,
        body: &[u8],
        crc_digits: [u8; 4],
        clock: &mut C,
    ) -> Result<(), LineError<U::Error>> {
        self.set_tx_mode()?;
        clock.delay_guard();

        self.write_byte(SYNC_BYTE)?;
        for &b in body {
            self.write_byte(b)?;
        }
        for &b in &crc_digits {
            self.write_byte(b)?;
        }
        self.write_byte(b'\r')?;
        self.write_byte(b'\n')?;
        self.flush()?;

        clock.delay_guard();
        self.set_rx_mode()?;
        Ok(())
    }

    /// Waits for one response frame, subject to the character and response
    /// timeouts in `cfg`. On a successful frame, applies the post-receive
    /// guard delay before returning.
    pub fn recv<C: Clock>(
        &mut self,
        cfg: &BusMasterConfig,
        clock: &mut C,
    ) -> Result<RecvOutcome, LineError<U::Error>> {
        self.drain_rx();
        clock.delay_guard();
        self.set_rx_mode()?;
        clock.delay_guard();

        let start_ms = clock.now_ms();
        let mut last_byte_ms = start_ms;
        let mut buf: Vec<u8, MAX_FRAME_LEN> = Vec::new();

        loop {
            match self.uart.read() {
                Ok(byte) => {
                    last_byte_ms = clock.now_ms();
                    if buf.is_empty() && byte != START_OF_FRAME {
                        continue;
                    }
                    match byte {
                        b'\n' => {
                            clock.delay_ms(cfg.post_recv_guard_ms);
                            return Ok(RecvOutcome::Frame(buf));
                        }
                        b'\r' | 0x00 => continue,
                        _ => {
                            // Overflow bytes are dropped silently; reception
                            // continues so a later '\n' can still end it.
                            let _ = buf.push(byte);
                        }
                    }
                }
                Err(nb::Error::WouldBlock) => {
                    let now = clock.now_ms();
                    if now.saturating_sub(last_byte_ms) >= cfg.timeout_char_ms as u64
                        || now.saturating_sub(start_ms) >= cfg.timeout_response_ms as u64
                    {
                        return Ok(RecvOutcome::Timeout);
                    }
                }
                Err(nb::Error::Other(e)) => return Err(LineError::Serial(e)),
            }
        }
    }
}
