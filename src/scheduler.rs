//! The cooperative discover/poll scheduler.
//!
//! [`BusMaster::step`] runs one outer iteration: a poll sweep over every due
//! device in ascending id order, one discover probe at the round-robin
//! cursor, the full-report cadence check, and a console nudge drain. It
//! never blocks beyond what the line driver itself blocks for; a board's
//! `main` calls `step()` in a loop that never returns.

use crate::clock::Clock;
use crate::config::BusMasterConfig;
use crate::consts::MAX_DEVICE;
use crate::device::DeviceTable;
use crate::error::LineError;
use crate::frame::{self, Kind};
use crate::hex::crc_to_hex;
use crate::line::{LineDriver, RecvOutcome};
use crate::liveness;
use crate::report::Reporter;
use embedded_hal::digital::OutputPin;
use embedded_hal_nb::serial::{ErrorType, Read, Write};

/// Owns the device table and scheduling cursors for one bus.
///
/// Generic over the bus UART/direction pins (`BU`, `BDE`, `BRE`), the
/// console UART (`CU`), and the board's [`Clock`] implementation, so the
/// crate never depends on a specific MCU's peripheral types.
pub struct BusMaster<BU, BDE, BRE, CU, C> {
    cfg: BusMasterConfig,
    table: DeviceTable,
    line: LineDriver<BU, BDE, BRE>,
    console: CU,
    clock: C,
    discover_idx: usize,
    do_full_report: bool,
    next_full_report_time_ms: u64,
}

impl<BU, BDE, BRE, CU, C> BusMaster<BU, BDE, BRE, CU, C>
where
    BU: ErrorType + Read<u8> + Write<u8>,
    BDE: OutputPin,
    BRE: OutputPin,
    CU: ErrorType + Read<u8>,
    C: Clock,
{
    /// Builds a bus master from its peripherals and a clock, with the
    /// default timing configuration. The device table starts empty
    /// (all slots inactive) and the first outer iteration always performs a
    /// full report, matching the original firmware's boot-time behavior.
    pub fn new(bus_uart: BU, bus_de: BDE, bus_re: BRE, console: CU, clock: C) -> Self {
        Self::with_config(bus_uart, bus_de, bus_re, console, clock, BusMasterConfig::default())
    }

    /// As [`BusMaster::new`], with an explicit [`BusMasterConfig`].
    pub fn with_config(
        bus_uart: BU,
        bus_de: BDE,
        bus_re: BRE,
        console: CU,
        clock: C,
        cfg: BusMasterConfig,
    ) -> Self {
        Self {
            cfg,
            table: DeviceTable::new(),
            line: LineDriver::new(bus_uart, bus_de, bus_re),
            console,
            clock,
            discover_idx: 0,
            do_full_report: true,
            next_full_report_time_ms: 0,
        }
    }

    /// Writes the boot banner to the console. Call once before the first
    /// [`BusMaster::step`].
    pub fn announce(&mut self, reporter: &mut impl Reporter) {
        reporter.banner();
    }

    /// Runs one outer scheduler iteration.
    pub fn step(&mut self, reporter: &mut impl Reporter) -> Result<(), LineError<BU::Error>> {
        self.poll_sweep(reporter)?;
        self.discover_probe(reporter)?;
        self.advance_full_report_cadence();
        self.drain_console_nudge();
        Ok(())
    }

    fn exchange(
        &mut self,
        dev: u8,
        kind: Kind,
    ) -> Result<RecvOutcome, LineError<BU::Error>> {
        let body = frame::build_request_body(dev, kind);
        let crc = crc_to_hex(crate::crc::crc16_buf(&body));
        self.line.send(&body, crc, &mut self.clock)?;
        self.line.recv(&self.cfg, &mut self.clock)
    }

    fn poll_sweep(&mut self, reporter: &mut impl Reporter) -> Result<(), LineError<BU::Error>> {
        for dev in 0..MAX_DEVICE as u8 {
            let due = {
                let record = self.table.get(dev as usize);
                record.is_active()
                    && (record.last_poll_time_ms == 0
                        || record.last_poll_time_ms + record.poll_interval_s as u64 * 1000
                            <= self.clock.now_ms())
            };
            if !due {
                continue;
            }
            let start_ms = self.clock.now_ms();
            let outcome = self.exchange(dev, Kind::Poll)?;
            let result = match outcome {
                RecvOutcome::Frame(buf) => frame::parse_poll_response(&buf, dev),
                RecvOutcome::Timeout => Err(crate::error::ExchangeError::Timeout),
            };
            let record = self.table.get_mut(dev as usize);
            liveness::apply_poll(&self.cfg, record, dev, result, start_ms, reporter);
        }
        Ok(())
    }

    fn discover_probe(&mut self, reporter: &mut impl Reporter) -> Result<(), LineError<BU::Error>> {
        let dev = self.discover_idx as u8;
        let outcome = self.exchange(dev, Kind::Discover)?;
        let result = match outcome {
            RecvOutcome::Frame(buf) => frame::parse_discover_response(&buf, dev),
            RecvOutcome::Timeout => Err(crate::error::ExchangeError::Timeout),
        };
        let force_report = self.do_full_report;
        let record = self.table.get_mut(dev as usize);
        liveness::apply_discover(&self.cfg, record, dev, result, force_report, reporter);

        self.discover_idx = (self.discover_idx + 1) % MAX_DEVICE;
        Ok(())
    }

    fn advance_full_report_cadence(&mut self) {
        if self.discover_idx != 0 {
            return;
        }
        if self.do_full_report {
            self.do_full_report = false;
            self.next_full_report_time_ms =
                self.clock.now_ms() + self.cfg.full_report_interval_ms;
        } else if self.clock.now_ms() >= self.next_full_report_time_ms {
            self.do_full_report = true;
        }
    }

    fn drain_console_nudge(&mut self) {
        let mut saw_newline = false;
        loop {
            match self.console.read() {
                Ok(b'\n') => saw_newline = true,
                Ok(_) => {}
                Err(_) => break,
            }
        }
        if saw_newline {
            self.next_full_report_time_ms = self.clock.now_ms();
        }
    }
}
