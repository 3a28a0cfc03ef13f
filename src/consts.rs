//! Protocol-wide constants for the RS-485 discover/poll bus.
//!
//! These values are fixed by the wire protocol and the devices already
//! deployed on the bus; they are not meant to be tuned at runtime. Timing
//! knobs that a board integration may legitimately want to retune live in
//! [`crate::config::BusMasterConfig`] instead.

/// Maximum length, in bytes, of a device's description field.
pub const MAX_DESCRIPTION: usize = 140;

/// Maximum length, in bytes, of a device's unit field.
pub const MAX_UNIT: usize = 20;

/// Number of device slots in the table, and the modulus for the discover cursor.
pub const MAX_DEVICE: usize = 128;

/// Starting (and maximum) value of a device's consecutive-failure budget.
pub const MAX_FAIL_RESPOND: u8 = 10;

/// Maximum idle gap, in milliseconds, allowed between two bytes of one response.
pub const TIMEOUT_CHAR_MS: u32 = 10;

/// Overall ceiling, in milliseconds, on waiting for a complete response.
pub const TIMEOUT_RESPONSE_MS: u32 = 2_000;

/// Guard delay after a successful receive, letting the slave release the line.
pub const POST_RECV_GUARD_MS: u32 = 2;

/// Interval between forced full-activity reports, in milliseconds.
pub const FULL_REPORT_INTERVAL_MS: u64 = 5 * 60 * 1_000;

/// Bus (RS-485) link baud rate: `16_000_000 / (8 * 17)`.
pub const RS485_BAUD: u32 = 117_647;

/// Console (upstream) link baud rate.
pub const CONSOLE_BAUD: u32 = 500_000;

/// Sync byte prefixed to every master transmission, ahead of the CRC coverage.
pub const SYNC_BYTE: u8 = 0xFF;

/// Start-of-frame byte a slave response must begin with.
pub const START_OF_FRAME: u8 = b'!';

/// Mask applied to a device id before it is placed on the wire.
pub const DEVICE_ID_MASK: u8 = 0x7f;
