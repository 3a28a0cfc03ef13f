//! Error taxonomy for the bus master.
//!
//! Two layers are kept distinct: [`ExchangeError`] covers protocol-level bad
//! responses (timeouts, malformed frames, CRC mismatches) which are expected
//! traffic on a noisy multi-drop bus and feed the liveness state machine, and
//! [`LineError`] wraps genuine hardware faults surfaced by the underlying
//! `embedded-hal-nb` serial or digital traits.

use thiserror::Error;

/// A request/response exchange with a device did not succeed at the protocol
/// level. These are routine on a shared bus and are not logged as hardware
/// faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExchangeError {
    /// No valid frame arrived before the character or response timeout.
    #[error("timeout waiting for response")]
    Timeout,
    /// A frame arrived but failed to parse (bad prefix, id echo, kind, or
    /// field structure).
    #[error("malformed response frame")]
    Malformed,
    /// A frame parsed structurally but its CRC did not match.
    #[error("CRC mismatch")]
    CrcMismatch,
}

/// A fault from the underlying serial or digital peripheral, as opposed to a
/// bad response from a device. `E` is the HAL's own serial error type.
#[derive(Debug, Error)]
pub enum LineError<E> {
    /// The serial peripheral reported an error.
    #[error("serial line fault")]
    Serial(#[source] E),
    /// The direction-control GPIO reported an error.
    #[error("direction control fault")]
    Direction,
}
