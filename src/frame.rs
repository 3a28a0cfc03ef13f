//! ASCII line-frame codec: request bodies and response parsing.
//!
//! The line driver is responsible for everything outside the frame body
//! (the sync byte, the CRC digits, and the trailing `CR LF`) since the CRC
//! must cover exactly the body bytes this module produces. This module only
//! ever sees bytes the line driver has already stripped of `CR`/`LF`/`NUL`
//! and the leading sync byte.

use crate::consts::{DEVICE_ID_MASK, MAX_DESCRIPTION, MAX_UNIT};
use crate::error::ExchangeError;
use crate::hex::{dec2hex, hex2byte};
use heapless::Vec;

/// Longest decimal text a poll value is allowed to occupy on the wire.
pub const MAX_VALUE_TEXT: usize = 24;

/// Which exchange a frame is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Requests a device's description, unit, and poll interval.
    Discover,
    /// Requests a device's current measured value.
    Poll,
}

impl Kind {
    fn as_byte(self) -> u8 {
        match self {
            Kind::Discover => b'D',
            Kind::Poll => b'P',
        }
    }
}

/// Longest a request body (`?DD:Q|`) can be; always exactly 6 bytes.
pub const REQUEST_BODY_LEN: usize = 6;

/// Builds the request body `?DD:Q|` for `dev` and `kind`.
///
/// The line driver appends the CRC digits (of this exact body) and `CR LF`
/// before transmitting.
pub(crate) fn build_request_body(dev: u8, kind: Kind) -> Vec<u8, REQUEST_BODY_LEN> {
    let id = dev & DEVICE_ID_MASK;
    let mut body = Vec::new();
    body.push(b'?').unwrap();
    body.push(dec2hex(id >> 4)).unwrap();
    body.push(dec2hex(id & 0xf)).unwrap();
    body.push(b':').unwrap();
    body.push(kind.as_byte()).unwrap();
    body.push(b'|').unwrap();
    body
}

/// Fields carried by a successful discover response.
#[derive(Debug, Clone)]
pub struct DiscoverFields {
    /// Poll cadence in seconds, as reported by the device.
    pub poll_interval_s: u16,
    /// Opaque description bytes.
    pub description: Vec<u8, MAX_DESCRIPTION>,
    /// Opaque unit bytes.
    pub unit: Vec<u8, MAX_UNIT>,
}

/// Fields carried by a successful poll response.
#[derive(Debug, Clone)]
pub struct PollFields {
    /// The exact value substring as received, for verbatim re-emission.
    pub value_text: Vec<u8, MAX_VALUE_TEXT>,
    /// The value substring parsed as a finite float.
    pub value: f32,
}

/// Splits off the four trailing CRC hex digits and verifies them against a
/// freshly computed CRC of everything before the preceding `|`.
///
/// Returns the header+payload slice up to (but not including) the `|HHHH`
/// suffix on success.
fn verify_and_strip_crc(buf: &[u8]) -> Result<&[u8], ExchangeError> {
    if buf.len() < 5 || buf[buf.len() - 5] != b'|' {
        return Err(ExchangeError::Malformed);
    }
    let crc_covered_len = buf.len() - 4;
    let crc_covered = &buf[..crc_covered_len];
    let digits = [
        buf[buf.len() - 4],
        buf[buf.len() - 3],
        buf[buf.len() - 2],
        buf[buf.len() - 1],
    ];
    let received = crate::hex::hex_to_crc(digits);
    let computed = crate::crc::crc16_buf(crc_covered);
    if received != computed {
        return Err(ExchangeError::CrcMismatch);
    }
    // Drop the trailing '|' that precedes the CRC digits; it belongs to the
    // payload separator, not the payload itself.
    Ok(&crc_covered[..crc_covered.len() - 1])
}

fn check_header(buf: &[u8], dev: u8, kind: Kind) -> Result<(), ExchangeError> {
    if buf.len() < 5 {
        return Err(ExchangeError::Malformed);
    }
    if buf[0] != b'!' || buf[3] != b':' || buf[4] != kind.as_byte() {
        return Err(ExchangeError::Malformed);
    }
    let echoed = hex2byte(buf[1], buf[2]);
    if echoed != (dev & DEVICE_ID_MASK) {
        return Err(ExchangeError::Malformed);
    }
    Ok(())
}

fn parse_decimal_u16(digits: &[u8]) -> Option<u16> {
    if digits.is_empty() {
        return None;
    }
    let mut value: u16 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value.checked_mul(10)?.checked_add((b - b'0') as u16)?;
    }
    Some(value)
}

/// Parses a complete, sync-stripped discover response for `dev`.
pub(crate) fn parse_discover_response(
    buf: &[u8],
    dev: u8,
) -> Result<DiscoverFields, ExchangeError> {
    check_header(buf, dev, Kind::Discover)?;
    let covered = verify_and_strip_crc(buf)?;
    let payload = &covered[5..];

    let mut parts = payload.splitn(3, |&b| b == b'|');
    let interval_digits = parts.next().ok_or(ExchangeError::Malformed)?;
    let description_bytes = parts.next().ok_or(ExchangeError::Malformed)?;
    let unit_bytes = parts.next().ok_or(ExchangeError::Malformed)?;
    if parts.next().is_some() {
        return Err(ExchangeError::Malformed);
    }

    let poll_interval_s = parse_decimal_u16(interval_digits).ok_or(ExchangeError::Malformed)?;

    let mut description = Vec::new();
    description
        .extend_from_slice(description_bytes)
        .map_err(|_| ExchangeError::Malformed)?;
    let mut unit = Vec::new();
    unit.extend_from_slice(unit_bytes)
        .map_err(|_| ExchangeError::Malformed)?;

    Ok(DiscoverFields {
        poll_interval_s,
        description,
        unit,
    })
}

/// Parses a complete, sync-stripped poll response for `dev`.
pub(crate) fn parse_poll_response(buf: &[u8], dev: u8) -> Result<PollFields, ExchangeError> {
    check_header(buf, dev, Kind::Poll)?;
    let covered = verify_and_strip_crc(buf)?;
    let value_bytes = &covered[5..];

    let mut value_text: Vec<u8, MAX_VALUE_TEXT> = Vec::new();
    value_text
        .extend_from_slice(value_bytes)
        .map_err(|_| ExchangeError::Malformed)?;

    let text = core::str::from_utf8(value_bytes).map_err(|_| ExchangeError::Malformed)?;
    let value: f32 = text.parse().map_err(|_| ExchangeError::Malformed)?;
    if !value.is_finite() {
        return Err(ExchangeError::Malformed);
    }

    Ok(PollFields { value_text, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex::crc_to_hex;

    fn framed_discover(dev: u8, interval: &str, desc: &str, unit: &str) -> Vec<u8, 256> {
        let mut body: Vec<u8, 256> = Vec::new();
        body.push(b'!').unwrap();
        body.push(dec2hex((dev & DEVICE_ID_MASK) >> 4)).unwrap();
        body.push(dec2hex(dev & DEVICE_ID_MASK & 0xf)).unwrap();
        body.push(b':').unwrap();
        body.push(b'D').unwrap();
        body.extend_from_slice(interval.as_bytes()).unwrap();
        body.push(b'|').unwrap();
        body.extend_from_slice(desc.as_bytes()).unwrap();
        body.push(b'|').unwrap();
        body.extend_from_slice(unit.as_bytes()).unwrap();
        body.push(b'|').unwrap();
        let crc = crc_to_hex(crate::crc::crc16_buf(&body));
        body.extend_from_slice(&crc).unwrap();
        body
    }

    fn framed_poll(dev: u8, value: &str) -> Vec<u8, 64> {
        let mut body: Vec<u8, 64> = Vec::new();
        body.push(b'!').unwrap();
        body.push(dec2hex((dev & DEVICE_ID_MASK) >> 4)).unwrap();
        body.push(dec2hex(dev & DEVICE_ID_MASK & 0xf)).unwrap();
        body.push(b':').unwrap();
        body.push(b'P').unwrap();
        body.extend_from_slice(value.as_bytes()).unwrap();
        body.push(b'|').unwrap();
        let crc = crc_to_hex(crate::crc::crc16_buf(&body));
        body.extend_from_slice(&crc).unwrap();
        body
    }

    #[test]
    fn request_body_shape() {
        let body = build_request_body(0x09, Kind::Discover);
        assert_eq!(&body[..], b"?09:D|");
    }

    #[test]
    fn request_body_masks_id() {
        let body = build_request_body(0xff, Kind::Poll);
        assert_eq!(&body[..], b"?7f:P|");
    }

    #[test]
    fn discover_round_trip() {
        let frame = framed_discover(9, "60", "sensor", "C");
        let fields = parse_discover_response(&frame, 9).unwrap();
        assert_eq!(fields.poll_interval_s, 60);
        assert_eq!(&fields.description[..], b"sensor");
        assert_eq!(&fields.unit[..], b"C");
    }

    #[test]
    fn discover_rejects_id_mismatch() {
        let frame = framed_discover(9, "60", "sensor", "C");
        assert_eq!(
            parse_discover_response(&frame, 10),
            Err(ExchangeError::Malformed)
        );
    }

    #[test]
    fn discover_rejects_crc_mismatch() {
        let mut frame = framed_discover(9, "60", "sensor", "C");
        let last = frame.len() - 1;
        frame[last] ^= 0x01;
        assert_eq!(
            parse_discover_response(&frame, 9),
            Err(ExchangeError::CrcMismatch)
        );
    }

    #[test]
    fn poll_round_trip() {
        let frame = framed_poll(9, "23.5");
        let fields = parse_poll_response(&frame, 9).unwrap();
        assert_eq!(&fields.value_text[..], b"23.5");
        assert_eq!(fields.value, 23.5f32);
    }

    #[test]
    fn poll_zero_value_parses() {
        let frame = framed_poll(9, "0");
        let fields = parse_poll_response(&frame, 9).unwrap();
        assert_eq!(fields.value, 0.0f32);
    }

    #[test]
    fn poll_rejects_trailing_garbage() {
        // Hand-build a frame whose value field has an embedded non-numeric
        // suffix that isn't separated by the CRC pipe.
        let dev = 9u8;
        let mut body: Vec<u8, 64> = Vec::new();
        body.push(b'!').unwrap();
        body.push(dec2hex(dev >> 4)).unwrap();
        body.push(dec2hex(dev & 0xf)).unwrap();
        body.push(b':').unwrap();
        body.push(b'P').unwrap();
        body.extend_from_slice(b"23x5").unwrap();
        body.push(b'|').unwrap();
        let crc = crc_to_hex(crate::crc::crc16_buf(&body));
        body.extend_from_slice(&crc).unwrap();
        assert_eq!(
            parse_poll_response(&body, dev),
            Err(ExchangeError::Malformed)
        );
    }
}
