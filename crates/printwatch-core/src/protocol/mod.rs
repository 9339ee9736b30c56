//! Discovery wire format.
//!
//! Printers listen on UDP port [`DISCOVERY_PORT`] and answer any datagram
//! beginning with the probe magic with a fixed-layout identity response:
//!
//! ```text
//! offset 0x00..0x20   printer display name, UTF-8, NUL padded
//! offset 0x20..0x40   serial number, UTF-8, NUL padded
//! ```
//!
//! The responding printer's address comes from the datagram's source, not
//! from the payload.  Anything that does not fit this layout is reported
//! as [`DiscoveryParseError`] so the scan can drop the datagram and keep
//! listening; a malformed packet from one device must never abort a scan.

use std::net::IpAddr;

use thiserror::Error;

use crate::domain::identity::PrinterIdentity;

/// UDP port printers answer discovery probes on.
pub const DISCOVERY_PORT: u16 = 19000;

/// Probe payload broadcast to elicit identity responses.
pub const DISCOVERY_PROBE: [u8; 8] = *b"PWDISC\x01\x00";

const NAME_FIELD: std::ops::Range<usize> = 0x00..0x20;
const SERIAL_FIELD: std::ops::Range<usize> = 0x20..0x40;

/// Minimum length of a well-formed identity response.
pub const RESPONSE_LEN: usize = SERIAL_FIELD.end;

/// Why a datagram yielded no identity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiscoveryParseError {
    /// The datagram is shorter than the fixed response layout.
    #[error("response too short: {len} bytes, need at least {RESPONSE_LEN}")]
    TooShort { len: usize },
    /// A field was not valid UTF-8.
    #[error("response field is not valid UTF-8")]
    BadEncoding,
    /// The serial field was empty; without it the device cannot be keyed.
    #[error("response carries no serial number")]
    EmptySerial,
}

/// Decodes one NUL-padded fixed-width field.
fn field_str(bytes: &[u8]) -> Result<&str, DiscoveryParseError> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    std::str::from_utf8(&bytes[..end])
        .map(str::trim)
        .map_err(|_| DiscoveryParseError::BadEncoding)
}

/// Parses a discovery response datagram into a [`PrinterIdentity`].
///
/// # Errors
///
/// Returns [`DiscoveryParseError`] when the datagram does not match the
/// fixed layout.  Callers log and drop; they do not propagate.
pub fn parse_discovery_response(
    payload: &[u8],
    source: IpAddr,
) -> Result<PrinterIdentity, DiscoveryParseError> {
    if payload.len() < RESPONSE_LEN {
        return Err(DiscoveryParseError::TooShort { len: payload.len() });
    }

    let name = field_str(&payload[NAME_FIELD])?;
    let serial = field_str(&payload[SERIAL_FIELD])?;
    if serial.is_empty() {
        return Err(DiscoveryParseError::EmptySerial);
    }

    Ok(PrinterIdentity {
        name: if name.is_empty() {
            // A nameless response is still addressable; key off the serial.
            serial.to_string()
        } else {
            name.to_string()
        },
        serial_number: serial.to_string(),
        address: source,
    })
}

/// Encodes an identity response the way a printer would.
///
/// Used by test fixtures and the loopback self-check; the agent itself
/// only ever parses responses.
pub fn encode_discovery_response(name: &str, serial: &str) -> Vec<u8> {
    let mut payload = vec![0u8; RESPONSE_LEN];
    write_field(&mut payload[NAME_FIELD], name);
    write_field(&mut payload[SERIAL_FIELD], serial);
    payload
}

fn write_field(field: &mut [u8], value: &str) {
    let bytes = value.as_bytes();
    let len = bytes.len().min(field.len());
    field[..len].copy_from_slice(&bytes[..len]);
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "192.168.1.30";

    fn src() -> IpAddr {
        SOURCE.parse().unwrap()
    }

    #[test]
    fn test_parse_well_formed_response() {
        // Arrange
        let payload = encode_discovery_response("Adventurer 5M", "SN-100");

        // Act
        let identity = parse_discovery_response(&payload, src()).expect("parse");

        // Assert
        assert_eq!(identity.name, "Adventurer 5M");
        assert_eq!(identity.serial_number, "SN-100");
        assert_eq!(identity.address, src());
    }

    #[test]
    fn test_parse_short_datagram_is_too_short() {
        let result = parse_discovery_response(&[0u8; 16], src());
        assert_eq!(result, Err(DiscoveryParseError::TooShort { len: 16 }));
    }

    #[test]
    fn test_parse_empty_serial_is_rejected() {
        let payload = encode_discovery_response("Adventurer 5M", "");
        let result = parse_discovery_response(&payload, src());
        assert_eq!(result, Err(DiscoveryParseError::EmptySerial));
    }

    #[test]
    fn test_parse_invalid_utf8_is_rejected() {
        let mut payload = encode_discovery_response("Adventurer 5M", "SN-100");
        payload[0x21] = 0xFF; // corrupt the serial field
        let result = parse_discovery_response(&payload, src());
        assert_eq!(result, Err(DiscoveryParseError::BadEncoding));
    }

    #[test]
    fn test_parse_nameless_response_falls_back_to_serial() {
        let payload = encode_discovery_response("", "SN-100");
        let identity = parse_discovery_response(&payload, src()).expect("parse");
        assert_eq!(identity.name, "SN-100");
    }

    #[test]
    fn test_parse_ignores_trailing_bytes_past_layout() {
        // Some firmware appends extra diagnostic bytes; they must not matter.
        let mut payload = encode_discovery_response("Adventurer 5M", "SN-100");
        payload.extend_from_slice(b"extra");
        assert!(parse_discovery_response(&payload, src()).is_ok());
    }

    #[test]
    fn test_encode_truncates_oversized_name() {
        let long = "x".repeat(64);
        let payload = encode_discovery_response(&long, "SN-100");
        assert_eq!(payload.len(), RESPONSE_LEN);
        let identity = parse_discovery_response(&payload, src()).expect("parse");
        assert_eq!(identity.name.len(), 0x20);
    }
}
