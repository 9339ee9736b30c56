//! Printer identity and the durable onboarded record.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Lower bound for the poll interval, in seconds.
pub const MIN_POLL_INTERVAL_SECS: u64 = 5;
/// Upper bound for the poll interval, in seconds (inclusive).
pub const MAX_POLL_INTERVAL_SECS: u64 = 300;
/// Poll interval assigned to freshly onboarded printers.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// A printer located on the local network.
///
/// Produced by the discovery engine from a response datagram, or assembled
/// from the operator's manual entry.  Immutable once constructed.
///
/// Two identities describe the same physical printer iff their serial
/// numbers match.  The address can change between scans (DHCP lease
/// renewal), so equality and hashing ignore everything but the serial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrinterIdentity {
    /// Name the printer advertises (its configured display name).
    pub name: String,
    /// Factory serial number; the unique key for this device.
    pub serial_number: String,
    /// Address the printer answered from.
    pub address: IpAddr,
}

impl PartialEq for PrinterIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.serial_number == other.serial_number
    }
}

impl Eq for PrinterIdentity {}

impl Hash for PrinterIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.serial_number.hash(state);
    }
}

impl fmt::Display for PrinterIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (serial: {}) @ {}",
            self.name, self.serial_number, self.address
        )
    }
}

/// The durable unit created when onboarding completes.
///
/// Owned by the record store for its lifetime; the polling coordinator
/// only ever reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterRecord {
    /// Display name chosen by the operator (defaults to the advertised name).
    pub name: String,
    /// Address the printer was validated at.
    pub address: IpAddr,
    /// Factory serial number; unique across all onboarded printers.
    pub serial_number: String,
    /// Shared secret proving authorization to control the printer.
    pub check_code: String,
    /// Seconds between status polls, within
    /// [`MIN_POLL_INTERVAL_SECS`]..=[`MAX_POLL_INTERVAL_SECS`].
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

impl PrinterRecord {
    /// Builds a record from a validated identity and check code with the
    /// default poll interval.
    pub fn from_identity(identity: &PrinterIdentity, check_code: &str) -> Self {
        Self {
            name: identity.name.clone(),
            address: identity.address,
            serial_number: identity.serial_number.clone(),
            check_code: check_code.to_string(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn identity(serial: &str, addr: &str) -> PrinterIdentity {
        PrinterIdentity {
            name: "Adventurer 5M".to_string(),
            serial_number: serial.to_string(),
            address: addr.parse().unwrap(),
        }
    }

    #[test]
    fn test_identities_with_same_serial_are_equal_despite_address() {
        // Arrange: same serial seen at two different addresses
        let a = identity("SN-100", "192.168.1.30");
        let b = identity("SN-100", "192.168.1.99");

        // Assert
        assert_eq!(a, b, "serial number alone must decide identity");
    }

    #[test]
    fn test_identities_with_different_serials_are_not_equal() {
        let a = identity("SN-100", "192.168.1.30");
        let b = identity("SN-200", "192.168.1.30");
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_set_deduplicates_by_serial() {
        let mut set = HashSet::new();
        set.insert(identity("SN-100", "192.168.1.30"));
        set.insert(identity("SN-100", "192.168.1.99"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_display_includes_name_serial_and_address() {
        let id = identity("SN-100", "192.168.1.30");
        assert_eq!(
            id.to_string(),
            "Adventurer 5M (serial: SN-100) @ 192.168.1.30"
        );
    }

    #[test]
    fn test_record_from_identity_uses_default_interval() {
        // Arrange
        let id = identity("SN-100", "192.168.1.30");

        // Act
        let record = PrinterRecord::from_identity(&id, "c0de");

        // Assert
        assert_eq!(record.poll_interval_secs, DEFAULT_POLL_INTERVAL_SECS);
        assert_eq!(record.serial_number, "SN-100");
        assert_eq!(record.check_code, "c0de");
    }
}
