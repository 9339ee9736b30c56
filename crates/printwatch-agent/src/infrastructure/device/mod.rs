//! Printer control-endpoint access.
//!
//! # Sub-modules
//!
//! - **`http`** – The production client for the printer's HTTP control
//!   port: status fetch (`/detail`) and credential check (`/product`).
//!
//! The [`DeviceClient`] trait is the seam the validator and the polling
//! coordinator depend on; tests substitute scripted implementations.

pub mod http;

use std::net::IpAddr;

use async_trait::async_trait;
use thiserror::Error;

use printwatch_core::{PrinterIdentity, PrinterRecord, StatusSnapshot};

/// Everything needed to address one printer's control endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceTarget {
    pub address: IpAddr,
    pub serial_number: String,
    pub check_code: String,
}

impl DeviceTarget {
    pub fn from_identity(identity: &PrinterIdentity, check_code: &str) -> Self {
        Self {
            address: identity.address,
            serial_number: identity.serial_number.clone(),
            check_code: check_code.to_string(),
        }
    }

    pub fn from_record(record: &PrinterRecord) -> Self {
        Self {
            address: record.address,
            serial_number: record.serial_number.clone(),
            check_code: record.check_code.clone(),
        }
    }
}

/// Error type for device operations.
///
/// The polling coordinator does not distinguish causes beyond "failure";
/// the validator cares only whether the device answered at all, so two
/// variants suffice.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The printer did not answer (connect failure, timeout, HTTP error).
    #[error("printer at {address} is unreachable: {reason}")]
    Unreachable { address: IpAddr, reason: String },
    /// The printer answered with something that could not be interpreted.
    #[error("printer at {address} returned a malformed response: {reason}")]
    Malformed { address: IpAddr, reason: String },
}

/// Boundary to a single printer's control endpoint.
///
/// Both operations are idempotent and side-effect free beyond the remote
/// handshake; callers may retry freely.
#[async_trait]
pub trait DeviceClient: Send + Sync {
    /// Fetches the printer's current status snapshot.
    async fn fetch_status(&self, target: &DeviceTarget) -> Result<StatusSnapshot, DeviceError>;

    /// Asks the printer whether `target.check_code` is valid.
    ///
    /// `Ok(false)` means the printer answered and rejected the code; an
    /// unreachable printer is an `Err`, never a rejection.
    async fn check_credential(&self, target: &DeviceTarget) -> Result<bool, DeviceError>;
}
