//! Credential validation: the two-step handshake that proves a check code
//! against a live printer.
//!
//! Ordering matters.  The status fetch runs first, so a printer that does
//! not answer at all is reported as [`ValidationOutcome::Unreachable`] and
//! never as a rejection — the onboarding UI must be able to tell "wrong
//! code" apart from "can't find printer".

use tracing::{debug, warn};

use crate::infrastructure::device::{DeviceClient, DeviceTarget};

/// Fallback display name when the printer does not report one.
pub const DEFAULT_PRINTER_NAME: &str = "3D Printer";

/// Verdict of one validation handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Reachable and the check code was accepted.
    Accepted {
        /// Name the printer reports about itself, for display.
        machine_name: String,
    },
    /// Reachable, but the check code was refused.
    Rejected,
    /// The printer did not answer.
    Unreachable { cause: String },
}

/// Runs the handshake: status fetch for reachability and metadata, then
/// the credential check as the authoritative verdict.
///
/// Idempotent and side-effect free beyond the remote requests; safe to
/// call again after a transient failure.
pub async fn validate_credentials(
    client: &dyn DeviceClient,
    target: &DeviceTarget,
) -> ValidationOutcome {
    let snapshot = match client.fetch_status(target).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("printer {} did not answer status fetch: {e}", target.address);
            return ValidationOutcome::Unreachable {
                cause: e.to_string(),
            };
        }
    };

    match client.check_credential(target).await {
        Ok(true) => {
            debug!("check code accepted by {}", target.address);
            ValidationOutcome::Accepted {
                machine_name: snapshot
                    .name
                    .unwrap_or_else(|| DEFAULT_PRINTER_NAME.to_string()),
            }
        }
        Ok(false) => {
            debug!("check code rejected by {}", target.address);
            ValidationOutcome::Rejected
        }
        Err(e) => {
            warn!("printer {} dropped the credential check: {e}", target.address);
            ValidationOutcome::Unreachable {
                cause: e.to_string(),
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
