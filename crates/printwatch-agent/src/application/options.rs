//! Post-onboarding options: editing a stored record's poll interval.

use thiserror::Error;
use tracing::info;

use printwatch_core::{MAX_POLL_INTERVAL_SECS, MIN_POLL_INTERVAL_SECS};

use crate::infrastructure::storage::{RecordStore, StoreError};

/// Error type for the options flow.
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error(
        "poll interval {value}s is outside the allowed range \
         {MIN_POLL_INTERVAL_SECS}..={MAX_POLL_INTERVAL_SECS} seconds"
    )]
    IntervalOutOfRange { value: u64 },

    #[error("no printer with serial {0} is configured")]
    UnknownPrinter(String),

    #[error("failed to persist the updated record: {0}")]
    Store(#[from] StoreError),
}

/// Sets the poll interval on the record keyed by `serial`.
///
/// The range check runs before the lookup, so an out-of-range value is
/// reported as such even for an unknown serial.  The stored record is
/// untouched on any error.
pub fn update_poll_interval(
    store: &dyn RecordStore,
    serial: &str,
    interval_secs: u64,
) -> Result<(), OptionsError> {
    if !(MIN_POLL_INTERVAL_SECS..=MAX_POLL_INTERVAL_SECS).contains(&interval_secs) {
        return Err(OptionsError::IntervalOutOfRange {
            value: interval_secs,
        });
    }

    let mut record = store
        .get(serial)
        .ok_or_else(|| OptionsError::UnknownPrinter(serial.to_string()))?;

    record.poll_interval_secs = interval_secs;
    store.put(record)?;
    info!("poll interval for {serial} set to {interval_secs}s");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
