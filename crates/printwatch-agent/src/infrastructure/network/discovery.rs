//! Discovery engine: turns raw broadcast scans into an ordered candidate
//! list.
//!
//! The engine layers three policies over the broadcast transport:
//!
//! 1. **Idle cutoff** — within one attempt, stop waiting once no new
//!    response has arrived for `idle_timeout`, so a quiet network finishes
//!    in ~idle_timeout instead of the full attempt timeout.
//! 2. **Retry with merge** — run up to `max_retries` attempts and merge
//!    the results, deduplicated by serial number in first-seen order.
//!    UDP drops packets; a printer missed by one probe usually answers the
//!    next.
//! 3. **Diminishing returns** — once at least one printer is known and an
//!    attempt contributes nothing new, further attempts are skipped.
//!
//! Finding nothing is a valid outcome reported as an empty list; only a
//! transport-level failure (socket refused) surfaces as an error.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use printwatch_core::{parse_discovery_response, PrinterIdentity, DISCOVERY_PROBE};

use super::broadcast::{ProbeTransport, TransportError};

/// Error type for discovery runs.
///
/// Deliberately narrow: malformed datagrams and empty results are not
/// errors, only a failing transport is.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Tuning knobs for one discovery run.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Overall deadline per attempt.
    pub timeout: Duration,
    /// Idle gap after which an attempt concludes early.
    pub idle_timeout: Duration,
    /// Number of attempts before giving up.
    pub max_retries: u32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5000),
            idle_timeout: Duration::from_millis(1500),
            max_retries: 3,
        }
    }
}

/// The seam the onboarding flow depends on.
#[async_trait]
pub trait PrinterDiscovery: Send + Sync {
    /// Runs a full discovery scan and returns the deduplicated candidates
    /// in first-seen order.  An empty list means "nothing answered".
    async fn discover(
        &self,
        config: &DiscoveryConfig,
    ) -> Result<Vec<PrinterIdentity>, DiscoveryError>;
}

/// Production engine over a [`ProbeTransport`].
pub struct DiscoveryEngine<T: ProbeTransport> {
    transport: T,
}

impl<T: ProbeTransport> DiscoveryEngine<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Runs one attempt, folding new identities into `found`.
    ///
    /// Returns how many previously unseen printers this attempt added.
    async fn run_attempt(
        &self,
        config: &DiscoveryConfig,
        seen: &mut HashSet<String>,
        found: &mut Vec<PrinterIdentity>,
    ) -> Result<usize, DiscoveryError> {
        let mut rx = self.transport.scan(&DISCOVERY_PROBE, config.timeout).await?;

        let started = Instant::now();
        let mut added = 0;

        loop {
            let elapsed = started.elapsed();
            if elapsed >= config.timeout {
                break;
            }
            // Wait for the next response, but no longer than the idle gap
            // allows and never past the overall deadline.
            let wait = config.idle_timeout.min(config.timeout - elapsed);

            let response = match tokio::time::timeout(wait, rx.recv()).await {
                Ok(Some(response)) => response,
                // Transport closed the stream (offline host or cancelled).
                Ok(None) => break,
                // Idle gap elapsed with nothing new.
                Err(_) => break,
            };

            match parse_discovery_response(&response.payload, response.source.ip()) {
                Ok(identity) => {
                    if seen.insert(identity.serial_number.clone()) {
                        debug!("discovered {identity}");
                        found.push(identity);
                        added += 1;
                    } else {
                        debug!(
                            "duplicate response for serial {} from {}",
                            identity.serial_number, response.source
                        );
                    }
                }
                Err(e) => {
                    // One bad packet never aborts the scan.
                    warn!("dropping malformed datagram from {}: {e}", response.source);
                }
            }
        }

        Ok(added)
    }
}

#[async_trait]
impl<T: ProbeTransport> PrinterDiscovery for DiscoveryEngine<T> {
    async fn discover(
        &self,
        config: &DiscoveryConfig,
    ) -> Result<Vec<PrinterIdentity>, DiscoveryError> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for attempt in 1..=config.max_retries.max(1) {
            let added = self.run_attempt(config, &mut seen, &mut found).await?;
            debug!(attempt, added, total = found.len(), "discovery attempt finished");

            if !found.is_empty() && added == 0 {
                // Diminishing returns: everything answering has answered.
                break;
            }
        }

        info!("discovery finished with {} candidate(s)", found.len());
        Ok(found)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
