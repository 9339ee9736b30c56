//! Polling coordinator: one background task per printer, publishing the
//! latest status to any number of subscribers.
//!
//! The task owns the fetch loop; everyone else observes it through a
//! `watch` channel.  Each cycle fetches the status, folds the result into
//! a [`PollState`], publishes it atomically, and sleeps until the next
//! tick — or earlier, when a refresh is requested or the poller is shut
//! down.
//!
//! Refresh requests coalesce: while a fetch is in flight, any number of
//! [`PollerHandle::request_refresh`] calls result in at most one extra
//! fetch, because the underlying [`Notify`] stores a single permit.
//!
//! The poll interval is captured from the record at spawn time; after an
//! options change the caller replaces the poller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use printwatch_core::{PrinterRecord, StatusSnapshot};

use crate::infrastructure::device::{DeviceClient, DeviceTarget};

/// What the poller currently knows about its printer.
///
/// `last_snapshot` survives failures: after an outage the consumer still
/// sees the last good data, flagged stale by `available == false`.
#[derive(Debug, Clone, Default)]
pub struct PollState {
    /// Most recent successfully fetched snapshot, if any ever succeeded.
    pub last_snapshot: Option<Arc<StatusSnapshot>>,
    /// When the last successful fetch completed.
    pub last_success: Option<Instant>,
    /// Failures since the last success; zero while healthy.
    pub consecutive_failures: u32,
    /// Whether the most recent fetch succeeded.  Starts `false`.
    pub available: bool,
}

/// Handle to a running poller task.
///
/// Dropping the handle without calling [`shutdown`](Self::shutdown) leaves
/// the task running detached until the runtime stops.
pub struct PollerHandle {
    state_rx: watch::Receiver<PollState>,
    refresh: Arc<Notify>,
    stop: Arc<Notify>,
    running: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Snapshot of the current poll state.
    pub fn current_state(&self) -> PollState {
        self.state_rx.borrow().clone()
    }

    /// A receiver that observes every published state change.
    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state_rx.clone()
    }

    /// Asks the poller to fetch now instead of waiting for the next tick.
    ///
    /// Cheap and non-blocking; redundant requests coalesce.
    pub fn request_refresh(&self) {
        self.refresh.notify_one();
    }

    /// Stops the poller and waits for the task to finish.  No state is
    /// published after this returns.
    pub async fn shutdown(self) {
        self.running.store(false, Ordering::SeqCst);
        self.stop.notify_one();
        if let Err(e) = self.task.await {
            warn!("poller task ended abnormally: {e}");
        }
    }
}

/// Spawns the polling task for one printer record.
///
/// The first fetch starts immediately; subscribers see the initial
/// unavailable [`PollState`] until it completes.
pub fn spawn_poller(client: Arc<dyn DeviceClient>, record: PrinterRecord) -> PollerHandle {
    let (state_tx, state_rx) = watch::channel(PollState::default());
    let refresh = Arc::new(Notify::new());
    let stop = Arc::new(Notify::new());
    let running = Arc::new(AtomicBool::new(true));

    let task = tokio::spawn(run_poll_loop(
        client,
        record,
        state_tx,
        Arc::clone(&refresh),
        Arc::clone(&stop),
        Arc::clone(&running),
    ));

    PollerHandle {
        state_rx,
        refresh,
        stop,
        running,
        task,
    }
}

async fn run_poll_loop(
    client: Arc<dyn DeviceClient>,
    record: PrinterRecord,
    state_tx: watch::Sender<PollState>,
    refresh: Arc<Notify>,
    stop: Arc<Notify>,
    running: Arc<AtomicBool>,
) {
    let target = DeviceTarget::from_record(&record);
    let interval = Duration::from_secs(record.poll_interval_secs);
    info!(
        "polling {} at {} every {}s",
        record.serial_number, record.address, record.poll_interval_secs
    );

    while running.load(Ordering::SeqCst) {
        let result = client.fetch_status(&target).await;

        // Shutdown during the fetch: drop the result, publish nothing.
        if !running.load(Ordering::SeqCst) {
            break;
        }

        let mut state = state_tx.borrow().clone();
        match result {
            Ok(snapshot) => {
                state.last_snapshot = Some(Arc::new(snapshot));
                state.last_success = Some(Instant::now());
                state.consecutive_failures = 0;
                state.available = true;
                debug!("poll of {} succeeded", record.serial_number);
            }
            Err(e) => {
                state.consecutive_failures += 1;
                state.available = false;
                warn!(
                    "poll of {} failed ({} consecutive): {e}",
                    record.serial_number, state.consecutive_failures
                );
            }
        }
        // Publish even when every receiver is gone; send_replace never
        // fails and a later subscribe() still observes fresh state.
        state_tx.send_replace(state);

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = refresh.notified() => {
                debug!("refresh requested for {}", record.serial_number);
            }
            _ = stop.notified() => break,
        }
    }

    info!("poller for {} stopped", record.serial_number);
}

// ── Tests ─────────────────────────────────────────────────────────────────────
//
// Timing-driven scenarios (availability flips, refresh coalescing, prompt
// shutdown) live in tests/poller_integration.rs.
