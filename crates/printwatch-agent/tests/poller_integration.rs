//! Integration tests for the polling coordinator.
//!
//! A scripted device client plays the printer; the tests drive the poller
//! through `request_refresh` rather than waiting for the interval timer
//! (the interval is set to 60s so it never interferes), and observe every
//! published state through a `watch` subscription.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use printwatch_core::{MachineState, PrinterRecord, StatusSnapshot};

use printwatch_agent::application::poller::{spawn_poller, PollState, PollerHandle};
use printwatch_agent::infrastructure::device::{DeviceClient, DeviceError, DeviceTarget};

// ── Scripted device ───────────────────────────────────────────────────────────

/// Pops one scripted verdict per fetch; when the script runs out, the
/// last verdict repeats.  An optional gate makes fetches block until the
/// test releases a permit.
struct ScriptedDevice {
    script: Mutex<VecDeque<bool>>,
    fetches: AtomicU32,
    gate: Option<Semaphore>,
}

impl ScriptedDevice {
    fn new(script: &[bool]) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.iter().copied().collect()),
            fetches: AtomicU32::new(0),
            gate: None,
        })
    }

    /// Like [`new`](Self::new), but every fetch waits for one gate permit
    /// before answering.
    fn gated(script: &[bool]) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.iter().copied().collect()),
            fetches: AtomicU32::new(0),
            gate: Some(Semaphore::new(0)),
        })
    }

    fn fetch_count(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }

    fn release_one(&self) {
        self.gate.as_ref().expect("gated device").add_permits(1);
    }

    fn next_verdict(&self) -> bool {
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().copied().unwrap_or(true)
        }
    }
}

#[async_trait]
impl DeviceClient for ScriptedDevice {
    async fn fetch_status(&self, target: &DeviceTarget) -> Result<StatusSnapshot, DeviceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        if self.next_verdict() {
            Ok(StatusSnapshot {
                machine_state: MachineState::Building,
                print_progress: Some(42.7),
                ..Default::default()
            })
        } else {
            Err(DeviceError::Unreachable {
                address: target.address,
                reason: "timed out".to_string(),
            })
        }
    }

    async fn check_credential(&self, target: &DeviceTarget) -> Result<bool, DeviceError> {
        // The poller never checks credentials.
        Err(DeviceError::Unreachable {
            address: target.address,
            reason: "unexpected call".to_string(),
        })
    }
}

/// Record with an interval long enough that only refreshes drive fetches.
fn slow_record() -> PrinterRecord {
    PrinterRecord {
        name: "Workbench".to_string(),
        address: "192.168.1.30".parse().unwrap(),
        serial_number: "SN-100".to_string(),
        check_code: "c0de".to_string(),
        poll_interval_secs: 60,
    }
}

/// Waits for the next published state, failing the test after 5s.
async fn next_state(
    rx: &mut tokio::sync::watch::Receiver<PollState>,
) -> PollState {
    tokio::time::timeout(Duration::from_secs(5), rx.changed())
        .await
        .expect("poller published nothing within 5s")
        .expect("poller dropped its sender");
    rx.borrow_and_update().clone()
}

async fn shutdown_within(handle: PollerHandle, secs: u64) {
    tokio::time::timeout(Duration::from_secs(secs), handle.shutdown())
        .await
        .expect("shutdown did not complete in time");
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_first_fetch_makes_the_printer_available() {
    let device = ScriptedDevice::new(&[true]);
    let handle = spawn_poller(Arc::clone(&device) as Arc<dyn DeviceClient>, slow_record());
    let mut rx = handle.subscribe();

    let state = next_state(&mut rx).await;

    assert!(state.available);
    assert_eq!(state.consecutive_failures, 0);
    assert!(state.last_success.is_some());
    let snapshot = state.last_snapshot.expect("snapshot published");
    assert_eq!(snapshot.machine_state, MachineState::Building);

    shutdown_within(handle, 5).await;
}

#[tokio::test]
async fn test_availability_flips_and_stale_snapshot_is_retained() {
    // Arrange: fail, recover, fail again
    let device = ScriptedDevice::new(&[false, true, false]);
    let handle = spawn_poller(Arc::clone(&device) as Arc<dyn DeviceClient>, slow_record());
    let mut rx = handle.subscribe();

    // First fetch fails: unavailable, no data yet
    let state = next_state(&mut rx).await;
    assert!(!state.available);
    assert_eq!(state.consecutive_failures, 1);
    assert!(state.last_snapshot.is_none());

    // Recovery
    handle.request_refresh();
    let state = next_state(&mut rx).await;
    assert!(state.available);
    assert_eq!(state.consecutive_failures, 0);
    assert!(state.last_snapshot.is_some());
    let last_success = state.last_success;

    // Outage: unavailable again, but the old snapshot is still there
    handle.request_refresh();
    let state = next_state(&mut rx).await;
    assert!(!state.available);
    assert_eq!(state.consecutive_failures, 1);
    assert!(
        state.last_snapshot.is_some(),
        "stale snapshot must survive a failed poll"
    );
    assert_eq!(state.last_success, last_success);

    shutdown_within(handle, 5).await;
}

#[tokio::test]
async fn test_consecutive_failures_accumulate_until_a_success() {
    let device = ScriptedDevice::new(&[false, false, false, true]);
    let handle = spawn_poller(Arc::clone(&device) as Arc<dyn DeviceClient>, slow_record());
    let mut rx = handle.subscribe();

    assert_eq!(next_state(&mut rx).await.consecutive_failures, 1);
    handle.request_refresh();
    assert_eq!(next_state(&mut rx).await.consecutive_failures, 2);
    handle.request_refresh();
    assert_eq!(next_state(&mut rx).await.consecutive_failures, 3);

    handle.request_refresh();
    let state = next_state(&mut rx).await;
    assert_eq!(state.consecutive_failures, 0);
    assert!(state.available);

    shutdown_within(handle, 5).await;
}

#[tokio::test]
async fn test_refreshes_during_a_fetch_coalesce_into_one_extra_fetch() {
    // Arrange: the gate holds the first fetch in flight
    let device = ScriptedDevice::gated(&[true]);
    let handle = spawn_poller(Arc::clone(&device) as Arc<dyn DeviceClient>, slow_record());
    let mut rx = handle.subscribe();

    // Wait until fetch #1 is actually in flight
    while device.fetch_count() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    // Act: several refresh requests while the fetch is blocked
    handle.request_refresh();
    handle.request_refresh();
    handle.request_refresh();

    // Let fetch #1 finish; the coalesced refreshes trigger exactly one more
    device.release_one();
    next_state(&mut rx).await;
    device.release_one();
    next_state(&mut rx).await;

    // Assert: no third fetch follows
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        device.fetch_count(),
        2,
        "redundant refresh requests must coalesce"
    );

    // Unblock any future fetch so shutdown is never stuck on the gate
    device.release_one();
    shutdown_within(handle, 5).await;
}

#[tokio::test]
async fn test_current_state_matches_the_latest_publication() {
    let device = ScriptedDevice::new(&[true]);
    let handle = spawn_poller(Arc::clone(&device) as Arc<dyn DeviceClient>, slow_record());
    let mut rx = handle.subscribe();

    next_state(&mut rx).await;

    let state = handle.current_state();
    assert!(state.available);
    assert!(state.last_snapshot.is_some());

    shutdown_within(handle, 5).await;
}

#[tokio::test]
async fn test_shutdown_is_prompt_and_stops_all_fetching() {
    let device = ScriptedDevice::new(&[true]);
    let handle = spawn_poller(Arc::clone(&device) as Arc<dyn DeviceClient>, slow_record());
    let mut rx = handle.subscribe();

    next_state(&mut rx).await;
    let fetches_before = device.fetch_count();

    // The poller is mid-sleep in its 60s interval; shutdown must not wait
    // for the tick
    shutdown_within(handle, 5).await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(device.fetch_count(), fetches_before);
}
