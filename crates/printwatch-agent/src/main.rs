//! PrintWatch agent entry point.
//!
//! Wires the infrastructure services together and runs one of the agent's
//! commands:
//!
//! ```text
//! printwatch-agent discover                    one-shot broadcast scan
//! printwatch-agent add                         interactive onboarding
//! printwatch-agent set-interval <serial> <s>   change a poll interval
//! printwatch-agent [monitor]                   poll every stored printer
//! ```
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ TomlRecordStore::open_default()   -- config + stored records
//!  └─ command dispatch
//!       ├─ discover      DiscoveryEngine over UdpBroadcastTransport
//!       ├─ add           OnboardingFlow driven by stdin prompts
//!       ├─ set-interval  options::update_poll_interval
//!       └─ monitor       spawn_poller per record + log subscriber tasks
//! ```

use std::io::Write as _;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use printwatch_core::{lookup_observation, ObservedValue};

use printwatch_agent::application::onboarding::{
    DiscoveryMode, ManualEntryInput, OnboardingFlow, OnboardingStep,
};
use printwatch_agent::application::options;
use printwatch_agent::application::poller::spawn_poller;
use printwatch_agent::infrastructure::device::{http::HttpDeviceClient, DeviceClient};
use printwatch_agent::infrastructure::network::broadcast::UdpBroadcastTransport;
use printwatch_agent::infrastructure::network::discovery::{
    DiscoveryConfig, DiscoveryEngine, PrinterDiscovery,
};
use printwatch_agent::infrastructure::storage::{RecordStore, TomlRecordStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let store = Arc::new(TomlRecordStore::open_default()?);
    let settings = store.settings();

    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.log_level.clone())),
        )
        .init();

    let discovery: Arc<dyn PrinterDiscovery> = Arc::new(DiscoveryEngine::new(
        UdpBroadcastTransport::new(settings.discovery_port),
    ));
    let device: Arc<dyn DeviceClient> = Arc::new(HttpDeviceClient::new(settings.http_port));

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("discover") => run_discover(discovery.as_ref()).await?,
        Some("add") => run_add(discovery, device, store).await?,
        Some("set-interval") => run_set_interval(store.as_ref(), &args[1..])?,
        Some("monitor") | None => run_monitor(device, store.as_ref()).await?,
        Some(other) => {
            anyhow::bail!("unknown command {other:?}; expected discover, add, set-interval, or monitor")
        }
    }

    Ok(())
}

/// `discover`: one scan, results to stdout.
async fn run_discover(discovery: &dyn PrinterDiscovery) -> anyhow::Result<()> {
    let printers = discovery.discover(&DiscoveryConfig::default()).await?;

    if printers.is_empty() {
        println!("No printers responded to discovery probe.");
    } else {
        println!("Discovered {} printer(s):", printers.len());
        for printer in &printers {
            println!("  {printer}");
        }
    }
    Ok(())
}

/// `add`: interactive onboarding at the terminal.
async fn run_add(
    discovery: Arc<dyn PrinterDiscovery>,
    device: Arc<dyn DeviceClient>,
    store: Arc<TomlRecordStore>,
) -> anyhow::Result<()> {
    let mut flow = OnboardingFlow::new(discovery, device, store, DiscoveryConfig::default());

    loop {
        // Each arm renders the current step, gathers input, and applies it.
        // Err(signal) means "show this step again with a message".
        let result = match flow.step().clone() {
            OnboardingStep::ChooseMode => {
                let answer = prompt("Scan the network for printers? [Y/n] ")?;
                let mode = if answer.eq_ignore_ascii_case("n") {
                    DiscoveryMode::Manual
                } else {
                    DiscoveryMode::Auto
                };
                flow.choose_mode(mode)
            }
            OnboardingStep::Discovering => {
                println!("Scanning...");
                flow.run_discovery().await
            }
            OnboardingStep::SelectingPrinter => {
                println!("Found:");
                for candidate in flow.candidates() {
                    println!("  {candidate}");
                }
                let choice = prompt("Printer to add (name or serial): ")?;
                flow.select_printer(&choice)
            }
            OnboardingStep::EnteringCheckCode => {
                let code = prompt("Check code (from the printer's network screen): ")?;
                flow.submit_check_code(&code).await
            }
            OnboardingStep::ManualEntry => {
                let address = prompt("Printer IP address: ")?.parse()?;
                let serial_number = prompt("Serial number: ")?;
                let check_code = prompt("Check code: ")?;
                flow.submit_manual(ManualEntryInput {
                    address,
                    serial_number,
                    check_code,
                })
                .await
            }
            OnboardingStep::Done { serial_number } => {
                println!("Printer {serial_number} added.");
                return Ok(());
            }
            OnboardingStep::Aborted { reason } => {
                anyhow::bail!("onboarding aborted: {reason:?}");
            }
        };

        if let Err(signal) = result {
            println!("{signal}");
        }
    }
}

/// `set-interval <serial> <seconds>`.
fn run_set_interval(store: &dyn RecordStore, args: &[String]) -> anyhow::Result<()> {
    let (serial, secs) = match args {
        [serial, secs] => (serial, secs.parse::<u64>()?),
        _ => anyhow::bail!("usage: printwatch-agent set-interval <serial> <seconds>"),
    };

    options::update_poll_interval(store, serial, secs)?;
    println!("Poll interval for {serial} set to {secs}s.");
    Ok(())
}

/// `monitor`: poll every stored printer until Ctrl-C.
async fn run_monitor(device: Arc<dyn DeviceClient>, store: &dyn RecordStore) -> anyhow::Result<()> {
    let records = store.all();
    if records.is_empty() {
        warn!("no printers configured; run `printwatch-agent add` first");
        return Ok(());
    }

    let mut handles = Vec::with_capacity(records.len());
    for record in records {
        let serial = record.serial_number.clone();
        let handle = spawn_poller(Arc::clone(&device), record);

        // One logging subscriber per printer.
        let mut rx = handle.subscribe();
        tokio::spawn(async move {
            let mut was_available = false;
            while rx.changed().await.is_ok() {
                let state = rx.borrow_and_update().clone();
                if state.available != was_available {
                    if state.available {
                        info!("{serial} is available");
                    } else {
                        warn!("{serial} became unavailable");
                    }
                    was_available = state.available;
                }
                if let Some(snapshot) = &state.last_snapshot {
                    log_observations(&serial, snapshot);
                }
            }
        });

        handles.push(handle);
    }

    info!("PrintWatch agent ready.  Press Ctrl-C to exit.");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
    }

    info!("shutdown signal received");
    for handle in handles {
        handle.shutdown().await;
    }
    info!("PrintWatch agent stopped");
    Ok(())
}

/// Logs a few headline observations for one snapshot.
fn log_observations(serial: &str, snapshot: &printwatch_core::StatusSnapshot) {
    for key in ["machine_status", "print_progress", "nozzle_temperature"] {
        if let Some(spec) = lookup_observation(key) {
            let unit = spec.unit.unwrap_or("");
            match (spec.read)(snapshot) {
                ObservedValue::Text(v) => info!("{serial} {}: {v}", spec.label),
                ObservedValue::Integer(v) => info!("{serial} {}: {v}{unit}", spec.label),
                ObservedValue::Decimal(v) => info!("{serial} {}: {v}{unit}", spec.label),
            }
        }
    }
}

/// Prints `message` and reads one trimmed line from stdin.
fn prompt(message: &str) -> anyhow::Result<String> {
    print!("{message}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
