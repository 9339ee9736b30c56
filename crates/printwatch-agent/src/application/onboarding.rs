//! Onboarding flow: a step-driven state machine that ends with a committed
//! printer record.
//!
//! The flow is driven from the outside (CLI prompt, web form, whatever):
//! the caller inspects [`OnboardingFlow::step`], collects the input that
//! step asks for, and calls the matching method.  Methods return
//! `Err(StepSignal)` when the current step must be shown again with a
//! message; terminal outcomes ([`OnboardingStep::Done`] and
//! [`OnboardingStep::Aborted`]) are steps, not errors.
//!
//! ```text
//! ChooseMode ──auto──▶ Discovering ──▶ SelectingPrinter ──▶ EnteringCheckCode ──▶ Done
//!      │                    │ (1 candidate skips selection) ─────▲                  │
//!      └──manual──▶ ManualEntry ──────────────────────────────────────────────▶ Done
//! ```

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use printwatch_core::{PrinterIdentity, PrinterRecord};

use crate::infrastructure::device::{DeviceClient, DeviceTarget};
use crate::infrastructure::network::discovery::{DiscoveryConfig, PrinterDiscovery};
use crate::infrastructure::storage::RecordStore;

use super::validate::{validate_credentials, ValidationOutcome};

/// How the operator wants to locate the printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryMode {
    /// Broadcast-scan the LAN and pick from the answers.
    Auto,
    /// Type the address and serial by hand.
    Manual,
}

/// Why a flow ended without a committed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// A record with this serial number already exists; it was not touched.
    AlreadyConfigured,
    /// An internal failure (discovery transport, storage) ended the flow.
    Unknown,
}

/// Where the flow currently stands and what input it needs next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OnboardingStep {
    /// Waiting for [`OnboardingFlow::choose_mode`].
    ChooseMode,
    /// Waiting for [`OnboardingFlow::run_discovery`].
    Discovering,
    /// Waiting for [`OnboardingFlow::select_printer`].
    SelectingPrinter,
    /// Waiting for [`OnboardingFlow::submit_check_code`].
    EnteringCheckCode,
    /// Waiting for [`OnboardingFlow::submit_manual`].
    ManualEntry,
    /// Terminal: the record was validated and stored.
    Done { serial_number: String },
    /// Terminal: the flow ended without storing anything.
    Aborted { reason: AbortReason },
}

/// Recoverable outcome of one step: show the current step again with this
/// message.  The flow's step does not change when one of these is returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StepSignal {
    #[error("no printers responded to discovery")]
    NoPrintersFound,

    #[error("no discovered printer matches {0:?}")]
    SelectionNotFound(String),

    #[error("cannot connect to the printer")]
    CannotConnect,

    #[error("the printer rejected the check code")]
    InvalidCheckCode,

    #[error("that action is not valid at the current step")]
    InvalidTransition,
}

/// Everything manual entry asks for in one screen.
#[derive(Debug, Clone)]
pub struct ManualEntryInput {
    pub address: std::net::IpAddr,
    pub serial_number: String,
    pub check_code: String,
}

/// The onboarding state machine.
///
/// One instance per flow; not shared across tasks.  All remote work
/// happens inside `run_discovery`, `submit_check_code`, and
/// `submit_manual`, so an abandoned flow holds no sockets.
pub struct OnboardingFlow {
    discovery: Arc<dyn PrinterDiscovery>,
    device: Arc<dyn DeviceClient>,
    store: Arc<dyn RecordStore>,
    discovery_config: DiscoveryConfig,
    step: OnboardingStep,
    candidates: Vec<PrinterIdentity>,
    selected: Option<PrinterIdentity>,
}

impl OnboardingFlow {
    pub fn new(
        discovery: Arc<dyn PrinterDiscovery>,
        device: Arc<dyn DeviceClient>,
        store: Arc<dyn RecordStore>,
        discovery_config: DiscoveryConfig,
    ) -> Self {
        Self {
            discovery,
            device,
            store,
            discovery_config,
            step: OnboardingStep::ChooseMode,
            candidates: Vec::new(),
            selected: None,
        }
    }

    /// The step the caller must render next.
    pub fn step(&self) -> &OnboardingStep {
        &self.step
    }

    /// Candidates found by the last discovery run, in first-seen order.
    pub fn candidates(&self) -> &[PrinterIdentity] {
        &self.candidates
    }

    /// Answers [`OnboardingStep::ChooseMode`].
    pub fn choose_mode(&mut self, mode: DiscoveryMode) -> Result<(), StepSignal> {
        if self.step != OnboardingStep::ChooseMode {
            return Err(StepSignal::InvalidTransition);
        }
        self.step = match mode {
            DiscoveryMode::Auto => OnboardingStep::Discovering,
            DiscoveryMode::Manual => OnboardingStep::ManualEntry,
        };
        Ok(())
    }

    /// Answers [`OnboardingStep::Discovering`]: runs the scan and advances
    /// to selection, or straight to the check-code step when exactly one
    /// printer answered.
    ///
    /// An empty scan keeps the flow on `Discovering` so the operator can
    /// retry; a failing transport aborts the flow.
    pub async fn run_discovery(&mut self) -> Result<(), StepSignal> {
        if self.step != OnboardingStep::Discovering {
            return Err(StepSignal::InvalidTransition);
        }

        let found = match self.discovery.discover(&self.discovery_config).await {
            Ok(found) => found,
            Err(e) => {
                error!("discovery failed, aborting onboarding: {e}");
                self.step = OnboardingStep::Aborted {
                    reason: AbortReason::Unknown,
                };
                return Ok(());
            }
        };

        if found.is_empty() {
            return Err(StepSignal::NoPrintersFound);
        }

        self.candidates = found;
        if self.candidates.len() == 1 {
            // Nothing to choose from; go straight to the check code.
            self.selected = Some(self.candidates[0].clone());
            self.step = OnboardingStep::EnteringCheckCode;
        } else {
            self.step = OnboardingStep::SelectingPrinter;
        }
        Ok(())
    }

    /// Answers [`OnboardingStep::SelectingPrinter`].
    ///
    /// Candidates are presented by display name, so `choice` matches on
    /// the name; a serial number is accepted too, which disambiguates
    /// two printers sharing one name.
    pub fn select_printer(&mut self, choice: &str) -> Result<(), StepSignal> {
        if self.step != OnboardingStep::SelectingPrinter {
            return Err(StepSignal::InvalidTransition);
        }
        let identity = self
            .candidates
            .iter()
            .find(|c| c.serial_number == choice || c.name == choice)
            .cloned()
            .ok_or_else(|| StepSignal::SelectionNotFound(choice.to_string()))?;

        self.selected = Some(identity);
        self.step = OnboardingStep::EnteringCheckCode;
        Ok(())
    }

    /// Answers [`OnboardingStep::EnteringCheckCode`] for a discovered
    /// printer.  On acceptance the record is committed under the name the
    /// printer announced during discovery.
    pub async fn submit_check_code(&mut self, check_code: &str) -> Result<(), StepSignal> {
        if self.step != OnboardingStep::EnteringCheckCode {
            return Err(StepSignal::InvalidTransition);
        }
        // A selected identity is an invariant of reaching this step.
        let identity = self.selected.clone().ok_or(StepSignal::InvalidTransition)?;

        let target = DeviceTarget::from_identity(&identity, check_code);
        self.validate_and_commit(target, identity.name.clone()).await
    }

    /// Answers [`OnboardingStep::ManualEntry`].  The record takes the name
    /// the printer reports about itself, since nothing was discovered.
    pub async fn submit_manual(&mut self, input: ManualEntryInput) -> Result<(), StepSignal> {
        if self.step != OnboardingStep::ManualEntry {
            return Err(StepSignal::InvalidTransition);
        }

        let target = DeviceTarget {
            address: input.address,
            serial_number: input.serial_number,
            check_code: input.check_code,
        };
        // Empty name: validate_and_commit substitutes the machine name.
        self.validate_and_commit(target, String::new()).await
    }

    /// Shared tail of both entry paths: validate, enforce serial
    /// uniqueness, commit.
    async fn validate_and_commit(
        &mut self,
        target: DeviceTarget,
        name: String,
    ) -> Result<(), StepSignal> {
        let machine_name = match validate_credentials(self.device.as_ref(), &target).await {
            ValidationOutcome::Accepted { machine_name } => machine_name,
            ValidationOutcome::Rejected => return Err(StepSignal::InvalidCheckCode),
            ValidationOutcome::Unreachable { cause } => {
                warn!("validation could not reach {}: {cause}", target.address);
                return Err(StepSignal::CannotConnect);
            }
        };

        if self.store.exists(&target.serial_number) {
            info!(
                "serial {} is already configured; leaving the existing record alone",
                target.serial_number
            );
            self.step = OnboardingStep::Aborted {
                reason: AbortReason::AlreadyConfigured,
            };
            return Ok(());
        }

        let record = PrinterRecord {
            name: if name.is_empty() { machine_name } else { name },
            address: target.address,
            serial_number: target.serial_number.clone(),
            check_code: target.check_code,
            poll_interval_secs: printwatch_core::DEFAULT_POLL_INTERVAL_SECS,
        };

        if let Err(e) = self.store.put(record) {
            error!("failed to store record for {}: {e}", target.serial_number);
            self.step = OnboardingStep::Aborted {
                reason: AbortReason::Unknown,
            };
            return Ok(());
        }

        info!("onboarded printer {}", target.serial_number);
        self.step = OnboardingStep::Done {
            serial_number: target.serial_number,
        };
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
//
// The step-by-step scenarios (happy paths, retries, duplicate abort) live in
// tests/onboarding_integration.rs; these cover only the transition guards.
