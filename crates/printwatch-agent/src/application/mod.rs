//! Application layer use cases for the agent.
//!
//! Use cases orchestrate the domain types through the trait seams exposed
//! by the infrastructure layer; they contain no sockets, no HTTP, and no
//! file system access of their own.
//!
//! # Sub-modules
//!
//! - **`onboarding`** – The multi-step flow that takes an operator from
//!   "I have a printer somewhere on this network" to a committed
//!   [`printwatch_core::PrinterRecord`]: mode choice, discovery, candidate
//!   selection, check-code entry, validation, uniqueness check, commit.
//!
//! - **`validate`** – The credential handshake against one printer:
//!   reachability first, then the check-code verdict.
//!
//! - **`options`** – Post-onboarding edits to a record's poll interval,
//!   with range validation.
//!
//! - **`poller`** – The per-printer polling coordinator: an indefinite
//!   fetch loop that publishes the latest good snapshot plus an
//!   availability flag to any number of subscribers.

pub mod onboarding;
pub mod options;
pub mod poller;
pub mod validate;
