//! Pure domain types shared across the workspace.
//!
//! Nothing in this module performs I/O.  The types here are constructed by
//! the agent's infrastructure layer (discovery, HTTP client, config store)
//! and consumed by the application layer (onboarding flow, poller).

pub mod identity;
pub mod observations;
pub mod status;
