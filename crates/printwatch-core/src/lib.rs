//! # printwatch-core
//!
//! Shared library for PrintWatch containing the printer domain entities,
//! the observation table, and the discovery datagram codec.
//!
//! This crate is used by the agent application and by anything else that
//! needs to reason about printers without talking to one.  It has zero
//! dependencies on OS APIs, HTTP clients, or network sockets.
//!
//! # Architecture overview (for beginners)
//!
//! PrintWatch onboards and monitors LAN-connected 3D printers.  The agent
//! finds printers with a UDP broadcast scan, proves it holds the printer's
//! check code, and then polls the printer's HTTP status endpoint on a fixed
//! interval.  This crate is the shared foundation.  It defines:
//!
//! - **`domain`** – Pure value types with no I/O: the printer identity
//!   (keyed by serial number), the durable onboarded record, the status
//!   snapshot returned by a poll, and the static observation table that
//!   turns a snapshot into displayable readings.
//!
//! - **`protocol`** – The discovery wire format: the probe datagram the
//!   agent broadcasts and the fixed-layout response printers answer with
//!   (name and serial number at known offsets).

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `printwatch_core::PrinterIdentity` instead of the full module path.
pub use domain::identity::{
    PrinterIdentity, PrinterRecord, DEFAULT_POLL_INTERVAL_SECS, MAX_POLL_INTERVAL_SECS,
    MIN_POLL_INTERVAL_SECS,
};
pub use domain::observations::{lookup_observation, ObservationSpec, ObservedValue, OBSERVATIONS};
pub use domain::status::{MachineState, StatusSnapshot, Temperature};
pub use protocol::{
    encode_discovery_response, parse_discovery_response, DiscoveryParseError, DISCOVERY_PORT,
    DISCOVERY_PROBE,
};
