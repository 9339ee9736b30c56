//! Network infrastructure for the agent.
//!
//! # Sub-modules
//!
//! - **`broadcast`** – Owns the UDP socket for one discovery scan: computes
//!   the broadcast address of every usable IPv4 interface, sends the probe
//!   to each, and streams back raw responses until the deadline.
//!
//! - **`discovery`** – Orchestrates broadcast scans into an ordered,
//!   deduplicated candidate list: retry policy, idle-gap cutoff, per-datagram
//!   parsing, and the diminishing-returns early stop.

pub mod broadcast;
pub mod discovery;
