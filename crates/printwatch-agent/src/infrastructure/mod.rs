//! Infrastructure layer for the agent.
//!
//! Contains the network- and OS-facing adapters: the UDP broadcast
//! transport and discovery engine, the printer HTTP client, and the TOML
//! record store.
//!
//! **Dependency rule**: this layer depends only on `printwatch_core`;
//! the application layer reaches it through the trait seams
//! ([`network::broadcast::ProbeTransport`], [`network::discovery::PrinterDiscovery`],
//! [`device::DeviceClient`], [`storage::RecordStore`]), never the other
//! way around.

pub mod device;
pub mod network;
pub mod storage;
