//! UDP broadcast transport for printer discovery.
//!
//! One scan sends the discovery probe to the broadcast address of every
//! usable IPv4 interface and then streams back whatever answers until the
//! caller-supplied deadline.  Responses arrive unordered; parsing them is
//! the discovery engine's job.
//!
//! # How UDP broadcast discovery works (for beginners)
//!
//! UDP (User Datagram Protocol) is a lightweight, connectionless
//! networking protocol.  It does not guarantee delivery or ordering, which
//! makes it ideal for discovery:
//!
//! 1. The agent computes each interface's *directed broadcast address* by
//!    OR-ing the interface address with the inverted subnet mask (e.g.
//!    `192.168.1.23/24` → `192.168.1.255`).  A datagram sent there reaches
//!    every device on that subnet.
//!
//! 2. Every printer listening on the discovery port receives the probe and
//!    answers with a unicast identity response to the probe's source
//!    address — the ephemeral port this scan's socket is bound to.
//!
//! 3. The agent collects responses until the deadline.  A multi-homed host
//!    probes all of its subnets from the same socket, so replies from any
//!    interface land in the same stream.
//!
//! # Degradation
//!
//! A host with no usable broadcast address (fully offline, loopback only)
//! gets a warning and an empty stream, never an error: discovery must
//! degrade, not crash.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Error type for broadcast transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The scan socket could not be bound.
    #[error("failed to bind discovery socket: {0}")]
    Bind(#[source] std::io::Error),
    /// The socket refused broadcast mode.
    #[error("failed to enable broadcast on discovery socket: {0}")]
    Broadcast(#[source] std::io::Error),
}

/// One raw datagram received during a scan.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub payload: Vec<u8>,
    pub source: SocketAddr,
    pub received_at: Instant,
}

/// The seam between the discovery engine and the actual network.
///
/// The engine only ever consumes the response stream; tests substitute a
/// scripted transport.
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    /// Sends `probe` to every local broadcast address and streams responses
    /// until `timeout` elapses or the receiver is dropped.
    async fn scan(
        &self,
        probe: &[u8],
        timeout: Duration,
    ) -> Result<mpsc::Receiver<RawResponse>, TransportError>;
}

/// Production transport backed by a real UDP socket.
///
/// Each call to [`ProbeTransport::scan`] binds its own ephemeral-port
/// socket, so concurrent onboarding sessions never share one and cannot
/// read each other's responses.
pub struct UdpBroadcastTransport {
    /// Destination port printers listen on.
    port: u16,
}

impl UdpBroadcastTransport {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

#[async_trait]
impl ProbeTransport for UdpBroadcastTransport {
    async fn scan(
        &self,
        probe: &[u8],
        timeout: Duration,
    ) -> Result<mpsc::Receiver<RawResponse>, TransportError> {
        let targets: Vec<SocketAddr> = local_broadcast_addresses()
            .into_iter()
            .map(|ip| SocketAddr::from((ip, self.port)))
            .collect();

        let (tx, rx) = mpsc::channel(64);

        if targets.is_empty() {
            // Offline host.  Degrade to an empty stream; the engine reports
            // "nothing found" rather than a transport failure.
            warn!("no usable broadcast addresses; is the host connected to a network?");
            return Ok(rx);
        }

        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .await
            .map_err(TransportError::Bind)?;
        socket.set_broadcast(true).map_err(TransportError::Broadcast)?;

        debug!(
            "probing {} broadcast address(es) from {:?}",
            targets.len(),
            socket.local_addr().ok()
        );

        let probe = probe.to_vec();
        tokio::spawn(async move {
            run_scan(socket, targets, probe, timeout, tx).await;
        });

        Ok(rx)
    }
}

/// Sends the probe and forwards inbound datagrams until the deadline.
///
/// Dropping the receiver ends the loop on the next datagram, which closes
/// the socket; a cancelled scan leaks nothing.
async fn run_scan(
    socket: UdpSocket,
    targets: Vec<SocketAddr>,
    probe: Vec<u8>,
    timeout: Duration,
    tx: mpsc::Sender<RawResponse>,
) {
    for target in &targets {
        if let Err(e) = socket.send_to(&probe, target).await {
            // One dead interface must not stop the others.
            warn!("failed to send discovery probe to {target}: {e}");
        }
    }

    let deadline = Instant::now() + timeout;
    let mut buf = vec![0u8; 2048];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        let (len, source) = match tokio::time::timeout(remaining, socket.recv_from(&mut buf)).await
        {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => {
                warn!("discovery recv error: {e}");
                continue;
            }
            // Deadline elapsed.
            Err(_) => break,
        };

        let payload = buf[..len].to_vec();
        if payload == probe {
            // Some stacks loop our own broadcast back to us.
            debug!("ignoring probe echo from {source}");
            continue;
        }

        let response = RawResponse {
            payload,
            source,
            received_at: Instant::now(),
        };
        if tx.send(response).await.is_err() {
            // Receiver dropped; the scan was cancelled.
            break;
        }
    }

    debug!("broadcast scan finished");
}

/// Computes the directed broadcast address for one interface, or `None`
/// when the interface cannot carry a broadcast probe.
fn broadcast_address(ip: Ipv4Addr, netmask: Ipv4Addr) -> Option<Ipv4Addr> {
    if ip.is_loopback() || ip.is_unspecified() {
        return None;
    }
    let mask = u32::from(netmask);
    // A /32 (point-to-point) or empty mask has no meaningful subnet to
    // broadcast into.
    if mask == u32::MAX || mask == 0 {
        return None;
    }
    Some(Ipv4Addr::from(u32::from(ip) | !mask))
}

/// Enumerates the broadcast addresses of all usable local IPv4 interfaces.
fn local_broadcast_addresses() -> Vec<Ipv4Addr> {
    let interfaces = match if_addrs::get_if_addrs() {
        Ok(list) => list,
        Err(e) => {
            warn!("failed to enumerate network interfaces: {e}");
            return Vec::new();
        }
    };

    let mut addresses = Vec::new();
    for iface in interfaces {
        if let IpAddr::V4(ip) = iface.ip() {
            let netmask = match iface.addr {
                if_addrs::IfAddr::V4(ref v4) => v4.netmask,
                _ => continue,
            };
            if let Some(bcast) = broadcast_address(ip, netmask) {
                if !addresses.contains(&bcast) {
                    debug!("interface {} ({ip}/{netmask}) → broadcast {bcast}", iface.name);
                    addresses.push(bcast);
                }
            }
        }
    }
    addresses
}

// ── Tests ─────────────────────────────────────────────────────────────────────
