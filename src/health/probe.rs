//! Health probes
//!
//! A probe answers one question about one host: is it reachable, and how
//! far behind the primary is it? Any connection-pool implementation can be
//! wired in by implementing `Probe`; the checker owns scheduling, timeout
//! enforcement, and state transitions.

use crate::host::{HostAddress, WriteLocation};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use thiserror::Error;

/// Probe failures. Contained inside the health checker, never surfaced to
/// routing callers.
#[derive(Debug, Clone, Error)]
pub enum ProbeError {
    /// The probe did not complete within its bounded timeout
    #[error("Probe timed out after {0} ms")]
    Timeout(u64),

    /// The host actively refused the connection
    #[error("Connection refused")]
    ConnectionRefused,

    /// Any other connectivity failure (resolution, route, auth)
    #[error("Host unreachable: {0}")]
    Unreachable(String),
}

/// Successful probe result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplicaStatus {
    /// Last replication position the host has replayed
    pub replayed_location: WriteLocation,
    /// Bytes behind the primary's write stream
    pub lag_bytes: u64,
    /// Seconds since the host last replayed anything
    pub lag_seconds: u64,
}

/// Lightweight connectivity and lag check against a single host.
pub trait Probe: Send + Sync {
    /// Probe one host. Must complete promptly; the checker additionally
    /// bounds the call with a timeout and aborts hung probes.
    fn check(&self, host: &HostAddress) -> Result<ReplicaStatus, ProbeError>;
}

/// TCP connect probe.
///
/// Reports connectivity only; replication positions stay at zero. Pools
/// using position-based stickiness need a driver-backed probe instead.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    timeout: Duration,
}

impl TcpProbe {
    /// Create a TCP probe with the given connect timeout.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Probe for TcpProbe {
    fn check(&self, host: &HostAddress) -> Result<ReplicaStatus, ProbeError> {
        let mut addrs = (host.address.as_str(), host.port)
            .to_socket_addrs()
            .map_err(|e| ProbeError::Unreachable(format!("resolution failed: {}", e)))?;

        let addr = addrs
            .next()
            .ok_or_else(|| ProbeError::Unreachable("no address resolved".to_string()))?;

        match TcpStream::connect_timeout(&addr, self.timeout) {
            Ok(_) => Ok(ReplicaStatus::default()),
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
                Err(ProbeError::ConnectionRefused)
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                Err(ProbeError::Timeout(self.timeout.as_millis() as u64))
            }
            Err(e) => Err(ProbeError::Unreachable(e.to_string())),
        }
    }
}
