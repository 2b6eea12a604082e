//! Host identity and health state
//!
//! A host is a single database endpoint inside a logical pool. Its identity
//! (`address:port`, weight) is fixed at configuration load; only its health
//! record changes at runtime, and only the health checker mutates it.
//!
//! State machine per host: `Unknown -> {Up, Down}`, then `Up <-> Down` on
//! each probe result. A configured host is never deleted, only marked Down.

use chrono::{DateTime, Utc};
use std::fmt;

/// Unique endpoint identity within a pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostAddress {
    /// Hostname or IP address
    pub address: String,
    /// TCP port
    pub port: u16,
}

impl HostAddress {
    /// Create a new host address.
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }
}

impl fmt::Display for HostAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// Liveness state of a host.
///
/// Hosts start Unknown and are moved to Up or Down by the health checker.
/// A lagging-but-reachable replica is marked Down: from the router's point
/// of view it must not serve reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    /// Never probed since configuration load
    Unknown,
    /// Last probe succeeded within thresholds
    Up,
    /// Last probe failed, or replication lag exceeded thresholds
    Down,
}

impl HostState {
    /// Get state name for observability.
    pub fn state_name(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Up => "up",
            Self::Down => "down",
        }
    }

    /// Check if the host may serve reads.
    pub fn is_up(&self) -> bool {
        matches!(self, Self::Up)
    }
}

/// Replication position marker.
///
/// Monotonic byte offset into the primary's write stream (LSN-like). A
/// replica whose replayed location is at or past a session's last write
/// location has caught up with that write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct WriteLocation(pub u64);

impl WriteLocation {
    /// Create a new write location.
    pub fn new(offset: u64) -> Self {
        Self(offset)
    }

    /// Raw byte offset.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Check whether a replica at `replayed` has caught up with this write.
    pub fn caught_up_by(&self, replayed: WriteLocation) -> bool {
        replayed >= *self
    }
}

impl fmt::Display for WriteLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0/{:X}", self.0)
    }
}

/// Immutable host identity plus its mutable health record.
#[derive(Debug, Clone)]
pub struct Host {
    /// Endpoint identity
    pub address: HostAddress,
    /// Selection weight (weighted-random strategy); default 1
    pub weight: u32,
    /// Current liveness state
    pub state: HostState,
    /// When the health checker last probed this host
    pub last_checked_at: Option<DateTime<Utc>>,
    /// Reported replication lag in bytes behind the primary
    pub replication_lag_bytes: u64,
    /// Last replayed replication position reported by the host
    pub replayed_location: WriteLocation,
    /// Consecutive probe failures, drives probe backoff
    pub consecutive_failures: u32,
}

impl Host {
    /// Create a new host in Unknown state.
    pub fn new(address: HostAddress, weight: u32) -> Self {
        Self {
            address,
            weight,
            state: HostState::Unknown,
            last_checked_at: None,
            replication_lag_bytes: 0,
            replayed_location: WriteLocation::default(),
            consecutive_failures: 0,
        }
    }

    /// Mark the host as Up. Idempotent; resets the failure counter.
    pub fn mark_up(&mut self, now: DateTime<Utc>) {
        self.state = HostState::Up;
        self.last_checked_at = Some(now);
        self.consecutive_failures = 0;
    }

    /// Mark the host as Down. Idempotent on state; each call still counts
    /// one probe failure for the backoff schedule.
    pub fn mark_down(&mut self, now: DateTime<Utc>) {
        self.state = HostState::Down;
        self.last_checked_at = Some(now);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    /// Record replication progress reported by a successful probe.
    pub fn record_replication(&mut self, replayed: WriteLocation, lag_bytes: u64) {
        self.replayed_location = replayed;
        self.replication_lag_bytes = lag_bytes;
    }

    /// Check whether this host has replayed at least `location`.
    pub fn caught_up(&self, location: WriteLocation) -> bool {
        location.caught_up_by(self.replayed_location)
    }
}
