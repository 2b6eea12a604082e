//! Observable routing events
//!
//! Every host state transition and routing fallback is an explicit, typed
//! event. The core never writes to a log sink directly; it emits these
//! events and the embedding process decides where they go.

use std::fmt;

/// Observable events in the balancer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Registry lifecycle
    /// Pool registry built from configuration
    RegistryInit,
    /// Pool registry atomically swapped for a new configuration
    RegistryReload,
    /// Pool registry torn down, health checkers stopped
    RegistryShutdown,

    // Host state transitions
    /// Host passed a probe and is serving reads
    HostOnline,
    /// Host failed a probe, or its lag exceeded thresholds
    HostOffline,
    /// A probe attempt failed (the host may already be offline)
    HostProbeFailed,
    /// Host is reachable but too far behind the primary
    HostLagging,

    // Routing
    /// Read routed to the primary because no healthy replica was available
    PrimaryFallback,
    /// Read served by the primary because the session was sticky or pinned
    StickyRead,
    /// A replica failed mid-read; the read moved to another host
    ReplicaRetry,
    /// Write committed on the primary, session marked sticky
    WriteRecorded,
    /// Write could not reach the primary
    PrimaryUnavailable,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::RegistryInit => "REGISTRY_INIT",
            Event::RegistryReload => "REGISTRY_RELOAD",
            Event::RegistryShutdown => "REGISTRY_SHUTDOWN",
            Event::HostOnline => "HOST_ONLINE",
            Event::HostOffline => "HOST_OFFLINE",
            Event::HostProbeFailed => "HOST_PROBE_FAILED",
            Event::HostLagging => "HOST_LAGGING",
            Event::PrimaryFallback => "PRIMARY_FALLBACK",
            Event::StickyRead => "STICKY_READ",
            Event::ReplicaRetry => "REPLICA_RETRY",
            Event::WriteRecorded => "WRITE_RECORDED",
            Event::PrimaryUnavailable => "PRIMARY_UNAVAILABLE",
        }
    }

    /// Returns true if this event signals degraded service
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            Event::HostOffline
                | Event::HostProbeFailed
                | Event::HostLagging
                | Event::PrimaryFallback
                | Event::ReplicaRetry
                | Event::PrimaryUnavailable
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
