//! Routing decisions
//!
//! A decision is an ephemeral value computed per operation: which endpoint
//! serves it, and why. It is never persisted.

use crate::host::HostAddress;

/// The kind of operation being routed.
///
/// Ambiguous operations (raw queries the caller cannot classify) go to the
/// primary unless the session has opted into the replica fallback scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// A query known not to modify data
    Read,
    /// A query that modifies data
    Write,
    /// A query whose effect cannot be classified
    Ambiguous,
}

/// Where an operation was routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    /// The pool's single writable endpoint
    Primary(HostAddress),
    /// A healthy replica
    Replica(HostAddress),
}

impl RouteTarget {
    /// The endpoint address for this target.
    pub fn address(&self) -> &HostAddress {
        match self {
            Self::Primary(addr) => addr,
            Self::Replica(addr) => addr,
        }
    }

    /// Check if this target is the primary.
    pub fn is_primary(&self) -> bool {
        matches!(self, Self::Primary(_))
    }
}

/// Why an operation was routed where it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteReason {
    /// Writes always execute on the primary
    WriteOperation,
    /// Ambiguous operations default to the primary
    AmbiguousOperation,
    /// The session is pinned to the primary session-wide
    SessionPinned,
    /// A `use_primary` block is active
    PrimaryScope,
    /// The session wrote recently and is still sticky
    StickyWrite,
    /// No replica has replayed the session's last write yet
    ReplicaLagging,
    /// No healthy replica was available; fail-open to the primary
    NoHealthyReplica,
    /// A `use_replicas_for_read_queries` block forced a replica
    ReplicaScope,
    /// Normal replica selection
    ReplicaSelected,
}

impl RouteReason {
    /// Reason name for observability.
    pub fn reason_name(&self) -> &'static str {
        match self {
            Self::WriteOperation => "write_operation",
            Self::AmbiguousOperation => "ambiguous_operation",
            Self::SessionPinned => "session_pinned",
            Self::PrimaryScope => "primary_scope",
            Self::StickyWrite => "sticky_write",
            Self::ReplicaLagging => "replica_lagging",
            Self::NoHealthyReplica => "no_healthy_replica",
            Self::ReplicaScope => "replica_scope",
            Self::ReplicaSelected => "replica_selected",
        }
    }
}

/// One routing decision: target plus reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    /// Chosen endpoint
    pub target: RouteTarget,
    /// Why it was chosen
    pub reason: RouteReason,
}

impl RoutingDecision {
    /// Create a decision.
    pub fn new(target: RouteTarget, reason: RouteReason) -> Self {
        Self { target, reason }
    }

    /// Check if the decision routes to the primary.
    pub fn is_primary(&self) -> bool {
        self.target.is_primary()
    }
}
