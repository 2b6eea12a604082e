//! Read/write splitting load balancer
//!
//! Routes each operation within one logical pool:
//!
//! - Writes always execute on the primary. A failed write surfaces
//!   `PrimaryUnavailable` and is never retried against a replica.
//! - Reads prefer replicas. A sticky or pinned session reads from the
//!   primary; with no healthy replica, reads fail open to the primary
//!   rather than erroring.
//! - A replica failing mid-read is marked Down and the read moves to the
//!   next healthy replica, then the primary.

use super::decision::{OperationKind, RouteReason, RouteTarget, RoutingDecision};
use super::errors::{BalancerError, BalancerResult};
use crate::host::{HostPool, SelectionStrategy, WriteLocation};
use crate::observability::{Event, EventRecord, EventSink, MetricsRegistry};
use crate::session::{Session, StickinessStrategy};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Caller-supplied cancellation point. The balancer checks it before each
/// host attempt and returns `DeadlineExceeded` promptly once it passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// A deadline this far in the future.
    pub fn within(duration: Duration) -> Self {
        Self {
            at: Instant::now() + duration,
        }
    }

    /// A deadline at an absolute instant.
    pub fn at(at: Instant) -> Self {
        Self { at }
    }

    /// Check whether the deadline has passed.
    pub fn expired(&self) -> bool {
        Instant::now() >= self.at
    }
}

/// Load balancer for one logical pool.
pub struct LoadBalancer {
    pool: Arc<HostPool>,
    strategy: SelectionStrategy,
    sink: Arc<dyn EventSink>,
    metrics: Arc<MetricsRegistry>,
}

impl LoadBalancer {
    /// Create a balancer over a pool.
    pub fn new(
        pool: Arc<HostPool>,
        strategy: SelectionStrategy,
        sink: Arc<dyn EventSink>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            pool,
            strategy,
            sink,
            metrics,
        }
    }

    /// The pool this balancer routes for.
    pub fn pool(&self) -> &Arc<HostPool> {
        &self.pool
    }

    /// The selection strategy in effect.
    pub fn strategy(&self) -> SelectionStrategy {
        self.strategy
    }

    /// Compute the routing decision for one operation. Pure with respect to
    /// the session; pool selection state (the round-robin cursor) advances.
    pub fn route_for(&self, session: &Session, kind: OperationKind) -> RoutingDecision {
        match kind {
            OperationKind::Write => self.primary_decision(RouteReason::WriteOperation),
            OperationKind::Ambiguous => self.route_ambiguous(session),
            OperationKind::Read => self.route_read(session),
        }
    }

    fn route_read(&self, session: &Session) -> RoutingDecision {
        // The replica scope overrides every primary pin, including write
        // stickiness: the caller has asserted staleness is acceptable.
        if session.replica_scope_active() {
            return match self.pool.pick(self.strategy) {
                Ok(host) => {
                    RoutingDecision::new(RouteTarget::Replica(host.address), RouteReason::ReplicaScope)
                }
                Err(_) => self.primary_decision(RouteReason::NoHealthyReplica),
            };
        }

        if session.pinned() {
            return self.primary_decision(RouteReason::SessionPinned);
        }
        if session.primary_scope_active() {
            return self.primary_decision(RouteReason::PrimaryScope);
        }

        if session.sticky() {
            match session.strategy() {
                StickinessStrategy::TimeWindow(_) => {
                    return self.primary_decision(RouteReason::StickyWrite);
                }
                StickinessStrategy::WritePosition => {
                    // A caught-up replica already shows the session's write
                    let location = session.last_write_location().unwrap_or_default();
                    return match self.pool.pick_caught_up(self.strategy, location) {
                        Ok(host) => RoutingDecision::new(
                            RouteTarget::Replica(host.address),
                            RouteReason::ReplicaSelected,
                        ),
                        Err(_) => self.primary_decision(RouteReason::ReplicaLagging),
                    };
                }
            }
        }

        match self.pool.pick(self.strategy) {
            Ok(host) => RoutingDecision::new(
                RouteTarget::Replica(host.address),
                RouteReason::ReplicaSelected,
            ),
            Err(_) => self.primary_decision(RouteReason::NoHealthyReplica),
        }
    }

    fn route_ambiguous(&self, session: &Session) -> RoutingDecision {
        let fallback_allowed = session.fallback_scope_active()
            && !session.performed_write()
            && !session.pinned()
            && !session.primary_scope_active();

        if !fallback_allowed {
            return self.primary_decision(RouteReason::AmbiguousOperation);
        }

        match self.pool.pick(self.strategy) {
            Ok(host) => RoutingDecision::new(
                RouteTarget::Replica(host.address),
                RouteReason::ReplicaSelected,
            ),
            Err(_) => self.primary_decision(RouteReason::NoHealthyReplica),
        }
    }

    fn primary_decision(&self, reason: RouteReason) -> RoutingDecision {
        RoutingDecision::new(RouteTarget::Primary(self.pool.primary().clone()), reason)
    }

    /// Execute a read.
    ///
    /// The closure receives the routing decision and performs the actual
    /// query. A failure on a replica marks that host Down and retries the
    /// remaining healthy replicas, then the primary. A failure on the
    /// primary propagates.
    pub fn read<T>(
        &self,
        session: &mut Session,
        deadline: Option<Deadline>,
        mut op: impl FnMut(&RoutingDecision) -> BalancerResult<T>,
    ) -> BalancerResult<T> {
        // One attempt per configured replica, then the primary
        let max_attempts = self.pool.replica_addresses().len() + 1;

        let mut decision = self.route_for(session, OperationKind::Read);
        for _ in 0..max_attempts {
            if deadline.map(|d| d.expired()).unwrap_or(false) {
                return Err(BalancerError::deadline_exceeded("read"));
            }

            match &decision.target {
                RouteTarget::Primary(_) => return self.read_from_primary(&decision, &mut op),
                RouteTarget::Replica(address) => match op(&decision) {
                    Ok(value) => {
                        self.metrics.increment_replica_reads();
                        return Ok(value);
                    }
                    Err(error) => {
                        // Connection-level failure; take the host out and
                        // move on
                        self.pool.mark_down(address);
                        self.metrics.increment_hosts_marked_down();
                        self.emit(
                            Event::ReplicaRetry,
                            vec![
                                ("host".to_string(), address.to_string()),
                                ("reason".to_string(), error.to_string()),
                            ],
                        );
                        decision = self.route_for(session, OperationKind::Read);
                    }
                },
            }
        }

        let decision = self.primary_decision(RouteReason::NoHealthyReplica);
        self.read_from_primary(&decision, &mut op)
    }

    fn read_from_primary<T>(
        &self,
        decision: &RoutingDecision,
        op: &mut impl FnMut(&RoutingDecision) -> BalancerResult<T>,
    ) -> BalancerResult<T> {
        match decision.reason {
            RouteReason::NoHealthyReplica => {
                self.metrics.increment_primary_fallbacks();
                self.emit(
                    Event::PrimaryFallback,
                    vec![("pool".to_string(), self.pool.name().to_string())],
                );
            }
            RouteReason::StickyWrite => {
                self.emit(
                    Event::StickyRead,
                    vec![("pool".to_string(), self.pool.name().to_string())],
                );
            }
            _ => {}
        }

        let value = op(decision)?;
        self.metrics.increment_primary_reads();
        Ok(value)
    }

    /// Execute a write on the primary.
    ///
    /// On success the returned write location is recorded into the session,
    /// making it sticky. On failure the error surfaces as
    /// `PrimaryUnavailable`; no replica is ever attempted.
    pub fn write<T>(
        &self,
        session: &mut Session,
        deadline: Option<Deadline>,
        op: impl FnOnce(&RoutingDecision) -> BalancerResult<(T, WriteLocation)>,
    ) -> BalancerResult<T> {
        if deadline.map(|d| d.expired()).unwrap_or(false) {
            return Err(BalancerError::deadline_exceeded("write"));
        }

        let decision = self.primary_decision(RouteReason::WriteOperation);
        match op(&decision) {
            Ok((value, location)) => {
                session.record_write(location);
                self.metrics.increment_writes();
                self.emit(
                    Event::WriteRecorded,
                    vec![
                        ("pool".to_string(), self.pool.name().to_string()),
                        ("location".to_string(), location.to_string()),
                    ],
                );
                Ok(value)
            }
            Err(BalancerError::DeadlineExceeded { operation }) => {
                Err(BalancerError::DeadlineExceeded { operation })
            }
            Err(error) => {
                self.metrics.increment_write_failures();
                self.emit(
                    Event::PrimaryUnavailable,
                    vec![
                        ("pool".to_string(), self.pool.name().to_string()),
                        ("reason".to_string(), error.to_string()),
                    ],
                );
                Err(BalancerError::primary_unavailable(
                    self.pool.name(),
                    error.to_string(),
                ))
            }
        }
    }

    /// Record a write observed outside `write`, e.g. by a caller that
    /// manages its own connections.
    pub fn mark_write(&self, session: &mut Session, location: WriteLocation) {
        session.record_write(location);
    }

    fn emit(&self, event: Event, fields: Vec<(String, String)>) {
        self.sink.emit(EventRecord::new(event, fields));
    }
}
