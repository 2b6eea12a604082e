//! Session scope and stickiness semantics.

use aerobalance::balancer::{LoadBalancer, OperationKind, RouteReason};
use aerobalance::host::{HostAddress, HostPool, SelectionStrategy, WriteLocation};
use aerobalance::observability::{EventSink, MemorySink, MetricsRegistry};
use aerobalance::session::{Session, StickinessStrategy, DEFAULT_STICKY_WINDOW_SECS};
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;

fn addr(name: &str) -> HostAddress {
    HostAddress::new(name, 5432)
}

fn balancer() -> LoadBalancer {
    let pool = Arc::new(HostPool::new("main", addr("primary")));
    pool.add_replica(addr("replica-1"), 1).unwrap();
    pool.mark_up(&addr("replica-1"));
    LoadBalancer::new(
        pool,
        SelectionStrategy::RoundRobin,
        Arc::new(MemorySink::new()) as Arc<dyn EventSink>,
        Arc::new(MetricsRegistry::new()),
    )
}

#[test]
fn test_fresh_session_is_not_sticky() {
    let session = Session::default();
    assert!(!session.sticky());
    assert!(!session.pinned());
    assert!(!session.performed_write());
}

#[test]
fn test_time_window_stickiness_expires() {
    let mut session = Session::default();
    let wrote_at = Utc::now();
    session.record_write_at(WriteLocation::new(10), wrote_at);

    assert!(session.sticky_at(wrote_at));
    assert!(session.sticky_at(
        wrote_at + ChronoDuration::seconds(DEFAULT_STICKY_WINDOW_SECS - 1)
    ));
    assert!(!session.sticky_at(
        wrote_at + ChronoDuration::seconds(DEFAULT_STICKY_WINDOW_SECS + 1)
    ));
}

#[test]
fn test_second_write_extends_the_window() {
    let mut session = Session::default();
    let first = Utc::now();
    session.record_write_at(WriteLocation::new(10), first);

    let second = first + ChronoDuration::seconds(20);
    session.record_write_at(WriteLocation::new(20), second);

    assert!(session.sticky_at(first + ChronoDuration::seconds(40)));
    assert!(!session.sticky_at(second + ChronoDuration::seconds(DEFAULT_STICKY_WINDOW_SECS + 1)));
}

#[test]
fn test_write_location_is_monotonic() {
    let mut session = Session::new(StickinessStrategy::WritePosition);
    session.record_write(WriteLocation::new(100));
    session.record_write(WriteLocation::new(50));

    assert_eq!(session.last_write_location(), Some(WriteLocation::new(100)));
}

#[test]
fn test_position_stickiness_clears_on_catch_up() {
    let balancer = balancer();
    let pool = balancer.pool();
    let mut session = Session::new(StickinessStrategy::WritePosition);
    session.record_write(WriteLocation::new(100));

    // Replica behind the write: reads stay on the primary
    pool.record_replication(&addr("replica-1"), WriteLocation::new(50), 50);
    let decision = balancer.route_for(&session, OperationKind::Read);
    assert!(decision.is_primary());
    assert_eq!(decision.reason, RouteReason::ReplicaLagging);

    // Replica replays past the write: reads move back
    pool.record_replication(&addr("replica-1"), WriteLocation::new(100), 0);
    let decision = balancer.route_for(&session, OperationKind::Read);
    assert!(!decision.is_primary());
}

#[test]
fn test_pin_outlasts_the_sticky_window() {
    let mut session = Session::new(StickinessStrategy::TimeWindow(ChronoDuration::zero()));
    session.pin_primary();
    session.record_write(WriteLocation::new(10));

    assert!(!session.sticky());
    assert!(session.pinned());

    let balancer = balancer();
    let decision = balancer.route_for(&session, OperationKind::Read);
    assert!(decision.is_primary());
    assert_eq!(decision.reason, RouteReason::SessionPinned);
}

#[test]
fn test_primary_scope_nests() {
    let mut session = Session::default();

    session.use_primary(|s| {
        assert!(s.primary_scope_active());
        s.use_primary(|inner| {
            assert!(inner.primary_scope_active());
        });
        assert!(s.primary_scope_active());
    });
    assert!(!session.primary_scope_active());
}

#[test]
fn test_replica_scope_wins_over_primary_scope() {
    let balancer = balancer();
    let mut session = Session::default();

    session.use_primary(|s| {
        s.use_replicas_for_read_queries(|inner| {
            let decision = balancer.route_for(inner, OperationKind::Read);
            assert!(!decision.is_primary());
            assert_eq!(decision.reason, RouteReason::ReplicaScope);
        });

        let decision = balancer.route_for(s, OperationKind::Read);
        assert!(decision.is_primary());
        assert_eq!(decision.reason, RouteReason::PrimaryScope);
    });
}

#[test]
fn test_fallback_scope_only_covers_ambiguous_operations() {
    let balancer = balancer();
    let mut session = Session::default();

    session.fallback_to_replicas_for_ambiguous_queries(|s| {
        assert!(!balancer.route_for(s, OperationKind::Ambiguous).is_primary());
        assert!(balancer.route_for(s, OperationKind::Write).is_primary());
    });

    // Outside the scope ambiguous operations go back to the primary
    let decision = balancer.route_for(&session, OperationKind::Ambiguous);
    assert!(decision.is_primary());
    assert_eq!(decision.reason, RouteReason::AmbiguousOperation);
}

#[test]
fn test_clear_resets_everything_but_identity() {
    let mut session = Session::default();
    let id = session.id();

    session.pin_primary();
    session.record_write(WriteLocation::new(10));
    session.clear();

    assert!(!session.pinned());
    assert!(!session.sticky());
    assert!(!session.performed_write());
    assert_eq!(session.last_write_location(), None);
    assert_eq!(session.id(), id);
}
