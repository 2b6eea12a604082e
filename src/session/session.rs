//! Per-caller routing session
//!
//! A session belongs to exactly one logical unit of work (a request or a
//! job). It is created at the start of the unit, owned exclusively by it,
//! and cleared at its end; nothing in a session survives across requests.
//!
//! The session records whether the caller has written, and exposes scopes
//! that override the default routing:
//!
//! - `pin_primary` pins every remaining operation in the session to the
//!   primary.
//! - `use_primary` pins operations inside the block to the primary.
//! - `use_replicas_for_read_queries` forces reads inside the block onto
//!   replicas, even after a write or `pin_primary`. Writes and ambiguous
//!   operations are unaffected.
//! - `fallback_to_replicas_for_ambiguous_queries` lets ambiguous operations
//!   use replicas, but only while the session has not written and is not
//!   pinned.

use super::stickiness::StickinessStrategy;
use crate::host::WriteLocation;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Request-scoped routing state. No cross-thread sharing; the owning unit
/// of work is the only mutator.
#[derive(Debug, Clone)]
pub struct Session {
    /// Session identity, for event correlation
    id: Uuid,
    /// Stickiness strategy in effect for this session
    strategy: StickinessStrategy,
    /// Session-wide primary pin (`pin_primary`)
    pinned_to_primary: bool,
    /// Depth of nested `use_primary` blocks
    primary_scope_depth: u32,
    /// Depth of nested `use_replicas_for_read_queries` blocks
    replica_scope_depth: u32,
    /// Depth of nested `fallback_to_replicas_for_ambiguous_queries` blocks
    fallback_scope_depth: u32,
    /// Whether a write has been observed in this session
    performed_write: bool,
    /// Position marker of the most recent write
    last_write_location: Option<WriteLocation>,
    /// Time-based stickiness expiry
    sticky_until: Option<DateTime<Utc>>,
}

impl Session {
    /// Create a session with the given stickiness strategy.
    pub fn new(strategy: StickinessStrategy) -> Self {
        Self {
            id: Uuid::new_v4(),
            strategy,
            pinned_to_primary: false,
            primary_scope_depth: 0,
            replica_scope_depth: 0,
            fallback_scope_depth: 0,
            performed_write: false,
            last_write_location: None,
            sticky_until: None,
        }
    }

    /// Session identity.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Stickiness strategy in effect.
    pub fn strategy(&self) -> StickinessStrategy {
        self.strategy
    }

    /// Pin every remaining operation in this session to the primary.
    pub fn pin_primary(&mut self) {
        self.pinned_to_primary = true;
    }

    /// Run `f` with operations pinned to the primary.
    pub fn use_primary<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.primary_scope_depth += 1;
        let result = f(self);
        self.primary_scope_depth -= 1;
        result
    }

    /// Run `f` with read operations forced onto replicas.
    ///
    /// Overrides `pin_primary`, `use_primary` and write stickiness for
    /// reads inside the block; writes still go to the primary.
    pub fn use_replicas_for_read_queries<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.replica_scope_depth += 1;
        let result = f(self);
        self.replica_scope_depth -= 1;
        result
    }

    /// Run `f` allowing ambiguous operations onto replicas.
    ///
    /// Only effective while the session has not written and is not pinned;
    /// the first write inside the block sends later operations back to the
    /// primary.
    pub fn fallback_to_replicas_for_ambiguous_queries<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        self.fallback_scope_depth += 1;
        let result = f(self);
        self.fallback_scope_depth -= 1;
        result
    }

    /// Record a write and its position marker, making the session sticky.
    pub fn record_write(&mut self, location: WriteLocation) {
        self.record_write_at(location, Utc::now());
    }

    /// Record a write with an explicit clock, for deterministic tests.
    pub fn record_write_at(&mut self, location: WriteLocation, now: DateTime<Utc>) {
        self.performed_write = true;
        self.last_write_location = Some(match self.last_write_location {
            Some(existing) => existing.max(location),
            None => location,
        });

        if let StickinessStrategy::TimeWindow(window) = self.strategy {
            self.sticky_until = Some(now + window);
        }
    }

    /// Whether any write has been observed in this session.
    pub fn performed_write(&self) -> bool {
        self.performed_write
    }

    /// Position marker of the most recent write, if any.
    pub fn last_write_location(&self) -> Option<WriteLocation> {
        self.last_write_location
    }

    /// Whether the session is pinned to the primary session-wide.
    pub fn pinned(&self) -> bool {
        self.pinned_to_primary
    }

    /// Whether a `use_primary` block is active.
    pub fn primary_scope_active(&self) -> bool {
        self.primary_scope_depth > 0
    }

    /// Whether a `use_replicas_for_read_queries` block is active.
    pub fn replica_scope_active(&self) -> bool {
        self.replica_scope_depth > 0
    }

    /// Whether a `fallback_to_replicas_for_ambiguous_queries` block is
    /// active.
    pub fn fallback_scope_active(&self) -> bool {
        self.fallback_scope_depth > 0
    }

    /// Whether write stickiness currently applies.
    ///
    /// Time strategy: true while `now` is inside the window set by the last
    /// write. Position strategy: true whenever a write has occurred; the
    /// balancer then compares replica positions against the write location.
    pub fn sticky(&self) -> bool {
        self.sticky_at(Utc::now())
    }

    /// `sticky` with an explicit clock.
    pub fn sticky_at(&self, now: DateTime<Utc>) -> bool {
        if !self.performed_write {
            return false;
        }
        match self.strategy {
            StickinessStrategy::TimeWindow(_) => {
                self.sticky_until.map(|until| now < until).unwrap_or(false)
            }
            StickinessStrategy::WritePosition => self.last_write_location.is_some(),
        }
    }

    /// Reset all state at unit-of-work completion.
    pub fn clear(&mut self) {
        self.pinned_to_primary = false;
        self.primary_scope_depth = 0;
        self.replica_scope_depth = 0;
        self.fallback_scope_depth = 0;
        self.performed_write = false;
        self.last_write_location = None;
        self.sticky_until = None;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(StickinessStrategy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_session_is_clean() {
        let session = Session::default();
        assert!(!session.performed_write());
        assert!(!session.sticky());
        assert!(!session.pinned());
        assert!(session.last_write_location().is_none());
    }

    #[test]
    fn test_write_makes_session_sticky_within_window() {
        let mut session = Session::new(StickinessStrategy::TimeWindow(Duration::seconds(30)));
        let now = Utc::now();
        session.record_write_at(WriteLocation::new(100), now);

        assert!(session.sticky_at(now));
        assert!(session.sticky_at(now + Duration::seconds(29)));
        assert!(!session.sticky_at(now + Duration::seconds(30)));
    }

    #[test]
    fn test_position_strategy_sticky_until_cleared() {
        let mut session = Session::new(StickinessStrategy::WritePosition);
        let now = Utc::now();
        session.record_write_at(WriteLocation::new(100), now);

        // No time expiry for the position strategy
        assert!(session.sticky_at(now + Duration::hours(1)));

        session.clear();
        assert!(!session.sticky());
    }

    #[test]
    fn test_write_location_is_monotonic() {
        let mut session = Session::default();
        session.record_write(WriteLocation::new(200));
        session.record_write(WriteLocation::new(150));

        // An older marker never regresses the session's high-water mark
        assert_eq!(session.last_write_location(), Some(WriteLocation::new(200)));
    }

    #[test]
    fn test_scopes_nest_and_unwind() {
        let mut session = Session::default();
        assert!(!session.primary_scope_active());

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
    fn test_replica_scope_tracks_depth() {
        let mut session = Session::default();
        session.use_replicas_for_read_queries(|s| {
            assert!(s.replica_scope_active());
        });
        assert!(!session.replica_scope_active());
    }

    #[test]
    fn test_fallback_scope_tracks_depth() {
        let mut session = Session::default();
        session.fallback_to_replicas_for_ambiguous_queries(|s| {
            assert!(s.fallback_scope_active());
        });
        assert!(!session.fallback_scope_active());
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut session = Session::default();
        session.pin_primary();
        session.record_write(WriteLocation::new(10));

        session.clear();
        assert!(!session.pinned());
        assert!(!session.performed_write());
        assert!(!session.sticky());
    }

    #[test]
    fn test_sessions_have_distinct_ids() {
        assert_ne!(Session::default().id(), Session::default().id());
    }
}
