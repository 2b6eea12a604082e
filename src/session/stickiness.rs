//! Stickiness strategies
//!
//! After a write, a session is pinned to the primary so it never reads data
//! older than its own write. Two strategies implement that pin:
//!
//! - `TimeWindow`: the session is sticky for a fixed duration after the
//!   last write. Cheap, no replication feedback required.
//! - `WritePosition`: the session records the write's replication position;
//!   a replica may serve its reads only once it has replayed past that
//!   position. Requires probes that report replayed locations.

use chrono::Duration;

/// Default stickiness window for the time-based strategy.
pub const DEFAULT_STICKY_WINDOW_SECS: i64 = 30;

/// How a session stays pinned to the primary after a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StickinessStrategy {
    /// Pin to primary for a fixed window after the last write
    TimeWindow(Duration),
    /// Pin to primary until a replica has replayed the last write
    WritePosition,
}

impl StickinessStrategy {
    /// The default time window strategy.
    pub fn default_time_window() -> Self {
        Self::TimeWindow(Duration::seconds(DEFAULT_STICKY_WINDOW_SECS))
    }

    /// Check if this strategy compares replication positions.
    pub fn is_position_based(&self) -> bool {
        matches!(self, Self::WritePosition)
    }
}

impl Default for StickinessStrategy {
    fn default() -> Self {
        Self::default_time_window()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_time_window() {
        let strategy = StickinessStrategy::default();
        assert_eq!(
            strategy,
            StickinessStrategy::TimeWindow(Duration::seconds(30))
        );
        assert!(!strategy.is_position_based());
    }

    #[test]
    fn test_write_position_is_position_based() {
        assert!(StickinessStrategy::WritePosition.is_position_based());
    }
}
