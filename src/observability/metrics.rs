//! Routing metrics
//!
//! Counters only, monotonic, reset on process start. Relaxed atomics;
//! metrics tolerate eventual consistency.

use std::sync::atomic::{AtomicU64, Ordering};

/// Registry of routing counters
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Reads served by a replica
    replica_reads: AtomicU64,
    /// Reads served by the primary (sticky, pinned, or fallback)
    primary_reads: AtomicU64,
    /// Reads that fell back to the primary with no healthy replica
    primary_fallbacks: AtomicU64,
    /// Writes committed on the primary
    writes: AtomicU64,
    /// Writes that failed because the primary was unreachable
    write_failures: AtomicU64,
    /// Successful health probes
    probes_succeeded: AtomicU64,
    /// Failed or timed-out health probes
    probes_failed: AtomicU64,
    /// Up transitions
    hosts_marked_up: AtomicU64,
    /// Down transitions
    hosts_marked_down: AtomicU64,
}

impl MetricsRegistry {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment replica reads
    pub fn increment_replica_reads(&self) {
        self.replica_reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment primary reads
    pub fn increment_primary_reads(&self) {
        self.primary_reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment primary fallbacks
    pub fn increment_primary_fallbacks(&self) {
        self.primary_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment writes
    pub fn increment_writes(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment write failures
    pub fn increment_write_failures(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment successful probes
    pub fn increment_probes_succeeded(&self) {
        self.probes_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment failed probes
    pub fn increment_probes_failed(&self) {
        self.probes_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment Up transitions
    pub fn increment_hosts_marked_up(&self) {
        self.hosts_marked_up.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment Down transitions
    pub fn increment_hosts_marked_down(&self) {
        self.hosts_marked_down.fetch_add(1, Ordering::Relaxed);
    }

    /// Get replica reads
    pub fn replica_reads(&self) -> u64 {
        self.replica_reads.load(Ordering::Relaxed)
    }

    /// Get primary reads
    pub fn primary_reads(&self) -> u64 {
        self.primary_reads.load(Ordering::Relaxed)
    }

    /// Get primary fallbacks
    pub fn primary_fallbacks(&self) -> u64 {
        self.primary_fallbacks.load(Ordering::Relaxed)
    }

    /// Get writes
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Get write failures
    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }

    /// Get successful probes
    pub fn probes_succeeded(&self) -> u64 {
        self.probes_succeeded.load(Ordering::Relaxed)
    }

    /// Get failed probes
    pub fn probes_failed(&self) -> u64 {
        self.probes_failed.load(Ordering::Relaxed)
    }

    /// Get Up transitions
    pub fn hosts_marked_up(&self) -> u64 {
        self.hosts_marked_up.load(Ordering::Relaxed)
    }

    /// Get Down transitions
    pub fn hosts_marked_down(&self) -> u64 {
        self.hosts_marked_down.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let metrics = MetricsRegistry::new();
        assert_eq!(metrics.replica_reads(), 0);
        assert_eq!(metrics.primary_fallbacks(), 0);
        assert_eq!(metrics.writes(), 0);
    }

    #[test]
    fn test_counters_increment() {
        let metrics = MetricsRegistry::new();
        metrics.increment_replica_reads();
        metrics.increment_replica_reads();
        metrics.increment_primary_fallbacks();
        metrics.increment_write_failures();

        assert_eq!(metrics.replica_reads(), 2);
        assert_eq!(metrics.primary_fallbacks(), 1);
        assert_eq!(metrics.write_failures(), 1);
    }
}
