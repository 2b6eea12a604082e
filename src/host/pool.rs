//! Host pool for a logical database
//!
//! One primary endpoint plus an ordered set of replicas, unique by
//! address:port. The pool owns the only cross-thread mutable state in the
//! router: replica health records (behind an RwLock, written by the health
//! checker) and the round-robin cursor (an atomic, advanced on each pick).
//!
//! `pick` never returns a Down host. An empty healthy set is reported as
//! `NoHealthyHost`; the caller decides whether to fall back to the primary.

use super::host::{Host, HostAddress, HostState, WriteLocation};
use crate::balancer::{BalancerError, BalancerResult};
use chrono::Utc;
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

/// Replica selection strategy.
///
/// Round-robin is the default: it amortizes load without a central
/// coordinator. Weighted-random is used when replicas declare weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionStrategy {
    /// Cycle through healthy replicas in order
    RoundRobin,
    /// Choose a healthy replica with probability proportional to its weight
    WeightedRandom,
}

impl Default for SelectionStrategy {
    fn default() -> Self {
        Self::RoundRobin
    }
}

/// Pool of one primary plus replicas for a logical database.
#[derive(Debug)]
pub struct HostPool {
    /// Logical pool name ("main", "ci", ...)
    name: String,
    /// The single writable endpoint. Always addressable even if every
    /// replica is Down.
    primary: HostAddress,
    /// Replica hosts with their health records
    replicas: RwLock<Vec<Host>>,
    /// Round-robin cursor, pool-local
    cursor: AtomicUsize,
}

impl HostPool {
    /// Create a pool with a primary and no replicas.
    pub fn new(name: impl Into<String>, primary: HostAddress) -> Self {
        Self {
            name: name.into(),
            primary,
            replicas: RwLock::new(Vec::new()),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Logical pool name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The primary endpoint.
    pub fn primary(&self) -> &HostAddress {
        &self.primary
    }

    /// Register a replica.
    ///
    /// Fails with `DuplicateHost` if the address:port is already present,
    /// including when it duplicates the primary.
    pub fn add_replica(&self, address: HostAddress, weight: u32) -> BalancerResult<()> {
        if address == self.primary {
            return Err(BalancerError::DuplicateHost(format!(
                "{} duplicates the primary of pool '{}'",
                address, self.name
            )));
        }

        let mut replicas = self.replicas.write().expect("replica lock poisoned");
        if replicas.iter().any(|h| h.address == address) {
            return Err(BalancerError::DuplicateHost(format!(
                "{} already registered in pool '{}'",
                address, self.name
            )));
        }

        replicas.push(Host::new(address, weight));
        Ok(())
    }

    /// Mark a replica as Up.
    ///
    /// Returns the previous state, or None if the host is not in this pool.
    pub fn mark_up(&self, address: &HostAddress) -> Option<HostState> {
        let mut replicas = self.replicas.write().expect("replica lock poisoned");
        let host = replicas.iter_mut().find(|h| &h.address == address)?;
        let previous = host.state;
        host.mark_up(Utc::now());
        Some(previous)
    }

    /// Mark a replica as Down.
    ///
    /// Returns the previous state, or None if the host is not in this pool.
    pub fn mark_down(&self, address: &HostAddress) -> Option<HostState> {
        let mut replicas = self.replicas.write().expect("replica lock poisoned");
        let host = replicas.iter_mut().find(|h| &h.address == address)?;
        let previous = host.state;
        host.mark_down(Utc::now());
        Some(previous)
    }

    /// Record replication progress reported by a probe.
    pub fn record_replication(
        &self,
        address: &HostAddress,
        replayed: WriteLocation,
        lag_bytes: u64,
    ) {
        let mut replicas = self.replicas.write().expect("replica lock poisoned");
        if let Some(host) = replicas.iter_mut().find(|h| &h.address == address) {
            host.record_replication(replayed, lag_bytes);
        }
    }

    /// Snapshot of a single host's record.
    pub fn host(&self, address: &HostAddress) -> Option<Host> {
        let replicas = self.replicas.read().expect("replica lock poisoned");
        replicas.iter().find(|h| &h.address == address).cloned()
    }

    /// Addresses of all configured replicas, in configuration order.
    pub fn replica_addresses(&self) -> Vec<HostAddress> {
        let replicas = self.replicas.read().expect("replica lock poisoned");
        replicas.iter().map(|h| h.address.clone()).collect()
    }

    /// Snapshot of all replica records, in configuration order.
    pub fn replicas(&self) -> Vec<Host> {
        let replicas = self.replicas.read().expect("replica lock poisoned");
        replicas.clone()
    }

    /// Snapshot of Up hosts only. Empty when every replica is Down or
    /// unprobed; this pool never silently returns a Down host.
    pub fn healthy_hosts(&self) -> Vec<Host> {
        let replicas = self.replicas.read().expect("replica lock poisoned");
        replicas.iter().filter(|h| h.state.is_up()).cloned().collect()
    }

    /// Pick one healthy replica.
    pub fn pick(&self, strategy: SelectionStrategy) -> BalancerResult<Host> {
        self.pick_from(self.healthy_hosts(), strategy)
    }

    /// Pick one healthy replica that has replayed at least `location`.
    ///
    /// Used by position-based stickiness: a replica behind the session's
    /// last write must not serve its reads.
    pub fn pick_caught_up(
        &self,
        strategy: SelectionStrategy,
        location: WriteLocation,
    ) -> BalancerResult<Host> {
        let candidates: Vec<Host> = self
            .healthy_hosts()
            .into_iter()
            .filter(|h| h.caught_up(location))
            .collect();
        self.pick_from(candidates, strategy)
    }

    fn pick_from(&self, candidates: Vec<Host>, strategy: SelectionStrategy) -> BalancerResult<Host> {
        if candidates.is_empty() {
            return Err(BalancerError::no_healthy_host(&self.name));
        }

        let index = match strategy {
            SelectionStrategy::RoundRobin => {
                self.cursor.fetch_add(1, Ordering::Relaxed) % candidates.len()
            }
            SelectionStrategy::WeightedRandom => Self::weighted_index(&candidates),
        };

        Ok(candidates[index].clone())
    }

    fn weighted_index(candidates: &[Host]) -> usize {
        let total: u64 = candidates.iter().map(|h| u64::from(h.weight.max(1))).sum();
        let mut point = rand::thread_rng().gen_range(0..total);

        for (index, host) in candidates.iter().enumerate() {
            let weight = u64::from(host.weight.max(1));
            if point < weight {
                return index;
            }
            point -= weight;
        }

        candidates.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(name: &str) -> HostAddress {
        HostAddress::new(name, 5432)
    }

    fn pool_with_replicas(names: &[&str]) -> HostPool {
        let pool = HostPool::new("main", addr("primary"));
        for name in names {
            pool.add_replica(addr(name), 1).unwrap();
        }
        pool
    }

    #[test]
    fn test_duplicate_replica_rejected() {
        let pool = pool_with_replicas(&["replica-1"]);
        let result = pool.add_replica(addr("replica-1"), 1);
        assert!(matches!(result, Err(BalancerError::DuplicateHost(_))));
    }

    #[test]
    fn test_replica_duplicating_primary_rejected() {
        let pool = HostPool::new("main", addr("db"));
        let result = pool.add_replica(addr("db"), 1);
        assert!(matches!(result, Err(BalancerError::DuplicateHost(_))));
    }

    #[test]
    fn test_same_address_different_port_allowed() {
        let pool = HostPool::new("main", addr("db"));
        pool.add_replica(HostAddress::new("db", 5433), 1).unwrap();
    }

    #[test]
    fn test_unprobed_hosts_are_not_healthy() {
        let pool = pool_with_replicas(&["replica-1", "replica-2"]);
        assert!(pool.healthy_hosts().is_empty());
        assert!(pool.pick(SelectionStrategy::RoundRobin).is_err());
    }

    #[test]
    fn test_pick_never_returns_down_host() {
        let pool = pool_with_replicas(&["replica-1", "replica-2"]);
        pool.mark_up(&addr("replica-1"));
        pool.mark_down(&addr("replica-2"));

        for _ in 0..20 {
            let host = pool.pick(SelectionStrategy::RoundRobin).unwrap();
            assert_eq!(host.address, addr("replica-1"));
        }
    }

    #[test]
    fn test_round_robin_fairness() {
        let pool = pool_with_replicas(&["replica-1", "replica-2", "replica-3"]);
        for name in ["replica-1", "replica-2", "replica-3"] {
            pool.mark_up(&addr(name));
        }

        let calls = 30;
        let mut counts = std::collections::HashMap::new();
        for _ in 0..calls {
            let host = pool.pick(SelectionStrategy::RoundRobin).unwrap();
            *counts.entry(host.address.address).or_insert(0u32) += 1;
        }

        // 30 calls over 3 stable hosts: exactly 10 each
        for count in counts.values() {
            assert_eq!(*count, 10);
        }
    }

    #[test]
    fn test_weighted_random_respects_zero_floor() {
        // A zero weight is treated as 1, never a division-by-zero
        let pool = pool_with_replicas(&[]);
        pool.add_replica(addr("replica-1"), 0).unwrap();
        pool.mark_up(&addr("replica-1"));

        let host = pool.pick(SelectionStrategy::WeightedRandom).unwrap();
        assert_eq!(host.address, addr("replica-1"));
    }

    #[test]
    fn test_mark_transitions_report_previous_state() {
        let pool = pool_with_replicas(&["replica-1"]);

        assert_eq!(pool.mark_up(&addr("replica-1")), Some(HostState::Unknown));
        assert_eq!(pool.mark_down(&addr("replica-1")), Some(HostState::Up));
        assert_eq!(pool.mark_down(&addr("replica-1")), Some(HostState::Down));
        assert_eq!(pool.mark_up(&addr("unknown")), None);
    }

    #[test]
    fn test_pick_caught_up_filters_lagging_replicas() {
        let pool = pool_with_replicas(&["replica-1", "replica-2"]);
        pool.mark_up(&addr("replica-1"));
        pool.mark_up(&addr("replica-2"));
        pool.record_replication(&addr("replica-1"), WriteLocation::new(50), 50);
        pool.record_replication(&addr("replica-2"), WriteLocation::new(200), 0);

        for _ in 0..10 {
            let host = pool
                .pick_caught_up(SelectionStrategy::RoundRobin, WriteLocation::new(100))
                .unwrap();
            assert_eq!(host.address, addr("replica-2"));
        }

        // Nobody has replayed this far yet
        let result = pool.pick_caught_up(SelectionStrategy::RoundRobin, WriteLocation::new(500));
        assert!(matches!(result, Err(BalancerError::NoHealthyHost { .. })));
    }

    #[test]
    fn test_resume_splitting_after_recovery() {
        let pool = pool_with_replicas(&["replica-1", "replica-2"]);
        pool.mark_down(&addr("replica-1"));
        pool.mark_down(&addr("replica-2"));
        assert!(pool.pick(SelectionStrategy::RoundRobin).is_err());

        pool.mark_up(&addr("replica-2"));
        let host = pool.pick(SelectionStrategy::RoundRobin).unwrap();
        assert_eq!(host.address, addr("replica-2"));
    }
}
