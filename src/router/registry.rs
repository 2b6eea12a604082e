//! Pool registry
//!
//! Process-wide mapping from logical pool name to its balancer. Built once
//! from validated configuration, torn down at process exit. `reload` swaps
//! an immutable snapshot atomically so in-flight readers keep iterating a
//! consistent host list; nothing is mutated in place.

use crate::balancer::{BalancerError, BalancerResult, LoadBalancer};
use crate::config::BalancerConfig;
use crate::health::{HealthCheckConfig, HealthChecker, Probe};
use crate::host::HostPool;
use crate::observability::{Event, EventRecord, EventSink, MetricsRegistry};
use crate::session::{Session, StickinessStrategy};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};

/// Everything the registry knows about one logical pool.
#[derive(Clone)]
pub struct PoolHandle {
    /// The pool's hosts
    pub pool: Arc<HostPool>,
    /// The balancer routing over those hosts
    pub balancer: Arc<LoadBalancer>,
    /// Health-check settings for this pool
    pub health: HealthCheckConfig,
    /// Stickiness strategy sessions against this pool use
    pub stickiness: StickinessStrategy,
}

/// Immutable view of the configured topology.
struct RegistrySnapshot {
    pools: HashMap<String, PoolHandle>,
    shards: BTreeMap<String, String>,
    default_pool: Option<String>,
}

impl RegistrySnapshot {
    fn build(
        config: &BalancerConfig,
        sink: &Arc<dyn EventSink>,
        metrics: &Arc<MetricsRegistry>,
    ) -> BalancerResult<Self> {
        config.validate()?;

        let mut pools = HashMap::new();
        for pool_config in &config.pools {
            let pool = Arc::new(HostPool::new(
                pool_config.name.clone(),
                pool_config.primary.host_address(),
            ));
            for replica in &pool_config.replicas {
                pool.add_replica(replica.host_address(), replica.weight)?;
            }

            let balancer = Arc::new(LoadBalancer::new(
                Arc::clone(&pool),
                pool_config.effective_selection(),
                Arc::clone(sink),
                Arc::clone(metrics),
            ));

            pools.insert(
                pool_config.name.clone(),
                PoolHandle {
                    pool,
                    balancer,
                    health: pool_config.health.to_health_check_config(),
                    stickiness: pool_config.stickiness.to_strategy(),
                },
            );
        }

        Ok(Self {
            pools,
            shards: config.shards.clone(),
            default_pool: config.default_pool.clone(),
        })
    }
}

/// Registry of logical pools.
///
/// Explicitly constructed and passed by reference; there is no ambient
/// singleton.
pub struct PoolRegistry {
    snapshot: RwLock<Arc<RegistrySnapshot>>,
    checkers: Mutex<Vec<HealthChecker>>,
    sink: Arc<dyn EventSink>,
    metrics: Arc<MetricsRegistry>,
}

impl PoolRegistry {
    /// Build the registry from validated configuration.
    pub fn init(
        config: BalancerConfig,
        sink: Arc<dyn EventSink>,
        metrics: Arc<MetricsRegistry>,
    ) -> BalancerResult<Self> {
        let snapshot = RegistrySnapshot::build(&config, &sink, &metrics)?;
        sink.emit(EventRecord::new(
            Event::RegistryInit,
            vec![("pools".to_string(), snapshot.pools.len().to_string())],
        ));

        Ok(Self {
            snapshot: RwLock::new(Arc::new(snapshot)),
            checkers: Mutex::new(Vec::new()),
            sink,
            metrics,
        })
    }

    /// Atomically replace the topology with a new configuration.
    ///
    /// The old snapshot stays intact for readers that already hold it.
    /// Running health checkers are stopped; callers that want background
    /// checking against the new topology call `start_health_checkers`
    /// again.
    pub fn reload(&self, config: BalancerConfig) -> BalancerResult<()> {
        let next = Arc::new(RegistrySnapshot::build(&config, &self.sink, &self.metrics)?);

        {
            let mut current = self.snapshot.write().expect("registry lock poisoned");
            *current = next;
        }
        self.stop_checkers();

        self.sink
            .emit(EventRecord::new(Event::RegistryReload, vec![]));
        Ok(())
    }

    /// Stop health checkers and mark the registry torn down.
    pub fn shutdown(&self) {
        self.stop_checkers();
        self.sink
            .emit(EventRecord::new(Event::RegistryShutdown, vec![]));
    }

    /// Spawn one background health checker per pool. Requires a tokio
    /// runtime.
    pub fn start_health_checkers(&self, probe: Arc<dyn Probe>) {
        let snapshot = self.current();
        let mut checkers = self.checkers.lock().expect("checker lock poisoned");
        for handle in snapshot.pools.values() {
            checkers.push(HealthChecker::spawn(
                Arc::clone(&handle.pool),
                Arc::clone(&probe),
                handle.health.clone(),
                Arc::clone(&self.sink),
                Arc::clone(&self.metrics),
            ));
        }
    }

    /// Handle for one logical pool.
    pub fn pool_handle(&self, name: &str) -> Option<PoolHandle> {
        self.current().pools.get(name).cloned()
    }

    /// Balancer for one logical pool.
    pub fn balancer(&self, name: &str) -> Option<Arc<LoadBalancer>> {
        self.current().pools.get(name).map(|h| Arc::clone(&h.balancer))
    }

    /// New session configured with the pool's stickiness strategy.
    pub fn session_for(&self, name: &str) -> Option<Session> {
        self.current()
            .pools
            .get(name)
            .map(|h| Session::new(h.stickiness))
    }

    /// Configured pool names, sorted.
    pub fn pool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.current().pools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolve a shard key to a logical pool name.
    pub fn resolve_shard(&self, shard_key: &str) -> BalancerResult<String> {
        let snapshot = self.current();
        if let Some(pool) = snapshot.shards.get(shard_key) {
            return Ok(pool.clone());
        }
        snapshot
            .default_pool
            .clone()
            .ok_or_else(|| BalancerError::UnknownShard(shard_key.to_string()))
    }

    fn current(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(&self.snapshot.read().expect("registry lock poisoned"))
    }

    fn stop_checkers(&self) {
        let mut checkers = self.checkers.lock().expect("checker lock poisoned");
        for checker in checkers.drain(..) {
            checker.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EndpointConfig, HealthConfig, PoolConfig, StickinessConfig};
    use crate::observability::MemorySink;

    fn endpoint(address: &str, port: u16) -> EndpointConfig {
        EndpointConfig {
            address: address.to_string(),
            port,
            weight: 1,
        }
    }

    fn pool_config(name: &str, primary: &str, replicas: &[&str]) -> PoolConfig {
        PoolConfig {
            name: name.to_string(),
            primary: endpoint(primary, 5432),
            replicas: replicas.iter().map(|r| endpoint(r, 5432)).collect(),
            selection: None,
            stickiness: StickinessConfig::default(),
            health: HealthConfig::default(),
            shared_primary: false,
        }
    }

    fn config() -> BalancerConfig {
        let mut shards = BTreeMap::new();
        shards.insert("ci_builds".to_string(), "ci".to_string());
        BalancerConfig {
            pools: vec![
                pool_config("main", "db-main", &["db-main-r1"]),
                pool_config("ci", "db-ci", &["db-ci-r1"]),
            ],
            shards,
            default_pool: Some("main".to_string()),
        }
    }

    fn registry() -> (PoolRegistry, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let registry = PoolRegistry::init(
            config(),
            sink.clone() as Arc<dyn EventSink>,
            Arc::new(MetricsRegistry::new()),
        )
        .unwrap();
        (registry, sink)
    }

    #[test]
    fn test_init_builds_all_pools() {
        let (registry, sink) = registry();
        assert_eq!(registry.pool_names(), vec!["ci", "main"]);
        assert!(registry.balancer("main").is_some());
        assert!(registry.balancer("staging").is_none());
        assert_eq!(sink.count(Event::RegistryInit), 1);
    }

    #[test]
    fn test_init_rejects_invalid_config() {
        let mut bad = config();
        bad.pools.retain(|p| p.name != "main");
        let result = PoolRegistry::init(
            bad,
            Arc::new(MemorySink::new()) as Arc<dyn EventSink>,
            Arc::new(MetricsRegistry::new()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_shard_resolution() {
        let (registry, _) = registry();
        assert_eq!(registry.resolve_shard("ci_builds").unwrap(), "ci");
        // Unmapped key uses the default pool
        assert_eq!(registry.resolve_shard("users").unwrap(), "main");
    }

    #[test]
    fn test_shard_resolution_without_default() {
        let mut cfg = config();
        cfg.default_pool = None;
        let registry = PoolRegistry::init(
            cfg,
            Arc::new(MemorySink::new()) as Arc<dyn EventSink>,
            Arc::new(MetricsRegistry::new()),
        )
        .unwrap();

        let result = registry.resolve_shard("users");
        assert!(matches!(result, Err(BalancerError::UnknownShard(_))));
    }

    #[test]
    fn test_reload_swaps_topology() {
        let (registry, sink) = registry();

        let mut next = config();
        next.pools.push(pool_config("analytics", "db-analytics", &[]));
        registry.reload(next).unwrap();

        assert_eq!(registry.pool_names(), vec!["analytics", "ci", "main"]);
        assert_eq!(sink.count(Event::RegistryReload), 1);
    }

    #[test]
    fn test_reload_rejects_invalid_config_and_keeps_old() {
        let (registry, _) = registry();

        let mut bad = config();
        bad.pools[1].primary = endpoint("db-main", 5433); // shares main's host
        assert!(registry.reload(bad).is_err());

        // Old topology still routes
        assert_eq!(registry.pool_names(), vec!["ci", "main"]);
    }

    #[test]
    fn test_old_snapshot_survives_reload_for_holders() {
        let (registry, _) = registry();
        let held = registry.balancer("ci").unwrap();

        let mut next = config();
        next.pools.retain(|p| p.name != "ci");
        next.shards.clear();
        registry.reload(next).unwrap();

        // The held balancer still works against its own host list
        assert!(registry.balancer("ci").is_none());
        assert_eq!(held.pool().name(), "ci");
    }

    #[test]
    fn test_session_for_uses_pool_strategy() {
        let (registry, _) = registry();
        let session = registry.session_for("main").unwrap();
        assert_eq!(session.strategy(), StickinessStrategy::default());
        assert!(registry.session_for("missing").is_none());
    }

    #[test]
    fn test_shutdown_emits_event() {
        let (registry, sink) = registry();
        registry.shutdown();
        assert_eq!(sink.count(Event::RegistryShutdown), 1);
    }
}
