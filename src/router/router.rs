//! Connection router
//!
//! Maps an incoming logical unit of work (a shard key: model name, table
//! family, job class) to the pool that owns its data, before the balancer
//! picks a host within that pool. Routing tables are fixed at boot; a key
//! that maps nowhere and has no default is an error, never a silent
//! redirect into another pool's hosts.

use super::registry::PoolRegistry;
use crate::balancer::{BalancerError, BalancerResult, LoadBalancer};
use crate::session::Session;
use std::sync::Arc;

/// Router over a pool registry.
pub struct ConnectionRouter {
    registry: Arc<PoolRegistry>,
}

impl ConnectionRouter {
    /// Create a router over a registry.
    pub fn new(registry: Arc<PoolRegistry>) -> Self {
        Self { registry }
    }

    /// The underlying registry.
    pub fn registry(&self) -> &Arc<PoolRegistry> {
        &self.registry
    }

    /// Resolve a shard key to its logical pool name.
    pub fn route(&self, shard_key: &str) -> BalancerResult<String> {
        self.registry.resolve_shard(shard_key)
    }

    /// Balancer serving a shard key's pool.
    pub fn balancer_for(&self, shard_key: &str) -> BalancerResult<Arc<LoadBalancer>> {
        let pool = self.route(shard_key)?;
        self.registry
            .balancer(&pool)
            .ok_or(BalancerError::UnknownShard(shard_key.to_string()))
    }

    /// New session for the pool serving a shard key, configured with that
    /// pool's stickiness strategy.
    pub fn session_for(&self, shard_key: &str) -> BalancerResult<Session> {
        let pool = self.route(shard_key)?;
        self.registry
            .session_for(&pool)
            .ok_or(BalancerError::UnknownShard(shard_key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BalancerConfig, EndpointConfig, HealthConfig, PoolConfig, StickinessConfig};
    use crate::observability::{EventSink, MemorySink, MetricsRegistry};
    use std::collections::BTreeMap;

    fn endpoint(address: &str) -> EndpointConfig {
        EndpointConfig {
            address: address.to_string(),
            port: 5432,
            weight: 1,
        }
    }

    fn router(default_pool: Option<&str>) -> ConnectionRouter {
        let mut shards = BTreeMap::new();
        shards.insert("ci_builds".to_string(), "ci".to_string());
        shards.insert("ci_pipelines".to_string(), "ci".to_string());

        let config = BalancerConfig {
            pools: vec![
                PoolConfig {
                    name: "main".to_string(),
                    primary: endpoint("db-main"),
                    replicas: vec![endpoint("db-main-r1")],
                    selection: None,
                    stickiness: StickinessConfig::default(),
                    health: HealthConfig::default(),
                    shared_primary: false,
                },
                PoolConfig {
                    name: "ci".to_string(),
                    primary: endpoint("db-ci"),
                    replicas: vec![],
                    selection: None,
                    stickiness: StickinessConfig::default(),
                    health: HealthConfig::default(),
                    shared_primary: false,
                },
            ],
            shards,
            default_pool: default_pool.map(|s| s.to_string()),
        };

        let registry = PoolRegistry::init(
            config,
            Arc::new(MemorySink::new()) as Arc<dyn EventSink>,
            Arc::new(MetricsRegistry::new()),
        )
        .unwrap();
        ConnectionRouter::new(Arc::new(registry))
    }

    #[test]
    fn test_mapped_keys_route_to_their_pool() {
        let router = router(Some("main"));
        assert_eq!(router.route("ci_builds").unwrap(), "ci");
        assert_eq!(router.route("ci_pipelines").unwrap(), "ci");
        assert_eq!(router.route("users").unwrap(), "main");
    }

    #[test]
    fn test_unmapped_key_without_default_errors() {
        let router = router(None);
        let result = router.route("users");
        assert!(matches!(result, Err(BalancerError::UnknownShard(_))));
    }

    #[test]
    fn test_pools_never_cross() {
        let router = router(Some("main"));

        let main = router.balancer_for("users").unwrap();
        let ci = router.balancer_for("ci_builds").unwrap();

        // A main write target can never be a ci host, and vice versa
        assert_eq!(main.pool().primary().address, "db-main");
        assert_eq!(ci.pool().primary().address, "db-ci");
    }

    #[test]
    fn test_session_for_routes_through_shards() {
        let with_default = router(Some("main"));
        assert!(with_default.session_for("ci_builds").is_ok());

        let without_default = router(None);
        assert!(without_default.session_for("unknown").is_err());
    }
}
