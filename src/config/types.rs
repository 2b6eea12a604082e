//! Configuration types
//!
//! Configured externally (file), immutable after startup; the registry's
//! explicit `reload` is the only way a new configuration takes effect.
//! Malformed topologies fail fast at load with descriptive errors.

use crate::balancer::{BalancerError, BalancerResult};
use crate::health::{
    HealthCheckConfig, DEFAULT_BACKOFF_CEILING_SECS, DEFAULT_CHECK_INTERVAL_SECS,
    DEFAULT_MAX_REPLICATION_DIFFERENCE, DEFAULT_MAX_REPLICATION_LAG_TIME_SECS,
    DEFAULT_PROBE_TIMEOUT_SECS,
};
use crate::host::{HostAddress, SelectionStrategy};
use crate::session::{StickinessStrategy, DEFAULT_STICKY_WINDOW_SECS};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

/// One database endpoint in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Hostname or IP address
    pub address: String,
    /// TCP port
    pub port: u16,
    /// Selection weight for weighted-random strategies
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

impl EndpointConfig {
    /// Convert to a host address.
    pub fn host_address(&self) -> HostAddress {
        HostAddress::new(self.address.clone(), self.port)
    }
}

/// Replica selection strategy in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionConfig {
    /// Cycle through healthy replicas
    RoundRobin,
    /// Weight-proportional random choice
    WeightedRandom,
}

impl From<SelectionConfig> for SelectionStrategy {
    fn from(config: SelectionConfig) -> Self {
        match config {
            SelectionConfig::RoundRobin => SelectionStrategy::RoundRobin,
            SelectionConfig::WeightedRandom => SelectionStrategy::WeightedRandom,
        }
    }
}

/// Stickiness strategy in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StickinessKind {
    /// Time-window stickiness after a write
    TimeWindow,
    /// Position-based stickiness (requires a position-reporting probe)
    WritePosition,
}

/// Stickiness settings for one pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StickinessConfig {
    /// Strategy kind
    pub strategy: StickinessKind,
    /// Window length for the time strategy, seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_window_secs() -> u64 {
    DEFAULT_STICKY_WINDOW_SECS as u64
}

impl Default for StickinessConfig {
    fn default() -> Self {
        Self {
            strategy: StickinessKind::TimeWindow,
            window_secs: default_window_secs(),
        }
    }
}

impl StickinessConfig {
    /// Convert to the session strategy.
    pub fn to_strategy(&self) -> StickinessStrategy {
        match self.strategy {
            StickinessKind::TimeWindow => {
                StickinessStrategy::TimeWindow(chrono::Duration::seconds(self.window_secs as i64))
            }
            StickinessKind::WritePosition => StickinessStrategy::WritePosition,
        }
    }
}

/// Health-check settings for one pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Seconds between probe rounds
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Bounded probe timeout, seconds
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    /// Per-host backoff ceiling, seconds
    #[serde(default = "default_backoff_ceiling_secs")]
    pub backoff_ceiling_secs: u64,
    /// Replicas further behind than this many bytes stop serving reads
    #[serde(default = "default_max_replication_difference")]
    pub max_replication_difference: u64,
    /// Replicas that have not replayed for this long stop serving reads
    #[serde(default = "default_max_replication_lag_time_secs")]
    pub max_replication_lag_time_secs: u64,
}

fn default_interval_secs() -> u64 {
    DEFAULT_CHECK_INTERVAL_SECS
}

fn default_probe_timeout_secs() -> u64 {
    DEFAULT_PROBE_TIMEOUT_SECS
}

fn default_backoff_ceiling_secs() -> u64 {
    DEFAULT_BACKOFF_CEILING_SECS
}

fn default_max_replication_difference() -> u64 {
    DEFAULT_MAX_REPLICATION_DIFFERENCE
}

fn default_max_replication_lag_time_secs() -> u64 {
    DEFAULT_MAX_REPLICATION_LAG_TIME_SECS
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            backoff_ceiling_secs: default_backoff_ceiling_secs(),
            max_replication_difference: default_max_replication_difference(),
            max_replication_lag_time_secs: default_max_replication_lag_time_secs(),
        }
    }
}

impl HealthConfig {
    /// Convert to checker settings.
    pub fn to_health_check_config(&self) -> HealthCheckConfig {
        HealthCheckConfig {
            interval: Duration::from_secs(self.interval_secs),
            probe_timeout: Duration::from_secs(self.probe_timeout_secs),
            backoff_ceiling: Duration::from_secs(self.backoff_ceiling_secs),
            max_replication_difference: self.max_replication_difference,
            max_replication_lag_time: Duration::from_secs(self.max_replication_lag_time_secs),
        }
    }
}

/// One logical pool in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Logical pool name ("main", "ci", ...)
    pub name: String,
    /// The single writable endpoint
    pub primary: EndpointConfig,
    /// Read replicas
    #[serde(default)]
    pub replicas: Vec<EndpointConfig>,
    /// Explicit selection strategy; derived from weights when absent
    #[serde(default)]
    pub selection: Option<SelectionConfig>,
    /// Stickiness settings
    #[serde(default)]
    pub stickiness: StickinessConfig,
    /// Health-check settings
    #[serde(default)]
    pub health: HealthConfig,
    /// Allow this pool to share the main pool's primary endpoint.
    /// A secondary pool pointing at main's primary without this flag is a
    /// configuration error.
    #[serde(default)]
    pub shared_primary: bool,
}

impl PoolConfig {
    /// Effective selection strategy: explicit configuration wins; otherwise
    /// weighted-random when any replica declares a non-default weight.
    pub fn effective_selection(&self) -> SelectionStrategy {
        if let Some(selection) = self.selection {
            return selection.into();
        }
        if self.replicas.iter().any(|r| r.weight != 1) {
            SelectionStrategy::WeightedRandom
        } else {
            SelectionStrategy::RoundRobin
        }
    }
}

/// Name of the pool every deployment must declare.
pub const MAIN_POOL: &str = "main";

/// Top-level balancer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancerConfig {
    /// Logical pools; a `main` pool is required
    pub pools: Vec<PoolConfig>,
    /// Shard key to pool name routing table
    #[serde(default)]
    pub shards: BTreeMap<String, String>,
    /// Pool used for shard keys not present in `shards`
    #[serde(default)]
    pub default_pool: Option<String>,
}

impl BalancerConfig {
    /// Look up a pool by name.
    pub fn pool(&self, name: &str) -> Option<&PoolConfig> {
        self.pools.iter().find(|p| p.name == name)
    }

    /// Validate the whole topology. Called at load and again before every
    /// registry reload.
    pub fn validate(&self) -> BalancerResult<()> {
        if self.pools.is_empty() {
            return Err(BalancerError::configuration("no pools configured"));
        }

        let mut names = HashSet::new();
        for pool in &self.pools {
            if pool.name.is_empty() {
                return Err(BalancerError::configuration("pool with empty name"));
            }
            if !names.insert(pool.name.as_str()) {
                return Err(BalancerError::configuration(format!(
                    "pool '{}' declared more than once",
                    pool.name
                )));
            }
            Self::validate_pool(pool)?;
        }

        let main = self.pool(MAIN_POOL).ok_or_else(|| {
            BalancerError::configuration(format!(
                "a '{}' pool is required but none is declared",
                MAIN_POOL
            ))
        })?;

        // Secondary pools may point at main's primary host only when the
        // shared topology is explicitly declared
        for pool in &self.pools {
            if pool.name == MAIN_POOL {
                continue;
            }
            if pool.primary.address == main.primary.address && !pool.shared_primary {
                return Err(BalancerError::configuration(format!(
                    "pool '{}' shares the '{}' primary host '{}' without shared_primary",
                    pool.name, MAIN_POOL, main.primary.address
                )));
            }
        }

        for (shard, pool_name) in &self.shards {
            if self.pool(pool_name).is_none() {
                return Err(BalancerError::configuration(format!(
                    "shard '{}' maps to undeclared pool '{}'",
                    shard, pool_name
                )));
            }
        }

        if let Some(default) = &self.default_pool {
            if self.pool(default).is_none() {
                return Err(BalancerError::configuration(format!(
                    "default pool '{}' is not declared",
                    default
                )));
            }
        }

        Ok(())
    }

    fn validate_pool(pool: &PoolConfig) -> BalancerResult<()> {
        let mut endpoints = HashSet::new();
        endpoints.insert(pool.primary.host_address());

        for replica in &pool.replicas {
            let address = replica.host_address();
            if !endpoints.insert(address.clone()) {
                return Err(BalancerError::configuration(format!(
                    "duplicate host {} in pool '{}'",
                    address, pool.name
                )));
            }
        }
        Ok(())
    }
}
