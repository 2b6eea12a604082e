//! Configuration
//!
//! Serde-backed configuration types, file loading, and fail-fast topology
//! validation.

mod loader;
mod types;

pub use loader::{load_config, parse_config};
pub use types::{
    BalancerConfig, EndpointConfig, HealthConfig, PoolConfig, SelectionConfig, StickinessConfig,
    StickinessKind, MAIN_POOL,
};
