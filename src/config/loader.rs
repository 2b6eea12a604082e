//! Configuration loading
//!
//! JSON configuration files, parsed with serde and validated before use.

use super::types::BalancerConfig;
use crate::balancer::{BalancerError, BalancerResult};
use std::path::Path;

/// Load and validate a configuration file.
pub fn load_config(path: &Path) -> BalancerResult<BalancerConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        BalancerError::configuration(format!("cannot read {}: {}", path.display(), e))
    })?;
    parse_config(&contents)
}

/// Parse and validate configuration from a JSON string.
pub fn parse_config(contents: &str) -> BalancerResult<BalancerConfig> {
    let config: BalancerConfig = serde_json::from_str(contents)
        .map_err(|e| BalancerError::configuration(format!("invalid configuration: {}", e)))?;
    config.validate()?;
    Ok(config)
}
