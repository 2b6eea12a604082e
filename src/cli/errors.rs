//! CLI-specific error types

use crate::balancer::BalancerError;
use std::fmt;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// Routing error (unknown shard, no pool)
    RoutingError,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "AEROLB_CLI_CONFIG_ERROR",
            Self::RoutingError => "AEROLB_CLI_ROUTING_ERROR",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// Routing error
    pub fn routing_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::RoutingError, msg)
    }
}

impl From<BalancerError> for CliError {
    fn from(error: BalancerError) -> Self {
        match &error {
            BalancerError::Configuration(_) | BalancerError::DuplicateHost(_) => {
                Self::config_error(error.to_string())
            }
            _ => Self::routing_error(error.to_string()),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
