//! # Balancer Errors
//!
//! Error taxonomy for routing and host selection.
//!
//! Propagation policy:
//! - Health-probe failures are contained inside the health checker and never
//!   reach callers.
//! - `NoHealthyHost` is normally absorbed by the read path (fallback to
//!   primary) and only surfaces when the caller asks the pool directly.
//! - `PrimaryUnavailable` always surfaces; writes are never retried against
//!   a replica.

use thiserror::Error;

/// Result type for balancing operations
pub type BalancerResult<T> = Result<T, BalancerError>;

/// Balancing errors
#[derive(Debug, Clone, Error)]
pub enum BalancerError {
    // ==================
    // Configuration Errors (fatal, startup-time)
    // ==================
    /// Invalid topology or settings, detected at startup
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A host with the same address:port is already registered
    #[error("Duplicate host: {0}")]
    DuplicateHost(String),

    // ==================
    // Routing Errors
    // ==================
    /// All replicas in the pool are down
    #[error("No healthy host available in pool '{pool}'")]
    NoHealthyHost { pool: String },

    /// The primary cannot serve the operation
    #[error("Primary unavailable for pool '{pool}': {reason}")]
    PrimaryUnavailable { pool: String, reason: String },

    /// The shard key maps to no configured pool and no default exists
    #[error("Unknown shard: {0}")]
    UnknownShard(String),

    // ==================
    // Caller-visible timeouts
    // ==================
    /// The caller's deadline expired before the operation completed
    #[error("Deadline exceeded during {operation}")]
    DeadlineExceeded { operation: String },
}

impl BalancerError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a no-healthy-host error for a pool.
    pub fn no_healthy_host(pool: impl Into<String>) -> Self {
        Self::NoHealthyHost { pool: pool.into() }
    }

    /// Create a primary-unavailable error.
    pub fn primary_unavailable(pool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PrimaryUnavailable {
            pool: pool.into(),
            reason: reason.into(),
        }
    }

    /// Create a deadline-exceeded error.
    pub fn deadline_exceeded(operation: impl Into<String>) -> Self {
        Self::DeadlineExceeded {
            operation: operation.into(),
        }
    }

    /// Check if this error is fatal for the whole process (startup aborts).
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::DuplicateHost(_))
    }

    /// Check if the caller may retry the operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NoHealthyHost { .. } | Self::DeadlineExceeded { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors_are_fatal() {
        assert!(BalancerError::configuration("bad topology").is_fatal());
        assert!(BalancerError::DuplicateHost("db1:5432".to_string()).is_fatal());
        assert!(!BalancerError::no_healthy_host("main").is_fatal());
    }

    #[test]
    fn test_retryable_errors() {
        assert!(BalancerError::no_healthy_host("main").is_retryable());
        assert!(BalancerError::deadline_exceeded("read").is_retryable());
        assert!(!BalancerError::primary_unavailable("main", "refused").is_retryable());
        assert!(!BalancerError::UnknownShard("ci_builds".to_string()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = BalancerError::primary_unavailable("main", "connection refused");
        assert_eq!(
            err.to_string(),
            "Primary unavailable for pool 'main': connection refused"
        );
    }
}
