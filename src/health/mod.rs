//! Replica health checking
//!
//! Probes, the background checker loop, and the thresholds that decide
//! when a replica stops serving reads.

mod checker;
mod probe;

pub use checker::{
    apply_probe_result, probe_pool_once, HealthCheckConfig, HealthChecker, ProbeOutcome,
    DEFAULT_BACKOFF_CEILING_SECS, DEFAULT_CHECK_INTERVAL_SECS, DEFAULT_MAX_REPLICATION_DIFFERENCE,
    DEFAULT_MAX_REPLICATION_LAG_TIME_SECS, DEFAULT_PROBE_TIMEOUT_SECS,
};
pub use probe::{Probe, ProbeError, ReplicaStatus, TcpProbe};
