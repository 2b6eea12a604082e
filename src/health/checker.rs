//! Replica health checker
//!
//! Background probe loop, one per pool, decoupled from request-serving
//! paths. Probe outcomes move hosts between Up and Down; a reachable host
//! whose reported lag exceeds the configured thresholds is marked Down all
//! the same. Consecutive failures back the probe schedule off per host up
//! to a ceiling, reset on the first success.
//!
//! Failures never leave this module: callers of the pool only ever observe
//! host states.

use super::probe::{Probe, ProbeError, ReplicaStatus};
use crate::host::{HostAddress, HostPool, HostState};
use crate::observability::{Event, EventRecord, EventSink, MetricsRegistry};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Default probe interval in seconds
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 60;

/// Default probe timeout in seconds
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;

/// Default backoff ceiling in seconds
pub const DEFAULT_BACKOFF_CEILING_SECS: u64 = 300;

/// Default maximum replication difference in bytes (8 MiB)
pub const DEFAULT_MAX_REPLICATION_DIFFERENCE: u64 = 8 * 1024 * 1024;

/// Default maximum replication lag time in seconds
pub const DEFAULT_MAX_REPLICATION_LAG_TIME_SECS: u64 = 60;

/// Health-check settings for one pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheckConfig {
    /// Base interval between probe rounds
    pub interval: Duration,
    /// Bounded timeout for a single probe
    pub probe_timeout: Duration,
    /// Ceiling for per-host probe backoff
    pub backoff_ceiling: Duration,
    /// A replica further behind than this many bytes is marked Down
    pub max_replication_difference: u64,
    /// A replica that has not replayed for this long is marked Down
    pub max_replication_lag_time: Duration,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS),
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            backoff_ceiling: Duration::from_secs(DEFAULT_BACKOFF_CEILING_SECS),
            max_replication_difference: DEFAULT_MAX_REPLICATION_DIFFERENCE,
            max_replication_lag_time: Duration::from_secs(DEFAULT_MAX_REPLICATION_LAG_TIME_SECS),
        }
    }
}

impl HealthCheckConfig {
    /// Backoff delay after `failures` consecutive failures, capped at the
    /// ceiling.
    pub fn backoff_for(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        let shift = failures.min(16).saturating_sub(1);
        let multiplied = self
            .interval
            .saturating_mul(1u32.checked_shl(shift).unwrap_or(u32::MAX));
        multiplied.min(self.backoff_ceiling)
    }
}

/// Outcome of applying one probe result to one host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Host is Up and within lag thresholds
    Healthy,
    /// Host is reachable but too far behind
    Lagging,
    /// Probe failed
    Unreachable,
}

/// Apply one probe result to the pool, emitting transition events.
pub fn apply_probe_result(
    pool: &HostPool,
    address: &HostAddress,
    result: Result<ReplicaStatus, ProbeError>,
    config: &HealthCheckConfig,
    sink: &dyn EventSink,
    metrics: &MetricsRegistry,
) -> ProbeOutcome {
    match result {
        Ok(status) => {
            metrics.increment_probes_succeeded();
            pool.record_replication(address, status.replayed_location, status.lag_bytes);

            let too_far = status.lag_bytes > config.max_replication_difference;
            let too_old = status.lag_seconds > config.max_replication_lag_time.as_secs();

            if too_far || too_old {
                let previous = pool.mark_down(address);
                if previous.is_some() && previous != Some(HostState::Down) {
                    metrics.increment_hosts_marked_down();
                    sink.emit(EventRecord::new(
                        Event::HostLagging,
                        vec![
                            ("host".to_string(), address.to_string()),
                            ("pool".to_string(), pool.name().to_string()),
                            ("lag_bytes".to_string(), status.lag_bytes.to_string()),
                            ("lag_seconds".to_string(), status.lag_seconds.to_string()),
                        ],
                    ));
                }
                ProbeOutcome::Lagging
            } else {
                let previous = pool.mark_up(address);
                if previous.is_some() && previous != Some(HostState::Up) {
                    metrics.increment_hosts_marked_up();
                    sink.emit(EventRecord::new(
                        Event::HostOnline,
                        vec![
                            ("host".to_string(), address.to_string()),
                            ("pool".to_string(), pool.name().to_string()),
                        ],
                    ));
                }
                ProbeOutcome::Healthy
            }
        }
        Err(error) => {
            metrics.increment_probes_failed();
            sink.emit(EventRecord::new(
                Event::HostProbeFailed,
                vec![
                    ("host".to_string(), address.to_string()),
                    ("pool".to_string(), pool.name().to_string()),
                    ("reason".to_string(), error.to_string()),
                ],
            ));

            let previous = pool.mark_down(address);
            if previous.is_some() && previous != Some(HostState::Down) {
                metrics.increment_hosts_marked_down();
                sink.emit(EventRecord::new(
                    Event::HostOffline,
                    vec![
                        ("host".to_string(), address.to_string()),
                        ("pool".to_string(), pool.name().to_string()),
                    ],
                ));
            }
            ProbeOutcome::Unreachable
        }
    }
}

/// Probe every replica in the pool once, synchronously. Used by the CLI
/// and by registry warm-up; the background checker goes through the same
/// transition logic.
pub fn probe_pool_once(
    pool: &HostPool,
    probe: &dyn Probe,
    config: &HealthCheckConfig,
    sink: &dyn EventSink,
    metrics: &MetricsRegistry,
) {
    for address in pool.replica_addresses() {
        let result = probe.check(&address);
        apply_probe_result(pool, &address, result, config, sink, metrics);
    }
}

/// Handle to a running background health checker.
#[derive(Debug)]
pub struct HealthChecker {
    shutdown: watch::Sender<bool>,
    handle: tokio::task::JoinHandle<()>,
}

impl HealthChecker {
    /// Spawn the probe loop for one pool. Requires a tokio runtime.
    pub fn spawn(
        pool: Arc<HostPool>,
        probe: Arc<dyn Probe>,
        config: HealthCheckConfig,
        sink: Arc<dyn EventSink>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut backoff_until: HashMap<HostAddress, Instant> = HashMap::new();

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown_rx.changed() => break,
                }

                let now = Instant::now();
                for address in pool.replica_addresses() {
                    if let Some(until) = backoff_until.get(&address) {
                        if now < *until {
                            continue;
                        }
                    }

                    let result =
                        run_probe(Arc::clone(&probe), address.clone(), config.probe_timeout).await;
                    apply_probe_result(&pool, &address, result, &config, sink.as_ref(), &metrics);

                    let failures = pool
                        .host(&address)
                        .map(|h| h.consecutive_failures)
                        .unwrap_or(0);
                    if failures > 0 {
                        backoff_until.insert(address, now + config.backoff_for(failures));
                    } else {
                        backoff_until.remove(&address);
                    }
                }
            }
        });

        Self { shutdown, handle }
    }

    /// Signal the loop to stop. Returns without waiting for the task.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Stop and wait for the loop to exit.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        let _ = (&mut self.handle).await;
    }
}

impl Drop for HealthChecker {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

/// Run one probe on the blocking pool with a bounded timeout. A hung probe
/// is abandoned and counted as a timeout failure.
async fn run_probe(
    probe: Arc<dyn Probe>,
    address: HostAddress,
    timeout: Duration,
) -> Result<ReplicaStatus, ProbeError> {
    let attempt = tokio::task::spawn_blocking(move || probe.check(&address));

    match tokio::time::timeout(timeout, attempt).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(ProbeError::Unreachable(join_error.to_string())),
        Err(_) => Err(ProbeError::Timeout(timeout.as_millis() as u64)),
    }
}
