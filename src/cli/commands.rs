//! CLI command implementations

use super::args::{Cli, Command};
use super::errors::CliResult;
use crate::balancer::OperationKind;
use crate::config::{load_config, BalancerConfig};
use crate::health::{probe_pool_once, TcpProbe};
use crate::observability::{EventSink, LogSink, MetricsRegistry};
use crate::router::{ConnectionRouter, PoolRegistry};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Parse arguments and dispatch to the chosen command.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Dispatch one command.
pub fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Validate { config } => validate(&config),
        Command::Check { config } => check(&config),
        Command::Route { config, key } => route(&config, &key),
    }
}

/// Load and validate a configuration file.
pub fn validate(path: &Path) -> CliResult<()> {
    let config = load_config(path)?;
    println!(
        "configuration valid: {} pool(s), {} shard mapping(s)",
        config.pools.len(),
        config.shards.len()
    );
    Ok(())
}

/// Probe every replica once and print host states.
pub fn check(path: &Path) -> CliResult<()> {
    let config = load_config(path)?;
    let registry = build_registry(config)?;

    for name in registry.pool_names() {
        let Some(handle) = registry.pool_handle(&name) else {
            continue;
        };
        let probe = TcpProbe::new(Duration::from_secs(
            handle.health.probe_timeout.as_secs().max(1),
        ));
        probe_pool_once(
            &handle.pool,
            &probe,
            &handle.health,
            &LogSink,
            &MetricsRegistry::new(),
        );

        println!("pool {} primary {}", name, handle.pool.primary());
        for host in handle.pool.replicas() {
            println!("  replica {} {}", host.address, host.state.state_name());
        }
    }
    Ok(())
}

/// Print the routing decision for a read on a shard key.
pub fn route(path: &Path, key: &str) -> CliResult<()> {
    let config = load_config(path)?;
    let registry = Arc::new(build_registry(config)?);
    let router = ConnectionRouter::new(registry);

    let pool = router.route(key)?;
    let balancer = router.balancer_for(key)?;
    let session = router.session_for(key)?;
    let decision = balancer.route_for(&session, OperationKind::Read);

    println!(
        "key {} -> pool {} -> {} ({})",
        key,
        pool,
        decision.target.address(),
        decision.reason.reason_name()
    );
    Ok(())
}

fn build_registry(config: BalancerConfig) -> CliResult<PoolRegistry> {
    Ok(PoolRegistry::init(
        config,
        Arc::new(LogSink) as Arc<dyn EventSink>,
        Arc::new(MetricsRegistry::new()),
    )?)
}
