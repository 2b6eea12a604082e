//! Host and pool model
//!
//! Endpoint identity, per-host liveness state, and the pool a logical
//! database's replicas live in. Health records are mutated only by the
//! health checker; selection never returns a Down host.

mod host;
mod pool;

pub use host::{Host, HostAddress, HostState, WriteLocation};
pub use pool::{HostPool, SelectionStrategy};
