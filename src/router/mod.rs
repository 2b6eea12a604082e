//! Routing
//!
//! The pool registry (process-wide topology, explicit lifecycle) and the
//! connection router (shard key to logical pool).

mod registry;
mod router;

pub use registry::{PoolHandle, PoolRegistry};
pub use router::ConnectionRouter;
