//! Load balancing
//!
//! Routing decisions, the per-pool load balancer, and the crate-wide error
//! taxonomy.

mod decision;
mod errors;
mod load_balancer;

pub use decision::{OperationKind, RouteReason, RouteTarget, RoutingDecision};
pub use errors::{BalancerError, BalancerResult};
pub use load_balancer::{Deadline, LoadBalancer};
