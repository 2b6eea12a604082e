//! aerobalance - primary/replica read-write splitting load balancer
//!
//! Routes database operations across one primary and a set of replicas
//! per pool. Reads go to healthy replicas, writes always go to the
//! primary, and sessions that just wrote stick to the primary until the
//! replicas have caught up (by time window or by replication position).
//!
//! Subsystems:
//! - `host`: host state, replica pools, selection strategies
//! - `health`: probes, background health checking, lag thresholds
//! - `session`: per-session routing state and scope modifiers
//! - `balancer`: routing decisions, read retry, write recording
//! - `router`: multi-pool registry, shard key resolution, reload
//! - `config`: JSON configuration types, loading, validation
//! - `observability`: structured events, logging, counters
//! - `cli`: validate / check / route commands

pub mod balancer;
pub mod cli;
pub mod config;
pub mod health;
pub mod host;
pub mod observability;
pub mod router;
pub mod session;
