//! CLI argument definitions using clap
//!
//! Commands:
//! - aerobalance validate --config <path>
//! - aerobalance check --config <path>
//! - aerobalance route --config <path> --key <shard-key>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// aerobalance - primary/replica read-write splitting load balancer
#[derive(Parser, Debug)]
#[command(name = "aerobalance")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load and validate a configuration file
    Validate {
        /// Path to configuration file
        #[arg(long, default_value = "./aerobalance.json")]
        config: PathBuf,
    },

    /// Probe every configured replica once and print host states
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./aerobalance.json")]
        config: PathBuf,
    },

    /// Print the routing decision for a read on a shard key
    Route {
        /// Path to configuration file
        #[arg(long, default_value = "./aerobalance.json")]
        config: PathBuf,

        /// Shard key to route
        #[arg(long)]
        key: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
