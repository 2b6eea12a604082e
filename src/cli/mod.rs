//! Command line interface
//!
//! Thin wrapper over the library: parse arguments with clap, load the
//! configuration, run one command, map failures to stable error codes.

pub mod args;
pub mod commands;
pub mod errors;

pub use args::{Cli, Command};
pub use commands::run;
pub use errors::{CliError, CliErrorCode, CliResult};
