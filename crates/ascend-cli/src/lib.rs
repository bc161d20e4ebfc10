//! Ascend CLI library.
//!
//! This library provides the core functionality for the `ascend` command-line
//! interface: configuration loading, command execution over a SQLite-backed
//! progression service, and output formatting.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::{Cli, Command};
pub use commands::App;
pub use config::Config;
pub use error::{CliError, Result};
pub use output::Formatter;
