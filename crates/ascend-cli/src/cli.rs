//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Ascend CLI - Run agent tier challenges and promotions.
#[derive(Debug, Parser)]
#[command(name = "ascend")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "ASCEND_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database file (overrides the config file)
    #[arg(short, long, global = true, env = "ASCEND_DB")]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (bare values)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Enroll a new agent at the entry tier
    Enroll(AgentArgs),

    /// Start a challenge toward the agent's next tier
    Start(AgentArgs),

    /// Evaluate the agent's active challenge
    Evaluate(EvaluateArgs),

    /// Close the agent's active challenge without reset or demotion
    Expire(AgentArgs),

    /// Show progress and time left on the active challenge
    Status(AgentArgs),

    /// Show an agent's profile
    Show(AgentArgs),

    /// List every enrolled agent
    Agents,

    /// Add newly tracked referrals to an agent's counts
    RecordReferrals(RecordReferralsArgs),

    /// Compute an agent's earnings for a period
    Commission(CommissionArgs),

    /// Show closed challenges for an agent
    History(HistoryArgs),

    /// Show the tier catalog
    Tiers,

    /// Evaluate every active challenge
    Sweep(SweepArgs),
}

/// Arguments naming a single agent.
#[derive(Debug, Parser)]
pub struct AgentArgs {
    /// Agent identifier
    pub agent: String,
}

/// Arguments for the evaluate command.
#[derive(Debug, Parser)]
pub struct EvaluateArgs {
    /// Agent identifier
    pub agent: String,

    /// Show the outcome without saving it
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the record-referrals command.
#[derive(Debug, Parser)]
pub struct RecordReferralsArgs {
    /// Agent identifier
    pub agent: String,

    /// New direct referrals
    #[arg(long, default_value = "0")]
    pub direct: u64,

    /// New level-1 indirect referrals
    #[arg(long, default_value = "0")]
    pub level1: u64,
}

/// Arguments for the commission command.
#[derive(Debug, Parser)]
pub struct CommissionArgs {
    /// Agent identifier
    pub agent: String,

    /// Direct referral events in the period
    #[arg(long, default_value = "0")]
    pub direct: u64,

    /// Second-level referral events in the period
    #[arg(long, default_value = "0")]
    pub level2: u64,

    /// Third-level referral events in the period
    #[arg(long, default_value = "0")]
    pub level3: u64,

    /// Network earnings for the period, in cents
    #[arg(short, long, default_value = "0")]
    pub network_earnings: u64,
}

/// Arguments for the history command.
#[derive(Debug, Parser)]
pub struct HistoryArgs {
    /// Agent identifier
    pub agent: String,

    /// Show totals instead of individual records
    #[arg(short, long)]
    pub summary: bool,
}

/// Arguments for the sweep command.
#[derive(Debug, Parser)]
pub struct SweepArgs {
    /// Evaluate without saving anything
    #[arg(long)]
    pub dry_run: bool,

    /// Keep sweeping on the configured interval until Ctrl+C
    #[arg(long, conflicts_with = "cycles")]
    pub watch: bool,

    /// Run this many scheduled sweeps, then stop
    #[arg(long)]
    pub cycles: Option<usize>,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}
