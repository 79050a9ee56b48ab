//! CLI argument definitions using clap
//!
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Fintel - Transaction analytics for bank statements
#[derive(Parser)]
#[command(name = "fintel")]
#[command(about = "Heuristic analytics over bank statement transactions", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Analytics config override (TOML)
    ///
    /// Falls back to ~/.local/share/fintel/config/analytics.toml, then to
    /// the built-in defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every analysis command
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Statement file (.json for JSON, anything else is read as CSV)
    #[arg(short, long)]
    pub file: PathBuf,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Seed for forecast jitter and the illustrative score history
    #[arg(long)]
    pub seed: Option<u64>,

    /// Reference date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub today: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every analyzer
    Analyze(RunArgs),

    /// Detect recurring expenses and subscriptions
    Recurring(RunArgs),

    /// Monthly cash flow, forecast, and gaps
    Cashflow(RunArgs),

    /// Financial health score
    Health(RunArgs),

    /// Merchant spending profiles
    Merchants(RunArgs),

    /// Tax deduction candidates
    Tax(RunArgs),
}
