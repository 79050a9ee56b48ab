//! Fintel CLI - Transaction analytics for bank statements
//!
//! Usage:
//!   fintel analyze --file statement.csv      Run every analyzer
//!   fintel recurring --file statement.csv    Detect subscriptions
//!   fintel cashflow --file statement.json    Cash flow and forecast
//!   fintel health --file statement.csv       Financial health score

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use fintel_core::AnalyzerKind;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact().with_writer(std::io::stderr))
        .init();

    let config = cli.config.as_deref();

    match &cli.command {
        Commands::Analyze(args) => commands::cmd_analyze(config, args, &AnalyzerKind::ALL),
        Commands::Recurring(args) => commands::cmd_analyze(config, args, &[AnalyzerKind::Recurring]),
        Commands::Cashflow(args) => commands::cmd_analyze(config, args, &[AnalyzerKind::CashFlow]),
        Commands::Health(args) => commands::cmd_analyze(config, args, &[AnalyzerKind::Health]),
        Commands::Merchants(args) => commands::cmd_analyze(config, args, &[AnalyzerKind::Merchants]),
        Commands::Tax(args) => commands::cmd_analyze(config, args, &[AnalyzerKind::Tax]),
    }
}
