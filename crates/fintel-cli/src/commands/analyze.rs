//! Statement loading and analyzer runs

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use fintel_core::{import, AnalysisReport, AnalyticsConfig, AnalyticsEngine, AnalyzerKind};

use crate::cli::RunArgs;

use super::render_report;

/// Parse `--today`, falling back to the local date
pub fn parse_today(today: Option<&str>) -> Result<NaiveDate> {
    match today {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .context("Invalid --today format (use YYYY-MM-DD)"),
        None => Ok(Local::now().date_naive()),
    }
}

/// Load config and statement, then run the selected analyzers
pub fn build_report(
    config_path: Option<&Path>,
    args: &RunArgs,
    kinds: &[AnalyzerKind],
) -> Result<AnalysisReport> {
    let config = AnalyticsConfig::load(config_path).context("Failed to load analytics config")?;
    let today = parse_today(args.today.as_deref())?;

    let imported = import::load_file(&args.file)
        .with_context(|| format!("Failed to import {}", args.file.display()))?;

    if imported.stats.skipped_rows > 0 {
        info!(
            skipped = imported.stats.skipped_rows,
            "Some statement rows were skipped"
        );
    }

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let engine = AnalyticsEngine::new(config);
    Ok(engine.analyze(&imported.transactions, today, kinds, &mut rng))
}

pub fn cmd_analyze(config_path: Option<&Path>, args: &RunArgs, kinds: &[AnalyzerKind]) -> Result<()> {
    let report = build_report(config_path, args, kinds)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_report(&report));
    }

    Ok(())
}
