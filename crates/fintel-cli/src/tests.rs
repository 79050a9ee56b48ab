//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;
use std::path::PathBuf;

use chrono::NaiveDate;
use fintel_core::test_utils::spotify_statement_csv;
use fintel_core::AnalyzerKind;
use tempfile::NamedTempFile;

use crate::cli::RunArgs;
use crate::commands::{self, truncate};

fn statement_file(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// An empty override, so tests never pick up a config from the user's data dir
fn default_config() -> NamedTempFile {
    statement_file(".toml", "")
}

fn run_args(file: PathBuf) -> RunArgs {
    RunArgs {
        file,
        json: false,
        seed: Some(7),
        today: Some("2024-06-30".to_string()),
    }
}

// ========== Truncate Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("SPOTIFY", 10), "SPOTIFY");
    assert_eq!(truncate("LANDLORD RENT PAYMENT", 10), "LANDLOR...");
    assert_eq!(truncate("₦₦₦₦₦₦", 5), "₦₦...");
}

// ========== Today Parsing Tests ==========

#[test]
fn test_parse_today() {
    let today = commands::parse_today(Some("2024-06-30")).unwrap();
    assert_eq!(today, NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());

    assert!(commands::parse_today(Some("30/06/2024")).is_err());
    assert!(commands::parse_today(None).is_ok());
}

// ========== Analyze Command Tests ==========

#[test]
fn test_build_report_all_sections() {
    let config = default_config();
    let file = statement_file(".csv", &spotify_statement_csv());
    let args = run_args(file.path().to_path_buf());

    let report = commands::build_report(Some(config.path()), &args, &AnalyzerKind::ALL).unwrap();
    assert_eq!(report.transaction_count, 24);
    assert!(report.recurring.is_some());
    assert!(report.cash_flow.is_some());
    assert!(report.health.is_some());
    assert!(report.merchants.is_some());
    assert!(report.tax.is_some());

    let recurring = report.recurring.unwrap();
    assert_eq!(recurring.expenses.len(), 1);
    assert_eq!(recurring.expenses[0].merchant_name, "SPOTIFY");
}

#[test]
fn test_build_report_single_section() {
    let config = default_config();
    let file = statement_file(".csv", &spotify_statement_csv());
    let args = run_args(file.path().to_path_buf());

    let report = commands::build_report(Some(config.path()), &args, &[AnalyzerKind::Tax]).unwrap();
    assert!(report.tax.is_some());
    assert!(report.recurring.is_none());
    assert!(report.cash_flow.is_none());
}

#[test]
fn test_build_report_seed_is_reproducible() {
    let config = default_config();
    let file = statement_file(".csv", &spotify_statement_csv());
    let args = run_args(file.path().to_path_buf());
    let kinds = [AnalyzerKind::CashFlow, AnalyzerKind::Health];

    let first = commands::build_report(Some(config.path()), &args, &kinds).unwrap();
    let second = commands::build_report(Some(config.path()), &args, &kinds).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_build_report_json_statement() {
    let config = default_config();
    let json = r#"[
        {"date": "2024-05-01", "description": "SALARY", "amount": 100000, "type": "credit"},
        {"date": "2024-05-04", "description": "NETFLIX", "amount": -4400},
        {"date": "2024-06-04", "description": "NETFLIX", "amount": -4400}
    ]"#;
    let file = statement_file(".json", json);
    let args = run_args(file.path().to_path_buf());

    let report =
        commands::build_report(Some(config.path()), &args, &[AnalyzerKind::Recurring]).unwrap();
    assert_eq!(report.transaction_count, 3);
    let recurring = report.recurring.unwrap();
    assert_eq!(recurring.expenses.len(), 1);
    assert_eq!(recurring.expenses[0].merchant_name, "NETFLIX");
}

#[test]
fn test_build_report_missing_file() {
    let config = default_config();
    let args = run_args(PathBuf::from("/nonexistent/statement.csv"));
    let result = commands::build_report(Some(config.path()), &args, &AnalyzerKind::ALL);
    assert!(result.is_err());
}

#[test]
fn test_build_report_bad_today() {
    let config = default_config();
    let file = statement_file(".csv", &spotify_statement_csv());
    let mut args = run_args(file.path().to_path_buf());
    args.today = Some("June 30".to_string());

    let err = commands::build_report(Some(config.path()), &args, &AnalyzerKind::ALL).unwrap_err();
    assert!(err.to_string().contains("--today"));
}

#[test]
fn test_build_report_config_override() {
    let file = statement_file(".csv", &spotify_statement_csv());
    let args = run_args(file.path().to_path_buf());
    // Requiring seven charges hides the six-month SPOTIFY series
    let config = statement_file(".toml", "[recurring]\nmin_transactions = 7\n");

    let report =
        commands::build_report(Some(config.path()), &args, &[AnalyzerKind::Recurring]).unwrap();
    assert!(report.recurring.unwrap().expenses.is_empty());
}

#[test]
fn test_cmd_analyze_json_output() {
    let config = default_config();
    let file = statement_file(".csv", &spotify_statement_csv());
    let mut args = run_args(file.path().to_path_buf());
    args.json = true;

    let result = commands::cmd_analyze(Some(config.path()), &args, &[AnalyzerKind::Merchants]);
    assert!(result.is_ok());
}

// ========== Rendering Tests ==========

#[test]
fn test_render_report_sections() {
    let config = default_config();
    let file = statement_file(".csv", &spotify_statement_csv());
    let args = run_args(file.path().to_path_buf());
    let report = commands::build_report(Some(config.path()), &args, &AnalyzerKind::ALL).unwrap();

    let text = commands::render_report(&report);
    assert!(text.contains("Analyzed 24 transactions (as of 2024-06-30)"));
    assert!(text.contains("Recurring Expenses"));
    assert!(text.contains("SPOTIFY"));
    assert!(text.contains("(forecast)"));
    assert!(text.contains("Financial Health:"));
    assert!(text.contains("LANDLORD"));
    assert!(text.contains("Tax Categories"));
}

#[test]
fn test_render_empty_recurring() {
    let report = fintel_core::recurring::RecurringReport::default();
    let text = commands::render_recurring(&report);
    assert!(text.contains("No recurring expenses detected."));
}

#[test]
fn test_render_cash_flow_gap_severity() {
    use fintel_core::cashflow::{CashFlowGap, CashFlowReport, GapSeverity};
    use fintel_core::models::YearMonth;

    let report = CashFlowReport {
        gaps: vec![CashFlowGap {
            start_month: YearMonth::new(2024, 3),
            end_month: YearMonth::new(2024, 4),
            total_deficit: 1200.0,
            severity: GapSeverity::High,
            recommendation: "Cut discretionary spending".to_string(),
            ongoing: true,
        }],
        ..CashFlowReport::default()
    };

    let text = commands::render_cash_flow(&report);
    assert!(text.contains("high   2024-03 → 2024-04  deficit 1200.00 (ongoing)"));
    assert!(text.contains("Cut discretionary spending"));
}
