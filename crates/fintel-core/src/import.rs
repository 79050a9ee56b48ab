//! Statement import (CSV and JSON)
//!
//! CSV files are header-driven: `date`, `description` and `amount` are
//! required, `type` and `category` optional, anything else is ignored.
//! Rows with an unparseable date are skipped; unparseable amounts become 0.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::Transaction;
use crate::normalize::{parse_date, parse_transaction_type, try_parse_amount};

/// Input file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementFormat {
    Csv,
    Json,
}

impl StatementFormat {
    /// `.json` files are JSON; everything else is read as CSV
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Csv,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

/// Row-level import counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub rows: usize,
    pub imported: usize,
    /// Rows dropped for an unparseable date
    pub skipped_rows: usize,
    /// Rows whose amount could not be parsed and was set to 0
    pub defaulted_amounts: usize,
}

/// Parsed transactions plus counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportResult {
    pub transactions: Vec<Transaction>,
    pub stats: ImportStats,
}

/// Stable id over the row's content and position
fn generate_id(date: &NaiveDate, description: &str, amount: f64, ordinal: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(date.to_string().as_bytes());
    hasher.update(description.as_bytes());
    hasher.update(amount.to_be_bytes());
    hasher.update((ordinal as u64).to_be_bytes());
    hex::encode(hasher.finalize())
}

/// Column positions resolved from the header row
struct Columns {
    date: usize,
    description: usize,
    amount: usize,
    tx_type: Option<usize>,
    category: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };
        let required = |names: &[&str]| {
            find(names).ok_or_else(|| Error::Import(format!("Missing column: {}", names[0])))
        };

        Ok(Self {
            date: required(&["date", "transaction date"])?,
            description: required(&["description", "narration", "details"])?,
            amount: required(&["amount"])?,
            tx_type: find(&["type", "transaction type"]),
            category: find(&["category"]),
        })
    }
}

/// Builds transactions row by row, keeping the counters
#[derive(Default)]
struct Importer {
    result: ImportResult,
}

impl Importer {
    fn push(
        &mut self,
        id: Option<String>,
        date: Option<&str>,
        description: &str,
        amount: Option<f64>,
        tx_type: Option<&str>,
        category: Option<&str>,
    ) {
        let ordinal = self.result.stats.rows;
        self.result.stats.rows += 1;

        let Some(date) = date.and_then(parse_date) else {
            warn!(row = ordinal + 1, date = ?date, "Skipping row with unparseable date");
            self.result.stats.skipped_rows += 1;
            return;
        };

        let amount = amount.unwrap_or_else(|| {
            debug!(row = ordinal + 1, "Unparseable amount, using 0");
            self.result.stats.defaulted_amounts += 1;
            0.0
        });

        let description = description.trim().to_string();
        let id = id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| generate_id(&date, &description, amount, ordinal));

        let mut tx = Transaction::new(date, description, amount).with_id(id);
        tx.tx_type = tx_type.and_then(parse_transaction_type);
        tx.category = category
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        self.result.transactions.push(tx);
        self.result.stats.imported += 1;
    }

    fn skip(&mut self, reason: &str) {
        self.result.stats.rows += 1;
        self.result.stats.skipped_rows += 1;
        warn!(row = self.result.stats.rows, reason, "Skipping row");
    }

    fn finish(self, format: StatementFormat) -> ImportResult {
        let stats = &self.result.stats;
        info!(
            format = format.as_str(),
            imported = stats.imported,
            skipped = stats.skipped_rows,
            defaulted_amounts = stats.defaulted_amounts,
            "Statement parsed"
        );
        self.result
    }
}

/// Parse a header-driven CSV statement
pub fn parse_csv<R: Read>(reader: R) -> Result<ImportResult> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let columns = Columns::from_headers(rdr.headers()?)?;
    let mut importer = Importer::default();

    for result in rdr.records() {
        let record = result?;
        // Blank trailing lines come through as a single empty field
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        importer.push(
            None,
            record.get(columns.date),
            record.get(columns.description).unwrap_or(""),
            record.get(columns.amount).and_then(try_parse_amount),
            columns.tx_type.and_then(|i| record.get(i)),
            columns.category.and_then(|i| record.get(i)),
        );
    }

    Ok(importer.finish(StatementFormat::Csv))
}

/// One JSON transaction object. Fields are read leniently so a single odd
/// value never rejects the whole statement.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JsonRow {
    id: Value,
    date: Value,
    description: Value,
    amount: Value,
    #[serde(rename = "type")]
    tx_type: Value,
    category: Value,
}

fn json_amount(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|a| a.is_finite()),
        Value::String(s) => try_parse_amount(s),
        _ => None,
    }
}

/// String values as-is, numbers in their JSON form; anything else is unset
fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a JSON array of transaction objects
pub fn parse_json<R: Read>(reader: R) -> Result<ImportResult> {
    let rows: Vec<Value> = serde_json::from_reader(reader)?;
    let mut importer = Importer::default();

    for value in rows {
        let Ok(row) = serde_json::from_value::<JsonRow>(value) else {
            importer.skip("not a transaction object");
            continue;
        };

        let description = json_text(&row.description).unwrap_or_default();
        importer.push(
            json_text(&row.id),
            row.date.as_str(),
            &description,
            json_amount(&row.amount),
            row.tx_type.as_str(),
            row.category.as_str(),
        );
    }

    Ok(importer.finish(StatementFormat::Json))
}

/// Load a statement file, choosing the parser from its extension
pub fn load_file(path: &Path) -> Result<ImportResult> {
    let format = StatementFormat::from_path(path);
    debug!(path = %path.display(), format = format.as_str(), "Loading statement");

    let reader = BufReader::new(File::open(path)?);
    match format {
        StatementFormat::Csv => parse_csv(reader),
        StatementFormat::Json => parse_json(reader),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionType;

    #[test]
    fn test_parse_csv_basic() {
        let csv = "Date,Description,Amount,Type,Category
2024-01-15,NETFLIX.COM,-4500,,Entertainment
01/20/2024,SALARY ACME,\"250,000.00\",credit,
2024-01-21,DSTV,9000,DR,Bills
";
        let result = parse_csv(csv.as_bytes()).unwrap();
        let txs = &result.transactions;

        assert_eq!(txs.len(), 3);
        assert_eq!(txs[0].amount, -4500.0);
        assert_eq!(txs[0].category.as_deref(), Some("Entertainment"));
        assert_eq!(txs[0].tx_type, None);
        assert_eq!(txs[1].amount, 250_000.0);
        assert_eq!(txs[1].tx_type, Some(TransactionType::Credit));
        assert_eq!(txs[1].category, None);
        assert_eq!(txs[2].tx_type, Some(TransactionType::Debit));
        assert!(txs[2].is_expense());
        assert_eq!(txs[0].id.len(), 64);
    }

    #[test]
    fn test_csv_skips_bad_dates_and_defaults_amounts() {
        let csv = "date,description,amount
not-a-date,BROKEN,10
2024-02-01,MYSTERY,abc
2024-02-02,OK,5
";
        let result = parse_csv(csv.as_bytes()).unwrap();

        assert_eq!(result.stats.rows, 3);
        assert_eq!(result.stats.imported, 2);
        assert_eq!(result.stats.skipped_rows, 1);
        assert_eq!(result.stats.defaulted_amounts, 1);
        assert_eq!(result.transactions[0].amount, 0.0);
    }

    #[test]
    fn test_csv_missing_column() {
        let csv = "date,memo\n2024-01-01,x\n";
        let err = parse_csv(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Import(_)));
    }

    #[test]
    fn test_csv_extra_columns_and_header_case() {
        let csv = " DATE ,Reference,DESCRIPTION,AMOUNT,Balance
2024-03-01,REF1,SPOTIFY P1,-5000,10000
";
        let result = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(result.transactions[0].description, "SPOTIFY P1");
        assert_eq!(result.transactions[0].amount, -5000.0);
    }

    #[test]
    fn test_identical_rows_get_distinct_ids() {
        let csv = "date,description,amount
2024-01-01,COFFEE,-3
2024-01-01,COFFEE,-3
";
        let result = parse_csv(csv.as_bytes()).unwrap();
        assert_ne!(result.transactions[0].id, result.transactions[1].id);

        // Same input, same ids
        let again = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(result.transactions, again.transactions);
    }

    #[test]
    fn test_parse_json() {
        let json = r#"[
            {"id": "t1", "date": "2024-03-01", "description": "SPOTIFY", "amount": 5000, "type": "debit"},
            {"date": "03/02/2024", "description": "GIFT", "amount": "₦1,200", "category": "Gifts"},
            {"date": "garbage", "description": "BAD", "amount": 1},
            {"date": "2024-03-04", "description": "NULL AMOUNT", "amount": null}
        ]"#;
        let result = parse_json(json.as_bytes()).unwrap();

        assert_eq!(result.stats.imported, 3);
        assert_eq!(result.stats.skipped_rows, 1);
        assert_eq!(result.stats.defaulted_amounts, 1);
        assert_eq!(result.transactions[0].id, "t1");
        assert!(result.transactions[0].is_expense());
        assert_eq!(result.transactions[1].amount, 1200.0);
        assert_eq!(result.transactions[1].category.as_deref(), Some("Gifts"));
        assert!(!result.transactions[1].id.is_empty());
    }

    #[test]
    fn test_parse_json_tolerates_non_string_fields() {
        let json = r#"[
            {"id": 101, "date": "2024-03-01", "description": "SPOTIFY", "amount": -5000},
            {"id": 102, "date": 20240302, "description": "NETFLIX", "amount": -4500},
            {"date": "2024-03-03", "description": 7, "amount": "-10", "type": 1, "category": false},
            42
        ]"#;
        let result = parse_json(json.as_bytes()).unwrap();

        assert_eq!(result.stats.rows, 4);
        assert_eq!(result.stats.imported, 2);
        assert_eq!(result.stats.skipped_rows, 2);
        assert_eq!(result.transactions[0].id, "101");
        assert_eq!(result.transactions[1].description, "7");
        assert_eq!(result.transactions[1].tx_type, None);
        assert_eq!(result.transactions[1].category, None);
        assert!(result.transactions[1].is_expense());
    }

    #[test]
    fn test_parse_json_not_an_array() {
        let err = parse_json(r#"{"date": "2024-01-01"}"#.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(StatementFormat::from_path(Path::new("a.JSON")), StatementFormat::Json);
        assert_eq!(StatementFormat::from_path(Path::new("a.csv")), StatementFormat::Csv);
        assert_eq!(StatementFormat::from_path(Path::new("statement")), StatementFormat::Csv);
    }

    #[test]
    fn test_load_file_missing() {
        let err = load_file(Path::new("/nonexistent/statement.csv")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
