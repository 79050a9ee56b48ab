//! Test utilities for fintel-core
//!
//! Small transaction builders shared by unit tests, integration tests, and
//! the CLI's tests (via the `test-utils` feature).

use chrono::{Days, NaiveDate};

use crate::models::{Transaction, TransactionType};

/// Calendar date shorthand; panics on an invalid date
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

/// Untyped transaction; a negative amount makes it an expense
pub fn expense(date: NaiveDate, description: &str, amount: f64) -> Transaction {
    Transaction::new(date, description, amount).with_id(format!("{}-{}-{}", date, description, amount))
}

/// Credit-typed income transaction
pub fn income(date: NaiveDate, description: &str, amount: f64) -> Transaction {
    Transaction::new(date, description, amount.abs())
        .with_type(TransactionType::Credit)
        .with_id(format!("{}-{}-{}", date, description, amount))
}

/// `count` equal charges of `amount` every `step_days` days from `start`
pub fn series(
    description: &str,
    amount: f64,
    start: NaiveDate,
    step_days: u64,
    count: u64,
) -> Vec<Transaction> {
    (0..count)
        .map(|i| {
            let d = start + Days::new(i * step_days);
            expense(d, description, -amount.abs())
        })
        .collect()
}

/// Six months of balanced salary and spending with a monthly ₦5,000
/// SPOTIFY debit (positive amount, debit-typed) as a CSV statement.
/// Rent and groceries vary month to month so only SPOTIFY recurs.
pub fn spotify_statement_csv() -> String {
    let mut csv = String::from("date,description,amount,type,category\n");
    for month in 1..=6 {
        csv.push_str(&format!(
            "2024-{:02}-01,SALARY ACME LTD,300000,credit,Salary\n",
            month
        ));
        csv.push_str(&format!(
            "2024-{:02}-03,SPOTIFY P{:04},5000,debit,Entertainment\n",
            month, month
        ));
        csv.push_str(&format!(
            "2024-{:02}-10,LANDLORD RENT,-{},,Housing\n",
            month,
            90000 + month * 1000
        ));
        csv.push_str(&format!(
            "2024-{:02}-{:02},SHOPRITE LEKKI,-{}.00,debit,Food & Dining\n",
            month,
            12 + month,
            40000 + month * 3000
        ));
    }
    csv
}
