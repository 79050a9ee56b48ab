//! Transaction direction and value normalization
//!
//! Every analyzer resolves income vs. expense through [`direction`], so the
//! rule lives in exactly one place: a declared `type` is authoritative and the
//! sign of `amount` is only consulted when the type is unset.

use chrono::NaiveDate;

use crate::models::{Direction, Transaction, TransactionType, YearMonth};

/// Resolve the direction of a transaction.
///
/// `Debit` is always an expense and `Credit` always income, whatever the sign.
/// Without a type, `amount >= 0` is income and `amount < 0` is expense.
pub fn direction(tx_type: Option<TransactionType>, amount: f64) -> Direction {
    match tx_type {
        Some(TransactionType::Debit) => Direction::Expense,
        Some(TransactionType::Credit) => Direction::Income,
        None if amount < 0.0 => Direction::Expense,
        None => Direction::Income,
    }
}

/// Absolute value of an amount, treating non-finite values as zero
pub fn magnitude(amount: f64) -> f64 {
    if amount.is_finite() {
        amount.abs()
    } else {
        0.0
    }
}

/// Parse an amount string, handling currency symbols, commas, and `(x)`
/// negatives. `None` when the input is not a finite number.
pub fn try_parse_amount(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .replace(['$', '₦', '€', '£', ',', ' '], "")
        .replace('(', "-")
        .replace(')', "");

    cleaned.parse::<f64>().ok().filter(|a| a.is_finite())
}

/// Parse a transaction type label; anything unrecognized is unset
pub fn parse_transaction_type(s: &str) -> Option<TransactionType> {
    s.parse().ok()
}

/// Parse a statement date in any of the common formats
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    let formats = [
        "%Y-%m-%d", // 2024-01-15
        "%m/%d/%Y", // 01/15/2024
        "%m/%d/%y", // 01/15/24
        "%d/%m/%Y", // 15/01/2024 (European)
        "%m-%d-%Y", // 01-15-2024
    ];

    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Total income and total expenses (both unsigned)
pub fn income_and_expenses(transactions: &[Transaction]) -> (f64, f64) {
    transactions
        .iter()
        .fold((0.0, 0.0), |(income, expenses), tx| match tx.direction() {
            Direction::Income => (income + tx.magnitude(), expenses),
            Direction::Expense => (income, expenses + tx.magnitude()),
        })
}

/// Inclusive count of calendar months between the earliest and latest date.
/// Returns 1 for empty input.
pub fn months_spanned<'a, I>(dates: I) -> u32
where
    I: IntoIterator<Item = &'a NaiveDate>,
{
    let mut iter = dates.into_iter();
    let Some(first) = iter.next() else {
        return 1;
    };
    let (min, max) = iter.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
    YearMonth::from_date(*min).months_through(&YearMonth::from_date(*max))
}

/// `numerator / denominator`, or 0 when the denominator is zero or the
/// result is not finite
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let value = numerator / denominator;
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_overrides_sign() {
        assert_eq!(direction(Some(TransactionType::Debit), 250.0), Direction::Expense);
        assert_eq!(direction(Some(TransactionType::Debit), 0.0), Direction::Expense);
        assert_eq!(direction(Some(TransactionType::Credit), -40.0), Direction::Income);
    }

    #[test]
    fn test_sign_fallback_without_type() {
        assert_eq!(direction(None, -0.01), Direction::Expense);
        assert_eq!(direction(None, 0.0), Direction::Income);
        assert_eq!(direction(None, 12.0), Direction::Income);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(try_parse_amount("$1,234.56"), Some(1234.56));
        assert_eq!(try_parse_amount("₦5,000"), Some(5000.0));
        assert_eq!(try_parse_amount("-123.45"), Some(-123.45));
        assert_eq!(try_parse_amount("(100.00)"), Some(-100.0));
        assert_eq!(try_parse_amount("n/a"), None);
        assert_eq!(try_parse_amount("NaN"), None);
        assert_eq!(try_parse_amount(""), None);
        assert_eq!(try_parse_amount("12abc"), None);
    }

    #[test]
    fn test_parse_date() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15);
        assert_eq!(parse_date("2024-01-15"), expected);
        assert_eq!(parse_date("01/15/2024"), expected);
        assert_eq!(parse_date(" 15/01/2024 "), expected);
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn test_income_and_expenses_respects_type() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let txs = vec![
            Transaction::new(d, "SALARY", 1000.0),
            Transaction::new(d, "RENT", 300.0).with_type(TransactionType::Debit),
            Transaction::new(d, "REFUND", -50.0).with_type(TransactionType::Credit),
            Transaction::new(d, "SHOP", -20.0),
        ];
        let (income, expenses) = income_and_expenses(&txs);
        assert_eq!(income, 1050.0);
        assert_eq!(expenses, 320.0);
    }

    #[test]
    fn test_months_spanned() {
        let dates = [
            NaiveDate::from_ymd_opt(2024, 11, 30).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
        ];
        assert_eq!(months_spanned(dates.iter()), 3);
        assert_eq!(months_spanned(std::iter::empty::<&NaiveDate>()), 1);
    }

    #[test]
    fn test_safe_div() {
        assert_eq!(safe_div(10.0, 0.0), 0.0);
        assert_eq!(safe_div(10.0, 4.0), 2.5);
    }
}
