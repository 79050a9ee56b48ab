//! Domain models for Fintel

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::normalize;

/// A bank transaction as supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Stable identifier (import hash, or whatever the caller supplies)
    #[serde(default)]
    pub id: String,
    pub date: NaiveDate,
    pub description: String,
    /// Signed amount. The sign is only a fallback; see [`Transaction::direction`].
    pub amount: f64,
    /// Statement-declared direction, authoritative when present
    #[serde(rename = "type", default)]
    pub tx_type: Option<TransactionType>,
    #[serde(default)]
    pub category: Option<String>,
}

impl Transaction {
    pub fn new(date: NaiveDate, description: impl Into<String>, amount: f64) -> Self {
        Self {
            id: String::new(),
            date,
            description: description.into(),
            amount,
            tx_type: None,
            category: None,
        }
    }

    pub fn with_type(mut self, tx_type: TransactionType) -> Self {
        self.tx_type = Some(tx_type);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Resolved income/expense direction
    pub fn direction(&self) -> Direction {
        normalize::direction(self.tx_type, self.amount)
    }

    pub fn is_expense(&self) -> bool {
        self.direction() == Direction::Expense
    }

    /// Unsigned magnitude (non-finite amounts count as zero)
    pub fn magnitude(&self) -> f64 {
        normalize::magnitude(self.amount)
    }

    /// Category label, or "Uncategorized"
    pub fn category_or_default(&self) -> &str {
        match self.category.as_deref() {
            Some(c) if !c.trim().is_empty() => c,
            _ => "Uncategorized",
        }
    }
}

/// Statement-declared transaction type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Credit,
    Debit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "credit" | "cr" | "income" => Ok(Self::Credit),
            "debit" | "dr" | "expense" => Ok(Self::Debit),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolved money direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Income,
    Expense,
}

/// Billing frequency of a recurring charge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        }
    }

    /// Date one billing period after `date`.
    ///
    /// Month-based periods use calendar arithmetic and clamp to the last day
    /// of shorter months (Jan 31 + 1 month = Feb 28/29).
    pub fn advance(&self, date: NaiveDate) -> NaiveDate {
        let next = match self {
            Self::Weekly => date.checked_add_days(chrono::Days::new(7)),
            Self::Monthly => date.checked_add_months(Months::new(1)),
            Self::Quarterly => date.checked_add_months(Months::new(3)),
            Self::Yearly => date.checked_add_months(Months::new(12)),
        };
        next.unwrap_or(date)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Calendar month key, rendered as `YYYY-MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The following month, rolling the year over after December
    pub fn succ(&self) -> Self {
        if self.month >= 12 {
            Self::new(self.year + 1, 1)
        } else {
            Self::new(self.year, self.month + 1)
        }
    }

    /// Inclusive number of months from `self` to `other` (at least 1)
    pub fn months_through(&self, other: &YearMonth) -> u32 {
        let diff = (other.year - self.year) * 12 + other.month as i32 - self.month as i32;
        (diff + 1).max(1) as u32
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (y, m) = s
            .split_once('-')
            .ok_or_else(|| format!("Invalid month key: {}", s))?;
        let year = y
            .parse::<i32>()
            .map_err(|_| format!("Invalid month key: {}", s))?;
        let month = m
            .parse::<u32>()
            .ok()
            .filter(|m| (1..=12).contains(m))
            .ok_or_else(|| format!("Invalid month key: {}", s))?;
        Ok(Self { year, month })
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Severity of an insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational - no action needed
    Info,
    /// Worth attention soon
    Warning,
    /// Requires immediate attention
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }

    /// Numeric priority for sorting (higher = more urgent)
    pub fn priority(&self) -> u8 {
        match self {
            Severity::Info => 1,
            Severity::Warning => 2,
            Severity::Critical => 3,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

/// Human-facing summary of an analyzer finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub title: String,
    pub description: String,
    pub action_items: Vec<String>,
    pub severity: Severity,
}

impl Insight {
    pub fn new(severity: Severity, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            action_items: Vec::new(),
            severity,
        }
    }

    /// Attach suggested actions
    pub fn with_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.action_items = actions.into_iter().map(Into::into).collect();
        self
    }
}

/// Raw metric value; currency and locale formatting belong to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MetricValue {
    Count(u64),
    Amount(f64),
    Percent(f64),
    Ratio(f64),
    Months(f64),
    Score(u32),
    Text(String),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Count(n) => write!(f, "{}", n),
            MetricValue::Amount(a) => write!(f, "{:.2}", a),
            MetricValue::Percent(p) => write!(f, "{:.1}%", p),
            MetricValue::Ratio(r) => write!(f, "{:.2}", r),
            MetricValue::Months(m) => write!(f, "{:.1} months", m),
            MetricValue::Score(s) => write!(f, "{}/100", s),
            MetricValue::Text(t) => write!(f, "{}", t),
        }
    }
}

/// A labelled headline number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub label: String,
    pub value: MetricValue,
    pub description: String,
}

impl Metric {
    pub fn new(label: impl Into<String>, value: MetricValue, description: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value,
            description: description.into(),
        }
    }
}
