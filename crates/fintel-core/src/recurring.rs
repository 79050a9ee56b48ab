//! Recurring expense detection
//!
//! Groups expense transactions by merchant key and rounded amount, then
//! classifies each group's billing frequency from the average gap between
//! charges. Groups are regenerated on every run; nothing is tracked between
//! runs.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::config::RecurringConfig;
use crate::engine::AnalysisContext;
use crate::merchant::{merchant_key, UNKNOWN_MERCHANT};
use crate::models::{Frequency, Insight, Metric, MetricValue, Severity, Transaction, YearMonth};
use crate::normalize::safe_div;

/// A cheaper substitute for a detected subscription
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlternativeSuggestion {
    pub name: String,
    pub price: f64,
    pub savings_amount: f64,
    /// Whole percent, rounded
    pub savings_percentage: f64,
    pub link: Option<String>,
}

/// A candidate subscription
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecurringExpense {
    pub merchant_name: String,
    /// Average charge in the group
    pub amount: f64,
    pub frequency: Frequency,
    pub average_gap_days: f64,
    pub last_charged: NaiveDate,
    pub next_expected_charge: NaiveDate,
    pub category: String,
    pub is_active: bool,
    /// Time since the last charge exceeds the configured multiple of the
    /// average gap. A reactivation hint, not proof of cancellation.
    pub is_forgotten: bool,
    pub alternatives: Vec<AlternativeSuggestion>,
    pub transaction_ids: Vec<String>,
}

/// Recurring spend attributed to one calendar month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecurringPaymentTrend {
    pub month: YearMonth,
    pub amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecurringReport {
    pub metrics: Vec<Metric>,
    pub expenses: Vec<RecurringExpense>,
    pub insights: Vec<Insight>,
    pub trends: Vec<RecurringPaymentTrend>,
}

/// Classify a billing frequency from the average gap in days.
///
/// Thresholds are inclusive upper bounds. An all-zero gap (same-day
/// duplicates) therefore classifies as weekly.
pub fn classify_frequency(average_gap_days: f64, config: &RecurringConfig) -> Frequency {
    if average_gap_days <= config.weekly_max_days {
        Frequency::Weekly
    } else if average_gap_days <= config.monthly_max_days {
        Frequency::Monthly
    } else if average_gap_days <= config.quarterly_max_days {
        Frequency::Quarterly
    } else {
        Frequency::Yearly
    }
}

/// Amount bucket used for grouping: `round(|amount| / width) * width`
fn amount_bucket(magnitude: f64, width: f64) -> i64 {
    ((magnitude / width).round() * width) as i64
}

/// Detect recurring expenses in the context's transactions
pub fn detect_recurring(ctx: &AnalysisContext<'_>) -> RecurringReport {
    let config = &ctx.config.recurring;

    let mut groups: BTreeMap<(String, i64), Vec<&Transaction>> = BTreeMap::new();
    for tx in ctx.transactions.iter().filter(|t| t.is_expense()) {
        let key = (
            merchant_key(&tx.description).to_string(),
            amount_bucket(tx.magnitude(), config.amount_bucket),
        );
        groups.entry(key).or_default().push(tx);
    }

    let mut expenses: Vec<RecurringExpense> = groups
        .into_iter()
        .filter(|(_, group)| group.len() >= config.min_transactions.max(2))
        .map(|((merchant, _), group)| build_candidate(merchant, group, config, ctx.today))
        .collect();

    expenses.sort_by(|a, b| b.amount.total_cmp(&a.amount));

    debug!(candidates = expenses.len(), "Recurring detection complete");

    let trends = recurring_trends(ctx.transactions, &expenses, config);
    let metrics = recurring_metrics(&expenses);
    let insights = recurring_insights(&expenses);

    RecurringReport {
        metrics,
        expenses,
        insights,
        trends,
    }
}

fn build_candidate(
    merchant: String,
    mut group: Vec<&Transaction>,
    config: &RecurringConfig,
    today: NaiveDate,
) -> RecurringExpense {
    group.sort_by_key(|t| t.date);

    let merchant_name = if merchant.is_empty() {
        UNKNOWN_MERCHANT.to_string()
    } else {
        merchant
    };

    let total: f64 = group.iter().map(|t| t.magnitude()).sum();
    let amount = safe_div(total, group.len() as f64);

    let gaps: Vec<f64> = group
        .windows(2)
        .map(|w| (w[1].date - w[0].date).num_days() as f64)
        .collect();
    let average_gap_days = safe_div(gaps.iter().sum(), gaps.len() as f64);

    let frequency = classify_frequency(average_gap_days, config);

    // Groups always hold at least two transactions
    let last = group[group.len() - 1];
    let last_charged = last.date;
    let next_expected_charge = frequency.advance(last_charged);

    let days_since_last = (today - last_charged).num_days() as f64;
    let is_forgotten = days_since_last > average_gap_days * config.forgotten_multiplier;

    let alternatives = config
        .substitutes
        .lookup(&merchant_name)
        .map(|subs| {
            subs.iter()
                .map(|s| AlternativeSuggestion {
                    name: s.name.clone(),
                    price: s.price,
                    savings_amount: amount - s.price,
                    savings_percentage: (safe_div(amount - s.price, amount) * 100.0).round(),
                    link: s.link.clone(),
                })
                .collect()
        })
        .unwrap_or_default();

    RecurringExpense {
        merchant_name,
        amount,
        frequency,
        average_gap_days,
        last_charged,
        next_expected_charge,
        category: last
            .category
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| "Subscription".to_string()),
        is_active: !is_forgotten,
        is_forgotten,
        alternatives,
        transaction_ids: group.iter().map(|t| t.id.clone()).collect(),
    }
}

/// Per-month spend on transactions that look like a detected candidate
fn recurring_trends(
    transactions: &[Transaction],
    expenses: &[RecurringExpense],
    config: &RecurringConfig,
) -> Vec<RecurringPaymentTrend> {
    let months: BTreeSet<YearMonth> = transactions
        .iter()
        .map(|t| YearMonth::from_date(t.date))
        .collect();

    months
        .into_iter()
        .map(|month| {
            let amount = transactions
                .iter()
                .filter(|t| t.is_expense() && YearMonth::from_date(t.date) == month)
                .filter(|t| {
                    let m = t.magnitude();
                    expenses.iter().any(|e| {
                        t.description.contains(&e.merchant_name)
                            && m >= e.amount * (1.0 - config.trend_tolerance)
                            && m <= e.amount * (1.0 + config.trend_tolerance)
                    })
                })
                .map(|t| t.magnitude())
                .sum();
            RecurringPaymentTrend { month, amount }
        })
        .collect()
}

fn recurring_metrics(expenses: &[RecurringExpense]) -> Vec<Metric> {
    let monthly: f64 = expenses
        .iter()
        .filter(|e| e.frequency == Frequency::Monthly)
        .map(|e| e.amount)
        .sum();
    let forgotten = expenses.iter().filter(|e| e.is_forgotten).count();

    vec![
        Metric::new(
            "Total Subscriptions",
            MetricValue::Count(expenses.len() as u64),
            "Recurring expenses detected",
        ),
        Metric::new(
            "Monthly Cost",
            MetricValue::Amount(monthly),
            "Total monthly subscription costs",
        ),
        Metric::new(
            "Forgotten Subscriptions",
            MetricValue::Count(forgotten as u64),
            "Potentially inactive subscriptions",
        ),
        Metric::new(
            "Annual Cost",
            MetricValue::Amount(monthly * 12.0),
            "Estimated annual subscription costs",
        ),
    ]
}

fn recurring_insights(expenses: &[RecurringExpense]) -> Vec<Insight> {
    let mut insights = Vec::new();

    if !expenses.is_empty() {
        let total: f64 = expenses.iter().map(|e| e.amount).sum();
        insights.push(
            Insight::new(
                Severity::Info,
                "Subscription Overview",
                format!(
                    "You have {} recurring expenses totaling approximately {:.2} per month.",
                    expenses.len(),
                    total
                ),
            )
            .with_actions([
                "Review your subscriptions regularly to ensure you're using all services",
                "Consider consolidating similar subscriptions to save money",
                "Set calendar reminders for annual subscription renewals to evaluate continued need",
            ]),
        );
    }

    let forgotten = expenses.iter().filter(|e| e.is_forgotten).count();
    if forgotten > 0 {
        insights.push(
            Insight::new(
                Severity::Warning,
                "Forgotten Subscriptions Detected",
                format!(
                    "We've identified {} subscriptions that may be forgotten or unused.",
                    forgotten
                ),
            )
            .with_actions([
                "Cancel any subscriptions you no longer use",
                "Contact providers to request refunds for unused services",
                "Set up subscription tracking to avoid future forgotten charges",
            ]),
        );
    }

    let with_alternatives = expenses.iter().filter(|e| !e.alternatives.is_empty()).count();
    if with_alternatives > 0 {
        insights.push(
            Insight::new(
                Severity::Info,
                "Potential Savings Opportunities",
                format!(
                    "We've identified {} subscriptions with potential cost-saving alternatives.",
                    with_alternatives
                ),
            )
            .with_actions([
                "Compare features between your current services and alternatives",
                "Consider rotating subscriptions instead of maintaining multiple similar services",
                "Look for bundle deals that may reduce overall costs",
            ]),
        );
    }

    insights
}
