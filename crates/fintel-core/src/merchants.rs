//! Merchant intelligence
//!
//! Per-merchant spend profiles with quarterly distribution and static
//! price-comparison and loyalty suggestions.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::config::MerchantConfig;
use crate::engine::AnalysisContext;
use crate::merchant::merchant_label;
use crate::models::{Insight, Metric, MetricValue, Severity, Transaction};
use crate::normalize::{months_spanned, safe_div};

/// Spend in one calendar quarter, summed across every observed year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuarterSpend {
    /// 1-4
    pub quarter: u32,
    pub spending: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceComparison {
    pub competitor: String,
    pub potential_savings: f64,
    pub savings_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoyaltyProgram {
    pub name: String,
    pub description: String,
    pub potential_savings: f64,
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MerchantProfile {
    pub name: String,
    pub total_spent: f64,
    pub transaction_count: usize,
    pub average_transaction: f64,
    pub frequency_per_month: f64,
    pub last_visited: NaiveDate,
    /// Most frequent category among the merchant's transactions
    pub category: String,
    pub seasonal_pattern: Vec<QuarterSpend>,
    pub price_comparisons: Vec<PriceComparison>,
    pub loyalty_programs: Vec<LoyaltyProgram>,
}

impl MerchantProfile {
    /// Highest quarter exceeds the configured multiple of the lowest
    pub fn is_seasonal(&self, ratio: f64) -> bool {
        let values = self.seasonal_pattern.iter().map(|q| q.spending);
        let max = values.clone().fold(f64::MIN, f64::max);
        let min = values.fold(f64::MAX, f64::min);
        !self.seasonal_pattern.is_empty() && max > min * ratio
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MerchantReport {
    pub metrics: Vec<Metric>,
    pub merchants: Vec<MerchantProfile>,
    pub insights: Vec<Insight>,
}

/// Quarter (1-4) of a date
fn quarter_of(date: NaiveDate) -> u32 {
    date.month0() / 3 + 1
}

fn seasonal_pattern(transactions: &[&Transaction]) -> Vec<QuarterSpend> {
    let mut quarters = [0.0; 4];
    for tx in transactions {
        quarters[(quarter_of(tx.date) - 1) as usize] += tx.magnitude();
    }
    quarters
        .iter()
        .enumerate()
        .map(|(i, &spending)| QuarterSpend {
            quarter: i as u32 + 1,
            spending,
        })
        .collect()
}

/// Most frequent category; ties go to the one seen first
fn dominant_category(transactions: &[&Transaction]) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for tx in transactions {
        let category = tx.category_or_default();
        match counts.iter_mut().find(|(c, _)| *c == category) {
            Some((_, n)) => *n += 1,
            None => counts.push((category, 1)),
        }
    }
    counts
        .iter()
        .fold(None, |best: Option<(&str, usize)>, &(c, n)| match best {
            Some((_, best_n)) if best_n >= n => best,
            _ => Some((c, n)),
        })
        .map(|(c, _)| c.to_string())
        .unwrap_or_else(|| "Uncategorized".to_string())
}

fn build_profile(name: &str, transactions: Vec<&Transaction>, config: &MerchantConfig) -> MerchantProfile {
    let total_spent: f64 = transactions.iter().map(|t| t.magnitude()).sum();
    let count = transactions.len();
    let average_transaction = safe_div(total_spent, count as f64);
    let months = months_spanned(transactions.iter().map(|t| &t.date));
    let last_visited = transactions
        .iter()
        .map(|t| t.date)
        .fold(NaiveDate::MIN, Ord::max);

    let price_comparisons = config
        .price_comparisons
        .lookup(name)
        .map(|offers| {
            offers
                .iter()
                .map(|o| PriceComparison {
                    competitor: o.competitor.clone(),
                    potential_savings: average_transaction * o.savings_rate,
                    savings_percentage: o.savings_rate * 100.0,
                })
                .collect()
        })
        .unwrap_or_default();

    let loyalty_programs = match config.loyalty_programs.lookup(name) {
        Some(programs) => programs
            .iter()
            .map(|p| LoyaltyProgram {
                name: p.name.clone(),
                description: p.description.clone(),
                potential_savings: total_spent * p.savings_rate,
                link: p.link.clone(),
            })
            .collect(),
        None if total_spent > config.generic_loyalty_threshold => vec![LoyaltyProgram {
            name: format!("{} Loyalty Program", name),
            description: "Check if this merchant offers a loyalty program".to_string(),
            potential_savings: total_spent * config.generic_loyalty_rate,
            link: None,
        }],
        None => Vec::new(),
    };

    MerchantProfile {
        name: name.to_string(),
        total_spent,
        transaction_count: count,
        average_transaction,
        frequency_per_month: safe_div(count as f64, months as f64),
        last_visited,
        category: dominant_category(&transactions),
        seasonal_pattern: seasonal_pattern(&transactions),
        price_comparisons,
        loyalty_programs,
    }
}

/// Build merchant profiles for the context's expense transactions
pub fn analyze_merchants(ctx: &AnalysisContext<'_>) -> MerchantReport {
    let config = &ctx.config.merchants;

    let mut groups: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
    for tx in ctx.transactions.iter().filter(|t| t.is_expense()) {
        groups.entry(merchant_label(&tx.description)).or_default().push(tx);
    }

    let mut merchants: Vec<MerchantProfile> = groups
        .into_iter()
        .filter(|(_, txs)| txs.len() >= config.min_transactions)
        .map(|(name, txs)| build_profile(name, txs, config))
        .collect();

    merchants.sort_by(|a, b| b.total_spent.total_cmp(&a.total_spent));

    debug!(merchants = merchants.len(), "Merchant analysis complete");

    MerchantReport {
        metrics: merchant_metrics(&merchants),
        insights: merchant_insights(&merchants, config),
        merchants,
    }
}

fn merchant_metrics(merchants: &[MerchantProfile]) -> Vec<Metric> {
    let total: f64 = merchants.iter().map(|m| m.total_spent).sum();
    let top = merchants.first();
    let top_share = top.map(|m| safe_div(m.total_spent, total) * 100.0).unwrap_or(0.0);

    vec![
        Metric::new(
            "Total Merchants",
            MetricValue::Count(merchants.len() as u64),
            "Unique merchants identified",
        ),
        Metric::new(
            "Total Spent",
            MetricValue::Amount(total),
            "Total amount spent across all merchants",
        ),
        Metric::new(
            "Top Merchant",
            MetricValue::Text(top.map(|m| m.name.clone()).unwrap_or_else(|| "N/A".to_string())),
            top.map(|m| format!("{:.2} ({:.1}%)", m.total_spent, top_share))
                .unwrap_or_default(),
        ),
        Metric::new(
            "Top Merchant Share",
            MetricValue::Percent(top_share),
            "Share of merchant spending at the top merchant",
        ),
        Metric::new(
            "Average Per Merchant",
            MetricValue::Amount(total / merchants.len().max(1) as f64),
            "Average spending per merchant",
        ),
    ]
}

fn merchant_insights(merchants: &[MerchantProfile], config: &MerchantConfig) -> Vec<Insight> {
    let mut insights = Vec::new();

    if !merchants.is_empty() {
        let total: f64 = merchants.iter().map(|m| m.total_spent).sum();
        let top3: f64 = merchants.iter().take(3).map(|m| m.total_spent).sum();
        let share = safe_div(top3, total) * 100.0;
        insights.push(
            Insight::new(
                if share > 50.0 {
                    Severity::Warning
                } else {
                    Severity::Info
                },
                "Top Spending Merchants",
                format!(
                    "Your top 3 merchants account for {:.1}% of your total spending.",
                    share
                ),
            )
            .with_actions([
                "Review your spending at these merchants for potential savings",
                "Look for loyalty programs or discounts at these merchants",
                "Consider if there are more cost-effective alternatives",
            ]),
        );
    }

    let with_comparisons = merchants
        .iter()
        .filter(|m| !m.price_comparisons.is_empty())
        .count();
    if with_comparisons > 0 {
        insights.push(
            Insight::new(
                Severity::Info,
                "Price Comparison Opportunities",
                format!(
                    "We found {} merchants where you might save money with alternatives.",
                    with_comparisons
                ),
            )
            .with_actions([
                "Compare features and benefits of alternative options",
                "Calculate potential annual savings from switching",
                "Consider if the convenience is worth the price difference",
            ]),
        );
    }

    let with_loyalty = merchants
        .iter()
        .filter(|m| !m.loyalty_programs.is_empty())
        .count();
    if with_loyalty > 0 {
        insights.push(
            Insight::new(
                Severity::Info,
                "Loyalty Program Opportunities",
                format!(
                    "You could benefit from loyalty programs at {} of your frequent merchants.",
                    with_loyalty
                ),
            )
            .with_actions([
                "Sign up for loyalty programs at your most-visited merchants",
                "Consolidate spending at fewer merchants to maximize rewards",
                "Check for credit cards that offer bonus rewards at your top merchants",
            ]),
        );
    }

    let seasonal = merchants
        .iter()
        .filter(|m| m.is_seasonal(config.seasonality_ratio))
        .count();
    if seasonal > 0 {
        insights.push(
            Insight::new(
                Severity::Info,
                "Seasonal Spending Patterns",
                format!(
                    "{} merchants show significant seasonal spending patterns.",
                    seasonal
                ),
            )
            .with_actions([
                "Budget for higher spending periods at these merchants",
                "Look for off-season discounts and promotions",
                "Plan major purchases during lower-price seasons",
            ]),
        );
    }

    insights
}
