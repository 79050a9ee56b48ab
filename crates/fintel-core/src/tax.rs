//! Tax categorization
//!
//! Classifies expenses into a fixed taxonomy by ordered keyword rules and
//! emits deduction candidates for the deductible categories. Confidence is a
//! heuristic, and receipts are never attached.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{TaxConfig, TaxRule};
use crate::engine::AnalysisContext;
use crate::models::{Insight, Metric, MetricValue, Severity, Transaction};
use crate::normalize::safe_div;

/// Fixed tax taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaxCategoryKind {
    Business,
    Medical,
    Education,
    Charity,
    Housing,
    Transportation,
    Personal,
    Entertainment,
    Shopping,
    Uncategorized,
}

impl TaxCategoryKind {
    /// Every category, in taxonomy order
    pub const ALL: [TaxCategoryKind; 10] = [
        Self::Business,
        Self::Medical,
        Self::Education,
        Self::Charity,
        Self::Housing,
        Self::Transportation,
        Self::Personal,
        Self::Entertainment,
        Self::Shopping,
        Self::Uncategorized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Business => "Business",
            Self::Medical => "Medical",
            Self::Education => "Education",
            Self::Charity => "Charity",
            Self::Housing => "Housing",
            Self::Transportation => "Transportation",
            Self::Personal => "Personal",
            Self::Entertainment => "Entertainment",
            Self::Shopping => "Shopping",
            Self::Uncategorized => "Uncategorized",
        }
    }

    pub fn is_deductible(&self) -> bool {
        matches!(
            self,
            Self::Business
                | Self::Medical
                | Self::Education
                | Self::Charity
                | Self::Housing
                | Self::Transportation
        )
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Business => "Expenses related to business operations",
            Self::Medical => "Healthcare and medical expenses",
            Self::Education => "Educational expenses and tuition",
            Self::Charity => "Charitable donations and contributions",
            Self::Housing => "Mortgage interest and property taxes",
            Self::Transportation => "Vehicle expenses for business use",
            Self::Personal => "Personal and non-deductible expenses",
            Self::Entertainment => "Entertainment and dining expenses",
            Self::Shopping => "Retail purchases and shopping",
            Self::Uncategorized => "Expenses that have not been categorized",
        }
    }
}

impl fmt::Display for TaxCategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaxCategoryKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown tax category: {}", s))
    }
}

/// Per-category totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxCategory {
    pub kind: TaxCategoryKind,
    pub description: String,
    pub is_deductible: bool,
    pub total_amount: f64,
    pub transaction_count: usize,
}

/// A potentially deductible expense
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxDeduction {
    pub id: String,
    pub transaction_id: String,
    pub date: NaiveDate,
    pub merchant: String,
    pub amount: f64,
    pub category: TaxCategoryKind,
    /// Heuristic confidence, 0-100
    pub confidence: u8,
    pub has_receipt: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaxReport {
    pub metrics: Vec<Metric>,
    pub categories: Vec<TaxCategory>,
    pub deductions: Vec<TaxDeduction>,
    pub insights: Vec<Insight>,
}

fn rule_matches(rule: &TaxRule, category: &str, description: &str) -> bool {
    rule.category_keywords.iter().any(|k| category.contains(k.as_str()))
        || rule
            .description_keywords
            .iter()
            .any(|k| description.contains(k.as_str()))
}

/// Classify one expense. The first matching rule wins.
pub fn classify(tx: &Transaction, config: &TaxConfig) -> TaxCategoryKind {
    let description = tx.description.to_lowercase();
    let category = tx.category.as_deref().unwrap_or("").to_lowercase();

    config
        .rules
        .iter()
        .find(|rule| rule_matches(rule, &category, &description))
        .map(|rule| rule.category)
        .unwrap_or(TaxCategoryKind::Uncategorized)
}

/// Heuristic deduction confidence, clamped to 0-100
pub fn confidence(tx: &Transaction, config: &TaxConfig) -> u8 {
    let description = tx.description.to_lowercase();
    let category = tx.category.as_deref().unwrap_or("").to_lowercase();

    let mut score = config.base_confidence;
    if description.contains("business") || category.contains("business") {
        score += config.business_bonus;
    }
    if description.chars().count() < config.short_description_len {
        score -= config.short_description_penalty;
    }
    if tx.magnitude() > config.large_amount_threshold {
        score -= config.large_amount_penalty;
    }

    score.clamp(0, 100) as u8
}

/// Categorize every expense in the context and collect deduction candidates
pub fn categorize(ctx: &AnalysisContext<'_>) -> TaxReport {
    let config = &ctx.config.tax;

    let mut categories: Vec<TaxCategory> = TaxCategoryKind::ALL
        .iter()
        .map(|&kind| TaxCategory {
            kind,
            description: kind.description().to_string(),
            is_deductible: kind.is_deductible(),
            total_amount: 0.0,
            transaction_count: 0,
        })
        .collect();

    let mut deductions = Vec::new();
    let mut total_expenses = 0.0;

    for (ordinal, tx) in ctx.transactions.iter().filter(|t| t.is_expense()).enumerate() {
        let kind = classify(tx, config);
        let amount = tx.magnitude();
        total_expenses += amount;

        if let Some(entry) = categories.iter_mut().find(|c| c.kind == kind) {
            entry.total_amount += amount;
            entry.transaction_count += 1;
        }

        if kind.is_deductible() {
            let transaction_id = if tx.id.is_empty() {
                format!("tx-{}", ordinal)
            } else {
                tx.id.clone()
            };
            deductions.push(TaxDeduction {
                id: format!("deduction-{}", transaction_id),
                transaction_id,
                date: tx.date,
                merchant: tx.description.clone(),
                amount,
                category: kind,
                confidence: confidence(tx, config),
                has_receipt: false,
            });
        }
    }

    // Stable sorts keep taxonomy order for ties
    categories.sort_by(|a, b| b.total_amount.total_cmp(&a.total_amount));
    deductions.sort_by(|a, b| b.amount.total_cmp(&a.amount));

    debug!(
        deductions = deductions.len(),
        total_expenses, "Tax categorization complete"
    );

    let total_deductible: f64 = deductions.iter().map(|d| d.amount).sum();
    let deductible_percentage = safe_div(total_deductible, total_expenses) * 100.0;
    let business_expenses: f64 = deductions
        .iter()
        .filter(|d| d.category == TaxCategoryKind::Business)
        .map(|d| d.amount)
        .sum();
    let active_deductible = categories
        .iter()
        .filter(|c| c.is_deductible && c.total_amount > 0.0)
        .count();

    let metrics = vec![
        Metric::new(
            "Potential Deductions",
            MetricValue::Amount(total_deductible),
            "Total potential tax deductions",
        ),
        Metric::new(
            "Deductible Percentage",
            MetricValue::Percent(deductible_percentage),
            "Percentage of expenses that may be deductible",
        ),
        Metric::new(
            "Business Expenses",
            MetricValue::Amount(business_expenses),
            "Total business-related expenses",
        ),
        Metric::new(
            "Deductible Categories",
            MetricValue::Count(active_deductible as u64),
            "Number of deductible expense categories",
        ),
    ];

    let insights = tax_insights(&categories, &deductions, total_deductible, total_expenses);

    TaxReport {
        metrics,
        categories,
        deductions,
        insights,
    }
}

fn tax_insights(
    categories: &[TaxCategory],
    deductions: &[TaxDeduction],
    total_deductible: f64,
    total_expenses: f64,
) -> Vec<Insight> {
    let mut insights = Vec::new();

    if total_expenses > 0.0 {
        let pct = safe_div(total_deductible, total_expenses) * 100.0;
        let severity = if pct < 10.0 {
            Severity::Warning
        } else {
            Severity::Info
        };
        insights.push(
            Insight::new(
                severity,
                "Tax Deduction Potential",
                format!(
                    "Approximately {:.1}% of your expenses may be tax deductible, totaling {:.2}.",
                    pct, total_deductible
                ),
            )
            .with_actions([
                "Review potential deductions for accuracy",
                "Collect and organize receipts for deductible expenses",
                "Consult with a tax professional for personalized advice",
            ]),
        );
    }

    let missing: Vec<&TaxDeduction> = deductions.iter().filter(|d| !d.has_receipt).collect();
    if !missing.is_empty() {
        let amount: f64 = missing.iter().map(|d| d.amount).sum();
        insights.push(
            Insight::new(
                Severity::Warning,
                "Missing Receipt Documentation",
                format!(
                    "{} potential deductions totaling {:.2} lack receipt documentation.",
                    missing.len(),
                    amount
                ),
            )
            .with_actions([
                "Collect and digitize receipts for all deductible expenses",
                "Use receipt scanning apps to organize tax documents",
                "Create a system for tracking receipts throughout the year",
            ]),
        );
    }

    if let Some(business) = categories
        .iter()
        .find(|c| c.kind == TaxCategoryKind::Business && c.total_amount > 0.0)
    {
        insights.push(
            Insight::new(
                Severity::Info,
                "Business Expense Management",
                format!(
                    "You have {:.2} in potential business expenses across {} transactions.",
                    business.total_amount, business.transaction_count
                ),
            )
            .with_actions([
                "Separate business and personal expenses more clearly",
                "Consider setting up a dedicated business account",
                "Track business mileage and travel expenses separately",
            ]),
        );
    }

    let deductible: Vec<&TaxCategory> = categories
        .iter()
        .filter(|c| c.is_deductible && c.total_amount > 0.0)
        .collect();
    if let Some(largest) = deductible.first() {
        insights.push(
            Insight::new(
                Severity::Info,
                "Tax Category Distribution",
                format!(
                    "Your expenses span {} potentially deductible categories, with the largest being {}.",
                    deductible.len(),
                    largest.kind
                ),
            )
            .with_actions([
                "Review categorization for accuracy",
                "Look for additional deductible expenses in underrepresented categories",
                "Consider tax planning strategies for next year",
            ]),
        );
    }

    insights
}
