//! Analytics engine - runs the analyzers over one transaction set
//!
//! Analyzers are independent: none reads another's output. The engine only
//! dispatches and collects.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::cashflow::{self, CashFlowReport};
use crate::config::AnalyticsConfig;
use crate::health::{self, HealthReport};
use crate::merchants::{self, MerchantReport};
use crate::models::{Insight, Transaction};
use crate::recurring::{self, RecurringReport};
use crate::tax::{self, TaxReport};

/// Inputs shared by every analyzer
pub struct AnalysisContext<'a> {
    pub transactions: &'a [Transaction],
    pub config: &'a AnalyticsConfig,
    /// Reference date for staleness and history dates
    pub today: NaiveDate,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(transactions: &'a [Transaction], config: &'a AnalyticsConfig, today: NaiveDate) -> Self {
        Self {
            transactions,
            config,
            today,
        }
    }
}

/// Analyzer identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerKind {
    Recurring,
    CashFlow,
    Health,
    Merchants,
    Tax,
}

impl AnalyzerKind {
    pub const ALL: [AnalyzerKind; 5] = [
        Self::Recurring,
        Self::CashFlow,
        Self::Health,
        Self::Merchants,
        Self::Tax,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recurring => "recurring",
            Self::CashFlow => "cash_flow",
            Self::Health => "health",
            Self::Merchants => "merchants",
            Self::Tax => "tax",
        }
    }
}

impl fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AnalyzerKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "recurring" => Ok(Self::Recurring),
            "cash_flow" | "cashflow" => Ok(Self::CashFlow),
            "health" => Ok(Self::Health),
            "merchants" => Ok(Self::Merchants),
            "tax" => Ok(Self::Tax),
            _ => Err(format!("Unknown analyzer: {}", s)),
        }
    }
}

/// Results of one run; sections are present for the analyzers that ran
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub today: Option<NaiveDate>,
    pub transaction_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring: Option<RecurringReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_flow: Option<CashFlowReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchants: Option<MerchantReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax: Option<TaxReport>,
}

impl AnalysisReport {
    fn insights_for(&self, kind: AnalyzerKind) -> &[Insight] {
        match kind {
            AnalyzerKind::Recurring => self.recurring.as_ref().map(|r| r.insights.as_slice()),
            AnalyzerKind::CashFlow => self.cash_flow.as_ref().map(|r| r.insights.as_slice()),
            AnalyzerKind::Health => self.health.as_ref().map(|r| r.insights.as_slice()),
            AnalyzerKind::Merchants => self.merchants.as_ref().map(|r| r.insights.as_slice()),
            AnalyzerKind::Tax => self.tax.as_ref().map(|r| r.insights.as_slice()),
        }
        .unwrap_or(&[])
    }

    /// Every insight, most severe first (analyzer order within a severity)
    pub fn all_insights(&self) -> Vec<(AnalyzerKind, &Insight)> {
        let mut all: Vec<(AnalyzerKind, &Insight)> = AnalyzerKind::ALL
            .iter()
            .flat_map(|&kind| self.insights_for(kind).iter().map(move |i| (kind, i)))
            .collect();
        all.sort_by(|a, b| b.1.severity.priority().cmp(&a.1.severity.priority()));
        all
    }
}

/// Runs analyzers with a fixed configuration
#[derive(Debug, Clone, Default)]
pub struct AnalyticsEngine {
    config: AnalyticsConfig,
}

impl AnalyticsEngine {
    pub fn new(config: AnalyticsConfig) -> Self {
        Self { config }
    }

    /// Run every analyzer
    pub fn analyze_all<R: Rng + ?Sized>(
        &self,
        transactions: &[Transaction],
        today: NaiveDate,
        rng: &mut R,
    ) -> AnalysisReport {
        self.analyze(transactions, today, &AnalyzerKind::ALL, rng)
    }

    /// Run the selected analyzers. Randomized analyzers draw from `rng` in
    /// `kinds` order.
    pub fn analyze<R: Rng + ?Sized>(
        &self,
        transactions: &[Transaction],
        today: NaiveDate,
        kinds: &[AnalyzerKind],
        rng: &mut R,
    ) -> AnalysisReport {
        let ctx = AnalysisContext::new(transactions, &self.config, today);
        let mut report = AnalysisReport {
            today: Some(today),
            transaction_count: transactions.len(),
            ..AnalysisReport::default()
        };

        for &kind in kinds {
            debug!(analyzer = kind.as_str(), "Running analyzer");
            match kind {
                AnalyzerKind::Recurring => {
                    report.recurring = Some(recurring::detect_recurring(&ctx));
                }
                AnalyzerKind::CashFlow => {
                    report.cash_flow = Some(cashflow::analyze_cash_flow(&ctx, rng));
                }
                AnalyzerKind::Health => {
                    report.health = Some(health::analyze_health(&ctx, rng));
                }
                AnalyzerKind::Merchants => {
                    report.merchants = Some(merchants::analyze_merchants(&ctx));
                }
                AnalyzerKind::Tax => {
                    report.tax = Some(tax::categorize(&ctx));
                }
            }
            debug!(
                analyzer = kind.as_str(),
                insights = report.insights_for(kind).len(),
                "Analyzer complete"
            );
        }

        info!(
            transactions = transactions.len(),
            analyzers = kinds.len(),
            "Analysis complete"
        );
        report
    }
}
