//! Fintel Core Library
//!
//! Heuristic analytics over a user's bank transactions:
//! - Direction normalization and merchant keys shared by every analyzer
//! - Recurring expense (subscription) detection
//! - Cash flow bucketing, forecasting, and gap detection
//! - Composite financial health score
//! - Merchant intelligence
//! - Tax deduction categorization
//!
//! Every analyzer is a pure, synchronous function of an [`AnalysisContext`].
//! Randomized paths take an injected `rand::Rng`.

pub mod cashflow;
pub mod config;
pub mod engine;
pub mod error;
pub mod health;
pub mod import;
pub mod merchant;
pub mod merchants;
pub mod models;
pub mod normalize;
pub mod recurring;
pub mod tax;

/// Transaction fixtures for tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{
    AnalyticsConfig, CashFlowConfig, HealthConfig, MerchantConfig, RecurringConfig, TaxConfig,
};
pub use engine::{AnalysisContext, AnalysisReport, AnalyticsEngine, AnalyzerKind};
pub use error::{Error, Result};
pub use import::{ImportResult, ImportStats, StatementFormat};
pub use models::{Direction, Insight, Metric, Severity, Transaction, TransactionType};
