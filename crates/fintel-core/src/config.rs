//! Analytics configuration
//!
//! Thresholds and static lookup tables for every analyzer. Defaults are
//! compiled in; scalar thresholds can be overridden from TOML.
//!
//! ## Configuration Resolution
//!
//! 1. Explicit path (e.g. `fintel --config my.toml`), if it exists
//! 2. Override in data dir (~/.local/share/fintel/config/analytics.toml)
//! 3. Embedded defaults (compiled into binary)

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::merchant::PatternTable;
use crate::tax::TaxCategoryKind;

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/analytics.toml");

/// Configuration for every analyzer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalyticsConfig {
    pub recurring: RecurringConfig,
    pub cash_flow: CashFlowConfig,
    pub health: HealthConfig,
    pub merchants: MerchantConfig,
    pub tax: TaxConfig,
}

/// A cheaper service offered in place of a detected subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Substitute {
    pub name: String,
    pub price: f64,
    pub link: Option<String>,
}

impl Substitute {
    fn new(name: &str, price: f64, link: &str) -> Self {
        Self {
            name: name.to_string(),
            price,
            link: Some(link.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecurringConfig {
    pub weekly_max_days: f64,
    pub monthly_max_days: f64,
    pub quarterly_max_days: f64,
    pub forgotten_multiplier: f64,
    pub amount_bucket: f64,
    pub min_transactions: usize,
    /// Relative amount tolerance when attributing monthly trend spend
    pub trend_tolerance: f64,
    pub substitutes: PatternTable<Substitute>,
}

impl Default for RecurringConfig {
    fn default() -> Self {
        Self {
            weekly_max_days: 10.0,
            monthly_max_days: 40.0,
            quarterly_max_days: 100.0,
            forgotten_multiplier: 2.0,
            amount_bucket: 10.0,
            min_transactions: 2,
            trend_tolerance: 0.1,
            substitutes: PatternTable::new()
                .with(
                    "netflix",
                    vec![
                        Substitute::new("Disney+", 7.99, "https://www.disneyplus.com"),
                        Substitute::new("Hulu", 5.99, "https://www.hulu.com"),
                    ],
                )
                .with(
                    "spotify",
                    vec![
                        Substitute::new("Apple Music", 9.99, "https://www.apple.com/apple-music/"),
                        Substitute::new("YouTube Music", 9.99, "https://music.youtube.com/"),
                    ],
                ),
        }
    }
}

/// Recommended share of total expenses for a spending category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBenchmark {
    pub category: String,
    pub percentage: f64,
    pub reason: String,
}

impl CategoryBenchmark {
    fn new(category: &str, percentage: f64, reason: &str) -> Self {
        Self {
            category: category.to_string(),
            percentage,
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashFlowConfig {
    pub forecast_months: u32,
    pub trailing_months: usize,
    pub jitter_min: f64,
    pub jitter_max: f64,
    pub gap_medium_threshold: f64,
    pub gap_high_threshold: f64,
    pub benchmarks: Vec<CategoryBenchmark>,
}

impl Default for CashFlowConfig {
    fn default() -> Self {
        Self {
            forecast_months: 3,
            trailing_months: 3,
            jitter_min: 0.9,
            jitter_max: 1.1,
            gap_medium_threshold: 50_000.0,
            gap_high_threshold: 100_000.0,
            benchmarks: vec![
                CategoryBenchmark::new(
                    "Housing",
                    30.0,
                    "Housing should typically be around 30% of expenses",
                ),
                CategoryBenchmark::new(
                    "Food & Dining",
                    15.0,
                    "Food expenses should be around 15% of your budget",
                ),
                CategoryBenchmark::new(
                    "Transportation",
                    10.0,
                    "Transportation costs should be around 10% of expenses",
                ),
                CategoryBenchmark::new(
                    "Entertainment",
                    5.0,
                    "Entertainment should be limited to around 5% of expenses",
                ),
                CategoryBenchmark::new(
                    "Shopping",
                    5.0,
                    "Discretionary shopping should be around 5% of expenses",
                ),
                CategoryBenchmark::new(
                    "Travel",
                    5.0,
                    "Travel expenses should be around 5% of your budget",
                ),
            ],
        }
    }
}

impl CashFlowConfig {
    pub fn benchmark_for(&self, category: &str) -> Option<&CategoryBenchmark> {
        self.benchmarks.iter().find(|b| b.category == category)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthConfig {
    /// Lowercase substrings marking a debt payment (category or description)
    pub debt_keywords: Vec<String>,
    pub history_points: u32,
    /// Half-width of the noise added to the illustrative history baseline
    pub history_noise: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            debt_keywords: vec!["loan".into(), "debt".into(), "payment".into()],
            history_points: 6,
            history_noise: 10.0,
        }
    }
}

/// Competitor price comparison, as a fraction of the average transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceOffer {
    pub competitor: String,
    pub savings_rate: f64,
}

/// Loyalty program, with savings as a fraction of total spend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoyaltyOffer {
    pub name: String,
    pub description: String,
    pub savings_rate: f64,
    pub link: Option<String>,
}

fn price(competitor: &str, savings_rate: f64) -> PriceOffer {
    PriceOffer {
        competitor: competitor.to_string(),
        savings_rate,
    }
}

fn loyalty(name: &str, description: &str, savings_rate: f64, link: &str) -> LoyaltyOffer {
    LoyaltyOffer {
        name: name.to_string(),
        description: description.to_string(),
        savings_rate,
        link: Some(link.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MerchantConfig {
    pub min_transactions: usize,
    pub generic_loyalty_threshold: f64,
    pub generic_loyalty_rate: f64,
    /// Max quarter over min quarter above which spend counts as seasonal
    pub seasonality_ratio: f64,
    pub price_comparisons: PatternTable<PriceOffer>,
    pub loyalty_programs: PatternTable<LoyaltyOffer>,
}

impl Default for MerchantConfig {
    fn default() -> Self {
        Self {
            min_transactions: 2,
            generic_loyalty_threshold: 10_000.0,
            generic_loyalty_rate: 0.05,
            seasonality_ratio: 2.0,
            price_comparisons: PatternTable::new()
                .with("netflix", vec![price("Disney+", 0.4), price("Amazon Prime", 0.5)])
                .with(
                    "uber",
                    vec![price("Bolt", 0.3), price("Public Transportation", 0.7)],
                )
                .with(
                    "starbucks",
                    vec![price("Local Coffee Shop", 0.25), price("Home Brewing", 0.8)],
                ),
            loyalty_programs: PatternTable::new()
                .with(
                    "amazon",
                    vec![loyalty(
                        "Amazon Prime",
                        "Free shipping, streaming, and more",
                        0.1,
                        "https://www.amazon.com/prime",
                    )],
                )
                .with(
                    "starbucks",
                    vec![loyalty(
                        "Starbucks Rewards",
                        "Earn stars for free drinks and food",
                        0.15,
                        "https://www.starbucks.com/rewards",
                    )],
                )
                .with(
                    "walmart",
                    vec![loyalty(
                        "Walmart+",
                        "Free delivery, fuel discounts, and more",
                        0.08,
                        "https://www.walmart.com/plus",
                    )],
                ),
        }
    }
}

/// Keyword rule assigning an expense to a tax category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxRule {
    pub category: TaxCategoryKind,
    /// Lowercase substrings matched against the transaction category
    pub category_keywords: Vec<String>,
    /// Lowercase substrings matched against the description
    pub description_keywords: Vec<String>,
}

impl TaxRule {
    fn new(category: TaxCategoryKind, category_keywords: &[&str], description_keywords: &[&str]) -> Self {
        Self {
            category,
            category_keywords: category_keywords.iter().map(|s| s.to_string()).collect(),
            description_keywords: description_keywords.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxConfig {
    /// Ordered rules; first match wins, no match is Uncategorized
    pub rules: Vec<TaxRule>,
    pub base_confidence: i32,
    pub business_bonus: i32,
    pub short_description_len: usize,
    pub short_description_penalty: i32,
    pub large_amount_threshold: f64,
    pub large_amount_penalty: i32,
}

impl Default for TaxConfig {
    fn default() -> Self {
        use TaxCategoryKind::*;
        Self {
            rules: vec![
                TaxRule::new(Business, &["business"], &["business", "office", "supplies"]),
                TaxRule::new(
                    Medical,
                    &["medical", "health"],
                    &["doctor", "hospital", "pharmacy"],
                ),
                TaxRule::new(
                    Education,
                    &["education"],
                    &["school", "tuition", "university", "college"],
                ),
                TaxRule::new(Charity, &["charity", "donation"], &["donate", "foundation"]),
                TaxRule::new(Housing, &["housing", "mortgage"], &["rent", "property tax"]),
                TaxRule::new(
                    Transportation,
                    &["transport", "travel"],
                    &["gas", "fuel", "auto"],
                ),
                TaxRule::new(
                    Entertainment,
                    &["entertainment", "dining"],
                    &["restaurant", "movie", "theater"],
                ),
                TaxRule::new(Shopping, &["shopping"], &["store", "market", "mall"]),
                TaxRule::new(Personal, &["personal"], &["personal"]),
            ],
            base_confidence: 70,
            business_bonus: 20,
            short_description_len: 5,
            short_description_penalty: 20,
            large_amount_threshold: 10_000.0,
            large_amount_penalty: 10,
        }
    }
}

impl AnalyticsConfig {
    /// Load configuration (override first, then embedded default)
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let explicit = override_path.filter(|p| p.exists());
        let fallback = default_config_path().filter(|p| p.exists());

        let content = match explicit.map(Path::to_path_buf).or(fallback) {
            Some(path) => {
                debug!(path = %path.display(), "Loading analytics config");
                fs::read_to_string(&path)
                    .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?
            }
            None => DEFAULT_CONFIG.to_string(),
        };

        parse_config(&content)
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("fintel").join("config").join("analytics.toml"))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    recurring: Option<RawRecurring>,
    cash_flow: Option<RawCashFlow>,
    health: Option<RawHealth>,
    merchants: Option<RawMerchants>,
    tax: Option<RawTax>,
}

#[derive(Debug, Deserialize)]
struct RawRecurring {
    weekly_max_days: Option<f64>,
    monthly_max_days: Option<f64>,
    quarterly_max_days: Option<f64>,
    forgotten_multiplier: Option<f64>,
    amount_bucket: Option<f64>,
    min_transactions: Option<usize>,
    trend_tolerance: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawCashFlow {
    forecast_months: Option<u32>,
    trailing_months: Option<usize>,
    jitter_min: Option<f64>,
    jitter_max: Option<f64>,
    gap_medium_threshold: Option<f64>,
    gap_high_threshold: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawHealth {
    debt_keywords: Option<Vec<String>>,
    history_points: Option<u32>,
    history_noise: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawMerchants {
    min_transactions: Option<usize>,
    generic_loyalty_threshold: Option<f64>,
    generic_loyalty_rate: Option<f64>,
    seasonality_ratio: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawTax {
    base_confidence: Option<i32>,
    business_bonus: Option<i32>,
    short_description_len: Option<usize>,
    short_description_penalty: Option<i32>,
    large_amount_threshold: Option<f64>,
    large_amount_penalty: Option<i32>,
}

/// Overwrite `target` when the raw value is present
fn apply<T>(target: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *target = v;
    }
}

/// Parse config from TOML content
fn parse_config(content: &str) -> Result<AnalyticsConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = AnalyticsConfig::default();

    if let Some(r) = raw.recurring {
        let c = &mut config.recurring;
        apply(&mut c.weekly_max_days, r.weekly_max_days);
        apply(&mut c.monthly_max_days, r.monthly_max_days);
        apply(&mut c.quarterly_max_days, r.quarterly_max_days);
        apply(&mut c.forgotten_multiplier, r.forgotten_multiplier);
        apply(&mut c.amount_bucket, r.amount_bucket);
        apply(&mut c.min_transactions, r.min_transactions);
        apply(&mut c.trend_tolerance, r.trend_tolerance);
    }

    if let Some(r) = raw.cash_flow {
        let c = &mut config.cash_flow;
        apply(&mut c.forecast_months, r.forecast_months);
        apply(&mut c.trailing_months, r.trailing_months);
        apply(&mut c.jitter_min, r.jitter_min);
        apply(&mut c.jitter_max, r.jitter_max);
        apply(&mut c.gap_medium_threshold, r.gap_medium_threshold);
        apply(&mut c.gap_high_threshold, r.gap_high_threshold);
    }

    if let Some(r) = raw.health {
        let c = &mut config.health;
        apply(
            &mut c.debt_keywords,
            r.debt_keywords
                .map(|kws| kws.into_iter().map(|k| k.to_lowercase()).collect()),
        );
        apply(&mut c.history_points, r.history_points);
        apply(&mut c.history_noise, r.history_noise);
    }

    if let Some(r) = raw.merchants {
        let c = &mut config.merchants;
        apply(&mut c.min_transactions, r.min_transactions);
        apply(&mut c.generic_loyalty_threshold, r.generic_loyalty_threshold);
        apply(&mut c.generic_loyalty_rate, r.generic_loyalty_rate);
        apply(&mut c.seasonality_ratio, r.seasonality_ratio);
    }

    if let Some(r) = raw.tax {
        let c = &mut config.tax;
        apply(&mut c.base_confidence, r.base_confidence);
        apply(&mut c.business_bonus, r.business_bonus);
        apply(&mut c.short_description_len, r.short_description_len);
        apply(&mut c.short_description_penalty, r.short_description_penalty);
        apply(&mut c.large_amount_threshold, r.large_amount_threshold);
        apply(&mut c.large_amount_penalty, r.large_amount_penalty);
    }

    validate(&config)?;
    Ok(config)
}

fn validate(config: &AnalyticsConfig) -> Result<()> {
    let r = &config.recurring;
    if !(r.weekly_max_days <= r.monthly_max_days && r.monthly_max_days <= r.quarterly_max_days) {
        return Err(Error::Config(
            "recurring frequency thresholds must be ascending".into(),
        ));
    }
    if r.amount_bucket <= 0.0 {
        return Err(Error::Config("recurring.amount_bucket must be positive".into()));
    }
    if r.trend_tolerance.is_nan() || r.trend_tolerance < 0.0 {
        return Err(Error::Config("recurring.trend_tolerance must not be negative".into()));
    }
    let c = &config.cash_flow;
    if c.jitter_min > c.jitter_max {
        return Err(Error::Config("cash_flow.jitter_min exceeds jitter_max".into()));
    }
    if c.gap_medium_threshold > c.gap_high_threshold {
        return Err(Error::Config(
            "cash_flow.gap_medium_threshold exceeds gap_high_threshold".into(),
        ));
    }
    Ok(())
}
