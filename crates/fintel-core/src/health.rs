//! Financial health scoring
//!
//! Composite 0-100 score from three tiered sub-scores: savings rate (40),
//! debt-to-income (30) and emergency-fund coverage (30).
//!
//! The trailing score history is synthetic. It interpolates from a noisy
//! baseline toward the current score and is not derived from stored results.

use std::collections::BTreeMap;

use chrono::{Months, NaiveDate};
use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::config::HealthConfig;
use crate::engine::AnalysisContext;
use crate::models::{Insight, Metric, MetricValue, Severity, Transaction};
use crate::normalize::{income_and_expenses, months_spanned, safe_div};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationCategory {
    Savings,
    Debt,
    Spending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Medium,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialRecommendation {
    pub category: RecommendationCategory,
    pub description: String,
    pub impact: u32,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProgress {
    pub name: String,
    pub target_amount: f64,
    pub current_amount: f64,
    pub progress_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalScore {
    pub date: NaiveDate,
    pub score: u32,
    /// Always true: points are illustrative, not measured
    pub synthetic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialHealthScore {
    pub overall_score: u32,
    pub label: String,
    pub savings_rate: f64,
    pub debt_to_income: f64,
    pub emergency_fund_months: f64,
    pub goal_progress: Vec<GoalProgress>,
    pub recommendations: Vec<FinancialRecommendation>,
    pub historical_scores: Vec<HistoricalScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub metrics: Vec<Metric>,
    pub score: FinancialHealthScore,
    pub insights: Vec<Insight>,
}

/// Tiered composite score
pub fn composite_score(savings_rate: f64, debt_to_income: f64, emergency_fund_months: f64) -> u32 {
    let savings = if savings_rate >= 20.0 {
        40
    } else if savings_rate >= 15.0 {
        35
    } else if savings_rate >= 10.0 {
        30
    } else if savings_rate >= 5.0 {
        20
    } else if savings_rate > 0.0 {
        10
    } else {
        0
    };

    let debt = if debt_to_income <= 0.1 {
        30
    } else if debt_to_income <= 0.2 {
        25
    } else if debt_to_income <= 0.3 {
        20
    } else if debt_to_income <= 0.4 {
        10
    } else if debt_to_income <= 0.5 {
        5
    } else {
        0
    };

    let emergency = if emergency_fund_months >= 6.0 {
        30
    } else if emergency_fund_months >= 3.0 {
        20
    } else if emergency_fund_months >= 1.0 {
        10
    } else if emergency_fund_months > 0.0 {
        5
    } else {
        0
    };

    savings + debt + emergency
}

pub fn score_label(score: u32) -> &'static str {
    match score {
        s if s >= 90 => "Excellent",
        80..=89 => "Very Good",
        70..=79 => "Good",
        60..=69 => "Fair",
        50..=59 => "Needs Improvement",
        _ => "Poor",
    }
}

fn is_debt_payment(tx: &Transaction, keywords: &[String]) -> bool {
    let description = tx.description.to_lowercase();
    let category = tx.category.as_deref().unwrap_or("").to_lowercase();
    keywords
        .iter()
        .any(|k| category.contains(k.as_str()) || description.contains(k.as_str()))
}

/// Expense category with the largest total; ties keep the first name
fn top_expense_category(transactions: &[Transaction]) -> Option<(&str, f64)> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for tx in transactions.iter().filter(|t| t.is_expense()) {
        *totals.entry(tx.category_or_default()).or_default() += tx.magnitude();
    }
    totals.into_iter().fold(None, |best, (name, total)| match best {
        Some((_, best_total)) if best_total >= total => best,
        _ => Some((name, total)),
    })
}

/// Illustrative trailing history ending at the current score
pub fn synthetic_history<R: Rng + ?Sized>(
    score: u32,
    today: NaiveDate,
    config: &HealthConfig,
    rng: &mut R,
) -> Vec<HistoricalScore> {
    let points = config.history_points;
    let last = points.saturating_sub(1);
    let current = score as f64;

    (0..points)
        .rev()
        .map(|i| {
            let noise = -config.history_noise + rng.gen::<f64>() * 2.0 * config.history_noise;
            let base = (current + noise).clamp(0.0, 100.0);
            let t = if last == 0 {
                1.0
            } else {
                (last - i) as f64 / last as f64
            };
            HistoricalScore {
                date: today.checked_sub_months(Months::new(i)).unwrap_or(today),
                score: (base * (1.0 - t) + current * t).round() as u32,
                synthetic: true,
            }
        })
        .collect()
}

/// Score the financial health of the context's transactions
pub fn analyze_health<R: Rng + ?Sized>(ctx: &AnalysisContext<'_>, rng: &mut R) -> HealthReport {
    let config = &ctx.config.health;
    let transactions = ctx.transactions;

    if transactions.is_empty() {
        return empty_report();
    }

    let (income, expenses) = income_and_expenses(transactions);
    let savings_rate = safe_div(income - expenses, income) * 100.0;

    let debt_payments: f64 = transactions
        .iter()
        .filter(|t| t.is_expense() && is_debt_payment(t, &config.debt_keywords))
        .map(|t| t.magnitude())
        .sum();
    let debt_to_income = safe_div(debt_payments, income);

    let months = months_spanned(transactions.iter().map(|t| &t.date));
    let monthly_expenses = safe_div(expenses, months as f64);
    let savings = (income - expenses).max(0.0);
    let emergency_fund_months = safe_div(savings, monthly_expenses);

    let overall_score = composite_score(savings_rate, debt_to_income, emergency_fund_months);

    let emergency_target = monthly_expenses * 6.0;
    let goal_progress = vec![
        GoalProgress {
            name: "Emergency Fund".to_string(),
            target_amount: emergency_target,
            current_amount: savings,
            progress_percentage: (safe_div(savings, emergency_target) * 100.0).min(100.0),
        },
        GoalProgress {
            name: "Debt Repayment".to_string(),
            target_amount: debt_payments * 12.0,
            current_amount: debt_payments,
            // One month of twelve
            progress_percentage: 100.0 / 12.0,
        },
    ];

    let mut recommendations = Vec::new();
    if savings_rate < 20.0 {
        recommendations.push(FinancialRecommendation {
            category: RecommendationCategory::Savings,
            description: "Increase your savings rate to at least 20% of income".to_string(),
            impact: 10,
            difficulty: if savings_rate < 10.0 {
                Difficulty::Hard
            } else {
                Difficulty::Medium
            },
        });
    }
    if debt_to_income > 0.3 {
        recommendations.push(FinancialRecommendation {
            category: RecommendationCategory::Debt,
            description: "Reduce your debt-to-income ratio by paying down high-interest debt"
                .to_string(),
            impact: 15,
            difficulty: Difficulty::Medium,
        });
    }
    if emergency_fund_months < 3.0 {
        recommendations.push(FinancialRecommendation {
            category: RecommendationCategory::Savings,
            description: "Build an emergency fund covering at least 3 months of expenses"
                .to_string(),
            impact: 20,
            difficulty: if emergency_fund_months < 1.0 {
                Difficulty::Hard
            } else {
                Difficulty::Medium
            },
        });
    }
    if let Some((category, _)) = top_expense_category(transactions) {
        recommendations.push(FinancialRecommendation {
            category: RecommendationCategory::Spending,
            description: format!(
                "Reduce spending in your highest expense category: {}",
                category
            ),
            impact: 5,
            difficulty: Difficulty::Medium,
        });
    }

    let historical_scores = synthetic_history(overall_score, ctx.today, config, rng);

    debug!(
        overall_score,
        savings_rate, debt_to_income, emergency_fund_months, "Health scoring complete"
    );

    let score = FinancialHealthScore {
        overall_score,
        label: score_label(overall_score).to_string(),
        savings_rate,
        debt_to_income,
        emergency_fund_months,
        goal_progress,
        recommendations,
        historical_scores,
    };

    HealthReport {
        metrics: health_metrics(&score),
        insights: health_insights(&score),
        score,
    }
}

fn empty_report() -> HealthReport {
    let score = FinancialHealthScore {
        overall_score: 0,
        label: score_label(0).to_string(),
        savings_rate: 0.0,
        debt_to_income: 0.0,
        emergency_fund_months: 0.0,
        goal_progress: Vec::new(),
        recommendations: Vec::new(),
        historical_scores: Vec::new(),
    };
    HealthReport {
        metrics: health_metrics(&score),
        insights: Vec::new(),
        score,
    }
}

fn health_metrics(score: &FinancialHealthScore) -> Vec<Metric> {
    vec![
        Metric::new(
            "Overall Health Score",
            MetricValue::Score(score.overall_score),
            score.label.clone(),
        ),
        Metric::new(
            "Savings Rate",
            MetricValue::Percent(score.savings_rate),
            "Percentage of income saved",
        ),
        Metric::new(
            "Debt-to-Income",
            MetricValue::Percent(score.debt_to_income * 100.0),
            "Ratio of debt payments to income",
        ),
        Metric::new(
            "Emergency Fund",
            MetricValue::Months(score.emergency_fund_months),
            "Months of expenses covered by savings",
        ),
    ]
}

fn health_insights(score: &FinancialHealthScore) -> Vec<Insight> {
    let mut insights = Vec::new();

    let severity = if score.overall_score < 50 {
        Severity::Critical
    } else if score.overall_score < 70 {
        Severity::Warning
    } else {
        Severity::Info
    };
    insights.push(
        Insight::new(
            severity,
            "Financial Health Overview",
            format!(
                "Your overall financial health score is {}/100, which is {}.",
                score.overall_score, score.label
            ),
        )
        .with_actions([
            "Review the recommendations to improve your score",
            "Focus on the highest impact areas first",
            "Track your progress over time",
        ]),
    );

    if score.savings_rate < 10.0 {
        insights.push(
            Insight::new(
                if score.savings_rate < 5.0 {
                    Severity::Critical
                } else {
                    Severity::Warning
                },
                "Low Savings Rate",
                format!(
                    "Your savings rate of {:.1}% is below the recommended minimum of 10%.",
                    score.savings_rate
                ),
            )
            .with_actions([
                "Identify non-essential expenses that can be reduced",
                "Set up automatic transfers to savings accounts",
                "Look for ways to increase your income",
            ]),
        );
    } else if score.savings_rate >= 20.0 {
        insights.push(
            Insight::new(
                Severity::Info,
                "Strong Savings Rate",
                format!(
                    "Your savings rate of {:.1}% is excellent and exceeds the recommended 20%.",
                    score.savings_rate
                ),
            )
            .with_actions([
                "Consider investing some of your savings for long-term growth",
                "Review your investment allocation to ensure it aligns with your goals",
                "Maintain your current savings habits",
            ]),
        );
    }

    if score.debt_to_income > 0.3 {
        insights.push(
            Insight::new(
                if score.debt_to_income > 0.4 {
                    Severity::Critical
                } else {
                    Severity::Warning
                },
                "High Debt-to-Income Ratio",
                format!(
                    "Your debt-to-income ratio of {:.1}% exceeds the recommended maximum of 30%.",
                    score.debt_to_income * 100.0
                ),
            )
            .with_actions([
                "Focus on paying down high-interest debt first",
                "Consider debt consolidation to lower interest rates",
                "Avoid taking on additional debt",
            ]),
        );
    }

    if score.emergency_fund_months < 3.0 {
        insights.push(
            Insight::new(
                if score.emergency_fund_months < 1.0 {
                    Severity::Critical
                } else {
                    Severity::Warning
                },
                "Insufficient Emergency Fund",
                format!(
                    "Your emergency fund covers {:.1} months of expenses, below the recommended 3-6 months.",
                    score.emergency_fund_months
                ),
            )
            .with_actions([
                "Prioritize building your emergency fund",
                "Set a goal to save at least 3 months of expenses",
                "Keep emergency funds in a liquid, easily accessible account",
            ]),
        );
    } else if score.emergency_fund_months >= 6.0 {
        insights.push(
            Insight::new(
                Severity::Info,
                "Strong Emergency Fund",
                format!(
                    "Your emergency fund covers {:.1} months of expenses, meeting the recommended 3-6 months.",
                    score.emergency_fund_months
                ),
            )
            .with_actions([
                "Consider investing additional savings beyond your emergency fund",
                "Review your emergency fund allocation periodically",
                "Ensure your emergency fund keeps pace with any lifestyle changes",
            ]),
        );
    }

    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyticsConfig;
    use crate::models::TransactionType;
    use crate::test_utils::{date, expense, income};
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn run(txs: &[Transaction]) -> HealthReport {
        let config = AnalyticsConfig::default();
        let ctx = AnalysisContext::new(txs, &config, date(2024, 6, 30));
        analyze_health(&ctx, &mut StepRng::new(0, 0))
    }

    #[test]
    fn test_score_boundary_is_perfect() {
        assert_eq!(composite_score(20.0, 0.1, 6.0), 100);
    }

    #[test]
    fn test_score_tiers() {
        assert_eq!(composite_score(0.0, 0.6, 0.0), 0);
        assert_eq!(composite_score(0.5, 0.5, 0.5), 10 + 5 + 5);
        assert_eq!(composite_score(15.0, 0.2, 3.0), 35 + 25 + 20);
        assert_eq!(composite_score(-40.0, 0.35, 1.0), 10 + 10);
    }

    #[test]
    fn test_score_labels() {
        assert_eq!(score_label(100), "Excellent");
        assert_eq!(score_label(85), "Very Good");
        assert_eq!(score_label(70), "Good");
        assert_eq!(score_label(60), "Fair");
        assert_eq!(score_label(50), "Needs Improvement");
        assert_eq!(score_label(49), "Poor");
    }

    #[test]
    fn test_zero_income_is_safe() {
        let txs = vec![
            expense(date(2024, 1, 1), "RENT", -500.0),
            expense(date(2024, 2, 1), "LOAN REPAYMENT", -200.0),
        ];
        let report = run(&txs);
        assert_eq!(report.score.savings_rate, 0.0);
        assert_eq!(report.score.debt_to_income, 0.0);
        assert_eq!(report.score.emergency_fund_months, 0.0);
        assert!(report.score.goal_progress.iter().all(|g| g.progress_percentage.is_finite()));
    }

    #[test]
    fn test_healthy_profile() {
        // 3 months: income 3000, expenses 600 -> 80% savings, 12 months coverage
        let txs = vec![
            income(date(2024, 1, 1), "SALARY", 1000.0),
            income(date(2024, 2, 1), "SALARY", 1000.0),
            income(date(2024, 3, 1), "SALARY", 1000.0),
            expense(date(2024, 1, 5), "GROCER", -200.0).with_category("Food"),
            expense(date(2024, 2, 5), "GROCER", -200.0).with_category("Food"),
            expense(date(2024, 3, 5), "GROCER", -200.0).with_category("Food"),
        ];
        let report = run(&txs);
        let score = &report.score;

        assert_eq!(score.savings_rate, 80.0);
        assert_eq!(score.emergency_fund_months, 12.0);
        assert_eq!(score.overall_score, 100);
        assert_eq!(score.label, "Excellent");
        assert_eq!(score.goal_progress[0].target_amount, 1200.0);
        assert_eq!(score.goal_progress[0].progress_percentage, 100.0);

        // Only the spending recommendation applies
        assert_eq!(score.recommendations.len(), 1);
        assert_eq!(score.recommendations[0].category, RecommendationCategory::Spending);
        assert!(score.recommendations[0].description.ends_with("Food"));

        let titles: Vec<&str> = report.insights.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Financial Health Overview", "Strong Savings Rate", "Strong Emergency Fund"]
        );
    }

    #[test]
    fn test_debt_counts_expenses_only() {
        let txs = vec![
            income(date(2024, 1, 1), "SALARY", 1000.0),
            Transaction::new(date(2024, 1, 2), "LOAN DISBURSEMENT", -500.0)
                .with_type(TransactionType::Credit),
            Transaction::new(date(2024, 1, 3), "Car payment", 450.0).with_type(TransactionType::Debit),
        ];
        let report = run(&txs);
        // Credit-typed loan inflow is income, not debt
        assert_eq!(report.score.debt_to_income, 450.0 / 1500.0);
        assert!(report
            .score
            .recommendations
            .iter()
            .all(|r| r.category != RecommendationCategory::Debt));
    }

    #[test]
    fn test_struggling_profile() {
        let txs = vec![
            income(date(2024, 1, 1), "SALARY", 1000.0),
            expense(date(2024, 1, 2), "LOAN installment", -450.0),
            expense(date(2024, 1, 3), "RENT", -500.0),
        ];
        let report = run(&txs);
        let score = &report.score;

        // 5% savings -> 20, 0.45 debt -> 5, 0.05/0.95 months -> 5
        assert_eq!(score.overall_score, 30);
        let difficulties: Vec<Difficulty> = score.recommendations.iter().map(|r| r.difficulty).collect();
        assert_eq!(
            difficulties,
            vec![Difficulty::Hard, Difficulty::Medium, Difficulty::Hard, Difficulty::Medium]
        );
        let debt = report
            .insights
            .iter()
            .find(|i| i.title == "High Debt-to-Income Ratio")
            .unwrap();
        assert_eq!(debt.severity, Severity::Critical);
    }

    #[test]
    fn test_synthetic_history_shape() {
        let config = HealthConfig::default();
        let today = date(2024, 6, 15);
        let history = synthetic_history(80, today, &config, &mut StepRng::new(0, 0));

        assert_eq!(history.len(), 6);
        assert_eq!(history[0].date, date(2024, 1, 15));
        assert_eq!(history[5].date, today);
        // Zero draw puts the baseline 10 points below the score
        assert_eq!(history[0].score, 70);
        assert_eq!(history[5].score, 80);
        assert!(history.iter().all(|h| h.synthetic));

        let mut rng = StdRng::seed_from_u64(42);
        for h in synthetic_history(95, today, &config, &mut rng) {
            assert!(h.score <= 100);
            assert!(h.score >= 85);
        }
    }

    #[test]
    fn test_empty_input() {
        let report = run(&[]);
        assert_eq!(report.score.overall_score, 0);
        assert!(report.score.historical_scores.is_empty());
        assert!(report.insights.is_empty());
    }
}
