//! Human-readable report rendering
//!
//! Each section renders into a `String` so the output can be tested without
//! capturing stdout.

use fintel_core::cashflow::{CashFlowReport, GapSeverity};
use fintel_core::health::HealthReport;
use fintel_core::merchants::MerchantReport;
use fintel_core::recurring::RecurringReport;
use fintel_core::tax::TaxReport;
use fintel_core::{AnalysisReport, Insight, Metric, Severity};

use super::truncate;

/// `writeln!` for a `String` target, without the `fmt::Result` to discard
macro_rules! outln {
    ($out:expr) => {
        $out.push('\n')
    };
    ($out:expr, $($arg:tt)*) => {{
        $out.push_str(&format!($($arg)*));
        $out.push('\n');
    }};
}

const RULE: &str = "   ─────────────────────────────────────────────────────────────";

fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "ℹ️ ",
        Severity::Warning => "⚠️ ",
        Severity::Critical => "🔴",
    }
}

fn gap_icon(severity: GapSeverity) -> &'static str {
    match severity {
        GapSeverity::Low => "🟡",
        GapSeverity::Medium => "🟠",
        GapSeverity::High => "🔴",
    }
}

fn write_metrics(out: &mut String, metrics: &[Metric]) {
    for metric in metrics {
        outln!(out, "   {:<28} {:>20}", metric.label, metric.value.to_string());
    }
}

fn write_insights(out: &mut String, insights: &[Insight]) {
    if insights.is_empty() {
        return;
    }
    outln!(out);
    for insight in insights {
        outln!(out, "   {} {}", severity_icon(insight.severity), insight.title);
        outln!(out, "      {}", insight.description);
        for action in &insight.action_items {
            outln!(out, "      → {}", action);
        }
    }
}

/// Render every section present in the report
pub fn render_report(report: &AnalysisReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("📊 Analyzed {} transactions", report.transaction_count));
    match report.today {
        Some(today) => outln!(out, " (as of {})", today),
        None => outln!(out),
    }

    if let Some(recurring) = &report.recurring {
        out.push('\n');
        out.push_str(&render_recurring(recurring));
    }
    if let Some(cash_flow) = &report.cash_flow {
        out.push('\n');
        out.push_str(&render_cash_flow(cash_flow));
    }
    if let Some(health) = &report.health {
        out.push('\n');
        out.push_str(&render_health(health));
    }
    if let Some(merchants) = &report.merchants {
        out.push('\n');
        out.push_str(&render_merchants(merchants));
    }
    if let Some(tax) = &report.tax {
        out.push('\n');
        out.push_str(&render_tax(tax));
    }

    out
}

pub fn render_recurring(report: &RecurringReport) -> String {
    let mut out = String::new();
    outln!(out, "🔁 Recurring Expenses");
    outln!(out, "{}", RULE);
    write_metrics(&mut out, &report.metrics);

    if report.expenses.is_empty() {
        outln!(out, "\n   No recurring expenses detected.");
    } else {
        outln!(out);
        outln!(
            out,
            "   {:<24} {:>12} {:<10} {:<12} {:<12}",
            "Merchant", "Amount", "Frequency", "Last", "Next"
        );
        outln!(out, "{}", RULE);
        for expense in &report.expenses {
            let flag = if expense.is_forgotten { " 💤" } else { "" };
            outln!(
                out,
                "   {:<24} {:>12.2} {:<10} {:<12} {:<12}{}",
                truncate(&expense.merchant_name, 24),
                expense.amount,
                expense.frequency,
                expense.last_charged,
                expense.next_expected_charge,
                flag
            );
            for alt in &expense.alternatives {
                outln!(
                    out,
                    "      ↳ {} at {:.2} (save {:.2}, {:.0}%)",
                    alt.name, alt.price, alt.savings_amount, alt.savings_percentage
                );
            }
        }
    }

    write_insights(&mut out, &report.insights);
    out
}

pub fn render_cash_flow(report: &CashFlowReport) -> String {
    let mut out = String::new();
    outln!(out, "💸 Cash Flow");
    outln!(out, "{}", RULE);
    write_metrics(&mut out, &report.metrics);

    if !report.buckets.is_empty() {
        outln!(out);
        outln!(
            out,
            "   {:<9} {:>14} {:>14} {:>14}",
            "Month", "Income", "Expenses", "Net"
        );
        outln!(out, "{}", RULE);
        for bucket in &report.buckets {
            if bucket.is_prediction {
                outln!(
                    out,
                    "   {:<9} {:>14.2} {:>14.2} {:>14.2}  (forecast)",
                    bucket.month.to_string(),
                    bucket.predicted_income.unwrap_or_default(),
                    bucket.predicted_expenses.unwrap_or_default(),
                    bucket.effective_net()
                );
            } else {
                outln!(
                    out,
                    "   {:<9} {:>14.2} {:>14.2} {:>14.2}",
                    bucket.month.to_string(),
                    bucket.income,
                    bucket.expenses,
                    bucket.net_cash_flow
                );
            }
        }
    }

    if !report.gaps.is_empty() {
        outln!(out, "\n   Gaps:");
        for gap in &report.gaps {
            outln!(
                out,
                "   {} {:<6} {} → {}  deficit {:.2}{}",
                gap_icon(gap.severity),
                gap.severity.as_str(),
                gap.start_month,
                gap.end_month,
                gap.total_deficit,
                if gap.ongoing { " (ongoing)" } else { "" }
            );
            outln!(out, "      {}", gap.recommendation);
        }
    }

    if !report.recommendations.is_empty() {
        outln!(out, "\n   Budget recommendations:");
        for rec in &report.recommendations {
            outln!(
                out,
                "   {:<24} {:>12.2} → {:>12.2}  ({})",
                truncate(&rec.category, 24),
                rec.current_spending,
                rec.recommended_spending,
                rec.reason
            );
        }
    }

    write_insights(&mut out, &report.insights);
    out
}

pub fn render_health(report: &HealthReport) -> String {
    let mut out = String::new();
    let score = &report.score;
    outln!(out, "❤️  Financial Health: {}/100 ({})", score.overall_score, score.label);
    outln!(out, "{}", RULE);
    write_metrics(&mut out, &report.metrics);

    if !score.goal_progress.is_empty() {
        outln!(out, "\n   Goals:");
        for goal in &score.goal_progress {
            outln!(
                out,
                "   {:<24} {:>12.2} / {:>12.2}  {:>5.1}%",
                truncate(&goal.name, 24),
                goal.current_amount,
                goal.target_amount,
                goal.progress_percentage
            );
        }
    }

    if !score.historical_scores.is_empty() {
        let history: Vec<String> = score
            .historical_scores
            .iter()
            .map(|h| h.score.to_string())
            .collect();
        outln!(out, "\n   Illustrative history: {}", history.join(" → "));
    }

    write_insights(&mut out, &report.insights);
    out
}

pub fn render_merchants(report: &MerchantReport) -> String {
    let mut out = String::new();
    outln!(out, "🏪 Merchants");
    outln!(out, "{}", RULE);
    write_metrics(&mut out, &report.metrics);

    if !report.merchants.is_empty() {
        outln!(out);
        outln!(
            out,
            "   {:<24} {:>14} {:>6} {:>12} {:<12}",
            "Merchant", "Total", "Count", "Average", "Last visit"
        );
        outln!(out, "{}", RULE);
        for merchant in &report.merchants {
            outln!(
                out,
                "   {:<24} {:>14.2} {:>6} {:>12.2} {:<12}",
                truncate(&merchant.name, 24),
                merchant.total_spent,
                merchant.transaction_count,
                merchant.average_transaction,
                merchant.last_visited
            );
        }
    }

    write_insights(&mut out, &report.insights);
    out
}

pub fn render_tax(report: &TaxReport) -> String {
    let mut out = String::new();
    outln!(out, "🧾 Tax Categories");
    outln!(out, "{}", RULE);
    write_metrics(&mut out, &report.metrics);

    if !report.categories.is_empty() {
        outln!(out);
        for category in &report.categories {
            let marker = if category.is_deductible { "✓" } else { " " };
            outln!(
                out,
                "   {} {:<28} {:>14.2} {:>6}",
                marker,
                category.kind.to_string(),
                category.total_amount,
                category.transaction_count
            );
        }
    }

    if !report.deductions.is_empty() {
        outln!(out, "\n   Deduction candidates:");
        for deduction in &report.deductions {
            outln!(
                out,
                "   {:<12} {:<28} {:>12.2} {:>3}%",
                deduction.date,
                truncate(&deduction.merchant, 28),
                deduction.amount,
                deduction.confidence
            );
        }
    }

    write_insights(&mut out, &report.insights);
    out
}
