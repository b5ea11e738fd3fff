use std::fmt::Write;

use crate::core::{ScenarioInputs, SummaryMetrics, YearPoint};

/// Renders the year-by-year breakdown, keeping year 0, every `every`-th year
/// and the final year.
pub fn render_table(timeline: &[YearPoint], every: u32) -> String {
    let every = every.max(1);
    let last_year = timeline.last().map(|p| p.year).unwrap_or(0);
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{:>5} {:>16} {:>16} {:>14} {:>14}",
        "Year", "Index fund", "Active fund", "Index fees", "Active fees"
    );
    let _ = writeln!(
        out,
        "{:-<5} {:-<16} {:-<16} {:-<14} {:-<14}",
        "", "", "", "", ""
    );
    for point in timeline
        .iter()
        .filter(|p| p.year % every == 0 || p.year == last_year)
    {
        let _ = writeln!(
            out,
            "{:>5} {:>16} {:>16} {:>14} {:>14}",
            point.year,
            format_currency(point.index_value),
            format_currency(point.active_value),
            format_currency(point.index_fees_cumulative),
            format_currency(point.active_fees_cumulative),
        );
    }
    out
}

pub fn render_summary(inputs: &ScenarioInputs, summary: &SummaryMetrics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Fee Impact: Active vs. Passive");
    let _ = writeln!(out, "==============================");
    let _ = writeln!(
        out,
        "Initial investment: {}",
        format_currency(inputs.initial_investment)
    );
    let _ = writeln!(
        out,
        "Market return: {:.2}%  Index fund fees: {:.2}%  Active fund fees: {:.2}% + {:.2}% AUM",
        inputs.market_return * 100.0,
        inputs.index_expense_ratio * 100.0,
        inputs.active_expense_ratio * 100.0,
        inputs.aum_fee * 100.0,
    );
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "After {} years the index fund is worth {} and the active fund {}.",
        summary.years,
        format_currency(summary.final_index_value),
        format_currency(summary.final_active_value),
    );
    let _ = writeln!(
        out,
        "Difference: {} ({} of the index fund's final value)",
        format_currency(summary.dollar_difference),
        format_percent(summary.percent_difference),
    );
    let _ = writeln!(
        out,
        "Fees paid: {} (index) vs {} (active), {} more for active",
        format_currency(summary.index_fees_total),
        format_currency(summary.active_fees_total),
        format_currency(summary.fee_delta),
    );
    let _ = writeln!(
        out,
        "Growth lost on fees already paid: {}",
        format_currency(summary.lost_growth)
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Key takeaways:");
    for takeaway in key_takeaways(inputs, summary) {
        let _ = writeln!(out, "  - {takeaway}");
    }
    out
}

/// Plain-language conclusions drawn from the computed numbers.
pub fn key_takeaways(inputs: &ScenarioInputs, summary: &SummaryMetrics) -> Vec<String> {
    let fee_gap_pct = (inputs.active_fee_rate() - inputs.index_expense_ratio) * 100.0;

    if summary.dollar_difference.abs() < 0.5 {
        return vec![format!(
            "Both strategies carry the same total fee, so they end at the same {} after {} years.",
            format_currency(summary.final_index_value),
            summary.years,
        )];
    }

    let (leader, trailer) = if summary.dollar_difference > 0.0 {
        ("low-cost index fund", "actively managed fund")
    } else {
        ("actively managed fund", "low-cost index fund")
    };
    vec![
        format!(
            "The {leader} ends {} ahead of the {trailer} after {} years ({} of the index fund's value).",
            format_currency(summary.dollar_difference.abs()),
            summary.years,
            format_percent(summary.percent_difference),
        ),
        format!(
            "Expense ratios and the advisor fee cost {} more in fees paid out.",
            format_currency(summary.fee_delta),
        ),
        format!(
            "A fee gap of {fee_gap_pct:.2} points a year also forfeits {} of compounding on that money.",
            format_currency(summary.lost_growth),
        ),
    ]
}

/// Whole dollars with thousands separators, e.g. `-$1,234,568`.
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return "n/a".to_string();
    }
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(pct) => format!("{pct:.2}%"),
        None => "n/a".to_string(),
    }
}
