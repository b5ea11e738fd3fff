use super::types::{FeeImpactError, Result, ScenarioInputs, SummaryMetrics, Timeline, YearPoint};

/// Runs the yearly fee-adjusted compounding for both strategies.
///
/// Fees for year `t` are charged on the balance at the end of year `t - 1`,
/// and growth is applied to that same prior balance. Callers must pass
/// inputs that satisfy [`validate`]; use [`try_simulate`] when they might not.
pub fn simulate(inputs: &ScenarioInputs) -> Timeline {
    let index_growth = 1.0 + inputs.net_index_return();
    let active_growth = 1.0 + inputs.net_active_return();
    let active_fee_rate = inputs.active_fee_rate();

    let mut timeline = Vec::with_capacity(inputs.years as usize + 1);
    let mut point = YearPoint {
        year: 0,
        index_value: inputs.initial_investment,
        active_value: inputs.initial_investment,
        index_fees_cumulative: 0.0,
        active_fees_cumulative: 0.0,
    };
    timeline.push(point);

    for year in 1..=inputs.years {
        point = advance_year(
            &point,
            year,
            index_growth,
            active_growth,
            inputs.index_expense_ratio,
            active_fee_rate,
        );
        timeline.push(point);
    }

    timeline
}

/// Validates `inputs` first, returning `InvalidInput` instead of running on bad data.
pub fn try_simulate(inputs: &ScenarioInputs) -> Result<Timeline> {
    validate(inputs)?;
    Ok(simulate(inputs))
}

/// Rejects `years < 1`, a non-positive or non-finite initial investment,
/// a non-finite market return and negative or non-finite fee rates.
pub fn validate(inputs: &ScenarioInputs) -> Result<()> {
    if inputs.years < 1 {
        return Err(FeeImpactError::invalid("years must be >= 1"));
    }
    if !inputs.initial_investment.is_finite() || inputs.initial_investment <= 0.0 {
        return Err(FeeImpactError::invalid("initial investment must be > 0"));
    }
    if !inputs.market_return.is_finite() {
        return Err(FeeImpactError::invalid("market return must be a finite number"));
    }

    let fees = [
        ("index expense ratio", inputs.index_expense_ratio),
        ("active expense ratio", inputs.active_expense_ratio),
        ("AUM fee", inputs.aum_fee),
    ];
    for (name, rate) in fees {
        if !rate.is_finite() || rate < 0.0 {
            return Err(FeeImpactError::invalid(format!("{name} must be >= 0")));
        }
    }

    Ok(())
}

/// Derives the headline comparison from the final year of `timeline`.
///
/// An empty timeline summarizes as all zeros with an undefined percentage.
pub fn summarize(timeline: &[YearPoint]) -> SummaryMetrics {
    let last = timeline.last().copied().unwrap_or(YearPoint {
        year: 0,
        index_value: 0.0,
        active_value: 0.0,
        index_fees_cumulative: 0.0,
        active_fees_cumulative: 0.0,
    });

    let dollar_difference = last.index_value - last.active_value;
    let fee_delta = last.active_fees_cumulative - last.index_fees_cumulative;

    SummaryMetrics {
        years: last.year,
        final_index_value: last.index_value,
        final_active_value: last.active_value,
        dollar_difference,
        percent_difference: percent_of(dollar_difference, last.index_value),
        index_fees_total: last.index_fees_cumulative,
        active_fees_total: last.active_fees_cumulative,
        fee_delta,
        lost_growth: dollar_difference - fee_delta,
    }
}

fn advance_year(
    prev: &YearPoint,
    year: u32,
    index_growth: f64,
    active_growth: f64,
    index_fee_rate: f64,
    active_fee_rate: f64,
) -> YearPoint {
    YearPoint {
        year,
        index_value: prev.index_value * index_growth,
        active_value: prev.active_value * active_growth,
        index_fees_cumulative: prev.index_fees_cumulative + prev.index_value * index_fee_rate,
        active_fees_cumulative: prev.active_fees_cumulative + prev.active_value * active_fee_rate,
    }
}

fn percent_of(amount: f64, base: f64) -> Option<f64> {
    if !base.is_finite() || base <= 0.0 {
        return None;
    }
    let pct = amount / base * 100.0;
    pct.is_finite().then_some(pct)
}
