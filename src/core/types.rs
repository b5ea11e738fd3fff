use serde::Serialize;

/// Scalar parameters of one fee comparison. Rates are fractions (0.08 = 8%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioInputs {
    pub initial_investment: f64,
    pub market_return: f64,
    pub index_expense_ratio: f64,
    pub active_expense_ratio: f64,
    pub aum_fee: f64,
    pub years: u32,
}

impl ScenarioInputs {
    /// Yearly fee rate charged to the actively managed strategy.
    pub fn active_fee_rate(&self) -> f64 {
        self.active_expense_ratio + self.aum_fee
    }

    pub fn net_index_return(&self) -> f64 {
        self.market_return - self.index_expense_ratio
    }

    pub fn net_active_return(&self) -> f64 {
        self.market_return - self.active_fee_rate()
    }
}

impl Default for ScenarioInputs {
    fn default() -> Self {
        Self {
            initial_investment: 100_000.0,
            market_return: 0.08,
            index_expense_ratio: 0.0003,
            active_expense_ratio: 0.005,
            aum_fee: 0.015,
            years: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearPoint {
    pub year: u32,
    pub index_value: f64,
    pub active_value: f64,
    pub index_fees_cumulative: f64,
    pub active_fees_cumulative: f64,
}

/// Year-by-year balances from year 0 through the final year, ascending.
pub type Timeline = Vec<YearPoint>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryMetrics {
    pub years: u32,
    pub final_index_value: f64,
    pub final_active_value: f64,
    pub dollar_difference: f64,
    /// `None` when the final index value is not positive.
    pub percent_difference: Option<f64>,
    pub index_fees_total: f64,
    pub active_fees_total: f64,
    pub fee_delta: f64,
    /// Part of the gap caused by compounding on fees already paid out.
    pub lost_growth: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum FeeImpactError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FeeImpactError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, FeeImpactError>;
