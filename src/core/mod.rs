mod engine;
mod types;

pub use engine::{simulate, summarize, try_simulate, validate};
pub use types::{FeeImpactError, Result, ScenarioInputs, SummaryMetrics, Timeline, YearPoint};
