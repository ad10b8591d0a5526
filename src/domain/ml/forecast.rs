use crate::domain::errors::ForecastError;
use crate::domain::ml::strategy_kind::StrategyKind;
use serde::{Deserialize, Serialize};

/// Number of future calendar days every strategy forecasts.
pub const FORECAST_HORIZON: usize = 30;

/// Exactly [`FORECAST_HORIZON`] future prices, one per calendar day,
/// starting the day after the last observation of the input series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    strategy: StrategyKind,
    values: Vec<f64>,
}

impl Forecast {
    /// Fails with [`ForecastError::Training`] unless `values` holds exactly
    /// one finite price per horizon day.
    pub fn new(strategy: StrategyKind, values: Vec<f64>) -> Result<Self, ForecastError> {
        if values.len() != FORECAST_HORIZON {
            return Err(ForecastError::training(
                strategy,
                format!(
                    "model produced {} values for a {}-day horizon",
                    values.len(),
                    FORECAST_HORIZON
                ),
            ));
        }
        if let Some(day) = values.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::training(
                strategy,
                format!("model produced non-finite value {} for day {}", values[day], day + 1),
            ));
        }
        Ok(Self { strategy, values })
    }

    pub fn strategy(&self) -> StrategyKind {
        self.strategy
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}
