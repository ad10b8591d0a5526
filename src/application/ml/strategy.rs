use crate::domain::errors::ForecastError;
use crate::domain::market::PriceSeries;
use crate::domain::ml::{Forecast, StrategyKind};

/// Common contract of every forecasting strategy: load or train a model,
/// then produce a [`Forecast`] for the day after the last observation onward.
pub trait ForecastStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// May train and persist a model on first use, which is far slower than
    /// a call that reuses a persisted one.
    fn forecast(&self, series: &PriceSeries) -> Result<Forecast, ForecastError>;

    /// How many times this strategy has fitted a model since construction.
    fn training_runs(&self) -> usize;
}
