use crate::domain::ml::strategy_kind::StrategyKind;
use thiserror::Error;

/// Errors raised while preparing data for, training, or running a forecast.
///
/// Every variant is surfaced to the caller as-is; nothing here is swallowed
/// into an empty forecast.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Insufficient data for {strategy} strategy: need at least {required} points, got {actual}")]
    DataInsufficient {
        strategy: StrategyKind,
        required: usize,
        actual: usize,
    },

    #[error("Model artifact for {strategy} strategy is unavailable: {reason}")]
    ModelUnavailable {
        strategy: StrategyKind,
        reason: String,
    },

    #[error("Upstream price data rejected: {reason}")]
    UpstreamDataError { reason: String },

    #[error("Artifact store failure for '{key}': {reason}")]
    ArtifactStore { key: String, reason: String },

    #[error("Training failed for {strategy} strategy: {reason}")]
    Training {
        strategy: StrategyKind,
        reason: String,
    },
}

impl ForecastError {
    pub fn upstream(reason: impl Into<String>) -> Self {
        ForecastError::UpstreamDataError {
            reason: reason.into(),
        }
    }

    pub fn insufficient(strategy: StrategyKind, required: usize, actual: usize) -> Self {
        ForecastError::DataInsufficient {
            strategy,
            required,
            actual,
        }
    }

    pub fn training(strategy: StrategyKind, reason: impl std::fmt::Display) -> Self {
        ForecastError::Training {
            strategy,
            reason: reason.to_string(),
        }
    }
}
