use serde::{Deserialize, Serialize};
use tracing::warn;

/// Artifact key of the persisted sequence-model weights.
pub const SEQUENCE_ARTIFACT_KEY: &str = "lstm_model";
/// Artifact key of the persisted trend-model fit.
pub const TREND_ARTIFACT_KEY: &str = "linear_model";

/// The closed set of forecasting strategies.
///
/// `Trend` is the default variant: dropdown-style selections that match no
/// known strategy resolve to it through [`StrategyKind::from_selection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StrategyKind {
    /// Stacked LSTM over a rolling 60-price window, rolled out autoregressively.
    Sequence,
    /// Ordinary least squares line over the observation index.
    #[default]
    Trend,
    /// Additive trend + daily/weekly seasonal decomposition.
    Seasonal,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::Sequence,
        StrategyKind::Trend,
        StrategyKind::Seasonal,
    ];

    /// Resolve a user-facing selection, falling back to the default variant
    /// (`Trend`) when the value is not recognised.
    pub fn from_selection(selection: &str) -> Self {
        match selection.parse::<StrategyKind>() {
            Ok(kind) => kind,
            Err(_) => {
                let fallback = StrategyKind::default();
                warn!(
                    "Unknown strategy selection '{}', falling back to {}",
                    selection, fallback
                );
                fallback
            }
        }
    }

    /// Key under which the strategy's trained model is persisted.
    /// `None` for strategies that refit on every call.
    pub fn artifact_key(&self) -> Option<&'static str> {
        match self {
            StrategyKind::Sequence => Some(SEQUENCE_ARTIFACT_KEY),
            StrategyKind::Trend => Some(TREND_ARTIFACT_KEY),
            StrategyKind::Seasonal => None,
        }
    }

    /// Minimum number of observations the strategy can forecast from.
    pub fn min_observations(&self) -> usize {
        match self {
            StrategyKind::Sequence => 60,
            StrategyKind::Trend | StrategyKind::Seasonal => 2,
        }
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sequence" | "lstm" => Ok(StrategyKind::Sequence),
            "trend" | "linear" => Ok(StrategyKind::Trend),
            "seasonal" | "prophet" => Ok(StrategyKind::Seasonal),
            _ => anyhow::bail!(
                "Invalid strategy: {}. Valid: sequence (lstm), trend (linear), seasonal (prophet)",
                s
            ),
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::Sequence => write!(f, "sequence"),
            StrategyKind::Trend => write!(f, "trend"),
            StrategyKind::Seasonal => write!(f, "seasonal"),
        }
    }
}
