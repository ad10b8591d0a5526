use super::network::{NetworkShape, SequenceNetwork, TrainingParams, supervised_windows};
use super::rollout::rollout;
use crate::application::ml::artifact_cache::ArtifactCache;
use crate::application::ml::strategy::ForecastStrategy;
use crate::domain::errors::ForecastError;
use crate::domain::market::PriceSeries;
use crate::domain::ml::strategy_kind::SEQUENCE_ARTIFACT_KEY;
use crate::domain::ml::{FORECAST_HORIZON, Forecast, ScaledSeries, StrategyKind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SequenceConfig {
    pub shape: NetworkShape,
    pub training: TrainingParams,
}

/// Rolling-window LSTM forecaster.
///
/// Scales the series to `[0, 1]`, loads the persisted network (training one
/// on the scaled series if none is usable), rolls it out over the last
/// `window` observations and maps the predictions back to price units with
/// the same scaler.
pub struct SequenceStrategy {
    cache: Arc<ArtifactCache>,
    config: SequenceConfig,
    training_runs: AtomicUsize,
}

impl SequenceStrategy {
    pub fn new(cache: Arc<ArtifactCache>, config: SequenceConfig) -> Self {
        Self {
            cache,
            config,
            training_runs: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    fn train(&self, scaled: &ScaledSeries) -> Result<SequenceNetwork, ForecastError> {
        let window = self.config.shape.window;
        let fraction = self.config.training.train_fraction;
        let values = scaled.values();
        let training = &values[..training_len(values.len(), fraction)];
        let samples = supervised_windows(training, window);
        if samples.is_empty() {
            return Err(ForecastError::insufficient(
                StrategyKind::Sequence,
                min_training_series(window, fraction),
                values.len(),
            ));
        }

        self.training_runs.fetch_add(1, Ordering::SeqCst);
        info!(
            "Training sequence model on {} windows ({} epochs, lr {})",
            samples.len(),
            self.config.training.epochs,
            self.config.training.learning_rate
        );

        let started = Instant::now();
        let mut network = SequenceNetwork::new(self.config.shape, self.config.training.seed);
        let loss = network.fit(&samples, &self.config.training);
        info!(
            "Sequence model trained in {:.1}s, final epoch MSE {:.6}",
            started.elapsed().as_secs_f64(),
            loss
        );
        if !loss.is_finite() {
            return Err(ForecastError::training(
                StrategyKind::Sequence,
                format!("training diverged with final loss {}", loss),
            ));
        }

        Ok(network)
    }
}

/// Number of leading observations used for training: `ceil(len * fraction)`.
fn training_len(len: usize, fraction: f64) -> usize {
    ((len as f64 * fraction).ceil() as usize).min(len)
}

/// Shortest series whose training slice still yields one supervised window.
fn min_training_series(window: usize, fraction: f64) -> usize {
    (window + 1..)
        .find(|&len| training_len(len, fraction) > window)
        .unwrap_or(usize::MAX)
}

impl ForecastStrategy for SequenceStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Sequence
    }

    fn forecast(&self, series: &PriceSeries) -> Result<Forecast, ForecastError> {
        let window = self.config.shape.window;
        let required = window.max(StrategyKind::Sequence.min_observations());
        if series.len() < required {
            return Err(ForecastError::insufficient(
                StrategyKind::Sequence,
                required,
                series.len(),
            ));
        }

        let scaled = ScaledSeries::from_prices(&series.prices())
            .ok_or_else(|| ForecastError::upstream("price series is empty"))?;

        let shape = self.config.shape;
        let network = self.cache.get_or_train(
            StrategyKind::Sequence,
            SEQUENCE_ARTIFACT_KEY,
            |network: &SequenceNetwork| network.check_compatible(&shape),
            || self.train(&scaled),
        )?;

        let seed = scaled.tail(window).ok_or_else(|| {
            ForecastError::insufficient(StrategyKind::Sequence, window, series.len())
        })?;
        let predictions = rollout(seed, &network, FORECAST_HORIZON);

        Forecast::new(StrategyKind::Sequence, scaled.unscale(&predictions))
    }

    fn training_runs(&self) -> usize {
        self.training_runs.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::InMemoryArtifactStore;
    use chrono::{TimeZone, Utc};

    fn small_config() -> SequenceConfig {
        SequenceConfig {
            shape: NetworkShape {
                window: 60,
                lstm_units: 4,
                dense_units: 3,
            },
            training: TrainingParams {
                epochs: 1,
                learning_rate: 0.001,
                seed: 42,
                train_fraction: 0.8,
            },
        }
    }

    fn series(len: usize) -> PriceSeries {
        let prices: Vec<f64> = (0..len)
            .map(|i| 30_000.0 + 500.0 * (i as f64 / 7.0).sin() + 10.0 * i as f64)
            .collect();
        PriceSeries::daily(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(), &prices).unwrap()
    }

    fn strategy() -> SequenceStrategy {
        let cache = Arc::new(ArtifactCache::new(Arc::new(InMemoryArtifactStore::new())));
        SequenceStrategy::new(cache, small_config())
    }

    #[test]
    fn test_rejects_short_series() {
        let err = strategy().forecast(&series(59)).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::DataInsufficient {
                strategy: StrategyKind::Sequence,
                required: 60,
                actual: 59
            }
        ));
    }

    #[test]
    fn test_exactly_window_points_cannot_train() {
        let strategy = strategy();
        let err = strategy.forecast(&series(60)).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::DataInsufficient { required: 76, .. }
        ));
        assert_eq!(strategy.training_runs(), 0);
    }

    #[test]
    fn test_training_uses_leading_fraction_of_series() {
        assert_eq!(training_len(100, 0.8), 80);
        assert_eq!(training_len(76, 0.8), 61);
        assert_eq!(training_len(75, 0.8), 60);
        assert_eq!(training_len(61, 1.0), 61);
        assert_eq!(min_training_series(60, 0.8), 76);
        assert_eq!(min_training_series(60, 1.0), 61);

        let strategy = strategy();
        let err = strategy.forecast(&series(75)).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::DataInsufficient {
                required: 76,
                actual: 75,
                ..
            }
        ));
        assert!(strategy.forecast(&series(76)).is_ok());
        assert_eq!(strategy.training_runs(), 1);
    }

    #[test]
    fn test_diverged_training_is_rejected_and_not_saved() {
        let store = Arc::new(InMemoryArtifactStore::new());
        let mut config = small_config();
        config.training.learning_rate = f64::INFINITY;
        let strategy = SequenceStrategy::new(Arc::new(ArtifactCache::new(store.clone())), config);

        let err = strategy.forecast(&series(90)).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::Training {
                strategy: StrategyKind::Sequence,
                ..
            }
        ));
        assert_eq!(strategy.training_runs(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_forecast_is_full_horizon_and_finite() {
        let strategy = strategy();
        let forecast = strategy.forecast(&series(90)).unwrap();

        assert_eq!(forecast.len(), FORECAST_HORIZON);
        assert!(forecast.values().iter().all(|v| v.is_finite()));
        assert_eq!(strategy.training_runs(), 1);
    }

    #[test]
    fn test_inference_with_persisted_model_needs_only_window() {
        let strategy = strategy();
        strategy.forecast(&series(90)).unwrap();

        let forecast = strategy.forecast(&series(60)).unwrap();
        assert_eq!(forecast.len(), FORECAST_HORIZON);
        assert_eq!(strategy.training_runs(), 1);
    }
}
