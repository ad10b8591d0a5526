mod common;

use common::{CountingStore, daily_series, small_sequence_config, wavy_series};
use coincast::application::ml::ForecastRegistry;
use coincast::domain::errors::ForecastError;
use coincast::domain::ml::{FORECAST_HORIZON, StrategyKind};
use coincast::domain::ports::ArtifactStore;
use coincast::infrastructure::InMemoryArtifactStore;
use std::sync::Arc;

fn registry_with(store: Arc<dyn ArtifactStore>) -> ForecastRegistry {
    ForecastRegistry::new(store, small_sequence_config())
}

#[test]
fn test_every_strategy_forecasts_thirty_days() {
    let registry = registry_with(Arc::new(InMemoryArtifactStore::new()));
    let series = wavy_series(120);

    for kind in StrategyKind::ALL {
        let forecast = registry.forecast(&series, kind).unwrap();
        assert_eq!(forecast.len(), FORECAST_HORIZON, "{} horizon", kind);
        assert!(
            forecast.values().iter().all(|v| v.is_finite()),
            "{} produced a non-finite value",
            kind
        );
    }
}

#[test]
fn test_sequence_rejects_short_history() {
    let registry = registry_with(Arc::new(InMemoryArtifactStore::new()));

    let err = registry
        .forecast(&wavy_series(59), StrategyKind::Sequence)
        .unwrap_err();
    assert!(matches!(
        err,
        ForecastError::DataInsufficient {
            strategy: StrategyKind::Sequence,
            required: 60,
            actual: 59
        }
    ));
    assert_eq!(registry.strategy(StrategyKind::Sequence).training_runs(), 0);
}

#[test]
fn test_trend_continues_a_straight_line() {
    let registry = registry_with(Arc::new(InMemoryArtifactStore::new()));
    let prices: Vec<f64> = (100..=200).map(f64::from).collect();

    let forecast = registry
        .forecast(&daily_series(&prices), StrategyKind::Trend)
        .unwrap();

    assert!((forecast.values()[0] - 201.0).abs() < 1e-6);
    assert!((forecast.values()[29] - 230.0).abs() < 1e-6);
    for pair in forecast.values().windows(2) {
        assert!((pair[1] - pair[0] - 1.0).abs() < 1e-6);
    }
}

#[test]
fn test_persisted_models_train_once() {
    let store = Arc::new(CountingStore::new());
    let registry = registry_with(store.clone());
    let series = wavy_series(90);

    for kind in [StrategyKind::Sequence, StrategyKind::Trend] {
        let first = registry.forecast(&series, kind).unwrap();
        let second = registry.forecast(&series, kind).unwrap();

        assert_eq!(first.values(), second.values(), "{} not deterministic", kind);
        assert_eq!(registry.strategy(kind).training_runs(), 1);
    }
    assert_eq!(store.saves(), 2);
}

#[test]
fn test_seasonal_refits_and_never_persists() {
    let store = Arc::new(CountingStore::new());
    let registry = registry_with(store.clone());
    let series = wavy_series(90);

    let first = registry.forecast(&series, StrategyKind::Seasonal).unwrap();
    let second = registry.forecast(&series, StrategyKind::Seasonal).unwrap();

    assert_eq!(first.values(), second.values());
    assert_eq!(registry.strategy(StrategyKind::Seasonal).training_runs(), 2);
    assert_eq!(store.saves(), 0);
}

#[test]
fn test_unknown_selection_falls_back_to_trend() {
    let registry = registry_with(Arc::new(InMemoryArtifactStore::new()));
    let series = wavy_series(90);

    let fallback = registry.forecast_selection(&series, "random-walk").unwrap();
    let trend = registry.forecast(&series, StrategyKind::Trend).unwrap();

    assert_eq!(fallback.strategy(), StrategyKind::Trend);
    assert_eq!(fallback.values(), trend.values());
}

#[test]
fn test_selection_aliases() {
    let registry = registry_with(Arc::new(InMemoryArtifactStore::new()));
    let series = wavy_series(90);

    assert_eq!(
        registry.forecast_selection(&series, "LSTM").unwrap().strategy(),
        StrategyKind::Sequence
    );
    assert_eq!(
        registry.forecast_selection(&series, "linear").unwrap().strategy(),
        StrategyKind::Trend
    );
    assert_eq!(
        registry.forecast_selection(&series, " prophet ").unwrap().strategy(),
        StrategyKind::Seasonal
    );
}

#[test]
fn test_corrupt_artifact_is_retrained() {
    let store = Arc::new(CountingStore::new());
    store.save("linear_model", b"{ not json").unwrap();
    let registry = registry_with(store.clone());

    let forecast = registry
        .forecast(&wavy_series(30), StrategyKind::Trend)
        .unwrap();

    assert_eq!(forecast.len(), FORECAST_HORIZON);
    assert_eq!(registry.strategy(StrategyKind::Trend).training_runs(), 1);
    // One save from the setup above, one from retraining.
    assert_eq!(store.saves(), 2);
}

#[test]
fn test_incompatible_sequence_artifact_is_retrained() {
    let store: Arc<dyn ArtifactStore> = Arc::new(InMemoryArtifactStore::new());
    let series = wavy_series(90);

    // Train with a different window, then ask for the small configuration.
    let mut wide = small_sequence_config();
    wide.shape.window = 70;
    let first = ForecastRegistry::new(store.clone(), wide);
    first.forecast(&series, StrategyKind::Sequence).unwrap();

    let second = registry_with(store);
    second.forecast(&series, StrategyKind::Sequence).unwrap();
    assert_eq!(second.strategy(StrategyKind::Sequence).training_runs(), 1);
}
