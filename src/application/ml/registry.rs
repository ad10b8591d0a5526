use crate::application::ml::artifact_cache::ArtifactCache;
use crate::application::ml::seasonal::SeasonalStrategy;
use crate::application::ml::sequence::{SequenceConfig, SequenceStrategy};
use crate::application::ml::strategy::ForecastStrategy;
use crate::application::ml::trend::TrendStrategy;
use crate::domain::errors::ForecastError;
use crate::domain::market::PriceSeries;
use crate::domain::ml::{Forecast, StrategyKind};
use crate::domain::ports::ArtifactStore;
use std::sync::Arc;
use tracing::info;

/// Owns one instance of every strategy over a shared artifact cache and
/// dispatches forecasts by [`StrategyKind`].
pub struct ForecastRegistry {
    cache: Arc<ArtifactCache>,
    sequence: SequenceStrategy,
    trend: TrendStrategy,
    seasonal: SeasonalStrategy,
}

impl ForecastRegistry {
    pub fn new(store: Arc<dyn ArtifactStore>, sequence_config: SequenceConfig) -> Self {
        Self::with_cache(Arc::new(ArtifactCache::new(store)), sequence_config)
    }

    /// Build over an existing cache, e.g. one shared by several registries.
    pub fn with_cache(cache: Arc<ArtifactCache>, sequence_config: SequenceConfig) -> Self {
        Self {
            sequence: SequenceStrategy::new(cache.clone(), sequence_config),
            trend: TrendStrategy::new(cache.clone()),
            seasonal: SeasonalStrategy::new(),
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<ArtifactCache> {
        &self.cache
    }

    pub fn strategy(&self, kind: StrategyKind) -> &dyn ForecastStrategy {
        match kind {
            StrategyKind::Sequence => &self.sequence,
            StrategyKind::Trend => &self.trend,
            StrategyKind::Seasonal => &self.seasonal,
        }
    }

    /// Produce a 30-day forecast with the given strategy.
    ///
    /// The first call for a persisted strategy trains and saves its model,
    /// which can take far longer than later calls.
    pub fn forecast(
        &self,
        series: &PriceSeries,
        kind: StrategyKind,
    ) -> Result<Forecast, ForecastError> {
        info!(
            "Forecasting {} observations with {} strategy",
            series.len(),
            kind
        );
        self.strategy(kind).forecast(series)
    }

    /// Same as [`forecast`](Self::forecast) for a free-form selection string;
    /// unrecognised selections use the default strategy.
    pub fn forecast_selection(
        &self,
        series: &PriceSeries,
        selection: &str,
    ) -> Result<Forecast, ForecastError> {
        self.forecast(series, StrategyKind::from_selection(selection))
    }
}
