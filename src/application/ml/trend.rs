use crate::application::ml::artifact_cache::ArtifactCache;
use crate::application::ml::strategy::ForecastStrategy;
use crate::domain::errors::ForecastError;
use crate::domain::market::PriceSeries;
use crate::domain::ml::strategy_kind::TREND_ARTIFACT_KEY;
use crate::domain::ml::{FORECAST_HORIZON, Forecast, StrategyKind};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::linear_regression::{
    LinearRegression, LinearRegressionParameters, LinearRegressionSolverName,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

pub(crate) type IndexRegression = LinearRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Column matrix of time positions, one row per position.
pub(crate) fn position_matrix(positions: &[f64]) -> Result<DenseMatrix<f64>, String> {
    let rows: Vec<Vec<f64>> = positions.iter().map(|&p| vec![p]).collect();
    DenseMatrix::from_2d_vec(&rows).map_err(|e| format!("Matrix creation failed: {}", e))
}

/// Ordinary least squares of `values` against `positions` (QR solver).
pub(crate) fn fit_line(positions: &[f64], values: &[f64]) -> Result<IndexRegression, String> {
    let x = position_matrix(positions)?;
    let params = LinearRegressionParameters::default().with_solver(LinearRegressionSolverName::QR);
    LinearRegression::fit(&x, &values.to_vec(), params).map_err(|e| format!("Fit failed: {}", e))
}

/// Evaluate a fitted line at `positions`.
pub(crate) fn evaluate_line(
    regression: &IndexRegression,
    positions: &[f64],
) -> Result<Vec<f64>, String> {
    let x = position_matrix(positions)?;
    regression
        .predict(&x)
        .map_err(|e| format!("Prediction failed: {}", e))
}

/// Persisted fit of the trend strategy: price as a line over observation
/// index. `n_observations` records how many points the fit was trained on.
#[derive(Serialize, Deserialize)]
pub struct TrendModel {
    n_observations: usize,
    regression: IndexRegression,
}

impl TrendModel {
    pub fn fit(prices: &[f64]) -> Result<Self, ForecastError> {
        let required = StrategyKind::Trend.min_observations();
        if prices.len() < required {
            return Err(ForecastError::insufficient(
                StrategyKind::Trend,
                required,
                prices.len(),
            ));
        }

        let positions: Vec<f64> = (0..prices.len()).map(|i| i as f64).collect();
        let regression = fit_line(&positions, prices)
            .map_err(|reason| ForecastError::training(StrategyKind::Trend, reason))?;

        Ok(Self {
            n_observations: prices.len(),
            regression,
        })
    }

    pub fn n_observations(&self) -> usize {
        self.n_observations
    }

    /// Prices at the `FORECAST_HORIZON` indices following a series of
    /// `series_len` observations, i.e. `series_len .. series_len + 30`.
    ///
    /// `series_len` is the length of the series being forecast, which can be
    /// longer than the one the fit was trained on.
    pub fn extrapolate(&self, series_len: usize) -> Result<Vec<f64>, ForecastError> {
        let positions: Vec<f64> = (series_len..series_len + FORECAST_HORIZON)
            .map(|i| i as f64)
            .collect();
        evaluate_line(&self.regression, &positions)
            .map_err(|reason| ForecastError::training(StrategyKind::Trend, reason))
    }

    fn check(&self) -> Result<(), String> {
        if self.n_observations < StrategyKind::Trend.min_observations() {
            return Err(format!(
                "stored fit covers only {} observations",
                self.n_observations
            ));
        }
        Ok(())
    }
}

/// Linear trend over the observation index, fitted once and persisted.
///
/// A reloaded fit keeps its coefficients but is always extrapolated from the
/// end of the series being forecast, so the horizon starts the day after the
/// latest observation. Newer prices do not refit the line until the artifact
/// is removed.
pub struct TrendStrategy {
    cache: Arc<ArtifactCache>,
    training_runs: AtomicUsize,
}

impl TrendStrategy {
    pub fn new(cache: Arc<ArtifactCache>) -> Self {
        Self {
            cache,
            training_runs: AtomicUsize::new(0),
        }
    }
}

impl ForecastStrategy for TrendStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Trend
    }

    fn forecast(&self, series: &PriceSeries) -> Result<Forecast, ForecastError> {
        let required = StrategyKind::Trend.min_observations();
        if series.len() < required {
            return Err(ForecastError::insufficient(
                StrategyKind::Trend,
                required,
                series.len(),
            ));
        }

        let model = self.cache.get_or_train(
            StrategyKind::Trend,
            TREND_ARTIFACT_KEY,
            TrendModel::check,
            || {
                self.training_runs.fetch_add(1, Ordering::SeqCst);
                info!("Fitting trend model on {} observations", series.len());
                TrendModel::fit(&series.prices())
            },
        )?;

        let values = model.extrapolate(series.len())?;
        Forecast::new(StrategyKind::Trend, values)
    }

    fn training_runs(&self) -> usize {
        self.training_runs.load(Ordering::SeqCst)
    }
}
