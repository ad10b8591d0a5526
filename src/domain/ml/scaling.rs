//! Min/max scaling between raw price units and the `[0, 1]` range.

use serde::{Deserialize, Serialize};

/// Parameters of a fitted min/max transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    min: f64,
    max: f64,
}

impl MinMaxScaler {
    /// Fit the transform to the observed range of `values`.
    /// Returns `None` for an empty slice.
    pub fn fit(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        Some(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    fn range(&self) -> f64 {
        self.max - self.min
    }

    pub fn transform(&self, value: f64) -> f64 {
        let range = self.range();
        // Constant input: every observation sits at the bottom of the range.
        if range == 0.0 {
            return 0.0;
        }
        (value - self.min) / range
    }

    pub fn inverse(&self, scaled: f64) -> f64 {
        scaled * self.range() + self.min
    }

    pub fn inverse_all(&self, scaled: &[f64]) -> Vec<f64> {
        scaled.iter().map(|&s| self.inverse(s)).collect()
    }
}

/// Prices mapped into `[0, 1]` together with the transform that produced them.
///
/// Forecasts made from a `ScaledSeries` must be mapped back with
/// [`ScaledSeries::unscale`], never with a scaler fitted elsewhere.
#[derive(Debug, Clone)]
pub struct ScaledSeries {
    scaler: MinMaxScaler,
    values: Vec<f64>,
}

impl ScaledSeries {
    pub fn from_prices(prices: &[f64]) -> Option<Self> {
        let scaler = MinMaxScaler::fit(prices)?;
        let values = prices.iter().map(|&p| scaler.transform(p)).collect();
        Some(Self { scaler, values })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn scaler(&self) -> MinMaxScaler {
        self.scaler
    }

    /// The last `n` scaled values, or `None` if the series is shorter.
    pub fn tail(&self, n: usize) -> Option<&[f64]> {
        if n > self.values.len() {
            return None;
        }
        Some(&self.values[self.values.len() - n..])
    }

    pub fn unscale(&self, scaled: &[f64]) -> Vec<f64> {
        self.scaler.inverse_all(scaled)
    }
}
