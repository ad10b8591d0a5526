//! Additive decomposition forecaster.
//!
//! The series is split into a linear trend over elapsed days, an hour-of-day
//! profile and a day-of-week profile. Each profile is the mean residual of
//! its bucket after removing the components before it. The forecast is the
//! sum of the three components evaluated one to thirty days past the last
//! observation.

use crate::application::ml::strategy::ForecastStrategy;
use crate::application::ml::trend::{IndexRegression, evaluate_line, fit_line};
use crate::domain::errors::ForecastError;
use crate::domain::market::PriceSeries;
use crate::domain::ml::{FORECAST_HORIZON, Forecast, StrategyKind};
use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

const MILLIS_PER_DAY: f64 = 86_400_000.0;
/// Minimum span before a weekly profile is fitted (two full weeks).
const WEEKLY_MIN_SPAN_DAYS: f64 = 14.0;
/// Minimum average observations per calendar date before an hour-of-day
/// profile is fitted.
const DAILY_MIN_POINTS_PER_DATE: f64 = 2.0;

fn days_between(origin: DateTime<Utc>, timestamp: DateTime<Utc>) -> f64 {
    (timestamp - origin).num_milliseconds() as f64 / MILLIS_PER_DAY
}

fn hour_bucket(timestamp: DateTime<Utc>) -> usize {
    timestamp.hour() as usize
}

fn weekday_bucket(timestamp: DateTime<Utc>) -> usize {
    timestamp.weekday().num_days_from_monday() as usize
}

/// Mean of `values` per bucket; empty buckets stay at zero.
fn bucket_means<const N: usize>(values: &[f64], buckets: &[usize]) -> [f64; N] {
    let mut sums = [0.0; N];
    let mut counts = [0usize; N];
    for (&value, &bucket) in values.iter().zip(buckets) {
        sums[bucket] += value;
        counts[bucket] += 1;
    }
    let mut means = [0.0; N];
    for (mean, (sum, count)) in means.iter_mut().zip(sums.iter().zip(counts)) {
        if count > 0 {
            *mean = sum / count as f64;
        }
    }
    means
}

/// Fitted components of one series. Never persisted.
pub struct SeasonalModel {
    origin: DateTime<Utc>,
    trend: IndexRegression,
    daily: Option<[f64; 24]>,
    weekly: Option<[f64; 7]>,
}

impl SeasonalModel {
    pub fn fit(series: &PriceSeries) -> Result<Self, ForecastError> {
        let required = StrategyKind::Seasonal.min_observations();
        let dates = series.distinct_dates();
        if dates < required {
            return Err(ForecastError::insufficient(
                StrategyKind::Seasonal,
                required,
                dates,
            ));
        }

        let origin = series.first_timestamp();
        let timestamps: Vec<DateTime<Utc>> = series.points().iter().map(|p| p.timestamp).collect();
        let positions: Vec<f64> = timestamps
            .iter()
            .map(|&ts| days_between(origin, ts))
            .collect();
        let prices = series.prices();

        let to_training = |reason: String| ForecastError::training(StrategyKind::Seasonal, reason);
        let trend = fit_line(&positions, &prices).map_err(to_training)?;
        let fitted = evaluate_line(&trend, &positions).map_err(to_training)?;

        let mut residuals: Vec<f64> = prices
            .iter()
            .zip(fitted.iter())
            .map(|(price, fit)| price - fit)
            .collect();

        let daily = if series.len() as f64 / dates as f64 >= DAILY_MIN_POINTS_PER_DATE {
            let hours: Vec<usize> = timestamps.iter().map(|&ts| hour_bucket(ts)).collect();
            let profile: [f64; 24] = bucket_means(&residuals, &hours);
            for (residual, &hour) in residuals.iter_mut().zip(&hours) {
                *residual -= profile[hour];
            }
            Some(profile)
        } else {
            None
        };

        let span_days = positions.last().copied().unwrap_or(0.0);
        let weekly = if span_days >= WEEKLY_MIN_SPAN_DAYS {
            let weekdays: Vec<usize> = timestamps.iter().map(|&ts| weekday_bucket(ts)).collect();
            Some(bucket_means(&residuals, &weekdays))
        } else {
            None
        };

        debug!(
            "Seasonal fit over {:.1} days: daily profile {}, weekly profile {}",
            span_days,
            daily.is_some(),
            weekly.is_some()
        );

        Ok(Self {
            origin,
            trend,
            daily,
            weekly,
        })
    }

    pub fn daily_profile(&self) -> Option<&[f64; 24]> {
        self.daily.as_ref()
    }

    pub fn weekly_profile(&self) -> Option<&[f64; 7]> {
        self.weekly.as_ref()
    }

    /// Combined trend and seasonal prediction at each of `timestamps`.
    pub fn predict(&self, timestamps: &[DateTime<Utc>]) -> Result<Vec<f64>, ForecastError> {
        let positions: Vec<f64> = timestamps
            .iter()
            .map(|&ts| days_between(self.origin, ts))
            .collect();
        let trend = evaluate_line(&self.trend, &positions)
            .map_err(|reason| ForecastError::training(StrategyKind::Seasonal, reason))?;

        Ok(timestamps
            .iter()
            .zip(trend)
            .map(|(&ts, level)| {
                let daily = self.daily.map_or(0.0, |p| p[hour_bucket(ts)]);
                let weekly = self.weekly.map_or(0.0, |p| p[weekday_bucket(ts)]);
                level + daily + weekly
            })
            .collect())
    }
}

/// Future timestamps one to `FORECAST_HORIZON` calendar days after `last`.
pub fn horizon_after(last: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    (1..=FORECAST_HORIZON as i64)
        .map(|day| last + Duration::days(day))
        .collect()
}

/// Refits a [`SeasonalModel`] on every call.
#[derive(Default)]
pub struct SeasonalStrategy {
    training_runs: AtomicUsize,
}

impl SeasonalStrategy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ForecastStrategy for SeasonalStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Seasonal
    }

    fn forecast(&self, series: &PriceSeries) -> Result<Forecast, ForecastError> {
        let model = SeasonalModel::fit(series)?;
        self.training_runs.fetch_add(1, Ordering::SeqCst);

        let values = model.predict(&horizon_after(series.last_timestamp()))?;
        Forecast::new(StrategyKind::Seasonal, values)
    }

    fn training_runs(&self) -> usize {
        self.training_runs.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::PricePoint;
    use chrono::TimeZone;
    use std::f64::consts::PI;

    fn monday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_single_date_is_insufficient() {
        let points = (0..5)
            .map(|h| PricePoint::new(monday() + Duration::hours(h), 100.0 + h as f64))
            .collect();
        let series = PriceSeries::new(points).unwrap();

        let err = SeasonalStrategy::new().forecast(&series).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::DataInsufficient {
                strategy: StrategyKind::Seasonal,
                required: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_two_dates_extrapolate_the_line() {
        let series = PriceSeries::daily(monday(), &[10.0, 11.0]).unwrap();
        let strategy = SeasonalStrategy::new();
        let forecast = strategy.forecast(&series).unwrap();

        assert_eq!(forecast.len(), FORECAST_HORIZON);
        assert!((forecast.values()[0] - 12.0).abs() < 1e-9);
        assert!((forecast.values()[29] - 41.0).abs() < 1e-9);
        assert_eq!(strategy.training_runs(), 1);
    }

    #[test]
    fn test_refits_every_call() {
        let series = PriceSeries::daily(monday(), &[10.0, 11.0, 13.0]).unwrap();
        let strategy = SeasonalStrategy::new();
        strategy.forecast(&series).unwrap();
        strategy.forecast(&series).unwrap();
        assert_eq!(strategy.training_runs(), 2);
    }

    #[test]
    fn test_recovers_weekend_bump() {
        // Eight full weeks starting on a Monday; weekends trade 10 higher.
        let prices: Vec<f64> = (0..56)
            .map(|day| {
                let weekend = if day % 7 >= 5 { 10.0 } else { 0.0 };
                100.0 + 0.5 * day as f64 + weekend
            })
            .collect();
        let series = PriceSeries::daily(monday(), &prices).unwrap();
        let model = SeasonalModel::fit(&series).unwrap();

        assert!(model.daily_profile().is_none());
        let weekly = model.weekly_profile().unwrap();
        assert!((weekly[5] - weekly[4] - 10.0).abs() < 0.5);

        let forecast = SeasonalStrategy::new().forecast(&series).unwrap();
        // Last observation is a Sunday: index 4 is Friday, index 5 Saturday.
        assert!(forecast.values()[5] - forecast.values()[4] > 9.0);
    }

    #[test]
    fn test_recovers_intraday_cycle() {
        let points = (0..240)
            .map(|h| {
                let hour = (h % 24) as f64;
                PricePoint::new(
                    monday() + Duration::hours(h),
                    50.0 + 5.0 * (2.0 * PI * hour / 24.0).sin(),
                )
            })
            .collect();
        let series = PriceSeries::new(points).unwrap();
        let model = SeasonalModel::fit(&series).unwrap();

        let daily = model.daily_profile().unwrap();
        assert!((daily[6] - 5.0).abs() < 0.2);
        assert!((daily[18] + 5.0).abs() < 0.2);
        assert!(daily[0].abs() < 0.2);
        // Ten days is too short for a weekly profile.
        assert!(model.weekly_profile().is_none());
    }

    #[test]
    fn test_horizon_is_consecutive_calendar_days() {
        let last = Utc.with_ymd_and_hms(2024, 2, 27, 15, 30, 0).unwrap();
        let horizon = horizon_after(last);
        assert_eq!(horizon.len(), FORECAST_HORIZON);
        assert_eq!(horizon[0], Utc.with_ymd_and_hms(2024, 2, 28, 15, 30, 0).unwrap());
        assert_eq!(horizon[1], Utc.with_ymd_and_hms(2024, 2, 29, 15, 30, 0).unwrap());
        assert_eq!(horizon[29], Utc.with_ymd_and_hms(2024, 3, 28, 15, 30, 0).unwrap());
    }
}
