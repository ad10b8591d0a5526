use crate::domain::errors::ForecastError;
use anyhow::{Context, ensure};
use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single closing-price observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self { timestamp, price }
    }
}

/// Chronologically ordered, non-empty closing prices with unique timestamps.
///
/// Construction validates shape; once built the series is never mutated and
/// strategies only ever borrow it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(points: Vec<PricePoint>) -> Result<Self, ForecastError> {
        if points.is_empty() {
            return Err(ForecastError::upstream("price series is empty"));
        }

        for (idx, point) in points.iter().enumerate() {
            if !point.price.is_finite() || point.price < 0.0 {
                return Err(ForecastError::upstream(format!(
                    "invalid price {} at position {}",
                    point.price, idx
                )));
            }
        }

        if let Some(idx) = points
            .windows(2)
            .position(|pair| pair[1].timestamp <= pair[0].timestamp)
        {
            return Err(ForecastError::upstream(format!(
                "timestamps are not strictly increasing at position {} ({} after {})",
                idx + 1,
                points[idx + 1].timestamp,
                points[idx].timestamp
            )));
        }

        Ok(Self { points })
    }

    /// Build a series from the `(timestamp_ms, price)` pairs returned by the
    /// market-data provider.
    pub fn from_millis_pairs(pairs: &[(i64, f64)]) -> Result<Self, ForecastError> {
        let points = pairs
            .iter()
            .map(|&(millis, price)| {
                Utc.timestamp_millis_opt(millis)
                    .single()
                    .map(|timestamp| PricePoint::new(timestamp, price))
                    .ok_or_else(|| {
                        ForecastError::upstream(format!("timestamp {} ms is out of range", millis))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(points)
    }

    /// Daily closes starting at `start`, one point per day. Mostly useful for
    /// fixtures and callers that already hold a plain price list.
    pub fn daily(start: DateTime<Utc>, prices: &[f64]) -> Result<Self, ForecastError> {
        let points = prices
            .iter()
            .enumerate()
            .map(|(i, &price)| PricePoint::new(start + chrono::Duration::days(i as i64), price))
            .collect();
        Self::new(points)
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false: an empty series cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_timestamp(&self) -> DateTime<Utc> {
        self.points[0].timestamp
    }

    pub fn last_timestamp(&self) -> DateTime<Utc> {
        self.points[self.points.len() - 1].timestamp
    }

    pub fn last_price(&self) -> f64 {
        self.points[self.points.len() - 1].price
    }

    /// Number of distinct UTC calendar dates covered by the observations.
    pub fn distinct_dates(&self) -> usize {
        self.points
            .iter()
            .map(|p| p.timestamp.date_naive())
            .collect::<BTreeSet<NaiveDate>>()
            .len()
    }
}

/// Start and end of a history request covering `days` days up to `end`.
pub fn history_window(
    end: DateTime<Utc>,
    days: i64,
) -> anyhow::Result<(DateTime<Utc>, DateTime<Utc>)> {
    ensure!(days > 0, "history length must be positive, got {} days", days);
    let span = TimeDelta::try_days(days)
        .with_context(|| format!("history length of {} days is out of range", days))?;
    let start = end
        .checked_sub_signed(span)
        .with_context(|| format!("{} days before {} is out of range", days, end))?;
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    #[test]
    fn test_from_millis_pairs() {
        let series =
            PriceSeries::from_millis_pairs(&[(1_700_000_000_000, 35_000.0), (1_700_086_400_000, 35_500.0)])
                .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.first_timestamp(), ts(1_700_000_000_000));
        assert_eq!(series.last_price(), 35_500.0);
        assert_eq!(series.distinct_dates(), 2);
    }

    #[test]
    fn test_rejects_empty() {
        let err = PriceSeries::from_millis_pairs(&[]).unwrap_err();
        assert!(matches!(err, ForecastError::UpstreamDataError { .. }));
    }

    #[test]
    fn test_rejects_unordered_and_duplicates() {
        let unordered = PriceSeries::from_millis_pairs(&[(2_000, 1.0), (1_000, 2.0)]);
        assert!(matches!(unordered, Err(ForecastError::UpstreamDataError { .. })));

        let duplicate = PriceSeries::from_millis_pairs(&[(1_000, 1.0), (1_000, 2.0)]);
        assert!(matches!(duplicate, Err(ForecastError::UpstreamDataError { .. })));
    }

    #[test]
    fn test_rejects_bad_prices() {
        let nan = PriceSeries::from_millis_pairs(&[(1_000, f64::NAN)]);
        assert!(matches!(nan, Err(ForecastError::UpstreamDataError { .. })));

        let negative = PriceSeries::from_millis_pairs(&[(1_000, -3.0)]);
        assert!(matches!(negative, Err(ForecastError::UpstreamDataError { .. })));
    }

    #[test]
    fn test_intraday_points_share_a_date() {
        let hour = 3_600_000;
        let series = PriceSeries::from_millis_pairs(&[
            (1_700_006_400_000, 1.0),
            (1_700_006_400_000 + hour, 2.0),
            (1_700_006_400_000 + 2 * hour, 3.0),
        ])
        .unwrap();
        assert_eq!(series.distinct_dates(), 1);
    }

    #[test]
    fn test_history_window_spans_requested_days() {
        let end = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let (start, until) = history_window(end, 30).unwrap();
        assert_eq!(until, end);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_history_window_rejects_out_of_range_days() {
        let end = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert!(history_window(end, 0).is_err());
        assert!(history_window(end, -5).is_err());
        assert!(history_window(end, i64::MAX).is_err());
        assert!(history_window(end, 200_000_000).is_err());
    }
}
