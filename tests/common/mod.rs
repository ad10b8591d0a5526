#![allow(dead_code)]

use anyhow::Result;
use chrono::{TimeZone, Utc};
use coincast::application::ml::sequence::{NetworkShape, SequenceConfig};
use coincast::domain::market::PriceSeries;
use coincast::domain::ports::ArtifactStore;
use coincast::infrastructure::InMemoryArtifactStore;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory store that counts writes.
#[derive(Default)]
pub struct CountingStore {
    inner: InMemoryArtifactStore,
    saves: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl ArtifactStore for CountingStore {
    fn exists(&self, key: &str) -> Result<bool> {
        self.inner.exists(key)
    }

    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.load(key)
    }

    fn save(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(key, bytes)
    }
}

/// Small network so tests train in milliseconds.
pub fn small_sequence_config() -> SequenceConfig {
    SequenceConfig {
        shape: NetworkShape {
            window: 60,
            lstm_units: 4,
            dense_units: 3,
        },
        ..SequenceConfig::default()
    }
}

pub fn daily_series(prices: &[f64]) -> PriceSeries {
    PriceSeries::daily(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(), prices).unwrap()
}

/// A noisy upward series of `len` daily closes.
pub fn wavy_series(len: usize) -> PriceSeries {
    let prices: Vec<f64> = (0..len)
        .map(|i| {
            let t = i as f64;
            30_000.0 + 25.0 * t + 400.0 * (t / 5.0).sin()
        })
        .collect();
    daily_series(&prices)
}
