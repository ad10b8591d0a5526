use crate::domain::market::PriceSeries;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Source of historical closing prices for a single asset.
#[async_trait]
pub trait MarketDataService: Send + Sync {
    async fn get_price_history(
        &self,
        coin_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<PriceSeries>;
}

/// Keyed byte storage for trained-model artifacts.
///
/// Artifacts are a cache: a missing or unreadable entry only means the
/// owning strategy has to train again.
pub trait ArtifactStore: Send + Sync {
    fn exists(&self, key: &str) -> Result<bool>;

    /// Returns `Ok(None)` when nothing is stored under `key`.
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replace whatever is stored under `key`.
    fn save(&self, key: &str, bytes: &[u8]) -> Result<()>;
}
