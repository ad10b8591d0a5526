//! Market data configuration parsing from environment variables.
//!
//! This module handles the CoinGecko endpoint, credentials and history window.

use anyhow::{Context, Result, ensure};
use std::env;

pub const DEFAULT_COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Market data environment configuration
#[derive(Debug, Clone, PartialEq)]
pub struct MarketDataEnvConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub history_days: i64,
    pub vs_currency: String,
}

impl Default for MarketDataEnvConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_COINGECKO_BASE_URL.to_string(),
            api_key: None,
            history_days: 730,
            vs_currency: "usd".to_string(),
        }
    }
}

impl MarketDataEnvConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let history_days = env::var("HISTORY_DAYS")
            .unwrap_or_else(|_| defaults.history_days.to_string())
            .parse::<i64>()
            .context("Failed to parse HISTORY_DAYS")?;
        ensure!(history_days > 0, "HISTORY_DAYS must be positive");

        Ok(Self {
            base_url: env::var("COINGECKO_BASE_URL").unwrap_or(defaults.base_url),
            api_key: env::var("COINGECKO_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            history_days,
            vs_currency: env::var("VS_CURRENCY")
                .map(|c| c.to_lowercase())
                .unwrap_or(defaults.vs_currency),
        })
    }
}
