//! Configuration module for Coincast.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Model and Market Data.

mod market_data_config;
mod model_config;

pub use market_data_config::{DEFAULT_COINGECKO_BASE_URL, MarketDataEnvConfig};
pub use model_config::ModelEnvConfig;

use crate::application::ml::sequence::SequenceConfig;
use crate::domain::ml::StrategyKind;
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

/// Main application configuration.
///
/// Aggregates the sub-configs and flattens the fields the rest of the
/// application reads.
#[derive(Debug, Clone)]
pub struct Config {
    // Strategy
    pub default_strategy: StrategyKind,

    // Model (from ModelEnvConfig)
    pub model_dir: PathBuf,
    pub sequence: SequenceConfig,

    // Market data (from MarketDataEnvConfig)
    pub coingecko_base_url: String,
    pub coingecko_api_key: Option<String>,
    pub history_days: i64,
    pub vs_currency: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// An unrecognised `DEFAULT_STRATEGY` falls back to the default strategy
    /// with a warning; malformed numeric values are errors.
    pub fn from_env() -> Result<Self> {
        let strategy_str = env::var("DEFAULT_STRATEGY").unwrap_or_else(|_| "lstm".to_string());
        let default_strategy = StrategyKind::from_selection(&strategy_str);

        let model = ModelEnvConfig::from_env().context("Failed to load model config")?;
        let market_data =
            MarketDataEnvConfig::from_env().context("Failed to load market data config")?;

        Ok(Self {
            default_strategy,

            sequence: model.sequence_config(),
            model_dir: model.model_dir,

            coingecko_base_url: market_data.base_url,
            coingecko_api_key: market_data.api_key,
            history_days: market_data.history_days,
            vs_currency: market_data.vs_currency,
        })
    }
}
