//! Coincast - 30-day cryptocurrency price forecasts
//!
//! Fetches daily price history from CoinGecko, runs the selected forecasting
//! strategy and prints one predicted price per future day.
//!
//! # Usage
//! ```sh
//! cargo run -- --coin ethereum --strategy linear --days 365
//! ```
//!
//! # Environment Variables
//! - `DEFAULT_STRATEGY` - Strategy used when `--strategy` is omitted (default: lstm)
//! - `MODEL_DIR` - Directory holding trained model artifacts (default: models)
//! - `COINGECKO_API_KEY` - Optional demo API key

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::Parser;
use coincast::application::ml::ForecastRegistry;
use coincast::config::Config;
use coincast::domain::market::history_window;
use coincast::domain::ml::StrategyKind;
use coincast::domain::ports::MarketDataService;
use coincast::infrastructure::{CoinGeckoMarketDataService, FileArtifactStore};
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// CoinGecko coin id (e.g. bitcoin, ethereum, solana)
    #[arg(long, default_value = "bitcoin")]
    coin: String,

    /// Forecasting strategy: lstm, linear or prophet. Unknown names use linear.
    #[arg(long)]
    strategy: Option<String>,

    /// Days of price history to fetch
    #[arg(long)]
    days: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;

    let kind = args
        .strategy
        .as_deref()
        .map(StrategyKind::from_selection)
        .unwrap_or(config.default_strategy);
    let days = args.days.unwrap_or(config.history_days);
    let (start, end) = history_window(Utc::now(), days).context("Invalid --days")?;

    info!(
        "Coincast {} forecasting {} with {} strategy ({} days of history)",
        env!("CARGO_PKG_VERSION"),
        args.coin,
        kind,
        days
    );

    let mut builder = CoinGeckoMarketDataService::builder()
        .base_url(config.coingecko_base_url.clone())
        .vs_currency(config.vs_currency.clone());
    if let Some(key) = &config.coingecko_api_key {
        builder = builder.api_key(key.clone());
    }
    let market_data = builder.build();

    let series = market_data
        .get_price_history(&args.coin, start, end)
        .await
        .with_context(|| format!("Failed to load price history for {}", args.coin))?;

    let store = Arc::new(FileArtifactStore::new(config.model_dir.clone())?);
    let registry = ForecastRegistry::new(store, config.sequence);

    // Training is CPU-bound and may take a while on first use.
    let last_date = series.last_timestamp().date_naive();
    let forecast = tokio::task::spawn_blocking(move || registry.forecast(&series, kind))
        .await
        .context("Forecast task panicked")??;

    println!("{:<12} {:>16}", "date", format!("price ({})", config.vs_currency));
    for (day, price) in (1..).zip(forecast.values()) {
        let date = last_date + Duration::days(day);
        println!("{:<12} {:>16.2}", date.format("%Y-%m-%d").to_string(), price);
    }

    Ok(())
}
