//! CoinGecko Market Data Service
//!
//! Fetches historical closing prices from `/coins/{id}/market_chart/range`
//! and validates them into a [`PriceSeries`].

use crate::config::DEFAULT_COINGECKO_BASE_URL;
use crate::domain::market::PriceSeries;
use crate::domain::ports::MarketDataService;
use crate::infrastructure::core::http_client_factory::{HttpClientFactory, build_url_with_query};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{debug, info};

const API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// `market_chart/range` payload. Only `prices` is read; `market_caps` and
/// `total_volumes` are ignored.
#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    prices: Option<Vec<(f64, f64)>>,
}

/// Parse a `market_chart/range` body into a validated series.
///
/// A trailing sample that repeats the previous timestamp is dropped.
pub fn parse_market_chart(body: &str) -> Result<PriceSeries> {
    let response: MarketChartResponse =
        serde_json::from_str(body).context("Failed to parse CoinGecko market chart response")?;

    let raw = response
        .prices
        .context("CoinGecko market chart response has no 'prices' field")?;

    let mut pairs: Vec<(i64, f64)> = raw
        .into_iter()
        .map(|(millis, price)| (millis.round() as i64, price))
        .collect();

    if let [.., (previous, _), (last, _)] = pairs.as_slice()
        && previous == last
    {
        debug!("Dropping duplicated trailing CoinGecko sample at {} ms", last);
        pairs.pop();
    }

    Ok(PriceSeries::from_millis_pairs(&pairs)?)
}

pub struct CoinGeckoMarketDataService {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: Option<String>,
    vs_currency: String,
}

impl CoinGeckoMarketDataService {
    pub fn builder() -> CoinGeckoMarketDataServiceBuilder {
        CoinGeckoMarketDataServiceBuilder::default()
    }

    fn range_url(&self, coin_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> String {
        let url = format!(
            "{}/coins/{}/market_chart/range",
            self.base_url.trim_end_matches('/'),
            coin_id
        );
        let from = start.timestamp().to_string();
        let to = end.timestamp().to_string();
        build_url_with_query(
            &url,
            &[
                ("vs_currency", self.vs_currency.as_str()),
                ("from", from.as_str()),
                ("to", to.as_str()),
            ],
        )
    }
}

#[derive(Default)]
pub struct CoinGeckoMarketDataServiceBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    vs_currency: Option<String>,
}

impl CoinGeckoMarketDataServiceBuilder {
    pub fn base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn vs_currency(mut self, vs_currency: String) -> Self {
        self.vs_currency = Some(vs_currency);
        self
    }

    pub fn build(self) -> CoinGeckoMarketDataService {
        CoinGeckoMarketDataService {
            client: HttpClientFactory::create_client(),
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_COINGECKO_BASE_URL.to_string()),
            api_key: self.api_key,
            vs_currency: self.vs_currency.unwrap_or_else(|| "usd".to_string()),
        }
    }
}

#[async_trait]
impl MarketDataService for CoinGeckoMarketDataService {
    async fn get_price_history(
        &self,
        coin_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<PriceSeries> {
        let url = self.range_url(coin_id, start, end);

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request
            .send()
            .await
            .context("Failed to fetch market chart from CoinGecko")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("CoinGecko market chart fetch failed ({}): {}", status, error_text);
        }

        let body = response
            .text()
            .await
            .context("Failed to read CoinGecko market chart body")?;
        let series = parse_market_chart(&body)
            .with_context(|| format!("Invalid price history for '{}'", coin_id))?;

        info!(
            "CoinGeckoMarketDataService: Fetched {} prices for {}",
            series.len(),
            coin_id
        );

        Ok(series)
    }
}
