//! Exchange tickers quoting pegged stablecoins against USDT.

use crate::core::error::FetchError;
use crate::core::source::CrossRateSource;
use crate::providers::util::{http_client, parse_price, read_json};
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, Deserialize)]
struct BinanceTicker {
    price: String,
}

pub struct BinanceTickerProvider {
    base_url: String,
    client: reqwest::Client,
}

impl BinanceTickerProvider {
    const PROVIDER: &'static str = "binance";

    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(timeout)?,
        })
    }
}

#[async_trait]
impl CrossRateSource for BinanceTickerProvider {
    #[instrument(name = "BinanceTickerFetch", skip(self), fields(instrument = %instrument))]
    async fn fetch_cross_rate(&self, instrument: &str) -> Result<f64, FetchError> {
        let url = format!("{}/api/v3/ticker/price?symbol={}", self.base_url, instrument);
        debug!("Requesting ticker from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::unavailable(Self::PROVIDER, e))?;

        let ticker: BinanceTicker = read_json(response, Self::PROVIDER).await?;
        let price = parse_price(&ticker.price)
            .ok_or_else(|| FetchError::no_data(Self::PROVIDER, instrument))?;
        debug!(instrument, price, "Cross rate from Binance");
        Ok(price)
    }
}

#[derive(Debug, Deserialize)]
struct OkxResponse {
    #[serde(default)]
    data: Vec<OkxTicker>,
}

#[derive(Debug, Deserialize)]
struct OkxTicker {
    last: String,
}

pub struct OkxTickerProvider {
    base_url: String,
    client: reqwest::Client,
}

impl OkxTickerProvider {
    const PROVIDER: &'static str = "okx";

    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(timeout)?,
        })
    }
}

#[async_trait]
impl CrossRateSource for OkxTickerProvider {
    #[instrument(name = "OkxTickerFetch", skip(self), fields(instrument = %instrument))]
    async fn fetch_cross_rate(&self, instrument: &str) -> Result<f64, FetchError> {
        let url = format!("{}/api/v5/market/ticker?instId={}", self.base_url, instrument);
        debug!("Requesting ticker from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::unavailable(Self::PROVIDER, e))?;

        let body: OkxResponse = read_json(response, Self::PROVIDER).await?;
        let price = body
            .data
            .first()
            .and_then(|t| parse_price(&t.last))
            .ok_or_else(|| FetchError::no_data(Self::PROVIDER, instrument))?;
        debug!(instrument, price, "Cross rate from OKX");
        Ok(price)
    }
}
