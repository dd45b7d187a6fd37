use crate::core::error::FetchError;
use crate::core::quote::{RawQuote, normalize_symbol};
use crate::core::source::{DailyPrice, SpotPriceSource};
use crate::providers::util::{http_client, read_json};
use anyhow::Result;
use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, instrument};

pub(crate) const PROVIDER: &str = "coingecko";

/// Built-in ticker to CoinGecko id table.
const COINGECKO_IDS: &[(&str, &str)] = &[
    ("BNB", "binancecoin"),
    ("BTC", "bitcoin"),
    ("ETH", "ethereum"),
    ("SOL", "solana"),
    ("DOGE", "dogecoin"),
    ("ADA", "cardano"),
    ("DOT", "polkadot"),
    ("MATIC", "matic-network"),
    ("AVAX", "avalanche-2"),
    ("LINK", "chainlink"),
];

#[derive(Debug, Deserialize)]
pub(crate) struct SimplePrice {
    pub usd: Option<f64>,
    pub cny: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct MarketChart {
    #[serde(default)]
    prices: Vec<(f64, f64)>,
}

/// Thin client over the two CoinGecko endpoints the adapters use.
#[derive(Clone)]
pub struct CoinGeckoClient {
    base_url: String,
    client: reqwest::Client,
    history_timeout: Duration,
}

impl CoinGeckoClient {
    pub fn new(base_url: &str, timeout: Duration, history_timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(timeout)?,
            history_timeout,
        })
    }

    /// USD and CNY unit price of a CoinGecko id.
    pub(crate) async fn simple_price(&self, coin_id: &str) -> Result<SimplePrice, FetchError> {
        let url = format!(
            "{}/api/v3/simple/price?ids={}&vs_currencies=usd,cny",
            self.base_url, coin_id
        );
        debug!("Requesting spot price from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::unavailable(PROVIDER, e))?;

        let mut prices: HashMap<String, SimplePrice> = read_json(response, PROVIDER).await?;
        prices
            .remove(coin_id)
            .ok_or_else(|| FetchError::no_data(PROVIDER, coin_id))
    }

    /// Daily USD closes, one per calendar day (UTC), oldest first.
    pub(crate) async fn daily_usd(
        &self,
        coin_id: &str,
        days: u32,
    ) -> Result<Vec<DailyPrice>, FetchError> {
        let url = format!(
            "{}/api/v3/coins/{}/market_chart?vs_currency=usd&days={}&interval=daily",
            self.base_url, coin_id, days
        );
        debug!("Requesting price history from {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(self.history_timeout)
            .send()
            .await
            .map_err(|e| FetchError::unavailable(PROVIDER, e))?;

        let chart: MarketChart = read_json(response, PROVIDER).await?;

        // Several points can fall on the same day; the latest one wins.
        let by_day: BTreeMap<_, _> = chart
            .prices
            .into_iter()
            .filter_map(|(ts_ms, price)| {
                DateTime::from_timestamp_millis(ts_ms as i64).map(|dt| (dt.date_naive(), price))
            })
            .collect();

        Ok(by_day
            .into_iter()
            .map(|(day, price_usd)| DailyPrice { day, price_usd })
            .collect())
    }
}

/// Spot prices for crypto assets with a known CoinGecko id.
pub struct CryptoSpotProvider {
    client: CoinGeckoClient,
    ids: HashMap<String, String>,
}

impl CryptoSpotProvider {
    pub fn new(client: CoinGeckoClient) -> Self {
        let ids = COINGECKO_IDS
            .iter()
            .map(|(symbol, id)| (symbol.to_string(), id.to_string()))
            .collect();
        Self { client, ids }
    }

    /// Adds or replaces symbol mappings.
    pub fn with_ids(mut self, extra: &HashMap<String, String>) -> Self {
        for (symbol, id) in extra {
            self.ids.insert(normalize_symbol(symbol), id.clone());
        }
        self
    }

    pub fn coin_id(&self, symbol: &str) -> Option<&str> {
        self.ids.get(&normalize_symbol(symbol)).map(String::as_str)
    }

    fn require_id(&self, symbol: &str) -> Result<&str, FetchError> {
        self.coin_id(symbol)
            .ok_or_else(|| FetchError::NotConfigured(symbol.to_string()))
    }
}

#[async_trait]
impl SpotPriceSource for CryptoSpotProvider {
    fn supports(&self, symbol: &str) -> bool {
        self.coin_id(symbol).is_some()
    }

    #[instrument(name = "CryptoSpotFetch", skip(self), fields(symbol = %symbol))]
    async fn fetch_spot(&self, symbol: &str) -> Result<RawQuote, FetchError> {
        let coin_id = self.require_id(symbol)?;
        let price = self.client.simple_price(coin_id).await?;

        match (price.usd, price.cny) {
            (Some(usd), Some(cny)) => Ok(RawQuote {
                price_usd: usd,
                price_cny: cny,
                source: PROVIDER.to_string(),
            }),
            _ => Err(FetchError::no_data(PROVIDER, symbol)),
        }
    }

    async fn fetch_daily_usd(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<DailyPrice>, FetchError> {
        let coin_id = self.require_id(symbol)?;
        self.client.daily_usd(coin_id, days).await
    }
}
