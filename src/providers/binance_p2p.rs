use crate::core::error::FetchError;
use crate::core::source::PeerToPeerRateSource;
use crate::providers::util::{http_client, parse_price, read_json};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const PROVIDER: &str = "binance-p2p";

/// Number of best listings averaged into the street rate.
const SAMPLE_SIZE: usize = 5;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    asset: &'a str,
    fiat: &'a str,
    merchant_check: bool,
    page: u32,
    rows: u32,
    trade_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Option<Vec<Listing>>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    adv: Advert,
}

#[derive(Debug, Deserialize)]
struct Advert {
    price: String,
}

/// Street CNY price of USDT from the sell side of Binance's P2P board.
pub struct BinanceP2pProvider {
    base_url: String,
    client: reqwest::Client,
    asset: String,
    fiat: String,
}

impl BinanceP2pProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(timeout)?,
            asset: "USDT".to_string(),
            fiat: "CNY".to_string(),
        })
    }
}

/// Mean of the first [`SAMPLE_SIZE`] parseable prices.
fn average_best(prices: impl Iterator<Item = f64>) -> Option<f64> {
    let best: Vec<f64> = prices.take(SAMPLE_SIZE).collect();
    if best.is_empty() {
        return None;
    }
    Some(best.iter().sum::<f64>() / best.len() as f64)
}

#[async_trait]
impl PeerToPeerRateSource for BinanceP2pProvider {
    #[instrument(name = "P2pRateFetch", skip(self), fields(asset = %self.asset, fiat = %self.fiat))]
    async fn fetch_p2p_rate(&self) -> Result<Option<f64>, FetchError> {
        let url = format!("{}/bapi/c2c/v2/friendly/c2c/adv/search", self.base_url);
        let request = SearchRequest {
            asset: &self.asset,
            fiat: &self.fiat,
            merchant_check: true,
            page: 1,
            rows: 10,
            // Selling the stablecoin is buying the fiat
            trade_type: "SELL",
        };
        debug!("Requesting P2P listings from {}", url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| FetchError::unavailable(PROVIDER, e))?;

        let body: SearchResponse = read_json(response, PROVIDER).await?;
        let listings = body.data.unwrap_or_default();
        let rate = average_best(listings.iter().filter_map(|l| parse_price(&l.adv.price)));
        debug!(listings = listings.len(), ?rate, "P2P listings received");
        Ok(rate)
    }
}
