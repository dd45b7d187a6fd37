//! Physical gold, priced per gram from a troy-ounce backed token.

use crate::core::error::FetchError;
use crate::core::quote::{RawQuote, normalize_symbol};
use crate::core::source::{DailyPrice, SpotPriceSource, TROY_OUNCE_GRAMS};
use crate::providers::coingecko::{CoinGeckoClient, PROVIDER};
use async_trait::async_trait;
use tracing::instrument;

pub const GOLD_SYMBOL: &str = "XAU";

/// Each PAXG token is one fine troy ounce.
const GOLD_INSTRUMENT: &str = "pax-gold";

pub struct GoldProvider {
    client: CoinGeckoClient,
}

impl GoldProvider {
    pub fn new(client: CoinGeckoClient) -> Self {
        Self { client }
    }
}

pub fn per_gram(price_per_ounce: f64) -> f64 {
    price_per_ounce / TROY_OUNCE_GRAMS
}

#[async_trait]
impl SpotPriceSource for GoldProvider {
    fn supports(&self, symbol: &str) -> bool {
        normalize_symbol(symbol) == GOLD_SYMBOL
    }

    #[instrument(name = "GoldSpotFetch", skip(self), fields(symbol = %symbol))]
    async fn fetch_spot(&self, symbol: &str) -> Result<RawQuote, FetchError> {
        if !self.supports(symbol) {
            return Err(FetchError::NotConfigured(symbol.to_string()));
        }

        let price = self.client.simple_price(GOLD_INSTRUMENT).await?;
        match (price.usd, price.cny) {
            (Some(usd), Some(cny)) => Ok(RawQuote {
                price_usd: per_gram(usd),
                price_cny: per_gram(cny),
                source: format!("{PROVIDER}-paxg"),
            }),
            _ => Err(FetchError::no_data(PROVIDER, GOLD_INSTRUMENT)),
        }
    }

    async fn fetch_daily_usd(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<DailyPrice>, FetchError> {
        if !self.supports(symbol) {
            return Err(FetchError::NotConfigured(symbol.to_string()));
        }

        let ounces = self.client.daily_usd(GOLD_INSTRUMENT, days).await?;
        Ok(ounces
            .into_iter()
            .map(|p| DailyPrice {
                day: p.day,
                price_usd: per_gram(p.price_usd),
            })
            .collect())
    }
}
