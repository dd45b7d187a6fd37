//! Seams between the upstream adapters, the rate resolver and the engine.

use crate::core::error::FetchError;
use crate::core::quote::{HistoryRecord, RateSnapshot, RawQuote};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Grams in one troy ounce.
pub const TROY_OUNCE_GRAMS: f64 = 31.1035;

/// Official USD/CNY rate used when the fiat-rate adapter cannot be reached.
pub const FALLBACK_USD_CNY: f64 = 7.2;

/// Cross price assumed for a pegged asset when its venue cannot be reached.
pub const PARITY: f64 = 1.0;

/// One daily close in USD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyPrice {
    pub day: NaiveDate,
    pub price_usd: f64,
}

/// Exchange venue quoting pegged assets against the reference stablecoin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    Binance,
    Okx,
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Venue::Binance => write!(f, "binance"),
            Venue::Okx => write!(f, "okx"),
        }
    }
}

/// Dual-currency spot prices for a fixed set of symbols.
#[async_trait]
pub trait SpotPriceSource: Send + Sync {
    fn supports(&self, symbol: &str) -> bool;

    async fn fetch_spot(&self, symbol: &str) -> Result<RawQuote, FetchError>;

    /// Daily USD closes for the last `days` days, oldest first.
    async fn fetch_daily_usd(&self, symbol: &str, days: u32)
    -> Result<Vec<DailyPrice>, FetchError>;
}

/// Official USD/CNY rate.
#[async_trait]
pub trait FiatRateSource: Send + Sync {
    async fn fetch_usd_cny(&self) -> Result<f64, FetchError>;
}

/// Over-the-counter CNY price of the reference stablecoin.
#[async_trait]
pub trait PeerToPeerRateSource: Send + Sync {
    /// `Ok(None)` when the listing service returned no listings.
    async fn fetch_p2p_rate(&self) -> Result<Option<f64>, FetchError>;
}

/// Live cross price of a pegged instrument on a venue.
#[async_trait]
pub trait CrossRateSource: Send + Sync {
    async fn fetch_cross_rate(&self, instrument: &str) -> Result<f64, FetchError>;
}

/// Everything the quote engine needs from upstream.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_quote(&self, symbol: &str) -> Result<RawQuote, FetchError>;

    async fn rate_snapshot(&self) -> RateSnapshot;

    async fn fetch_history(&self, symbol: &str, days: u32)
    -> Result<Vec<HistoryRecord>, FetchError>;
}
