//! Quote value types shared by the resolver, the engine and the stores.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Read policy for a quote resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ReadMode {
    /// Serve a record younger than the freshness window, otherwise fetch.
    #[default]
    Normal,
    /// Always fetch, regardless of record age.
    ForceRefresh,
    /// Read the price cache store only. Never touches the network.
    CacheOnly,
}

impl Display for ReadMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ReadMode::Normal => "normal",
                ReadMode::ForceRefresh => "force-refresh",
                ReadMode::CacheOnly => "cache-only",
            }
        )
    }
}

/// A normalized unit price as produced by a source adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawQuote {
    pub price_usd: f64,
    pub price_cny: f64,
    pub source: String,
}

/// One row of the price cache store. At most one exists per symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedPriceRecord {
    pub symbol: String,
    pub price_usd: f64,
    pub price_cny: f64,
    pub source: String,
    pub cached_at: DateTime<Utc>,
}

/// One row of the price history store, unique on `(symbol, day)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub symbol: String,
    pub day: NaiveDate,
    pub price_usd: f64,
    pub price_cny: f64,
}

/// Resolved quote handed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub symbol: String,
    pub price_usd: f64,
    pub price_cny: f64,
    pub source: String,
    pub cached: bool,
    pub stale: bool,
    pub cached_at: DateTime<Utc>,
}

impl PriceQuote {
    /// Quote served out of the price cache store.
    pub fn from_cached(record: CachedPriceRecord, stale: bool) -> Self {
        PriceQuote {
            symbol: record.symbol,
            price_usd: record.price_usd,
            price_cny: record.price_cny,
            source: record.source,
            cached: true,
            stale,
            cached_at: record.cached_at,
        }
    }

    /// Quote produced by a fetch that just succeeded.
    pub fn fresh(record: CachedPriceRecord) -> Self {
        PriceQuote {
            symbol: record.symbol,
            price_usd: record.price_usd,
            price_cny: record.price_cny,
            source: record.source,
            cached: false,
            stale: false,
            cached_at: record.cached_at,
        }
    }
}

/// Aggregate of the exchange rates the dashboard shows alongside totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateSnapshot {
    /// Official USD/CNY rate.
    pub official_rate: f64,
    /// Street USD/CNY rate for the reference stablecoin, or the official rate.
    pub peer_to_peer_rate: f64,
    /// Raw cross price of the first pegged asset against the reference stablecoin.
    pub stablecoin_parity: f64,
    pub updated_at: DateTime<Utc>,
}

/// Canonical form of an asset symbol.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CachedPriceRecord {
        CachedPriceRecord {
            symbol: "BTC".to_string(),
            price_usd: 65000.0,
            price_cny: 468000.0,
            source: "coingecko".to_string(),
            cached_at: Utc::now(),
        }
    }

    #[test]
    fn test_read_mode_display() {
        assert_eq!(ReadMode::ForceRefresh.to_string(), "force-refresh");
        assert_eq!(ReadMode::CacheOnly.to_string(), "cache-only");
        assert_eq!(ReadMode::default(), ReadMode::Normal);
    }

    #[test]
    fn test_quote_flags() {
        let cached = PriceQuote::from_cached(record(), false);
        assert!(cached.cached);
        assert!(!cached.stale);

        let stale = PriceQuote::from_cached(record(), true);
        assert!(stale.cached && stale.stale);

        let fresh = PriceQuote::fresh(record());
        assert!(!fresh.cached);
        assert!(!fresh.stale);
        assert_eq!(fresh.price_usd, 65000.0);
    }

    #[test]
    fn test_quote_serializes_camel_case() {
        let json = serde_json::to_value(PriceQuote::fresh(record())).unwrap();
        assert_eq!(json["priceUsd"], 65000.0);
        assert_eq!(json["cached"], false);
        assert!(json.get("cachedAt").is_some());
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol(" btc "), "BTC");
        assert_eq!(normalize_symbol("Usd1"), "USD1");
    }
}
