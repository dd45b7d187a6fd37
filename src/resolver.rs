//! Composes the source adapters into quotes no single upstream can produce.
//!
//! Every adapter failure is absorbed here when a defined fallback exists:
//! the official rate falls back to [`FALLBACK_USD_CNY`], the street rate to
//! the official rate and a pegged cross price to [`PARITY`]. Only spot
//! sources can fail a resolution.

use crate::core::config::{PeggedAsset, default_pegged_assets};
use crate::core::error::FetchError;
use crate::core::quote::{HistoryRecord, RateSnapshot, RawQuote, normalize_symbol};
use crate::core::source::{
    CrossRateSource, FALLBACK_USD_CNY, FiatRateSource, PARITY, PeerToPeerRateSource, QuoteSource,
    SpotPriceSource, Venue,
};
use async_trait::async_trait;
use chrono::{Days, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub const FIAT_SYMBOL: &str = "CNY";

const REFERENCE_STABLECOINS: [&str; 2] = ["USDT", "USDC"];

/// How a symbol gets priced.
enum Pricing<'a> {
    Spot(&'a Arc<dyn SpotPriceSource>),
    Pegged(&'a PeggedAsset),
    Reference,
    Fiat,
}

/// Official and street USD/CNY rates, both already defaulted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiatRates {
    pub official: f64,
    pub peer_to_peer: f64,
}

/// Real `(usd, cny)` value of one unit quoted at `cross` reference stablecoins.
pub fn peg_corrected(cross: f64, rates: FiatRates) -> (f64, f64) {
    (
        cross * (rates.peer_to_peer / rates.official),
        cross * rates.peer_to_peer,
    )
}

pub struct RateResolver {
    spot_sources: Vec<Arc<dyn SpotPriceSource>>,
    fiat: Arc<dyn FiatRateSource>,
    p2p: Arc<dyn PeerToPeerRateSource>,
    venues: HashMap<Venue, Arc<dyn CrossRateSource>>,
    pegged: Vec<PeggedAsset>,
}

impl RateResolver {
    pub fn new(fiat: Arc<dyn FiatRateSource>, p2p: Arc<dyn PeerToPeerRateSource>) -> Self {
        Self {
            spot_sources: Vec::new(),
            fiat,
            p2p,
            venues: HashMap::new(),
            pegged: default_pegged_assets(),
        }
    }

    /// Spot sources are consulted in registration order.
    pub fn with_spot_source(mut self, source: Arc<dyn SpotPriceSource>) -> Self {
        self.spot_sources.push(source);
        self
    }

    pub fn with_venue(mut self, venue: Venue, source: Arc<dyn CrossRateSource>) -> Self {
        self.venues.insert(venue, source);
        self
    }

    pub fn with_pegged(mut self, pegged: Vec<PeggedAsset>) -> Self {
        self.pegged = pegged
            .into_iter()
            .map(|p| PeggedAsset {
                symbol: normalize_symbol(&p.symbol),
                ..p
            })
            .collect();
        self
    }

    fn classify(&self, symbol: &str) -> Option<Pricing<'_>> {
        if let Some(source) = self.spot_sources.iter().find(|s| s.supports(symbol)) {
            return Some(Pricing::Spot(source));
        }
        if let Some(pegged) = self.pegged.iter().find(|p| p.symbol == symbol) {
            return Some(Pricing::Pegged(pegged));
        }
        if REFERENCE_STABLECOINS.contains(&symbol) {
            return Some(Pricing::Reference);
        }
        if symbol == FIAT_SYMBOL {
            return Some(Pricing::Fiat);
        }
        None
    }

    pub async fn official_rate(&self) -> f64 {
        match self.fiat.fetch_usd_cny().await {
            Ok(rate) if rate > 0.0 && rate.is_finite() => rate,
            Ok(rate) => {
                warn!(rate, "Ignoring invalid USD/CNY rate, using fallback");
                FALLBACK_USD_CNY
            }
            Err(e) => {
                warn!(error = %e, fallback = FALLBACK_USD_CNY, "USD/CNY rate unavailable");
                FALLBACK_USD_CNY
            }
        }
    }

    /// Official and street rates, fetched concurrently.
    pub async fn fiat_rates(&self) -> FiatRates {
        let (official, p2p) = tokio::join!(self.official_rate(), self.p2p.fetch_p2p_rate());
        let peer_to_peer = match p2p {
            Ok(Some(rate)) if rate > 0.0 && rate.is_finite() => rate,
            Ok(_) => {
                debug!("No P2P listings, using official rate");
                official
            }
            Err(e) => {
                warn!(error = %e, "P2P rate unavailable, using official rate");
                official
            }
        };
        FiatRates {
            official,
            peer_to_peer,
        }
    }

    pub async fn cross_rate(&self, pegged: &PeggedAsset) -> f64 {
        let Some(source) = self.venues.get(&pegged.venue) else {
            warn!(venue = %pegged.venue, symbol = %pegged.symbol, "No venue adapter, assuming parity");
            return PARITY;
        };
        match source.fetch_cross_rate(&pegged.instrument).await {
            Ok(price) => price,
            Err(e) => {
                warn!(error = %e, symbol = %pegged.symbol, "Cross rate unavailable, assuming parity");
                PARITY
            }
        }
    }
}

fn synthetic_series(symbol: &str, days: u32, price_cny: f64) -> Vec<HistoryRecord> {
    let today = Utc::now().date_naive();
    (0..=days)
        .rev()
        .filter_map(|ago| today.checked_sub_days(Days::new(ago as u64)))
        .map(|day| HistoryRecord {
            symbol: symbol.to_string(),
            day,
            price_usd: 1.0,
            price_cny,
        })
        .collect()
}

#[async_trait]
impl QuoteSource for RateResolver {
    async fn fetch_quote(&self, symbol: &str) -> Result<RawQuote, FetchError> {
        let symbol = normalize_symbol(symbol);
        match self.classify(&symbol) {
            Some(Pricing::Spot(source)) => source.fetch_spot(&symbol).await,
            Some(Pricing::Pegged(pegged)) => {
                let (cross, rates) = tokio::join!(self.cross_rate(pegged), self.fiat_rates());
                let (price_usd, price_cny) = peg_corrected(cross, rates);
                Ok(RawQuote {
                    price_usd,
                    price_cny,
                    source: format!("{}-{}", pegged.venue, symbol.to_lowercase()),
                })
            }
            Some(Pricing::Reference) => {
                let (price_usd, price_cny) = peg_corrected(PARITY, self.fiat_rates().await);
                Ok(RawQuote {
                    price_usd,
                    price_cny,
                    source: "p2p-rate".to_string(),
                })
            }
            Some(Pricing::Fiat) => {
                let official = self.official_rate().await;
                Ok(RawQuote {
                    price_usd: 1.0 / official,
                    price_cny: 1.0,
                    source: "exchange-rate".to_string(),
                })
            }
            None => Err(FetchError::NotConfigured(symbol)),
        }
    }

    async fn rate_snapshot(&self) -> RateSnapshot {
        let parity = async {
            match self.pegged.first() {
                Some(pegged) => self.cross_rate(pegged).await,
                None => PARITY,
            }
        };
        let (rates, stablecoin_parity) = tokio::join!(self.fiat_rates(), parity);
        RateSnapshot {
            official_rate: rates.official,
            peer_to_peer_rate: rates.peer_to_peer,
            stablecoin_parity,
            updated_at: Utc::now(),
        }
    }

    async fn fetch_history(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<HistoryRecord>, FetchError> {
        let symbol = normalize_symbol(symbol);
        match self.classify(&symbol) {
            Some(Pricing::Spot(source)) => {
                let (daily, official) =
                    tokio::join!(source.fetch_daily_usd(&symbol, days), self.official_rate());
                Ok(daily?
                    .into_iter()
                    .map(|p| HistoryRecord {
                        symbol: symbol.clone(),
                        day: p.day,
                        price_usd: p.price_usd,
                        price_cny: p.price_usd * official,
                    })
                    .collect())
            }
            Some(Pricing::Pegged(_)) | Some(Pricing::Reference) => {
                let official = self.official_rate().await;
                Ok(synthetic_series(&symbol, days, official))
            }
            Some(Pricing::Fiat) => Ok(Vec::new()),
            None => Err(FetchError::NotConfigured(symbol)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::source::DailyPrice;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockFiat {
        rate: Option<f64>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FiatRateSource for MockFiat {
        async fn fetch_usd_cny(&self) -> Result<f64, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.rate
                .ok_or_else(|| FetchError::unavailable("mock-fiat", "connection refused"))
        }
    }

    struct MockP2p {
        result: Result<Option<f64>, FetchError>,
    }

    #[async_trait]
    impl PeerToPeerRateSource for MockP2p {
        async fn fetch_p2p_rate(&self) -> Result<Option<f64>, FetchError> {
            self.result.clone()
        }
    }

    struct MockCross {
        price: Option<f64>,
    }

    #[async_trait]
    impl CrossRateSource for MockCross {
        async fn fetch_cross_rate(&self, instrument: &str) -> Result<f64, FetchError> {
            self.price
                .ok_or_else(|| FetchError::no_data("mock-venue", instrument))
        }
    }

    struct MockSpot {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SpotPriceSource for MockSpot {
        fn supports(&self, symbol: &str) -> bool {
            symbol == "BTC"
        }

        async fn fetch_spot(&self, _symbol: &str) -> Result<RawQuote, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RawQuote {
                price_usd: 65000.0,
                price_cny: 468000.0,
                source: "mock-spot".to_string(),
            })
        }

        async fn fetch_daily_usd(
            &self,
            _symbol: &str,
            _days: u32,
        ) -> Result<Vec<DailyPrice>, FetchError> {
            Ok(vec![
                DailyPrice {
                    day: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                    price_usd: 60000.0,
                },
                DailyPrice {
                    day: NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
                    price_usd: 61000.0,
                },
            ])
        }
    }

    fn build(
        official: Option<f64>,
        p2p: Result<Option<f64>, FetchError>,
        cross: Option<f64>,
    ) -> (RateResolver, Arc<MockFiat>, Arc<MockSpot>) {
        let fiat = Arc::new(MockFiat {
            rate: official,
            calls: AtomicUsize::new(0),
        });
        let spot = Arc::new(MockSpot {
            calls: AtomicUsize::new(0),
        });
        let resolver = RateResolver::new(fiat.clone(), Arc::new(MockP2p { result: p2p }))
            .with_spot_source(spot.clone())
            .with_venue(Venue::Binance, Arc::new(MockCross { price: cross }))
            .with_venue(Venue::Okx, Arc::new(MockCross { price: cross }));
        (resolver, fiat, spot)
    }

    #[test]
    fn test_peg_correction_arithmetic() {
        let rates = FiatRates {
            official: 7.2,
            peer_to_peer: 7.35,
        };
        let (usd, cny) = peg_corrected(1.001, rates);
        assert!((usd - 1.001 * (7.35 / 7.2)).abs() < 1e-12);
        assert!((usd - 1.0215).abs() < 1e-3);
        assert!((cny - 7.3574).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_pegged_asset_is_peg_corrected() {
        let (resolver, _, _) = build(Some(7.2), Ok(Some(7.35)), Some(1.001));
        let quote = resolver.fetch_quote("usd1").await.unwrap();

        assert!((quote.price_usd - 1.001 * 7.35 / 7.2).abs() < 1e-12);
        assert!((quote.price_cny - 1.001 * 7.35).abs() < 1e-12);
        assert_eq!(quote.source, "binance-usd1");

        let quote = resolver.fetch_quote("USDG").await.unwrap();
        assert_eq!(quote.source, "okx-usdg");
    }

    #[tokio::test]
    async fn test_official_rate_falls_back_to_constant() {
        let (resolver, fiat, _) = build(None, Ok(None), None);
        assert_eq!(resolver.official_rate().await, 7.2);
        assert_eq!(fiat.calls.load(Ordering::SeqCst), 1);

        let (resolver, _, _) = build(Some(-1.0), Ok(None), None);
        assert_eq!(resolver.official_rate().await, 7.2);
    }

    #[tokio::test]
    async fn test_street_rate_falls_back_to_official() {
        let (resolver, _, _) = build(Some(7.1), Ok(None), None);
        assert_eq!(resolver.fiat_rates().await.peer_to_peer, 7.1);

        let (resolver, _, _) = build(
            Some(7.1),
            Err(FetchError::unavailable("mock-p2p", "timeout")),
            None,
        );
        let quote = resolver.fetch_quote("USDT").await.unwrap();
        assert_eq!(quote.price_usd, 1.0);
        assert_eq!(quote.price_cny, 7.1);
        assert_eq!(quote.source, "p2p-rate");
    }

    #[tokio::test]
    async fn test_reference_stablecoin_uses_street_premium() {
        let (resolver, _, _) = build(Some(7.2), Ok(Some(7.38)), None);
        let quote = resolver.fetch_quote("USDC").await.unwrap();
        assert!((quote.price_usd - 7.38 / 7.2).abs() < 1e-12);
        assert_eq!(quote.price_cny, 7.38);
    }

    #[tokio::test]
    async fn test_cross_rate_failure_assumes_parity() {
        let (resolver, _, _) = build(Some(7.2), Ok(Some(7.2)), None);
        let quote = resolver.fetch_quote("USD1").await.unwrap();
        assert_eq!(quote.price_usd, 1.0);
        assert_eq!(quote.price_cny, 7.2);
    }

    #[tokio::test]
    async fn test_fiat_symbol_is_inverse_of_official() {
        let (resolver, _, _) = build(None, Ok(None), None);
        let quote = resolver.fetch_quote("CNY").await.unwrap();
        assert!((quote.price_usd - 1.0 / 7.2).abs() < 1e-12);
        assert_eq!(quote.price_cny, 1.0);
        assert_eq!(quote.source, "exchange-rate");
    }

    #[tokio::test]
    async fn test_unknown_symbol_is_not_configured_without_io() {
        let (resolver, fiat, spot) = build(Some(7.2), Ok(None), None);
        let err = resolver.fetch_quote("XYZ").await.unwrap_err();
        assert_eq!(err, FetchError::NotConfigured("XYZ".to_string()));
        assert_eq!(fiat.calls.load(Ordering::SeqCst), 0);
        assert_eq!(spot.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_spot_symbols_go_to_spot_source() {
        let (resolver, fiat, spot) = build(Some(7.2), Ok(None), None);
        let quote = resolver.fetch_quote(" btc ").await.unwrap();
        assert_eq!(quote.source, "mock-spot");
        assert_eq!(spot.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fiat.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rate_snapshot() {
        let (resolver, _, _) = build(Some(7.2), Ok(Some(7.35)), Some(1.001));
        let snapshot = resolver.rate_snapshot().await;
        assert_eq!(snapshot.official_rate, 7.2);
        assert_eq!(snapshot.peer_to_peer_rate, 7.35);
        assert_eq!(snapshot.stablecoin_parity, 1.001);

        let (resolver, _, _) = build(None, Ok(None), Some(1.001));
        let snapshot = resolver.with_pegged(Vec::new()).rate_snapshot().await;
        assert_eq!(snapshot.official_rate, 7.2);
        assert_eq!(snapshot.peer_to_peer_rate, 7.2);
        assert_eq!(snapshot.stablecoin_parity, 1.0);
    }

    #[tokio::test]
    async fn test_spot_history_converted_at_official_rate() {
        let (resolver, _, _) = build(Some(7.0), Ok(None), None);
        let rows = resolver.fetch_history("BTC", 2).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].symbol, "BTC");
        assert_eq!(rows[0].price_usd, 60000.0);
        assert_eq!(rows[0].price_cny, 420000.0);
        assert_eq!(rows[1].price_cny, 427000.0);
    }

    #[tokio::test]
    async fn test_stablecoin_history_is_synthetic() {
        let (resolver, _, _) = build(Some(7.1), Ok(None), None);
        let rows = resolver.fetch_history("USDT", 7).await.unwrap();
        assert_eq!(rows.len(), 8);
        assert_eq!(rows.last().unwrap().day, Utc::now().date_naive());
        assert!(rows.windows(2).all(|w| w[0].day < w[1].day));
        assert!(rows.iter().all(|r| r.price_usd == 1.0 && r.price_cny == 7.1));

        assert_eq!(resolver.fetch_history("USD1", 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fiat_and_unknown_history() {
        let (resolver, _, _) = build(Some(7.1), Ok(None), None);
        assert!(resolver.fetch_history("CNY", 30).await.unwrap().is_empty());
        assert!(
            resolver
                .fetch_history("XYZ", 30)
                .await
                .unwrap_err()
                .is_not_configured()
        );
    }

    #[tokio::test]
    async fn test_configured_pegged_symbols_are_normalized() {
        let (resolver, _, _) = build(Some(7.2), Ok(Some(7.2)), Some(0.999));
        let resolver = resolver.with_pegged(vec![PeggedAsset {
            symbol: "fdusd".to_string(),
            venue: Venue::Binance,
            instrument: "FDUSDUSDT".to_string(),
        }]);
        let quote = resolver.fetch_quote("FDUSD").await.unwrap();
        assert_eq!(quote.price_usd, 0.999);
        assert_eq!(quote.source, "binance-fdusd");
        // No longer pegged once the list is replaced
        assert!(resolver.fetch_quote("USD1").await.is_err());
    }
}
