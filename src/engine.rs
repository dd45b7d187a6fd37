//! Quote resolution: read policies, write-through, stale fallback and the
//! memory-cached read paths.

use crate::core::cache::MemoryCache;
use crate::core::quote::{
    CachedPriceRecord, HistoryRecord, PriceQuote, RateSnapshot, ReadMode, normalize_symbol,
};
use crate::core::source::QuoteSource;
use crate::core::store::PriceStore;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_BACKFILL_DELAY: Duration = Duration::from_millis(500);

/// Day count of the all-symbol history aggregate kept in memory.
pub const HISTORY_WINDOW_DAYS: u32 = 30;

pub const LAST_FULL_REFRESH_KEY: &str = "last_full_refresh";

#[derive(Clone)]
pub struct QuoteEngine {
    source: Arc<dyn QuoteSource>,
    store: Arc<dyn PriceStore>,
    memory: MemoryCache,
    freshness_window: Duration,
    backfill_delay: Duration,
}

impl QuoteEngine {
    pub fn new(
        source: Arc<dyn QuoteSource>,
        store: Arc<dyn PriceStore>,
        memory: MemoryCache,
    ) -> Self {
        Self {
            source,
            store,
            memory,
            freshness_window: DEFAULT_FRESHNESS_WINDOW,
            backfill_delay: DEFAULT_BACKFILL_DELAY,
        }
    }

    pub fn with_freshness_window(mut self, window: Duration) -> Self {
        self.freshness_window = window;
        self
    }

    pub fn with_backfill_delay(mut self, delay: Duration) -> Self {
        self.backfill_delay = delay;
        self
    }

    pub fn store(&self) -> &Arc<dyn PriceStore> {
        &self.store
    }

    fn cached_record(&self, symbol: &str) -> Option<CachedPriceRecord> {
        match self.store.get_cached_price(symbol) {
            Ok(record) => record,
            Err(e) => {
                warn!(%symbol, error = %e, "Failed to read price cache, treating as empty");
                None
            }
        }
    }

    fn is_fresh(&self, record: &CachedPriceRecord) -> bool {
        // A timestamp in the future counts as age zero
        let age = (Utc::now() - record.cached_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        age < self.freshness_window
    }

    /// Writes a fetched quote through to both stores.
    fn record_fresh(&self, record: CachedPriceRecord) -> PriceQuote {
        if let Err(e) = self.store.upsert_cached_price(&record) {
            warn!(symbol = %record.symbol, error = %e, "Failed to update price cache");
        }
        let row = HistoryRecord {
            symbol: record.symbol.clone(),
            day: record.cached_at.date_naive(),
            price_usd: record.price_usd,
            price_cny: record.price_cny,
        };
        if let Err(e) = self.store.append_history(&row) {
            warn!(symbol = %record.symbol, error = %e, "Failed to append price history");
        }
        PriceQuote::fresh(record)
    }

    /// Resolves one symbol under `mode`. `None` means unpriced.
    #[instrument(skip(self))]
    pub async fn resolve(&self, symbol: &str, mode: ReadMode) -> Option<PriceQuote> {
        let symbol = normalize_symbol(symbol);
        let cached = self.cached_record(&symbol);

        match mode {
            ReadMode::CacheOnly => {
                return cached.map(|record| PriceQuote::from_cached(record, false));
            }
            ReadMode::Normal => {
                if let Some(record) = &cached
                    && self.is_fresh(record)
                {
                    debug!(%symbol, "Serving fresh cached price");
                    return Some(PriceQuote::from_cached(record.clone(), false));
                }
            }
            ReadMode::ForceRefresh => {}
        }

        match self.source.fetch_quote(&symbol).await {
            Ok(raw) => {
                debug!(%symbol, source = %raw.source, "Fetched fresh price");
                Some(self.record_fresh(CachedPriceRecord {
                    symbol,
                    price_usd: raw.price_usd,
                    price_cny: raw.price_cny,
                    source: raw.source,
                    cached_at: Utc::now(),
                }))
            }
            Err(e) if e.is_not_configured() => {
                debug!(%symbol, "No price source for symbol");
                None
            }
            Err(e) => match cached {
                Some(record) => {
                    warn!(%symbol, error = %e, cached_at = %record.cached_at, "Fetch failed, serving stale price");
                    Some(PriceQuote::from_cached(record, true))
                }
                None => {
                    warn!(%symbol, error = %e, "Fetch failed and nothing cached");
                    None
                }
            },
        }
    }

    /// Resolves every distinct symbol concurrently. Unpriced symbols are left out.
    pub async fn resolve_all<S: AsRef<str>>(
        &self,
        symbols: &[S],
        mode: ReadMode,
    ) -> HashMap<String, PriceQuote> {
        let distinct: BTreeSet<String> = symbols
            .iter()
            .map(|s| normalize_symbol(s.as_ref()))
            .filter(|s| !s.is_empty())
            .collect();

        let results = join_all(distinct.iter().map(|symbol| self.resolve(symbol, mode))).await;

        let prices: HashMap<String, PriceQuote> = results
            .into_iter()
            .flatten()
            .map(|quote| (quote.symbol.clone(), quote))
            .collect();
        debug!(requested = distinct.len(), priced = prices.len(), %mode, "Batch resolution done");
        prices
    }

    pub async fn refresh_all<S: AsRef<str>>(&self, symbols: &[S]) -> HashMap<String, PriceQuote> {
        self.resolve_all(symbols, ReadMode::ForceRefresh).await
    }

    /// Rate snapshot from memory, refilled from upstream on a miss.
    pub async fn rate_snapshot(&self) -> RateSnapshot {
        match self.memory.rates.get().await {
            Some(snapshot) => snapshot,
            None => self.refresh_rate_snapshot().await,
        }
    }

    pub async fn refresh_rate_snapshot(&self) -> RateSnapshot {
        let snapshot = self.source.rate_snapshot().await;
        self.memory.rates.set(snapshot.clone()).await;
        snapshot
    }

    /// Stored history. The all-symbol 30 day read is served from memory.
    pub async fn history(&self, symbol: Option<&str>, days: u32) -> Vec<HistoryRecord> {
        let result = match symbol {
            Some(symbol) => self
                .store
                .get_history(&normalize_symbol(symbol), days as usize),
            None if days == HISTORY_WINDOW_DAYS => {
                if let Some(rows) = self.memory.history.get().await {
                    return rows;
                }
                return self.reload_history_cache().await;
            }
            None => self.store.get_all_history(days),
        };
        result.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read price history");
            Vec::new()
        })
    }

    /// Reloads the 30 day aggregate from the store into memory. No network.
    /// An empty read leaves the current aggregate in place.
    pub async fn reload_history_cache(&self) -> Vec<HistoryRecord> {
        match self.store.get_all_history(HISTORY_WINDOW_DAYS) {
            Ok(rows) if rows.is_empty() => {
                debug!("No stored history, keeping current aggregate");
                rows
            }
            Ok(rows) => {
                debug!(rows = rows.len(), "Reloaded history aggregate");
                self.memory.history.set(rows.clone()).await;
                rows
            }
            Err(e) => {
                warn!(error = %e, "Failed to load history aggregate");
                Vec::new()
            }
        }
    }

    /// Fetches `days` of history per symbol, one symbol at a time with a
    /// pause between upstream calls, and stores everything in one batch.
    pub async fn backfill_history<S: AsRef<str>>(
        &self,
        symbols: &[S],
        days: u32,
    ) -> Vec<HistoryRecord> {
        let distinct: BTreeSet<String> = symbols
            .iter()
            .map(|s| normalize_symbol(s.as_ref()))
            .filter(|s| !s.is_empty())
            .collect();

        let mut collected = Vec::new();
        for (i, symbol) in distinct.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.backfill_delay).await;
            }
            match self.source.fetch_history(symbol, days).await {
                Ok(rows) => {
                    info!(%symbol, rows = rows.len(), "Fetched price history");
                    collected.extend(rows);
                }
                Err(e) if e.is_not_configured() => debug!(%symbol, "No history source"),
                Err(e) => warn!(%symbol, error = %e, "Failed to fetch price history"),
            }
        }

        if !collected.is_empty()
            && let Err(e) = self.store.append_history_batch(&collected)
        {
            warn!(error = %e, rows = collected.len(), "Failed to store backfilled history");
        }
        self.memory.history.clear().await;
        collected
    }

    /// Best effort: rate snapshot and history aggregate.
    pub async fn warm_up(&self) {
        let (snapshot, history) =
            tokio::join!(self.refresh_rate_snapshot(), self.reload_history_cache());
        let cached_prices = self
            .store
            .list_cached_prices()
            .map(|records| records.len())
            .unwrap_or_default();
        info!(
            official_rate = snapshot.official_rate,
            history_rows = history.len(),
            cached_prices,
            "Caches warmed up"
        );
    }

    pub fn mark_full_refresh(&self, at: DateTime<Utc>) {
        if let Err(e) = self
            .store
            .set_setting(LAST_FULL_REFRESH_KEY, &at.to_rfc3339())
        {
            warn!(error = %e, "Failed to record full refresh time");
        }
    }

    pub fn last_full_refresh(&self) -> Option<DateTime<Utc>> {
        let value = self.store.get_setting(LAST_FULL_REFRESH_KEY).ok().flatten()?;
        DateTime::parse_from_rfc3339(&value)
            .map(|at| at.with_timezone(&Utc))
            .ok()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::error::FetchError;
    use crate::core::quote::RawQuote;
    use crate::store::memory::MemoryStore;
    use async_trait::async_trait;
    use chrono::Days;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    /// Upstream stand-in that counts every call.
    #[derive(Default)]
    pub(crate) struct MockSource {
        quotes: Mutex<HashMap<String, Result<RawQuote, FetchError>>>,
        pub quote_calls: AtomicUsize,
        pub snapshot_calls: AtomicUsize,
        pub history_calls: AtomicUsize,
    }

    impl MockSource {
        pub(crate) fn set_price(&self, symbol: &str, usd: f64, cny: f64) {
            self.quotes.lock().unwrap().insert(
                symbol.to_string(),
                Ok(RawQuote {
                    price_usd: usd,
                    price_cny: cny,
                    source: "mock".to_string(),
                }),
            );
        }

        pub(crate) fn set_failing(&self, symbol: &str) {
            self.quotes.lock().unwrap().insert(
                symbol.to_string(),
                Err(FetchError::unavailable("mock", "connection reset")),
            );
        }

        pub(crate) fn calls(&self) -> usize {
            self.quote_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl QuoteSource for MockSource {
        async fn fetch_quote(&self, symbol: &str) -> Result<RawQuote, FetchError> {
            self.quote_calls.fetch_add(1, Ordering::SeqCst);
            self.quotes
                .lock()
                .unwrap()
                .get(symbol)
                .cloned()
                .unwrap_or_else(|| Err(FetchError::NotConfigured(symbol.to_string())))
        }

        async fn rate_snapshot(&self) -> RateSnapshot {
            self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
            RateSnapshot {
                official_rate: 7.2,
                peer_to_peer_rate: 7.35,
                stablecoin_parity: 1.001,
                updated_at: Utc::now(),
            }
        }

        async fn fetch_history(
            &self,
            symbol: &str,
            days: u32,
        ) -> Result<Vec<HistoryRecord>, FetchError> {
            self.history_calls.fetch_add(1, Ordering::SeqCst);
            match self.quotes.lock().unwrap().get(symbol) {
                Some(Ok(raw)) => Ok((0..days as u64)
                    .map(|ago| HistoryRecord {
                        symbol: symbol.to_string(),
                        day: days_ago(ago),
                        price_usd: raw.price_usd,
                        price_cny: raw.price_cny,
                    })
                    .collect()),
                Some(Err(e)) => Err(e.clone()),
                None => Err(FetchError::NotConfigured(symbol.to_string())),
            }
        }
    }

    pub(crate) fn days_ago(n: u64) -> chrono::NaiveDate {
        Utc::now()
            .date_naive()
            .checked_sub_days(Days::new(n))
            .unwrap()
    }

    fn engine() -> (QuoteEngine, Arc<MockSource>, Arc<MemoryStore>) {
        let source = Arc::new(MockSource::default());
        let store = Arc::new(MemoryStore::new());
        let engine = QuoteEngine::new(source.clone(), store.clone(), MemoryCache::default())
            .with_backfill_delay(Duration::from_millis(20));
        (engine, source, store)
    }

    fn seed(store: &MemoryStore, symbol: &str, usd: f64, age: chrono::Duration) -> CachedPriceRecord {
        let record = CachedPriceRecord {
            symbol: symbol.to_string(),
            price_usd: usd,
            price_cny: usd * 7.2,
            source: "seed".to_string(),
            cached_at: Utc::now() - age,
        };
        store.upsert_cached_price(&record).unwrap();
        record
    }

    #[tokio::test]
    async fn test_cache_only_returns_stored_record_without_fetching() {
        let (engine, source, store) = engine();
        source.set_price("BTC", 70000.0, 504000.0);
        let record = seed(&store, "BTC", 65000.0, chrono::Duration::hours(6));

        let quote = engine.resolve("btc", ReadMode::CacheOnly).await.unwrap();
        assert!(quote.cached);
        assert!(!quote.stale);
        assert_eq!(quote.price_usd, record.price_usd);
        assert_eq!(quote.price_cny, record.price_cny);
        assert_eq!(quote.source, record.source);
        assert_eq!(quote.cached_at, record.cached_at);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_only_without_record_is_none() {
        let (engine, source, _) = engine();
        source.set_price("BTC", 70000.0, 504000.0);
        assert!(engine.resolve("BTC", ReadMode::CacheOnly).await.is_none());
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_normal_serves_fresh_record() {
        let (engine, source, store) = engine();
        source.set_price("ETH", 3500.0, 25200.0);
        seed(&store, "ETH", 3000.0, chrono::Duration::minutes(1));

        let quote = engine.resolve("ETH", ReadMode::Normal).await.unwrap();
        assert!(quote.cached);
        assert_eq!(quote.price_usd, 3000.0);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_normal_refetches_expired_record() {
        let (engine, source, store) = engine();
        source.set_price("ETH", 3500.0, 25200.0);
        seed(&store, "ETH", 3000.0, chrono::Duration::minutes(6));

        let quote = engine.resolve("ETH", ReadMode::Normal).await.unwrap();
        assert!(!quote.cached);
        assert!(!quote.stale);
        assert_eq!(quote.price_usd, 3500.0);
        assert_eq!(source.calls(), 1);

        let stored = store.get_cached_price("ETH").unwrap().unwrap();
        assert_eq!(stored.price_usd, 3500.0);
        assert_eq!(stored.source, "mock");
        let history = store.get_history("ETH", 5).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].day, Utc::now().date_naive());
    }

    #[tokio::test]
    async fn test_freshness_window_is_configurable() {
        let (engine, source, store) = engine();
        let engine = engine.with_freshness_window(Duration::from_secs(30));
        source.set_price("ETH", 3500.0, 25200.0);
        seed(&store, "ETH", 3000.0, chrono::Duration::minutes(1));

        assert!(!engine.resolve("ETH", ReadMode::Normal).await.unwrap().cached);
    }

    #[tokio::test]
    async fn test_force_refresh_always_fetches() {
        let (engine, source, store) = engine();
        source.set_price("BTC", 70000.0, 504000.0);
        seed(&store, "BTC", 65000.0, chrono::Duration::seconds(10));

        let quote = engine.resolve("BTC", ReadMode::ForceRefresh).await.unwrap();
        assert!(!quote.cached);
        assert_eq!(quote.price_usd, 70000.0);
        assert_eq!(source.calls(), 1);
        assert_eq!(store.get_cached_price("BTC").unwrap().unwrap().price_usd, 70000.0);
    }

    #[tokio::test]
    async fn test_failure_with_record_serves_stale() {
        let (engine, source, store) = engine();
        source.set_failing("BTC");
        let record = seed(&store, "BTC", 65000.0, chrono::Duration::hours(2));

        let quote = engine.resolve("BTC", ReadMode::Normal).await.unwrap();
        assert!(quote.cached);
        assert!(quote.stale);
        assert_eq!(quote.price_usd, 65000.0);
        assert_eq!(quote.cached_at, record.cached_at);

        let quote = engine.resolve("BTC", ReadMode::ForceRefresh).await.unwrap();
        assert!(quote.stale);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_failure_without_record_is_none() {
        let (engine, source, store) = engine();
        source.set_failing("BTC");
        assert!(engine.resolve("BTC", ReadMode::Normal).await.is_none());
        assert!(store.get_cached_price("BTC").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_not_configured_is_unpriced() {
        let (engine, source, store) = engine();
        assert!(engine.resolve("XYZ", ReadMode::ForceRefresh).await.is_none());

        seed(&store, "XYZ", 1.0, chrono::Duration::hours(1));
        assert!(engine.resolve("XYZ", ReadMode::Normal).await.is_none());
        // The stored row is still readable without the network
        assert!(engine.resolve("XYZ", ReadMode::CacheOnly).await.is_some());
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_resolve_all_keeps_only_successes() {
        let (engine, source, _) = engine();
        source.set_failing("AAA");
        source.set_price("BBB", 2.0, 14.4);

        let prices = engine
            .resolve_all(&["AAA", "BBB"], ReadMode::Normal)
            .await;
        assert_eq!(prices.len(), 1);
        assert_eq!(prices["BBB"].price_usd, 2.0);
    }

    #[tokio::test]
    async fn test_resolve_all_dedupes_symbols() {
        let (engine, source, _) = engine();
        source.set_price("BTC", 70000.0, 504000.0);

        let symbols = vec!["BTC".to_string(), "btc".to_string(), " BTC".to_string()];
        let prices = engine.resolve_all(&symbols, ReadMode::ForceRefresh).await;
        assert_eq!(prices.len(), 1);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_same_day_refresh_replaces_history_row() {
        let (engine, source, store) = engine();
        source.set_price("BTC", 70000.0, 504000.0);
        engine.resolve("BTC", ReadMode::ForceRefresh).await;
        source.set_price("BTC", 71000.0, 511200.0);
        engine.resolve("BTC", ReadMode::ForceRefresh).await;

        let history = store.get_history("BTC", 30).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].price_usd, 71000.0);
    }

    #[tokio::test]
    async fn test_rate_snapshot_is_served_from_memory() {
        let (engine, source, _) = engine();
        let first = engine.rate_snapshot().await;
        let second = engine.rate_snapshot().await;
        assert_eq!(first, second);
        assert_eq!(source.snapshot_calls.load(Ordering::SeqCst), 1);

        engine.refresh_rate_snapshot().await;
        assert_eq!(source.snapshot_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_thirty_day_history_is_served_from_memory() {
        let (engine, _, store) = engine();
        let row = |symbol: &str, ago: u64| HistoryRecord {
            symbol: symbol.to_string(),
            day: days_ago(ago),
            price_usd: 1.0,
            price_cny: 7.2,
        };
        store.append_history(&row("BTC", 1)).unwrap();
        store.append_history(&row("ETH", 40)).unwrap();

        assert_eq!(engine.history(None, 30).await.len(), 1);
        store.append_history(&row("ETH", 2)).unwrap();
        // Still the cached aggregate
        assert_eq!(engine.history(None, 30).await.len(), 1);
        // Other windows and per-symbol reads hit the store
        assert_eq!(engine.history(None, 60).await.len(), 3);
        assert_eq!(engine.history(Some("eth"), 30).await.len(), 2);

        assert_eq!(engine.reload_history_cache().await.len(), 2);
        assert_eq!(engine.history(None, 30).await.len(), 2);
    }

    #[tokio::test]
    async fn test_backfill_is_sequential_and_batched() {
        let (engine, source, store) = engine();
        source.set_price("BTC", 70000.0, 504000.0);
        source.set_price("ETH", 3500.0, 25200.0);
        source.set_failing("SOL");

        engine.reload_history_cache().await;
        let started = Instant::now();
        let rows = engine
            .backfill_history(&["BTC", "ETH", "SOL", "XYZ"], 3)
            .await;

        // Three pauses between four symbols
        assert!(started.elapsed() >= Duration::from_millis(60));
        assert_eq!(source.history_calls.load(Ordering::SeqCst), 4);
        assert_eq!(rows.len(), 6);
        assert_eq!(store.get_history("BTC", 30).unwrap().len(), 3);
        assert_eq!(store.get_history("SOL", 30).unwrap().len(), 0);
        // Aggregate was invalidated and picks up the new rows
        assert_eq!(engine.history(None, 30).await.len(), 6);
    }

    #[tokio::test]
    async fn test_backfill_is_idempotent() {
        let (engine, source, store) = engine();
        source.set_price("BTC", 70000.0, 504000.0);
        engine.backfill_history(&["BTC"], 5).await;
        engine.backfill_history(&["BTC"], 5).await;
        assert_eq!(store.get_history("BTC", 30).unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_warm_up_fills_both_slots() {
        let (engine, source, _) = engine();
        engine.warm_up().await;
        engine.rate_snapshot().await;
        engine.history(None, 30).await;
        assert_eq!(source.snapshot_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_last_full_refresh_round_trip() {
        let (engine, _, _) = engine();
        assert!(engine.last_full_refresh().is_none());

        let at = Utc::now();
        engine.mark_full_refresh(at);
        let stored = engine.last_full_refresh().unwrap();
        assert_eq!(stored.timestamp_micros(), at.timestamp_micros());
    }

    #[tokio::test]
    async fn test_empty_reload_keeps_history_aggregate() {
        let (engine, _, _) = engine();
        let row = HistoryRecord {
            symbol: "BTC".to_string(),
            day: days_ago(1),
            price_usd: 70000.0,
            price_cny: 504000.0,
        };
        engine.memory.history.set(vec![row.clone()]).await;

        assert!(engine.reload_history_cache().await.is_empty());
        assert_eq!(engine.history(None, HISTORY_WINDOW_DAYS).await, vec![row]);
    }

    #[tokio::test]
    async fn test_oversized_symbol_is_unpriced_on_disk_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(crate::store::disk::FjallStore::open(dir.path()).unwrap());
        let source = Arc::new(MockSource::default());
        let engine = QuoteEngine::new(source.clone(), store, MemoryCache::default());

        let symbol = "A".repeat(70_000);
        assert!(engine.resolve(&symbol, ReadMode::ForceRefresh).await.is_none());
        assert!(engine.resolve(&symbol, ReadMode::CacheOnly).await.is_none());
        assert_eq!(source.calls(), 1);
    }

    /// Every fetch takes the same time; "A" always fails.
    struct SlowSource {
        delay: Duration,
    }

    #[async_trait]
    impl QuoteSource for SlowSource {
        async fn fetch_quote(&self, symbol: &str) -> Result<RawQuote, FetchError> {
            tokio::time::sleep(self.delay).await;
            if symbol == "A" {
                return Err(FetchError::unavailable("slow", "timed out"));
            }
            Ok(RawQuote {
                price_usd: 1.0,
                price_cny: 7.2,
                source: "slow".to_string(),
            })
        }

        async fn rate_snapshot(&self) -> RateSnapshot {
            RateSnapshot {
                official_rate: 7.2,
                peer_to_peer_rate: 7.2,
                stablecoin_parity: 1.0,
                updated_at: Utc::now(),
            }
        }

        async fn fetch_history(
            &self,
            _symbol: &str,
            _days: u32,
        ) -> Result<Vec<HistoryRecord>, FetchError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_resolve_all_fetches_concurrently() {
        let delay = Duration::from_millis(300);
        let engine = QuoteEngine::new(
            Arc::new(SlowSource { delay }),
            Arc::new(MemoryStore::new()),
            MemoryCache::default(),
        );

        let started = Instant::now();
        let prices = engine
            .resolve_all(&["A", "B", "C", "D"], ReadMode::ForceRefresh)
            .await;
        let elapsed = started.elapsed();

        assert_eq!(prices.len(), 3);
        assert!(!prices.contains_key("A"));
        // Sequential fetches would need four delays
        assert!(elapsed < delay * 3, "took {elapsed:?}");
    }
}
