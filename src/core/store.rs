//! Persistent store abstraction for cached prices, price history and settings.

use crate::core::quote::{CachedPriceRecord, HistoryRecord};
use anyhow::Result;
use chrono::{Days, NaiveDate, Utc};

/// Narrow, synchronous interface to the durable store.
///
/// Every method is a single logical statement: implementations make each call
/// atomic on its own and nothing more.
pub trait PriceStore: Send + Sync {
    fn get_cached_price(&self, symbol: &str) -> Result<Option<CachedPriceRecord>>;

    /// Inserts or overwrites the record for `record.symbol`.
    fn upsert_cached_price(&self, record: &CachedPriceRecord) -> Result<()>;

    fn list_cached_prices(&self) -> Result<Vec<CachedPriceRecord>>;

    /// Inserts or replaces the row for `(record.symbol, record.day)`.
    fn append_history(&self, record: &HistoryRecord) -> Result<()>;

    /// Same as [`append_history`](Self::append_history) for many rows at once.
    fn append_history_batch(&self, records: &[HistoryRecord]) -> Result<()> {
        for record in records {
            self.append_history(record)?;
        }
        Ok(())
    }

    /// Latest `days` rows for a symbol, oldest first.
    fn get_history(&self, symbol: &str, days: usize) -> Result<Vec<HistoryRecord>>;

    /// Rows of every symbol from `days` days ago onwards, ordered by day then symbol.
    fn get_all_history(&self, days: u32) -> Result<Vec<HistoryRecord>>;

    fn get_setting(&self, key: &str) -> Result<Option<String>>;

    fn set_setting(&self, key: &str, value: &str) -> Result<()>;
}

/// First day included by [`PriceStore::get_all_history`].
pub fn history_cutoff(days: u32) -> NaiveDate {
    let today = Utc::now().date_naive();
    today
        .checked_sub_days(Days::new(days as u64))
        .unwrap_or(NaiveDate::MIN)
}

pub(crate) fn sort_history(records: &mut [HistoryRecord]) {
    records.sort_by(|a, b| a.day.cmp(&b.day).then_with(|| a.symbol.cmp(&b.symbol)));
}
