use crate::core::quote::{CachedPriceRecord, HistoryRecord};
use crate::core::store::{PriceStore, history_cutoff, sort_history};
use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

#[derive(Default)]
struct Tables {
    prices: HashMap<String, CachedPriceRecord>,
    history: BTreeMap<(String, NaiveDate), HistoryRecord>,
    settings: HashMap<String, String>,
}

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.inner
            .read()
            .map_err(|_| anyhow!("Memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.inner
            .write()
            .map_err(|_| anyhow!("Memory store lock poisoned"))
    }
}

impl PriceStore for MemoryStore {
    fn get_cached_price(&self, symbol: &str) -> Result<Option<CachedPriceRecord>> {
        Ok(self.read()?.prices.get(symbol).cloned())
    }

    fn upsert_cached_price(&self, record: &CachedPriceRecord) -> Result<()> {
        debug!(symbol = %record.symbol, "Price cache PUT");
        self.write()?
            .prices
            .insert(record.symbol.clone(), record.clone());
        Ok(())
    }

    fn list_cached_prices(&self) -> Result<Vec<CachedPriceRecord>> {
        let mut records: Vec<_> = self.read()?.prices.values().cloned().collect();
        records.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(records)
    }

    fn append_history(&self, record: &HistoryRecord) -> Result<()> {
        self.write()?
            .history
            .insert((record.symbol.clone(), record.day), record.clone());
        Ok(())
    }

    fn append_history_batch(&self, records: &[HistoryRecord]) -> Result<()> {
        let mut tables = self.write()?;
        for record in records {
            tables
                .history
                .insert((record.symbol.clone(), record.day), record.clone());
        }
        Ok(())
    }

    fn get_history(&self, symbol: &str, days: usize) -> Result<Vec<HistoryRecord>> {
        let tables = self.read()?;
        let mut records: Vec<_> = tables
            .history
            .range((symbol.to_string(), NaiveDate::MIN)..=(symbol.to_string(), NaiveDate::MAX))
            .rev()
            .take(days)
            .map(|(_, record)| record.clone())
            .collect();
        records.reverse();
        Ok(records)
    }

    fn get_all_history(&self, days: u32) -> Result<Vec<HistoryRecord>> {
        let cutoff = history_cutoff(days);
        let mut records: Vec<_> = self
            .read()?
            .history
            .values()
            .filter(|r| r.day >= cutoff)
            .cloned()
            .collect();
        sort_history(&mut records);
        Ok(records)
    }

    fn get_setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read()?.settings.get(key).cloned())
    }

    fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.write()?
            .settings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
