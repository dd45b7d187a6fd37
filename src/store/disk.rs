use crate::core::quote::{CachedPriceRecord, HistoryRecord};
use crate::core::store::{PriceStore, history_cutoff, sort_history};
use anyhow::{Context, Result};
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::debug;

const PRICE_CACHE: &str = "price_cache";
const PRICE_HISTORY: &str = "price_history";
const SETTINGS: &str = "settings";

/// Longest key the underlying LSM tree accepts.
const MAX_KEY_LEN: usize = u16::MAX as usize;

/// Durable store on a fjall keyspace.
///
/// History rows are keyed by `SYMBOL \0 YYYY-MM-DD`, so a second write for the
/// same day lands on the same key and replaces the first.
pub struct FjallStore {
    keyspace: Keyspace,
    prices: PartitionHandle,
    history: PartitionHandle,
    settings: PartitionHandle,
}

fn history_prefix(symbol: &str) -> String {
    format!("{symbol}\0")
}

fn history_key(record: &HistoryRecord) -> Result<String> {
    let key = format!("{}{}", history_prefix(&record.symbol), record.day.format("%Y-%m-%d"));
    checked_key(&key)?;
    Ok(key)
}

fn checked_key(key: &str) -> Result<&str> {
    if key.len() > MAX_KEY_LEN {
        anyhow::bail!(
            "Key of {} bytes exceeds the {MAX_KEY_LEN} byte limit",
            key.len()
        );
    }
    Ok(key)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).context("Failed to decode stored value")
}

impl FjallStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create data directory: {}", path.display()))?;

        let keyspace = Config::new(path)
            .open()
            .with_context(|| format!("Failed to open price store at {}", path.display()))?;
        let prices = keyspace.open_partition(PRICE_CACHE, PartitionCreateOptions::default())?;
        let history = keyspace.open_partition(PRICE_HISTORY, PartitionCreateOptions::default())?;
        let settings = keyspace.open_partition(SETTINGS, PartitionCreateOptions::default())?;
        debug!("Opened price store at {}", path.display());

        Ok(Self {
            keyspace,
            prices,
            history,
            settings,
        })
    }

    fn persist(&self) -> Result<()> {
        self.keyspace
            .persist(PersistMode::SyncData)
            .context("Failed to persist price store")
    }
}

impl PriceStore for FjallStore {
    fn get_cached_price(&self, symbol: &str) -> Result<Option<CachedPriceRecord>> {
        match self.prices.get(checked_key(symbol)?)? {
            Some(value) => {
                debug!(symbol, "Price cache HIT");
                Ok(Some(decode(&value)?))
            }
            None => {
                debug!(symbol, "Price cache MISS");
                Ok(None)
            }
        }
    }

    fn upsert_cached_price(&self, record: &CachedPriceRecord) -> Result<()> {
        self.prices
            .insert(checked_key(&record.symbol)?.as_bytes(), serde_json::to_vec(record)?)?;
        debug!(symbol = %record.symbol, "Price cache PUT");
        self.persist()
    }

    fn list_cached_prices(&self) -> Result<Vec<CachedPriceRecord>> {
        self.prices
            .iter()
            .map(|item| {
                let (_, value) = item?;
                decode(&value)
            })
            .collect()
    }

    fn append_history(&self, record: &HistoryRecord) -> Result<()> {
        self.history
            .insert(history_key(record)?.into_bytes(), serde_json::to_vec(record)?)?;
        self.persist()
    }

    fn append_history_batch(&self, records: &[HistoryRecord]) -> Result<()> {
        let mut batch = self.keyspace.batch();
        for record in records {
            batch.insert(
                &self.history,
                history_key(record)?.into_bytes(),
                serde_json::to_vec(record)?,
            );
        }
        batch.commit().context("Failed to write history batch")?;
        debug!(count = records.len(), "Price history batch PUT");
        self.persist()
    }

    fn get_history(&self, symbol: &str, days: usize) -> Result<Vec<HistoryRecord>> {
        let prefix = history_prefix(symbol);
        let mut records = self
            .history
            .prefix(checked_key(&prefix)?)
            .rev()
            .take(days)
            .map(|item| {
                let (_, value) = item?;
                decode::<HistoryRecord>(&value)
            })
            .collect::<Result<Vec<_>>>()?;
        records.reverse();
        Ok(records)
    }

    fn get_all_history(&self, days: u32) -> Result<Vec<HistoryRecord>> {
        let cutoff = history_cutoff(days);
        let mut records = Vec::new();
        for item in self.history.iter() {
            let (_, value) = item?;
            let record: HistoryRecord = decode(&value)?;
            if record.day >= cutoff {
                records.push(record);
            }
        }
        sort_history(&mut records);
        Ok(records)
    }

    fn get_setting(&self, key: &str) -> Result<Option<String>> {
        self.settings
            .get(checked_key(key)?)?
            .map(|value| {
                String::from_utf8(value.to_vec()).context("Stored setting is not valid UTF-8")
            })
            .transpose()
    }

    fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.settings.insert(checked_key(key)?.as_bytes(), value.as_bytes())?;
        self.persist()
    }
}
