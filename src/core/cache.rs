use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::quote::{HistoryRecord, RateSnapshot};

struct SlotValue<T> {
    payload: T,
    updated_at: Instant,
}

/// A single process-local value with a time-to-live.
///
/// The lock is only held for the read or the write; refilling a missed slot
/// happens outside of it.
#[derive(Clone)]
pub struct TtlSlot<T>
where
    T: Clone + Send + Sync + 'static,
{
    name: &'static str,
    ttl: Duration,
    inner: Arc<Mutex<Option<SlotValue<T>>>>,
}

impl<T> TtlSlot<T>
where
    T: Clone + Send + Sync,
{
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            inner: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns the payload when present and younger than the TTL.
    pub async fn get(&self) -> Option<T> {
        let slot = self.inner.lock().await;
        match slot.as_ref() {
            Some(value) if value.updated_at.elapsed() < self.ttl => {
                debug!(slot = self.name, "Memory cache HIT");
                Some(value.payload.clone())
            }
            Some(_) => {
                debug!(slot = self.name, "Memory cache entry expired");
                None
            }
            None => {
                debug!(slot = self.name, "Memory cache MISS");
                None
            }
        }
    }

    pub async fn set(&self, payload: T) {
        let mut slot = self.inner.lock().await;
        debug!(slot = self.name, "Memory cache SET");
        *slot = Some(SlotValue {
            payload,
            updated_at: Instant::now(),
        });
    }

    pub async fn clear(&self) {
        let mut slot = self.inner.lock().await;
        debug!(slot = self.name, "Memory cache CLEAR");
        *slot = None;
    }
}

pub const DEFAULT_RATES_TTL: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_HISTORY_TTL: Duration = Duration::from_secs(30 * 60);

/// The two hot-path slots sitting in front of the engine.
#[derive(Clone)]
pub struct MemoryCache {
    pub rates: TtlSlot<RateSnapshot>,
    pub history: TtlSlot<Vec<HistoryRecord>>,
}

impl MemoryCache {
    pub fn new(rates_ttl: Duration, history_ttl: Duration) -> Self {
        Self {
            rates: TtlSlot::new("rates", rates_ttl),
            history: TtlSlot::new("history", history_ttl),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_RATES_TTL, DEFAULT_HISTORY_TTL)
    }
}
