//! Background refresh cycles, independent of any request.

use crate::core::asset::{AssetRegistry, distinct_symbols};
use crate::core::config::SchedulerConfig;
use crate::core::quote::ReadMode;
use crate::engine::QuoteEngine;
use crate::resolver::FIAT_SYMBOL;
use chrono::{DateTime, Local, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at, sleep};
use tracing::{debug, info, warn};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Time from `now` until the next `hour`:00 local to `now`'s zone.
///
/// Exactly on the hour schedules the following day. Hours that do not exist
/// on a given day (DST gaps) are skipped to the next day that has them.
pub fn delay_until_hour<Tz: TimeZone>(now: &DateTime<Tz>, hour: u32) -> Duration {
    let hour = hour.min(23);
    let mut day = now.date_naive();
    for _ in 0..3 {
        if let Some(at) = day.and_hms_opt(hour, 0, 0)
            && let Some(target) = now.timezone().from_local_datetime(&at).earliest()
            && target > *now
        {
            return target
                .signed_duration_since(now)
                .to_std()
                .unwrap_or(Duration::ZERO);
        }
        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
    DAY
}

#[derive(Clone)]
pub struct Scheduler {
    engine: QuoteEngine,
    registry: Arc<dyn AssetRegistry>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(
        engine: QuoteEngine,
        registry: Arc<dyn AssetRegistry>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            engine,
            registry,
            config,
        }
    }

    fn held_symbols(&self, exclude: &[&str]) -> Vec<String> {
        match self.registry.list_assets() {
            Ok(assets) => distinct_symbols(&assets, exclude),
            Err(e) => {
                warn!(error = %e, "Failed to list assets");
                Vec::new()
            }
        }
    }

    /// Rate snapshot tick. Intentionally makes no upstream calls, the daily
    /// cycle and on-demand fetches keep the snapshot current.
    pub async fn rates_tick(&self) {
        debug!("Rate snapshot tick");
    }

    pub async fn reload_history(&self) {
        self.engine.reload_history_cache().await;
    }

    /// Force-refreshes every held symbol and the rate snapshot. Returns the
    /// number of symbols priced.
    pub async fn full_refresh(&self) -> usize {
        let symbols = self.held_symbols(&[]);
        info!(symbols = symbols.len(), "Starting full price refresh");

        let (prices, _) = tokio::join!(
            self.engine.refresh_all(&symbols),
            self.engine.refresh_rate_snapshot()
        );
        self.engine.mark_full_refresh(Utc::now());

        info!(
            priced = prices.len(),
            requested = symbols.len(),
            "Full price refresh complete"
        );
        prices.len()
    }

    /// Cold-start check: refreshes everything when any held symbol has no
    /// cached price. Returns whether a refresh ran.
    pub async fn startup_check(&self) -> bool {
        let symbols = self.held_symbols(&[FIAT_SYMBOL]);
        if symbols.is_empty() {
            return false;
        }

        let cached = self.engine.resolve_all(&symbols, ReadMode::CacheOnly).await;
        if cached.len() >= symbols.len() {
            debug!(cached = cached.len(), "Price cache is complete");
            return false;
        }

        info!(
            cached = cached.len(),
            expected = symbols.len(),
            "Price cache incomplete, refreshing"
        );
        self.full_refresh().await;
        true
    }

    /// Starts every timer on the current runtime.
    pub fn spawn(&self) -> Vec<JoinHandle<()>> {
        let tick = Duration::from_secs(self.config.rates_tick_secs.max(1));
        let reload = Duration::from_secs(self.config.history_reload_secs.max(1));
        let startup_delay = Duration::from_millis(self.config.startup_delay_ms);
        let daily_hour = self.config.daily_hour;

        let rates_task = {
            let scheduler = self.clone();
            tokio::spawn(async move {
                let mut interval = interval_at(Instant::now() + tick, tick);
                loop {
                    interval.tick().await;
                    scheduler.rates_tick().await;
                }
            })
        };

        let history_task = {
            let scheduler = self.clone();
            tokio::spawn(async move {
                let mut interval = interval_at(Instant::now() + reload, reload);
                loop {
                    interval.tick().await;
                    scheduler.reload_history().await;
                }
            })
        };

        let daily_task = {
            let scheduler = self.clone();
            tokio::spawn(async move {
                let delay = delay_until_hour(&Local::now(), daily_hour);
                info!(
                    hours = delay.as_secs() / 3600,
                    minutes = (delay.as_secs() % 3600) / 60,
                    "Daily refresh scheduled"
                );
                let mut interval = interval_at(Instant::now() + delay, DAY);
                loop {
                    interval.tick().await;
                    scheduler.full_refresh().await;
                }
            })
        };

        let startup_task = {
            let scheduler = self.clone();
            tokio::spawn(async move {
                sleep(startup_delay).await;
                scheduler.startup_check().await;
            })
        };

        vec![rates_task, history_task, daily_task, startup_task]
    }
}
