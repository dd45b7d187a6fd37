pub mod cli;
pub mod core;
pub mod engine;
pub mod providers;
pub mod resolver;
pub mod scheduler;
pub mod store;

pub use crate::core::config;

use crate::core::asset::{AssetRegistry, StaticRegistry, distinct_symbols};
use crate::core::cache::MemoryCache;
use crate::core::config::AppConfig;
use crate::core::source::Venue;
use crate::engine::QuoteEngine;
use crate::providers::binance_p2p::BinanceP2pProvider;
use crate::providers::coingecko::{CoinGeckoClient, CryptoSpotProvider};
use crate::providers::fiat::PegDerivedRateProvider;
use crate::providers::gold::GoldProvider;
use crate::providers::ticker::{BinanceTickerProvider, OkxTickerProvider};
use crate::resolver::RateResolver;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub enum AppCommand {
    Summary,
    Prices { refresh: bool },
    Rates,
    History { symbol: Option<String>, days: u32 },
    Backfill { days: u32 },
    Serve,
}

/// Wires every source adapter into a resolver.
pub fn build_resolver(config: &AppConfig) -> Result<RateResolver> {
    let providers = &config.providers;
    let coingecko = CoinGeckoClient::new(
        &providers.coingecko,
        providers.timeout(),
        providers.history_timeout(),
    )?;

    let crypto = CryptoSpotProvider::new(coingecko.clone()).with_ids(&providers.coingecko_ids);
    let gold = GoldProvider::new(coingecko.clone());
    let fiat = PegDerivedRateProvider::new(coingecko);
    let p2p = BinanceP2pProvider::new(&providers.binance_p2p, providers.timeout())?;
    let binance = BinanceTickerProvider::new(&providers.binance, providers.timeout())?;
    let okx = OkxTickerProvider::new(&providers.okx, providers.timeout())?;

    Ok(RateResolver::new(Arc::new(fiat), Arc::new(p2p))
        .with_spot_source(Arc::new(gold))
        .with_spot_source(Arc::new(crypto))
        .with_venue(Venue::Binance, Arc::new(binance))
        .with_venue(Venue::Okx, Arc::new(okx))
        .with_pegged(config.pegged.clone()))
}

/// Everything a command needs.
pub struct App {
    pub config: AppConfig,
    pub engine: QuoteEngine,
    pub registry: Arc<dyn AssetRegistry>,
}

impl App {
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let resolver = build_resolver(&config)?;
        let store = store::open_store(&config);
        let memory = MemoryCache::new(
            Duration::from_secs(config.cache.rates_ttl_secs),
            Duration::from_secs(config.cache.history_ttl_secs),
        );
        let engine = QuoteEngine::new(Arc::new(resolver), store, memory)
            .with_freshness_window(Duration::from_secs(config.cache.freshness_secs))
            .with_backfill_delay(Duration::from_millis(config.cache.backfill_delay_ms));
        let registry = Arc::new(StaticRegistry::new(config.assets.clone()));

        Ok(Self {
            config,
            engine,
            registry,
        })
    }

    /// Distinct symbols of every held asset.
    pub fn symbols(&self) -> Result<Vec<String>> {
        Ok(distinct_symbols(&self.registry.list_assets()?, &[]))
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("assetflow starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let app = App::from_config(config)?;

    match command {
        AppCommand::Summary => cli::summary::run(&app).await,
        AppCommand::Prices { refresh } => cli::prices::run(&app, refresh).await,
        AppCommand::Rates => cli::rates::run(&app).await,
        AppCommand::History { symbol, days } => {
            cli::history::run(&app, symbol.as_deref(), days).await
        }
        AppCommand::Backfill { days } => cli::backfill::run(&app, days).await,
        AppCommand::Serve => cli::serve::run(&app).await,
    }
}
