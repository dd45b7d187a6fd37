use crate::core::asset::Asset;
use crate::core::source::Venue;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ProvidersConfig {
    pub coingecko: String,
    pub binance_p2p: String,
    pub binance: String,
    pub okx: String,
    pub timeout_secs: u64,
    pub history_timeout_secs: u64,
    /// Extra symbol to CoinGecko id mappings, merged over the built-in ones.
    pub coingecko_ids: HashMap<String, String>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            coingecko: "https://api.coingecko.com".to_string(),
            binance_p2p: "https://p2p.binance.com".to_string(),
            binance: "https://api.binance.com".to_string(),
            okx: "https://www.okx.com".to_string(),
            timeout_secs: 10,
            history_timeout_secs: 15,
            coingecko_ids: HashMap::new(),
        }
    }
}

impl ProvidersConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn history_timeout(&self) -> Duration {
        Duration::from_secs(self.history_timeout_secs)
    }
}

/// A stablecoin pegged to the reference stablecoin and quoted on `venue`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PeggedAsset {
    pub symbol: String,
    pub venue: Venue,
    pub instrument: String,
}

pub fn default_pegged_assets() -> Vec<PeggedAsset> {
    vec![
        PeggedAsset {
            symbol: "USD1".to_string(),
            venue: Venue::Binance,
            instrument: "USD1USDT".to_string(),
        },
        PeggedAsset {
            symbol: "USDG".to_string(),
            venue: Venue::Okx,
            instrument: "USDG-USDT".to_string(),
        },
    ]
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub freshness_secs: u64,
    pub rates_ttl_secs: u64,
    pub history_ttl_secs: u64,
    pub backfill_delay_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            freshness_secs: 5 * 60,
            rates_ttl_secs: 10 * 60,
            history_ttl_secs: 30 * 60,
            backfill_delay_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SchedulerConfig {
    pub rates_tick_secs: u64,
    pub history_reload_secs: u64,
    /// Local wall-clock hour of the daily full refresh.
    pub daily_hour: u32,
    pub startup_delay_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            rates_tick_secs: 5 * 60,
            history_reload_secs: 15 * 60,
            daily_hour: 2,
            startup_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default = "default_pegged_assets")]
    pub pegged: Vec<PeggedAsset>,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            assets: Vec::new(),
            providers: ProvidersConfig::default(),
            pegged: default_pegged_assets(),
            cache: CacheConfig::default(),
            scheduler: SchedulerConfig::default(),
            data_path: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("", "", "assetflow").context("Could not determine project directories")
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.yaml"))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
