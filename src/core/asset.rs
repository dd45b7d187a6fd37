//! Held assets and the registry that lists them.

use crate::core::quote::normalize_symbol;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

fn default_unit() -> String {
    "unit".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Asset {
    pub name: String,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub symbol: Option<String>,
    pub amount: f64,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub location: Option<String>,
}

/// Source of the assets currently held.
pub trait AssetRegistry: Send + Sync {
    fn list_assets(&self) -> Result<Vec<Asset>>;
}

/// Registry over a fixed list, e.g. the assets declared in the config file.
pub struct StaticRegistry {
    assets: Vec<Asset>,
}

impl StaticRegistry {
    pub fn new(assets: Vec<Asset>) -> Self {
        Self { assets }
    }
}

impl AssetRegistry for StaticRegistry {
    fn list_assets(&self) -> Result<Vec<Asset>> {
        Ok(self.assets.clone())
    }
}

/// Distinct, normalized symbols of the given assets, skipping `exclude`.
pub fn distinct_symbols(assets: &[Asset], exclude: &[&str]) -> Vec<String> {
    let symbols: BTreeSet<String> = assets
        .iter()
        .filter_map(|a| a.symbol.as_deref())
        .map(normalize_symbol)
        .filter(|s| !s.is_empty() && !exclude.contains(&s.as_str()))
        .collect();
    symbols.into_iter().collect()
}
