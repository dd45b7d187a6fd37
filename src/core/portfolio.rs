//! Values held assets in USD and CNY from a set of resolved quotes.
use crate::core::asset::Asset;
use crate::core::quote::{PriceQuote, normalize_symbol};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Value of a single held asset.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetValue {
    pub asset: Asset,
    pub price: Option<PriceQuote>,
    pub value_usd: f64,
    pub value_cny: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub asset_count: usize,
    pub total_usd: f64,
    pub total_cny: f64,
}

/// Portfolio totals with a per-category breakdown.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub total_usd: f64,
    pub total_cny: f64,
    pub by_category: BTreeMap<String, CategoryTotal>,
    pub assets: Vec<AssetValue>,
    pub prices: HashMap<String, PriceQuote>,
    pub updated_at: DateTime<Utc>,
}

impl Dashboard {
    pub fn unpriced(&self) -> impl Iterator<Item = &AssetValue> {
        self.assets.iter().filter(|a| a.price.is_none())
    }
}

/// Builds the dashboard for `assets`.
///
/// Assets without a quote are kept in the listing with a zero value so the
/// totals degrade instead of failing.
pub fn build_dashboard(assets: &[Asset], prices: HashMap<String, PriceQuote>) -> Dashboard {
    let mut total_usd = 0.0;
    let mut total_cny = 0.0;
    let mut by_category: BTreeMap<String, CategoryTotal> = BTreeMap::new();
    let mut valued = Vec::with_capacity(assets.len());

    for asset in assets {
        let price = asset
            .symbol
            .as_deref()
            .map(normalize_symbol)
            .and_then(|s| prices.get(&s).cloned());

        let (value_usd, value_cny) = match &price {
            Some(quote) => (asset.amount * quote.price_usd, asset.amount * quote.price_cny),
            None => {
                debug!(asset = %asset.name, "No price available, valuing at zero");
                (0.0, 0.0)
            }
        };

        total_usd += value_usd;
        total_cny += value_cny;

        let category = by_category.entry(asset.category.clone()).or_default();
        category.asset_count += 1;
        category.total_usd += value_usd;
        category.total_cny += value_cny;

        valued.push(AssetValue {
            asset: asset.clone(),
            price,
            value_usd,
            value_cny,
        });
    }

    Dashboard {
        total_usd,
        total_cny,
        by_category,
        assets: valued,
        prices,
        updated_at: Utc::now(),
    }
}
