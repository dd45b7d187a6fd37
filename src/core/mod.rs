//! Core domain types and the seams between layers

pub mod asset;
pub mod cache;
pub mod config;
pub mod error;
pub mod log;
pub mod portfolio;
pub mod quote;
pub mod source;
pub mod store;

// Re-export main types for cleaner imports
pub use asset::{Asset, AssetRegistry};
pub use cache::MemoryCache;
pub use error::FetchError;
pub use quote::{CachedPriceRecord, HistoryRecord, PriceQuote, RateSnapshot, RawQuote, ReadMode};
pub use source::{
    CrossRateSource, FiatRateSource, PeerToPeerRateSource, QuoteSource, SpotPriceSource,
};
pub use store::PriceStore;
