//! Failure taxonomy for upstream price sources.

use thiserror::Error;

/// Errors returned by the source adapters.
///
/// None of these are fatal: the resolver and the engine absorb every variant
/// and turn it into a fallback value, a stale cached quote, or "unpriced".
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Network failure, timeout, non-success status or an unparseable body.
    #[error("{provider} unavailable: {message}")]
    Unavailable {
        provider: &'static str,
        message: String,
    },

    /// The upstream answered but had nothing usable for the symbol.
    #[error("{provider} returned no data for {symbol}")]
    NoData {
        provider: &'static str,
        symbol: String,
    },

    /// No adapter knows how to price this symbol. Never touches the network.
    #[error("No price source configured for {0}")]
    NotConfigured(String),
}

impl FetchError {
    pub fn unavailable(provider: &'static str, err: impl std::fmt::Display) -> Self {
        FetchError::Unavailable {
            provider,
            message: err.to_string(),
        }
    }

    pub fn no_data(provider: &'static str, symbol: &str) -> Self {
        FetchError::NoData {
            provider,
            symbol: symbol.to_string(),
        }
    }

    pub fn is_not_configured(&self) -> bool {
        matches!(self, FetchError::NotConfigured(_))
    }
}
