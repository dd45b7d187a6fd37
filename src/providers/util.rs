use crate::core::error::FetchError;
use anyhow::Result;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("assetflow/", env!("CARGO_PKG_VERSION"));

/// HTTP client shared by an adapter, with every request bounded by `timeout`.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

/// Checks the status and decodes a JSON body, mapping every failure to
/// [`FetchError::Unavailable`].
pub async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    provider: &'static str,
) -> Result<T, FetchError> {
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::unavailable(
            provider,
            format!("HTTP error: {status}"),
        ));
    }

    let text = response
        .text()
        .await
        .map_err(|e| FetchError::unavailable(provider, e))?;
    debug!(provider, body = %text, "Received response");

    serde_json::from_str(&text)
        .map_err(|e| FetchError::unavailable(provider, format!("Failed to parse response: {e}")))
}

/// Parses a decimal string quoted by an exchange, keeping only positive prices.
pub fn parse_price(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p > 0.0)
}
