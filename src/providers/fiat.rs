use crate::core::error::FetchError;
use crate::core::source::FiatRateSource;
use crate::providers::coingecko::{CoinGeckoClient, PROVIDER};
use async_trait::async_trait;
use tracing::instrument;

/// USD-pegged instrument whose dual-currency quote yields USD/CNY.
const USD_PEGGED_INSTRUMENT: &str = "tether";

/// Official USD/CNY rate derived as `cny / usd` of a USD-pegged token.
pub struct PegDerivedRateProvider {
    client: CoinGeckoClient,
}

impl PegDerivedRateProvider {
    pub fn new(client: CoinGeckoClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FiatRateSource for PegDerivedRateProvider {
    #[instrument(name = "FiatRateFetch", skip(self))]
    async fn fetch_usd_cny(&self) -> Result<f64, FetchError> {
        let price = self.client.simple_price(USD_PEGGED_INSTRUMENT).await?;
        match (price.usd, price.cny) {
            (Some(usd), Some(cny)) if usd > 0.0 && cny > 0.0 => Ok(cny / usd),
            _ => Err(FetchError::no_data(PROVIDER, USD_PEGGED_INSTRUMENT)),
        }
    }
}
