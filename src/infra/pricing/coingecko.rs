//! CoinGecko price oracle.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::domain::{AppError, NativeToken, PriceOracle};

/// Default CoinGecko API base URL
pub const DEFAULT_COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// CoinGecko coin id for a native token
fn coin_id(token: NativeToken) -> &'static str {
    match token {
        NativeToken::Eth => "ethereum",
        NativeToken::Matic => "matic-network",
    }
}

/// Spot USD prices from the CoinGecko `simple/price` endpoint.
///
/// No retries and no caching: a failed lookup is simply `None`.
#[derive(Debug, Clone)]
pub struct CoinGeckoPriceOracle {
    http_client: Client,
    base_url: String,
}

impl CoinGeckoPriceOracle {
    pub fn new(base_url: Option<String>) -> Result<Self, AppError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: Option<String>, timeout: Duration) -> Result<Self, AppError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_COINGECKO_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    async fn fetch_price(&self, coin: &str) -> Option<f64> {
        let url = format!("{}/simple/price", self.base_url);

        let response = match self
            .http_client
            .get(&url)
            .query(&[("ids", coin), ("vs_currencies", "usd")])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, coin = %coin, "Price request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), coin = %coin, "Price API returned error status");
            return None;
        }

        let payload: Value = match response.json().await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, coin = %coin, "Failed to parse price response");
                return None;
            }
        };

        let price = payload.get(coin).and_then(|c| c.get("usd")).and_then(Value::as_f64);
        if price.is_none() {
            debug!(coin = %coin, "Price missing from response");
        }
        price
    }
}

#[async_trait]
impl PriceOracle for CoinGeckoPriceOracle {
    #[instrument(skip(self))]
    async fn get_price(&self, token_symbol: &str) -> Option<f64> {
        let token = match token_symbol.parse::<NativeToken>() {
            Ok(token) => token,
            Err(_) => {
                debug!("Unsupported token symbol, no price");
                return None;
            }
        };
        self.fetch_price(coin_id(token)).await
    }
}
