//! Emergent Agent client: an Etherscan-compatible proxy for Ethereum mainnet.
//!
//! The agent takes the classic Etherscan query parameters without a chain id
//! or API key, and only `status == "1"` counts as success.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use super::etherscan::{NO_TRANSACTIONS_FOUND, RawTransaction, ZERO_ADDRESS};
use crate::domain::{
    AppError, ChainId, ExplorerClient, TransactionRecord, TransportError, UpstreamError,
    wei_to_native,
};

/// Default Emergent Agent endpoint
pub const DEFAULT_EMERGENT_AGENT_URL: &str = "https://etherscan-query.preview.emergentagent.com";

/// Default per-request timeout
pub const DEFAULT_AGENT_TIMEOUT: Duration = Duration::from_secs(30);

const SERVICE: &str = "emergent-agent";

#[derive(Debug, Deserialize)]
struct AgentResponse {
    #[serde(default)]
    status: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    result: Option<Value>,
}

impl AgentResponse {
    fn is_success(&self) -> bool {
        matches!(&self.status, Some(Value::String(s)) if s == "1")
    }

    fn error_message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| "Unknown error from Emergent Agent".to_string())
    }
}

/// Explorer client backed by the Emergent Agent proxy
#[derive(Debug, Clone)]
pub struct EmergentAgentClient {
    http_client: Client,
    base_url: String,
}

impl EmergentAgentClient {
    /// Create a client with the default 30s timeout
    pub fn new(base_url: Option<String>) -> Result<Self, AppError> {
        Self::with_timeout(base_url, DEFAULT_AGENT_TIMEOUT)
    }

    pub fn with_timeout(base_url: Option<String>, timeout: Duration) -> Result<Self, AppError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_EMERGENT_AGENT_URL.to_string()),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn ensure_mainnet(chain: ChainId) -> Result<(), AppError> {
        if chain == ChainId::ETHEREUM {
            Ok(())
        } else {
            Err(UpstreamError::api(SERVICE, format!("chain {} is not supported", chain)).into())
        }
    }

    async fn request(&self, params: &[(&str, String)]) -> Result<AgentResponse, AppError> {
        debug!(url = %self.base_url, "Calling Emergent Agent");

        let response = self
            .http_client
            .get(&self.base_url)
            .query(params)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Emergent Agent request failed");
                TransportError::from(e.without_url())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Emergent Agent returned HTTP error");
            return Err(TransportError::HttpStatus {
                status: status.as_u16(),
                message: body,
            }
            .into());
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::from(e.without_url()))?;

        serde_json::from_slice::<AgentResponse>(&body).map_err(|e| {
            warn!(error = %e, "Failed to parse Emergent Agent response");
            UpstreamError::unexpected(SERVICE, format!("invalid JSON: {}", e)).into()
        })
    }
}

#[async_trait]
impl ExplorerClient for EmergentAgentClient {
    async fn health_check(&self) -> Result<(), AppError> {
        self.get_balance(ZERO_ADDRESS, ChainId::ETHEREUM)
            .await
            .map(|_| ())
    }

    #[instrument(skip(self), fields(chain = %chain))]
    async fn get_balance(&self, address: &str, chain: ChainId) -> Result<String, AppError> {
        Self::ensure_mainnet(chain)?;
        let response = self
            .request(&[
                ("module", "account".to_string()),
                ("action", "balance".to_string()),
                ("address", address.to_string()),
                ("tag", "latest".to_string()),
            ])
            .await?;

        if !response.is_success() {
            let message = response.error_message();
            warn!(message = %message, "Emergent Agent balance lookup rejected");
            return Err(UpstreamError::api(SERVICE, message).into());
        }

        match response.result {
            Some(Value::String(wei)) if wei_to_native(&wei).is_some() => Ok(wei),
            Some(Value::String(wei)) => {
                Err(UpstreamError::unexpected(SERVICE, format!("invalid balance '{}'", wei)).into())
            }
            _ => Err(UpstreamError::unexpected(SERVICE, "Unexpected balance response structure").into()),
        }
    }

    #[instrument(skip(self), fields(chain = %chain))]
    async fn get_transactions(
        &self,
        address: &str,
        chain: ChainId,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, AppError> {
        Self::ensure_mainnet(chain)?;
        let response = self
            .request(&[
                ("module", "account".to_string()),
                ("action", "txlist".to_string()),
                ("address", address.to_string()),
                ("startblock", "0".to_string()),
                ("endblock", "999999999".to_string()),
                ("page", "1".to_string()),
                ("offset", limit.max(1).to_string()),
                ("sort", "desc".to_string()),
            ])
            .await?;

        if !response.is_success() {
            if response
                .message
                .as_deref()
                .is_some_and(|m| m.trim().eq_ignore_ascii_case(NO_TRANSACTIONS_FOUND))
            {
                return Ok(vec![]);
            }
            let message = response.error_message();
            warn!(message = %message, "Emergent Agent transaction lookup rejected");
            return Err(UpstreamError::api(SERVICE, message).into());
        }

        let items = match response.result {
            Some(Value::Array(items)) => items,
            None => vec![],
            Some(_) => {
                return Err(UpstreamError::unexpected(
                    SERVICE,
                    "Unexpected transaction response structure",
                )
                .into());
            }
        };

        items
            .into_iter()
            .take(limit)
            .map(|item| {
                serde_json::from_value::<RawTransaction>(item)
                    .map_err(|e| {
                        UpstreamError::unexpected(SERVICE, format!("malformed transaction: {}", e))
                    })
                    .and_then(TransactionRecord::try_from)
                    .map_err(AppError::from)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: Value) -> AgentResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_only_string_one_is_success() {
        assert!(response(json!({"status": "1", "result": "0"})).is_success());
        assert!(!response(json!({"status": 1, "result": "0"})).is_success());
        assert!(!response(json!({"result": "0"})).is_success());
        assert!(!response(json!({"status": "0", "message": "NOTOK"})).is_success());
    }

    #[test]
    fn test_error_message_fallback() {
        assert_eq!(response(json!({"status": "0"})).error_message(), "Unknown error from Emergent Agent");
        assert_eq!(
            response(json!({"status": "0", "message": "rate limited"})).error_message(),
            "rate limited"
        );
    }

    #[tokio::test]
    async fn test_other_chains_rejected_without_request() {
        let client = EmergentAgentClient::new(Some("http://127.0.0.1:1".to_string())).unwrap();
        let err = client
            .get_balance("0xabc", ChainId::POLYGON_AMOY)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream(UpstreamError::Api { .. })));
    }
}
