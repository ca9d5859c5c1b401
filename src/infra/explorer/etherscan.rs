//! Etherscan API v2 explorer client.
//!
//! One endpoint serves every supported chain; the chain is selected with the
//! `chainid` query parameter. Two response shapes are accepted for both
//! balances and transaction lists, and normalised before they leave this
//! module.

use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use crate::domain::{
    AppError, ChainId, ConfigError, ExplorerClient, TransactionRecord, TransportError,
    UpstreamError, wei_to_native,
};

/// Default Etherscan v2 endpoint
pub const DEFAULT_ETHERSCAN_API_URL: &str = "https://api.etherscan.io/v2/api";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upstream message that means "empty history", not failure
pub(super) const NO_TRANSACTIONS_FOUND: &str = "No transactions found";

const SERVICE: &str = "etherscan";

pub(super) const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Common envelope of every Etherscan response
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    result: Option<Value>,
}

impl Envelope {
    /// Absent, `"1"` and `1` all mean success
    fn is_success(&self) -> bool {
        match &self.status {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s == "1",
            Some(Value::Number(n)) => n.as_u64() == Some(1),
            Some(_) => false,
        }
    }

    fn error_message(&self) -> String {
        let message = self
            .message
            .clone()
            .unwrap_or_else(|| "Unknown error from Etherscan".to_string());
        match &self.result {
            Some(Value::String(detail)) if !detail.is_empty() && *detail != message => {
                format!("{}: {}", message, detail)
            }
            _ => message,
        }
    }

    fn is_no_transactions(&self) -> bool {
        self.message
            .as_deref()
            .is_some_and(|m| m.trim().eq_ignore_ascii_case(NO_TRANSACTIONS_FOUND))
    }
}

/// Balance payloads seen in the wild
#[derive(Debug, PartialEq)]
enum BalanceShape {
    /// `"result": "123"`
    Bare(String),
    /// `"result": {"balance": "123"}` or `"result": {"result": "123"}`
    Nested(String),
}

impl BalanceShape {
    fn detect(result: Option<&Value>) -> Result<Self, UpstreamError> {
        match result {
            Some(Value::String(s)) => Ok(Self::Bare(s.clone())),
            Some(Value::Object(map)) => map
                .get("balance")
                .or_else(|| map.get("result"))
                .and_then(scalar_to_string)
                .map(Self::Nested)
                .ok_or_else(|| {
                    UpstreamError::unexpected(SERVICE, "balance object has no balance field")
                }),
            _ => Err(UpstreamError::unexpected(
                SERVICE,
                "Unexpected balance response structure",
            )),
        }
    }

    fn into_wei(self) -> String {
        match self {
            Self::Bare(wei) | Self::Nested(wei) => wei,
        }
    }
}

/// Transaction-list payloads seen in the wild
#[derive(Debug)]
enum TransactionsShape {
    /// `"result": [...]`
    Bare(Vec<Value>),
    /// `"result": {"transactions": [...]}`
    Nested(Vec<Value>),
}

impl TransactionsShape {
    fn detect(result: Option<Value>) -> Result<Self, UpstreamError> {
        match result {
            Some(Value::Array(items)) => Ok(Self::Bare(items)),
            Some(Value::Object(mut map)) => match map.remove("transactions") {
                Some(Value::Array(items)) => Ok(Self::Nested(items)),
                _ => Err(UpstreamError::unexpected(
                    SERVICE,
                    "Unexpected transaction response structure",
                )),
            },
            _ => Err(UpstreamError::unexpected(
                SERVICE,
                "Unexpected transaction response structure",
            )),
        }
    }

    fn into_items(self) -> Vec<Value> {
        match self {
            Self::Bare(items) | Self::Nested(items) => items,
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Raw `txlist` entry
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RawTransaction {
    hash: String,
    from: String,
    #[serde(default)]
    to: Option<String>,
    value: String,
    time_stamp: String,
    block_number: String,
    gas_used: String,
}

impl TryFrom<RawTransaction> for TransactionRecord {
    type Error = UpstreamError;

    fn try_from(raw: RawTransaction) -> Result<Self, Self::Error> {
        let value_native = wei_to_native(&raw.value).ok_or_else(|| {
            UpstreamError::unexpected(SERVICE, format!("invalid value '{}'", raw.value))
        })?;
        let timestamp = raw
            .time_stamp
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or_else(|| {
                UpstreamError::unexpected(
                    SERVICE,
                    format!("invalid timeStamp '{}'", raw.time_stamp),
                )
            })?;

        Ok(TransactionRecord {
            hash: raw.hash,
            from_address: raw.from,
            to_address: raw.to.unwrap_or_default(),
            value_native,
            timestamp,
            block_number: raw.block_number,
            gas_used: raw.gas_used,
        })
    }
}

/// Explorer client backed by the Etherscan v2 multichain API
#[derive(Debug, Clone)]
pub struct EtherscanClient {
    http_client: Client,
    api_key: Option<SecretString>,
    base_url: String,
}

impl EtherscanClient {
    /// Create a new Etherscan client
    ///
    /// # Arguments
    /// * `api_key` - API credential. If None, every call fails with a configuration error.
    /// * `base_url` - Optional custom endpoint. Defaults to the public v2 API.
    pub fn new(api_key: Option<SecretString>, base_url: Option<String>) -> Result<Self, AppError> {
        Self::with_timeout(api_key, base_url, DEFAULT_TIMEOUT)
    }

    /// Create a new Etherscan client with a custom request timeout
    pub fn with_timeout(
        api_key: Option<SecretString>,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_ETHERSCAN_API_URL.to_string()),
        })
    }

    /// Whether an API credential is configured
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Issue one GET and decode the envelope. Logical failures are left to the caller.
    async fn request(
        &self,
        chain: ChainId,
        params: &[(&str, String)],
    ) -> Result<Envelope, AppError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| ConfigError::Missing("ETHERSCAN_API_KEY".to_string()))?;

        debug!(url = %self.base_url, chain = %chain, "Calling Etherscan API");

        let response = self
            .http_client
            .get(&self.base_url)
            .query(params)
            .query(&[
                ("chainid", chain.to_string().as_str()),
                ("apikey", api_key.expose_secret()),
            ])
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Etherscan request failed");
                TransportError::from(e.without_url())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Etherscan returned HTTP error");
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

        serde_json::from_slice::<Envelope>(&body).map_err(|e| {
            warn!(error = %e, "Failed to parse Etherscan response");
            UpstreamError::unexpected(SERVICE, format!("invalid JSON: {}", e)).into()
        })
    }
}

#[async_trait]
impl ExplorerClient for EtherscanClient {
    async fn health_check(&self) -> Result<(), AppError> {
        self.get_balance(ZERO_ADDRESS, ChainId::ETHEREUM)
            .await
            .map(|_| ())
    }

    #[instrument(skip(self), fields(chain = %chain))]
    async fn get_balance(&self, address: &str, chain: ChainId) -> Result<String, AppError> {
        let envelope = self
            .request(
                chain,
                &[
                    ("module", "account".to_string()),
                    ("action", "balance".to_string()),
                    ("address", address.to_string()),
                    ("tag", "latest".to_string()),
                ],
            )
            .await?;

        if !envelope.is_success() {
            let message = envelope.error_message();
            warn!(message = %message, "Etherscan balance lookup rejected");
            return Err(UpstreamError::api(SERVICE, message).into());
        }

        let wei = BalanceShape::detect(envelope.result.as_ref())?.into_wei();
        if wei_to_native(&wei).is_none() {
            return Err(UpstreamError::unexpected(SERVICE, format!("invalid balance '{}'", wei)).into());
        }
        Ok(wei)
    }

    #[instrument(skip(self), fields(chain = %chain))]
    async fn get_transactions(
        &self,
        address: &str,
        chain: ChainId,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, AppError> {
        let envelope = self
            .request(
                chain,
                &[
                    ("module", "account".to_string()),
                    ("action", "txlist".to_string()),
                    ("address", address.to_string()),
                    ("startblock", "0".to_string()),
                    ("endblock", "999999999".to_string()),
                    ("page", "1".to_string()),
                    ("offset", limit.max(1).to_string()),
                    ("sort", "desc".to_string()),
                ],
            )
            .await?;

        if !envelope.is_success() {
            if envelope.is_no_transactions() {
                debug!("No transactions found");
                return Ok(vec![]);
            }
            let message = envelope.error_message();
            warn!(message = %message, "Etherscan transaction lookup rejected");
            return Err(UpstreamError::api(SERVICE, message).into());
        }

        let items = TransactionsShape::detect(envelope.result)?.into_items();
        let mut transactions = items
            .into_iter()
            .map(|item| {
                serde_json::from_value::<RawTransaction>(item)
                    .map_err(|e| {
                        UpstreamError::unexpected(SERVICE, format!("malformed transaction: {}", e))
                    })
                    .and_then(TransactionRecord::try_from)
            })
            .collect::<Result<Vec<_>, _>>()?;

        transactions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        transactions.truncate(limit);
        Ok(transactions)
    }
}
