//! Domain types with validation support.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Number of wei in one native token unit
pub const WEI_PER_NATIVE: f64 = 1e18;

/// Default number of transactions returned when no limit is given
pub const DEFAULT_TX_LIMIT: usize = 3;

/// Upper bound on transactions returned (and fetched per cache page)
pub const MAX_TX_LIMIT: usize = 100;

/// Default number of webhooks returned by the recent listing
pub const DEFAULT_WEBHOOK_LIMIT: i64 = 10;

/// Numeric EVM chain identifier as used by the explorer API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    pub const ETHEREUM: ChainId = ChainId(1);
    pub const POLYGON_AMOY: ChainId = ChainId(80002);

    /// Native token of the chain, if it is one we can price
    #[must_use]
    pub fn native_token(&self) -> Option<NativeToken> {
        match *self {
            Self::ETHEREUM => Some(NativeToken::Eth),
            Self::POLYGON_AMOY => Some(NativeToken::Matic),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Native tokens the price oracle knows how to quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum NativeToken {
    Eth,
    Matic,
}

impl NativeToken {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Eth => "ETH",
            Self::Matic => "MATIC",
        }
    }
}

impl std::str::FromStr for NativeToken {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ETH" => Ok(Self::Eth),
            "MATIC" => Ok(Self::Matic),
            _ => Err(format!("Unsupported token symbol: {}", s)),
        }
    }
}

/// Kind of explorer data held in the cache
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Balance,
    Transactions,
}

impl DataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Balance => "balance",
            Self::Transactions => "transactions",
        }
    }
}

impl std::str::FromStr for DataKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "balance" => Ok(Self::Balance),
            "transactions" => Ok(Self::Transactions),
            _ => Err(format!("Invalid data kind: {}", s)),
        }
    }
}

impl std::fmt::Display for DataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Cache key. The chain id namespaces the kind so that the same address on
/// two chains never shares an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: DataKind,
    pub chain: ChainId,
    pub address: String,
}

impl CacheKey {
    #[must_use]
    pub fn new(kind: DataKind, chain: ChainId, address: &str) -> Self {
        Self {
            kind,
            chain,
            address: address.trim().to_lowercase(),
        }
    }
}

/// A cached explorer payload and the moment it was fetched
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub payload: Value,
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Entry is trusted only while `now - cached_at < ttl`
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.cached_at < ttl
    }
}

/// Native balance of an address with optional USD valuation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct BalanceRecord {
    #[schema(example = "0xde0b295669a9fd93d5f28d9ec85e40f4cb697bae")]
    pub address: String,
    /// Balance in wei, kept as a decimal string to preserve precision
    #[schema(example = "1500000000000000000")]
    pub balance_wei: String,
    /// Balance in whole native tokens (`balance_wei / 10^18`)
    #[schema(example = 1.5)]
    pub balance_native: f64,
    /// USD value, `null` when no price was available
    #[schema(example = 4500.0)]
    pub balance_usd: Option<f64>,
    /// Time the response was assembled
    pub last_updated: DateTime<Utc>,
}

/// Normalised explorer transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct TransactionRecord {
    #[schema(example = "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060")]
    pub hash: String,
    pub from_address: String,
    /// Empty for contract creations
    pub to_address: String,
    #[schema(example = 0.25)]
    pub value_native: f64,
    pub timestamp: DateTime<Utc>,
    #[schema(example = "19000000")]
    pub block_number: String,
    #[schema(example = "21000")]
    pub gas_used: String,
}

/// Query parameters for transaction listings
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransactionQuery {
    /// Maximum number of transactions (default 3, at most 100)
    pub limit: Option<usize>,
}

impl TransactionQuery {
    #[must_use]
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_TX_LIMIT).min(MAX_TX_LIMIT)
    }
}

/// Client heartbeat record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct StatusCheck {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: String,
    #[schema(example = "dashboard")]
    pub client_name: String,
    pub timestamp: DateTime<Utc>,
}

/// Request body for creating a status check
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateStatusCheck {
    #[validate(length(min = 1, max = 255, message = "Client name must be between 1 and 255 characters"))]
    #[schema(example = "dashboard")]
    pub client_name: String,
}

/// Webhook as received, before the store assigns it an id
#[derive(Debug, Clone, PartialEq)]
pub struct NewWebhookRecord {
    pub event_type: String,
    pub case_id: Option<String>,
    pub evidence_id: Option<String>,
    pub data: Map<String, Value>,
    pub signature: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl NewWebhookRecord {
    /// Build a record from a raw payload, lifting the well-known fields
    #[must_use]
    pub fn from_payload(
        data: Map<String, Value>,
        signature: Option<String>,
        received_at: DateTime<Utc>,
    ) -> Self {
        let text = |field: &str| data.get(field).and_then(Value::as_str).map(str::to_string);
        Self {
            event_type: text("event_type").unwrap_or_else(|| "unknown".to_string()),
            case_id: text("case_id"),
            evidence_id: text("evidence_id"),
            signature,
            received_at,
            data,
        }
    }
}

/// Stored webhook. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct WebhookRecord {
    pub id: String,
    #[schema(example = "evidence.created")]
    pub event_type: String,
    pub case_id: Option<String>,
    pub evidence_id: Option<String>,
    /// Full payload as received
    #[schema(value_type = Object)]
    pub data: Map<String, Value>,
    pub signature: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl WebhookRecord {
    #[must_use]
    pub fn from_new(id: String, record: NewWebhookRecord) -> Self {
        Self {
            id,
            event_type: record.event_type,
            case_id: record.case_id,
            evidence_id: record.evidence_id,
            data: record.data,
            signature: record.signature,
            received_at: record.received_at,
        }
    }
}

/// Acknowledgement returned to the webhook sender
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct WebhookReceipt {
    #[schema(example = "received")]
    pub status: String,
    pub id: String,
    pub timestamp: DateTime<Utc>,
}

/// Query parameters for the recent webhook listing
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecentWebhooksQuery {
    /// Maximum number of webhooks (1-100, default 10)
    #[serde(default = "default_webhook_limit")]
    pub limit: i64,
}

fn default_webhook_limit() -> i64 {
    DEFAULT_WEBHOOK_LIMIT
}

/// Convert a decimal wei string into whole native units.
///
/// Returns `None` for anything that is not a non-empty run of ASCII digits.
#[must_use]
pub fn wei_to_native(balance_wei: &str) -> Option<f64> {
    if balance_wei.is_empty() || !balance_wei.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    balance_wei
        .parse::<f64>()
        .ok()
        .map(|wei| wei / WEI_PER_NATIVE)
}

/// Health status enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// All systems operational
    Healthy,
    /// Some systems degraded but functional
    Degraded,
    /// Critical systems unavailable
    Unhealthy,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Overall system status
    pub status: HealthStatus,
    /// Database health status
    pub database: HealthStatus,
    /// Block-explorer health status
    pub explorer: HealthStatus,
    /// Current server timestamp
    pub timestamp: DateTime<Utc>,
    /// Application version
    #[schema(example = "0.1.0")]
    pub version: String,
}

impl HealthResponse {
    #[must_use]
    pub fn new(database: HealthStatus, explorer: HealthStatus) -> Self {
        // The database is the only hard dependency; a failing explorer degrades.
        let status = match (&database, &explorer) {
            (HealthStatus::Unhealthy, _) => HealthStatus::Unhealthy,
            (HealthStatus::Healthy, HealthStatus::Healthy) => HealthStatus::Healthy,
            _ => HealthStatus::Degraded,
        };
        Self {
            status,
            database,
            explorer,
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Ethereum balance fetched live through the Emergent Agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct AgentBalance {
    #[schema(example = "ok")]
    pub status: String,
    pub address: String,
    #[schema(example = "1500000000000000000")]
    pub balance_wei: String,
    #[schema(example = 1.5)]
    pub balance_eth: f64,
    /// USD estimate, `null` when no ETH price was available
    #[schema(example = 4500.0)]
    pub usd_estimate: Option<f64>,
}

/// Reachability of the Emergent Agent. Always served with HTTP 200.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct AgentHealth {
    #[schema(example = "emergent-agent")]
    pub service: String,
    /// `healthy` or `unhealthy`
    pub status: HealthStatus,
    #[schema(example = "ok")]
    pub message: String,
}

/// Root banner
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RootResponse {
    #[schema(example = "Ethereum Dashboard API v1.0")]
    pub message: String,
}

/// Error response structure
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error details
    pub error: ErrorDetail,
    /// Same text as `error.message`, for clients that read a flat `detail`
    #[schema(example = "Upstream error: etherscan returned an error: Invalid address format")]
    pub detail: String,
}

/// Error detail structure
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Error type identifier
    #[schema(example = "upstream_error")]
    pub r#type: String,
    /// Human-readable error message
    #[schema(example = "etherscan returned an error: Invalid address format")]
    pub message: String,
}
