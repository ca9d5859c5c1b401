//! Domain layer containing core business types, traits, and error definitions.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{
    AppError, ConfigError, DatabaseError, TransportError, UpstreamError, ValidationError,
};
pub use traits::{DatabaseClient, ExplorerClient, PriceOracle};
pub use types::{
    AgentBalance, AgentHealth, BalanceRecord, CacheEntry, CacheKey, ChainId, CreateStatusCheck,
    DEFAULT_TX_LIMIT, DEFAULT_WEBHOOK_LIMIT, DataKind, ErrorDetail, ErrorResponse,
    HealthResponse, HealthStatus, MAX_TX_LIMIT, NativeToken, NewWebhookRecord,
    RecentWebhooksQuery, RootResponse, StatusCheck, TransactionQuery, TransactionRecord,
    WebhookReceipt, WebhookRecord, wei_to_native,
};
