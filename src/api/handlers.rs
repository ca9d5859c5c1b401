//! HTTP request handlers with OpenAPI documentation.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde_json::{Map, Value};
use tracing::error;
use utoipa::OpenApi;

use crate::app::agent_service::agent_not_configured;
use crate::app::{AgentService, AppState};
use crate::domain::{
    AgentBalance, AgentHealth, AppError, BalanceRecord, ChainId, ConfigError, CreateStatusCheck,
    DatabaseError, ErrorDetail, ErrorResponse, HealthResponse, HealthStatus, RecentWebhooksQuery,
    RootResponse, StatusCheck, TransactionQuery, TransactionRecord, WebhookReceipt, WebhookRecord,
};

/// Header carrying the hex HMAC-SHA256 of a webhook body
pub const SIGNATURE_HEADER: &str = "X-Signature";

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Chain Data Gateway API",
        version = "1.0.0",
        description = "Cached block-explorer balances and transactions with USD pricing, plus a signed webhook receiver"
    ),
    paths(
        root_handler,
        eth_balance_handler,
        eth_transactions_handler,
        polygon_balance_handler,
        polygon_transactions_handler,
        chain_balance_handler,
        chain_transactions_handler,
        emergent_balance_handler,
        emergent_transactions_handler,
        emergent_health_handler,
        create_status_check_handler,
        list_status_checks_handler,
        phoenix_webhook_handler,
        recent_webhooks_handler,
        health_check_handler,
        liveness_handler,
        readiness_handler,
    ),
    components(
        schemas(
            RootResponse,
            BalanceRecord,
            TransactionRecord,
            AgentBalance,
            AgentHealth,
            StatusCheck,
            CreateStatusCheck,
            WebhookReceipt,
            WebhookRecord,
            HealthResponse,
            HealthStatus,
            ErrorResponse,
            ErrorDetail,
        )
    ),
    tags(
        (name = "explorer", description = "Balances and transaction history"),
        (name = "emergent", description = "Live Ethereum lookups through the Emergent Agent"),
        (name = "status", description = "Client status checks"),
        (name = "webhooks", description = "Case-management webhook receiver"),
        (name = "health", description = "Health check endpoints")
    )
)]
pub struct ApiDoc;

/// API banner
#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses(
        (status = 200, description = "API banner", body = RootResponse)
    )
)]
pub async fn root_handler() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Ethereum Dashboard API v1.0".to_string(),
    })
}

/// Ethereum balance of an address
#[utoipa::path(
    get,
    path = "/eth/balance/{address}",
    tag = "explorer",
    params(
        ("address" = String, Path, description = "Account address")
    ),
    responses(
        (status = 200, description = "Balance with optional USD value", body = BalanceRecord),
        (status = 400, description = "Explorer rejected the request", body = ErrorResponse),
        (status = 503, description = "Explorer unreachable or not configured", body = ErrorResponse)
    )
)]
pub async fn eth_balance_handler(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<BalanceRecord>, AppError> {
    balance_for(&state, ChainId::ETHEREUM, &address).await
}

/// Most recent Ethereum transactions of an address
#[utoipa::path(
    get,
    path = "/eth/txs/{address}",
    tag = "explorer",
    params(
        ("address" = String, Path, description = "Account address"),
        TransactionQuery
    ),
    responses(
        (status = 200, description = "Transactions, newest first", body = Vec<TransactionRecord>),
        (status = 400, description = "Explorer rejected the request", body = ErrorResponse),
        (status = 503, description = "Explorer unreachable or not configured", body = ErrorResponse)
    )
)]
pub async fn eth_transactions_handler(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<Vec<TransactionRecord>>, AppError> {
    transactions_for(&state, ChainId::ETHEREUM, &address, &query).await
}

/// Polygon Amoy balance of an address, priced in MATIC
#[utoipa::path(
    get,
    path = "/polygon/balance/{address}",
    tag = "explorer",
    params(
        ("address" = String, Path, description = "Account address")
    ),
    responses(
        (status = 200, description = "Balance with optional USD value", body = BalanceRecord),
        (status = 400, description = "Explorer rejected the request", body = ErrorResponse),
        (status = 503, description = "Explorer unreachable or not configured", body = ErrorResponse)
    )
)]
pub async fn polygon_balance_handler(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<BalanceRecord>, AppError> {
    balance_for(&state, ChainId::POLYGON_AMOY, &address).await
}

/// Most recent Polygon Amoy transactions of an address
#[utoipa::path(
    get,
    path = "/polygon/txs/{address}",
    tag = "explorer",
    params(
        ("address" = String, Path, description = "Account address"),
        TransactionQuery
    ),
    responses(
        (status = 200, description = "Transactions, newest first", body = Vec<TransactionRecord>),
        (status = 400, description = "Explorer rejected the request", body = ErrorResponse),
        (status = 503, description = "Explorer unreachable or not configured", body = ErrorResponse)
    )
)]
pub async fn polygon_transactions_handler(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<Vec<TransactionRecord>>, AppError> {
    transactions_for(&state, ChainId::POLYGON_AMOY, &address, &query).await
}

/// Balance of an address on any explorer-supported chain
///
/// Chains without a known native token return `balance_usd: null`.
#[utoipa::path(
    get,
    path = "/chains/{chain_id}/balance/{address}",
    tag = "explorer",
    params(
        ("chain_id" = u64, Path, description = "Numeric EVM chain id"),
        ("address" = String, Path, description = "Account address")
    ),
    responses(
        (status = 200, description = "Balance with optional USD value", body = BalanceRecord),
        (status = 400, description = "Explorer rejected the request", body = ErrorResponse),
        (status = 503, description = "Explorer unreachable or not configured", body = ErrorResponse)
    )
)]
pub async fn chain_balance_handler(
    State(state): State<Arc<AppState>>,
    Path((chain_id, address)): Path<(u64, String)>,
) -> Result<Json<BalanceRecord>, AppError> {
    balance_for(&state, ChainId(chain_id), &address).await
}

/// Most recent transactions of an address on any explorer-supported chain
#[utoipa::path(
    get,
    path = "/chains/{chain_id}/txs/{address}",
    tag = "explorer",
    params(
        ("chain_id" = u64, Path, description = "Numeric EVM chain id"),
        ("address" = String, Path, description = "Account address"),
        TransactionQuery
    ),
    responses(
        (status = 200, description = "Transactions, newest first", body = Vec<TransactionRecord>),
        (status = 400, description = "Explorer rejected the request", body = ErrorResponse),
        (status = 503, description = "Explorer unreachable or not configured", body = ErrorResponse)
    )
)]
pub async fn chain_transactions_handler(
    State(state): State<Arc<AppState>>,
    Path((chain_id, address)): Path<(u64, String)>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<Vec<TransactionRecord>>, AppError> {
    transactions_for(&state, ChainId(chain_id), &address, &query).await
}

async fn balance_for(
    state: &AppState,
    chain: ChainId,
    address: &str,
) -> Result<Json<BalanceRecord>, AppError> {
    let balance = state.service.get_balance_view(address, chain).await?;
    Ok(Json(balance))
}

async fn transactions_for(
    state: &AppState,
    chain: ChainId,
    address: &str,
    query: &TransactionQuery,
) -> Result<Json<Vec<TransactionRecord>>, AppError> {
    let transactions = state
        .service
        .get_transaction_view(address, chain, query.effective_limit())
        .await?;
    Ok(Json(transactions))
}

fn agent_service(state: &AppState) -> Result<&AgentService, AppError> {
    state
        .agent_service
        .as_deref()
        .ok_or_else(|| ConfigError::Missing("EMERGENT_AGENT_URL".to_string()).into())
}

/// Ethereum balance fetched live through the Emergent Agent
#[utoipa::path(
    get,
    path = "/emergent/etherscan/balance/{address}",
    tag = "emergent",
    params(
        ("address" = String, Path, description = "Account address")
    ),
    responses(
        (status = 200, description = "Balance with optional USD estimate", body = AgentBalance),
        (status = 400, description = "Agent rejected the request", body = ErrorResponse),
        (status = 503, description = "Agent unreachable or not configured", body = ErrorResponse)
    )
)]
pub async fn emergent_balance_handler(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<AgentBalance>, AppError> {
    let balance = agent_service(&state)?.get_balance(&address).await?;
    Ok(Json(balance))
}

/// Most recent Ethereum transactions fetched live through the Emergent Agent
#[utoipa::path(
    get,
    path = "/emergent/etherscan/txs/{address}",
    tag = "emergent",
    params(
        ("address" = String, Path, description = "Account address"),
        TransactionQuery
    ),
    responses(
        (status = 200, description = "Transactions, newest first", body = Vec<TransactionRecord>),
        (status = 400, description = "Agent rejected the request", body = ErrorResponse),
        (status = 503, description = "Agent unreachable or not configured", body = ErrorResponse)
    )
)]
pub async fn emergent_transactions_handler(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<Vec<TransactionRecord>>, AppError> {
    let transactions = agent_service(&state)?
        .get_transactions(&address, query.effective_limit())
        .await?;
    Ok(Json(transactions))
}

/// Emergent Agent reachability
#[utoipa::path(
    get,
    path = "/emergent/health",
    tag = "emergent",
    responses(
        (status = 200, description = "Agent status, healthy or unhealthy", body = AgentHealth)
    )
)]
pub async fn emergent_health_handler(State(state): State<Arc<AppState>>) -> Json<AgentHealth> {
    match &state.agent_service {
        Some(agent) => Json(agent.health_check().await),
        None => Json(agent_not_configured()),
    }
}

/// Record a client status check
#[utoipa::path(
    post,
    path = "/status",
    tag = "status",
    request_body = CreateStatusCheck,
    responses(
        (status = 200, description = "Status check recorded", body = StatusCheck),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn create_status_check_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateStatusCheck>,
) -> Result<Json<StatusCheck>, AppError> {
    let check = state.service.create_status_check(&payload).await?;
    Ok(Json(check))
}

/// List recorded status checks, oldest first
#[utoipa::path(
    get,
    path = "/status",
    tag = "status",
    responses(
        (status = 200, description = "Status checks", body = Vec<StatusCheck>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_status_checks_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<StatusCheck>>, AppError> {
    let checks = state.service.list_status_checks().await?;
    Ok(Json(checks))
}

/// Receive a Phoenix case-management webhook
///
/// When a secret is configured and the `X-Signature` header is present, the
/// header must be the hex HMAC-SHA256 of the canonical JSON body. Unsigned
/// webhooks are accepted.
#[utoipa::path(
    post,
    path = "/webhook/phoenix",
    tag = "webhooks",
    request_body = Object,
    params(
        ("X-Signature" = Option<String>, Header, description = "Hex HMAC-SHA256 of the canonical body")
    ),
    responses(
        (status = 200, description = "Webhook stored", body = WebhookReceipt),
        (status = 401, description = "Signature mismatch", body = ErrorResponse),
        (status = 422, description = "Body is not a JSON object"),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn phoenix_webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<Map<String, Value>>,
) -> Result<Json<WebhookReceipt>, AppError> {
    // Bytes outside visible ASCII become replacement characters, so a
    // present header is always checked and can never pass for unsigned.
    let raw_signature = headers
        .get(SIGNATURE_HEADER)
        .map(|v| String::from_utf8_lossy(v.as_bytes()));
    let signature = raw_signature
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let receipt = state.webhook_service.receive(payload, signature).await?;
    Ok(Json(receipt))
}

/// Most recently received webhooks, newest first
#[utoipa::path(
    get,
    path = "/webhook/phoenix/recent",
    tag = "webhooks",
    params(RecentWebhooksQuery),
    responses(
        (status = 200, description = "Stored webhooks", body = Vec<WebhookRecord>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn recent_webhooks_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecentWebhooksQuery>,
) -> Result<Json<Vec<WebhookRecord>>, AppError> {
    let webhooks = state.webhook_service.list_recent(query.limit).await?;
    Ok(Json(webhooks))
}

/// Detailed health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Health status", body = HealthResponse)
    )
)]
pub async fn health_check_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let health = state.service.health_check().await;
    Json(health)
}

/// Kubernetes liveness probe
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "health",
    responses(
        (status = 200, description = "Application is alive")
    )
)]
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Kubernetes readiness probe
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "health",
    responses(
        (status = 200, description = "Application is ready to serve traffic"),
        (status = 503, description = "Application is not ready")
    )
)]
pub async fn readiness_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    let health = state.service.health_check().await;
    match health.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_type) = match &self {
            AppError::Upstream(_) => (StatusCode::BAD_REQUEST, "upstream_error"),
            AppError::Config(_) => (StatusCode::SERVICE_UNAVAILABLE, "configuration_error"),
            AppError::Transport(_) => (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable"),
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, "authentication_error"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::Database(DatabaseError::Connection(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "database_error")
            }
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            AppError::Serialization(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };
        let message = self.to_string();

        if status.is_server_error() {
            error!(error_type = %error_type, message = %message, "Server error");
        }

        let body = Json(ErrorResponse {
            detail: message.clone(),
            error: ErrorDetail {
                r#type: error_type.to_string(),
                message,
            },
        });

        (status, body).into_response()
    }
}
