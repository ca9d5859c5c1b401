//! Router configuration: routes, CORS, tracing and API docs.

use std::sync::Arc;

use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::app::AppState;

use super::handlers::{
    ApiDoc, chain_balance_handler, chain_transactions_handler, create_status_check_handler,
    emergent_balance_handler, emergent_health_handler, emergent_transactions_handler,
    eth_balance_handler, eth_transactions_handler, health_check_handler, liveness_handler,
    list_status_checks_handler, phoenix_webhook_handler, polygon_balance_handler,
    polygon_transactions_handler, readiness_handler, recent_webhooks_handler, root_handler,
};

/// Allowed cross-origin callers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CorsConfig {
    /// Any origin, method and header; credentials not allowed
    #[default]
    Permissive,
    /// Listed origins only, with credentials
    Origins(Vec<String>),
}

impl CorsConfig {
    /// Parse a comma-separated origin list; empty or `*` means permissive
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let origins: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            Self::Permissive
        } else {
            Self::Origins(origins)
        }
    }

    /// Load from `CORS_ORIGINS` (default `*`)
    #[must_use]
    pub fn from_env() -> Self {
        Self::parse(&std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()))
    }

    fn into_layer(self) -> CorsLayer {
        match self {
            Self::Permissive => CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
            Self::Origins(origins) => {
                let allowed: Vec<HeaderValue> = origins
                    .iter()
                    .filter_map(|origin| match origin.parse::<HeaderValue>() {
                        Ok(value) => Some(value),
                        Err(_) => {
                            warn!(origin = %origin, "Ignoring invalid CORS origin");
                            None
                        }
                    })
                    .collect();

                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(allowed))
                    .allow_methods(AllowMethods::mirror_request())
                    .allow_headers(AllowHeaders::mirror_request())
                    .allow_credentials(true)
            }
        }
    }
}

/// Create the application router with permissive CORS
pub fn create_router(app_state: Arc<AppState>) -> Router {
    create_router_with_cors(app_state, CorsConfig::Permissive)
}

/// Create the application router with the given CORS policy.
///
/// Every route is mounted at the root and again under `/api`.
pub fn create_router_with_cors(app_state: Arc<AppState>, cors: CorsConfig) -> Router {
    let routes = api_routes();

    Router::new()
        .merge(routes.clone())
        .nest("/api", routes)
        .with_state(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors.into_layer())
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(root_handler))
        .route("/eth/balance/{address}", get(eth_balance_handler))
        .route("/eth/txs/{address}", get(eth_transactions_handler))
        .route("/polygon/balance/{address}", get(polygon_balance_handler))
        .route("/polygon/txs/{address}", get(polygon_transactions_handler))
        .route(
            "/chains/{chain_id}/balance/{address}",
            get(chain_balance_handler),
        )
        .route(
            "/chains/{chain_id}/txs/{address}",
            get(chain_transactions_handler),
        )
        .route(
            "/emergent/etherscan/balance/{address}",
            get(emergent_balance_handler),
        )
        .route(
            "/emergent/etherscan/txs/{address}",
            get(emergent_transactions_handler),
        )
        .route("/emergent/health", get(emergent_health_handler))
        .route(
            "/status",
            post(create_status_check_handler).get(list_status_checks_handler),
        )
        .route("/webhook/phoenix", post(phoenix_webhook_handler))
        .route("/webhook/phoenix/recent", get(recent_webhooks_handler))
        .route("/health", get(health_check_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
}
