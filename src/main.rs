//! Application entry point.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use secrecy::SecretString;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use chain_data_gateway::api::{CorsConfig, create_router_with_cors};
use chain_data_gateway::app::AppState;
use chain_data_gateway::infra::{
    CoinGeckoPriceOracle, DEFAULT_CACHE_TTL, EmergentAgentClient, EtherscanClient, PostgresClient,
    PostgresConfig, ReadThroughCache,
};

/// Application configuration
struct Config {
    database_url: String,
    host: String,
    port: u16,
    /// Explorer credential (optional - explorer calls fail with 503 if not set)
    etherscan_api_key: Option<SecretString>,
    etherscan_api_url: Option<String>,
    coingecko_api_url: Option<String>,
    emergent_agent_url: Option<String>,
    /// Shared secret for webhook signatures (optional - verification disabled if not set)
    webhook_secret: Option<SecretString>,
    cors: CorsConfig,
    cache_ttl: Duration,
    http_timeout: Duration,
}

impl Config {
    fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL not set")?;
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8001);

        let etherscan_api_key = env::var("ETHERSCAN_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .map(SecretString::from);
        let etherscan_api_url = env::var("ETHERSCAN_API_URL").ok().filter(|u| !u.is_empty());
        let coingecko_api_url = env::var("COINGECKO_API_URL").ok().filter(|u| !u.is_empty());
        let emergent_agent_url = env::var("EMERGENT_AGENT_URL").ok().filter(|u| !u.is_empty());

        let webhook_secret = env::var("PHOENIX_WEBHOOK_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .map(SecretString::from);

        let cache_ttl = env::var("CACHE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_CACHE_TTL);

        let http_timeout = env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(10));

        Ok(Self {
            database_url,
            host,
            port,
            etherscan_api_key,
            etherscan_api_url,
            coingecko_api_url,
            emergent_agent_url,
            webhook_secret,
            cors: CorsConfig::from_env(),
            cache_ttl,
            http_timeout,
        })
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,sqlx=warn"));
    let json = env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();

    info!("🏗️  Chain Data Gateway v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    info!("📦 Initializing infrastructure...");

    let postgres_client = PostgresClient::new(&config.database_url, PostgresConfig::default()).await?;
    postgres_client.run_migrations().await?;
    info!("   ✓ Database connected and migrations applied");
    let db_client = Arc::new(postgres_client);

    let explorer_client = EtherscanClient::with_timeout(
        config.etherscan_api_key.clone(),
        config.etherscan_api_url.clone(),
        config.http_timeout,
    )?;
    if explorer_client.has_api_key() {
        info!("   ✓ Explorer client created (Etherscan v2)");
    } else {
        warn!("   ⚠ Explorer client created without ETHERSCAN_API_KEY (explorer routes will return 503)");
    }

    let price_oracle =
        CoinGeckoPriceOracle::with_timeout(config.coingecko_api_url.clone(), config.http_timeout)?;
    info!("   ✓ Price oracle created (CoinGecko)");

    let cache = Arc::new(ReadThroughCache::with_ttl(db_client.clone(), config.cache_ttl));
    info!("   ✓ Read-through cache ready (ttl: {}s)", config.cache_ttl.as_secs());

    let agent_client = EmergentAgentClient::new(config.emergent_agent_url.clone())?;
    info!("   ✓ Emergent Agent client created ({})", agent_client.base_url());

    let app_state = AppState::with_cache(
        db_client,
        Arc::new(explorer_client),
        Arc::new(price_oracle),
        cache,
    )
    .with_webhook_secret(config.webhook_secret.clone())
    .with_emergent_agent(Arc::new(agent_client));

    if app_state.webhook_service.verifies_signatures() {
        info!("   ✓ Phoenix webhook secret configured");
    } else {
        warn!("   ⚠ PHOENIX_WEBHOOK_SECRET not set (webhook signatures will NOT be verified)");
    }
    let app_state = Arc::new(app_state);

    match &config.cors {
        CorsConfig::Permissive => info!("   ○ CORS: any origin"),
        CorsConfig::Origins(origins) => info!("   ✓ CORS: {}", origins.join(", ")),
    }
    let router = create_router_with_cors(app_state, config.cors);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("🚀 Server starting on http://{}", addr);
    info!("📖 Swagger UI available at http://{}/swagger-ui", addr);
    info!("📄 OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
