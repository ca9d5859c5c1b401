//! Application state management.

use std::sync::Arc;

use secrecy::SecretString;

use crate::domain::{DatabaseClient, ExplorerClient, PriceOracle};
use crate::infra::ReadThroughCache;

use super::agent_service::AgentService;
use super::service::AppService;
use super::webhook_service::WebhookService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AppService>,
    pub webhook_service: Arc<WebhookService>,
    /// `None` until an Emergent Agent client is attached
    pub agent_service: Option<Arc<AgentService>>,
    db_client: Arc<dyn DatabaseClient>,
    price_oracle: Arc<dyn PriceOracle>,
}

impl AppState {
    /// Create a new application state with the default cache TTL, no
    /// webhook secret and no Emergent Agent
    #[must_use]
    pub fn new(
        db_client: Arc<dyn DatabaseClient>,
        explorer_client: Arc<dyn ExplorerClient>,
        price_oracle: Arc<dyn PriceOracle>,
    ) -> Self {
        let cache = Arc::new(ReadThroughCache::new(Arc::clone(&db_client)));
        Self::with_cache(db_client, explorer_client, price_oracle, cache)
    }

    /// Create a new application state around an existing cache
    #[must_use]
    pub fn with_cache(
        db_client: Arc<dyn DatabaseClient>,
        explorer_client: Arc<dyn ExplorerClient>,
        price_oracle: Arc<dyn PriceOracle>,
        cache: Arc<ReadThroughCache>,
    ) -> Self {
        let service = Arc::new(AppService::new(
            Arc::clone(&db_client),
            explorer_client,
            Arc::clone(&price_oracle),
            cache,
        ));
        let webhook_service = Arc::new(WebhookService::new(Arc::clone(&db_client), None));
        Self {
            service,
            webhook_service,
            agent_service: None,
            db_client,
            price_oracle,
        }
    }

    /// Set the shared secret used to verify webhook signatures (builder pattern)
    #[must_use]
    pub fn with_webhook_secret(mut self, secret: Option<SecretString>) -> Self {
        self.webhook_service = Arc::new(WebhookService::new(Arc::clone(&self.db_client), secret));
        self
    }

    /// Attach the Emergent Agent explorer, priced with the shared oracle (builder pattern)
    #[must_use]
    pub fn with_emergent_agent(mut self, agent: Arc<dyn ExplorerClient>) -> Self {
        self.agent_service = Some(Arc::new(AgentService::new(
            agent,
            Arc::clone(&self.price_oracle),
        )));
        self
    }
}
