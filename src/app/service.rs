//! Application service layer: cached explorer views, status checks, health.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

use crate::domain::{
    AppError, BalanceRecord, CacheKey, ChainId, CreateStatusCheck, DataKind, DatabaseClient,
    ExplorerClient, HealthResponse, HealthStatus, MAX_TX_LIMIT, PriceOracle, StatusCheck,
    TransactionRecord, UpstreamError, ValidationError, wei_to_native,
};
use crate::infra::ReadThroughCache;

/// Upper bound on status checks returned by a listing
pub const MAX_STATUS_CHECKS: i64 = 1000;

/// Application service containing business logic
pub struct AppService {
    db_client: Arc<dyn DatabaseClient>,
    explorer_client: Arc<dyn ExplorerClient>,
    price_oracle: Arc<dyn PriceOracle>,
    cache: Arc<ReadThroughCache>,
}

impl AppService {
    #[must_use]
    pub fn new(
        db_client: Arc<dyn DatabaseClient>,
        explorer_client: Arc<dyn ExplorerClient>,
        price_oracle: Arc<dyn PriceOracle>,
        cache: Arc<ReadThroughCache>,
    ) -> Self {
        Self {
            db_client,
            explorer_client,
            price_oracle,
            cache,
        }
    }

    /// Balance of `address` on `chain`, valued in USD when a price is available.
    ///
    /// Only the wei string is cached; conversion and pricing run on every call
    /// and `last_updated` is the time this response was assembled.
    #[instrument(skip(self), fields(chain = %chain))]
    pub async fn get_balance_view(
        &self,
        address: &str,
        chain: ChainId,
    ) -> Result<BalanceRecord, AppError> {
        let key = CacheKey::new(DataKind::Balance, chain, address);
        let balance_wei: String = self
            .cache
            .get(&key, || self.explorer_client.get_balance(address, chain))
            .await?;

        let balance_native = wei_to_native(&balance_wei).ok_or_else(|| {
            UpstreamError::unexpected("etherscan", format!("non-numeric balance: {}", balance_wei))
        })?;

        let balance_usd = match chain.native_token() {
            Some(token) => self
                .price_oracle
                .get_price(token.symbol())
                .await
                .map(|price| balance_native * price),
            None => {
                debug!("No native token price for chain");
                None
            }
        };
        if balance_usd.is_none() {
            debug!("Returning balance without USD value");
        }

        Ok(BalanceRecord {
            address: address.to_string(),
            balance_wei,
            balance_native,
            balance_usd,
            last_updated: Utc::now(),
        })
    }

    /// Most recent transactions of `address`, newest first, at most `limit`.
    ///
    /// The cache holds one full page per address; the limit is applied here so
    /// every caller sees `min(available, limit)` entries.
    #[instrument(skip(self), fields(chain = %chain))]
    pub async fn get_transaction_view(
        &self,
        address: &str,
        chain: ChainId,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, AppError> {
        let limit = limit.min(MAX_TX_LIMIT);
        let key = CacheKey::new(DataKind::Transactions, chain, address);
        let mut transactions: Vec<TransactionRecord> = self
            .cache
            .get(&key, || {
                self.explorer_client
                    .get_transactions(address, chain, MAX_TX_LIMIT)
            })
            .await?;

        transactions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        transactions.truncate(limit);
        Ok(transactions)
    }

    /// Validate and persist a client heartbeat
    #[instrument(skip(self, request))]
    pub async fn create_status_check(
        &self,
        request: &CreateStatusCheck,
    ) -> Result<StatusCheck, AppError> {
        request.validate().map_err(|e| {
            warn!(error = %e, "Validation failed");
            AppError::Validation(ValidationError::Multiple(e.to_string()))
        })?;

        let check = self.db_client.create_status_check(&request.client_name).await?;
        info!(id = %check.id, client_name = %check.client_name, "Status check recorded");
        Ok(check)
    }

    /// Status checks, oldest first
    #[instrument(skip(self))]
    pub async fn list_status_checks(&self) -> Result<Vec<StatusCheck>, AppError> {
        self.db_client.list_status_checks(MAX_STATUS_CHECKS).await
    }

    /// Perform health check on all dependencies
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> HealthResponse {
        let db_health = match self.db_client.health_check().await {
            Ok(()) => HealthStatus::Healthy,
            Err(_) => HealthStatus::Unhealthy,
        };
        let explorer_health = match self.explorer_client.health_check().await {
            Ok(()) => HealthStatus::Healthy,
            Err(AppError::Config(e)) => {
                debug!(error = %e, "Explorer not configured");
                HealthStatus::Degraded
            }
            Err(_) => HealthStatus::Unhealthy,
        };
        HealthResponse::new(db_health, explorer_health)
    }
}
