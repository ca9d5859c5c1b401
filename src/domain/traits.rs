//! Domain traits defining contracts for external systems.

use async_trait::async_trait;

use super::error::AppError;
use super::types::{
    CacheEntry, CacheKey, ChainId, NewWebhookRecord, StatusCheck, TransactionRecord,
    WebhookRecord,
};

/// Block-explorer client for account data
#[async_trait]
pub trait ExplorerClient: Send + Sync {
    /// Check that the explorer is reachable and the credential is accepted
    async fn health_check(&self) -> Result<(), AppError>;

    /// Native balance in wei, as a decimal string
    async fn get_balance(&self, address: &str, chain: ChainId) -> Result<String, AppError>;

    /// Most recent transactions first, at most `limit` entries.
    /// "No transactions found" is an empty list, not an error.
    async fn get_transactions(
        &self,
        address: &str,
        chain: ChainId,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, AppError>;
}

/// USD price source for native tokens.
///
/// Never fails: any problem (unknown symbol, network, bad payload) is `None`.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn get_price(&self, token_symbol: &str) -> Option<f64>;
}

/// Database client trait for persistence operations
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Check database connectivity
    async fn health_check(&self) -> Result<(), AppError>;

    /// Persist a new status check
    async fn create_status_check(&self, client_name: &str) -> Result<StatusCheck, AppError>;

    /// List status checks, oldest first
    async fn list_status_checks(&self, limit: i64) -> Result<Vec<StatusCheck>, AppError>;

    /// Durable cache tier lookup (freshness is the caller's concern)
    async fn get_cache_entry(&self, key: &CacheKey) -> Result<Option<CacheEntry>, AppError>;

    /// Overwrite the durable cache entry for `entry.key`
    async fn upsert_cache_entry(&self, entry: &CacheEntry) -> Result<(), AppError>;

    /// Append a webhook; the store assigns the id
    async fn insert_webhook(&self, record: &NewWebhookRecord) -> Result<WebhookRecord, AppError>;

    /// Most recently received webhooks first
    async fn list_recent_webhooks(&self, limit: i64) -> Result<Vec<WebhookRecord>, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConfigError;

    struct UnconfiguredExplorer;

    #[async_trait]
    impl ExplorerClient for UnconfiguredExplorer {
        async fn health_check(&self) -> Result<(), AppError> {
            Err(ConfigError::Missing("ETHERSCAN_API_KEY".to_string()).into())
        }

        async fn get_balance(&self, _address: &str, _chain: ChainId) -> Result<String, AppError> {
            Err(ConfigError::Missing("ETHERSCAN_API_KEY".to_string()).into())
        }

        async fn get_transactions(
            &self,
            _address: &str,
            _chain: ChainId,
            _limit: usize,
        ) -> Result<Vec<TransactionRecord>, AppError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_explorer_trait_object_dispatch() {
        let client: Box<dyn ExplorerClient> = Box::new(UnconfiguredExplorer);
        let result = client.get_balance("0x1", ChainId::ETHEREUM).await;
        assert!(matches!(result, Err(AppError::Config(_))));
        let txs = client
            .get_transactions("0x1", ChainId::ETHEREUM, 3)
            .await
            .unwrap();
        assert!(txs.is_empty());
    }
}
