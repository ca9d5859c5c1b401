//! Mock implementations for testing.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::domain::{
    AppError, CacheEntry, CacheKey, ChainId, ConfigError, DatabaseClient, DatabaseError,
    ExplorerClient, NewWebhookRecord, PriceOracle, StatusCheck, TransactionRecord,
    TransportError, UpstreamError, WebhookRecord,
};

/// Configuration for mock behavior
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    pub should_fail: bool,
    pub error_message: Option<String>,
}

impl MockConfig {
    #[must_use]
    pub fn success() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            should_fail: true,
            error_message: Some(message.into()),
        }
    }
}

/// Mock database client for testing
pub struct MockDatabaseClient {
    status_checks: Arc<Mutex<Vec<StatusCheck>>>,
    cache: Arc<Mutex<HashMap<CacheKey, CacheEntry>>>,
    webhooks: Arc<Mutex<Vec<WebhookRecord>>>,
    config: MockConfig,
    is_healthy: AtomicBool,
}

impl MockDatabaseClient {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MockConfig::success())
    }

    #[must_use]
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            status_checks: Arc::new(Mutex::new(Vec::new())),
            cache: Arc::new(Mutex::new(HashMap::new())),
            webhooks: Arc::new(Mutex::new(Vec::new())),
            config,
            is_healthy: AtomicBool::new(true),
        }
    }

    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_config(MockConfig::failure(message))
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.is_healthy.store(healthy, Ordering::Relaxed);
    }

    /// Get all stored webhooks in insertion order (for testing)
    pub fn get_all_webhooks(&self) -> Vec<WebhookRecord> {
        self.webhooks.lock().unwrap().clone()
    }

    /// Number of durable cache rows (for testing)
    pub fn cache_len(&self) -> usize {
        self.cache.lock().unwrap().len()
    }

    fn check_should_fail(&self) -> Result<(), AppError> {
        if self.config.should_fail {
            let msg = self
                .config
                .error_message
                .clone()
                .unwrap_or_else(|| "Mock error".to_string());
            return Err(AppError::Database(DatabaseError::Query(msg)));
        }
        Ok(())
    }
}

impl Default for MockDatabaseClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn health_check(&self) -> Result<(), AppError> {
        if !self.is_healthy.load(Ordering::Relaxed) {
            return Err(AppError::Database(DatabaseError::Connection(
                "Unhealthy".to_string(),
            )));
        }
        self.check_should_fail()
    }

    async fn create_status_check(&self, client_name: &str) -> Result<StatusCheck, AppError> {
        self.check_should_fail()?;
        let check = StatusCheck {
            id: Uuid::new_v4().to_string(),
            client_name: client_name.to_string(),
            timestamp: Utc::now(),
        };
        self.status_checks.lock().unwrap().push(check.clone());
        Ok(check)
    }

    async fn list_status_checks(&self, limit: i64) -> Result<Vec<StatusCheck>, AppError> {
        self.check_should_fail()?;
        let mut checks = self.status_checks.lock().unwrap().clone();
        checks.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        checks.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(checks)
    }

    async fn get_cache_entry(&self, key: &CacheKey) -> Result<Option<CacheEntry>, AppError> {
        self.check_should_fail()?;
        Ok(self.cache.lock().unwrap().get(key).cloned())
    }

    async fn upsert_cache_entry(&self, entry: &CacheEntry) -> Result<(), AppError> {
        self.check_should_fail()?;
        self.cache
            .lock()
            .unwrap()
            .insert(entry.key.clone(), entry.clone());
        Ok(())
    }

    async fn insert_webhook(&self, record: &NewWebhookRecord) -> Result<WebhookRecord, AppError> {
        self.check_should_fail()?;
        let stored = WebhookRecord::from_new(Uuid::new_v4().to_string(), record.clone());
        self.webhooks.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn list_recent_webhooks(&self, limit: i64) -> Result<Vec<WebhookRecord>, AppError> {
        self.check_should_fail()?;
        // Newest insertion first, then a stable sort keeps that order on ties
        let mut webhooks: Vec<_> = self.webhooks.lock().unwrap().iter().rev().cloned().collect();
        webhooks.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        webhooks.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(webhooks)
    }
}

/// Failure a [`MockExplorerClient`] reports on every data call
#[derive(Debug, Clone)]
pub enum ExplorerFailure {
    /// Explorer answered with a logical error
    Upstream(String),
    /// Explorer unreachable
    Transport(String),
    /// No API key configured
    Unconfigured,
}

impl ExplorerFailure {
    fn to_error(&self) -> AppError {
        match self {
            Self::Upstream(msg) => UpstreamError::api("etherscan", msg.clone()).into(),
            Self::Transport(msg) => TransportError::Connection(msg.clone()).into(),
            Self::Unconfigured => ConfigError::Missing("ETHERSCAN_API_KEY".to_string()).into(),
        }
    }
}

/// Mock block explorer with canned data and call counters
pub struct MockExplorerClient {
    balance: String,
    transactions: Vec<TransactionRecord>,
    failure: Option<ExplorerFailure>,
    delay: Option<std::time::Duration>,
    is_healthy: AtomicBool,
    balance_calls: AtomicUsize,
    transaction_calls: AtomicUsize,
    tx_limits: Mutex<Vec<usize>>,
}

impl MockExplorerClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            balance: "0".to_string(),
            transactions: Vec::new(),
            failure: None,
            delay: None,
            is_healthy: AtomicBool::new(true),
            balance_calls: AtomicUsize::new(0),
            transaction_calls: AtomicUsize::new(0),
            tx_limits: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn failing(failure: ExplorerFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::new()
        }
    }

    #[must_use]
    pub fn with_balance(mut self, balance_wei: impl Into<String>) -> Self {
        self.balance = balance_wei.into();
        self
    }

    #[must_use]
    pub fn with_transactions(mut self, transactions: Vec<TransactionRecord>) -> Self {
        self.transactions = transactions;
        self
    }

    /// Sleep before answering, to widen race windows in tests
    #[must_use]
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.is_healthy.store(healthy, Ordering::Relaxed);
    }

    pub fn balance_calls(&self) -> usize {
        self.balance_calls.load(Ordering::SeqCst)
    }

    pub fn transaction_calls(&self) -> usize {
        self.transaction_calls.load(Ordering::SeqCst)
    }

    /// Limits passed to `get_transactions`, in call order
    pub fn requested_tx_limits(&self) -> Vec<usize> {
        self.tx_limits.lock().unwrap().clone()
    }

    async fn simulate(&self) -> Result<(), AppError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }
}

impl Default for MockExplorerClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExplorerClient for MockExplorerClient {
    async fn health_check(&self) -> Result<(), AppError> {
        if !self.is_healthy.load(Ordering::Relaxed) {
            return Err(TransportError::Connection("Unhealthy".to_string()).into());
        }
        match &self.failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }

    async fn get_balance(&self, _address: &str, _chain: ChainId) -> Result<String, AppError> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate().await?;
        Ok(self.balance.clone())
    }

    async fn get_transactions(
        &self,
        _address: &str,
        _chain: ChainId,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, AppError> {
        self.transaction_calls.fetch_add(1, Ordering::SeqCst);
        self.tx_limits.lock().unwrap().push(limit);
        self.simulate().await?;
        Ok(self.transactions.iter().take(limit).cloned().collect())
    }
}

/// Mock price oracle returning a fixed price (or none)
pub struct MockPriceOracle {
    price: Option<f64>,
    symbols: Mutex<Vec<String>>,
}

impl MockPriceOracle {
    #[must_use]
    pub fn with_price(price: f64) -> Self {
        Self {
            price: Some(price),
            symbols: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            price: None,
            symbols: Mutex::new(Vec::new()),
        }
    }

    /// Symbols looked up so far, in call order
    pub fn requested_symbols(&self) -> Vec<String> {
        self.symbols.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceOracle for MockPriceOracle {
    async fn get_price(&self, token_symbol: &str) -> Option<f64> {
        self.symbols.lock().unwrap().push(token_symbol.to_string());
        self.price
    }
}

/// `count` transactions, newest first, one minute apart
#[must_use]
pub fn sample_transactions(count: usize) -> Vec<TransactionRecord> {
    let newest: DateTime<Utc> = Utc
        .timestamp_opt(1_700_000_000, 0)
        .single()
        .unwrap_or_else(Utc::now);
    (0..count)
        .map(|i| TransactionRecord {
            hash: format!("0x{:064x}", i),
            from_address: "0x1111111111111111111111111111111111111111".to_string(),
            to_address: "0x2222222222222222222222222222222222222222".to_string(),
            value_native: 0.1 * (i as f64 + 1.0),
            timestamp: newest - Duration::minutes(i as i64),
            block_number: (19_000_000 - i).to_string(),
            gas_used: "21000".to_string(),
        })
        .collect()
}
