//! PostgreSQL database client implementation.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::{PgPool, Row, postgres::PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};

use crate::domain::{
    AppError, CacheEntry, CacheKey, ChainId, DataKind, DatabaseClient, DatabaseError,
    NewWebhookRecord, StatusCheck, WebhookRecord,
};

/// PostgreSQL connection pool configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 2,
            acquire_timeout: Duration::from_secs(3),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

/// PostgreSQL database client with connection pooling
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client with custom configuration
    pub async fn new(database_url: &str, config: PostgresConfig) -> Result<Self, AppError> {
        info!("Connecting to PostgreSQL...");
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .connect(database_url)
            .await
            .map_err(|e| AppError::Database(DatabaseError::Connection(e.to_string())))?;
        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Run database migrations using sqlx migrate
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Database(DatabaseError::Migration(e.to_string())))?;
        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying connection pool (for testing)
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_webhook(row: &sqlx::postgres::PgRow) -> Result<WebhookRecord, AppError> {
        let payload: Value = row.get("payload");
        let Value::Object(data) = payload else {
            return Err(AppError::Database(DatabaseError::Query(
                "webhook payload is not a JSON object".to_string(),
            )));
        };

        Ok(WebhookRecord {
            id: row.get("id"),
            event_type: row.get("event_type"),
            case_id: row.get("case_id"),
            evidence_id: row.get("evidence_id"),
            data,
            signature: row.get("signature"),
            received_at: row.get("received_at"),
        })
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(DatabaseError::Connection(e.to_string())))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn create_status_check(&self, client_name: &str) -> Result<StatusCheck, AppError> {
        let check = StatusCheck {
            id: uuid::Uuid::new_v4().to_string(),
            client_name: client_name.to_string(),
            timestamp: Utc::now(),
        };

        sqlx::query("INSERT INTO status_checks (id, client_name, timestamp) VALUES ($1, $2, $3)")
            .bind(&check.id)
            .bind(&check.client_name)
            .bind(check.timestamp)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(DatabaseError::from(e)))?;

        Ok(check)
    }

    #[instrument(skip(self))]
    async fn list_status_checks(&self, limit: i64) -> Result<Vec<StatusCheck>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT id, client_name, timestamp
            FROM status_checks
            ORDER BY timestamp ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(DatabaseError::Query(e.to_string())))?;

        Ok(rows
            .iter()
            .map(|row| StatusCheck {
                id: row.get("id"),
                client_name: row.get("client_name"),
                timestamp: row.get("timestamp"),
            })
            .collect())
    }

    #[instrument(skip(self), fields(kind = %key.kind, chain = %key.chain))]
    async fn get_cache_entry(&self, key: &CacheKey) -> Result<Option<CacheEntry>, AppError> {
        let row = sqlx::query(
            r#"
            SELECT kind, chain_id, address, payload, cached_at
            FROM explorer_cache
            WHERE kind = $1 AND chain_id = $2 AND address = $3
            "#,
        )
        .bind(key.kind.as_str())
        .bind(key.chain.0 as i64)
        .bind(&key.address)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(DatabaseError::Query(e.to_string())))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let kind: String = row.get("kind");
        let chain_id: i64 = row.get("chain_id");
        Ok(Some(CacheEntry {
            key: CacheKey {
                kind: kind
                    .parse::<DataKind>()
                    .map_err(|e| AppError::Database(DatabaseError::Query(e)))?,
                chain: ChainId(chain_id as u64),
                address: row.get("address"),
            },
            payload: row.get("payload"),
            cached_at: row.get("cached_at"),
        }))
    }

    #[instrument(skip(self, entry), fields(kind = %entry.key.kind, chain = %entry.key.chain))]
    async fn upsert_cache_entry(&self, entry: &CacheEntry) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO explorer_cache (kind, chain_id, address, payload, cached_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (kind, chain_id, address) DO UPDATE SET
                payload = EXCLUDED.payload,
                cached_at = EXCLUDED.cached_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(entry.key.kind.as_str())
        .bind(entry.key.chain.0 as i64)
        .bind(&entry.key.address)
        .bind(&entry.payload)
        .bind(entry.cached_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(DatabaseError::from(e)))?;
        Ok(())
    }

    #[instrument(skip(self, record), fields(event_type = %record.event_type))]
    async fn insert_webhook(&self, record: &NewWebhookRecord) -> Result<WebhookRecord, AppError> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO webhook_events (
                id, event_type, case_id, evidence_id, payload, signature, received_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&id)
        .bind(&record.event_type)
        .bind(&record.case_id)
        .bind(&record.evidence_id)
        .bind(Value::Object(record.data.clone()))
        .bind(&record.signature)
        .bind(record.received_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(DatabaseError::from(e)))?;

        Ok(WebhookRecord::from_new(id, record.clone()))
    }

    #[instrument(skip(self))]
    async fn list_recent_webhooks(&self, limit: i64) -> Result<Vec<WebhookRecord>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_type, case_id, evidence_id, payload, signature, received_at
            FROM webhook_events
            ORDER BY received_at DESC, seq DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(DatabaseError::Query(e.to_string())))?;

        rows.iter().map(Self::row_to_webhook).collect()
    }
}
