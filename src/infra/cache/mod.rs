//! Two-tier read-through cache for explorer data.
//!
//! Lookups go fast tier (in-process `DashMap`) → durable tier (database) →
//! upstream fetch, and a fetch writes back to both tiers. One freshness window
//! applies to every kind of data.
//!
//! Concurrent misses on the same key are not coalesced: each caller runs its
//! own fetch and the last write-back wins. The fast tier is never swept;
//! stale entries are ignored on read and overwritten on the next fetch.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::domain::{AppError, CacheEntry, CacheKey, DatabaseClient};

/// Default freshness window: 30 seconds
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);

/// Read-through cache shared by all request handlers
pub struct ReadThroughCache {
    /// Non-authoritative process-local copies, cleared on restart
    fast: DashMap<CacheKey, CacheEntry>,
    durable: Arc<dyn DatabaseClient>,
    ttl: chrono::Duration,
}

impl ReadThroughCache {
    /// Create a cache with the default TTL
    #[must_use]
    pub fn new(durable: Arc<dyn DatabaseClient>) -> Self {
        Self::with_ttl(durable, DEFAULT_CACHE_TTL)
    }

    /// Create a cache with a custom TTL
    #[must_use]
    pub fn with_ttl(durable: Arc<dyn DatabaseClient>, ttl: Duration) -> Self {
        Self {
            fast: DashMap::new(),
            durable,
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
        }
    }

    /// Number of keys held in the fast tier (fresh or stale)
    #[must_use]
    pub fn len(&self) -> usize {
        self.fast.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fast.is_empty()
    }

    /// Return the cached value for `key`, running `fetch` on a miss.
    ///
    /// Errors from `fetch` propagate and are never cached. Durable-tier
    /// failures only cost a cache hit.
    #[instrument(skip(self, fetch), fields(kind = %key.kind, chain = %key.chain, address = %key.address))]
    pub async fn get<T, F, Fut>(&self, key: &CacheKey, fetch: F) -> Result<T, AppError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let now = Utc::now();

        // The DashMap guard is released at the end of this statement.
        let local = self.fast.get(key).map(|entry| entry.value().clone());
        if let Some(entry) = local.filter(|e| e.is_fresh(now, self.ttl))
            && let Some(value) = decode(&entry)
        {
            debug!("Fast tier hit");
            return Ok(value);
        }

        match self.durable.get_cache_entry(key).await {
            Ok(Some(entry)) if entry.is_fresh(now, self.ttl) => {
                if let Some(value) = decode::<T>(&entry) {
                    debug!("Durable tier hit");
                    self.fast.insert(key.clone(), entry);
                    return Ok(value);
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Durable cache read failed, fetching upstream"),
        }

        debug!("Cache miss, fetching upstream");
        let value = fetch().await?;

        let entry = CacheEntry {
            key: key.clone(),
            payload: serde_json::to_value(&value)?,
            cached_at: Utc::now(),
        };
        self.fast.insert(key.clone(), entry.clone());
        if let Err(e) = self.durable.upsert_cache_entry(&entry).await {
            warn!(error = %e, "Durable cache write failed, continuing with fast tier only");
        }

        Ok(value)
    }
}

fn decode<T: DeserializeOwned>(entry: &CacheEntry) -> Option<T> {
    match serde_json::from_value(entry.payload.clone()) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "Discarding undecodable cache entry");
            None
        }
    }
}
