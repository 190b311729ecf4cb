//! Cache-aside accessor

use super::CacheStore;
use crate::{metrics, HolonetError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Get-or-compute-and-store against a [`CacheStore`]
///
/// All entries written through one accessor share its TTL. Concurrent misses
/// on the same key are not coalesced: each caller computes and writes, and
/// the last write wins.
#[derive(Clone)]
pub struct CacheAside {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl CacheAside {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Return the cached value for `key`, or compute, store and return it
    ///
    /// `compute` runs at most once per call and only on a miss. A `None`
    /// result surfaces as `NotFound` and is not cached. Errors from `compute`
    /// propagate unchanged. Store failures degrade to a miss.
    pub async fn get_or_compute<T, F, Fut>(&self, key: &str, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        if let Some(value) = self.lookup(key).await {
            metrics::record_cache_hit();
            debug!(key = key, "Cache hit");
            return Ok(value);
        }

        metrics::record_cache_miss();
        debug!(key = key, "Cache miss, computing");
        self.compute_and_store(key, compute).await
    }

    /// Compute and overwrite the entry for `key` regardless of what is cached
    pub async fn refresh<T, F, Fut>(&self, key: &str, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        debug!(key = key, "Refreshing cache entry");
        self.compute_and_store(key, compute).await
    }

    async fn compute_and_store<T, F, Fut>(&self, key: &str, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let value = compute()
            .await?
            .ok_or_else(|| HolonetError::NotFound(key.to_string()))?;

        self.write(key, &value).await;
        Ok(value)
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(key = key, error = %e, "Discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                metrics::record_cache_error();
                warn!(key = key, error = %e, "Cache unavailable, fetching upstream");
                None
            }
        }
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };

        match self.store.set(key, raw, self.ttl).await {
            Ok(()) => metrics::record_cache_store(),
            Err(e) => {
                metrics::record_cache_error();
                warn!(key = key, error = %e, "Failed to write cache entry");
            }
        }
    }
}
