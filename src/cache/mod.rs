//! Cache layer for upstream data
//!
//! The cache store is an injected capability ([`CacheStore`]) with get/set
//! and a per-entry TTL. Two stores ship: an in-process [`MemoryCache`] and a
//! [`SqliteCache`] that survives restarts. [`CacheAside`] wraps any fetch in
//! get-or-compute-and-store against a store.
//!
//! Keys are deterministic: `<collection>_all` for a merged collection,
//! `<collection>_page_<n>` for an upstream page and `<collection>_<id>` for a
//! single entity. Filters and pagination never appear in a key; they are
//! applied to the cached payload on every read.

mod aside;
mod memory;
mod sqlite;

pub use aside::CacheAside;
pub use memory::MemoryCache;
pub use sqlite::{CacheStats, SqliteCache, SqliteCacheConfig};

use crate::config::{CacheBackend, CacheSettings};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use swapi::Collection;

/// Key-value store with per-entry expiry
///
/// Every operation may fail with `CacheUnavailable`; callers treat that as a
/// miss (on read) or a no-op (on write).
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up a live entry
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store an entry that expires after `ttl`
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Drop every entry
    async fn clear(&self) -> Result<()>;

    /// Drop expired entries, returning how many were removed
    async fn purge_expired(&self) -> Result<usize>;
}

/// Longest TTL a store honours; longer TTLs are clamped to it
pub const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Which view of a collection a cache entry holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discriminator<'a> {
    /// The full merged collection
    All,
    /// One upstream-aligned page
    Page(u32),
    /// A single entity
    Entity(&'a str),
}

/// Build the cache key for a collection view
pub fn cache_key(collection: Collection, discriminator: Discriminator<'_>) -> String {
    match discriminator {
        Discriminator::All => format!("{}_all", collection.key()),
        Discriminator::Page(page) => format!("{}_page_{}", collection.key(), page),
        Discriminator::Entity(id) => format!("{}_{}", collection.key(), id),
    }
}

/// Open the store selected by the cache settings
pub fn open_store(settings: &CacheSettings) -> Result<Arc<dyn CacheStore>> {
    match settings.backend {
        CacheBackend::Memory => {
            tracing::debug!("Using in-memory cache store");
            Ok(Arc::new(MemoryCache::new()))
        }
        CacheBackend::Sqlite => {
            let cache = SqliteCache::new(SqliteCacheConfig {
                path: settings.path.clone(),
                ..Default::default()
            })?;
            Ok(Arc::new(cache))
        }
    }
}
