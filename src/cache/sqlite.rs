//! SQLite cache store

use super::{CacheStore, MAX_TTL};
use crate::{HolonetError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// SQLite cache configuration
#[derive(Debug, Clone)]
pub struct SqliteCacheConfig {
    /// Path to SQLite database file
    pub path: PathBuf,

    /// Enable WAL mode for better concurrency
    pub wal_mode: bool,
}

impl Default for SqliteCacheConfig {
    fn default() -> Self {
        // Always use ~/.config for consistency across platforms (macOS, Linux)
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".config");
        path.push("holonet");
        path.push("cache.db");

        Self {
            path,
            wal_mode: true,
        }
    }
}

/// Cache store persisted in a SQLite file
///
/// One connection guarded by a mutex; the lock is only held for a single
/// statement, never across an upstream call.
pub struct SqliteCache {
    conn: Mutex<Connection>,
    config: SqliteCacheConfig,
}

impl SqliteCache {
    /// Open or create a cache database
    pub fn new(config: SqliteCacheConfig) -> Result<Self> {
        // Create parent directory if needed
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        tracing::info!(path = %config.path.display(), "Opening cache database");

        let conn = Connection::open(&config.path)?;

        if config.wal_mode {
            conn.pragma_update(None, "journal_mode", "WAL")?;
        }

        let cache = Self {
            conn: Mutex::new(conn),
            config,
        };

        cache.init_schema()?;

        Ok(cache)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.lock()?.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_cache_entries_expires ON cache_entries(expires_at);
            "#,
        )?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| HolonetError::CacheUnavailable("cache connection lock poisoned".to_string()))
    }

    /// Read a live entry
    pub fn get_entry(&self, key: &str) -> Result<Option<String>> {
        let now = now_millis();
        let value = self
            .lock()?
            .query_row(
                "SELECT value FROM cache_entries WHERE key = ? AND expires_at > ?",
                params![key, now],
                |row| row.get(0),
            )
            .optional()
            .map_err(unavailable)?;
        Ok(value)
    }

    /// Insert or replace an entry
    pub fn put_entry(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let now = now_millis();
        let ttl_millis = i64::try_from(ttl.min(MAX_TTL).as_millis()).unwrap_or(i64::MAX);
        let expires_at = now.saturating_add(ttl_millis);

        self.lock()?
            .execute(
                "INSERT OR REPLACE INTO cache_entries (key, value, expires_at, updated_at) VALUES (?, ?, ?, ?)",
                params![key, value, expires_at, now],
            )
            .map_err(unavailable)?;

        tracing::debug!(key = key, ttl_secs = ttl.as_secs(), "Cache entry stored");
        Ok(())
    }

    /// Delete every expired entry, returning how many were removed
    pub fn purge_expired_entries(&self) -> Result<usize> {
        let removed = self
            .lock()?
            .execute(
                "DELETE FROM cache_entries WHERE expires_at <= ?",
                params![now_millis()],
            )
            .map_err(unavailable)?;

        if removed > 0 {
            tracing::debug!(removed = removed, "Purged expired cache entries");
        }
        Ok(removed)
    }

    /// Clear all cached data
    pub fn clear_all(&self) -> Result<()> {
        tracing::info!("Clearing cache");

        self.lock()?
            .execute("DELETE FROM cache_entries", [])
            .map_err(unavailable)?;

        Ok(())
    }

    /// Get cache statistics
    pub fn stats(&self) -> Result<CacheStats> {
        let now = now_millis();
        let conn = self.lock()?;

        let entry_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))?;
        let live_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM cache_entries WHERE expires_at > ?",
            params![now],
            |row| row.get(0),
        )?;
        let last_update: Option<i64> =
            conn.query_row("SELECT MAX(updated_at) FROM cache_entries", [], |row| {
                row.get(0)
            })?;

        let age = last_update.map(|last| Duration::from_millis((now - last).max(0) as u64));

        Ok(CacheStats {
            entry_count: entry_count as usize,
            live_count: live_count as usize,
            last_update,
            age,
        })
    }

    /// Get the database path
    pub fn path(&self) -> &Path {
        &self.config.path
    }
}

#[async_trait]
impl CacheStore for SqliteCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.get_entry(key)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        self.put_entry(key, &value, ttl)
    }

    async fn clear(&self) -> Result<()> {
        self.clear_all()
    }

    async fn purge_expired(&self) -> Result<usize> {
        self.purge_expired_entries()
    }
}

/// Cache statistics
#[derive(Debug)]
pub struct CacheStats {
    pub entry_count: usize,
    pub live_count: usize,
    pub last_update: Option<i64>,
    pub age: Option<Duration>,
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn unavailable(err: rusqlite::Error) -> HolonetError {
    HolonetError::CacheUnavailable(err.to_string())
}
