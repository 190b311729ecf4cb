//! In-process cache store

use super::{CacheStore, MAX_TTL};
use crate::{HolonetError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

/// Cache store backed by a map in process memory
///
/// Entries are evicted lazily when read after expiry, or in bulk by
/// [`CacheStore::purge_expired`].
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, MemoryEntry>>> {
        self.entries
            .lock()
            .map_err(|_| HolonetError::CacheUnavailable("memory cache lock poisoned".to_string()))
    }

    /// Number of stored entries, including expired ones not yet evicted
    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.lock()?;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let expires_at = Instant::now()
            .checked_add(ttl.min(MAX_TTL))
            .ok_or_else(|| {
                HolonetError::CacheUnavailable(format!("TTL of {}s is out of range", ttl.as_secs()))
            })?;
        self.lock()?
            .insert(key.to_string(), MemoryEntry { value, expires_at });
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        Ok(before - entries.len())
    }
}
