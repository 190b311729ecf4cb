//! Scheduled cache refresh
//!
//! [`sync_all`] re-paginates every collection and overwrites its cached
//! merged entry. Collections refresh concurrently and independently: one
//! failing collection is reported, never propagated. [`SyncDaemon`] calls it
//! on start and on a fixed interval.

mod daemon;

pub use daemon::{
    recv_event, SyncCommand, SyncDaemon, SyncDaemonConfig, SyncEvent,
    DEFAULT_EVENT_CHANNEL_CAPACITY, DEFAULT_SYNC_INTERVAL,
};

use crate::aggregator::CollectionAggregator;
use crate::metrics;
use crate::upstream::retry::{with_retry, RetryConfig};
use crate::Result;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use swapi::{Character, Collection, Film, Planet, Species, Starship, Vehicle};
use tracing::{info, warn};

/// Outcome of refreshing one collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionOutcome {
    pub collection: Collection,

    /// Number of entities now cached, on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<usize>,

    /// Error message after retries were exhausted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub duration_ms: u64,
}

impl CollectionOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of one sync cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<CollectionOutcome>,
}

impl SyncReport {
    /// Check if every collection refreshed
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(CollectionOutcome::is_success)
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Total entities cached across successful collections
    pub fn total_items(&self) -> usize {
        self.outcomes.iter().filter_map(|o| o.items).sum()
    }

    pub fn duration(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }

    pub fn outcome(&self, collection: Collection) -> Option<&CollectionOutcome> {
        self.outcomes.iter().find(|o| o.collection == collection)
    }
}

/// Refresh every collection, retrying each one as a whole on transient errors
pub async fn sync_all(collections: &CollectionAggregator, retry: &RetryConfig) -> SyncReport {
    let started_at = Utc::now();
    info!("Starting sync of all collections");

    let outcomes = join_all(
        Collection::ALL
            .iter()
            .map(|&collection| sync_collection(collections, retry, collection)),
    )
    .await;

    let report = SyncReport {
        started_at,
        finished_at: Utc::now(),
        outcomes,
    };

    info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        items = report.total_items(),
        duration_ms = report.duration().as_millis() as u64,
        "Sync completed"
    );
    report
}

async fn sync_collection(
    collections: &CollectionAggregator,
    retry: &RetryConfig,
    collection: Collection,
) -> CollectionOutcome {
    let started = Instant::now();
    let result = with_retry(retry, collection.key(), || refresh(collections, collection)).await;
    let elapsed = started.elapsed();

    metrics::record_sync(collection.key(), result.is_ok(), elapsed.as_secs_f64());

    let duration_ms = elapsed.as_millis() as u64;
    match result {
        Ok(items) => {
            info!(collection = %collection, items = items, duration_ms = duration_ms, "Collection synced");
            CollectionOutcome {
                collection,
                items: Some(items),
                error: None,
                duration_ms,
            }
        }
        Err(e) => {
            warn!(collection = %collection, error = %e, "Collection sync failed");
            CollectionOutcome {
                collection,
                items: None,
                error: Some(e.to_string()),
                duration_ms,
            }
        }
    }
}

async fn refresh(collections: &CollectionAggregator, collection: Collection) -> Result<usize> {
    let count = match collection {
        Collection::Films => collections.refresh_collection::<Film>().await?.len(),
        Collection::People => collections.refresh_collection::<Character>().await?.len(),
        Collection::Planets => collections.refresh_collection::<Planet>().await?.len(),
        Collection::Species => collections.refresh_collection::<Species>().await?.len(),
        Collection::Starships => collections.refresh_collection::<Starship>().await?.len(),
        Collection::Vehicles => collections.refresh_collection::<Vehicle>().await?.len(),
    };
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::fake::FakeSource;
    use crate::aggregator::Paginator;
    use crate::cache::{CacheAside, CacheStore, MemoryCache};
    use std::sync::Arc;

    fn aggregator(source: Arc<FakeSource>) -> (CollectionAggregator, Arc<MemoryCache>) {
        let store = Arc::new(MemoryCache::new());
        let cache = CacheAside::new(store.clone(), Duration::from_secs(60));
        (
            CollectionAggregator::new(Paginator::new(source, 5, 10), cache),
            store,
        )
    }

    #[tokio::test]
    async fn test_sync_all_refreshes_every_collection() {
        let source = Arc::new(FakeSource::new().with_all_collections(12));
        let (aggregator, store) = aggregator(source.clone());

        let report = sync_all(&aggregator, &RetryConfig::none()).await;

        assert!(report.is_success());
        assert_eq!(report.outcomes.len(), 6);
        assert_eq!(report.total_items(), 72);
        assert!(report.finished_at >= report.started_at);
        for collection in Collection::ALL {
            let key = format!("{}_all", collection.key());
            assert!(store.get(&key).await.unwrap().is_some(), "{} not cached", key);
        }

        // A second sync refetches despite live entries
        sync_all(&aggregator, &RetryConfig::none()).await;
        assert_eq!(source.total_page_calls(), 24);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_others() {
        let source = Arc::new(
            FakeSource::new()
                .with_all_collections(5)
                .fail_page(Collection::Species, 1),
        );
        let (aggregator, store) = aggregator(source);

        let report = sync_all(&aggregator, &RetryConfig::none()).await;

        assert!(!report.is_success());
        assert_eq!(report.succeeded(), 5);
        assert_eq!(report.failed(), 1);

        let species = report.outcome(Collection::Species).unwrap();
        assert!(species.items.is_none());
        assert!(species.error.as_deref().unwrap().contains("HTTP 500"));
        assert!(store.get("species_all").await.unwrap().is_none());
        assert_eq!(report.outcome(Collection::Films).unwrap().items, Some(5));
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let source = Arc::new(
            FakeSource::new()
                .with_all_collections(3)
                .fail_page(Collection::Vehicles, 1),
        );
        let (aggregator, _store) = aggregator(source.clone());
        let retry = RetryConfig {
            max_retries: 2,
            initial_backoff: Duration::from_millis(1),
            jitter: false,
            ..RetryConfig::quick()
        };

        let report = sync_all(&aggregator, &retry).await;

        assert_eq!(report.failed(), 1);
        assert_eq!(source.page_calls(Collection::Vehicles), 3);
        assert_eq!(source.page_calls(Collection::Films), 1);
    }

    #[test]
    fn test_report_serializes() {
        let now = Utc::now();
        let report = SyncReport {
            started_at: now,
            finished_at: now,
            outcomes: vec![CollectionOutcome {
                collection: Collection::People,
                items: Some(82),
                error: None,
                duration_ms: 120,
            }],
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcomes"][0]["collection"], "people");
        assert_eq!(json["outcomes"][0]["items"], 82);
        assert!(json["outcomes"][0].get("error").is_none());
    }
}
