//! Query facade
//!
//! [`Holonet`] wires the upstream client, cache store, aggregators and
//! analyzer together and exposes the typed and by-name query surface.

use crate::aggregator::{CollectionAggregator, EntityAccessor, Paginator};
use crate::analysis::{analyze, CorpusAnalysis};
use crate::cache::{open_store, CacheAside, CacheStore};
use crate::config::{validate_config_result, HolonetConfig};
use crate::query::{FieldFilter, Paginated, Pagination, Queryable};
use crate::sync::{self, SyncReport};
use crate::upstream::retry::RetryConfig;
use crate::upstream::{PageSource, SwapiClient};
use crate::Result;
use serde_json::Value;
use std::sync::Arc;
use swapi::{Character, Collection, Film, Planet, Resource, Species, Starship, Vehicle};

/// Star Wars API aggregator
#[derive(Clone)]
pub struct Holonet {
    config: HolonetConfig,
    collections: CollectionAggregator,
    entities: EntityAccessor,
    retry: RetryConfig,
}

impl Holonet {
    /// Assemble from an explicit page source and cache store
    pub fn new(
        source: Arc<dyn PageSource>,
        store: Arc<dyn CacheStore>,
        config: HolonetConfig,
    ) -> Self {
        let cache = CacheAside::new(store, config.cache.ttl());
        let paginator = Paginator::from_config(source.clone(), &config.upstream);

        Self {
            collections: CollectionAggregator::new(paginator, cache.clone()),
            entities: EntityAccessor::new(source, cache),
            retry: RetryConfig::for_sync(&config.sync),
            config,
        }
    }

    /// Validate `config`, then build the HTTP client and open the cache store
    pub fn from_config(config: HolonetConfig) -> Result<Self> {
        validate_config_result(&config)?;

        let client = SwapiClient::new(&config.upstream)?;
        let store = open_store(&config.cache)?;

        tracing::debug!(
            base_url = %client.base_url(),
            backend = ?config.cache.backend,
            ttl_secs = config.cache.ttl_secs,
            "Holonet initialized"
        );

        Ok(Self::new(Arc::new(client), store, config))
    }

    /// Override the retry policy used by [`Holonet::sync_all`]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &HolonetConfig {
        &self.config
    }

    pub fn collections(&self) -> &CollectionAggregator {
        &self.collections
    }

    /// Filtered, optionally paginated list of `T`
    pub async fn list<T: Queryable>(
        &self,
        pagination: Option<Pagination>,
        filter: Option<&T::Filter>,
    ) -> Result<Paginated<T>> {
        self.collections.query::<T>(pagination, filter).await
    }

    /// One `T` by id
    pub async fn get<T: Resource>(&self, id: &str) -> Result<T> {
        self.entities.get_by_id::<T>(id).await
    }

    /// List a collection named at runtime, filtering with `field=value` pairs
    ///
    /// Unknown collection names and filter fields are `InvalidArgument`.
    pub async fn list_collection<K, V>(
        &self,
        name: &str,
        pagination: Option<Pagination>,
        filter_pairs: &[(K, V)],
    ) -> Result<Paginated<Value>>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        match name.parse::<Collection>()? {
            Collection::Films => self.list_json::<Film, _, _>(pagination, filter_pairs).await,
            Collection::People => self.list_json::<Character, _, _>(pagination, filter_pairs).await,
            Collection::Planets => self.list_json::<Planet, _, _>(pagination, filter_pairs).await,
            Collection::Species => self.list_json::<Species, _, _>(pagination, filter_pairs).await,
            Collection::Starships => {
                self.list_json::<Starship, _, _>(pagination, filter_pairs).await
            }
            Collection::Vehicles => {
                self.list_json::<Vehicle, _, _>(pagination, filter_pairs).await
            }
        }
    }

    /// Fetch one entity of a collection named at runtime
    pub async fn get_entity(&self, name: &str, id: &str) -> Result<Value> {
        match name.parse::<Collection>()? {
            Collection::Films => self.get_json::<Film>(id).await,
            Collection::People => self.get_json::<Character>(id).await,
            Collection::Planets => self.get_json::<Planet>(id).await,
            Collection::Species => self.get_json::<Species>(id).await,
            Collection::Starships => self.get_json::<Starship>(id).await,
            Collection::Vehicles => self.get_json::<Vehicle>(id).await,
        }
    }

    /// Word frequencies of all opening crawls and the characters they
    /// mention most
    pub async fn analyze_corpus(&self) -> Result<CorpusAnalysis> {
        let (films, people) = tokio::try_join!(
            self.collections.fetch_collection::<Film>(),
            self.collections.fetch_collection::<Character>()
        )?;

        let crawls: Vec<&str> = films.iter().map(|f| f.opening_crawl.as_str()).collect();
        let names: Vec<&str> = people.iter().map(|c| c.name.as_str()).collect();
        analyze(&crawls, &names)
    }

    /// Refresh every collection in the cache; never fails as a whole
    pub async fn sync_all(&self) -> SyncReport {
        sync::sync_all(&self.collections, &self.retry).await
    }

    /// Drop every cached entry
    pub async fn clear_cache(&self) -> Result<()> {
        tracing::info!("Clearing cache");
        self.collections.cache().store().clear().await
    }

    /// Drop expired cache entries, returning how many were removed
    pub async fn purge_expired(&self) -> Result<usize> {
        self.collections.cache().store().purge_expired().await
    }

    async fn list_json<T, K, V>(
        &self,
        pagination: Option<Pagination>,
        filter_pairs: &[(K, V)],
    ) -> Result<Paginated<Value>>
    where
        T: Queryable,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let filter = T::Filter::from_pairs(filter_pairs.iter().map(|(k, v)| (k, v)))?;
        let filter = (!filter.is_empty()).then_some(filter);

        self.list::<T>(pagination, filter.as_ref())
            .await?
            .into_json()
    }

    async fn get_json<T: Resource>(&self, id: &str) -> Result<Value> {
        let entity = self.get::<T>(id).await?;
        Ok(serde_json::to_value(entity)?)
    }
}
