//! Collection aggregator: paginator behind the cache, with filters and
//! pagination applied on the read path

use super::paginator::{decode_page, Paginator};
use crate::cache::{cache_key, CacheAside, Discriminator};
use crate::query::{paginate, Paginated, Pagination, Predicate, Queryable};
use crate::{HolonetError, Result};
use tracing::debug;

/// Cached access to whole collections and upstream pages
#[derive(Clone)]
pub struct CollectionAggregator {
    paginator: Paginator,
    cache: CacheAside,
}

impl CollectionAggregator {
    pub fn new(paginator: Paginator, cache: CacheAside) -> Self {
        Self { paginator, cache }
    }

    pub fn cache(&self) -> &CacheAside {
        &self.cache
    }

    /// Filtered, optionally paginated view of `T`'s collection
    ///
    /// Pagination is validated before any cache or upstream access.
    pub async fn query<T: Queryable>(
        &self,
        pagination: Option<Pagination>,
        filter: Option<&T::Filter>,
    ) -> Result<Paginated<T>> {
        if let Some(pagination) = &pagination {
            pagination.validate()?;
        }

        let mut items = self.fetch_collection::<T>().await?;
        if let Some(filter) = filter {
            items.retain(|item| filter.matches(item));
        }

        let collection = T::COLLECTION;
        debug!(
            collection = %collection,
            matched = items.len(),
            "Collection query"
        );
        paginate(items, pagination)
    }

    /// The merged, unfiltered collection, from cache when possible
    pub async fn fetch_collection<T: Queryable>(&self) -> Result<Vec<T>> {
        let key = cache_key(T::COLLECTION, Discriminator::All);
        let result = self
            .cache
            .get_or_compute(&key, || self.merged::<T>())
            .await;
        empty_when_absent(result, &key)
    }

    /// Re-paginate upstream and overwrite the cached collection
    pub async fn refresh_collection<T: Queryable>(&self) -> Result<Vec<T>> {
        let key = cache_key(T::COLLECTION, Discriminator::All);
        let result = self.cache.refresh(&key, || self.merged::<T>()).await;
        empty_when_absent(result, &key)
    }

    /// One upstream-aligned page, cached on its own key
    ///
    /// The filter is applied after the cache. An empty page is `NotFound`.
    pub async fn upstream_page<T: Queryable>(
        &self,
        page: u32,
        filter: Option<&T::Filter>,
    ) -> Result<Vec<T>> {
        if page == 0 {
            return Err(HolonetError::InvalidArgument(
                "upstream pages are numbered from 1".to_string(),
            ));
        }

        let key = cache_key(T::COLLECTION, Discriminator::Page(page));
        let items: Vec<T> = self
            .cache
            .get_or_compute(&key, || async {
                let envelope = self
                    .paginator
                    .source()
                    .fetch_page(T::COLLECTION, page)
                    .await?;
                let items = decode_page::<T>(envelope, page, None)?;
                Ok((!items.is_empty()).then_some(items))
            })
            .await?;

        Ok(match filter {
            Some(filter) => items.into_iter().filter(|item| filter.matches(item)).collect(),
            None => items,
        })
    }

    async fn merged<T: Queryable>(&self) -> Result<Option<Vec<T>>> {
        let items = self.paginator.fetch_all::<T>(None).await?;
        Ok((!items.is_empty()).then_some(items))
    }
}

/// An empty collection is never cached; surface it as an empty list
fn empty_when_absent<T>(result: Result<Vec<T>>, key: &str) -> Result<Vec<T>> {
    match result {
        Err(HolonetError::NotFound(missing)) if missing == key => Ok(Vec::new()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::fake::FakeSource;
    use crate::cache::{CacheStore, MemoryCache};
    use crate::query::{FieldFilter, FilmFilter, PlanetFilter};
    use std::sync::Arc;
    use std::time::Duration;
    use swapi::{Collection, Film, Planet};

    fn aggregator(source: Arc<FakeSource>) -> (CollectionAggregator, Arc<MemoryCache>) {
        let store = Arc::new(MemoryCache::new());
        let cache = CacheAside::new(store.clone(), Duration::from_secs(60));
        (
            CollectionAggregator::new(Paginator::new(source, 5, 10), cache),
            store,
        )
    }

    fn names(planets: &[Planet]) -> Vec<&str> {
        planets.iter().map(|p| p.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_second_query_served_from_cache() {
        let source = Arc::new(FakeSource::new().with_planets(25));
        let (aggregator, _store) = aggregator(source.clone());

        let cold: Paginated<Planet> = aggregator.query(None, None).await.unwrap();
        let warm: Paginated<Planet> = aggregator.query(None, None).await.unwrap();

        assert_eq!(cold, warm);
        assert_eq!(cold.items.len(), 25);
        assert_eq!(source.page_calls(Collection::Planets), 3);
    }

    #[tokio::test]
    async fn test_filters_share_one_cache_entry() {
        let source = Arc::new(FakeSource::new().with_planets(25));
        let (aggregator, store) = aggregator(source.clone());

        let filter = PlanetFilter::from_pairs([("name", "planet 2")]).unwrap();
        let filtered = aggregator.query::<Planet>(None, Some(&filter)).await.unwrap();
        let all = aggregator.query::<Planet>(None, None).await.unwrap();

        // "Planet 2" and "Planet 20".."Planet 25"
        assert_eq!(filtered.items.len(), 7);
        assert_eq!(all.items.len(), 25);
        assert_eq!(source.page_calls(Collection::Planets), 3);
        assert!(store.get("planets_all").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_empty_filter_equals_no_filter() {
        let source = Arc::new(FakeSource::new().with_planets(12));
        let (aggregator, _store) = aggregator(source);

        let unfiltered = aggregator.query::<Planet>(None, None).await.unwrap();
        let empty = aggregator
            .query::<Planet>(None, Some(&PlanetFilter::default()))
            .await
            .unwrap();

        assert_eq!(unfiltered, empty);
    }

    #[tokio::test]
    async fn test_paginated_query() {
        let source = Arc::new(FakeSource::new().with_planets(25));
        let (aggregator, _store) = aggregator(source);

        let page = aggregator
            .query::<Planet>(Some(Pagination::new(3, 10)), None)
            .await
            .unwrap();

        assert_eq!(
            names(&page.items),
            vec!["Planet 21", "Planet 22", "Planet 23", "Planet 24", "Planet 25"]
        );
        let meta = page.meta.unwrap();
        assert_eq!(meta.total_items, 25);
        assert_eq!(meta.total_pages, 3);
        assert!(!meta.has_next_page);
    }

    #[tokio::test]
    async fn test_invalid_pagination_skips_upstream() {
        let source = Arc::new(FakeSource::new().with_planets(25));
        let (aggregator, _store) = aggregator(source.clone());

        let result = aggregator
            .query::<Planet>(Some(Pagination::new(0, 10)), None)
            .await;

        assert!(matches!(result, Err(HolonetError::InvalidArgument(_))));
        assert_eq!(source.total_page_calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_collection_is_empty_result() {
        let source = Arc::new(FakeSource::new().with_planets(0));
        let (aggregator, store) = aggregator(source);

        let result = aggregator.query::<Planet>(None, None).await.unwrap();

        assert!(result.items.is_empty());
        assert!(store.get("planets_all").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failure_caches_nothing() {
        let source = Arc::new(FakeSource::new().with_planets(40).fail_page(Collection::Planets, 3));
        let (aggregator, store) = aggregator(source);

        let result = aggregator.query::<Planet>(None, None).await;

        assert!(matches!(result, Err(HolonetError::UpstreamUnavailable(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_bypasses_live_entry() {
        let source = Arc::new(FakeSource::new().with_planets(5));
        let (aggregator, _store) = aggregator(source.clone());

        aggregator.fetch_collection::<Planet>().await.unwrap();
        aggregator.refresh_collection::<Planet>().await.unwrap();
        aggregator.fetch_collection::<Planet>().await.unwrap();

        assert_eq!(source.page_calls(Collection::Planets), 2);
    }

    #[tokio::test]
    async fn test_upstream_page_cached_separately() {
        let source = Arc::new(FakeSource::new().with_numbered(Collection::Films, 14));
        let (aggregator, store) = aggregator(source.clone());

        let filter = FilmFilter::from_pairs([("episode_id", "12")]).unwrap();
        let page: Vec<Film> = aggregator.upstream_page(2, Some(&filter)).await.unwrap();
        let again: Vec<Film> = aggregator.upstream_page(2, None).await.unwrap();

        assert_eq!(page.len(), 1);
        assert_eq!(page[0].title, "Film 12");
        assert_eq!(again.len(), 4);
        assert_eq!(source.page_calls(Collection::Films), 1);
        assert!(store.get("films_page_2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_upstream_page_out_of_range() {
        let source = Arc::new(FakeSource::new().with_numbered(Collection::Films, 6));
        let (aggregator, _store) = aggregator(source);

        let result = aggregator.upstream_page::<Film>(3, None).await;
        assert!(matches!(result, Err(HolonetError::NotFound(_))));

        let result = aggregator.upstream_page::<Film>(0, None).await;
        assert!(matches!(result, Err(HolonetError::InvalidArgument(_))));
    }
}
