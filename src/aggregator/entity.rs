//! Single-entity accessor

use crate::cache::{cache_key, CacheAside, Discriminator};
use crate::upstream::PageSource;
use crate::{HolonetError, Result};
use std::sync::Arc;
use swapi::Resource;

/// Cached lookup of one entity by id
#[derive(Clone)]
pub struct EntityAccessor {
    source: Arc<dyn PageSource>,
    cache: CacheAside,
}

impl EntityAccessor {
    pub fn new(source: Arc<dyn PageSource>, cache: CacheAside) -> Self {
        Self { source, cache }
    }

    /// Fetch `T` by id, `NotFound` when upstream has no such entity
    pub async fn get_by_id<T: Resource>(&self, id: &str) -> Result<T> {
        let id = id.trim();
        if id.is_empty() {
            return Err(HolonetError::InvalidArgument(
                "entity id must not be empty".to_string(),
            ));
        }

        let collection = T::COLLECTION;
        let key = cache_key(collection, Discriminator::Entity(id));

        self.cache
            .get_or_compute(&key, || async {
                let Some(raw) = self.source.fetch_entity(collection, id).await? else {
                    return Ok(None);
                };
                serde_json::from_value::<T>(raw).map(Some).map_err(|e| {
                    HolonetError::UpstreamMalformed(format!("{} {}: {}", collection, id, e))
                })
            })
            .await
    }
}
