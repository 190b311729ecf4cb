//! Bounded concurrent paginator

use crate::config::UpstreamConfig;
use crate::query::{Predicate, Queryable};
use crate::upstream::PageSource;
use crate::{HolonetError, Result};
use futures::future::try_join_all;
use serde_json::Value;
use std::sync::Arc;
use swapi::Envelope;
use tracing::debug;

/// Walks every page of a collection with at most `concurrency` requests in
/// flight, merging results in page order
#[derive(Clone)]
pub struct Paginator {
    source: Arc<dyn PageSource>,
    concurrency: usize,
    page_size: usize,
}

impl Paginator {
    pub fn new(source: Arc<dyn PageSource>, concurrency: usize, page_size: usize) -> Self {
        Self {
            source,
            concurrency: concurrency.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn from_config(source: Arc<dyn PageSource>, config: &UpstreamConfig) -> Self {
        Self::new(source, config.concurrency, config.page_size)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn source(&self) -> &Arc<dyn PageSource> {
        &self.source
    }

    /// Fetch and merge every page of `T`'s collection
    ///
    /// Page 1 is fetched alone to learn the total count. The remaining pages
    /// go out in chunks of `concurrency`; each chunk is awaited as a whole
    /// before the next starts. Any failed page fails the whole call and
    /// discards what was gathered so far.
    pub async fn fetch_all<T: Queryable>(&self, filter: Option<&T::Filter>) -> Result<Vec<T>> {
        let collection = T::COLLECTION;
        let first = self.source.fetch_page(collection, 1).await?;

        let total_pages = if first.is_last() {
            1
        } else {
            // Upstream's own page size, as long as page 1 is a full page
            let page_size = if first.results.is_empty() {
                self.page_size
            } else {
                first.results.len()
            };
            total_pages(first.count, page_size)
        };

        debug!(
            collection = %collection,
            count = first.count,
            total_pages = total_pages,
            concurrency = self.concurrency,
            "Paginating collection"
        );

        let mut items = decode_page::<T>(first, 1, filter)?;
        // Chunks are built lazily; total_pages comes from upstream's count
        let chunk_len = u32::try_from(self.concurrency).unwrap_or(u32::MAX);
        for start in (2..=total_pages).step_by(self.concurrency) {
            let end = start.saturating_add(chunk_len - 1).min(total_pages);
            let pages = try_join_all((start..=end).map(|page| self.fetch_page::<T>(page, filter)))
                .await?;
            for page in pages {
                items.extend(page);
            }
        }

        Ok(items)
    }

    /// Fetch and decode one page that the envelope count promised exists
    async fn fetch_page<T: Queryable>(
        &self,
        page: u32,
        filter: Option<&T::Filter>,
    ) -> Result<Vec<T>> {
        let envelope = self
            .source
            .fetch_page(T::COLLECTION, page)
            .await
            .map_err(|e| match e {
                HolonetError::NotFound(_) => HolonetError::UpstreamMalformed(format!(
                    "{} page {} is missing although the reported count includes it",
                    T::COLLECTION,
                    page
                )),
                other => other,
            })?;
        decode_page(envelope, page, filter)
    }
}

/// Number of upstream pages for `count` items, never less than one
pub fn total_pages(count: u64, page_size: usize) -> u32 {
    let pages = count.div_ceil(page_size.max(1) as u64).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Decode a raw page into `T` and apply the filter
pub(crate) fn decode_page<T: Queryable>(
    envelope: Envelope<Value>,
    page: u32,
    filter: Option<&T::Filter>,
) -> Result<Vec<T>> {
    let envelope = envelope.decode::<T>().map_err(|e| {
        HolonetError::UpstreamMalformed(format!("{} page {}: {}", T::COLLECTION, page, e))
    })?;

    Ok(match filter {
        Some(filter) => envelope
            .results
            .into_iter()
            .filter(|item| filter.matches(item))
            .collect(),
        None => envelope.results,
    })
}
