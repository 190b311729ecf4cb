//! Remote collection aggregator
//!
//! Pages through upstream collections with bounded concurrency, caches the
//! merged result and answers filtered, paginated queries from it.

mod collection;
mod entity;
mod paginator;

#[cfg(test)]
pub(crate) mod fake;

pub use collection::CollectionAggregator;
pub use entity::EntityAccessor;
pub use paginator::{total_pages, Paginator};
