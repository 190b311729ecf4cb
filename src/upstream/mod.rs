//! Upstream SWAPI access
//!
//! [`PageSource`] is the seam between the aggregators and the network: it
//! fetches one raw page or one raw entity. [`SwapiClient`] is the HTTP
//! implementation; tests substitute in-memory sources.

mod client;
pub mod retry;

pub use client::SwapiClient;

use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use swapi::{Collection, Envelope};

/// Source of raw upstream pages and entities
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch one page (1-based) of a collection
    ///
    /// A page that does not exist fails with `NotFound`.
    async fn fetch_page(&self, collection: Collection, page: u32) -> Result<Envelope<Value>>;

    /// Fetch a single entity, `None` when upstream has no such id
    async fn fetch_entity(&self, collection: Collection, id: &str) -> Result<Option<Value>>;
}
