//! Holonet - cache-aside aggregator for the Star Wars API
//!
//! Holonet pages through SWAPI collections with bounded concurrency, merges
//! them deterministically, caches the result at entity, page and collection
//! granularity with a shared TTL, and answers filtered, paginated queries
//! from the cache. It also analyzes the film opening crawls for word
//! frequencies and character mentions.
//!
//! # Architecture
//!
//! - **upstream**: HTTP page fetcher and retry policy
//! - **cache**: Cache stores (memory, SQLite) and the cache-aside accessor
//! - **aggregator**: Bounded concurrent paginator, collection and entity access
//! - **query**: Filter predicates and offset pagination
//! - **analysis**: Word frequency and character mention analysis
//! - **sync**: Full refresh of every collection and the scheduling daemon
//! - **service**: The [`Holonet`] query facade tying it all together
//!
//! # Example
//!
//! ```no_run
//! use holonet::config::HolonetConfig;
//! use holonet::query::{FieldFilter, FilmFilter, Pagination};
//! use holonet::Holonet;
//! use swapi::Film;
//!
//! # async fn example() -> holonet::Result<()> {
//! let holonet = Holonet::from_config(HolonetConfig::load_default()?)?;
//!
//! let filter = FilmFilter::from_pairs([("director", "lucas")])?;
//! let page = holonet
//!     .list::<Film>(Some(Pagination::new(1, 3)), Some(&filter))
//!     .await?;
//! for film in &page.items {
//!     println!("{} (episode {})", film.title, film.episode_id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod analysis;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod query;
pub mod service;
pub mod sync;
pub mod upstream;

// Re-exports
pub use error::{HolonetError, Result};
pub use service::Holonet;
pub use swapi;
