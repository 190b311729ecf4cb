//! Configuration system
//!
//! Loads ~/.config/holonet/config.yaml with support for:
//! - Upstream base URL, page size, concurrency ceiling and timeout
//! - Cache backend (memory or SQLite) and shared TTL
//! - Scheduled sync interval and retry budget
//! - `HOLONET_*` environment overrides

mod holonet_config;
pub mod validation;

pub use holonet_config::{
    CacheBackend, CacheSettings, HolonetConfig, SyncSettings, UpstreamConfig, DEFAULT_BASE_URL,
};
pub use validation::{validate_config, validate_config_result, ValidationError};
