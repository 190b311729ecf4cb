//! Error types for Holonet
//!
//! One error enum covers every failure mode, from caller mistakes through
//! upstream and cache failures. Uses thiserror for ergonomic error handling.

use thiserror::Error;

/// Result type alias for Holonet operations
pub type Result<T> = std::result::Result<T, HolonetError>;

/// Comprehensive error type for Holonet operations
#[derive(Error, Debug)]
pub enum HolonetError {
    /// Bad pagination, filter, collection name or id supplied by the caller
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Transient network or HTTP failure talking to the upstream API
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Upstream asked us to slow down (seconds until retry)
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Upstream response did not have the expected shape
    #[error("Malformed upstream response: {0}")]
    UpstreamMalformed(String),

    /// Entity absent upstream, or a cache-aside computation yielded nothing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Cache store could not be reached
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// SQLite database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<swapi::Error> for HolonetError {
    fn from(err: swapi::Error) -> Self {
        match err {
            swapi::Error::UnknownCollection(name) => {
                HolonetError::InvalidArgument(format!("unknown collection '{}'", name))
            }
            swapi::Error::Json(e) => HolonetError::UpstreamMalformed(e.to_string()),
        }
    }
}

impl crate::upstream::retry::RetryableError for HolonetError {
    fn retry_decision(&self) -> crate::upstream::retry::RetryDecision {
        use crate::upstream::retry::RetryDecision;
        use std::time::Duration;

        match self {
            HolonetError::UpstreamUnavailable(_) => RetryDecision::Retry,
            HolonetError::RateLimited(secs) => {
                RetryDecision::RetryAfter(Duration::from_secs(*secs))
            }
            HolonetError::InvalidArgument(_)
            | HolonetError::UpstreamMalformed(_)
            | HolonetError::NotFound(_)
            | HolonetError::CacheUnavailable(_)
            | HolonetError::Config(_)
            | HolonetError::Io(_)
            | HolonetError::Json(_)
            | HolonetError::Yaml(_)
            | HolonetError::Database(_)
            | HolonetError::Other(_) => RetryDecision::NoRetry,
        }
    }
}

/// Parse a `Retry-After` header value given in seconds
pub(crate) fn parse_retry_after(value: Option<&str>) -> u64 {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(60)
}
