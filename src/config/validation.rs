//! Configuration validation
//!
//! Validates Holonet configuration for correctness:
//! - Upstream base URL parses as http(s)
//! - Page size, concurrency, timeouts and TTL are positive
//! - TTL does not exceed the cache stores' ceiling
//! - Sync interval is positive

use super::holonet_config::HolonetConfig;
use crate::cache::MAX_TTL;
use crate::HolonetError;

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validation result
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// Validate a Holonet configuration, collecting every problem
pub fn validate_config(config: &HolonetConfig) -> ValidationResult {
    let mut errors = Vec::new();

    match reqwest::Url::parse(&config.upstream.base_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            "upstream.base_url",
            format!("Unsupported scheme '{}'. Must be http or https", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(
            "upstream.base_url",
            format!("Invalid URL '{}': {}", config.upstream.base_url, e),
        )),
    }

    if config.upstream.page_size == 0 {
        errors.push(ValidationError::new(
            "upstream.page_size",
            "Page size must be greater than 0",
        ));
    }

    if config.upstream.concurrency == 0 {
        errors.push(ValidationError::new(
            "upstream.concurrency",
            "Concurrency must be greater than 0",
        ));
    }

    if config.upstream.timeout_secs == 0 {
        errors.push(ValidationError::new(
            "upstream.timeout_secs",
            "Timeout must be greater than 0",
        ));
    }

    if config.cache.ttl_secs == 0 {
        errors.push(ValidationError::new(
            "cache.ttl_secs",
            "TTL must be greater than 0",
        ));
    } else if config.cache.ttl_secs > MAX_TTL.as_secs() {
        errors.push(ValidationError::new(
            "cache.ttl_secs",
            format!("TTL must be at most {} seconds", MAX_TTL.as_secs()),
        ));
    }

    if config.sync.interval_secs == 0 {
        errors.push(ValidationError::new(
            "sync.interval_secs",
            "Sync interval must be greater than 0",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate and fold all problems into a single configuration error
pub fn validate_config_result(config: &HolonetConfig) -> crate::Result<()> {
    validate_config(config).map_err(|errors| {
        HolonetError::Config(
            errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        )
    })
}
