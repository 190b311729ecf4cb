//! Holonet configuration file handling
//!
//! Loads ~/.config/holonet/config.yaml and layers `HOLONET_*` environment
//! overrides on top.

use crate::{HolonetError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Default upstream base URL
pub const DEFAULT_BASE_URL: &str = "https://swapi.dev/api";

/// Upstream API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the REST resource (no trailing slash needed)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Items per upstream page, used when page 1 does not reveal it
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Maximum number of page requests in flight for one collection
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_page_size() -> usize {
    10
}

fn default_concurrency() -> usize {
    5
}

fn default_timeout_secs() -> u64 {
    30
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_size: default_page_size(),
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Which cache store backs the cache-aside layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    /// In-process map, lost on exit
    Memory,
    /// SQLite file, survives restarts
    #[default]
    Sqlite,
}

impl FromStr for CacheBackend {
    type Err = HolonetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(CacheBackend::Memory),
            "sqlite" => Ok(CacheBackend::Sqlite),
            other => Err(HolonetError::Config(format!(
                "Invalid cache backend '{}'. Must be one of: memory, sqlite",
                other
            ))),
        }
    }
}

/// Cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default)]
    pub backend: CacheBackend,

    /// Path to the SQLite cache file
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,

    /// Time to live for every cache entry, in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_cache_path() -> PathBuf {
    // Always use ~/.config for consistency across platforms (macOS, Linux)
    let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(".config");
    path.push("holonet");
    path.push("cache.db");
    path
}

fn default_ttl_secs() -> u64 {
    3600
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            path: default_cache_path(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

/// Scheduled sync settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Seconds between two sync cycles (daily by default)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Run a cycle as soon as the daemon starts
    #[serde(default = "default_run_on_start")]
    pub run_on_start: bool,

    /// Whole-collection retries after a transient failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_interval_secs() -> u64 {
    24 * 60 * 60
}

fn default_run_on_start() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

impl SyncSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            run_on_start: default_run_on_start(),
            max_retries: default_max_retries(),
        }
    }
}

/// Holonet configuration
///
/// Represents the complete ~/.config/holonet/config.yaml file. Every section
/// is optional; missing values fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HolonetConfig {
    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub sync: SyncSettings,
}

impl HolonetConfig {
    /// Load configuration from the default path, falling back to defaults
    /// when the file does not exist
    pub fn load_default() -> Result<Self> {
        let path = Self::default_path();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    /// Load configuration from a specific path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(HolonetError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        tracing::info!(path = %path.display(), "Loading Holonet configuration");

        let content = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;

        tracing::debug!(
            base_url = %config.upstream.base_url,
            backend = ?config.cache.backend,
            ttl_secs = config.cache.ttl_secs,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        tracing::info!(path = %path.display(), "Saving Holonet configuration");

        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;

        Ok(())
    }

    /// Get the default config path (~/.config/holonet/config.yaml)
    pub fn default_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".config");
        path.push("holonet");
        path.push("config.yaml");
        path
    }

    /// Apply `HOLONET_*` overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("HOLONET_BASE_URL") {
            self.upstream.base_url = url;
        }
        if let Some(ttl) = lookup("HOLONET_CACHE_TTL") {
            self.cache.ttl_secs = parse_var("HOLONET_CACHE_TTL", &ttl)?;
        }
        if let Some(concurrency) = lookup("HOLONET_CONCURRENCY") {
            self.upstream.concurrency = parse_var("HOLONET_CONCURRENCY", &concurrency)?;
        }
        if let Some(page_size) = lookup("HOLONET_PAGE_SIZE") {
            self.upstream.page_size = parse_var("HOLONET_PAGE_SIZE", &page_size)?;
        }
        if let Some(backend) = lookup("HOLONET_CACHE_BACKEND") {
            self.cache.backend = backend.parse()?;
        }
        if let Some(path) = lookup("HOLONET_CACHE_PATH") {
            self.cache.path = PathBuf::from(path);
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        HolonetError::Config(format!("{} must be a non-negative integer, got '{}'", name, value))
    })
}
