//! Runtime configuration
//!
//! Read once at startup from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::provider::cache::{InMemoryCache, NullCache, ResponseCache};
use crate::provider::usda::DEFAULT_BASE_URL;

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer (got {value:?})")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} must be 'memory' or 'off' (got {value:?})")]
    InvalidCacheMode { var: &'static str, value: String },
}

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Response caching for the food-data provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    Memory,
    Off,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub usda_api_key: Option<String>,
    pub usda_base_url: String,
    pub cache_mode: CacheMode,
    pub cache_ttl: Duration,
    pub http_timeout: Duration,
}

impl AppConfig {
    /// Load from the process environment
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup (tests pass a map)
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_path = get("FORMULATOR_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(default_database_path);

        let cache_mode = match get("FORMULATOR_CACHE").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("memory") => CacheMode::Memory,
            Some("off") | Some("none") => CacheMode::Off,
            Some(other) => {
                return Err(ConfigError::InvalidCacheMode {
                    var: "FORMULATOR_CACHE",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            database_path,
            usda_api_key: get("USDA_API_KEY"),
            usda_base_url: get("FORMULATOR_USDA_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            cache_mode,
            cache_ttl: Duration::from_secs(seconds(get("FORMULATOR_CACHE_TTL_SECS"), "FORMULATOR_CACHE_TTL_SECS", 900)?),
            http_timeout: Duration::from_secs(seconds(
                get("FORMULATOR_HTTP_TIMEOUT_SECS"),
                "FORMULATOR_HTTP_TIMEOUT_SECS",
                20,
            )?),
        })
    }

    /// Cache collaborator selected by `cache_mode`
    pub fn build_cache(&self) -> Arc<dyn ResponseCache> {
        match self.cache_mode {
            CacheMode::Memory => Arc::new(InMemoryCache::new(Some(self.cache_ttl))),
            CacheMode::Off => Arc::new(NullCache),
        }
    }
}

fn seconds(value: Option<String>, var: &'static str, default: u64) -> ConfigResult<u64> {
    match value {
        None => Ok(default),
        Some(v) => u64::from_str(&v).map_err(|_| ConfigError::InvalidNumber { var, value: v }),
    }
}

/// `<project>/data/formulator.db`, resolved from the executable location
fn default_database_path() -> PathBuf {
    let mut path = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    // Go up from target/release or target/debug to project root
    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(grandparent) = path.parent().and_then(|p| p.parent()) {
            path = grandparent.to_path_buf();
        }
    }

    path.push("data");
    path.push("formulator.db");
    path
}
