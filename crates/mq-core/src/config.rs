//! Configuration types and loading
//!
//! Settings are read from environment variables with defaults for anything
//! unset. `AppConfig::load` additionally honours a `.env` file.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration loading errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct AppConfig {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Search defaults and engine limits
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection acquire timeout in seconds
    pub connect_timeout_secs: u64,
    /// Idle timeout for connections in seconds
    pub idle_timeout_secs: u64,
    /// Maximum lifetime of a connection in seconds
    pub max_lifetime_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/member_query".to_string(),
            max_connections: 10,
            min_connections: 2,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }
}

impl DatabaseConfig {
    /// Create config with a specific URL
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// How paged searches obtain their total count
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CountStrategy {
    /// Always issue a count query
    Always,
    /// Skip the count query when the page itself proves the total
    #[default]
    Optimized,
}

impl CountStrategy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "always" | "simple" => Some(Self::Always),
            "optimized" | "complex" => Some(Self::Optimized),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SearchConfig {
    /// Page size used when a caller does not ask for one
    pub default_page_size: u64,
    /// Upper bound applied to requested page sizes
    pub max_page_size: u64,
    /// Timeout applied to every engine call, in milliseconds
    pub query_timeout_ms: u64,
    pub count_strategy: CountStrategy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 1000,
            query_timeout_ms: 30_000,
            count_strategy: CountStrategy::Optimized,
        }
    }
}

impl SearchConfig {
    /// Clamp a requested page size into `1..=max_page_size`
    pub fn clamp_page_size(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size.max(1))
    }

    pub fn query_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.query_timeout_ms)
    }
}

impl AppConfig {
    /// Load `.env` (if present) and then read the process environment
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!("No .env file loaded: {}", e);
        }
        Self::from_env()
    }

    /// Read configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // Database
        if let Some(url) = lookup("DATABASE_URL") {
            config.database.url = url;
        }
        if let Some(v) = parse_var(&lookup, "DB_MAX_CONNECTIONS")? {
            config.database.max_connections = v;
        }
        if let Some(v) = parse_var(&lookup, "DB_MIN_CONNECTIONS")? {
            config.database.min_connections = v;
        }
        if let Some(v) = parse_var(&lookup, "DB_CONNECT_TIMEOUT")? {
            config.database.connect_timeout_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "DB_IDLE_TIMEOUT")? {
            config.database.idle_timeout_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "DB_MAX_LIFETIME")? {
            config.database.max_lifetime_secs = v;
        }

        // Search
        if let Some(v) = parse_var(&lookup, "SEARCH_DEFAULT_PAGE_SIZE")? {
            config.search.default_page_size = v;
        }
        if let Some(v) = parse_var(&lookup, "SEARCH_MAX_PAGE_SIZE")? {
            config.search.max_page_size = v;
        }
        if let Some(v) = parse_var(&lookup, "SEARCH_QUERY_TIMEOUT_MS")? {
            config.search.query_timeout_ms = v;
        }
        if let Some(raw) = lookup("SEARCH_COUNT_STRATEGY") {
            config.search.count_strategy =
                CountStrategy::from_str(&raw).ok_or(ConfigError::InvalidValue {
                    key: "SEARCH_COUNT_STRATEGY",
                    value: raw,
                })?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid(format!(
                "DB_MIN_CONNECTIONS ({}) exceeds DB_MAX_CONNECTIONS ({})",
                self.database.min_connections, self.database.max_connections
            )));
        }
        if self.search.default_page_size == 0 || self.search.max_page_size == 0 {
            return Err(ConfigError::Invalid(
                "page sizes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}
