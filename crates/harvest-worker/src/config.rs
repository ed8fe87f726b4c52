//! Worker configuration
//!
//! Sources, lowest precedence first: built-in defaults, an optional YAML file,
//! then environment variables (a `.env` file is loaded into the environment
//! first).

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::catalog::DEFAULT_PAGE_SIZE;
use crate::rate_limit::DEFAULT_MIN_CALL_INTERVAL;
use crate::retry::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_COOLDOWN};

// ============================================================================
// Configuration Defaults
// ============================================================================

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/harvest";

/// Default maximum database connections. One worker runs one flow, so a small
/// pool is plenty.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 4;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default catalog API base URL.
pub const DEFAULT_CATALOG_API_URL: &str = "https://api.soundcloud.com";

/// Default per-request timeout for catalog calls in seconds.
pub const DEFAULT_CATALOG_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration error: {0}. Check your environment variables or config file.")]
    Invalid(String),
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// Complete worker configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Identifier recorded as the owner of claimed shards
    pub worker_id: String,
    pub database: DatabaseConfig,
    pub catalog: CatalogConfig,
    pub harvest: HarvestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,
    /// API credential sent as `client_id`
    pub client_id: String,
    pub page_size: u32,
    pub request_timeout_secs: u64,
}

/// Pacing and retry settings of the fetch loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub min_call_interval_ms: u64,
    pub max_retries: u32,
    pub retry_cooldown_secs: u64,
}

impl HarvestConfig {
    pub fn min_call_interval(&self) -> Duration {
        Duration::from_millis(self.min_call_interval_ms)
    }

    pub fn retry_cooldown(&self) -> Duration {
        Duration::from_secs(self.retry_cooldown_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
            connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CATALOG_API_URL.to_string(),
            client_id: String::new(),
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout_secs: DEFAULT_CATALOG_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            min_call_interval_ms: DEFAULT_MIN_CALL_INTERVAL.as_millis() as u64,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_cooldown_secs: DEFAULT_RETRY_COOLDOWN.as_secs(),
        }
    }
}

impl WorkerConfig {
    /// Load configuration from an optional YAML file and the environment
    ///
    /// Nothing is validated here; call [`WorkerConfig::validate`] or
    /// [`WorkerConfig::validate_database`] for what the command needs.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;

        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }

    /// Apply overrides from a key lookup (the process environment in
    /// production).
    ///
    /// Recognized keys: `HARVEST_WORKER_ID`, `DATABASE_URL`,
    /// `DATABASE_MAX_CONNECTIONS`, `DATABASE_CONNECT_TIMEOUT`,
    /// `CATALOG_API_URL`, `CATALOG_CLIENT_ID`, `CATALOG_PAGE_SIZE`,
    /// `CATALOG_REQUEST_TIMEOUT`, `HARVEST_MIN_CALL_INTERVAL_MS`,
    /// `HARVEST_MAX_RETRIES`, `HARVEST_RETRY_COOLDOWN_SECS`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup("HARVEST_WORKER_ID") {
            self.worker_id = id;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(v) = parsed(&lookup, "DATABASE_MAX_CONNECTIONS")? {
            self.database.max_connections = v;
        }
        if let Some(v) = parsed(&lookup, "DATABASE_CONNECT_TIMEOUT")? {
            self.database.connect_timeout_secs = v;
        }
        if let Some(url) = lookup("CATALOG_API_URL") {
            self.catalog.base_url = url;
        }
        if let Some(id) = lookup("CATALOG_CLIENT_ID") {
            self.catalog.client_id = id;
        }
        if let Some(v) = parsed(&lookup, "CATALOG_PAGE_SIZE")? {
            self.catalog.page_size = v;
        }
        if let Some(v) = parsed(&lookup, "CATALOG_REQUEST_TIMEOUT")? {
            self.catalog.request_timeout_secs = v;
        }
        if let Some(v) = parsed(&lookup, "HARVEST_MIN_CALL_INTERVAL_MS")? {
            self.harvest.min_call_interval_ms = v;
        }
        if let Some(v) = parsed(&lookup, "HARVEST_MAX_RETRIES")? {
            self.harvest.max_retries = v;
        }
        if let Some(v) = parsed(&lookup, "HARVEST_RETRY_COOLDOWN_SECS")? {
            self.harvest.retry_cooldown_secs = v;
        }
        Ok(())
    }

    /// Validate the settings every command needs.
    pub fn validate_database(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::invalid("Database URL cannot be empty"));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::invalid(
                "Database max_connections must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Validate everything a harvesting run needs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_database()?;

        if self.worker_id.trim().is_empty() {
            return Err(ConfigError::invalid("Worker id must be set (HARVEST_WORKER_ID)"));
        }
        if self.catalog.base_url.trim().is_empty() {
            return Err(ConfigError::invalid("Catalog API URL cannot be empty"));
        }
        if self.catalog.client_id.trim().is_empty() {
            return Err(ConfigError::invalid(
                "Catalog API credential must be set (CATALOG_CLIENT_ID)",
            ));
        }
        if self.catalog.page_size == 0 {
            return Err(ConfigError::invalid("Catalog page size must be greater than 0"));
        }
        if self.catalog.request_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "Catalog request timeout must be greater than 0",
            ));
        }
        Ok(())
    }
}

fn parsed<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
    }
}
