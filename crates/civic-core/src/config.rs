//! Configuration loading and typed config structures.
//!
//! The canonical configuration lives in `civic-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, a loader that reads the file, and environment overrides for
//! secrets and deployment-specific values.
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `DATABASE_URL` | `database.url` |
//! | `CIVIC_BACKEND` | `database.backend` |
//! | `ADMIN_API_KEY` | `auth.admin_api_key` |
//! | `KV_URL` | `cache.url` (and selects the `redis` cache backend) |
//! | `CIVIC_HOST` | `server.host` |
//! | `CIVIC_PORT` | `server.port` |
//! | `LOG_FORMAT` | `logging.format` |

use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but is not usable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AppConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerSettings,

    /// Event and scraper config storage.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Admin authentication.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Scraper result cache.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Listing defaults and limits.
    #[serde(default)]
    pub api: ApiConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file and apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if the result fails validation.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from defaults plus environment overrides only.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the result fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string without consulting the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (normally the process
    /// environment). Blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(backend) = get("CIVIC_BACKEND") {
            match backend.to_ascii_lowercase().as_str() {
                "postgres" | "postgresql" => self.database.backend = StoreBackend::Postgres,
                "memory" => self.database.backend = StoreBackend::Memory,
                other => tracing::warn!(value = other, "ignoring unknown CIVIC_BACKEND"),
            }
        }
        if let Some(key) = get("ADMIN_API_KEY") {
            self.auth.admin_api_key = Some(key);
        }
        if let Some(url) = get("KV_URL") {
            self.cache.url = Some(url);
            self.cache.backend = CacheBackend::Redis;
        }
        if let Some(host) = get("CIVIC_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("CIVIC_PORT") {
            match port.parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(e) => tracing::warn!(value = port, error = %e, "ignoring invalid CIVIC_PORT"),
            }
        }
        if let Some(format) = get("LOG_FORMAT") {
            match format.to_ascii_lowercase().as_str() {
                "json" => self.logging.format = LogFormat::Json,
                "text" | "pretty" => self.logging.format = LogFormat::Text,
                other => tracing::warn!(value = other, "ignoring unknown LOG_FORMAT"),
            }
        }
    }

    /// Check cross-field requirements.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a selected backend lacks its
    /// connection URL or the listing limits are inconsistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.backend == StoreBackend::Postgres && self.database.url.is_none() {
            return Err(ConfigError::Invalid(
                "database.backend is postgres but no database.url or DATABASE_URL is set"
                    .to_owned(),
            ));
        }
        if self.cache.backend == CacheBackend::Redis && self.cache.url.is_none() {
            return Err(ConfigError::Invalid(
                "cache.backend is redis but no cache.url or KV_URL is set".to_owned(),
            ));
        }
        if self.api.default_limit == 0 || self.api.default_limit > self.api.max_limit {
            return Err(ConfigError::Invalid(format!(
                "api.default_limit must be between 1 and api.max_limit ({})",
                self.api.max_limit
            )));
        }
        if !(self.api.default_radius_miles > 0.0
            && self.api.default_radius_miles <= self.api.max_radius_miles)
        {
            return Err(ConfigError::Invalid(format!(
                "api.default_radius_miles must be greater than 0 and at most api.max_radius_miles ({})",
                self.api.max_radius_miles
            )));
        }
        Ok(())
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSettings {
    /// Address to bind (e.g. `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Which event store implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// `PostgreSQL` via `sqlx`.
    Postgres,
    /// Process-local store for development and tests.
    #[default]
    Memory,
}

/// How the Postgres store attaches child rows to events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapingStrategy {
    /// One query for events, one `= ANY($1)` query per child kind,
    /// grouped in memory.
    #[default]
    Batched,
    /// One query with outer joins and `json_agg`/`array_agg`.
    Aggregated,
}

/// Event store settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    /// Store implementation.
    #[serde(default)]
    pub backend: StoreBackend,

    /// `PostgreSQL` connection URL.
    #[serde(default)]
    pub url: Option<String>,

    /// Pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Pool acquire timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Idle connection timeout in seconds.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Child-row correlation strategy.
    #[serde(default)]
    pub shaping: ShapingStrategy,

    /// Run pending migrations at startup.
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: None,
            max_connections: default_max_connections(),
            connect_timeout_ms: default_connect_timeout_ms(),
            idle_timeout_secs: default_idle_timeout_secs(),
            shaping: ShapingStrategy::default(),
            run_migrations: true,
        }
    }
}

/// Admin authentication settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuthConfig {
    /// Secret compared against the `X-API-Key` header. When unset every
    /// mutation is rejected.
    #[serde(default)]
    pub admin_api_key: Option<String>,
}

/// Which cache implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Redis-compatible server via `fred`.
    Redis,
    /// Process-local map for development and tests.
    #[default]
    Memory,
}

/// Scraper result cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CacheConfig {
    /// Cache implementation.
    #[serde(default)]
    pub backend: CacheBackend,

    /// Redis URL (`redis://host:port/db`).
    #[serde(default)]
    pub url: Option<String>,

    /// Prefix of every cache key.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            url: None,
            key_prefix: default_key_prefix(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Listing defaults and limits.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiConfig {
    /// `limit` used when the query string omits it.
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    /// Largest `limit` honored.
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,

    /// `radius` used by `/api/local-meetings` when omitted.
    #[serde(default = "default_radius_miles")]
    pub default_radius_miles: f64,

    /// Largest `radius` accepted.
    #[serde(default = "default_max_radius_miles")]
    pub max_radius_miles: f64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            default_radius_miles: default_radius_miles(),
            max_radius_miles: default_max_radius_miles(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8787
}

const fn default_max_connections() -> u32 {
    10
}

const fn default_connect_timeout_ms() -> u64 {
    5000
}

const fn default_idle_timeout_secs() -> u64 {
    300
}

fn default_key_prefix() -> String {
    "scrape".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_limit() -> u32 {
    100
}

const fn default_max_limit() -> u32 {
    500
}

const fn default_radius_miles() -> f64 {
    50.0
}

const fn default_max_radius_miles() -> f64 {
    500.0
}

const fn default_true() -> bool {
    true
}
