//! Configuration management for permscope.
//!
//! This module provides configuration loading with multiple sources:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (override)
//!
//! Environment variables take precedence over config file values,
//! which take precedence over defaults.
//!
//! # Example
//!
//! ```yaml
//! engine:
//!   fetch_timeout_ms: 5000
//! cache:
//!   enabled: true
//!   ttl_secs: 15
//! storage:
//!   backend: memory
//!   seed_path: ./seed.json
//! logging:
//!   level: debug
//!   json: false
//! batch:
//!   max_items: 100
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use permscope_domain::cache::{PoolCache, PoolCacheConfig};
use permscope_domain::resolver::EngineConfig;

use crate::observability::{parse_level, LoggingConfig};

/// Environment variable prefix: `PERMSCOPE_CACHE__ENABLED=true`.
pub const ENV_PREFIX: &str = "PERMSCOPE";

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    /// Permission engine settings
    #[serde(default)]
    pub engine: EngineSettings,

    /// Grant pool cache settings
    #[serde(default)]
    pub cache: CacheSettings,

    /// Storage settings
    #[serde(default)]
    pub storage: StorageSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Batch check settings
    #[serde(default)]
    pub batch: BatchSettings,
}

/// Permission engine settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct EngineSettings {
    /// Upper bound for one grant pool fetch, in milliseconds
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: default_fetch_timeout_ms(),
        }
    }
}

fn default_fetch_timeout_ms() -> u64 {
    10_000
}

/// Grant pool cache settings.
///
/// Disabled by default: a cached pool keeps answering with a revoked grant
/// until its TTL expires.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CacheSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_cache_capacity")]
    pub max_capacity: u64,

    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            max_capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

fn default_cache_capacity() -> u64 {
    10_000
}

fn default_cache_ttl() -> u64 {
    30
}

/// Storage backend settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StorageSettings {
    /// Storage backend type: only "memory" is supported
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// JSON seed file loaded into the store at startup
    #[serde(default)]
    pub seed_path: Option<String>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            seed_path: None,
        }
    }
}

fn default_storage_backend() -> String {
    "memory".to_string()
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format (true for production, false for development)
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Batch check settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BatchSettings {
    /// Maximum permissions evaluated in one batch
    #[serde(default = "default_batch_max_items")]
    pub max_items: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_items: default_batch_max_items(),
        }
    }
}

fn default_batch_max_items() -> usize {
    crate::handlers::batch::DEFAULT_MAX_BATCH_SIZE
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ServerConfig {
    /// Load configuration from a YAML file with environment variable overrides.
    ///
    /// Environment variables are prefixed with `PERMSCOPE_` and use `__` as
    /// separator, e.g. `PERMSCOPE_ENGINE__FETCH_TIMEOUT_MS=500` overrides
    /// `engine.fetch_timeout_ms`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(env_source())
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;
        Ok(server_config)
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(env_source())
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;
        Ok(server_config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.engine.fetch_timeout_ms == 0 {
            return Err(invalid("engine.fetch_timeout_ms must be greater than 0"));
        }

        if self.cache.enabled && (self.cache.ttl_secs == 0 || self.cache.max_capacity == 0) {
            return Err(invalid(
                "cache.ttl_secs and cache.max_capacity must be greater than 0 when cache is enabled",
            ));
        }

        let valid_backends = ["memory"];
        if !valid_backends.contains(&self.storage.backend.as_str()) {
            return Err(invalid(format!(
                "storage.backend must be one of: {:?}, got: {}",
                valid_backends, self.storage.backend
            )));
        }

        if self
            .storage
            .seed_path
            .as_deref()
            .is_some_and(|p| p.trim().is_empty())
        {
            return Err(invalid("storage.seed_path cannot be empty when set"));
        }

        if parse_level(&self.logging.level).is_none() {
            return Err(invalid(format!(
                "logging.level must be one of: [\"trace\", \"debug\", \"info\", \"warn\", \"error\"], got: {}",
                self.logging.level
            )));
        }

        if self.batch.max_items == 0 {
            return Err(invalid("batch.max_items must be greater than 0"));
        }

        Ok(())
    }

    /// Builds the engine configuration, including the pool cache if enabled.
    pub fn engine_config(&self) -> EngineConfig {
        let config =
            EngineConfig::default().with_fetch_timeout(Duration::from_millis(self.engine.fetch_timeout_ms));
        if !self.cache.enabled {
            return config;
        }
        let cache = PoolCache::new(
            PoolCacheConfig::default()
                .with_enabled(true)
                .with_max_capacity(self.cache.max_capacity)
                .with_ttl(Duration::from_secs(self.cache.ttl_secs)),
        );
        config.with_cache(Arc::new(cache))
    }

    /// Builds the logging configuration.
    pub fn logging_config(&self) -> LoggingConfig {
        let config = if self.logging.json {
            LoggingConfig::json()
        } else {
            LoggingConfig::text()
        };
        match parse_level(&self.logging.level) {
            Some(level) => config.with_level(level),
            None => config,
        }
    }
}

fn env_source() -> Environment {
    // `__` separates nested keys: PERMSCOPE_CACHE__TTL_SECS -> cache.ttl_secs
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn invalid(message: impl Into<String>) -> ConfigLoadError {
    ConfigLoadError::Invalid {
        message: message.into(),
    }
}
