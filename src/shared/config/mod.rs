//! Application configuration module
//!
//! Provides configuration types for the sync core. Every timeout and
//! cadence is explicit configuration; nothing relies on platform defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default api base URL
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:5000/api";
/// Default speed-probe resource
pub const DEFAULT_PROBE_URL: &str = "https://www.google.com/favicon.ico";

const DEFAULT_PROBE_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 15 * 60;
const DEFAULT_MIN_SYNC_INTERVAL_SECS: u64 = 30 * 60;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the records api
    pub api_base_url: String,
    /// Resource downloaded by the speed probe
    pub probe_url: String,
    /// Upper bound on the speed-probe transfer
    pub probe_timeout_ms: u64,
    /// Upper bound on each api request
    pub request_timeout_ms: u64,
    /// Periodic timer cadence
    pub sync_interval_secs: u64,
    /// Minimum time between two credited syncs
    pub min_sync_interval_secs: u64,
    /// SQLite file backing the key-value store
    pub database_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            probe_url: DEFAULT_PROBE_URL.to_string(),
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            min_sync_interval_secs: DEFAULT_MIN_SYNC_INTERVAL_SECS,
            database_path: None,
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: AppConfig =
            toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&source)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        for url in [&self.api_base_url, &self.probe_url] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl(url.clone()));
            }
        }
        let non_zero = [
            ("probe_timeout_ms", self.probe_timeout_ms),
            ("request_timeout_ms", self.request_timeout_ms),
            ("sync_interval_secs", self.sync_interval_secs),
            ("min_sync_interval_secs", self.min_sync_interval_secs),
        ];
        for (name, value) in non_zero {
            if value == 0 {
                return Err(ConfigError::ZeroValue(name));
            }
        }
        Ok(())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn min_sync_interval(&self) -> Duration {
        Duration::from_secs(self.min_sync_interval_secs)
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Set the api base URL
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    /// Set the speed-probe URL
    pub fn probe_url(mut self, url: impl Into<String>) -> Self {
        self.config.probe_url = url.into();
        self
    }

    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn sync_interval(mut self, interval: Duration) -> Self {
        self.config.sync_interval_secs = interval.as_secs();
        self
    }

    pub fn min_sync_interval(mut self, interval: Duration) -> Self {
        self.config.min_sync_interval_secs = interval.as_secs();
        self
    }

    /// Set the SQLite file path
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = Some(path.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("value must be non-zero: {0}")]
    ZeroValue(&'static str),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("failed to read config: {0}")]
    Io(String),
}
