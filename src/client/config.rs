use crate::shared::config::{AppConfig, AppConfigBuilder, ConfigError};
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration wrapper.
///
/// Layers environment overrides over [`AppConfig`] and carries the bearer
/// token used for api calls.
#[derive(Debug, Clone)]
pub struct Config {
    app: AppConfig,
    token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            token: None,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_app(app: AppConfig) -> Self {
        Self { app, token: None }
    }

    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        Ok(Self::from_app(builder.build()?))
    }

    /// Apply `HEALTHSYNC_*` environment overrides, then validate
    pub fn from_env(base: AppConfig) -> Result<Self, ConfigError> {
        let mut app = base;
        if let Ok(url) = std::env::var("HEALTHSYNC_API_URL") {
            app.api_base_url = url;
        }
        if let Ok(url) = std::env::var("HEALTHSYNC_PROBE_URL") {
            app.probe_url = url;
        }
        if let Ok(path) = std::env::var("HEALTHSYNC_DB_PATH") {
            app.database_path = Some(PathBuf::from(path));
        }
        app.validate()?;
        let token = std::env::var("HEALTHSYNC_TOKEN").ok();
        Ok(Self { app, token })
    }

    /// Set the bearer token
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// Get the bearer token
    pub fn get_token(&self) -> Option<&String> {
        self.token.as_ref()
    }

    /// Clear the token (logout)
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Get the full URL for an api endpoint
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.app.api_base_url.trim_end_matches('/'), path)
    }

    pub fn probe_url(&self) -> &str {
        &self.app.probe_url
    }

    pub fn probe_timeout(&self) -> Duration {
        self.app.probe_timeout()
    }

    pub fn request_timeout(&self) -> Duration {
        self.app.request_timeout()
    }

    pub fn sync_interval(&self) -> Duration {
        self.app.sync_interval()
    }

    pub fn min_sync_interval(&self) -> Duration {
        self.app.min_sync_interval()
    }

    /// SQLite path, falling back to the platform data directory
    pub fn database_path(&self) -> PathBuf {
        match &self.app.database_path {
            Some(path) => path.clone(),
            None => {
                let mut path = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
                path.push("healthsync");
                path.push("local.db");
                path
            }
        }
    }

    pub fn app(&self) -> &AppConfig {
        &self.app
    }
}
