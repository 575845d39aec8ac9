//! # Record Fetching
//!
//! Retrieves a resource over the selected channel. The api path is tried
//! once; on any failure the fetcher falls back to the degraded sms channel
//! exactly once and tags the result so callers can tell authoritative data
//! from degraded data.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use healthsync::client::records::ResourceKey;
//! # async fn example(fetcher: healthsync::client::records::ResourceFetcher) {
//! let key = ResourceKey::new("prescriptions", "user-1");
//! match fetcher.fetch(&key, None).await {
//!     Ok(result) => println!("{:?} data at {}", result.source, result.timestamp),
//!     Err(e) => eprintln!("both channels failed: {}", e),
//! }
//! # }
//! ```

pub mod prescriptions;

pub use prescriptions::{CachedPrescriptions, PrescriptionService};

use crate::client::config::Config;
use crate::client::http::{HttpClient, HttpError, HttpRequest};
use crate::client::network::{FetchMethod, FetchMethodSelector};
use crate::shared::error::SyncError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Identifies one resource, e.g. the prescriptions of one user
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub collection: String,
    pub id: String,
}

impl ResourceKey {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Path below the api base URL
    pub fn path(&self) -> String {
        format!("/{}/{}", self.collection, self.id)
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Data plus the channel it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchResult {
    pub source: FetchMethod,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl FetchResult {
    pub fn is_authoritative(&self) -> bool {
        self.source == FetchMethod::Api
    }
}

/// The degraded store-and-forward channel
#[async_trait]
pub trait DegradedChannel: Send + Sync {
    async fn fetch(&self, key: &ResourceKey) -> Result<serde_json::Value, SyncError>;
}

/// Sms channel without a gateway behind it: answers with an empty
/// collection and a notice, so the contract of a distinct degraded source
/// holds until a real gateway exists.
#[derive(Debug, Default, Clone)]
pub struct PlaceholderSmsChannel;

#[async_trait]
impl DegradedChannel for PlaceholderSmsChannel {
    async fn fetch(&self, key: &ResourceKey) -> Result<serde_json::Value, SyncError> {
        tracing::info!(resource = %key, "Fetching via sms channel");
        let mut data = serde_json::Map::new();
        data.insert(
            "message".to_string(),
            serde_json::Value::String(format!("{} fetched via SMS service", key.collection)),
        );
        data.insert(key.collection.clone(), serde_json::Value::Array(Vec::new()));
        Ok(serde_json::Value::Object(data))
    }
}

/// Per-resource fetcher with api → sms fallback
#[derive(Clone)]
pub struct ResourceFetcher {
    config: Config,
    http: Arc<dyn HttpClient>,
    selector: FetchMethodSelector,
    sms: Arc<dyn DegradedChannel>,
}

impl ResourceFetcher {
    pub fn new(
        config: Config,
        http: Arc<dyn HttpClient>,
        selector: FetchMethodSelector,
        sms: Arc<dyn DegradedChannel>,
    ) -> Self {
        Self {
            config,
            http,
            selector,
            sms,
        }
    }

    /// Fetch `key`. With `method` set the selector is not consulted, which
    /// lets a batch sync reuse one decision for many resources.
    pub async fn fetch(&self, key: &ResourceKey, method: Option<FetchMethod>) -> Result<FetchResult, SyncError> {
        let method = match method {
            Some(method) => method,
            None => self.selector.select_method().await.method,
        };

        match method {
            FetchMethod::Api => match self.fetch_from_api(key).await {
                Ok(result) => Ok(result),
                Err(e) => {
                    tracing::warn!(resource = %key, error = %e, "API fetch failed, falling back to sms");
                    self.fetch_from_sms(key).await
                }
            },
            FetchMethod::Sms => self.fetch_from_sms(key).await,
        }
    }

    /// One api request, no fallback
    pub async fn fetch_from_api(&self, key: &ResourceKey) -> Result<FetchResult, SyncError> {
        let url = self.config.api_url(&key.path());
        let timeout = self.config.request_timeout();
        let request = HttpRequest::get(url, timeout).bearer(self.config.get_token());

        let response = match tokio::time::timeout(timeout, self.http.send(request)).await {
            Err(_) | Ok(Err(HttpError::Timeout(_))) => {
                return Err(SyncError::api_failed(
                    None,
                    format!("timed out after {} ms", timeout.as_millis()),
                ))
            }
            Ok(Err(HttpError::Transport(message))) => return Err(SyncError::api_failed(None, message)),
            Ok(Ok(response)) => response,
        };

        if !response.is_success() {
            return Err(SyncError::api_failed(
                Some(response.status),
                format!("API error: {}", response.status),
            ));
        }

        let data = response
            .json::<serde_json::Value>()
            .map_err(|e| SyncError::api_failed(Some(response.status), format!("invalid JSON body: {}", e)))?;

        Ok(FetchResult {
            source: FetchMethod::Api,
            data,
            timestamp: Utc::now(),
        })
    }

    pub async fn fetch_from_sms(&self, key: &ResourceKey) -> Result<FetchResult, SyncError> {
        let data = self.sms.fetch(key).await.map_err(|e| match e {
            SyncError::DegradedChannelFailed { .. } => e,
            other => SyncError::degraded(other.to_string()),
        })?;
        Ok(FetchResult {
            source: FetchMethod::Sms,
            data,
            timestamp: Utc::now(),
        })
    }
}

impl std::fmt::Debug for ResourceFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceFetcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
