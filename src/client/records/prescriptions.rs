//! Prescription records: network-aware fetch plus the local cache written
//! by background sync.

use super::{FetchResult, ResourceFetcher, ResourceKey};
use crate::client::local_db::{keys, load_json, save_json, KeyValueStore};
use crate::client::network::FetchMethod;
use crate::shared::error::SyncError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const COLLECTION: &str = "prescriptions";
const DEFAULT_USER_ID: &str = "default-user";

/// Cached copy of the last authoritative prescription fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedPrescriptions {
    pub data: serde_json::Value,
    pub last_updated: DateTime<Utc>,
    pub source: FetchMethod,
}

#[derive(Debug, Deserialize)]
struct StoredUserInfo {
    id: Option<String>,
}

#[derive(Clone)]
pub struct PrescriptionService {
    fetcher: ResourceFetcher,
    store: Arc<dyn KeyValueStore>,
}

impl PrescriptionService {
    pub fn new(fetcher: ResourceFetcher, store: Arc<dyn KeyValueStore>) -> Self {
        Self { fetcher, store }
    }

    /// Fetch with automatic method selection
    pub async fn fetch_prescriptions(&self, user_id: &str) -> Result<FetchResult, SyncError> {
        self.fetcher.fetch(&Self::key(user_id), None).await
    }

    /// Refresh the cache from the api. Degraded data is never cached as if
    /// it were authoritative, so an api failure here is an error.
    pub async fn refresh_cache(&self, user_id: &str) -> Result<CachedPrescriptions, SyncError> {
        let result = self.fetcher.fetch_from_api(&Self::key(user_id)).await?;
        let cached = CachedPrescriptions {
            data: result.data,
            last_updated: Utc::now(),
            source: FetchMethod::Api,
        };
        save_json(self.store.as_ref(), keys::PRESCRIPTIONS, &cached).await?;
        tracing::info!(user_id, "Prescriptions synced");
        Ok(cached)
    }

    pub async fn cached_prescriptions(&self) -> Result<Option<CachedPrescriptions>, SyncError> {
        load_json(self.store.as_ref(), keys::PRESCRIPTIONS).await
    }

    /// User id from the stored `userInfo`, or the shared default
    pub async fn current_user_id(&self) -> String {
        match load_json::<StoredUserInfo>(self.store.as_ref(), keys::USER_INFO).await {
            Ok(Some(StoredUserInfo { id: Some(id) })) if !id.is_empty() => id,
            Ok(_) => DEFAULT_USER_ID.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable userInfo, using default user");
                DEFAULT_USER_ID.to_string()
            }
        }
    }

    fn key(user_id: &str) -> ResourceKey {
        ResourceKey::new(COLLECTION, user_id)
    }
}

impl std::fmt::Debug for PrescriptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrescriptionService")
            .field("fetcher", &self.fetcher)
            .finish_non_exhaustive()
    }
}
