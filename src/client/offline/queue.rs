//! # Appointment Queue
//!
//! Appointments created without connectivity are written to durable storage
//! before anything else happens, then replayed in submission order once the
//! network returns.
//!
//! ## Item lifecycle
//!
//! `pending → processing → confirmed` (removed from the pending list), or
//! `pending → processing → failed` (kept in the pending list so the user
//! still sees it; retried on the next forced sync or connectivity restore).
//!
//! A full history list mirrors every submission so confirmed items remain
//! visible after they leave the pending list.

use crate::client::config::Config;
use crate::client::http::{HttpClient, HttpError, HttpRequest};
use crate::client::local_db::{keys, load_json, save_json, KeyValueStore};
use crate::shared::error::SyncError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Appointment status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    /// Saved locally, waiting for connectivity
    Pending,
    /// Submission in flight
    Processing,
    /// Accepted by the records api
    Confirmed,
    /// Last submission attempt failed
    Failed,
}

/// Booking form data
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRequest {
    pub hospital_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hospital_name: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AppointmentRequest {
    pub fn new(hospital_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            hospital_id: hospital_id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        if self.hospital_id.trim().is_empty() {
            return Err(SyncError::validation("hospitalId", "a hospital must be selected"));
        }
        if self.name.trim().is_empty() {
            return Err(SyncError::validation("name", "patient name is required"));
        }
        Ok(())
    }
}

/// Queued appointment with its status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PendingAppointment {
    pub id: String,
    #[serde(flatten)]
    pub request: AppointmentRequest,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_attempt: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_error: Option<String>,
}

/// Outcome of one replay pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub confirmed: Vec<String>,
    pub failed: Vec<String>,
    /// Another replay was already running, nothing was attempted
    pub busy: bool,
}

impl ReplayReport {
    pub fn attempted(&self) -> usize {
        self.confirmed.len() + self.failed.len()
    }
}

/// Remote appointment submission capability
#[async_trait]
pub trait AppointmentSubmitter: Send + Sync {
    async fn submit(&self, appointment: &PendingAppointment) -> Result<(), SyncError>;
}

/// Posts appointments to `{api}/appointments`
pub struct HttpAppointmentSubmitter {
    config: Config,
    http: Arc<dyn HttpClient>,
}

impl HttpAppointmentSubmitter {
    pub fn new(config: Config, http: Arc<dyn HttpClient>) -> Self {
        Self { config, http }
    }
}

#[async_trait]
impl AppointmentSubmitter for HttpAppointmentSubmitter {
    async fn submit(&self, appointment: &PendingAppointment) -> Result<(), SyncError> {
        let body = serde_json::to_value(appointment)?;
        let timeout = self.config.request_timeout();
        let request = HttpRequest::post(self.config.api_url("/appointments"), body, timeout)
            .bearer(self.config.get_token());

        match tokio::time::timeout(timeout, self.http.send(request)).await {
            Err(_) | Ok(Err(HttpError::Timeout(_))) => Err(SyncError::api_failed(None, "appointment submission timed out")),
            Ok(Err(HttpError::Transport(message))) => Err(SyncError::api_failed(None, message)),
            Ok(Ok(response)) if response.is_success() => Ok(()),
            Ok(Ok(response)) => Err(SyncError::api_failed(
                Some(response.status),
                format!("API error: {}", response.status),
            )),
        }
    }
}

/// Durable FIFO queue of appointments awaiting submission
pub struct AppointmentQueue {
    store: Arc<dyn KeyValueStore>,
    submitter: Arc<dyn AppointmentSubmitter>,
    pending: RwLock<Vec<PendingAppointment>>,
    history: RwLock<Vec<PendingAppointment>>,
    replay_lock: Mutex<()>,
}

impl AppointmentQueue {
    pub fn new(store: Arc<dyn KeyValueStore>, submitter: Arc<dyn AppointmentSubmitter>) -> Self {
        Self {
            store,
            submitter,
            pending: RwLock::new(Vec::new()),
            history: RwLock::new(Vec::new()),
            replay_lock: Mutex::new(()),
        }
    }

    /// Load persisted lists. Unreadable storage leaves the queue empty for
    /// this session instead of failing startup.
    pub async fn load(&self) {
        let mut pending: Vec<PendingAppointment> =
            match load_json(self.store.as_ref(), keys::PENDING_APPOINTMENTS).await {
                Ok(list) => list.unwrap_or_default(),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to load pending appointments");
                    Vec::new()
                }
            };
        let mut history: Vec<PendingAppointment> =
            match load_json(self.store.as_ref(), keys::APPOINTMENTS).await {
                Ok(list) => list.unwrap_or_default(),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to load appointment history");
                    Vec::new()
                }
            };

        // An item left in flight by a previous process goes back to pending.
        for item in pending.iter_mut().chain(history.iter_mut()) {
            if item.status == AppointmentStatus::Processing {
                item.status = AppointmentStatus::Pending;
            }
        }

        tracing::info!(pending = pending.len(), history = history.len(), "Appointment queue loaded");
        *self.pending.write().await = pending;
        *self.history.write().await = history;
    }

    /// Record an appointment for later submission. Persisted before
    /// returning; never touches the network.
    pub async fn submit_offline(&self, request: AppointmentRequest) -> Result<PendingAppointment, SyncError> {
        request.validate()?;

        let appointment = PendingAppointment {
            id: Uuid::new_v4().to_string(),
            request,
            status: AppointmentStatus::Pending,
            created_at: Utc::now(),
            last_attempt: None,
            last_error: None,
        };

        self.pending.write().await.push(appointment.clone());
        self.history.write().await.push(appointment.clone());
        self.persist().await;

        tracing::info!(id = %appointment.id, "Appointment saved offline");
        Ok(appointment)
    }

    /// Pending list in submission order
    pub async fn pending(&self) -> Vec<PendingAppointment> {
        self.pending.read().await.clone()
    }

    /// Every submitted appointment with its latest status
    pub async fn history(&self) -> Vec<PendingAppointment> {
        self.history.read().await.clone()
    }

    pub async fn count_pending(&self) -> usize {
        self.pending.read().await.len()
    }

    pub async fn count_failed(&self) -> usize {
        self.pending
            .read()
            .await
            .iter()
            .filter(|a| a.status == AppointmentStatus::Failed)
            .count()
    }

    /// Replay queued appointments in FIFO order. Items in `failed` are only
    /// attempted when `include_failed` is set. A replay already in progress
    /// makes this call a no-op.
    ///
    /// If the replay future is dropped mid-submission, the in-flight item
    /// goes back to `pending`. An item still marked `processing` when a
    /// replay starts was abandoned that way and is attempted again.
    pub async fn replay(&self, include_failed: bool) -> ReplayReport {
        let _guard = match self.replay_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::debug!("Appointment replay already running");
                return ReplayReport {
                    busy: true,
                    ..Default::default()
                };
            }
        };

        let candidates: Vec<PendingAppointment> = self
            .pending
            .read()
            .await
            .iter()
            .filter(|a| match a.status {
                AppointmentStatus::Pending | AppointmentStatus::Processing => true,
                AppointmentStatus::Failed => include_failed,
                _ => false,
            })
            .cloned()
            .collect();

        let mut report = ReplayReport::default();
        for appointment in candidates {
            self.set_status(&appointment.id, AppointmentStatus::Processing, None).await;

            let in_flight = InFlight::new(self, &appointment.id);
            let submitted = self.submitter.submit(&appointment).await;
            in_flight.disarm();

            match submitted {
                Ok(()) => {
                    self.confirm(&appointment.id).await;
                    tracing::info!(id = %appointment.id, "Appointment confirmed");
                    report.confirmed.push(appointment.id);
                }
                Err(e) => {
                    tracing::warn!(id = %appointment.id, error = %e, "Appointment submission failed");
                    self.set_status(&appointment.id, AppointmentStatus::Failed, Some(e.to_string()))
                        .await;
                    report.failed.push(appointment.id);
                }
            }
        }
        report
    }

    async fn set_status(&self, id: &str, status: AppointmentStatus, error: Option<String>) {
        let now = Utc::now();
        let apply = |item: &mut PendingAppointment| {
            item.status = status;
            if status == AppointmentStatus::Processing {
                item.last_attempt = Some(now);
            }
            if status == AppointmentStatus::Failed {
                item.last_error = error.clone();
            }
        };
        if let Some(item) = self.pending.write().await.iter_mut().find(|a| a.id == id) {
            apply(item);
        }
        if let Some(item) = self.history.write().await.iter_mut().find(|a| a.id == id) {
            apply(item);
        }
        self.persist().await;
    }

    async fn confirm(&self, id: &str) {
        self.pending.write().await.retain(|a| a.id != id);
        if let Some(item) = self.history.write().await.iter_mut().find(|a| a.id == id) {
            item.status = AppointmentStatus::Confirmed;
            item.last_error = None;
        }
        self.persist().await;
    }

    async fn persist(&self) {
        let pending = self.pending.read().await.clone();
        let history = self.history.read().await.clone();
        if let Err(e) = save_json(self.store.as_ref(), keys::PENDING_APPOINTMENTS, &pending).await {
            tracing::error!(error = %e, "Failed to persist pending appointments");
        }
        if let Err(e) = save_json(self.store.as_ref(), keys::APPOINTMENTS, &history).await {
            tracing::error!(error = %e, "Failed to persist appointment history");
        }
    }
}

/// Puts an item back to `pending` when a replay is dropped mid-submission.
/// Drop cannot await, so this only updates memory; the persisted copy is
/// reset by the next `load`.
struct InFlight<'a> {
    queue: &'a AppointmentQueue,
    id: Option<String>,
}

impl<'a> InFlight<'a> {
    fn new(queue: &'a AppointmentQueue, id: &str) -> Self {
        Self {
            queue,
            id: Some(id.to_string()),
        }
    }

    fn disarm(mut self) {
        self.id = None;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let Some(id) = self.id.take() else { return };
        tracing::warn!(%id, "Appointment replay interrupted, item returned to pending");
        for list in [&self.queue.pending, &self.queue.history] {
            if let Ok(mut items) = list.try_write() {
                if let Some(item) = items
                    .iter_mut()
                    .find(|a| a.id == id && a.status == AppointmentStatus::Processing)
                {
                    item.status = AppointmentStatus::Pending;
                }
            }
        }
    }
}

impl std::fmt::Debug for AppointmentQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppointmentQueue").finish_non_exhaustive()
    }
}
