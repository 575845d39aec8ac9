//! Per-resource sync sub-tasks run by [`SyncService`](super::SyncService)
//! in registration order.

use super::SyncTrigger;
use crate::client::network::ConnectionInfo;
use crate::client::offline::AppointmentQueue;
use crate::client::records::PrescriptionService;
use crate::shared::error::SyncError;
use async_trait::async_trait;
use std::sync::Arc;

/// What a sub-task knows about the cycle it runs in
#[derive(Debug, Clone)]
pub struct SyncContext {
    pub trigger: SyncTrigger,
    pub connection: ConnectionInfo,
}

#[async_trait]
pub trait SyncTask: Send + Sync {
    fn name(&self) -> &str;

    /// Throttled tasks only run in full cycles that pass the minimum
    /// interval. Unthrottled tasks also run when connectivity returns
    /// inside the interval.
    fn throttled(&self) -> bool {
        true
    }

    async fn run(&self, ctx: &SyncContext) -> Result<(), SyncError>;
}

/// Refreshes the prescription cache from the api
pub struct PrescriptionSyncTask {
    prescriptions: PrescriptionService,
}

impl PrescriptionSyncTask {
    pub fn new(prescriptions: PrescriptionService) -> Self {
        Self { prescriptions }
    }
}

#[async_trait]
impl SyncTask for PrescriptionSyncTask {
    fn name(&self) -> &str {
        "prescriptions"
    }

    async fn run(&self, _ctx: &SyncContext) -> Result<(), SyncError> {
        let user_id = self.prescriptions.current_user_id().await;
        self.prescriptions.refresh_cache(&user_id).await?;
        Ok(())
    }
}

/// Replays the offline appointment queue
pub struct AppointmentSyncTask {
    queue: Arc<AppointmentQueue>,
}

impl AppointmentSyncTask {
    pub fn new(queue: Arc<AppointmentQueue>) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl SyncTask for AppointmentSyncTask {
    fn name(&self) -> &str {
        "appointments"
    }

    fn throttled(&self) -> bool {
        false
    }

    async fn run(&self, ctx: &SyncContext) -> Result<(), SyncError> {
        let include_failed = ctx.trigger != SyncTrigger::Timer;
        let report = self.queue.replay(include_failed).await;

        if report.attempted() > 0 {
            tracing::info!(
                confirmed = report.confirmed.len(),
                failed = report.failed.len(),
                "Appointment replay finished"
            );
        }
        if report.failed.is_empty() {
            Ok(())
        } else {
            Err(SyncError::api_failed(
                None,
                format!("{} appointment(s) could not be submitted", report.failed.len()),
            ))
        }
    }
}
