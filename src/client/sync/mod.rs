//! # Sync Orchestrator
//!
//! Coordinates background synchronization of records with the api. A cycle
//! moves `Idle → Syncing → Idle` and runs every registered sub-task in
//! registration order.
//!
//! ## Architecture
//!
//! - **Scheduler**: persisted last sync time and the minimum-interval rule
//! - **Tasks**: per-resource sub-tasks, failures isolated from each other
//! - **Listeners**: `started` / `completed` / `error` event delivery
//! - **Sync State**: published snapshot for callers
//! - **Metrics**: cycle counters and durations
//!
//! ## Triggers
//!
//! The periodic timer proposes a cycle every `sync_interval`; the scheduler
//! only lets it through once `min_sync_interval` has passed since the last
//! credited sync. A network transition to api-capable connectivity also
//! proposes a cycle. Inside the interval it still replays unthrottled
//! tasks (the offline queue) without crediting a sync. A forced sync skips
//! the interval guard. Every trigger respects the single-flight guard and
//! needs api-capable connectivity.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use healthsync::client::sync::{SyncService, SyncTrigger};
//!
//! # async fn example(service: SyncService) {
//! service.init().await;
//! let handle = service.add_sync_listener(|event| println!("sync {}", event.status()));
//!
//! let outcome = service.schedule_sync(SyncTrigger::Forced).await;
//! println!("{:?}", outcome);
//!
//! handle.unsubscribe();
//! service.dispose().await;
//! # }
//! ```

pub mod listeners;
pub mod metrics;
pub mod scheduler;
pub mod sync_state;
pub mod tasks;

pub use listeners::{ListenerHandle, ListenerRegistry};
pub use metrics::SyncMetrics;
pub use scheduler::SyncScheduler;
pub use sync_state::SyncState;
pub use tasks::{AppointmentSyncTask, PrescriptionSyncTask, SyncContext, SyncTask};

use crate::client::config::Config;
use crate::client::local_db::KeyValueStore;
use crate::client::network::{ConnectionInfo, NetworkMonitor, NetworkSubscription};
use crate::shared::error::SyncError;
use crate::shared::event::SyncEvent;
use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// What proposed a sync cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    /// Periodic timer tick
    Timer,
    /// Connectivity became api-capable
    NetworkRestored,
    /// Explicit caller request, bypasses the interval guard
    Forced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadySyncing,
    NetworkUnsuitable,
    IntervalNotElapsed,
}

/// Result of one trigger
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Full cycle succeeded and was credited
    Completed { timestamp: DateTime<Utc> },
    /// Full cycle ran with at least one failed sub-task
    Failed { error: SyncError },
    /// Connectivity returned inside the interval; only unthrottled tasks ran
    Replayed { error: Option<SyncError> },
    /// Nothing ran
    Skipped(SkipReason),
}

/// Sync orchestrator. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SyncService {
    inner: Arc<Inner>,
}

struct Inner {
    monitor: NetworkMonitor,
    scheduler: SyncScheduler,
    sync_interval: Duration,
    tasks: RwLock<Vec<Arc<dyn SyncTask>>>,
    listeners: ListenerRegistry,
    /// Single-flight flag, never persisted
    is_syncing: AtomicBool,
    /// Last observed api capability, for transition detection
    api_capable: AtomicBool,
    initialized: AtomicBool,
    state: RwLock<SyncState>,
    metrics: RwLock<SyncMetrics>,
    periodic: Mutex<Option<JoinHandle<()>>>,
    subscription: Mutex<Option<NetworkSubscription>>,
}

/// Clears the single-flight flag when dropped
struct FlightGuard<'a>(&'a AtomicBool);

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SyncService {
    pub fn new(config: &Config, monitor: NetworkMonitor, store: Arc<dyn KeyValueStore>) -> Self {
        let api_capable = monitor.check_connection().is_api_capable();
        Self {
            inner: Arc::new(Inner {
                scheduler: SyncScheduler::new(store, config.min_sync_interval()),
                sync_interval: config.sync_interval(),
                monitor,
                tasks: RwLock::new(Vec::new()),
                listeners: ListenerRegistry::new(),
                is_syncing: AtomicBool::new(false),
                api_capable: AtomicBool::new(api_capable),
                initialized: AtomicBool::new(false),
                state: RwLock::new(SyncState::default()),
                metrics: RwLock::new(SyncMetrics::new()),
                periodic: Mutex::new(None),
                subscription: Mutex::new(None),
            }),
        }
    }

    /// Append a sub-task; tasks run in registration order
    pub async fn register_task(&self, task: Arc<dyn SyncTask>) {
        tracing::debug!(task = task.name(), "Sync task registered");
        self.inner.tasks.write().await.push(task);
    }

    /// Load persisted state, watch the network and start the periodic timer
    /// when auto-sync is on. Calling it again does nothing.
    pub async fn init(&self) {
        if self.inner.initialized.swap(true, Ordering::AcqRel) {
            return;
        }

        self.inner.scheduler.load().await;
        let connection = self.inner.monitor.check_connection();
        self.inner
            .api_capable
            .store(connection.is_api_capable(), Ordering::Release);
        let auto_sync = {
            let mut state = self.inner.state.write().await;
            state.last_sync_time = self.inner.scheduler.last_sync().await;
            state.network_status = connection.status();
            state.auto_sync_enabled
        };

        let weak = Arc::downgrade(&self.inner);
        let subscription = self
            .inner
            .monitor
            .subscribe(move |info| Self::on_network_change(&weak, info));
        *lock(&self.inner.subscription) = Some(subscription);

        if auto_sync {
            self.start_periodic_sync();
        }
        tracing::info!(status = ?connection.status(), "Sync service initialized");
    }

    /// Stop the timer, drop the network subscription and all listeners
    pub async fn dispose(&self) {
        self.stop_periodic_sync();
        if let Some(subscription) = lock(&self.inner.subscription).take() {
            subscription.unsubscribe();
        }
        self.inner.listeners.clear();
        self.inner.initialized.store(false, Ordering::Release);
        tracing::info!("Sync service disposed");
    }

    /// Start the periodic timer. The first tick fires one interval from
    /// now. No-op when already running.
    pub fn start_periodic_sync(&self) {
        let mut periodic = lock(&self.inner.periodic);
        if periodic.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let weak = Arc::downgrade(&self.inner);
        let period = self.inner.sync_interval;
        *periodic = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                // The cycle runs outside the timer task so stopping the
                // timer never cuts a sync short.
                tokio::spawn(async move {
                    let outcome = SyncService { inner }.schedule_sync(SyncTrigger::Timer).await;
                    tracing::debug!(?outcome, "Periodic sync tick");
                });
            }
        }));
        tracing::info!(interval_secs = period.as_secs(), "Periodic sync started");
    }

    /// Stop future ticks. A cycle already running finishes normally.
    pub fn stop_periodic_sync(&self) {
        if let Some(handle) = lock(&self.inner.periodic).take() {
            handle.abort();
            tracing::info!("Periodic sync stopped");
        }
    }

    pub fn is_periodic_running(&self) -> bool {
        lock(&self.inner.periodic)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    pub async fn set_auto_sync(&self, enabled: bool) {
        self.inner.state.write().await.auto_sync_enabled = enabled;
        if enabled {
            self.start_periodic_sync();
        } else {
            self.stop_periodic_sync();
        }
    }

    /// Force a sync now, skipping the interval guard
    pub async fn sync_now(&self) -> Result<SyncOutcome, SyncError> {
        if !self.inner.monitor.check_connection().is_api_capable() {
            return Err(SyncError::network_unavailable("no api-capable connection for sync"));
        }
        Ok(self.schedule_sync(SyncTrigger::Forced).await)
    }

    pub fn add_sync_listener<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        self.inner.listeners.add(listener)
    }

    /// Run the guarded `Idle → Syncing` transition for `trigger`
    pub async fn schedule_sync(&self, trigger: SyncTrigger) -> SyncOutcome {
        let Some(flight) = FlightGuard::acquire(&self.inner.is_syncing) else {
            return self.skip(trigger, SkipReason::AlreadySyncing).await;
        };

        let connection = self.inner.monitor.check_connection();
        if !connection.is_api_capable() {
            return self.skip(trigger, SkipReason::NetworkUnsuitable).await;
        }

        let full = trigger == SyncTrigger::Forced || self.inner.scheduler.should_sync(Utc::now()).await;
        let ctx = SyncContext { trigger, connection };

        if full {
            self.run_full_cycle(ctx, flight).await
        } else if trigger == SyncTrigger::NetworkRestored {
            self.run_replay_cycle(ctx, flight).await
        } else {
            drop(flight);
            self.skip(trigger, SkipReason::IntervalNotElapsed).await
        }
    }

    async fn run_full_cycle(&self, ctx: SyncContext, flight: FlightGuard<'_>) -> SyncOutcome {
        tracing::info!(trigger = ?ctx.trigger, "Sync started");
        self.inner.state.write().await.is_syncing = true;
        self.inner.metrics.write().await.record_start();
        self.inner.listeners.notify(&SyncEvent::Started);

        let failures = self.run_tasks(&ctx, false).await;
        let result = if failures.is_empty() {
            let timestamp = Utc::now();
            if let Err(e) = self.inner.scheduler.record_sync(timestamp).await {
                tracing::warn!(error = %e, "Could not persist last sync time");
            }
            Ok(timestamp)
        } else {
            Err(aggregate(failures))
        };

        {
            let mut state = self.inner.state.write().await;
            state.is_syncing = false;
            match &result {
                Ok(timestamp) => {
                    state.last_sync_time = Some(*timestamp);
                    state.last_error = None;
                }
                Err(error) => state.last_error = Some(error.to_string()),
            }
        }
        drop(flight);

        match result {
            Ok(timestamp) => {
                self.inner.metrics.write().await.record_success();
                tracing::info!(%timestamp, "Sync completed");
                self.inner.listeners.notify(&SyncEvent::Completed { timestamp });
                SyncOutcome::Completed { timestamp }
            }
            Err(error) => {
                self.inner.metrics.write().await.record_failure();
                tracing::warn!(error = %error, "Sync finished with errors");
                self.inner.listeners.notify(&SyncEvent::error(error.clone()));
                SyncOutcome::Failed { error }
            }
        }
    }

    /// Unthrottled tasks only; no events and no credited sync
    async fn run_replay_cycle(&self, ctx: SyncContext, flight: FlightGuard<'_>) -> SyncOutcome {
        tracing::info!("Connectivity restored inside sync interval, replaying queued work");
        self.inner.state.write().await.is_syncing = true;
        let failures = self.run_tasks(&ctx, true).await;
        self.inner.state.write().await.is_syncing = false;
        drop(flight);

        let error = (!failures.is_empty()).then(|| aggregate(failures));
        SyncOutcome::Replayed { error }
    }

    async fn run_tasks(&self, ctx: &SyncContext, unthrottled_only: bool) -> Vec<(String, SyncError)> {
        let tasks = self.inner.tasks.read().await.clone();
        let mut failures = Vec::new();

        for task in tasks {
            if unthrottled_only && task.throttled() {
                continue;
            }
            let name = task.name().to_string();
            match AssertUnwindSafe(task.run(ctx)).catch_unwind().await {
                Ok(Ok(())) => tracing::debug!(task = %name, "Sync task finished"),
                Ok(Err(error)) => {
                    tracing::warn!(task = %name, error = %error, "Sync task failed");
                    failures.push((name, error));
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    tracing::error!(task = %name, panic = %message, "Sync task panicked");
                    let error = SyncError::subtask(&name, message);
                    failures.push((name, error));
                }
            }
        }
        failures
    }

    async fn skip(&self, trigger: SyncTrigger, reason: SkipReason) -> SyncOutcome {
        tracing::debug!(?trigger, ?reason, "Sync skipped");
        self.inner.metrics.write().await.record_skip();
        SyncOutcome::Skipped(reason)
    }

    fn on_network_change(weak: &Weak<Inner>, info: ConnectionInfo) {
        let Some(inner) = weak.upgrade() else { return };
        let capable = info.is_api_capable();
        let was_capable = inner.api_capable.swap(capable, Ordering::AcqRel);
        let service = SyncService { inner };

        tokio::spawn(async move {
            service.inner.state.write().await.network_status = info.status();
            if capable && !was_capable {
                tracing::info!("Api-capable connectivity restored");
                let outcome = service.schedule_sync(SyncTrigger::NetworkRestored).await;
                tracing::debug!(?outcome, "Network restore sync");
            }
        });
    }

    pub async fn state(&self) -> SyncState {
        self.inner.state.read().await.clone()
    }

    pub async fn metrics(&self) -> SyncMetrics {
        self.inner.metrics.read().await.clone()
    }

    pub async fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        self.inner.scheduler.last_sync().await
    }

    pub fn is_syncing(&self) -> bool {
        self.inner.is_syncing.load(Ordering::Acquire)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }
}

impl std::fmt::Debug for SyncService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncService")
            .field("is_syncing", &self.is_syncing())
            .field("listeners", &self.inner.listeners)
            .finish_non_exhaustive()
    }
}

/// Fold sub-task failures into one error for the `error` event
fn aggregate(mut failures: Vec<(String, SyncError)>) -> SyncError {
    if failures.len() == 1 {
        let (task, error) = failures.remove(0);
        return match error {
            SyncError::SyncSubtaskFailed { .. } => error,
            other => SyncError::subtask(task, other.to_string()),
        };
    }
    let tasks: Vec<&str> = failures.iter().map(|(task, _)| task.as_str()).collect();
    let messages: Vec<String> = failures
        .iter()
        .map(|(task, error)| format!("{}: {}", task, error))
        .collect();
    SyncError::subtask(tasks.join(", "), messages.join("; "))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "sub-task panicked".to_string()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
