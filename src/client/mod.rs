//! Adaptive Sync Client Module
//!
//! Network-aware data access for the health-records client: classifies the
//! current connection, picks the api or the degraded sms channel, keeps a
//! periodic background sync running, and queues appointments created while
//! offline.
//!
//! # Architecture
//!
//! - **`config`** - Runtime configuration (api url, timeouts, intervals, token)
//! - **`http`** - Outbound HTTP capability
//! - **`local_db`** - Durable key-value persistence (SQLite, memory fallback)
//! - **`network`** - Connection classifier, speed probe, method selector
//! - **`records`** - Resource fetching with api → sms fallback
//! - **`offline`** - Pending appointment queue
//! - **`sync`** - Sync orchestrator, scheduler, listeners, metrics
//!
//! # Module Structure
//!
//! ```text
//! client/
//! ├── mod.rs      - HealthSync facade
//! ├── main.rs     - Headless sync agent (binary)
//! ├── config.rs   - Configuration wrapper
//! ├── http.rs     - HttpClient trait and reqwest implementation
//! ├── local_db/   - KeyValueStore, LocalDatabase, MemoryStore
//! ├── network/    - Classification, probe, selection, monitor
//! ├── records/    - ResourceFetcher, prescriptions
//! ├── offline/    - AppointmentQueue
//! └── sync/       - SyncService and its parts
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use healthsync::client::{Config, HealthSync};
//! use healthsync::client::http::ReqwestHttpClient;
//! use healthsync::client::local_db::open_store;
//! use healthsync::client::network::{NetworkSnapshot, WatchNetworkSource};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), healthsync::shared::SyncError> {
//! let config = Config::new();
//! let store = open_store(&config.database_path()).await;
//! let network = Arc::new(WatchNetworkSource::new(NetworkSnapshot::wifi()));
//! let app = HealthSync::new(config, network, Arc::new(ReqwestHttpClient::new()), store).await;
//!
//! app.init().await;
//! let prescriptions = app.fetch_prescriptions("user-1").await?;
//! println!("{:?}", prescriptions.source);
//! app.dispose().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod http;
pub mod local_db;
pub mod network;
pub mod offline;
pub mod records;
pub mod sync;

pub use config::Config;

use crate::shared::error::SyncError;
use crate::shared::event::SyncEvent;
use http::HttpClient;
use local_db::KeyValueStore;
use network::{
    ConnectionInfo, FetchMethodSelector, MethodSelection, NetworkMonitor, NetworkSource,
    NetworkSubscription, SpeedProbe, SpeedTestResult,
};
use offline::{
    AppointmentQueue, AppointmentRequest, AppointmentSubmitter, HttpAppointmentSubmitter,
    PendingAppointment,
};
use records::{
    CachedPrescriptions, DegradedChannel, FetchResult, PlaceholderSmsChannel, PrescriptionService,
    ResourceFetcher,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use sync::{
    AppointmentSyncTask, ListenerHandle, PrescriptionSyncTask, SyncMetrics, SyncOutcome,
    SyncService, SyncState,
};

/// Entry point for callers: every exposed operation of the sync core
pub struct HealthSync {
    config: Config,
    monitor: NetworkMonitor,
    probe: SpeedProbe,
    selector: FetchMethodSelector,
    prescriptions: PrescriptionService,
    queue: Arc<AppointmentQueue>,
    /// Set once the queue has been read from storage
    queue_loaded: AtomicBool,
    sync: SyncService,
}

impl HealthSync {
    /// Wire the core with the placeholder sms channel and HTTP appointment
    /// submission
    pub async fn new(
        config: Config,
        network: Arc<dyn NetworkSource>,
        http: Arc<dyn HttpClient>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let submitter = Arc::new(HttpAppointmentSubmitter::new(config.clone(), http.clone()));
        Self::with_channels(config, network, http, store, Arc::new(PlaceholderSmsChannel), submitter).await
    }

    pub async fn with_channels(
        config: Config,
        network: Arc<dyn NetworkSource>,
        http: Arc<dyn HttpClient>,
        store: Arc<dyn KeyValueStore>,
        sms: Arc<dyn DegradedChannel>,
        submitter: Arc<dyn AppointmentSubmitter>,
    ) -> Self {
        let monitor = NetworkMonitor::new(network);
        let probe = SpeedProbe::new(http.clone(), config.probe_url(), config.probe_timeout());
        let selector = FetchMethodSelector::new(monitor.clone(), probe.clone());
        let fetcher = ResourceFetcher::new(config.clone(), http, selector.clone(), sms);
        let prescriptions = PrescriptionService::new(fetcher, store.clone());
        let queue = Arc::new(AppointmentQueue::new(store.clone(), submitter));

        let sync = SyncService::new(&config, monitor.clone(), store);
        sync.register_task(Arc::new(PrescriptionSyncTask::new(prescriptions.clone())))
            .await;
        sync.register_task(Arc::new(AppointmentSyncTask::new(queue.clone())))
            .await;

        Self {
            config,
            monitor,
            probe,
            selector,
            prescriptions,
            queue,
            queue_loaded: AtomicBool::new(false),
            sync,
        }
    }

    /// Load persisted state and start background sync. The appointment
    /// queue is read from storage only on the first call, so a repeat call
    /// never replaces items that exist only in memory.
    pub async fn init(&self) {
        if !self.queue_loaded.swap(true, Ordering::AcqRel) {
            self.queue.load().await;
        }
        self.sync.init().await;
    }

    pub async fn dispose(&self) {
        self.sync.dispose().await;
    }

    pub fn check_connection(&self) -> ConnectionInfo {
        self.monitor.check_connection()
    }

    pub fn subscribe_to_network_changes<F>(&self, callback: F) -> NetworkSubscription
    where
        F: Fn(ConnectionInfo) + Send + Sync + 'static,
    {
        self.monitor.subscribe(callback)
    }

    pub async fn measure_connection_speed(&self) -> SpeedTestResult {
        self.probe.measure().await
    }

    pub async fn select_method(&self) -> MethodSelection {
        self.selector.select_method().await
    }

    pub async fn fetch_prescriptions(&self, user_id: &str) -> Result<FetchResult, SyncError> {
        self.prescriptions.fetch_prescriptions(user_id).await
    }

    /// Last prescriptions cached by background sync
    pub async fn cached_prescriptions(&self) -> Result<Option<CachedPrescriptions>, SyncError> {
        self.prescriptions.cached_prescriptions().await
    }

    pub async fn sync_now(&self) -> Result<SyncOutcome, SyncError> {
        self.sync.sync_now().await
    }

    pub fn add_sync_listener<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        self.sync.add_sync_listener(listener)
    }

    pub fn start_periodic_sync(&self) {
        self.sync.start_periodic_sync();
    }

    pub fn stop_periodic_sync(&self) {
        self.sync.stop_periodic_sync();
    }

    pub async fn set_auto_sync(&self, enabled: bool) {
        self.sync.set_auto_sync(enabled).await;
    }

    pub async fn sync_state(&self) -> SyncState {
        self.sync.state().await
    }

    pub async fn sync_metrics(&self) -> SyncMetrics {
        self.sync.metrics().await
    }

    /// Save an appointment for later submission. Never touches the network.
    pub async fn submit_appointment_offline(&self, request: AppointmentRequest) -> Result<PendingAppointment, SyncError> {
        self.queue.submit_offline(request).await
    }

    /// Save an appointment, then submit it right away when connected.
    /// Returns the appointment with its latest status.
    pub async fn submit_appointment(&self, request: AppointmentRequest) -> Result<PendingAppointment, SyncError> {
        let saved = self.queue.submit_offline(request).await?;
        if !self.monitor.check_connection().is_api_capable() {
            return Ok(saved);
        }

        self.queue.replay(false).await;
        let latest = self
            .queue
            .history()
            .await
            .into_iter()
            .find(|a| a.id == saved.id)
            .unwrap_or(saved);
        Ok(latest)
    }

    pub async fn get_pending_appointments(&self) -> Vec<PendingAppointment> {
        self.queue.pending().await
    }

    /// Every submitted appointment, including confirmed ones
    pub async fn get_appointments(&self) -> Vec<PendingAppointment> {
        self.queue.history().await
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sync_service(&self) -> &SyncService {
        &self.sync
    }
}

impl std::fmt::Debug for HealthSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthSync")
            .field("config", &self.config)
            .field("sync", &self.sync)
            .finish_non_exhaustive()
    }
}
