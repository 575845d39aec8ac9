//! Test fixtures: a `HealthSync` wired to a wiremock api, an injectable
//! network source and an in-memory or SQLite store.

use healthsync::client::http::ReqwestHttpClient;
use healthsync::client::local_db::{KeyValueStore, MemoryStore};
use healthsync::client::network::{NetworkSnapshot, WatchNetworkSource};
use healthsync::client::{Config, HealthSync};
use healthsync::shared::{AppConfig, SyncEvent};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Size of the speed-probe payload served by [`mount_probe`]
pub const PROBE_BYTES: usize = 256 * 1024;

pub struct TestApp {
    pub server: MockServer,
    pub network: Arc<WatchNetworkSource>,
    pub store: Arc<dyn KeyValueStore>,
    pub app: HealthSync,
    pub events: EventRecorder,
}

/// Configuration pointing every endpoint at `server`
pub fn test_config(server: &MockServer) -> Config {
    let app = AppConfig::builder()
        .api_base_url(format!("{}/api", server.uri()))
        .probe_url(format!("{}/probe", server.uri()))
        .probe_timeout(Duration::from_secs(2))
        .request_timeout(Duration::from_secs(2))
        .build()
        .expect("test config is valid");
    Config::from_app(app)
}

pub async fn spawn_app(snapshot: NetworkSnapshot) -> TestApp {
    spawn_app_with_store(snapshot, Arc::new(MemoryStore::new())).await
}

pub async fn spawn_app_with_store(snapshot: NetworkSnapshot, store: Arc<dyn KeyValueStore>) -> TestApp {
    let server = MockServer::start().await;
    let network = Arc::new(WatchNetworkSource::new(snapshot));
    let app = HealthSync::new(
        test_config(&server),
        network.clone(),
        Arc::new(ReqwestHttpClient::new()),
        store.clone(),
    )
    .await;
    let events = EventRecorder::attach(&app);

    TestApp {
        server,
        network,
        store,
        app,
        events,
    }
}

/// Serve a probe payload large enough to classify a local link as fast
pub async fn mount_probe(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/probe"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; PROBE_BYTES]))
        .mount(server)
        .await;
}

pub async fn mount_prescriptions(server: &MockServer, user_id: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api/prescriptions/{}", user_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Collects every sync event delivered to the app
#[derive(Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<SyncEvent>>>,
}

impl EventRecorder {
    pub fn attach(app: &HealthSync) -> Self {
        let recorder = Self::default();
        let events = recorder.events.clone();
        app.add_sync_listener(move |event| events.lock().unwrap().push(event.clone()));
        recorder
    }

    pub fn all(&self) -> Vec<SyncEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<&'static str> {
        self.all().iter().map(SyncEvent::status).collect()
    }
}

/// Poll `condition` until it holds or two seconds pass
pub async fn eventually<F, Fut>(mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
