//! State that must survive a restart, on the SQLite store

use crate::common::*;
use healthsync::client::local_db::{open_store, KeyValueStore, LocalDatabase};
use healthsync::client::network::NetworkSnapshot;
use healthsync::client::offline::{AppointmentRequest, AppointmentStatus};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_last_sync_time_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("local.db");

    let first = {
        let db = Arc::new(assert_ok!(LocalDatabase::open(&db_path).await));
        let t = spawn_app_with_store(NetworkSnapshot::wifi(), db.clone()).await;
        mount_prescriptions(&t.server, "default-user", json!([])).await;
        assert_ok!(t.app.sync_now().await);
        let state = t.app.sync_state().await;
        db.close().await;
        state.last_sync_time
    };
    assert!(first.is_some());

    let store: Arc<dyn KeyValueStore> = open_store(&db_path).await;
    let t = spawn_app_with_store(NetworkSnapshot::offline(), store).await;
    t.app.init().await;

    assert_eq!(t.app.sync_state().await.last_sync_time, first);
    assert!(!t.app.sync_state().await.is_syncing);
    t.app.dispose().await;
}

#[tokio::test]
async fn test_pending_appointments_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("local.db");

    let saved = {
        let db = Arc::new(assert_ok!(LocalDatabase::open(&db_path).await));
        let t = spawn_app_with_store(NetworkSnapshot::offline(), db.clone()).await;
        let saved = assert_ok!(t.app.submit_appointment_offline(AppointmentRequest::new("h1", "Jane")).await);
        db.close().await;
        saved
    };

    let db = Arc::new(assert_ok!(LocalDatabase::open(&db_path).await));
    let t = spawn_app_with_store(NetworkSnapshot::offline(), db).await;
    t.app.init().await;

    let pending = t.app.get_pending_appointments().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, saved.id);
    assert_eq!(pending[0].status, AppointmentStatus::Pending);
    assert_eq!(pending[0].request.name, "Jane");
    t.app.dispose().await;
}
