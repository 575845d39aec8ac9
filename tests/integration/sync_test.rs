//! Sync orchestrator end to end

use crate::common::*;
use assert_matches::assert_matches;
use chrono::{DateTime, Utc};
use healthsync::client::local_db::{keys, load_json};
use healthsync::client::network::{CellularGeneration, NetworkSnapshot, NetworkStatus};
use healthsync::client::sync::{SkipReason, SyncOutcome, SyncTrigger};
use healthsync::shared::{SyncError, SyncEvent};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_sync_now_completes_and_persists_last_sync_time() {
    let t = spawn_app(NetworkSnapshot::wifi()).await;
    mount_prescriptions(&t.server, "default-user", json!([])).await;

    let outcome = assert_ok!(t.app.sync_now().await);
    let timestamp = assert_matches!(outcome, SyncOutcome::Completed { timestamp } => timestamp);

    assert_eq!(t.events.statuses(), vec!["started", "completed"]);
    assert_eq!(t.events.all()[1], SyncEvent::Completed { timestamp });

    let persisted: Option<DateTime<Utc>> =
        assert_ok!(load_json(t.store.as_ref(), keys::LAST_SYNC_TIME).await);
    assert_eq!(persisted, Some(timestamp));

    let state = t.app.sync_state().await;
    assert!(!state.is_syncing);
    assert_eq!(state.last_sync_time, Some(timestamp));
    assert_ne!(state.last_sync_display(), "Never");
    assert_eq!(t.app.sync_metrics().await.completed, 1);
}

#[tokio::test]
async fn test_failed_resource_emits_error_and_is_not_credited() {
    let t = spawn_app(NetworkSnapshot::wifi()).await;
    Mock::given(method("GET"))
        .and(path("/api/prescriptions/default-user"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&t.server)
        .await;

    let outcome = assert_ok!(t.app.sync_now().await);
    assert_matches!(
        outcome,
        SyncOutcome::Failed { error: SyncError::SyncSubtaskFailed { ref task, .. } } if task == "prescriptions"
    );

    assert_eq!(t.events.statuses(), vec!["started", "error"]);
    let persisted: Option<DateTime<Utc>> =
        assert_ok!(load_json(t.store.as_ref(), keys::LAST_SYNC_TIME).await);
    assert_eq!(persisted, None);

    let state = t.app.sync_state().await;
    assert_eq!(state.last_sync_display(), "Never");
    assert_contains!(state.last_error.unwrap(), "502");
}

#[tokio::test]
async fn test_concurrent_force_syncs_run_once() {
    let t = spawn_app(NetworkSnapshot::wifi()).await;
    Mock::given(method("GET"))
        .and(path("/api/prescriptions/default-user"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&t.server)
        .await;

    let (first, second) = tokio::join!(t.app.sync_now(), t.app.sync_now());
    let outcomes = [assert_ok!(first), assert_ok!(second)];

    assert_eq!(
        outcomes
            .iter()
            .filter(|o| matches!(o, SyncOutcome::Completed { .. }))
            .count(),
        1
    );
    assert!(outcomes.contains(&SyncOutcome::Skipped(SkipReason::AlreadySyncing)));
    assert_eq!(t.events.statuses(), vec!["started", "completed"]);
}

#[tokio::test]
async fn test_sync_now_without_connectivity_is_rejected() {
    let t = spawn_app(NetworkSnapshot::offline()).await;

    assert_err!(t.app.sync_now().await, SyncError::NetworkUnavailable { .. });
    assert!(t.events.all().is_empty());
}

#[tokio::test]
async fn test_two_g_link_does_not_sync() {
    let t = spawn_app(NetworkSnapshot::cellular(Some(CellularGeneration::FourG), Some("slow-2g"))).await;

    assert_err!(t.app.sync_now().await, SyncError::NetworkUnavailable { .. });
    assert_eq!(
        t.app.sync_service().schedule_sync(SyncTrigger::Timer).await,
        SyncOutcome::Skipped(SkipReason::NetworkUnsuitable)
    );
}

#[tokio::test]
async fn test_listener_unsubscribe_is_idempotent() {
    let t = spawn_app(NetworkSnapshot::wifi()).await;
    mount_prescriptions(&t.server, "default-user", json!([])).await;

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let handle = t.app.add_sync_listener(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    handle.unsubscribe();
    handle.unsubscribe();

    assert_ok!(t.app.sync_now().await);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(t.events.statuses(), vec!["started", "completed"]);
}

#[tokio::test]
async fn test_network_status_is_published() {
    let t = spawn_app(NetworkSnapshot::offline()).await;
    t.app.init().await;
    assert_eq!(
        t.app.sync_state().await.network_status,
        NetworkStatus::Offline
    );

    t.network.update(NetworkSnapshot::cellular(Some(CellularGeneration::TwoG), None));
    let app = &t.app;
    assert!(
        eventually(move || async move {
            app.sync_state().await.network_status == NetworkStatus::Limited
        })
        .await
    );
    assert!(t.events.all().is_empty());
    t.app.dispose().await;
}
