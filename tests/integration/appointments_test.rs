//! Offline appointment queue round trips

use crate::common::*;
use healthsync::client::local_db::{keys, save_json};
use healthsync::client::network::NetworkSnapshot;
use healthsync::client::offline::{AppointmentRequest, AppointmentStatus, PendingAppointment};
use healthsync::shared::SyncError;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

fn jane() -> AppointmentRequest {
    AppointmentRequest {
        hospital_name: Some("City General".into()),
        ..AppointmentRequest::new("h1", "Jane")
    }
}

#[tokio::test]
async fn test_offline_submission_confirmed_after_reconnect() {
    let t = spawn_app(NetworkSnapshot::offline()).await;
    mount_prescriptions(&t.server, "default-user", json!([])).await;
    Mock::given(method("POST"))
        .and(path("/api/appointments"))
        .and(body_partial_json(json!({ "hospitalId": "h1", "name": "Jane" })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&t.server)
        .await;
    t.app.init().await;

    let saved = assert_ok!(t.app.submit_appointment_offline(jane()).await);
    assert_eq!(saved.status, AppointmentStatus::Pending);
    let pending = t.app.get_pending_appointments().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, saved.id);

    t.network.update(NetworkSnapshot::wifi());

    let app = &t.app;
    assert!(eventually(move || async move { app.get_pending_appointments().await.is_empty() }).await);
    let history = t.app.get_appointments().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, AppointmentStatus::Confirmed);

    t.app.dispose().await;
}

#[tokio::test]
async fn test_online_submission_is_sent_immediately() {
    let t = spawn_app(NetworkSnapshot::wifi()).await;
    Mock::given(method("POST"))
        .and(path("/api/appointments"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&t.server)
        .await;

    let appointment = assert_ok!(t.app.submit_appointment(jane()).await);

    assert_eq!(appointment.status, AppointmentStatus::Confirmed);
    assert!(t.app.get_pending_appointments().await.is_empty());
}

#[tokio::test]
async fn test_submission_without_connectivity_stays_pending() {
    let t = spawn_app(NetworkSnapshot::offline()).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&t.server)
        .await;

    let appointment = assert_ok!(t.app.submit_appointment(jane()).await);
    assert_eq!(appointment.status, AppointmentStatus::Pending);
    assert_eq!(t.app.get_pending_appointments().await.len(), 1);
}

#[tokio::test]
async fn test_rejected_submission_stays_visible_until_forced_sync() {
    let t = spawn_app(NetworkSnapshot::wifi()).await;
    mount_prescriptions(&t.server, "default-user", json!([])).await;
    Mock::given(method("POST"))
        .and(path("/api/appointments"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&t.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/appointments"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&t.server)
        .await;

    let appointment = assert_ok!(t.app.submit_appointment(jane()).await);
    assert_eq!(appointment.status, AppointmentStatus::Failed);
    assert_contains!(appointment.last_error.as_deref().unwrap(), "503");

    let pending = t.app.get_pending_appointments().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].status, AppointmentStatus::Failed);

    assert_ok!(t.app.sync_now().await);
    assert!(t.app.get_pending_appointments().await.is_empty());
    assert_eq!(t.app.get_appointments().await[0].status, AppointmentStatus::Confirmed);
}

#[tokio::test]
async fn test_invalid_request_is_rejected_and_not_stored() {
    let t = spawn_app(NetworkSnapshot::offline()).await;

    let result = t.app.submit_appointment_offline(AppointmentRequest::new("", "Jane")).await;

    assert_err!(result, SyncError::Validation { .. });
    assert!(t.app.get_pending_appointments().await.is_empty());
    assert!(t.app.get_appointments().await.is_empty());
}

#[tokio::test]
async fn test_repeat_init_keeps_in_memory_queue() {
    let t = spawn_app(NetworkSnapshot::offline()).await;
    t.app.init().await;
    let saved = assert_ok!(t.app.submit_appointment_offline(jane()).await);

    // Storage no longer holds the item, as after a failed write
    let empty: Vec<PendingAppointment> = Vec::new();
    assert_ok!(save_json(t.store.as_ref(), keys::PENDING_APPOINTMENTS, &empty).await);
    assert_ok!(save_json(t.store.as_ref(), keys::APPOINTMENTS, &empty).await);

    t.app.init().await;

    let pending = t.app.get_pending_appointments().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, saved.id);
    assert_eq!(t.app.get_appointments().await.len(), 1);
    t.app.dispose().await;
}
