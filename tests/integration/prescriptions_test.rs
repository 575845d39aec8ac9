//! Prescription fetching over the selected channel

use crate::common::*;
use healthsync::client::network::{CellularGeneration, FetchMethod, NetworkSnapshot};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_fast_link_fetches_from_api() {
    let t = spawn_app(NetworkSnapshot::wifi()).await;
    mount_probe(&t.server).await;
    mount_prescriptions(&t.server, "user-1", json!([{ "drug": "amoxicillin" }])).await;

    let result = assert_ok!(t.app.fetch_prescriptions("user-1").await);

    assert_eq!(result.source, FetchMethod::Api);
    assert_eq!(result.data, json!([{ "drug": "amoxicillin" }]));
    assert!(result.is_authoritative());
}

#[tokio::test]
async fn test_api_failure_falls_back_to_sms_once() {
    let t = spawn_app(NetworkSnapshot::wifi()).await;
    mount_probe(&t.server).await;
    Mock::given(method("GET"))
        .and(path("/api/prescriptions/user-1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&t.server)
        .await;

    let result = assert_ok!(t.app.fetch_prescriptions("user-1").await);

    assert_eq!(result.source, FetchMethod::Sms);
    assert!(!result.is_authoritative());
    assert_contains!(result.data["message"].as_str().unwrap(), "SMS");
    assert_eq!(result.data["prescriptions"], json!([]));
}

#[tokio::test]
async fn test_two_g_link_skips_probe_and_api() {
    let t = spawn_app(NetworkSnapshot::cellular(Some(CellularGeneration::TwoG), None)).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&t.server)
        .await;

    let result = assert_ok!(t.app.fetch_prescriptions("user-1").await);
    assert_eq!(result.source, FetchMethod::Sms);
}

#[tokio::test]
async fn test_probe_failure_selects_sms() {
    let t = spawn_app(NetworkSnapshot::wifi()).await;
    Mock::given(method("GET"))
        .and(path("/probe"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&t.server)
        .await;

    let speed = t.app.measure_connection_speed().await;
    assert_eq!(speed.recommended_method, FetchMethod::Sms);
    assert!(!speed.is_success());

    let selection = t.app.select_method().await;
    assert_eq!(selection.method, FetchMethod::Sms);
}

#[tokio::test]
async fn test_sync_caches_api_data_only() {
    let t = spawn_app(NetworkSnapshot::wifi()).await;
    mount_prescriptions(&t.server, "default-user", json!([{ "drug": "ibuprofen" }])).await;
    Mock::given(method("POST"))
        .and(path("/api/appointments"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&t.server)
        .await;

    assert_ok!(t.app.sync_now().await);

    let cached = assert_ok!(t.app.cached_prescriptions().await).expect("cache written");
    assert_eq!(cached.source, FetchMethod::Api);
    assert_eq!(cached.data, json!([{ "drug": "ibuprofen" }]));
}
