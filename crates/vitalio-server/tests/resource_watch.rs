//! Integration tests for the resource watch pipeline.
//!
//! Each test spins up the full axum server on an ephemeral port with an
//! isolated update channel, drives it over HTTP, and inspects what (if
//! anything) arrives on the channel.

use std::time::Duration;

use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use vitalio_core::{UpdateEnvelope, UpdateReceiver, UpdateSender};
use vitalio_server::{AppConfig, build_app};

/// Config watching MedicationStatement with the given channel capacity.
fn watch_config(channel_capacity: usize) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.watch.channel_capacity = channel_capacity;
    cfg.watch.resource_types = vec!["MedicationStatement".to_string()];
    cfg
}

async fn start_server(
    cfg: &AppConfig,
) -> (
    String,
    UpdateSender,
    UpdateReceiver,
    tokio::sync::oneshot::Sender<()>,
    JoinHandle<()>,
) {
    let parts = build_app(cfg);

    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, parts.router)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    (
        format!("http://{addr}"),
        parts.update_sender,
        parts.update_receiver,
        tx,
        server,
    )
}

fn medication_statement() -> Value {
    json!({
        "resourceType": "MedicationStatement",
        "status": "active",
        "patient": { "reference": "Patient/55c3847267803d2945000003" },
        "effectiveDateTime": "2015-04-01T00:00:00-04:00",
        "medicationCodeableConcept": {
            "coding": [{ "system": "http://www.nlm.nih.gov/research/umls/rxnorm", "code": "310965" }]
        }
    })
}

async fn post_resource(client: &reqwest::Client, base: &str, resource_type: &str, body: &Value) -> reqwest::Response {
    client
        .post(format!("{base}/{resource_type}"))
        .header("accept", "application/fhir+json")
        .header("content-type", "application/fhir+json")
        .json(body)
        .send()
        .await
        .unwrap()
}

async fn recv_envelope(receiver: &UpdateReceiver) -> UpdateEnvelope {
    timeout(Duration::from_secs(1), receiver.recv())
        .await
        .expect("envelope should arrive within bounded time")
        .expect("channel open")
}

/// Give the in-flight interceptor a moment, then assert nothing was queued.
async fn assert_no_envelope(receiver: &UpdateReceiver) {
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(receiver.try_recv().is_none(), "no envelope expected");
}

#[tokio::test]
async fn watched_post_publishes_exactly_one_envelope() {
    let cfg = watch_config(8);
    let (base, _sender, receiver, shutdown_tx, handle) = start_server(&cfg).await;
    let client = reqwest::Client::new();

    let resp = post_resource(&client, &base, "MedicationStatement", &medication_statement()).await;
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);

    let envelope = recv_envelope(&receiver).await;
    assert_eq!(envelope.subject_id, "55c3847267803d2945000003");
    assert_eq!(envelope.occurred_at.to_string(), "2015-04-01T00:00:00-04:00");
    assert_eq!(envelope.resource_type, "MedicationStatement");

    // Exactly one.
    assert_no_envelope(&receiver).await;

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn unwatched_type_never_produces_envelope() {
    let cfg = watch_config(8);
    let (base, _sender, receiver, shutdown_tx, handle) = start_server(&cfg).await;
    let client = reqwest::Client::new();

    // Fully extractable content, but Observation is not in the watch list.
    let observation = json!({
        "resourceType": "Observation",
        "status": "final",
        "subject": { "reference": "Patient/55c3847267803d2945000003" },
        "effectiveDateTime": "2015-04-01T00:00:00-04:00"
    });
    let resp = post_resource(&client, &base, "Observation", &observation).await;
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);

    assert_no_envelope(&receiver).await;

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn failed_mutation_produces_no_envelope() {
    let cfg = watch_config(8);
    let (base, _sender, receiver, shutdown_tx, handle) = start_server(&cfg).await;
    let client = reqwest::Client::new();

    // Body type does not match the route: the handler rejects the write.
    let mismatched = json!({
        "resourceType": "Observation",
        "subject": { "reference": "Patient/p1" },
        "effectiveDateTime": "2015-04-01T00:00:00Z"
    });
    let resp = post_resource(&client, &base, "MedicationStatement", &mismatched).await;
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

    assert_no_envelope(&receiver).await;

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn missing_subject_produces_no_envelope() {
    let cfg = watch_config(8);
    let (base, _sender, receiver, shutdown_tx, handle) = start_server(&cfg).await;
    let client = reqwest::Client::new();

    let no_subject = json!({
        "resourceType": "MedicationStatement",
        "status": "active",
        "effectiveDateTime": "2015-04-01T00:00:00-04:00"
    });
    let resp = post_resource(&client, &base, "MedicationStatement", &no_subject).await;
    // The write itself succeeds; only the notification is skipped.
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);

    assert_no_envelope(&receiver).await;

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn full_channel_drops_envelope_without_failing_request() {
    let cfg = watch_config(1);
    let (base, sender, receiver, shutdown_tx, handle) = start_server(&cfg).await;
    let client = reqwest::Client::new();

    // No worker is draining, so the second extractable mutation must drop.
    let first_body = medication_statement();
    let second_body = medication_statement();
    let (first, second) = tokio::join!(
        post_resource(&client, &base, "MedicationStatement", &first_body),
        post_resource(&client, &base, "MedicationStatement", &second_body),
    );
    assert_eq!(first.status(), reqwest::StatusCode::CREATED);
    assert_eq!(second.status(), reqwest::StatusCode::CREATED);

    let envelope = recv_envelope(&receiver).await;
    assert_eq!(envelope.subject_id, "55c3847267803d2945000003");

    assert_no_envelope(&receiver).await;
    assert_eq!(sender.dropped_count(), 1);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn update_mutation_publishes_envelope() {
    let cfg = watch_config(8);
    let (base, _sender, receiver, shutdown_tx, handle) = start_server(&cfg).await;
    let client = reqwest::Client::new();

    let resp = post_resource(&client, &base, "MedicationStatement", &medication_statement()).await;
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
    let created: Value = resp.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();
    let _ = recv_envelope(&receiver).await;

    let mut updated = medication_statement();
    updated["id"] = json!(id);
    updated["effectiveDateTime"] = json!("2015-06-01T12:00:00-04:00");
    let resp = client
        .put(format!("{base}/MedicationStatement/{id}"))
        .header("accept", "application/fhir+json")
        .header("content-type", "application/fhir+json")
        .json(&updated)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let envelope = recv_envelope(&receiver).await;
    assert_eq!(envelope.subject_id, "55c3847267803d2945000003");
    assert_eq!(envelope.occurred_at.to_string(), "2015-06-01T12:00:00-04:00");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn reads_and_deletes_are_not_observed() {
    let cfg = watch_config(8);
    let (base, _sender, receiver, shutdown_tx, handle) = start_server(&cfg).await;
    let client = reqwest::Client::new();

    let resp = post_resource(&client, &base, "MedicationStatement", &medication_statement()).await;
    let created: Value = resp.json().await.unwrap();
    let id = created["id"].as_str().unwrap();
    let _ = recv_envelope(&receiver).await;

    let resp = client
        .get(format!("{base}/MedicationStatement/{id}"))
        .header("accept", "application/fhir+json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let resp = client
        .delete(format!("{base}/MedicationStatement/{id}"))
        .header("accept", "application/fhir+json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NO_CONTENT);

    assert_no_envelope(&receiver).await;

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn watch_disabled_installs_no_interceptors() {
    let mut cfg = watch_config(8);
    cfg.watch.enabled = false;
    let (base, _sender, receiver, shutdown_tx, handle) = start_server(&cfg).await;
    let client = reqwest::Client::new();

    let resp = post_resource(&client, &base, "MedicationStatement", &medication_statement()).await;
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);

    assert_no_envelope(&receiver).await;

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}
