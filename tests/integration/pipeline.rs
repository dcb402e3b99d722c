//! End-to-end pipeline tests: webhook in, Sentry store request out

use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{alert_json, mock_dsn, spawn_gateway, wait_for_requests, webhook_json};

fn store_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "abc123"}))
}

#[tokio::test]
async fn test_two_alerts_are_delivered_in_order_with_mapped_levels() {
    let sentry = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/1/store/"))
        .respond_with(store_response())
        .mount(&sentry)
        .await;

    let gateway = spawn_gateway(&mock_dsn(&sentry, "key", "1"), None, None).await;

    let payload = webhook_json(&[
        alert_json("DiskFull", "critical", "firing"),
        alert_json("DiskFull", "info", "resolved"),
    ]);

    let response = reqwest::Client::new()
        .post(gateway.url("/"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let requests = wait_for_requests(&sentry, 2).await;
    assert_eq!(requests.len(), 2);

    let first: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let second: Value = serde_json::from_slice(&requests[1].body).unwrap();

    // Original batch order, severity mapping applied
    assert_eq!(first["level"], "fatal");
    assert_eq!(second["level"], "info");

    // Rendered message and verbatim label tags
    assert_eq!(first["message"], "DiskFull - web-1:9100\nDiskFull triggered");
    assert_eq!(first["tags"]["alertname"], "DiskFull");
    assert_eq!(first["tags"]["severity"], "critical");
    assert_eq!(first["logger"], "alertmanager");

    // Firing uses startsAt, resolved uses endsAt
    assert_eq!(first["timestamp"], "2024-05-01T12:00:00Z");
    assert_eq!(second["timestamp"], "2024-05-01T13:30:00Z");

    // Raw window always attached
    assert_eq!(first["extra"]["starts_at"], "2024-05-01T12:00:00Z");
    assert_eq!(first["extra"]["ends_at"], "2024-05-01T13:30:00Z");

    gateway.shutdown().await;
}

#[tokio::test]
async fn test_path_and_auth_route_to_per_request_project() {
    let sentry = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/42/store/"))
        .respond_with(store_response())
        .mount(&sentry)
        .await;

    // No default DSN: everything must come from the request
    let gateway = spawn_gateway("", None, Some(&format!("http://{}", sentry.address()))).await;

    let payload = webhook_json(&[alert_json("CacheMiss", "warning", "firing")]);
    let response = reqwest::Client::new()
        .post(gateway.url("/42/staging"))
        .basic_auth("project-key", Some(""))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let requests = wait_for_requests(&sentry, 1).await;
    let auth = requests[0].headers.get("X-Sentry-Auth").unwrap();
    assert!(auth.to_str().unwrap().contains("sentry_key=project-key"));

    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["environment"], "staging");
    assert_eq!(body["level"], "warning");

    gateway.shutdown().await;
}

#[tokio::test]
async fn test_default_environment_is_attached() {
    let sentry = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/1/store/"))
        .respond_with(store_response())
        .mount(&sentry)
        .await;

    let gateway = spawn_gateway(&mock_dsn(&sentry, "key", "1"), Some("production"), None).await;

    let payload = webhook_json(&[alert_json("A", "error", "firing")]);
    reqwest::Client::new()
        .post(gateway.url("/"))
        .json(&payload)
        .send()
        .await
        .unwrap();

    let requests = wait_for_requests(&sentry, 1).await;
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["environment"], "production");

    gateway.shutdown().await;
}

#[tokio::test]
async fn test_invalid_json_is_rejected_without_dispatch() {
    let sentry = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(store_response())
        .mount(&sentry)
        .await;

    let gateway = spawn_gateway(&mock_dsn(&sentry, "key", "1"), None, None).await;

    let response = reqwest::Client::new()
        .post(gateway.url("/"))
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    gateway.shutdown().await;

    // Queue fully drained by shutdown; nothing may have reached Sentry
    assert!(sentry.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_non_post_method_is_rejected() {
    let sentry = MockServer::start().await;
    let gateway = spawn_gateway(&mock_dsn(&sentry, "key", "1"), None, None).await;

    let response = reqwest::Client::new()
        .get(gateway.url("/"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 405);

    gateway.shutdown().await;
}

#[tokio::test]
async fn test_unusable_destination_is_dropped_silently() {
    let sentry = MockServer::start().await;

    // Empty default DSN and no auth token: the resolver falls back to a
    // destination no client can be built for. The request still succeeds.
    let gateway = spawn_gateway("", None, Some(&format!("http://{}", sentry.address()))).await;

    let payload = webhook_json(&[alert_json("A", "error", "firing")]);
    let response = reqwest::Client::new()
        .post(gateway.url("/"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    gateway.shutdown().await;
    assert!(sentry.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_submission_error_does_not_stop_the_batch() {
    let sentry = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/1/store/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&sentry)
        .await;

    let gateway = spawn_gateway(&mock_dsn(&sentry, "key", "1"), None, None).await;

    let payload = webhook_json(&[
        alert_json("A", "error", "firing"),
        alert_json("B", "error", "firing"),
    ]);
    let response = reqwest::Client::new()
        .post(gateway.url("/"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Both submissions are attempted even though each one fails
    let requests = wait_for_requests(&sentry, 2).await;
    assert_eq!(requests.len(), 2);

    gateway.shutdown().await;
}
