//! Broadcast endpoint integration tests
//!
//! Exercises the internal HTTP surface end to end: signed broadcasts,
//! signature rejection, and the stats endpoint.

mod common;

use axum::http::StatusCode;
use axum_test::TestServer;

use pagespace_realtime::broadcast::signature::{format_header, SIGNATURE_HEADER};
use pagespace_realtime::routes::create_router;
use pagespace_realtime::server::AppState;

use common::{sign_body, subscribe, test_state};

fn test_server(state: AppState) -> TestServer {
    TestServer::new(create_router(state)).expect("router builds")
}

#[tokio::test]
async fn test_signed_broadcast_is_relayed() {
    let state = test_state();
    let mut relay_rx = subscribe(&state);
    let server = test_server(state);

    let body = serde_json::json!({
        "channelId": "page:42",
        "event": "document:update",
        "payload": {"rev": 7},
    })
    .to_string();

    let response = server
        .post("/internal/broadcast")
        .add_header(SIGNATURE_HEADER, sign_body(&body))
        .text(body)
        .await;

    assert_eq!(response.status_code(), StatusCode::ACCEPTED);

    let event = relay_rx.try_recv().expect("event relayed to subscribers");
    assert_eq!(event.channel_id, "page:42");
    assert_eq!(event.event, "document:update");
    assert_eq!(event.payload["rev"], 7);
}

#[tokio::test]
async fn test_broadcast_without_signature_rejected() {
    let state = test_state();
    let mut relay_rx = subscribe(&state);
    let server = test_server(state);

    let body = serde_json::json!({
        "channelId": "page:42",
        "event": "document:update",
    })
    .to_string();

    let response = server.post("/internal/broadcast").text(body).await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let error: serde_json::Value = response.json();
    assert_eq!(error["error"], "Unauthorized");
    assert_eq!(error["status"], 401);
    assert!(relay_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_broadcast_with_tampered_body_rejected() {
    let state = test_state();
    let server = test_server(state);

    let signed_body = r#"{"channelId":"page:42","event":"document:update"}"#;
    let tampered_body = r#"{"channelId":"page:43","event":"document:update"}"#;

    let response = server
        .post("/internal/broadcast")
        .add_header(SIGNATURE_HEADER, sign_body(signed_body))
        .text(tampered_body.to_string())
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    // Same opaque body as every other rejection: the response never
    // says which check failed.
    let error: serde_json::Value = response.json();
    assert_eq!(error["error"], "Unauthorized");
}

#[tokio::test]
async fn test_broadcast_with_garbage_header_rejected() {
    let state = test_state();
    let server = test_server(state);

    let body = r#"{"channelId":"page:42","event":"document:update"}"#;
    let response = server
        .post("/internal/broadcast")
        .add_header(SIGNATURE_HEADER, "not-a-signature-header")
        .text(body.to_string())
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_broadcast_with_stale_timestamp_rejected() {
    let state = test_state();
    let server = test_server(state);

    // A correctly formed header whose timestamp is far outside the
    // freshness window. The signature itself is bogus too, but the
    // endpoint must reject either way without detail.
    let body = r#"{"channelId":"page:42","event":"document:update"}"#;
    let header = format_header(1_000_000, "0".repeat(64).as_str());

    let response = server
        .post("/internal/broadcast")
        .add_header(SIGNATURE_HEADER, header)
        .text(body.to_string())
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_verified_but_unparseable_body_is_bad_request() {
    let state = test_state();
    let server = test_server(state);

    let body = "this is not json";
    let response = server
        .post("/internal/broadcast")
        .add_header(SIGNATURE_HEADER, sign_body(body))
        .text(body.to_string())
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let error: serde_json::Value = response.json();
    assert_eq!(error["error"], "Invalid broadcast body");
    assert_eq!(error["status"], 400);
}

#[tokio::test]
async fn test_stats_endpoint_reports_empty_registry() {
    let state = test_state();
    let server = test_server(state);

    let response = server.get("/internal/stats").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["totalConnections"], 0);
    assert_eq!(body["metadataEntries"], 0);
    assert!(body["oldestConnection"].is_null());
    assert!(body["newestConnection"].is_null());
}

#[tokio::test]
async fn test_health_endpoint() {
    let state = test_state();
    let server = test_server(state);

    let response = server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "OK");
}
