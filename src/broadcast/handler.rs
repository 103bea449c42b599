/**
 * Broadcast Endpoint Handler
 *
 * This module implements `POST /internal/broadcast`, the endpoint peer
 * servers use to relay events into this gateway instance.
 *
 * # Verification
 *
 * The `X-Broadcast-Signature` header is verified against the *raw*
 * request body before the body is parsed: a request that fails
 * verification is rejected with a bare 401 carrying no detail about
 * which check failed (signature, format, or freshness).
 */

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use serde::Deserialize;

use crate::broadcast::relay::broadcast_event;
use crate::broadcast::signature::SIGNATURE_HEADER;
use crate::error::RealtimeError;
use crate::event::RealtimeEvent;
use crate::server::state::AppState;

/// Body of a server-to-server broadcast request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastRequest {
    /// Channel the event is addressed to
    pub channel_id: String,
    /// Event name
    pub event: String,
    /// Event payload
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Handle a signed broadcast from a peer server (POST /internal/broadcast)
///
/// # Returns
///
/// * `202 Accepted` - event verified and relayed to local subscribers
/// * `401 Unauthorized` - signature verification failed; the response
///   carries no detail about which check failed
/// * `400 Bad Request` - verified but unparseable body
pub async fn handle_broadcast(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode, RealtimeError> {
    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if !state.signer.verify(header, &body) {
        tracing::warn!("[Broadcast] Rejected broadcast with invalid signature");
        return Err(RealtimeError::handler(
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
        ));
    }

    let request: BroadcastRequest = serde_json::from_str(&body).map_err(|e| {
        tracing::warn!("[Broadcast] Verified broadcast with unparseable body: {}", e);
        RealtimeError::handler(StatusCode::BAD_REQUEST, "Invalid broadcast body")
    })?;

    let event = RealtimeEvent::new(request.channel_id, request.event, request.payload);
    let subscribers = broadcast_event(&state.realtime_broadcast, event);
    tracing::debug!(
        "[Broadcast] Peer broadcast relayed to {} subscriber(s)",
        subscribers
    );

    Ok(StatusCode::ACCEPTED)
}
