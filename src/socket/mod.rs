/**
 * WebSocket Connection Lifecycle
 *
 * This module implements the `GET /ws` endpoint: session-validated
 * upgrade, registration, the challenge handshake, keep-alive tracking,
 * and per-event dispatch through the authorization policy.
 *
 * # Connection Lifecycle
 *
 * ```text
 * GET /ws?token=...
 *   -> validate session (401 on failure)
 *   -> upgrade, register (displacing any existing connection)
 *   -> send challenge nonce
 *   -> client echoes nonce -> challenge verified
 *   -> event loop: dispatch client events, forward relay events
 *   -> close -> unregister
 * ```
 *
 * # Handle Design
 *
 * The socket itself is owned by the connection task. The registry and
 * the sweeper only ever hold a [`WsHandle`]: a non-owning handle that
 * carries the connection's identity, mirrors the transport ready
 * state, and turns `close` calls into commands on the writer channel.
 * This keeps `close` synchronous and non-blocking, so it is safe to
 * call while the registry mutex is held.
 */

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::auth::SessionClaims;
use crate::authz::{reauthorize_page_access, should_reauthorize, RequiredLevel};
use crate::broadcast::relay::broadcast_event;
use crate::event::{ClientEvent, RealtimeEvent};
use crate::registry::{ConnectionId, ReadyState, SocketHandle};
use crate::server::state::AppState;

/// Process-wide connection ID counter
///
/// Starts at 1 so 0 never names a real connection.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

const STATE_CONNECTING: u8 = 0;
const STATE_OPEN: u8 = 1;
const STATE_CLOSING: u8 = 2;
const STATE_CLOSED: u8 = 3;

/// Command sent to a connection's writer task
#[derive(Debug, Clone)]
pub enum SocketCommand {
    /// Deliver an event to the client
    Event(RealtimeEvent),
    /// Close the connection with a code and reason
    Close { code: u16, reason: String },
}

/// Non-owning handle to a live WebSocket connection
///
/// Shared with the registry; the connection task owns the socket.
#[derive(Debug)]
pub struct WsHandle {
    id: ConnectionId,
    state: AtomicU8,
    tx: mpsc::UnboundedSender<SocketCommand>,
}

impl WsHandle {
    /// Create a handle with a fresh process-unique ID
    pub fn new(tx: mpsc::UnboundedSender<SocketCommand>) -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            state: AtomicU8::new(STATE_CONNECTING),
            tx,
        }
    }

    /// Mark the transport state (set by the connection task)
    pub fn set_ready_state(&self, state: ReadyState) {
        let value = match state {
            ReadyState::Connecting => STATE_CONNECTING,
            ReadyState::Open => STATE_OPEN,
            ReadyState::Closing => STATE_CLOSING,
            ReadyState::Closed => STATE_CLOSED,
        };
        self.state.store(value, Ordering::SeqCst);
    }

    /// Queue an event for delivery to the client
    ///
    /// Returns false when the writer task is gone.
    pub fn send_event(&self, event: RealtimeEvent) -> bool {
        self.tx.send(SocketCommand::Event(event)).is_ok()
    }
}

impl SocketHandle for WsHandle {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn ready_state(&self) -> ReadyState {
        match self.state.load(Ordering::SeqCst) {
            STATE_CONNECTING => ReadyState::Connecting,
            STATE_OPEN => ReadyState::Open,
            STATE_CLOSING => ReadyState::Closing,
            _ => ReadyState::Closed,
        }
    }

    fn close(&self, code: u16, reason: &str) {
        // The writer task may already be gone; a failed send is a no-op.
        let _ = self.tx.send(SocketCommand::Close {
            code,
            reason: reason.to_string(),
        });
        self.state.store(STATE_CLOSING, Ordering::SeqCst);
    }
}

/// Query parameters for the WebSocket upgrade
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Session token (validated before the upgrade is accepted)
    pub token: String,
    /// Opaque client/device fingerprint
    pub fingerprint: Option<String>,
}

/// Handle a WebSocket upgrade request (GET /ws)
///
/// The session token is validated before the upgrade: an invalid token
/// gets a 401 and never reaches the socket protocol. A transient
/// session-service failure is also a 401 here - unlike the sweeper,
/// the handshake has no existing connection to preserve, so it fails
/// closed.
pub async fn handle_socket_upgrade(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Result<Response, StatusCode> {
    let claims = match state.sessions.validate_session(&query.token).await {
        Ok(Some(claims)) => claims,
        Ok(None) => {
            tracing::warn!("[Socket] Upgrade rejected: invalid session token");
            return Err(StatusCode::UNAUTHORIZED);
        }
        Err(e) => {
            tracing::warn!("[Socket] Upgrade rejected: session validation failed: {}", e);
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    tracing::info!("[Socket] Upgrade accepted for user {}", claims.sub);
    let token = query.token;
    let fingerprint = query.fingerprint;
    Ok(ws.on_upgrade(move |socket| run_connection(socket, state, claims, token, fingerprint)))
}

/// Drive a single WebSocket connection from registration to teardown
async fn run_connection(
    socket: WebSocket,
    state: AppState,
    claims: SessionClaims,
    token: String,
    fingerprint: Option<String>,
) {
    let user_id = claims.sub.clone();
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<SocketCommand>();

    let handle = Arc::new(WsHandle::new(tx));
    handle.set_ready_state(ReadyState::Open);

    state.registry.register(
        &user_id,
        handle.clone(),
        fingerprint,
        claims.sid.clone(),
        Some(token),
    );
    tracing::info!(
        "[Socket] Connection {} registered for user {}",
        handle.id(),
        user_id
    );

    // Writer task: the only owner of the socket sink.
    let writer_handle = handle.clone();
    let writer = tokio::spawn(async move {
        while let Some(command) = rx.recv().await {
            match command {
                SocketCommand::Event(event) => {
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!("[Socket] Failed to serialize event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                SocketCommand::Close { code, reason } => {
                    let _ = sender
                        .send(Message::Close(Some(CloseFrame {
                            code,
                            reason: reason.into(),
                        })))
                        .await;
                    break;
                }
            }
        }
        writer_handle.set_ready_state(ReadyState::Closed);
    });

    // Challenge handshake: the client must echo this nonce before any
    // of its events are dispatched.
    let nonce = uuid::Uuid::new_v4().to_string();
    handle.send_event(RealtimeEvent::new(
        RealtimeEvent::user_channel(&user_id),
        "challenge",
        serde_json::json!({ "nonce": nonce }),
    ));

    // Forwarder task: relay channel -> this client's private channel.
    let forward_handle = handle.clone();
    let user_channel = RealtimeEvent::user_channel(&user_id);
    let mut relay_rx = state.realtime_broadcast.subscribe();
    let forwarder = tokio::spawn(async move {
        loop {
            match relay_rx.recv().await {
                Ok(event) => {
                    if event.channel_id == user_channel && !forward_handle.send_event(event) {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!("[Socket] Relay subscriber lagged, missed {} events", missed);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Reader loop: runs until the client goes away or the transport errors.
    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                handle_client_message(&state, &user_id, &handle, &nonce, text.as_str()).await;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                state.registry.update_last_ping(handle.as_ref());
            }
            Ok(Message::Close(_)) => {
                tracing::debug!("[Socket] Connection {} closed by client", handle.id());
                break;
            }
            Ok(Message::Binary(_)) => {
                tracing::debug!(
                    "[Socket] Ignoring binary frame on connection {}",
                    handle.id()
                );
            }
            Err(e) => {
                tracing::debug!("[Socket] Connection {} transport error: {}", handle.id(), e);
                break;
            }
        }
    }

    handle.set_ready_state(ReadyState::Closed);
    state.registry.unregister(&user_id, handle.as_ref());
    forwarder.abort();
    writer.abort();
    tracing::info!(
        "[Socket] Connection {} for user {} torn down",
        handle.id(),
        user_id
    );
}

/// Handle one text frame from the client
///
/// Distinguishes the challenge response from regular client events;
/// everything unparseable is logged and dropped.
async fn handle_client_message(
    state: &AppState,
    user_id: &str,
    handle: &Arc<WsHandle>,
    nonce: &str,
    text: &str,
) {
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("[Socket] Dropping unparseable frame: {}", e);
            return;
        }
    };

    if value["event"] == "challenge:response" {
        if value["payload"]["nonce"] == nonce {
            state.registry.mark_challenge_verified(handle.as_ref());
            tracing::info!(
                "[Socket] Connection {} challenge verified for user {}",
                handle.id(),
                user_id
            );
        } else {
            tracing::warn!(
                "[Socket] Connection {} sent a bad challenge response",
                handle.id()
            );
        }
        return;
    }

    let event: ClientEvent = match serde_json::from_value(value) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!("[Socket] Dropping malformed client event: {}", e);
            return;
        }
    };

    dispatch_client_event(state, user_id, handle, event).await;
}

/// Dispatch a client event through the authorization policy
///
/// Events from an unverified connection are rejected outright. Write
/// events on pages, drives, and channels get a fresh cache-bypassing
/// permission check; a denial produces an explicit rejection event on
/// the user's private channel, never a silent drop.
pub async fn dispatch_client_event(
    state: &AppState,
    user_id: &str,
    handle: &Arc<WsHandle>,
    event: ClientEvent,
) {
    if !state.registry.is_challenge_verified(handle.as_ref()) {
        tracing::warn!(
            "[Socket] Rejecting event {} from unverified connection {}",
            event.event,
            handle.id()
        );
        broadcast_event(
            &state.realtime_broadcast,
            RealtimeEvent::rejected(user_id, &event.event, "Authentication not completed"),
        );
        return;
    }

    if should_reauthorize(&event.event, event.room_type) {
        let decision = reauthorize_page_access(
            state.permissions.as_ref(),
            user_id,
            &event.resource_id,
            RequiredLevel::Edit,
        )
        .await;

        if !decision.authorized {
            let reason = decision
                .reason
                .unwrap_or_else(|| "Authorization check failed".to_string());
            tracing::warn!(
                "[Authz] Denied event {} for user {} on {}: {}",
                event.event,
                user_id,
                event.resource_id,
                reason
            );
            broadcast_event(
                &state.realtime_broadcast,
                RealtimeEvent::rejected(user_id, &event.event, &reason),
            );
            return;
        }

        tracing::debug!(
            "[Authz] Authorized event {} for user {} on {} (access: {})",
            event.event,
            user_id,
            event.resource_id,
            decision.access_snapshot.as_deref().unwrap_or("-")
        );
    }

    broadcast_event(
        &state.realtime_broadcast,
        RealtimeEvent::new(event.channel_id(), event.event, event.payload),
    );
}
