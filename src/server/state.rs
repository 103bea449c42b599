/**
 * Application State
 *
 * This module defines the state container shared by all gateway
 * handlers, and the `FromRef` implementations that let Axum handlers
 * extract just the part of the state they need.
 *
 * # Thread Safety
 *
 * Every field is cheap to clone and safe to share: `Arc`s over the
 * registry, signer, sweeper, and service trait objects, and a
 * `broadcast::Sender` for the relay channel.
 */

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::SessionService;
use crate::authz::PermissionService;
use crate::broadcast::relay::RealtimeEventBroadcast;
use crate::broadcast::signature::BroadcastSigner;
use crate::registry::ConnectionRegistry;
use crate::sweeper::ConnectionSweeper;

/// Central state container for the gateway
#[derive(Clone)]
pub struct AppState {
    /// The authoritative connection registry
    pub registry: Arc<ConnectionRegistry>,

    /// Signer/verifier for server-to-server broadcasts
    pub signer: Arc<BroadcastSigner>,

    /// Session validation service (WebSocket handshake, sweeper)
    pub sessions: Arc<dyn SessionService>,

    /// Permission lookup service (per-event re-authorization)
    pub permissions: Arc<dyn PermissionService>,

    /// Relay channel fanning accepted events out to subscribers
    pub realtime_broadcast: RealtimeEventBroadcast,

    /// Health and revalidation sweeper
    pub sweeper: Arc<ConnectionSweeper>,
}

/// Extract the connection registry directly from `AppState`
impl FromRef<AppState> for Arc<ConnectionRegistry> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.registry.clone()
    }
}

/// Extract the relay channel directly from `AppState`
impl FromRef<AppState> for RealtimeEventBroadcast {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.realtime_broadcast.clone()
    }
}
