/**
 * Router Configuration
 *
 * This module provides the main router creation function that combines
 * all route configurations into a single Axum router.
 *
 * # Route Groups
 *
 * 1. Client routes: WebSocket upgrade
 * 2. Internal routes: signed broadcasts and registry statistics,
 *    expected to be reachable only from peer servers
 * 3. Health probe
 */

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::broadcast::handler::handle_broadcast;
use crate::registry::ConnectionStats;
use crate::server::state::AppState;
use crate::socket::handle_socket_upgrade;

/// Create the Axum router with all routes configured
///
/// # Arguments
///
/// * `app_state` - Application state containing the registry and services
///
/// # Returns
///
/// Configured Axum Router ready to serve requests
///
/// # Route Details
///
/// - `GET /ws` - WebSocket upgrade for realtime clients
/// - `POST /internal/broadcast` - signed server-to-server broadcasts
/// - `GET /internal/stats` - connection registry statistics
/// - `GET /health` - liveness probe
pub fn create_router(app_state: AppState) -> Router<()> {
    Router::new()
        .route("/ws", get(handle_socket_upgrade))
        .route("/internal/broadcast", post(handle_broadcast))
        .route("/internal/stats", get(handle_stats))
        .route("/health", get(|| async { "OK" }))
        .with_state(app_state)
}

/// Return registry statistics (GET /internal/stats)
async fn handle_stats(State(state): State<AppState>) -> Json<ConnectionStats> {
    Json(state.registry.get_connection_stats())
}
