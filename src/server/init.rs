/**
 * Server Initialization
 *
 * This module wires the gateway together: signer, registry, services,
 * sweeper, and router.
 *
 * # Initialization Steps
 *
 * 1. Build the broadcast signer from the configured secret (fatal on a
 *    missing or weak secret)
 * 2. Create the connection registry and relay channel
 * 3. Construct the session and permission services
 * 4. Create the sweeper and start its cleanup interval
 * 5. Assemble the router
 *
 * # Error Handling
 *
 * Unlike most services, configuration problems here are fatal: a
 * gateway that cannot sign broadcasts or validate sessions must not
 * accept connections at all.
 */

use std::sync::Arc;

use axum::Router;
use tokio::sync::broadcast;

use crate::auth::{JwtSessionService, SessionService};
use crate::authz::{HttpPermissionService, PermissionService};
use crate::broadcast::signature::BroadcastSigner;
use crate::config::RealtimeConfig;
use crate::error::RealtimeError;
use crate::event::RealtimeEvent;
use crate::registry::ConnectionRegistry;
use crate::routes::create_router;
use crate::server::state::AppState;
use crate::sweeper::ConnectionSweeper;

/// Relay channel capacity
///
/// Sized for bursty fan-out; a subscriber that lags behind this many
/// events starts missing them (and logs that it did).
const BROADCAST_CAPACITY: usize = 1000;

/// Create and configure the gateway application
///
/// # Errors
///
/// Returns a configuration error when the broadcast secret is missing
/// or too short.
pub async fn create_app(config: RealtimeConfig) -> Result<Router, RealtimeError> {
    tracing::info!("Initializing PageSpace realtime gateway");

    let signer = Arc::new(BroadcastSigner::new(&config.broadcast_secret)?);
    let registry = Arc::new(ConnectionRegistry::new());
    let (realtime_broadcast, _) = broadcast::channel::<RealtimeEvent>(BROADCAST_CAPACITY);

    let sessions: Arc<dyn SessionService> =
        Arc::new(JwtSessionService::new(config.jwt_secret.clone()));
    let permissions: Arc<dyn PermissionService> = Arc::new(HttpPermissionService::new(
        config.permission_service_url.clone(),
    ));

    let sweeper = Arc::new(ConnectionSweeper::new(
        Arc::clone(&registry),
        Arc::clone(&sessions),
        config.cleanup_interval,
        config.revalidation_window,
    ));
    sweeper.start_cleanup_interval();

    let state = AppState {
        registry,
        signer,
        sessions,
        permissions,
        realtime_broadcast,
        sweeper,
    };

    tracing::info!("Gateway state initialized, router configured");
    Ok(create_router(state))
}
