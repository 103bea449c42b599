//! Common test utilities and helpers
//!
//! Shared across the integration test targets: scripted service
//! implementations, an `AppState` builder, and a signed-request helper
//! for the broadcast endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use pagespace_realtime::auth::{SessionClaims, SessionService};
use pagespace_realtime::authz::{AccessLevel, PermissionService};
use pagespace_realtime::broadcast::signature::{format_header, BroadcastSigner};
use pagespace_realtime::broadcast::RealtimeEventBroadcast;
use pagespace_realtime::error::RealtimeError;
use pagespace_realtime::registry::ConnectionRegistry;
use pagespace_realtime::server::AppState;
use pagespace_realtime::sweeper::ConnectionSweeper;

/// Secret long enough to satisfy the signer's minimum length
pub const TEST_SECRET: &str = "test-broadcast-secret-0123456789abcdef";

/// Session service that accepts every token as the same user
pub struct AlwaysValidSessions {
    pub user_id: String,
}

#[async_trait]
impl SessionService for AlwaysValidSessions {
    async fn validate_session(
        &self,
        _token: &str,
    ) -> Result<Option<SessionClaims>, RealtimeError> {
        Ok(Some(SessionClaims {
            sub: self.user_id.clone(),
            email: format!("{}@example.com", self.user_id),
            sid: None,
            exp: u64::MAX,
            iat: 0,
        }))
    }
}

/// Permission service scripted with a fixed response
pub struct FixedPermissions {
    pub response: Option<AccessLevel>,
}

#[async_trait]
impl PermissionService for FixedPermissions {
    async fn get_user_access_level(
        &self,
        _user_id: &str,
        _resource_id: &str,
        _bypass_cache: bool,
    ) -> Result<Option<AccessLevel>, RealtimeError> {
        Ok(self.response)
    }
}

/// Build an `AppState` with scripted services and a quiet sweeper
///
/// The sweeper is constructed but its interval is never started, so
/// tests control exactly when sweeps happen.
pub fn test_state() -> AppState {
    let registry = Arc::new(ConnectionRegistry::new());
    let sessions: Arc<dyn SessionService> = Arc::new(AlwaysValidSessions {
        user_id: "test-user".to_string(),
    });
    let permissions: Arc<dyn PermissionService> = Arc::new(FixedPermissions {
        response: Some(AccessLevel {
            can_view: true,
            can_edit: true,
            can_share: false,
            can_delete: false,
        }),
    });
    let (realtime_broadcast, _) = tokio::sync::broadcast::channel(64);
    let sweeper = Arc::new(ConnectionSweeper::new(
        Arc::clone(&registry),
        Arc::clone(&sessions),
        Duration::from_secs(3600),
        Duration::from_secs(300),
    ));

    AppState {
        registry,
        signer: Arc::new(BroadcastSigner::new(TEST_SECRET).expect("test secret is long enough")),
        sessions,
        permissions,
        realtime_broadcast,
        sweeper,
    }
}

/// Sign a broadcast body with the test secret
pub fn sign_body(body: &str) -> String {
    let signer = BroadcastSigner::new(TEST_SECRET).expect("test secret is long enough");
    let signature = signer.sign(body);
    format_header(signature.timestamp, &signature.signature)
}

/// Subscribe to the relay channel of a state
pub fn subscribe(state: &AppState) -> tokio::sync::broadcast::Receiver<
    pagespace_realtime::RealtimeEvent,
> {
    let tx: &RealtimeEventBroadcast = &state.realtime_broadcast;
    tx.subscribe()
}
