/**
 * Health & Revalidation Sweeper
 *
 * This module runs on a fixed interval, evicts unhealthy sockets, and
 * periodically forces a fresh session check on long-lived connections
 * without doing so on every tick.
 *
 * # Failure Semantics
 *
 * Health failures and definitive session revocations fail closed (the
 * socket is closed and evicted). A transient error from the session
 * service fails open: the connection is left untouched and retried on
 * a later sweep. Unifying these two policies would either mass-
 * disconnect users on a flaky dependency or leave revoked sessions
 * connected; the asymmetry is intentional.
 *
 * # Concurrency
 *
 * All revalidation calls within one sweep run concurrently, so one
 * slow session lookup cannot stall eviction decisions for other
 * connections. One connection's failure never aborts the sweep.
 */

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::auth::SessionService;
use crate::registry::{
    ConnectionRecord, ConnectionRegistry, ReadyState, SocketHandle, CLOSE_SESSION_REVOKED,
    CLOSE_UNHEALTHY, REASON_SESSION_REVOKED,
};

/// Outcome of a health check on one connection
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionHealth {
    /// Whether the connection passes all health criteria
    pub is_healthy: bool,
    /// Failure reason, present only when unhealthy
    pub reason: Option<String>,
    /// Transport ready state observed during the check
    pub ready_state: ReadyState,
}

/// Periodic connection health and session revalidation task
pub struct ConnectionSweeper {
    registry: Arc<ConnectionRegistry>,
    sessions: Arc<dyn SessionService>,
    interval: Duration,
    revalidation_window: chrono::Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionSweeper {
    /// Create a sweeper over the given registry and session service
    ///
    /// # Arguments
    /// * `interval` - time between sweeps once started
    /// * `revalidation_window` - minimum time between session
    ///   revalidations for any one connection
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        sessions: Arc<dyn SessionService>,
        interval: Duration,
        revalidation_window: Duration,
    ) -> Self {
        Self {
            registry,
            sessions,
            interval,
            revalidation_window: chrono::Duration::seconds(revalidation_window.as_secs() as i64),
            task: Mutex::new(None),
        }
    }

    /// Check one connection against all health criteria
    ///
    /// Healthy only when registered, challenge-verified, and open.
    /// Each failure cause produces its own reason string so operators
    /// can tell them apart in logs.
    pub fn check_connection_health(&self, socket: &dyn SocketHandle) -> ConnectionHealth {
        let ready_state = socket.ready_state();

        let Some(record) = self.registry.get_connection_metadata(socket) else {
            return ConnectionHealth {
                is_healthy: false,
                reason: Some("Connection not registered".to_string()),
                ready_state,
            };
        };

        if !record.challenge_verified {
            return ConnectionHealth {
                is_healthy: false,
                reason: Some("Authentication not completed".to_string()),
                ready_state,
            };
        }

        if ready_state != ReadyState::Open {
            return ConnectionHealth {
                is_healthy: false,
                reason: Some(format!("Connection not open (state: {ready_state})")),
                ready_state,
            };
        }

        ConnectionHealth {
            is_healthy: true,
            reason: None,
            ready_state,
        }
    }

    /// Start the periodic cleanup task
    ///
    /// Singleton: calling start while already running is a no-op.
    pub fn start_cleanup_interval(self: &Arc<Self>) {
        let mut guard = self.task.lock().unwrap();
        if guard.is_some() {
            tracing::debug!("[Sweeper] Cleanup interval already running");
            return;
        }

        let sweeper = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweeper.interval);
            // The first tick fires immediately; skip it so a start/stop
            // pair doesn't imply a sweep.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                sweeper.trigger_cleanup().await;
            }
        });
        *guard = Some(handle);
        tracing::info!(
            "[Sweeper] Cleanup interval started (every {:?})",
            self.interval
        );
    }

    /// Stop the periodic cleanup task
    ///
    /// No-op if not running.
    pub fn stop_cleanup_interval(&self) {
        let mut guard = self.task.lock().unwrap();
        if let Some(handle) = guard.take() {
            handle.abort();
            tracing::info!("[Sweeper] Cleanup interval stopped");
        }
    }

    /// Run one sweep: health-check every connection, then revalidate
    /// the sessions that are due
    pub async fn trigger_cleanup(&self) {
        let records = self.registry.snapshot();
        let now = Utc::now();
        let mut revalidations = Vec::new();

        for record in records {
            let health = self.check_connection_health(record.socket.as_ref());
            if !health.is_healthy {
                let reason = health.reason.as_deref().unwrap_or("Connection unhealthy");
                tracing::warn!(
                    "[Sweeper] Evicting connection {} for user {}: {}",
                    record.socket.id(),
                    record.user_id,
                    reason
                );
                record.socket.close(CLOSE_UNHEALTHY, reason);
                self.registry.unregister(&record.user_id, record.socket.as_ref());
                continue;
            }

            if record.ws_token.is_none() {
                continue;
            }
            let due = record
                .last_revalidated_at
                .map(|at| now - at >= self.revalidation_window)
                .unwrap_or(true);
            if due {
                revalidations.push(self.revalidate(record));
            }
        }

        if !revalidations.is_empty() {
            tracing::debug!(
                "[Sweeper] Revalidating {} session(s) concurrently",
                revalidations.len()
            );
            futures_util::future::join_all(revalidations).await;
        }
    }

    /// Revalidate one connection's session
    async fn revalidate(&self, record: ConnectionRecord) {
        // Presence checked by the caller.
        let Some(token) = record.ws_token.as_deref() else {
            return;
        };

        match self.sessions.validate_session(token).await {
            Ok(Some(_claims)) => {
                self.registry.mark_revalidated(record.socket.id());
                tracing::debug!(
                    "[Sweeper] Session revalidated for user {}",
                    record.user_id
                );
            }
            Ok(None) => {
                tracing::warn!(
                    "[Sweeper] Session revoked for user {}; closing connection {}",
                    record.user_id,
                    record.socket.id()
                );
                record
                    .socket
                    .close(CLOSE_SESSION_REVOKED, REASON_SESSION_REVOKED);
                self.registry.unregister(&record.user_id, record.socket.as_ref());
            }
            Err(e) => {
                // Transient failure: leave the connection alone and
                // retry next sweep rather than mass-disconnecting on a
                // flaky dependency.
                tracing::warn!(
                    "[Sweeper] Revalidation for user {} failed transiently, skipping: {}",
                    record.user_id,
                    e
                );
            }
        }
    }
}
