/**
 * Connection Registry
 *
 * This module maintains the authoritative in-memory mapping from user
 * identity to the single live socket connection, plus per-connection
 * metadata, safely under concurrent register/unregister/query
 * operations.
 *
 * # Invariant
 *
 * At most one connection record exists per user at any time. When a
 * new connection registers for a user that already has one, the old
 * handle is closed with a distinguishing code and the entry is
 * replaced - never leaving two live records for one user, and never
 * letting a stale teardown of the old handle evict a newer record.
 *
 * # Handle Identity
 *
 * Handle identity (not user identity) is the sole authority for "is
 * this still the current connection": during a reconnect race the old
 * connection's close handler may fire after the new connection has
 * already replaced it, and the identity comparison in `unregister` is
 * what keeps that teardown from evicting the newer socket.
 *
 * # Thread Safety
 *
 * Both maps (user -> handle, handle -> metadata) live behind one
 * mutex. No await happens while the lock is held; `close` on a handle
 * is a non-blocking command send.
 */

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Process-unique connection identifier
///
/// Assigned by the transport when a handle is created; two handles
/// never share an ID, which makes ID equality the identity comparison.
pub type ConnectionId = u64;

/// Close code for a connection displaced by a newer one for the same user
pub const CLOSE_SUPERSEDED: u16 = 4000;
/// Close code for a connection whose session was revoked
pub const CLOSE_SESSION_REVOKED: u16 = 4001;
/// Close code for a connection evicted by the health sweeper
pub const CLOSE_UNHEALTHY: u16 = 4002;

/// Close reason sent to a displaced connection
pub const REASON_SUPERSEDED: &str = "New connection established";
/// Close reason sent when a session is revoked
///
/// Clients match on this string to trigger re-authentication instead
/// of a plain reconnect.
pub const REASON_SESSION_REVOKED: &str = "Session revoked";

/// Transport-level ready state of a socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadyState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "CONNECTING"),
            Self::Open => write!(f, "OPEN"),
            Self::Closing => write!(f, "CLOSING"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Non-owning handle to a live socket
///
/// The transport layer owns the socket's lifecycle; the registry only
/// holds handles for lookup, close commands, and state inspection.
pub trait SocketHandle: Send + Sync + fmt::Debug {
    /// Process-unique identity of this handle
    fn id(&self) -> ConnectionId;

    /// Current transport ready state
    fn ready_state(&self) -> ReadyState;

    /// Request the transport close this socket
    ///
    /// Must never panic: a close racing an already-dead transport is a
    /// no-op, not an error.
    fn close(&self, code: u16, reason: &str);
}

/// Per-connection metadata record
#[derive(Debug, Clone)]
pub struct ConnectionRecord {
    /// User this connection belongs to
    pub user_id: String,
    /// The live transport handle (non-owning)
    pub socket: Arc<dyn SocketHandle>,
    /// Opaque client/device fingerprint captured at connect time
    pub fingerprint: Option<String>,
    /// Reference to an external session record
    pub session_id: Option<String>,
    /// Session token used for throttled revalidation; connections
    /// without one skip revalidation entirely
    pub ws_token: Option<String>,
    /// Set at registration; immutable
    pub connected_at: DateTime<Utc>,
    /// Updated on keep-alive signals; advances monotonically
    pub last_ping: Option<DateTime<Utc>>,
    /// Starts false, set true exactly once by a successful challenge
    pub challenge_verified: bool,
    /// Last successful session revalidation; throttles repeat checks
    pub last_revalidated_at: Option<DateTime<Utc>>,
}

/// Registry size and age summary
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStats {
    /// Number of user-keyed entries
    pub total_connections: usize,
    /// Number of handle-keyed metadata entries
    ///
    /// May transiently exceed `total_connections` while a displaced
    /// connection's teardown is still pending; a sweep reconciles them.
    pub metadata_entries: usize,
    /// Earliest `connected_at` across metadata entries, if any
    pub oldest_connection: Option<DateTime<Utc>>,
    /// Latest `connected_at` across metadata entries, if any
    pub newest_connection: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct RegistryInner {
    users: HashMap<String, Arc<dyn SocketHandle>>,
    metadata: HashMap<ConnectionId, ConnectionRecord>,
}

/// The authoritative connection registry
///
/// Constructed once per process and shared by reference with the
/// socket dispatcher and the sweeper. There is deliberately no global
/// instance.
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: Mutex<RegistryInner>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for a user, displacing any existing one
    ///
    /// If the user already has a registered handle and its transport is
    /// still open, that handle is closed with [`CLOSE_SUPERSEDED`] /
    /// [`REASON_SUPERSEDED`] before the new record is installed, so a
    /// concurrent lookup never observes "no connection" mid-reconnect.
    /// The displaced handle's metadata stays until its own teardown
    /// calls [`unregister`](Self::unregister).
    pub fn register(
        &self,
        user_id: &str,
        socket: Arc<dyn SocketHandle>,
        fingerprint: Option<String>,
        session_id: Option<String>,
        ws_token: Option<String>,
    ) {
        let mut inner = self.inner.lock().unwrap();

        if let Some(old) = inner.users.get(user_id) {
            if old.ready_state() == ReadyState::Open {
                tracing::info!(
                    "[Registry] Displacing existing connection {} for user {}",
                    old.id(),
                    user_id
                );
                old.close(CLOSE_SUPERSEDED, REASON_SUPERSEDED);
            }
        }

        let record = ConnectionRecord {
            user_id: user_id.to_string(),
            socket: Arc::clone(&socket),
            fingerprint,
            session_id,
            ws_token,
            connected_at: Utc::now(),
            last_ping: None,
            challenge_verified: false,
            last_revalidated_at: None,
        };

        inner.metadata.insert(socket.id(), record);
        inner.users.insert(user_id.to_string(), socket);
    }

    /// Unregister a connection
    ///
    /// The user-level pointer is removed only if the currently
    /// registered handle is the same handle as `socket` - this guards
    /// the race where an old connection's teardown fires after a newer
    /// connection replaced it. The handle-keyed metadata for `socket`
    /// is always removed.
    pub fn unregister(&self, user_id: &str, socket: &dyn SocketHandle) {
        let mut inner = self.inner.lock().unwrap();

        let is_current = inner
            .users
            .get(user_id)
            .is_some_and(|current| current.id() == socket.id());
        if is_current {
            inner.users.remove(user_id);
            tracing::debug!(
                "[Registry] Unregistered connection {} for user {}",
                socket.id(),
                user_id
            );
        } else {
            tracing::debug!(
                "[Registry] Stale unregister for user {} (handle {}); keeping current entry",
                user_id,
                socket.id()
            );
        }

        inner.metadata.remove(&socket.id());
    }

    /// Look up a user's live socket handle
    pub fn get_connection(&self, user_id: &str) -> Option<Arc<dyn SocketHandle>> {
        self.inner.lock().unwrap().users.get(user_id).cloned()
    }

    /// Record a keep-alive signal for a handle
    ///
    /// No-op if the handle has no metadata entry.
    pub fn update_last_ping(&self, socket: &dyn SocketHandle) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(record) = inner.metadata.get_mut(&socket.id()) {
            record.last_ping = Some(Utc::now());
        }
    }

    /// Mark a handle's challenge as verified
    ///
    /// Verification is monotonic: once true it remains true for the
    /// life of the connection.
    pub fn mark_challenge_verified(&self, socket: &dyn SocketHandle) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(record) = inner.metadata.get_mut(&socket.id()) {
            record.challenge_verified = true;
        }
    }

    /// Whether a handle has completed challenge verification
    pub fn is_challenge_verified(&self, socket: &dyn SocketHandle) -> bool {
        self.inner
            .lock()
            .unwrap()
            .metadata
            .get(&socket.id())
            .is_some_and(|record| record.challenge_verified)
    }

    /// Stamp a successful session revalidation for a handle
    pub fn mark_revalidated(&self, connection_id: ConnectionId) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(record) = inner.metadata.get_mut(&connection_id) {
            record.last_revalidated_at = Some(Utc::now());
        }
    }

    /// Fetch the metadata record for a handle
    pub fn get_connection_metadata(&self, socket: &dyn SocketHandle) -> Option<ConnectionRecord> {
        self.inner
            .lock()
            .unwrap()
            .metadata
            .get(&socket.id())
            .cloned()
    }

    /// Snapshot all metadata records (used by the sweeper)
    pub fn snapshot(&self) -> Vec<ConnectionRecord> {
        self.inner
            .lock()
            .unwrap()
            .metadata
            .values()
            .cloned()
            .collect()
    }

    /// Summarize registry size and connection ages
    pub fn get_connection_stats(&self) -> ConnectionStats {
        let inner = self.inner.lock().unwrap();
        let connected: Vec<DateTime<Utc>> = inner
            .metadata
            .values()
            .map(|record| record.connected_at)
            .collect();

        ConnectionStats {
            total_connections: inner.users.len(),
            metadata_entries: inner.metadata.len(),
            oldest_connection: connected.iter().min().copied(),
            newest_connection: connected.iter().max().copied(),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;
    use std::sync::Mutex;

    /// Scriptable in-memory socket handle for registry/sweeper tests
    #[derive(Debug)]
    pub struct FakeSocket {
        id: ConnectionId,
        state: Mutex<ReadyState>,
        closes: Mutex<Vec<(u16, String)>>,
    }

    impl FakeSocket {
        pub fn new(id: ConnectionId) -> Arc<Self> {
            Arc::new(Self {
                id,
                state: Mutex::new(ReadyState::Open),
                closes: Mutex::new(Vec::new()),
            })
        }

        pub fn with_state(id: ConnectionId, state: ReadyState) -> Arc<Self> {
            let socket = Self::new(id);
            *socket.state.lock().unwrap() = state;
            socket
        }

        pub fn set_ready_state(&self, state: ReadyState) {
            *self.state.lock().unwrap() = state;
        }

        /// Close calls recorded as (code, reason) pairs
        pub fn closes(&self) -> Vec<(u16, String)> {
            self.closes.lock().unwrap().clone()
        }
    }

    impl SocketHandle for FakeSocket {
        fn id(&self) -> ConnectionId {
            self.id
        }

        fn ready_state(&self) -> ReadyState {
            *self.state.lock().unwrap()
        }

        fn close(&self, code: u16, reason: &str) {
            self.closes
                .lock()
                .unwrap()
                .push((code, reason.to_string()));
            *self.state.lock().unwrap() = ReadyState::Closed;
        }
    }
}
