//! PageSpace Realtime Gateway
//!
//! This library implements the realtime gateway for PageSpace: the server
//! process that owns WebSocket connection lifecycles, re-authorizes every
//! sensitive realtime event against current permissions, and relays signed
//! server-to-server broadcasts between application instances.
//!
//! # Overview
//!
//! The gateway provides:
//! - Per-event zero-trust authorization (cache-bypassing permission checks)
//! - A connection registry enforcing at-most-one live socket per user
//! - A health and session-revalidation sweeper for long-lived sockets
//! - HMAC-signed, replay-resistant broadcast authentication
//!
//! # Module Structure
//!
//! ```text
//! src/
//! ├── auth/       - Session claims and validation (JWT)
//! ├── authz/      - Event sensitivity policy and re-authorization
//! ├── broadcast/  - Signature codec, relay channel, broadcast endpoint
//! ├── registry/   - Connection registry and socket handle abstraction
//! ├── sweeper/    - Health checks and throttled session revalidation
//! ├── socket/     - WebSocket upgrade, handshake, event dispatch
//! ├── server/     - Application state and initialization
//! ├── routes/     - HTTP route configuration
//! ├── config.rs   - Environment-driven configuration
//! ├── error/      - Gateway error types
//! └── event.rs    - Realtime event and room types
//! ```
//!
//! # Thread Safety
//!
//! All shared state is designed for the multi-threaded tokio runtime:
//! the connection registry guards its maps with a mutex, and handle
//! identity (not user identity) is the sole authority for deciding
//! whether a teardown may evict a registry entry.
//!
//! # Error Handling
//!
//! Authorization failures are expected outcomes represented as typed
//! results, never panics: permission denials fail closed, while
//! transient errors during session revalidation fail open (the
//! connection is left alone and retried next sweep). This asymmetry is
//! deliberate and load-bearing.

/// Session claims and validation
pub mod auth;

/// Per-event authorization policy
pub mod authz;

/// Broadcast signing, relay, and endpoint
pub mod broadcast;

/// Environment-driven configuration
pub mod config;

/// Gateway error types
pub mod error;

/// Realtime event and room types
pub mod event;

/// Connection registry
pub mod registry;

/// HTTP route configuration
pub mod routes;

/// Server state and initialization
pub mod server;

/// WebSocket connection lifecycle
pub mod socket;

/// Health and revalidation sweeper
pub mod sweeper;

pub use config::RealtimeConfig;
pub use error::RealtimeError;
pub use event::{RealtimeEvent, RoomType};
pub use registry::ConnectionRegistry;
pub use server::state::AppState;
