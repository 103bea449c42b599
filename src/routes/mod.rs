//! Route Configuration
//!
//! Assembles the gateway's HTTP surface:
//!
//! - `GET /ws` - WebSocket upgrade for realtime clients
//! - `POST /internal/broadcast` - signed peer-server broadcasts
//! - `GET /internal/stats` - connection registry statistics
//! - `GET /health` - liveness probe

/// Router assembly
pub mod router;

pub use router::create_router;
