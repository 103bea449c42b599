//! Server-to-Server Broadcast
//!
//! This module covers the path events take between gateway instances:
//! signing and verifying the `X-Broadcast-Signature` header, the
//! in-process relay channel, and the HTTP endpoint that accepts signed
//! broadcasts from peer servers.
//!
//! # Wire Format
//!
//! ```text
//! POST /internal/broadcast
//! X-Broadcast-Signature: t=<unix-seconds>,v1=<hex-hmac-sha256>
//!
//! {"channelId":"page:42","event":"document:update","payload":{...}}
//! ```
//!
//! The signature covers the raw request body; the 5-minute freshness
//! window doubles as replay protection.

/// Broadcast endpoint handler
pub mod handler;

/// In-process relay channel
pub mod relay;

/// HMAC signature codec
pub mod signature;

pub use handler::{handle_broadcast, BroadcastRequest};
pub use relay::{broadcast_event, RealtimeEventBroadcast};
pub use signature::{BroadcastSignature, BroadcastSigner, SIGNATURE_HEADER};
