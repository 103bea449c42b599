//! Session Validation
//!
//! This module defines the session service consumed by the WebSocket
//! handshake and the revalidation sweeper, plus the JWT-backed
//! implementation used in production.
//!
//! # Result Semantics
//!
//! `validate_session` distinguishes two failure shapes and callers
//! depend on the distinction:
//!
//! - `Ok(None)` - definitive denial: the token is invalid, expired, or
//!   revoked. The sweeper closes the connection on this result.
//! - `Err(_)` - transient failure: the check could not be performed.
//!   The sweeper leaves the connection alone and retries next sweep.

/// JWT claims and session service
pub mod sessions;

pub use sessions::{JwtSessionService, SessionClaims, SessionService};
