//! Gateway Error Types
//!
//! This module defines error types for the realtime gateway.
//!
//! # Error Categories
//!
//! - **Configuration errors** - missing or weak secrets, unparseable
//!   settings. Fatal at startup; never recoverable at call time.
//! - **Handler errors** - invalid requests reaching the HTTP surface.
//! - **Session errors** - transient failures of the session service.
//! - **Upstream errors** - transport failures of the permission service.
//!
//! Authorization *denials* are not errors: they are expected outcomes
//! represented as typed values (`AuthorizationDecision`, boolean `false`
//! from signature verification) and never travel through this enum.
//!
//! Errors implement `IntoResponse`, so handlers can return them
//! directly and get the mapped status with a JSON error body.

/// Error conversion implementations (IntoResponse)
pub mod conversion;

/// Error type definitions
pub mod types;

pub use types::RealtimeError;
