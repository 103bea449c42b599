//! Per-Event Authorization
//!
//! This module decides, for every inbound realtime event, whether the
//! event is a write (sensitive) and, if so, performs a synchronous,
//! cache-bypassing permission check before the event is processed.
//!
//! # Zero-Trust Design
//!
//! Room membership is granted once at subscribe time; permissions can
//! be revoked at any moment afterwards. Re-checking at action time
//! closes the window between permission revocation and socket
//! eviction. Decisions are computed fresh for every sensitive event
//! and never cached or reused.
//!
//! # Failure Semantics
//!
//! Authorization fails **closed**: any error reaching the permission
//! service boundary becomes a denial. These functions never panic and
//! never let errors escape to the socket dispatcher.

/// Event sensitivity classification
pub mod policy;

/// Permission service client
pub mod permissions;

/// Per-event re-authorization
pub mod reauthorize;

pub use permissions::{AccessLevel, HttpPermissionService, PermissionService};
pub use policy::{is_sensitive_event, should_reauthorize};
pub use reauthorize::{reauthorize_page_access, AuthorizationDecision, RequiredLevel};
