/**
 * Per-Event Re-Authorization
 *
 * This module performs the fresh, cache-bypassing permission check for
 * sensitive events. Every sensitive event produces a new decision; no
 * state survives between events.
 *
 * # State Machine (per sensitive event)
 *
 * ```text
 * EVENT_RECEIVED -> SENSITIVITY_CHECK
 *   not sensitive -> PROCESS
 *   sensitive     -> REAUTH_CHECK
 *     denied  -> REJECT (log warn)
 *     allowed -> PROCESS (log debug)
 * ```
 */

use std::fmt;

use crate::authz::permissions::{AccessLevel, PermissionService};

/// Capability required by a sensitive event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredLevel {
    /// Requires `canView`
    View,
    /// Requires `canEdit` (the default for write events)
    Edit,
}

impl fmt::Display for RequiredLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::View => write!(f, "view"),
            Self::Edit => write!(f, "edit"),
        }
    }
}

/// Outcome of a re-authorization check
///
/// Computed fresh for every sensitive event; never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationDecision {
    /// Whether the event may proceed
    pub authorized: bool,
    /// Denial reason, present only when `authorized` is false
    pub reason: Option<String>,
    /// Serialized access level for audit logging, present only when
    /// authorized
    pub access_snapshot: Option<String>,
}

impl AuthorizationDecision {
    fn denied(reason: impl Into<String>) -> Self {
        Self {
            authorized: false,
            reason: Some(reason.into()),
            access_snapshot: None,
        }
    }

    fn allowed(level: &AccessLevel) -> Self {
        Self {
            authorized: true,
            reason: None,
            access_snapshot: serde_json::to_string(level).ok(),
        }
    }
}

/// Re-check a user's access to a page at action time
///
/// Calls the permission service with `bypass_cache = true`; a cached
/// decision would defeat the purpose of this check, which is to close
/// the window between permission revocation and socket eviction.
///
/// # Failure Semantics
///
/// Fails closed: a permission-service error becomes a denial with
/// reason "Authorization check failed". This function never panics and
/// never returns an error to the dispatcher.
pub async fn reauthorize_page_access(
    permissions: &dyn PermissionService,
    user_id: &str,
    page_id: &str,
    required: RequiredLevel,
) -> AuthorizationDecision {
    let lookup = permissions
        .get_user_access_level(user_id, page_id, true)
        .await;

    match lookup {
        Err(e) => {
            tracing::warn!(
                "[Authz] Permission lookup failed for user {} on page {}: {}",
                user_id,
                page_id,
                e
            );
            AuthorizationDecision::denied("Authorization check failed")
        }
        Ok(None) => AuthorizationDecision::denied("No access to this page"),
        Ok(Some(level)) => {
            let has_capability = match required {
                RequiredLevel::View => level.can_view,
                RequiredLevel::Edit => level.can_edit,
            };
            if has_capability {
                AuthorizationDecision::allowed(&level)
            } else {
                AuthorizationDecision::denied(format!("Requires {required} permission"))
            }
        }
    }
}
