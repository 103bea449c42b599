/**
 * Permission Service Client
 *
 * This module defines the permission service consumed by the
 * re-authorization path, plus the HTTP-backed implementation talking
 * to the application server.
 *
 * # Result Semantics
 *
 * - `Ok(Some(level))` - the user has an access record for the resource
 * - `Ok(None)` - definitively no access record
 * - `Err(_)` - the lookup could not be performed (transport failure,
 *   unexpected upstream status); callers fail closed on this
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RealtimeError;

/// A user's access record for a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessLevel {
    pub can_view: bool,
    pub can_edit: bool,
    pub can_share: bool,
    pub can_delete: bool,
}

/// Permission lookup service
#[async_trait]
pub trait PermissionService: Send + Sync {
    /// Fetch the user's current access level for a resource
    ///
    /// The re-authorization path always passes `bypass_cache = true`:
    /// a cached decision is exactly what zero-trust re-checking exists
    /// to avoid.
    async fn get_user_access_level(
        &self,
        user_id: &str,
        resource_id: &str,
        bypass_cache: bool,
    ) -> Result<Option<AccessLevel>, RealtimeError>;
}

/// HTTP-backed permission service
///
/// Queries the application server's internal permission endpoint:
/// `GET {base}/api/internal/permissions/{resource}?userId=..&bypassCache=..`
/// A 404 is a definitive "no access record"; any other non-success
/// status or transport failure is a transient error.
pub struct HttpPermissionService {
    base_url: String,
    client: reqwest::Client,
}

impl HttpPermissionService {
    /// Create a client for the permission service at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PermissionService for HttpPermissionService {
    async fn get_user_access_level(
        &self,
        user_id: &str,
        resource_id: &str,
        bypass_cache: bool,
    ) -> Result<Option<AccessLevel>, RealtimeError> {
        let url = format!(
            "{}/api/internal/permissions/{}",
            self.base_url, resource_id
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("userId", user_id),
                ("bypassCache", if bypass_cache { "true" } else { "false" }),
            ])
            .send()
            .await
            .map_err(|e| RealtimeError::upstream(format!("Permission lookup failed: {e}")))?;

        match response.status() {
            reqwest::StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let level = response.json::<AccessLevel>().await.map_err(|e| {
                    RealtimeError::upstream(format!("Malformed permission response: {e}"))
                })?;
                Ok(Some(level))
            }
            status => Err(RealtimeError::upstream(format!(
                "Permission service returned {status}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_level_wire_format() {
        let json = r#"{"canView":true,"canEdit":false,"canShare":false,"canDelete":false}"#;
        let level: AccessLevel = serde_json::from_str(json).unwrap();
        assert!(level.can_view);
        assert!(!level.can_edit);

        let back = serde_json::to_string(&level).unwrap();
        assert!(back.contains("\"canEdit\":false"));
    }
}
