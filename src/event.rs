/**
 * Realtime Event Types
 *
 * This module defines the event types flowing through the gateway:
 * the wire-level `RealtimeEvent` relayed to subscribers, the
 * `ClientEvent` received from WebSocket clients, and the `RoomType`
 * classification the authorization policy keys off.
 *
 * # Wire Format
 *
 * Events use camelCase field names to match the application servers
 * on the other side of the broadcast endpoint:
 *
 * ```json
 * {"channelId":"page:42","event":"document:update","payload":{...},"timestamp":"..."}
 * ```
 */

use serde::{Deserialize, Serialize};

/// Type of room a realtime event is addressed to
///
/// The authorization policy treats `Activity` rooms (append-only audit
/// streams, inherently read-only) and `Notification` rooms (per-user
/// private rooms where membership already implies ownership) as exempt
/// from per-event re-authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    /// A page or document room
    Page,
    /// A drive (file storage) room
    Drive,
    /// A chat channel room
    Channel,
    /// An append-only activity/audit room
    Activity,
    /// A per-user notification room
    Notification,
}

impl RoomType {
    /// Stable string form used in channel identifiers
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Drive => "drive",
            Self::Channel => "channel",
            Self::Activity => "activity",
            Self::Notification => "notification",
        }
    }
}

/// Realtime event relayed to subscribers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeEvent {
    /// Channel the event is addressed to (e.g. `page:42`, `user:abc`)
    pub channel_id: String,
    /// Event name (e.g. `document:update`)
    pub event: String,
    /// Event payload (JSON-serializable data)
    pub payload: serde_json::Value,
    /// RFC3339 timestamp set when the event entered the gateway
    pub timestamp: String,
}

impl RealtimeEvent {
    /// Create a new realtime event stamped with the current time
    pub fn new(
        channel_id: impl Into<String>,
        event: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            event: event.into(),
            payload,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create the rejection event sent back to a client whose sensitive
    /// event was denied
    ///
    /// A denied write must produce an explicit rejection, not a silent
    /// drop, so the client UI can tell the user their action did not
    /// apply.
    pub fn rejected(user_id: &str, event: &str, reason: &str) -> Self {
        Self::new(
            format!("user:{user_id}"),
            "event:rejected",
            serde_json::json!({
                "event": event,
                "reason": reason,
            }),
        )
    }

    /// Channel identifier for a user's private notification room
    pub fn user_channel(user_id: &str) -> String {
        format!("user:{user_id}")
    }
}

/// Event received from a WebSocket client
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientEvent {
    /// Event name
    pub event: String,
    /// Type of room the event targets
    pub room_type: RoomType,
    /// Identifier of the targeted resource (page id, drive id, ...)
    pub resource_id: String,
    /// Event payload
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl ClientEvent {
    /// Channel identifier the event fans out on once accepted
    pub fn channel_id(&self) -> String {
        format!("{}:{}", self.room_type.as_str(), self.resource_id)
    }
}
