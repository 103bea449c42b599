/**
 * Event Sensitivity Policy
 *
 * This module classifies realtime event names as sensitive (write-like,
 * requiring a fresh permission check) or not, and decides per room type
 * whether re-authorization applies at all.
 *
 * # Closed Allow-List
 *
 * Sensitivity is a closed allow-list of known write events, not a
 * deny-list: an unrecognized event name defaults to "not sensitive".
 * A new write event type added to the dispatcher without updating
 * `SENSITIVE_EVENTS` silently bypasses re-authorization, so the two
 * must change together.
 */

use crate::event::RoomType;

/// Write-operation events that require re-authorization per occurrence
pub const SENSITIVE_EVENTS: [&str; 10] = [
    "document:update",
    "page:content-change",
    "page:delete",
    "page:move",
    "file:upload",
    "comment:create",
    "comment:delete",
    "task:create",
    "task:update",
    "task:delete",
];

/// Read-only events that never require re-authorization
pub const READ_ONLY_EVENTS: [&str; 5] = [
    "cursor:move",
    "presence:update",
    "typing:indicator",
    "selection:change",
    "activity:logged",
];

/// Whether an event name represents a write that must be re-authorized
pub fn is_sensitive_event(event_type: &str) -> bool {
    SENSITIVE_EVENTS.contains(&event_type)
}

/// Whether an inbound event requires a fresh permission check
///
/// Activity rooms are append-only audit streams (inherently read-only)
/// and notification rooms are per-user private rooms (membership
/// already implies ownership); both skip re-authorization regardless
/// of event sensitivity. All other room types delegate to
/// [`is_sensitive_event`].
pub fn should_reauthorize(event_type: &str, room_type: RoomType) -> bool {
    match room_type {
        RoomType::Activity | RoomType::Notification => false,
        _ => is_sensitive_event(event_type),
    }
}
