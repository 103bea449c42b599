/**
 * In-Process Event Relay
 *
 * Accepted events - whether from local WebSocket clients or from peer
 * servers via the broadcast endpoint - fan out to subscribers over a
 * `tokio::sync::broadcast` channel. The channel can be cloned and
 * shared across handlers to broadcast from anywhere in the gateway.
 */

use tokio::sync::broadcast;

use crate::event::RealtimeEvent;

/// Relay channel for realtime events
pub type RealtimeEventBroadcast = broadcast::Sender<RealtimeEvent>;

/// Broadcast an event to all local subscribers
///
/// # Returns
///
/// Number of active subscribers that received the event (0 when no
/// subscriber is listening, which is not an error).
pub fn broadcast_event(broadcast_tx: &RealtimeEventBroadcast, event: RealtimeEvent) -> usize {
    match broadcast_tx.send(event) {
        Ok(subscriber_count) => {
            tracing::debug!(
                "[Broadcast] Event relayed to {} subscriber(s)",
                subscriber_count
            );
            subscriber_count
        }
        Err(_) => {
            // No subscribers; nothing to deliver.
            tracing::debug!("[Broadcast] No subscribers for event");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_with_subscriber() {
        let (tx, mut rx) = broadcast::channel::<RealtimeEvent>(16);
        let event = RealtimeEvent::new("page:1", "document:update", serde_json::json!({}));

        let count = broadcast_event(&tx, event.clone());

        assert_eq!(count, 1);
        assert_eq!(rx.try_recv().unwrap(), event);
    }

    #[test]
    fn test_broadcast_without_subscribers() {
        let (tx, _) = broadcast::channel::<RealtimeEvent>(16);
        let rx_dropped = tx.subscribe();
        drop(rx_dropped);

        let event = RealtimeEvent::new("page:1", "document:update", serde_json::json!({}));
        assert_eq!(broadcast_event(&tx, event), 0);
    }
}
