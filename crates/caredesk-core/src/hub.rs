// In-process fan-out for live notification feeds
//
// Every mutation of the store publishes a FeedEvent to the hub; every
// active subscriber for the matching recipient receives every event.
// Delivery is best-effort: with no subscriber the event is dropped, and
// a subscriber that falls behind the channel capacity observes a lag
// and must resynchronize from a store snapshot.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::notification::Notification;
use crate::recipient::Recipient;

/// Per-recipient channel capacity. A subscriber further behind than
/// this re-syncs from a snapshot instead of replaying the backlog.
const CHANNEL_CAPACITY: usize = 256;

/// A change to a recipient's feed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FeedEvent {
    /// A new record was appended
    Created { notification: Notification },
    /// One record was flipped to read
    Read { id: Uuid },
    /// The recipient's unread set was flipped in one batch
    ReadAll { recipient_id: String, count: usize },
}

impl FeedEvent {
    pub fn name(&self) -> &'static str {
        match self {
            FeedEvent::Created { .. } => "created",
            FeedEvent::Read { .. } => "read",
            FeedEvent::ReadAll { .. } => "read_all",
        }
    }
}

/// Fan-out hub: one broadcast channel per recipient
///
/// Channels are created lazily on first subscribe or publish and pruned
/// once they have no receivers left.
#[derive(Debug, Default)]
pub struct NotificationHub {
    channels: Mutex<HashMap<String, broadcast::Sender<FeedEvent>>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, broadcast::Sender<FeedEvent>>> {
        // A poisoned lock only means a panic elsewhere; the map itself
        // stays consistent, so recover the guard.
        self.channels.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Subscribe to a recipient's feed. Events published after this
    /// call are delivered to the returned receiver; dropping the
    /// receiver tears the subscription down.
    pub fn subscribe(&self, recipient: &Recipient) -> broadcast::Receiver<FeedEvent> {
        let mut channels = self.lock();
        channels
            .entry(recipient.as_str().to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publish an event to a recipient's subscribers. Best-effort: with
    /// nobody listening the event is dropped and the channel pruned.
    pub fn publish(&self, recipient: &Recipient, event: FeedEvent) {
        let mut channels = self.lock();
        if let Some(sender) = channels.get(recipient.as_str()) {
            if sender.send(event).is_err() {
                channels.remove(recipient.as_str());
            }
        }
    }

    /// Number of live subscribers for a recipient
    pub fn subscriber_count(&self, recipient: &Recipient) -> usize {
        let channels = self.lock();
        channels
            .get(recipient.as_str())
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::NotificationKind;
    use chrono::Utc;

    fn record(recipient: &str) -> Notification {
        Notification {
            id: Uuid::now_v7(),
            recipient_id: recipient.to_string(),
            title: "t".to_string(),
            body: "b".to_string(),
            kind: NotificationKind::NewMessage,
            href: None,
            read: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_every_event() {
        let hub = NotificationHub::new();
        let admin = Recipient::admin();

        let mut rx1 = hub.subscribe(&admin);
        let mut rx2 = hub.subscribe(&admin);
        assert_eq!(hub.subscriber_count(&admin), 2);

        let n = record("admin");
        hub.publish(
            &admin,
            FeedEvent::Created {
                notification: n.clone(),
            },
        );

        for rx in [&mut rx1, &mut rx2] {
            match rx.recv().await.unwrap() {
                FeedEvent::Created { notification } => assert_eq!(notification.id, n.id),
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_no_cross_recipient_leakage() {
        let hub = NotificationHub::new();
        let admin = Recipient::admin();
        let patient = Recipient::patient("p1").unwrap();

        let mut admin_rx = hub.subscribe(&admin);
        let mut patient_rx = hub.subscribe(&patient);

        hub.publish(
            &patient,
            FeedEvent::Created {
                notification: record("p1"),
            },
        );

        assert!(patient_rx.recv().await.is_ok());
        assert!(matches!(
            admin_rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_a_no_op() {
        let hub = NotificationHub::new();
        let admin = Recipient::admin();

        // No panic, no buffering for future subscribers
        hub.publish(&admin, FeedEvent::Read { id: Uuid::now_v7() });

        let mut rx = hub.subscribe(&admin);
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[test]
    fn test_feed_event_wire_tagging() {
        let event = FeedEvent::ReadAll {
            recipient_id: "p1".to_string(),
            count: 3,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "read_all");
        assert_eq!(json["count"], 3);
        assert_eq!(event.name(), "read_all");
    }
}
