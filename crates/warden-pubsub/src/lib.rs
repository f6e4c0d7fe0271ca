//! Pub/sub transport for real-time event fan-out
//!
//! This crate provides the EventBus used to distribute enriched event
//! messages to live viewers. Each organization gets two channel families:
//! a base event channel and a thumbnail-enriched channel. The Thumbnail
//! Coordinator consults `subscriber_count` to skip snapshot fetches nobody
//! would see.

use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Default channel capacity for subscriptions
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// A named fan-out channel
///
/// Channels are per-organization; the two constructors cover the platform's
/// channel families.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Channel(String);

impl Channel {
    /// Base event channel for an organization
    pub fn events(organization_id: &str) -> Self {
        Self(format!("org:{organization_id}:events"))
    }

    /// Thumbnail-enriched event channel for an organization
    pub fn thumbnail_events(organization_id: &str) -> Self {
        Self(format!("org:{organization_id}:events:thumbnail"))
    }

    /// Channel name as published on the wire
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The pub/sub transport
///
/// Messages are JSON values; a publish with no subscribers is a no-op, not
/// an error. Lagged subscribers drop old messages (broadcast semantics);
/// real-time viewers only care about fresh events.
pub struct EventBus {
    /// Map of channels to their broadcast senders
    channels: DashMap<Channel, broadcast::Sender<serde_json::Value>>,
    /// Channel capacity
    capacity: usize,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new event bus with specified channel capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity,
        }
    }

    /// Subscribe to a channel
    pub fn subscribe(&self, channel: &Channel) -> broadcast::Receiver<serde_json::Value> {
        trace!(channel = %channel, "Subscribing to channel");
        self.channels
            .entry(channel.clone())
            .or_insert_with(|| {
                let (tx, _) = broadcast::channel(self.capacity);
                tx
            })
            .subscribe()
    }

    /// Publish a message to a channel
    ///
    /// Returns the number of subscribers the message was delivered to.
    pub fn publish(&self, channel: &Channel, message: serde_json::Value) -> usize {
        debug!(channel = %channel, "Publishing message");

        match self.channels.get(channel) {
            // Send errors just mean no active receivers
            Some(sender) => sender.send(message).unwrap_or(0),
            None => 0,
        }
    }

    /// Number of live subscribers on a channel
    pub fn subscriber_count(&self, channel: &Channel) -> usize {
        self.channels
            .get(channel)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    /// Number of channels with at least one past subscription
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_publish_and_subscribe() {
        let bus = EventBus::new();
        let channel = Channel::events("org-1");
        let mut rx = bus.subscribe(&channel);

        let delivered = bus.publish(&channel, json!({"eventId": "abc"}));
        assert_eq!(delivered, 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received["eventId"], "abc");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let bus = EventBus::new();
        let delivered = bus.publish(&Channel::events("org-1"), json!({}));
        assert_eq!(delivered, 0);
    }

    #[test]
    fn test_subscriber_count() {
        let bus = EventBus::new();
        let channel = Channel::thumbnail_events("org-1");

        assert_eq!(bus.subscriber_count(&channel), 0);

        let _rx1 = bus.subscribe(&channel);
        let _rx2 = bus.subscribe(&channel);
        assert_eq!(bus.subscriber_count(&channel), 2);

        drop(_rx1);
        assert_eq!(bus.subscriber_count(&channel), 1);
    }

    #[tokio::test]
    async fn test_no_cross_channel_pollution() {
        let bus = EventBus::new();
        let base = Channel::events("org-1");
        let thumb = Channel::thumbnail_events("org-1");

        let mut rx_base = bus.subscribe(&base);
        let mut rx_thumb = bus.subscribe(&thumb);

        bus.publish(&base, json!({"kind": "base"}));

        let received = rx_base.recv().await.unwrap();
        assert_eq!(received["kind"], "base");
        assert!(rx_thumb.try_recv().is_err());
    }

    #[test]
    fn test_org_isolation_in_channel_names() {
        assert_ne!(Channel::events("org-1"), Channel::events("org-2"));
        assert_ne!(
            Channel::events("org-1"),
            Channel::thumbnail_events("org-1")
        );
    }
}
