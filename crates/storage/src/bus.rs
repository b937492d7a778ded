use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use super::types::ScoredMessage;

type SubscriberMap = BTreeMap<u64, mpsc::UnboundedSender<ScoredMessage>>;

/// Fan-out of newly inserted messages to every live subscriber.
///
/// Only the store side publishes (see [`crate::PublishingStore`]); viewers
/// subscribe and receive each message once, in insertion order.
#[derive(Clone, Default)]
pub struct RealtimeBus {
    inner: Arc<BusInner>,
}

#[derive(Default)]
struct BusInner {
    next_subscriber_id: AtomicU64,
    subscribers: Mutex<SubscriberMap>,
}

impl BusInner {
    fn subscribers(&self) -> MutexGuard<'_, SubscriberMap> {
        // Senders stay valid even if a holder panicked mid-update.
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, subscriber_id: u64) -> bool {
        self.subscribers().remove(&subscriber_id).is_some()
    }
}

impl RealtimeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let subscriber_id = self.inner.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        self.inner.subscribers().insert(subscriber_id, event_tx);
        tracing::debug!(subscriber_id, "realtime bus subscriber registered");

        Subscription {
            subscriber_id,
            bus: Arc::clone(&self.inner),
            events: Some(event_rx),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers().len()
    }

    /// Delivers `message` to every subscriber and returns how many received it.
    pub(crate) fn publish(&self, message: &ScoredMessage) -> usize {
        let mut subscribers = self.inner.subscribers();
        let mut delivered = 0;

        // A failed send means the receiver is gone without unsubscribing.
        subscribers.retain(|subscriber_id, event_tx| {
            if event_tx.send(message.clone()).is_ok() {
                delivered += 1;
                true
            } else {
                tracing::debug!(subscriber_id, "pruning closed realtime bus subscriber");
                false
            }
        });

        tracing::debug!(message_id = %message.id, delivered, "published scored message");
        delivered
    }
}

/// A live registration on the [`RealtimeBus`].
///
/// Dropping the subscription unsubscribes it.
pub struct Subscription {
    subscriber_id: u64,
    bus: Arc<BusInner>,
    events: Option<mpsc::UnboundedReceiver<ScoredMessage>>,
}

impl Subscription {
    /// Waits for the next message. Returns `None` once unsubscribed.
    pub async fn recv(&mut self) -> Option<ScoredMessage> {
        match self.events.as_mut() {
            Some(events) => events.recv().await,
            None => None,
        }
    }

    pub fn try_recv(&mut self) -> Option<ScoredMessage> {
        self.events.as_mut().and_then(|events| events.try_recv().ok())
    }

    pub fn is_active(&self) -> bool {
        self.events.is_some()
    }

    /// Releases the channel. Buffered but unread messages are discarded, so
    /// nothing is delivered after this returns. Returns `false` when the
    /// subscription was already released.
    pub fn unsubscribe(&mut self) -> bool {
        let Some(mut events) = self.events.take() else {
            return false;
        };

        self.bus.remove(self.subscriber_id);
        events.close();
        tracing::debug!(
            subscriber_id = self.subscriber_id,
            "realtime bus subscriber released"
        );
        true
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::MessageId;

    fn message(seq: u64) -> ScoredMessage {
        ScoredMessage {
            id: MessageId::new_v7(),
            seq,
            content: format!("message {seq}"),
            sentiment_score: 0.0,
            created_at_unix_millis: seq,
        }
    }

    #[tokio::test]
    async fn every_subscriber_receives_messages_in_publish_order() {
        let bus = RealtimeBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        assert_eq!(bus.publish(&message(1)), 2);
        assert_eq!(bus.publish(&message(2)), 2);

        for subscription in [&mut first, &mut second] {
            assert_eq!(subscription.recv().await.map(|m| m.seq), Some(1));
            assert_eq!(subscription.recv().await.map(|m| m.seq), Some(2));
        }
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery_and_is_idempotent() {
        let bus = RealtimeBus::new();
        let mut subscription = bus.subscribe();
        bus.publish(&message(1));

        assert!(subscription.unsubscribe());
        assert!(!subscription.unsubscribe());
        assert_eq!(bus.subscriber_count(), 0);

        // Buffered messages are dropped along with the channel.
        assert_eq!(subscription.recv().await, None);
        assert_eq!(bus.publish(&message(2)), 0);
        assert_eq!(subscription.try_recv(), None);
    }

    #[test]
    fn dropping_a_subscription_releases_it() {
        let bus = RealtimeBus::new();
        let subscription = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        drop(subscription);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
