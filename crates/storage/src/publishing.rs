use tokio::sync::Mutex;

use super::bus::RealtimeBus;
use super::error::StorageResult;
use super::types::{NewScoredMessage, ScoredMessage};
use super::{BoxFuture, MessageStore};

/// Wraps a backend so every successful insert is announced on the bus
/// exactly once.
pub struct PublishingStore<S> {
    backend: S,
    bus: RealtimeBus,
    // Held across insert and publish so notifications follow insertion order.
    write_lock: Mutex<()>,
}

impl<S> PublishingStore<S>
where
    S: MessageStore,
{
    pub fn new(backend: S, bus: RealtimeBus) -> Self {
        Self {
            backend,
            bus,
            write_lock: Mutex::new(()),
        }
    }

    pub fn bus(&self) -> &RealtimeBus {
        &self.bus
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }
}

impl<S> MessageStore for PublishingStore<S>
where
    S: MessageStore,
{
    fn insert<'a>(&'a self, input: NewScoredMessage) -> BoxFuture<'a, StorageResult<ScoredMessage>> {
        Box::pin(async move {
            let _write_guard = self.write_lock.lock().await;
            let message = self.backend.insert(input).await?;
            self.bus.publish(&message);
            Ok(message)
        })
    }

    fn list_recent<'a>(&'a self, limit: usize) -> BoxFuture<'a, StorageResult<Vec<ScoredMessage>>> {
        self.backend.list_recent(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStorage;

    #[tokio::test]
    async fn successful_insert_is_published_once() {
        let bus = RealtimeBus::new();
        let store = PublishingStore::new(MemoryStorage::new(), bus.clone());
        let mut subscription = bus.subscribe();

        let inserted = store
            .insert(NewScoredMessage::new("good vibes", 0.8))
            .await
            .expect("insert succeeds");

        assert_eq!(subscription.try_recv(), Some(inserted));
        assert_eq!(subscription.try_recv(), None);
    }

    #[tokio::test]
    async fn rejected_insert_is_not_published() {
        let bus = RealtimeBus::new();
        let store = PublishingStore::new(MemoryStorage::new(), bus.clone());
        let mut subscription = bus.subscribe();

        let result = store.insert(NewScoredMessage::new("   ", 0.0)).await;

        assert!(result.is_err());
        assert_eq!(subscription.try_recv(), None);
    }

    #[tokio::test]
    async fn concurrent_inserts_are_published_in_sequence_order() {
        let bus = RealtimeBus::new();
        let store = std::sync::Arc::new(PublishingStore::new(MemoryStorage::new(), bus.clone()));
        let mut subscription = bus.subscribe();

        let tasks = (0..16)
            .map(|index| {
                let store = std::sync::Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .insert(NewScoredMessage::new(format!("message {index}"), 0.1))
                        .await
                })
            })
            .collect::<Vec<_>>();
        for task in tasks {
            task.await.expect("task joins").expect("insert succeeds");
        }

        let mut seqs = Vec::new();
        while let Some(message) = subscription.try_recv() {
            seqs.push(message.seq);
        }
        assert_eq!(seqs, (1..=16).collect::<Vec<_>>());
    }
}
