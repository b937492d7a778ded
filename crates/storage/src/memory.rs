use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;

use super::error::StorageResult;
use super::ids::MessageId;
use super::types::{NewScoredMessage, ScoredMessage};
use super::{BoxFuture, MessageStore, validate_new_message};

/// Process-local message log. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStorage {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    // Oldest first; `seq` equals position + 1.
    messages: Vec<ScoredMessage>,
    last_created_at_unix_millis: u64,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.messages.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl MessageStore for MemoryStorage {
    fn insert<'a>(&'a self, input: NewScoredMessage) -> BoxFuture<'a, StorageResult<ScoredMessage>> {
        Box::pin(async move {
            validate_new_message(&input, "memory-insert-validate")?;

            let mut state = self.state.lock().await;
            let created_at_unix_millis = unix_timestamp_millis().max(state.last_created_at_unix_millis);
            let message = ScoredMessage {
                id: MessageId::new_v7(),
                seq: state.messages.len() as u64 + 1,
                content: input.content,
                sentiment_score: input.sentiment_score,
                created_at_unix_millis,
            };

            state.last_created_at_unix_millis = created_at_unix_millis;
            state.messages.push(message.clone());
            Ok(message)
        })
    }

    fn list_recent<'a>(&'a self, limit: usize) -> BoxFuture<'a, StorageResult<Vec<ScoredMessage>>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(state.messages.iter().rev().take(limit).cloned().collect())
        })
    }
}

pub(crate) fn unix_timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_millis() as u64)
}
