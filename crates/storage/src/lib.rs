use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub mod bus;
pub mod error;
pub mod ids;
pub mod memory;
pub mod publishing;
pub mod sqlite;
pub mod types;

pub use bus::{RealtimeBus, Subscription};
pub use error::{StorageError, StorageResult};
pub use ids::MessageId;
pub use memory::MemoryStorage;
pub use publishing::PublishingStore;
pub use sqlite::SqliteStorage;
pub use types::{NewScoredMessage, ScoredMessage};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Append-only log of scored messages.
///
/// `insert` assigns the id, the insertion sequence and the timestamp
/// atomically; `list_recent` returns at most `limit` messages, newest first.
pub trait MessageStore: Send + Sync {
    fn insert<'a>(&'a self, input: NewScoredMessage) -> BoxFuture<'a, StorageResult<ScoredMessage>>;
    fn list_recent<'a>(&'a self, limit: usize) -> BoxFuture<'a, StorageResult<Vec<ScoredMessage>>>;
}

impl<T> MessageStore for Arc<T>
where
    T: MessageStore + ?Sized,
{
    fn insert<'a>(&'a self, input: NewScoredMessage) -> BoxFuture<'a, StorageResult<ScoredMessage>> {
        (**self).insert(input)
    }

    fn list_recent<'a>(&'a self, limit: usize) -> BoxFuture<'a, StorageResult<Vec<ScoredMessage>>> {
        (**self).list_recent(limit)
    }
}

pub(crate) fn validate_new_message(
    input: &NewScoredMessage,
    stage: &'static str,
) -> StorageResult<()> {
    if input.content.trim().is_empty() {
        return error::InvariantViolationSnafu {
            stage,
            details: "message content must not be blank".to_string(),
        }
        .fail();
    }

    let score = input.sentiment_score;
    if !score.is_finite() || !(-1.0..=1.0).contains(&score) {
        return error::InvariantViolationSnafu {
            stage,
            details: format!("sentiment score {score} is outside [-1, 1]"),
        }
        .fail();
    }

    Ok(())
}
