use super::ids::MessageId;

/// A submitted text paired with its sentiment score. Immutable once persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMessage {
    pub id: MessageId,
    /// Insertion order assigned by the store; strictly increasing.
    pub seq: u64,
    pub content: String,
    pub sentiment_score: f64,
    /// Never decreases in insertion order.
    pub created_at_unix_millis: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewScoredMessage {
    pub content: String,
    pub sentiment_score: f64,
}

impl NewScoredMessage {
    pub fn new(content: impl Into<String>, sentiment_score: f64) -> Self {
        Self {
            content: content.into(),
            sentiment_score,
        }
    }
}
