use std::sync::Arc;

use snafu::{ResultExt, ensure};
use vibe_llm::{SentimentScorer, clamp_score};
use vibe_storage::{MessageStore, NewScoredMessage, ScoredMessage};

use crate::error::{ArenaResult, InvalidInputSnafu, PersistenceFailedSnafu};

pub const DEFAULT_MAX_CONTENT_CHARS: usize = 500;

/// Runs one submission end to end: validate, score, persist.
///
/// Publishing happens inside the store, so a successful submit has already
/// been announced to every subscribed viewer when it returns.
pub struct IngestionService {
    scorer: Arc<dyn SentimentScorer>,
    store: Arc<dyn MessageStore>,
    max_content_chars: usize,
}

impl IngestionService {
    pub fn new(scorer: Arc<dyn SentimentScorer>, store: Arc<dyn MessageStore>) -> Self {
        Self {
            scorer,
            store,
            max_content_chars: DEFAULT_MAX_CONTENT_CHARS,
        }
    }

    pub fn with_max_content_chars(mut self, max_content_chars: usize) -> Self {
        self.max_content_chars = max_content_chars.max(1);
        self
    }

    pub fn max_content_chars(&self) -> usize {
        self.max_content_chars
    }

    pub async fn submit(&self, text: &str) -> ArenaResult<ScoredMessage> {
        self.validate(text)?;

        // Scorers absorb their own failures; clamp again for third-party adapters.
        let sentiment_score = clamp_score(self.scorer.score(text).await);

        let message = self
            .store
            .insert(NewScoredMessage::new(text, sentiment_score))
            .await
            .inspect_err(|error| {
                tracing::error!(error = %error, "failed to persist scored message");
            })
            .context(PersistenceFailedSnafu {
                stage: "submit-persist",
            })?;

        tracing::info!(
            message_id = %message.id,
            seq = message.seq,
            sentiment_score = message.sentiment_score,
            scorer = self.scorer.id(),
            "message submitted"
        );
        Ok(message)
    }

    fn validate(&self, text: &str) -> ArenaResult<()> {
        ensure!(
            !text.trim().is_empty(),
            InvalidInputSnafu {
                stage: "submit-validate-blank",
                reason: "message is empty".to_string(),
            }
        );

        let length = text.chars().count();
        ensure!(
            length <= self.max_content_chars,
            InvalidInputSnafu {
                stage: "submit-validate-length",
                reason: format!(
                    "message has {length} characters; the limit is {}",
                    self.max_content_chars
                ),
            }
        );

        Ok(())
    }
}
