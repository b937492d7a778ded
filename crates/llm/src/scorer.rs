use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use snafu::Snafu;

use super::extract::clamp_score;
use super::rig_adapter::{DEFAULT_SCORER_MODEL, OPENROUTER_ENDPOINT, OPENROUTER_PROVIDER_ID};

pub const NEUTRAL_PROVIDER_ID: &str = "neutral";
pub const NEUTRAL_SCORE: f64 = 0.0;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
pub type ScorerResult<T> = Result<T, ScorerError>;

/// Capability for rating the emotional tone of a text in [-1, 1].
///
/// Scoring is best-effort: implementations absorb every failure, log it, and
/// return [`NEUTRAL_SCORE`]. Callers validate that `text` is non-blank and
/// must not retry.
pub trait SentimentScorer: Send + Sync {
    fn id(&self) -> &str;
    fn score<'a>(&'a self, text: &'a str) -> BoxFuture<'a, f64>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScorerConfig {
    pub provider_id: String,
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
    /// Upper bound for a single scoring attempt.
    pub timeout: Duration,
    pub temperature: f64,
    pub max_tokens: u64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            provider_id: OPENROUTER_PROVIDER_ID.to_string(),
            api_key: String::new(),
            endpoint: OPENROUTER_ENDPOINT.to_string(),
            model: DEFAULT_SCORER_MODEL.to_string(),
            timeout: Duration::from_secs(10),
            temperature: 0.1,
            max_tokens: 8,
        }
    }
}

impl ScorerConfig {
    pub fn new(
        provider_id: impl Into<String>,
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider_id: provider_id.into().trim().to_string(),
            api_key: api_key.into().trim().to_string(),
            endpoint: endpoint.into().trim().to_string(),
            model: model.into().trim().to_string(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn has_credentials(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ScorerError {
    #[snafu(display("sentiment scorer '{provider_id}' has no API key configured"))]
    Misconfigured {
        stage: &'static str,
        provider_id: String,
    },
    #[snafu(display("sentiment provider '{provider_id}' is not supported"))]
    UnsupportedProvider {
        stage: &'static str,
        provider_id: String,
    },
    #[snafu(display("http client failed on `{stage}`, {source}"))]
    HttpClient {
        stage: &'static str,
        source: rig::http_client::Error,
    },
    #[snafu(display("completions failed on `{stage}`, {source}"))]
    CompletionsFailed {
        stage: &'static str,
        source: rig::completion::CompletionError,
    },
    #[snafu(display("sentiment request timed out after {timeout:?}"))]
    Timeout {
        stage: &'static str,
        timeout: Duration,
    },
    #[snafu(display("sentiment response contained no text"))]
    EmptyResponse { stage: &'static str },
}

/// Scores everything as neutral. Stands in when no provider is reachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralScorer;

impl SentimentScorer for NeutralScorer {
    fn id(&self) -> &str {
        NEUTRAL_PROVIDER_ID
    }

    fn score<'a>(&'a self, _text: &'a str) -> BoxFuture<'a, f64> {
        Box::pin(async { NEUTRAL_SCORE })
    }
}

/// Returns the same clamped score for every text.
#[derive(Debug, Clone, Copy)]
pub struct FixedScorer {
    score: f64,
}

impl FixedScorer {
    pub fn new(score: f64) -> Self {
        Self {
            score: clamp_score(score),
        }
    }
}

impl SentimentScorer for FixedScorer {
    fn id(&self) -> &str {
        "fixed"
    }

    fn score<'a>(&'a self, _text: &'a str) -> BoxFuture<'a, f64> {
        let score = self.score;
        Box::pin(async move { score })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_new_trims_fields() {
        let config = ScorerConfig::new(" openrouter ", " key ", " https://x/api ", " m ");
        assert_eq!(config.provider_id, "openrouter");
        assert_eq!(config.api_key, "key");
        assert_eq!(config.endpoint, "https://x/api");
        assert_eq!(config.model, "m");
        assert!(config.has_credentials());
        assert!(!ScorerConfig::default().has_credentials());
    }

    #[tokio::test]
    async fn fixed_scorer_clamps_its_constant() {
        assert_eq!(FixedScorer::new(4.0).score("anything").await, 1.0);
        assert_eq!(FixedScorer::new(-0.3).score("anything").await, -0.3);
    }
}
