use rig::completion::{AssistantContent, CompletionModel, Message as RigMessage};
use rig::prelude::CompletionClient;
use rig::providers::openai;
use snafu::{ResultExt, ensure};

use super::extract::extract_score;
use super::scorer::{
    BoxFuture, CompletionsFailedSnafu, EmptyResponseSnafu, HttpClientSnafu, MisconfiguredSnafu,
    NEUTRAL_SCORE, ScorerConfig, ScorerError, ScorerResult, SentimentScorer,
};

pub const OPENROUTER_PROVIDER_ID: &str = "openrouter";
pub const OPENAI_PROVIDER_ID: &str = "openai";
pub const OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_SCORER_MODEL: &str = "google/gemma-3-12b-it:free";

const SCORING_PREAMBLE: &str = "You rate the emotional sentiment of chat messages.\n\
Rules:\n\
1. Return ONLY a decimal number between -1.0 and 1.0.\n\
2. -1.0 is maximum hate, anger, or sadness.\n\
3. 0.0 is completely neutral or a simple fact.\n\
4. 1.0 is maximum joy, love, or excitement.\n\
5. Do not include any text, explanation, or punctuation. Just the number.";

/// Scores text through an OpenAI-compatible chat endpoint (OpenRouter by default).
pub struct RigSentimentScorer {
    config: ScorerConfig,
}

impl RigSentimentScorer {
    /// Never fails: a scorer without credentials still answers, with neutral scores.
    pub fn new(config: ScorerConfig) -> Self {
        if !config.has_credentials() {
            tracing::warn!(
                provider_id = %config.provider_id,
                "sentiment scorer has no API key; every message will score neutral"
            );
        }

        Self { config }
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    pub fn is_configured(&self) -> bool {
        self.config.has_credentials()
    }

    // Chat Completions (`/chat/completions`); `openai::Client` speaks the Responses API,
    // which OpenRouter and most OpenAI-compatible endpoints do not serve.
    fn build_client(config: &ScorerConfig) -> ScorerResult<openai::CompletionsClient> {
        let mut builder = openai::CompletionsClient::builder().api_key(config.api_key.as_str());
        if !config.endpoint.is_empty() {
            builder = builder.base_url(config.endpoint.as_str());
        }
        builder.build().context(HttpClientSnafu {
            stage: "build-client",
        })
    }

    fn prompt_for(text: &str) -> String {
        format!("Analyze the emotional sentiment of this message: \"{text}\"")
    }

    async fn request_score(&self, text: &str) -> ScorerResult<f64> {
        ensure!(
            self.config.has_credentials(),
            MisconfiguredSnafu {
                stage: "score-check-credentials",
                provider_id: self.config.provider_id.clone(),
            }
        );

        let client = Self::build_client(&self.config)?;
        let model = client.completion_model(self.config.model.clone());
        let request = model
            .completion_request(RigMessage::user(Self::prompt_for(text)))
            .preamble(SCORING_PREAMBLE.to_string())
            .temperature(self.config.temperature)
            .max_tokens(self.config.max_tokens);

        // Single attempt; the caller's fallback absorbs a timeout like any other failure.
        let response = tokio::time::timeout(self.config.timeout, request.send())
            .await
            .map_err(|_| ScorerError::Timeout {
                stage: "score-send",
                timeout: self.config.timeout,
            })?
            .context(CompletionsFailedSnafu {
                stage: "score-send",
            })?;

        let raw = response
            .choice
            .iter()
            .filter_map(|content| match content {
                AssistantContent::Text(text) => Some(text.text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("");

        ensure!(
            !raw.trim().is_empty(),
            EmptyResponseSnafu {
                stage: "score-read-response",
            }
        );

        let score = extract_score(&raw);
        tracing::debug!(
            provider_id = %self.config.provider_id,
            model = %self.config.model,
            raw = %raw.trim(),
            score,
            "sentiment scored"
        );
        Ok(score)
    }
}

impl SentimentScorer for RigSentimentScorer {
    fn id(&self) -> &str {
        &self.config.provider_id
    }

    fn score<'a>(&'a self, text: &'a str) -> BoxFuture<'a, f64> {
        Box::pin(async move {
            match self.request_score(text).await {
                Ok(score) => score,
                Err(error @ ScorerError::Misconfigured { .. }) => {
                    tracing::warn!(
                        provider_id = %self.config.provider_id,
                        error = %error,
                        "sentiment scorer misconfigured; using neutral score"
                    );
                    NEUTRAL_SCORE
                }
                Err(error) => {
                    tracing::error!(
                        provider_id = %self.config.provider_id,
                        model = %self.config.model,
                        error = %error,
                        "sentiment scoring failed; using neutral score"
                    );
                    NEUTRAL_SCORE
                }
            }
        })
    }
}
