use std::sync::Arc;

mod extract;
mod rig_adapter;
mod scorer;

pub use extract::{clamp_score, extract_first_decimal, extract_score};
pub use rig_adapter::{
    DEFAULT_SCORER_MODEL, OPENAI_PROVIDER_ID, OPENROUTER_ENDPOINT, OPENROUTER_PROVIDER_ID,
    RigSentimentScorer,
};
pub use scorer::{
    BoxFuture, FixedScorer, NEUTRAL_PROVIDER_ID, NEUTRAL_SCORE, NeutralScorer, ScorerConfig,
    ScorerError, ScorerResult, SentimentScorer,
};

pub fn create_scorer(mut config: ScorerConfig) -> ScorerResult<Arc<dyn SentimentScorer>> {
    if config.provider_id.trim().is_empty() {
        config.provider_id = OPENROUTER_PROVIDER_ID.to_string();
    }

    match config.provider_id.as_str() {
        OPENROUTER_PROVIDER_ID | OPENAI_PROVIDER_ID => Ok(Arc::new(RigSentimentScorer::new(config))),
        NEUTRAL_PROVIDER_ID => Ok(Arc::new(NeutralScorer)),
        _ => Err(ScorerError::UnsupportedProvider {
            stage: "create-scorer",
            provider_id: config.provider_id,
        }),
    }
}
