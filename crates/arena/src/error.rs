use snafu::Snafu;
use vibe_llm::ScorerError;
use vibe_storage::StorageError;

use crate::settings::SettingsError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ArenaError {
    #[snafu(display("message rejected: {reason}"))]
    InvalidInput { stage: &'static str, reason: String },
    #[snafu(display("failed to persist message on `{stage}`: {source}"))]
    PersistenceFailed {
        stage: &'static str,
        source: StorageError,
    },
    #[snafu(display("failed to backfill recent messages on `{stage}`: {source}"))]
    BackfillFailed {
        stage: &'static str,
        source: StorageError,
    },
    #[snafu(display("failed to open message store on `{stage}`: {source}"))]
    OpenStore {
        stage: &'static str,
        source: StorageError,
    },
    #[snafu(display("failed to build sentiment scorer on `{stage}`: {source}"))]
    BuildScorer {
        stage: &'static str,
        source: ScorerError,
    },
    #[snafu(display("settings error on `{stage}`: {source}"))]
    Settings {
        stage: &'static str,
        source: SettingsError,
    },
    #[snafu(display("failed to read terminal input on `{stage}`: {source}"))]
    ReadInput {
        stage: &'static str,
        source: std::io::Error,
    },
}

pub type ArenaResult<T> = Result<T, ArenaError>;
