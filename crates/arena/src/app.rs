use std::sync::Arc;

use snafu::ResultExt;
use vibe_llm::create_scorer;
use vibe_storage::{MessageStore, PublishingStore, RealtimeBus, SqliteStorage};

use crate::aggregator::{RollingAggregator, VibeSnapshot};
use crate::error::{ArenaResult, BuildScorerSnafu, OpenStoreSnafu};
use crate::ingest::IngestionService;
use crate::session::ViewerSession;
use crate::settings::ArenaSettings;

/// Owns the shared pieces of one arena: the store, its bus and the
/// ingestion service. Viewers are created per session.
pub struct ArenaApp {
    settings: ArenaSettings,
    bus: RealtimeBus,
    store: Arc<dyn MessageStore>,
    ingestion: IngestionService,
}

impl ArenaApp {
    /// Opens the SQLite store and builds the configured scorer.
    pub async fn open(settings: ArenaSettings) -> ArenaResult<Self> {
        let backend = SqliteStorage::open(&settings.database_path)
            .await
            .context(OpenStoreSnafu {
                stage: "arena-open-sqlite-store",
            })?;
        let scorer = create_scorer(settings.scorer.to_scorer_config()).context(BuildScorerSnafu {
            stage: "arena-build-scorer",
        })?;

        let bus = RealtimeBus::new();
        let store: Arc<dyn MessageStore> = Arc::new(PublishingStore::new(backend, bus.clone()));
        let ingestion = IngestionService::new(scorer, Arc::clone(&store));
        Ok(Self::with_parts(settings, bus, store, ingestion))
    }

    /// Composes an arena from already-built parts. `store` must publish on `bus`.
    pub fn with_parts(
        settings: ArenaSettings,
        bus: RealtimeBus,
        store: Arc<dyn MessageStore>,
        ingestion: IngestionService,
    ) -> Self {
        let ingestion = ingestion.with_max_content_chars(settings.max_content_chars);
        Self {
            settings,
            bus,
            store,
            ingestion,
        }
    }

    pub fn settings(&self) -> &ArenaSettings {
        &self.settings
    }

    pub fn ingestion(&self) -> &IngestionService {
        &self.ingestion
    }

    pub fn bus(&self) -> &RealtimeBus {
        &self.bus
    }

    pub async fn connect_viewer(&self) -> ArenaResult<(ViewerSession, VibeSnapshot)> {
        let aggregator =
            RollingAggregator::new(self.settings.window_capacity, self.settings.feed_capacity);
        ViewerSession::connect(Arc::clone(&self.store), self.bus.clone(), aggregator).await
    }
}

#[cfg(test)]
mod tests {
    use vibe_llm::{FixedScorer, NEUTRAL_PROVIDER_ID};
    use vibe_storage::MemoryStorage;

    use super::*;
    use crate::settings::ScorerSettings;
    use crate::vibe::VibeLabel;

    fn memory_arena(settings: ArenaSettings, score: f64) -> ArenaApp {
        let bus = RealtimeBus::new();
        let store: Arc<dyn MessageStore> =
            Arc::new(PublishingStore::new(MemoryStorage::new(), bus.clone()));
        let ingestion = IngestionService::new(Arc::new(FixedScorer::new(score)), Arc::clone(&store));
        ArenaApp::with_parts(settings, bus, store, ingestion)
    }

    #[tokio::test]
    async fn viewers_use_configured_capacities() {
        let settings = ArenaSettings {
            window_capacity: 2,
            feed_capacity: 3,
            ..ArenaSettings::default()
        };
        let app = memory_arena(settings, 0.5);
        let (mut viewer, _) = app.connect_viewer().await.expect("viewer connects");

        for text in ["a", "b", "c", "d"] {
            app.ingestion().submit(text).await.expect("submit succeeds");
        }

        let snapshot = viewer.drain_pending().expect("updates queued");
        assert_eq!(snapshot.window_len, 2);
        assert_eq!(snapshot.feed.len(), 3);
        assert_eq!(snapshot.vibe.label, VibeLabel::Euphoric);
    }

    #[tokio::test]
    async fn content_limit_comes_from_settings() {
        let settings = ArenaSettings {
            max_content_chars: 3,
            ..ArenaSettings::default()
        };
        let app = memory_arena(settings, 0.0);

        assert_eq!(app.ingestion().max_content_chars(), 3);
        assert!(app.ingestion().submit("four").await.is_err());
    }

    #[tokio::test]
    async fn open_builds_a_sqlite_backed_arena() {
        let settings = ArenaSettings {
            database_path: ":memory:".to_string(),
            scorer: ScorerSettings {
                provider_id: NEUTRAL_PROVIDER_ID.to_string(),
                ..ScorerSettings::default()
            },
            ..ArenaSettings::default()
        };
        let app = ArenaApp::open(settings).await.expect("arena opens");
        let (mut viewer, initial) = app.connect_viewer().await.expect("viewer connects");
        assert_eq!(initial.window_len, 0);

        let message = app.ingestion().submit("just a fact").await.expect("submit succeeds");
        let snapshot = viewer.next_snapshot().await.expect("viewer is notified");

        assert_eq!(message.sentiment_score, 0.0);
        assert_eq!(snapshot.feed, vec![message]);
        assert_eq!(snapshot.vibe.label, VibeLabel::Neutral);
    }
}
