use std::sync::Arc;

use snafu::ResultExt;
use vibe_storage::{MessageStore, RealtimeBus, Subscription};

use crate::aggregator::{RollingAggregator, VibeSnapshot};
use crate::error::{ArenaResult, BackfillFailedSnafu};

/// One viewer's live connection: a bus subscription feeding a private
/// [`RollingAggregator`], seeded from the store.
pub struct ViewerSession {
    store: Arc<dyn MessageStore>,
    bus: RealtimeBus,
    subscription: Subscription,
    aggregator: RollingAggregator,
}

impl ViewerSession {
    pub async fn connect(
        store: Arc<dyn MessageStore>,
        bus: RealtimeBus,
        aggregator: RollingAggregator,
    ) -> ArenaResult<(Self, VibeSnapshot)> {
        // Subscribe before reading history so nothing lands between the two;
        // overlap is absorbed by duplicate detection.
        let subscription = bus.subscribe();
        let mut session = Self {
            store,
            bus,
            subscription,
            aggregator,
        };
        let snapshot = session.backfill().await?;
        Ok((session, snapshot))
    }

    /// Waits for the next notification that changes the window.
    ///
    /// Returns `None` after [`ViewerSession::disconnect`].
    pub async fn next_snapshot(&mut self) -> Option<VibeSnapshot> {
        loop {
            let message = self.subscription.recv().await?;
            if let Some(snapshot) = self.aggregator.append(message) {
                return Some(snapshot);
            }
        }
    }

    /// Applies every notification already queued, returning the last snapshot.
    pub fn drain_pending(&mut self) -> Option<VibeSnapshot> {
        let mut latest = None;
        while let Some(message) = self.subscription.try_recv() {
            if let Some(snapshot) = self.aggregator.append(message) {
                latest = Some(snapshot);
            }
        }
        latest
    }

    /// Recovers from a delivery gap: fresh subscription, then a new backfill.
    pub async fn reconnect(&mut self) -> ArenaResult<VibeSnapshot> {
        self.subscription.unsubscribe();
        self.subscription = self.bus.subscribe();
        tracing::info!("viewer session resubscribed; backfilling");
        self.backfill().await
    }

    pub fn disconnect(&mut self) -> bool {
        self.subscription.unsubscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.subscription.is_active()
    }

    pub fn snapshot(&self) -> VibeSnapshot {
        self.aggregator.snapshot()
    }

    pub fn aggregator(&self) -> &RollingAggregator {
        &self.aggregator
    }

    async fn backfill(&mut self) -> ArenaResult<VibeSnapshot> {
        let recent = self
            .store
            .list_recent(self.aggregator.backfill_limit())
            .await
            .context(BackfillFailedSnafu {
                stage: "viewer-backfill",
            })?;
        Ok(self.aggregator.backfill(recent))
    }
}
