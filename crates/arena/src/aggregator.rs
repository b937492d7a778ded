use vibe_storage::ScoredMessage;

use crate::vibe::VibeState;
use crate::window::{RollingWindow, WindowPush};

pub const DEFAULT_WINDOW_CAPACITY: usize = 15;
pub const DEFAULT_FEED_CAPACITY: usize = 20;

/// Everything a display needs after one recompute.
#[derive(Debug, Clone, PartialEq)]
pub struct VibeSnapshot {
    pub vibe: VibeState,
    /// Most recent messages, newest first, bounded by the feed capacity.
    pub feed: Vec<ScoredMessage>,
    pub window_len: usize,
}

/// Per-viewer projection of the message stream.
///
/// Keeps the aggregation window (W) and the display feed (F) over the same
/// arrival-ordered stream and recomputes the vibe eagerly on every change.
#[derive(Debug, Clone)]
pub struct RollingAggregator {
    window: RollingWindow,
    feed: RollingWindow,
    vibe: VibeState,
}

impl RollingAggregator {
    pub fn new(window_capacity: usize, feed_capacity: usize) -> Self {
        Self {
            window: RollingWindow::new(window_capacity),
            feed: RollingWindow::new(feed_capacity),
            vibe: VibeState::default(),
        }
    }

    /// How many stored messages a backfill needs to seed both views.
    pub fn backfill_limit(&self) -> usize {
        self.window.capacity().max(self.feed.capacity())
    }

    /// Replaces both views with the most recent stored messages.
    pub fn backfill(&mut self, mut recent: Vec<ScoredMessage>) -> VibeSnapshot {
        // Newest first by insertion order, whatever order the store used.
        recent.sort_by(|left, right| right.seq.cmp(&left.seq));

        self.window.reset(recent.iter().cloned());
        self.feed.reset(recent);
        self.recompute();

        tracing::debug!(
            window_len = self.window.len(),
            feed_len = self.feed.len(),
            average_score = self.vibe.average_score,
            "rolling window backfilled"
        );
        self.snapshot()
    }

    /// Applies one live notification. Returns `None` for an already-seen id.
    pub fn append(&mut self, message: ScoredMessage) -> Option<VibeSnapshot> {
        if self.window.contains(message.id) || self.feed.contains(message.id) {
            tracing::debug!(message_id = %message.id, "ignoring duplicate delivery");
            return None;
        }

        let message_id = message.id;
        self.feed.push_front(message.clone());
        if let WindowPush::Inserted { evicted: Some(evicted) } = self.window.push_front(message) {
            tracing::debug!(
                message_id = %message_id,
                evicted_id = %evicted.id,
                "rolling window evicted oldest entry"
            );
        }
        self.recompute();
        Some(self.snapshot())
    }

    pub fn vibe(&self) -> VibeState {
        self.vibe
    }

    pub fn window(&self) -> &RollingWindow {
        &self.window
    }

    pub fn feed(&self) -> &RollingWindow {
        &self.feed
    }

    pub fn snapshot(&self) -> VibeSnapshot {
        VibeSnapshot {
            vibe: self.vibe,
            feed: self.feed.to_vec(),
            window_len: self.window.len(),
        }
    }

    fn recompute(&mut self) {
        self.vibe = VibeState::from_average(self.window.average());
    }
}

impl Default for RollingAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY, DEFAULT_FEED_CAPACITY)
    }
}
