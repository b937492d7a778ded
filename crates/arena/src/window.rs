use std::collections::VecDeque;

use vibe_storage::{MessageId, ScoredMessage};

/// Outcome of pushing a message into a [`RollingWindow`].
#[derive(Debug, Clone, PartialEq)]
pub enum WindowPush {
    Inserted { evicted: Option<ScoredMessage> },
    Duplicate,
}

/// Bounded newest-first buffer of scored messages with FIFO eviction.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    entries: VecDeque<ScoredMessage>,
}

impl RollingWindow {
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, message_id: MessageId) -> bool {
        self.entries.iter().any(|entry| entry.id == message_id)
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &ScoredMessage> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<ScoredMessage> {
        self.entries.iter().cloned().collect()
    }

    pub fn push_front(&mut self, message: ScoredMessage) -> WindowPush {
        if self.contains(message.id) {
            return WindowPush::Duplicate;
        }

        self.entries.push_front(message);
        let evicted = if self.entries.len() > self.capacity {
            self.entries.pop_back()
        } else {
            None
        };
        WindowPush::Inserted { evicted }
    }

    /// Replaces the contents with `newest_first`, keeping at most `capacity`
    /// entries and the first occurrence of each id.
    pub fn reset<I>(&mut self, newest_first: I)
    where
        I: IntoIterator<Item = ScoredMessage>,
    {
        self.entries.clear();
        for message in newest_first {
            if self.entries.len() == self.capacity {
                break;
            }
            if !self.contains(message.id) {
                self.entries.push_back(message);
            }
        }
    }

    /// Mean score, or 0 for an empty window.
    pub fn average(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }

        let sum: f64 = self.entries.iter().map(|entry| entry.sentiment_score).sum();
        sum / self.entries.len() as f64
    }
}
