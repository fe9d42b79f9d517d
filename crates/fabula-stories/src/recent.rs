use std::collections::VecDeque;

use serde::Serialize;

use crate::types::StorySummary;

pub const DEFAULT_RECENT_CAPACITY: usize = 5;

/// Bounded most-recent-first list of story summaries.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct RecentStories {
    #[serde(skip)]
    capacity: usize,
    entries: VecDeque<StorySummary>,
}

impl Default for RecentStories {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_RECENT_CAPACITY)
    }
}

impl RecentStories {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert at the head, dropping anything past capacity.
    /// An entry with the same id moves to the head instead of repeating.
    pub fn push(&mut self, summary: StorySummary) {
        self.entries.retain(|e| e.id != summary.id);
        self.entries.push_front(summary);
        self.entries.truncate(self.capacity);
    }

    /// Drop the entry for `id`; returns whether one was present
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = &StorySummary> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
