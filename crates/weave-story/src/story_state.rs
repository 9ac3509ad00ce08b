//! Ordered story aggregate: checkpoint plus id-keyed words.
//!
//! All mutation enters through the explicit operations here; nothing else
//! touches the word map. Keys live in a `BTreeMap`, so ascending-id iteration
//! and key uniqueness hold by construction. That ordering is the store-level
//! contract [`StoryState::snapshot`] renders from, not an accident of how
//! producers insert.

use std::collections::BTreeMap;

use crate::channel_source::EventId;
use crate::history_scan::ScanOutcome;

/// The canonical story: boundary of contiguously indexed history plus every
/// retained word, keyed by event id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoryState {
    checkpoint: Option<EventId>,
    words: BTreeMap<EventId, String>,
}

impl StoryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a story from persisted parts.
    pub fn from_parts(checkpoint: Option<EventId>, words: BTreeMap<EventId, String>) -> Self {
        Self { checkpoint, words }
    }

    pub fn checkpoint(&self) -> Option<EventId> {
        self.checkpoint
    }

    pub fn words(&self) -> &BTreeMap<EventId, String> {
        &self.words
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Inserts or overwrites one word.
    pub fn upsert(&mut self, id: EventId, text: impl Into<String>) {
        self.words.insert(id, text.into());
    }

    /// Removes a word; returns whether it was present.
    pub fn remove(&mut self, id: EventId) -> bool {
        self.words.remove(&id).is_some()
    }

    pub fn set_checkpoint(&mut self, id: EventId) {
        self.checkpoint = Some(id);
    }

    /// Merges one scan pass: the checkpoint moves to the scan boundary and
    /// every scanned event is upserted. Bulk merges trust historical content
    /// as-is; the content policy gate applies only on the live path.
    pub fn merge_scan(&mut self, outcome: &ScanOutcome) {
        self.checkpoint = Some(outcome.boundary_id);
        for event in &outcome.events {
            self.words.insert(event.id, event.text.clone());
        }
    }

    /// Word values in ascending id order. The only read path used for
    /// rendering the story.
    pub fn snapshot(&self) -> Vec<String> {
        self.words.values().cloned().collect()
    }
}
