//! Whole-story JSON persistence: one document, loaded at start, written whole
//! on every persist through the atomic-write helper.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use weave_core::{current_unix_timestamp_ms, write_text_atomic};

use crate::channel_source::EventId;
use crate::story_state::StoryState;

const STORY_SCHEMA_VERSION: u32 = 1;

fn story_schema_version() -> u32 {
    STORY_SCHEMA_VERSION
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoryRecord {
    #[serde(default = "story_schema_version")]
    schema_version: u32,
    #[serde(default)]
    saved_unix_ms: u64,
    #[serde(default)]
    checkpoint: Option<EventId>,
    #[serde(default)]
    words: BTreeMap<EventId, String>,
}

/// What a persist call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Written { words: usize },
    /// The story has no checkpoint yet; writing now could replace a good
    /// save with an uninitialized one, so nothing touches the disk.
    SkippedUninitialized,
}

impl PersistOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Written { .. } => "story_written",
            Self::SkippedUninitialized => "persist_skipped_uninitialized",
        }
    }
}

/// Loads the story from disk; a missing file yields a fresh empty story.
pub fn load_story(path: &Path) -> Result<StoryState> {
    if !path.exists() {
        return Ok(StoryState::new());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let record = serde_json::from_str::<StoryRecord>(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(StoryState::from_parts(record.checkpoint, record.words))
}

/// Writes the full story to `path` atomically, unless the readiness guard
/// blocks it.
pub fn persist_story(path: &Path, story: &StoryState) -> Result<PersistOutcome> {
    if story.checkpoint().is_none() {
        tracing::debug!(
            path = %path.display(),
            reason_code = PersistOutcome::SkippedUninitialized.as_str(),
            "skipping persist of uninitialized story"
        );
        return Ok(PersistOutcome::SkippedUninitialized);
    }
    let record = StoryRecord {
        schema_version: STORY_SCHEMA_VERSION,
        saved_unix_ms: current_unix_timestamp_ms(),
        checkpoint: story.checkpoint(),
        words: story.words().clone(),
    };
    let encoded = serde_json::to_string_pretty(&record).context("failed to encode story record")?;
    write_text_atomic(path, &encoded)
        .with_context(|| format!("failed to write story to {}", path.display()))?;
    Ok(PersistOutcome::Written {
        words: story.word_count(),
    })
}
