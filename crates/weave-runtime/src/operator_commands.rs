//! Operator-facing operations over the running indexer.
//!
//! The command surface is a closed enum dispatched through a match; the
//! command-string parsing that produces these values belongs to the excluded
//! front end.

use std::path::Path;

use anyhow::Result;
use tokio::sync::Mutex;

use weave_story::{
    run_full_backfill, ChannelSource, ContentPolicy, EventId, PersistOutcome, ScanDirection,
    ScanRequest, StoryState,
};

use crate::persistence_gate::persist_now;

/// Character budget of one rendered story reply on the host platform.
const RENDER_CHAR_BUDGET: usize = 2_000;

/// Operator commands driving the core. Parsing lives outside; this is the
/// whole dispatch surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    FullBackfill {
        anchor: EventId,
        page_limit: Option<usize>,
        direction: Option<ScanDirection>,
        max_pages: Option<usize>,
    },
    ForceSave,
    RenderStory {
        /// Cap on how many trailing words to render; `None` renders all.
        tail_words: Option<usize>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorResponse {
    BackfillCompleted {
        indexed_words: usize,
        checkpoint: EventId,
        pages_fetched: usize,
    },
    BackfillEmpty,
    Saved {
        words: usize,
    },
    SaveSkipped,
    Story {
        text: String,
        word_count: usize,
    },
}

/// How many words fit in one rendered reply under the platform budget.
pub fn max_words_per_render(policy: &ContentPolicy) -> usize {
    RENDER_CHAR_BUDGET / (policy.max_word_length + 1)
}

/// Joins the snapshot with single spaces, keeping only the trailing
/// `tail_words` when a cap is given.
pub fn render_story_text(snapshot: &[String], tail_words: Option<usize>) -> String {
    match tail_words {
        Some(cap) if snapshot.len() > cap => snapshot[snapshot.len() - cap..].join(" "),
        _ => snapshot.join(" "),
    }
}

/// Runs one operator command against the shared story.
pub async fn dispatch_operator_command(
    command: OperatorCommand,
    source: &dyn ChannelSource,
    story: &Mutex<StoryState>,
    save_path: &Path,
) -> Result<OperatorResponse> {
    match command {
        OperatorCommand::FullBackfill {
            anchor,
            page_limit,
            direction,
            max_pages,
        } => {
            let mut request = ScanRequest::new(anchor);
            if let Some(limit) = page_limit {
                request.page_limit = limit;
            }
            if let Some(direction) = direction {
                request.direction = direction;
            }
            request.max_pages = max_pages;
            match run_full_backfill(source, story, &request).await? {
                Some(report) => {
                    // The story is saved right after every bulk merge, so an
                    // indexed backlog survives an immediate crash.
                    persist_now(save_path, story).await?;
                    Ok(OperatorResponse::BackfillCompleted {
                        indexed_words: report.indexed_words,
                        checkpoint: report.checkpoint,
                        pages_fetched: report.pages_fetched,
                    })
                }
                None => Ok(OperatorResponse::BackfillEmpty),
            }
        }
        OperatorCommand::ForceSave => match persist_now(save_path, story).await? {
            PersistOutcome::Written { words } => Ok(OperatorResponse::Saved { words }),
            PersistOutcome::SkippedUninitialized => Ok(OperatorResponse::SaveSkipped),
        },
        OperatorCommand::RenderStory { tail_words } => {
            let snapshot = story.lock().await.snapshot();
            Ok(OperatorResponse::Story {
                word_count: snapshot.len(),
                text: render_story_text(&snapshot, tail_words),
            })
        }
    }
}
