//! Reconciliation of scanner output into the story aggregate.
//!
//! Two entry points share the merge: operator-triggered full backfill and the
//! catch-up pass run at startup (and optionally on a timer). The story sits
//! behind a `tokio::sync::Mutex`; a scan spans one suspension point per page
//! fetch, so live ingest writes may interleave between pages. Overlapping ids
//! resolve last-writer-wins and the map keeps itself ordered.

use anyhow::{Context, Result};
use tokio::sync::Mutex;

use crate::channel_source::{ChannelSource, EventId, ScanDirection};
use crate::history_scan::{scan, ScanRequest, DEFAULT_PAGE_LIMIT};
use crate::story_state::StoryState;

/// Summary of one completed full backfill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillReport {
    pub indexed_words: usize,
    pub checkpoint: EventId,
    pub pages_fetched: usize,
}

/// How a catch-up pass resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatchUpOutcome {
    /// The story has never been indexed; nothing to catch up from.
    NoCheckpoint,
    /// The channel tail already equals the checkpoint; zero fetches.
    AlreadyCurrent,
    /// The forward scan found nothing past the checkpoint.
    NothingNew,
    Indexed,
}

impl CatchUpOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoCheckpoint => "catch_up_no_checkpoint",
            Self::AlreadyCurrent => "catch_up_already_current",
            Self::NothingNew => "catch_up_nothing_new",
            Self::Indexed => "catch_up_indexed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatchUpReport {
    pub outcome: CatchUpOutcome,
    pub indexed_words: usize,
    pub checkpoint: Option<EventId>,
}

/// Runs one scanner pass from the operator-chosen anchor and merges the run
/// into the story. Historical content is trusted as-is; the content policy
/// gate is not re-applied here. Returns `None` when the scan found nothing.
pub async fn run_full_backfill(
    source: &dyn ChannelSource,
    story: &Mutex<StoryState>,
    request: &ScanRequest,
) -> Result<Option<BackfillReport>> {
    let outcome = match scan(source, request).await? {
        Some(outcome) => outcome,
        None => return Ok(None),
    };
    let report = BackfillReport {
        indexed_words: outcome.events.len(),
        checkpoint: outcome.boundary_id,
        pages_fetched: outcome.pages_fetched,
    };
    story.lock().await.merge_scan(&outcome);
    tracing::info!(
        indexed_words = report.indexed_words,
        checkpoint = report.checkpoint,
        pages_fetched = report.pages_fetched,
        "full backfill merged into story"
    );
    Ok(Some(report))
}

/// Closes the gap between the checkpoint and the channel tail with a forward
/// scan. No-ops (with zero fetch-page calls) when there is no checkpoint or
/// the tail already matches it.
pub async fn run_catch_up(
    source: &dyn ChannelSource,
    story: &Mutex<StoryState>,
) -> Result<CatchUpReport> {
    let checkpoint = story.lock().await.checkpoint();
    let Some(checkpoint) = checkpoint else {
        return Ok(CatchUpReport {
            outcome: CatchUpOutcome::NoCheckpoint,
            indexed_words: 0,
            checkpoint: None,
        });
    };
    let tail = source
        .latest_event_id()
        .await
        .context("failed to read channel tail id")?;
    if tail == Some(checkpoint) {
        return Ok(CatchUpReport {
            outcome: CatchUpOutcome::AlreadyCurrent,
            indexed_words: 0,
            checkpoint: Some(checkpoint),
        });
    }

    let request = ScanRequest {
        anchor: checkpoint,
        page_limit: DEFAULT_PAGE_LIMIT,
        direction: ScanDirection::Forward,
        max_pages: None,
    };
    match scan(source, &request).await? {
        None => Ok(CatchUpReport {
            outcome: CatchUpOutcome::NothingNew,
            indexed_words: 0,
            checkpoint: Some(checkpoint),
        }),
        Some(outcome) => {
            let report = CatchUpReport {
                outcome: CatchUpOutcome::Indexed,
                indexed_words: outcome.events.len(),
                checkpoint: Some(outcome.boundary_id),
            };
            story.lock().await.merge_scan(&outcome);
            tracing::info!(
                indexed_words = report.indexed_words,
                checkpoint = outcome.boundary_id,
                "catch-up merged into story"
            );
            Ok(report)
        }
    }
}
