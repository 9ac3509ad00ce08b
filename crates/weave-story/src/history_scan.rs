//! Paginated fetch-merge engine over the channel backlog.
//!
//! A scan walks one page at a time from an anchor id, merging every page into
//! a single accumulated run that stays sorted and deduplicated. One fetch is
//! in flight at a time; the source's rate limits are the bottleneck, not the
//! merge.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::channel_source::{ChannelEvent, ChannelSource, EventId, ScanDirection};

/// Hard page-size cap enforced by the upstream platform.
pub const HARD_PAGE_CAP: usize = 100;
/// Page size used when the caller does not pick one.
pub const DEFAULT_PAGE_LIMIT: usize = 100;

const PAGE_FETCH_MAX_ATTEMPTS: usize = 3;
const PAGE_FETCH_RETRY_DELAY_MS: u64 = 250;

/// Parameters for one scan pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub anchor: EventId,
    pub page_limit: usize,
    pub direction: ScanDirection,
    /// Upper bound on page fetches; the only brake on an unbounded backlog.
    pub max_pages: Option<usize>,
}

impl ScanRequest {
    pub fn new(anchor: EventId) -> Self {
        Self {
            anchor,
            page_limit: DEFAULT_PAGE_LIMIT,
            direction: ScanDirection::default(),
            max_pages: None,
        }
    }
}

/// Sorted, deduplicated result of one scan pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Every scanned event, ascending by id.
    pub events: Vec<ChannelEvent>,
    /// Lowest id across the whole run, regardless of scan direction. This is
    /// the continuation convention inherited from the original indexer;
    /// forward callers must interpret it accordingly.
    pub boundary_id: EventId,
    pub pages_fetched: usize,
}

/// Scans the channel from `request.anchor`, one page per round trip, until a
/// short page signals exhaustion or the page cap is hit. Returns `Ok(None)`
/// when the very first page is empty.
///
/// Page limits outside `1..=HARD_PAGE_CAP` fail fast rather than being
/// clamped, so a misconfigured caller is caught before any fetch happens.
pub async fn scan(
    source: &dyn ChannelSource,
    request: &ScanRequest,
) -> Result<Option<ScanOutcome>> {
    if request.page_limit == 0 || request.page_limit > HARD_PAGE_CAP {
        bail!(
            "page limit {} is outside the supported range 1..={}",
            request.page_limit,
            HARD_PAGE_CAP
        );
    }

    let mut accumulated: BTreeMap<EventId, ChannelEvent> = BTreeMap::new();
    let mut frontier = request.anchor;
    let mut pages_fetched = 0_usize;

    loop {
        let page =
            fetch_page_with_retry(source, frontier, request.direction, request.page_limit).await?;
        if page.is_empty() {
            if accumulated.is_empty() {
                return Ok(None);
            }
            break;
        }
        pages_fetched += 1;
        let page_size = page.len();
        for event in page {
            // Equal ids collapse to one entry; the later fetch wins.
            accumulated.insert(event.id, event);
        }
        if let Some(lowest) = accumulated.keys().next() {
            frontier = *lowest;
        }
        if page_size < request.page_limit {
            break;
        }
        if let Some(max_pages) = request.max_pages {
            if pages_fetched >= max_pages {
                break;
            }
        }
    }

    let boundary_id = match accumulated.keys().next() {
        Some(lowest) => *lowest,
        None => return Ok(None),
    };
    Ok(Some(ScanOutcome {
        events: accumulated.into_values().collect(),
        boundary_id,
        pages_fetched,
    }))
}

async fn fetch_page_with_retry(
    source: &dyn ChannelSource,
    anchor: EventId,
    direction: ScanDirection,
    limit: usize,
) -> Result<Vec<ChannelEvent>> {
    let mut attempt = 1_usize;
    loop {
        match source.fetch_page(anchor, direction, limit).await {
            Ok(page) => return Ok(page),
            Err(error) if error.is_transient() && attempt < PAGE_FETCH_MAX_ATTEMPTS => {
                tracing::warn!(
                    anchor,
                    direction = direction.as_str(),
                    attempt,
                    "retrying page fetch after transient failure: {error}"
                );
                tokio::time::sleep(Duration::from_millis(PAGE_FETCH_RETRY_DELAY_MS)).await;
                attempt += 1;
            }
            Err(error) => {
                return Err(error).with_context(|| {
                    format!(
                        "page fetch {} from anchor {} failed",
                        direction.as_str(),
                        anchor
                    )
                });
            }
        }
    }
}
