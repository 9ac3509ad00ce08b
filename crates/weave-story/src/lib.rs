//! Domain core for the Weave channel story indexer.
//!
//! A story is an ordered transcript assembled from short single-word channel
//! events. This crate owns the content policy gate, the paginated history
//! scanner, the story state aggregate with its JSON persistence, and the
//! reconciler that merges scans into the story. Transport, command parsing,
//! and reply formatting live outside this crate behind the [`ChannelSource`]
//! capability.

pub mod channel_source;
pub mod content_policy;
pub mod history_scan;
pub mod story_persistence;
pub mod story_reconcile;
pub mod story_state;

pub use channel_source::{ChannelEvent, ChannelSource, EventId, FetchError, ScanDirection};
pub use content_policy::{evaluate_word, is_acceptable, ContentPolicy, WordRejection};
pub use history_scan::{scan, ScanOutcome, ScanRequest, DEFAULT_PAGE_LIMIT, HARD_PAGE_CAP};
pub use story_persistence::{load_story, persist_story, PersistOutcome};
pub use story_reconcile::{
    run_catch_up, run_full_backfill, BackfillReport, CatchUpOutcome, CatchUpReport,
};
pub use story_state::StoryState;
