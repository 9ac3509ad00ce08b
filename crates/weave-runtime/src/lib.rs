//! Runtime glue for the Weave story indexer.
//!
//! Wires the domain core to its background machinery: the live ingest loop
//! draining the event feed, the persistence gate saving the story on a timer
//! and on shutdown, operator command dispatch, and the assembled runtime that
//! owns all of it. Everything mutating the story goes through one shared
//! `tokio::sync::Mutex<StoryState>`.

pub mod live_ingest;
pub mod operator_commands;
pub mod persistence_gate;
pub mod story_runtime;

pub use live_ingest::{apply_live_event, run_live_ingest_loop, LiveEvent, LiveIngestAction};
pub use operator_commands::{
    dispatch_operator_command, max_words_per_render, render_story_text, OperatorCommand,
    OperatorResponse,
};
pub use persistence_gate::{
    persist_now, start_persistence_gate, PersistenceGateConfig, PersistenceGateHandle,
};
pub use story_runtime::{start_story_runtime, StoryRuntime, StoryRuntimeConfig};
