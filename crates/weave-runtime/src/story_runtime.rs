//! Assembled indexer runtime: load, catch up, then run the live loop and the
//! persistence gate until shutdown.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use weave_story::{
    load_story, run_catch_up, CatchUpOutcome, ChannelSource, ContentPolicy, StoryState,
};

use crate::live_ingest::{run_live_ingest_loop, LiveEvent};
use crate::operator_commands::{dispatch_operator_command, OperatorCommand, OperatorResponse};
use crate::persistence_gate::{
    persist_now, start_persistence_gate, PersistenceGateConfig, PersistenceGateHandle,
};

const DEFAULT_SAVE_INTERVAL_SECONDS: u64 = 60;
const DEFAULT_LIVE_FEED_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryRuntimeConfig {
    pub policy: ContentPolicy,
    pub save_path: PathBuf,
    pub save_interval: Duration,
    pub live_feed_capacity: usize,
}

impl StoryRuntimeConfig {
    pub fn new(save_path: PathBuf) -> Self {
        Self {
            policy: ContentPolicy::default(),
            save_path,
            save_interval: Duration::from_secs(DEFAULT_SAVE_INTERVAL_SECONDS),
            live_feed_capacity: DEFAULT_LIVE_FEED_CAPACITY,
        }
    }
}

/// The running indexer. Owns the shared story, the ingest task, and the
/// persistence gate.
pub struct StoryRuntime {
    story: Arc<Mutex<StoryState>>,
    source: Arc<dyn ChannelSource>,
    save_path: PathBuf,
    live_tx: mpsc::Sender<LiveEvent>,
    ingest_task: Option<JoinHandle<()>>,
    gate: PersistenceGateHandle,
}

/// Loads the persisted story, runs the startup catch-up pass, and spawns the
/// background machinery. A failed catch-up is logged and abandoned rather
/// than blocking startup; the live loop and the gate still come up.
pub async fn start_story_runtime(
    config: StoryRuntimeConfig,
    source: Arc<dyn ChannelSource>,
) -> Result<StoryRuntime> {
    let loaded = load_story(&config.save_path)
        .with_context(|| format!("failed to load story from {}", config.save_path.display()))?;
    let story = Arc::new(Mutex::new(loaded));

    match run_catch_up(source.as_ref(), &story).await {
        Ok(report) => {
            tracing::info!(
                reason_code = report.outcome.as_str(),
                indexed_words = report.indexed_words,
                "startup catch-up finished"
            );
            if report.outcome == CatchUpOutcome::Indexed {
                if let Err(error) = persist_now(&config.save_path, &story).await {
                    tracing::warn!("save after catch-up failed: {error:#}");
                }
            }
        }
        Err(error) => tracing::warn!("startup catch-up failed: {error:#}"),
    }

    let gate = start_persistence_gate(
        PersistenceGateConfig {
            interval: config.save_interval,
            save_path: config.save_path.clone(),
        },
        story.clone(),
    )?;

    let (live_tx, live_rx) = mpsc::channel(config.live_feed_capacity);
    let ingest_task = tokio::spawn(run_live_ingest_loop(
        live_rx,
        source.clone(),
        story.clone(),
        config.policy.clone(),
    ));

    Ok(StoryRuntime {
        story,
        source,
        save_path: config.save_path,
        live_tx,
        ingest_task: Some(ingest_task),
        gate,
    })
}

impl StoryRuntime {
    /// Sender for the live event feed. Callers must drop every clone before
    /// [`StoryRuntime::shutdown`] or the ingest loop cannot drain to
    /// completion.
    pub fn live_sender(&self) -> mpsc::Sender<LiveEvent> {
        self.live_tx.clone()
    }

    pub async fn dispatch(&self, command: OperatorCommand) -> Result<OperatorResponse> {
        dispatch_operator_command(command, self.source.as_ref(), &self.story, &self.save_path)
            .await
    }

    pub async fn snapshot(&self) -> Vec<String> {
        self.story.lock().await.snapshot()
    }

    /// Stops ingest, then shuts the gate down so the final save is guaranteed
    /// to run once with every applied live event included.
    pub async fn shutdown(self) {
        let Self {
            live_tx,
            mut gate,
            ingest_task,
            ..
        } = self;
        drop(live_tx);
        if let Some(task) = ingest_task {
            let _ = task.await;
        }
        gate.shutdown().await;
    }
}
