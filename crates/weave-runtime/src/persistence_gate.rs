//! Background persistence of the story: fixed-interval timer saves plus a
//! guaranteed final save on shutdown.
//!
//! One task owns every save the gate performs, so a shutdown-triggered save
//! can never race a timer save; the shutdown arm simply runs after whichever
//! tick is in flight, and it runs exactly once. Failed writes are logged and
//! never take the process down.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use weave_story::{persist_story, PersistOutcome, StoryState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceGateConfig {
    pub interval: Duration,
    pub save_path: PathBuf,
}

/// Handle over the running gate task. Dropping the handle also triggers the
/// final save, since the shutdown channel closes either way.
#[derive(Debug)]
pub struct PersistenceGateHandle {
    save_path: PathBuf,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl PersistenceGateHandle {
    pub fn save_path(&self) -> &Path {
        self.save_path.as_path()
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Stops the timer and awaits the final save.
    pub async fn shutdown(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

/// Takes a consistent snapshot of the story and writes it out, honoring the
/// uninitialized-story guard. The lock is held only for the clone; disk IO
/// happens outside it.
pub async fn persist_now(path: &Path, story: &Mutex<StoryState>) -> Result<PersistOutcome> {
    let snapshot = story.lock().await.clone();
    persist_story(path, &snapshot)
}

/// Spawns the persistence timer on the ambient Tokio runtime.
pub fn start_persistence_gate(
    config: PersistenceGateConfig,
    story: Arc<Mutex<StoryState>>,
) -> Result<PersistenceGateHandle> {
    if config.interval.is_zero() {
        bail!("persistence interval must be greater than zero");
    }
    let handle = tokio::runtime::Handle::try_current()
        .context("persistence gate requires an active Tokio runtime")?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let save_path = config.save_path.clone();
    let task = handle.spawn(run_persistence_gate_loop(config, story, shutdown_rx));
    Ok(PersistenceGateHandle {
        save_path,
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    })
}

async fn run_persistence_gate_loop(
    config: PersistenceGateConfig,
    story: Arc<Mutex<StoryState>>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut interval =
        tokio::time::interval_at(Instant::now() + config.interval, config.interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match persist_now(&config.save_path, &story).await {
                    Ok(outcome) => tracing::debug!(
                        path = %config.save_path.display(),
                        reason_code = outcome.as_str(),
                        "timer persist finished"
                    ),
                    Err(error) => tracing::warn!(
                        path = %config.save_path.display(),
                        "timer persist failed: {error:#}"
                    ),
                }
            }
            _ = &mut shutdown_rx => {
                match persist_now(&config.save_path, &story).await {
                    Ok(outcome) => tracing::info!(
                        path = %config.save_path.display(),
                        reason_code = outcome.as_str(),
                        "shutdown persist finished"
                    ),
                    Err(error) => tracing::warn!(
                        path = %config.save_path.display(),
                        "shutdown persist failed: {error:#}"
                    ),
                }
                break;
            }
        }
    }
}
