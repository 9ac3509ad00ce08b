//! End-to-end pipeline: backfill a scripted channel, apply live traffic, and
//! verify what survives shutdown on disk.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;

use weave_runtime::{
    start_story_runtime, LiveEvent, OperatorCommand, OperatorResponse, StoryRuntimeConfig,
};
use weave_story::{load_story, ChannelEvent, ChannelSource, EventId, FetchError, ScanDirection};

struct ScriptedChannel {
    events: Vec<ChannelEvent>,
    deleted: AsyncMutex<Vec<EventId>>,
}

impl ScriptedChannel {
    fn with_words(pairs: &[(EventId, &str, &str)]) -> Self {
        Self {
            events: pairs
                .iter()
                .map(|(id, author, text)| ChannelEvent {
                    id: *id,
                    author_id: (*author).to_string(),
                    text: (*text).to_string(),
                })
                .collect(),
            deleted: AsyncMutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ChannelSource for ScriptedChannel {
    async fn fetch_page(
        &self,
        anchor: EventId,
        direction: ScanDirection,
        limit: usize,
    ) -> Result<Vec<ChannelEvent>, FetchError> {
        let page = match direction {
            ScanDirection::Backward => {
                let mut older: Vec<ChannelEvent> = self
                    .events
                    .iter()
                    .filter(|event| event.id < anchor)
                    .cloned()
                    .collect();
                older.reverse();
                older.truncate(limit);
                older
            }
            ScanDirection::Forward => {
                let mut newer: Vec<ChannelEvent> = self
                    .events
                    .iter()
                    .filter(|event| event.id > anchor)
                    .cloned()
                    .collect();
                newer.truncate(limit);
                newer
            }
        };
        Ok(page)
    }

    async fn latest_event_id(&self) -> Result<Option<EventId>, FetchError> {
        Ok(self.events.last().map(|event| event.id))
    }

    async fn delete_event(&self, id: EventId) -> Result<(), FetchError> {
        self.deleted.lock().await.push(id);
        Ok(())
    }
}

#[tokio::test]
async fn integration_backfill_live_traffic_and_shutdown_roundtrip() {
    let temp = tempfile::tempdir().expect("tempdir");
    let save_path = temp.path().join("story.json");
    let source = Arc::new(ScriptedChannel::with_words(&[
        (10, "alice", "once"),
        (11, "bob", "upon"),
        (12, "alice", "a"),
    ]));

    let runtime = start_story_runtime(StoryRuntimeConfig::new(save_path.clone()), source.clone())
        .await
        .expect("runtime should start");

    // Operator backfills the whole backlog from an anchor above the tail.
    let response = runtime
        .dispatch(OperatorCommand::FullBackfill {
            anchor: 1_000,
            page_limit: None,
            direction: None,
            max_pages: None,
        })
        .await
        .expect("backfill should succeed");
    assert_eq!(
        response,
        OperatorResponse::BackfillCompleted {
            indexed_words: 3,
            checkpoint: 10,
            pages_fetched: 1,
        }
    );

    // Live traffic: one good word, one rejected (retracted), one edit, one
    // delete.
    let sender = runtime.live_sender();
    let created = |id: EventId, text: &str| {
        LiveEvent::Created(ChannelEvent {
            id,
            author_id: "carol".to_string(),
            text: text.to_string(),
        })
    };
    sender.send(created(13, "time")).await.expect("send");
    sender.send(created(14, "two words")).await.expect("send");
    sender
        .send(LiveEvent::Edited(ChannelEvent {
            id: 11,
            author_id: "bob".to_string(),
            text: "UPON".to_string(),
        }))
        .await
        .expect("send");
    sender
        .send(LiveEvent::Deleted { id: 12 })
        .await
        .expect("send");
    drop(sender);

    runtime.shutdown().await;

    assert_eq!(*source.deleted.lock().await, vec![14]);
    let saved = load_story(&save_path).expect("saved story should load");
    assert_eq!(saved.snapshot(), vec!["once", "UPON", "time"]);
    assert_eq!(saved.checkpoint(), Some(13));
}

#[tokio::test]
async fn integration_restart_catches_up_from_the_persisted_checkpoint() {
    let temp = tempfile::tempdir().expect("tempdir");
    let save_path = temp.path().join("story.json");

    // First life: only event 10 exists.
    let first_source = Arc::new(ScriptedChannel::with_words(&[(10, "alice", "once")]));
    let runtime = start_story_runtime(
        StoryRuntimeConfig::new(save_path.clone()),
        first_source.clone(),
    )
    .await
    .expect("runtime should start");
    runtime
        .dispatch(OperatorCommand::FullBackfill {
            anchor: 1_000,
            page_limit: None,
            direction: None,
            max_pages: None,
        })
        .await
        .expect("backfill should succeed");
    runtime.shutdown().await;

    // Second life: the channel grew while the indexer was down.
    let second_source = Arc::new(ScriptedChannel::with_words(&[
        (10, "alice", "once"),
        (11, "bob", "upon"),
    ]));
    let runtime = start_story_runtime(StoryRuntimeConfig::new(save_path.clone()), second_source)
        .await
        .expect("runtime should restart");
    assert_eq!(runtime.snapshot().await, vec!["once", "upon"]);
    runtime.shutdown().await;
}
