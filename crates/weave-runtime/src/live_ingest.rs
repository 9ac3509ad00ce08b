//! Application of live create/edit/delete notifications to the story.
//!
//! Each notification is classified through the content policy gate and
//! applied in one synchronous critical section. Rejected creates ask the
//! caller to retract the source event; rejected edits keep the previously
//! stored word (no silent deletion on a failed edit, by chosen policy).

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use weave_story::{
    evaluate_word, ChannelEvent, ChannelSource, ContentPolicy, EventId, StoryState, WordRejection,
};

/// One notification from the live event feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    Created(ChannelEvent),
    Edited(ChannelEvent),
    Deleted { id: EventId },
}

impl LiveEvent {
    pub fn id(&self) -> EventId {
        match self {
            Self::Created(event) | Self::Edited(event) => event.id,
            Self::Deleted { id } => *id,
        }
    }
}

/// What applying a live event did, and what the caller owes the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveIngestAction {
    Stored,
    /// The caller must delete the source event; it was rejected and is not in
    /// the story.
    Retract(WordRejection),
    Updated,
    /// A rejected edit; the previously stored word stays untouched.
    KeptPrevious(WordRejection),
    Removed,
}

impl LiveIngestAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::Retract(_) => "retract",
            Self::Updated => "updated",
            Self::KeptPrevious(_) => "kept_previous",
            Self::Removed => "removed",
        }
    }
}

/// Applies one live notification to the story.
///
/// An accepted create advances the checkpoint to the new id. Deletes remove
/// unconditionally, whether or not the id was ever stored.
pub async fn apply_live_event(
    story: &Mutex<StoryState>,
    policy: &ContentPolicy,
    event: &LiveEvent,
) -> LiveIngestAction {
    match event {
        LiveEvent::Created(created) => match evaluate_word(created, policy) {
            None => {
                let mut guard = story.lock().await;
                guard.upsert(created.id, created.text.clone());
                guard.set_checkpoint(created.id);
                LiveIngestAction::Stored
            }
            Some(rejection) => LiveIngestAction::Retract(rejection),
        },
        LiveEvent::Edited(edited) => match evaluate_word(edited, policy) {
            None => {
                story.lock().await.upsert(edited.id, edited.text.clone());
                LiveIngestAction::Updated
            }
            Some(rejection) => LiveIngestAction::KeptPrevious(rejection),
        },
        LiveEvent::Deleted { id } => {
            story.lock().await.remove(*id);
            LiveIngestAction::Removed
        }
    }
}

/// Drains the live feed until every sender is dropped. Retractions are
/// performed against the source here; retraction failures are logged and the
/// loop keeps running.
pub async fn run_live_ingest_loop(
    mut receiver: mpsc::Receiver<LiveEvent>,
    source: Arc<dyn ChannelSource>,
    story: Arc<Mutex<StoryState>>,
    policy: ContentPolicy,
) {
    while let Some(event) = receiver.recv().await {
        let event_id = event.id();
        let action = apply_live_event(&story, &policy, &event).await;
        match action {
            LiveIngestAction::Retract(rejection) => {
                tracing::info!(
                    id = event_id,
                    reason_code = rejection.as_str(),
                    "retracting rejected live event"
                );
                if let Err(error) = source.delete_event(event_id).await {
                    tracing::warn!(id = event_id, "failed to retract rejected event: {error}");
                }
            }
            LiveIngestAction::KeptPrevious(rejection) => {
                tracing::debug!(
                    id = event_id,
                    reason_code = rejection.as_str(),
                    "rejected edit; previous word kept"
                );
            }
            _ => {}
        }
    }
    tracing::info!("live event feed closed");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use weave_story::{FetchError, ScanDirection};

    use super::*;

    #[derive(Default)]
    struct RetractionRecorder {
        deleted: Mutex<Vec<EventId>>,
        delete_failures: AtomicUsize,
    }

    #[async_trait]
    impl ChannelSource for RetractionRecorder {
        async fn fetch_page(
            &self,
            _anchor: EventId,
            _direction: ScanDirection,
            _limit: usize,
        ) -> Result<Vec<ChannelEvent>, FetchError> {
            Ok(Vec::new())
        }

        async fn latest_event_id(&self) -> Result<Option<EventId>, FetchError> {
            Ok(None)
        }

        async fn delete_event(&self, id: EventId) -> Result<(), FetchError> {
            if self
                .delete_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                    remaining.checked_sub(1)
                })
                .is_ok()
            {
                return Err(FetchError::Transient("retraction outage".to_string()));
            }
            self.deleted.lock().await.push(id);
            Ok(())
        }
    }

    fn channel_event(id: EventId, text: &str) -> ChannelEvent {
        ChannelEvent {
            id,
            author_id: format!("author-{id}"),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn functional_accepted_create_stores_word_and_advances_checkpoint() {
        let story = Mutex::new(StoryState::new());
        let action = apply_live_event(
            &story,
            &ContentPolicy::default(),
            &LiveEvent::Created(channel_event(21, "once")),
        )
        .await;
        assert_eq!(action, LiveIngestAction::Stored);
        let guard = story.lock().await;
        assert_eq!(guard.snapshot(), vec!["once"]);
        assert_eq!(guard.checkpoint(), Some(21));
    }

    #[tokio::test]
    async fn functional_rejected_create_requests_retraction_and_stores_nothing() {
        let story = Mutex::new(StoryState::new());
        let action = apply_live_event(
            &story,
            &ContentPolicy::default(),
            &LiveEvent::Created(channel_event(22, "two words")),
        )
        .await;
        assert_eq!(
            action,
            LiveIngestAction::Retract(WordRejection::NotSingleToken)
        );
        assert!(story.lock().await.is_empty());
    }

    #[tokio::test]
    async fn functional_rejected_edit_keeps_the_previous_word() {
        let story = Mutex::new(StoryState::new());
        let policy = ContentPolicy::default();
        apply_live_event(&story, &policy, &LiveEvent::Created(channel_event(23, "fine"))).await;
        let action = apply_live_event(
            &story,
            &policy,
            &LiveEvent::Edited(channel_event(23, "NoT fInE")),
        )
        .await;
        assert!(matches!(action, LiveIngestAction::KeptPrevious(_)));
        assert_eq!(story.lock().await.snapshot(), vec!["fine"]);
    }

    #[tokio::test]
    async fn functional_accepted_edit_overwrites_the_stored_word() {
        let story = Mutex::new(StoryState::new());
        let policy = ContentPolicy::default();
        apply_live_event(&story, &policy, &LiveEvent::Created(channel_event(24, "first"))).await;
        let action = apply_live_event(
            &story,
            &policy,
            &LiveEvent::Edited(channel_event(24, "second")),
        )
        .await;
        assert_eq!(action, LiveIngestAction::Updated);
        assert_eq!(story.lock().await.snapshot(), vec!["second"]);
    }

    #[tokio::test]
    async fn functional_delete_after_create_removes_the_word_from_snapshot() {
        let story = Mutex::new(StoryState::new());
        let policy = ContentPolicy::default();
        apply_live_event(&story, &policy, &LiveEvent::Created(channel_event(25, "gone"))).await;
        let action = apply_live_event(&story, &policy, &LiveEvent::Deleted { id: 25 }).await;
        assert_eq!(action, LiveIngestAction::Removed);
        assert!(story.lock().await.is_empty());
    }

    #[tokio::test]
    async fn unit_delete_of_never_stored_id_is_a_no_op_removal() {
        let story = Mutex::new(StoryState::new());
        let action = apply_live_event(
            &story,
            &ContentPolicy::default(),
            &LiveEvent::Deleted { id: 404 },
        )
        .await;
        assert_eq!(action, LiveIngestAction::Removed);
        assert!(story.lock().await.is_empty());
    }

    #[tokio::test]
    async fn integration_ingest_loop_retracts_rejections_and_survives_retraction_failures() {
        let source = Arc::new(RetractionRecorder::default());
        source.delete_failures.store(1, Ordering::SeqCst);
        let story = Arc::new(Mutex::new(StoryState::new()));
        let (sender, receiver) = mpsc::channel(8);
        let loop_task = tokio::spawn(run_live_ingest_loop(
            receiver,
            source.clone(),
            story.clone(),
            ContentPolicy::default(),
        ));

        // First rejection hits the scripted retraction failure; the loop must
        // keep draining and retract the second one.
        sender
            .send(LiveEvent::Created(channel_event(30, "bad word")))
            .await
            .expect("send");
        sender
            .send(LiveEvent::Created(channel_event(31, "also_bad")))
            .await
            .expect("send");
        sender
            .send(LiveEvent::Created(channel_event(32, "good")))
            .await
            .expect("send");
        drop(sender);
        loop_task.await.expect("ingest loop should exit cleanly");

        assert_eq!(story.lock().await.snapshot(), vec!["good"]);
        assert_eq!(*source.deleted.lock().await, vec![31]);
    }
}
