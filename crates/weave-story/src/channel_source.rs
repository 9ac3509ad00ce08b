//! Capability boundary over the chat platform that hosts the story channel.
//!
//! The real transport (gateway connection, auth, rate limiting) is an external
//! collaborator; the indexer only needs paginated reads, the channel tail id,
//! and the ability to retract a rejected event.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Externally assigned snowflake identifier. Snowflakes are 64-bit integers
/// that grow monotonically over time, so numeric comparison gives
/// chronological order.
pub type EventId = u64;

/// One short text event read from the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEvent {
    pub id: EventId,
    pub author_id: String,
    pub text: String,
}

/// Which side of the anchor id a page fetch walks toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanDirection {
    /// Events strictly older than the anchor.
    Backward,
    /// Events strictly newer than the anchor.
    Forward,
}

impl ScanDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Backward => "backward",
            Self::Forward => "forward",
        }
    }
}

impl Default for ScanDirection {
    fn default() -> Self {
        Self::Backward
    }
}

/// Fetch failure taxonomy at the source seam.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connectivity or rate-limit trouble; the same fetch may be retried.
    #[error("transient fetch failure: {0}")]
    Transient(String),
    /// The anchor id or the channel itself no longer exists; retrying cannot
    /// succeed and the caller must abort.
    #[error("channel or anchor not found: {0}")]
    NotFound(String),
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Read/retract capability consumed by the scanner, the reconciler, and live
/// ingest. Page ordering is not guaranteed by implementations; callers sort.
#[async_trait]
pub trait ChannelSource: Send + Sync {
    /// Fetches up to `limit` events strictly before or after `anchor`.
    async fn fetch_page(
        &self,
        anchor: EventId,
        direction: ScanDirection,
        limit: usize,
    ) -> Result<Vec<ChannelEvent>, FetchError>;

    /// Id of the newest event in the channel, if the channel has any.
    async fn latest_event_id(&self) -> Result<Option<EventId>, FetchError>;

    /// Removes an event from the channel (author-visible retraction).
    async fn delete_event(&self, id: EventId) -> Result<(), FetchError>;
}
