//! Static content policy gate applied to single events.
//!
//! The gate classifies one event against the policy and knows nothing about
//! story state. Empty text is accepted deliberately, matching the channel's
//! original moderation behavior; add a non-empty rule here if a deployment
//! wants one.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::channel_source::ChannelEvent;

const DEFAULT_MAX_WORD_LENGTH: usize = 24;

/// Moderation limits for story words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPolicy {
    /// Maximum accepted word length in characters.
    pub max_word_length: usize,
    /// Rejected words, stored lowercase; candidates are lowercased before
    /// comparison.
    #[serde(default)]
    pub banned_words: HashSet<String>,
    /// Author ids whose events are always rejected.
    #[serde(default)]
    pub banned_authors: HashSet<String>,
}

impl Default for ContentPolicy {
    fn default() -> Self {
        Self {
            max_word_length: DEFAULT_MAX_WORD_LENGTH,
            banned_words: HashSet::new(),
            banned_authors: HashSet::new(),
        }
    }
}

/// Why an event failed the policy gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordRejection {
    TooLong,
    NotSingleToken,
    MixedCase,
    BannedWord,
    BannedAuthor,
}

impl WordRejection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TooLong => "too_long",
            Self::NotSingleToken => "not_single_token",
            Self::MixedCase => "mixed_case",
            Self::BannedWord => "banned_word",
            Self::BannedAuthor => "banned_author",
        }
    }
}

/// Classifies one event against the policy. Returns `None` when the event is
/// acceptable as a story word.
pub fn evaluate_word(event: &ChannelEvent, policy: &ContentPolicy) -> Option<WordRejection> {
    let text = event.text.as_str();
    if text.chars().count() > policy.max_word_length {
        return Some(WordRejection::TooLong);
    }
    if text.chars().any(|ch| ch.is_whitespace() || ch == '_') {
        return Some(WordRejection::NotSingleToken);
    }
    // A single leading capital and fully shouted words pass; mixed internal
    // capitalization does not.
    let uppercase_count = text.chars().filter(|ch| ch.is_uppercase()).count();
    if uppercase_count >= 2 && text != text.to_uppercase() {
        return Some(WordRejection::MixedCase);
    }
    if policy.banned_words.contains(&text.to_lowercase()) {
        return Some(WordRejection::BannedWord);
    }
    if policy.banned_authors.contains(&event.author_id) {
        return Some(WordRejection::BannedAuthor);
    }
    None
}

/// Boolean view over [`evaluate_word`].
pub fn is_acceptable(event: &ChannelEvent, policy: &ContentPolicy) -> bool {
    evaluate_word(event, policy).is_none()
}
