//! Core types shared across the crate.
//!
//! - [`SessionId`]: Unique identifier for a conversation session
//! - [`SessionState`]: Per-session state passed into and out of each turn
//! - [`Phase`]: Where the context window manager is in its cycle
//! - [`SummaryRecord`]: The latest summary and the range it replaced
//! - [`SkipReason`]: Why a turn went ahead without compaction
//! - [`CompactionError`]: Recoverable compaction failure

use crate::llm::Message;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use time::OffsetDateTime;
use uuid::Uuid;

/// Unique identifier for a conversation session
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Manager phase. `Compacted` is terminal for one attempt; every turn
/// returns the session to `Idle`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Evaluating,
    Compacting,
    Compacted,
}

/// Everything one conversation owns. Sessions never share state.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: SessionId,
    pub history: Vec<Message>,
    pub last_summary: Option<SummaryRecord>,
    pub phase: Phase,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_history(history: Vec<Message>) -> Self {
        Self {
            history,
            ..Self::default()
        }
    }
}

/// The messages a summary replaced, identified by position and content hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacedRange {
    /// First replaced index in the pre-compaction history.
    pub start: usize,
    /// One past the last replaced index.
    pub end: usize,
    pub fingerprint: u64,
}

impl ReplacedRange {
    #[must_use]
    pub fn of(messages: &[Message], start: usize) -> Self {
        Self {
            start,
            end: start + messages.len(),
            fingerprint: fingerprint(messages),
        }
    }
}

/// Most recent summary. Superseded by the next compaction, never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// 1 for the first summary of a session, then +1 per compaction.
    pub sequence: u64,
    pub summary: String,
    pub replaced: ReplacedRange,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl SummaryRecord {
    #[must_use]
    pub fn next(previous: Option<&Self>, summary: String, replaced: ReplacedRange) -> Self {
        Self {
            sequence: previous.map_or(1, |p| p.sequence + 1),
            summary,
            replaced,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Hash of a message range, taken over its JSON form.
///
/// Built on `DefaultHasher`, so values are only comparable within one build
/// of the crate, not across Rust releases.
#[must_use]
pub fn fingerprint(messages: &[Message]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for message in messages {
        serde_json::to_string(message)
            .unwrap_or_default()
            .hash(&mut hasher);
    }
    hasher.finish()
}

/// Why compaction did not happen on a turn. None of these are errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No trigger was satisfied.
    NotTriggered,
    /// The retained tail covers the whole history, either from the retention
    /// policy or from keeping tool calls paired. A message-count trigger alone
    /// also skips a single-message prefix, since folding it would not shrink
    /// the count.
    InvalidBoundary,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotTriggered => write!(f, "no trigger satisfied"),
            Self::InvalidBoundary => write!(f, "nothing left to summarize"),
        }
    }
}

/// Recoverable compaction failure. History is left untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompactionError {
    SummarizationFailed { reason: String },
}

impl CompactionError {
    #[must_use]
    pub fn summarization_failed(reason: impl Into<String>) -> Self {
        Self::SummarizationFailed {
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for CompactionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SummarizationFailed { reason } => write!(f, "Summarization failed: {reason}"),
        }
    }
}

impl std::error::Error for CompactionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
        assert_eq!(SessionId::from_string("abc").to_string(), "abc");
    }

    #[test]
    fn test_summary_record_sequence() {
        let messages = vec![Message::user("a"), Message::assistant("b")];
        let first = SummaryRecord::next(None, "one".into(), ReplacedRange::of(&messages, 0));
        let second = SummaryRecord::next(
            Some(&first),
            "two".into(),
            ReplacedRange::of(&messages, 0),
        );

        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert_eq!(first.replaced.end, 2);
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = vec![Message::user("a")];
        let b = vec![Message::user("b")];
        assert_eq!(fingerprint(&a), fingerprint(&a.clone()));
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_session_state_round_trips_through_json() -> anyhow::Result<()> {
        let mut state = SessionState::with_history(vec![Message::user("hi")]);
        state.last_summary = Some(SummaryRecord::next(
            None,
            "covered greetings".into(),
            ReplacedRange::of(&[], 0),
        ));

        let json = serde_json::to_string(&state)?;
        let parsed: SessionState = serde_json::from_str(&json)?;

        assert_eq!(parsed.history, state.history);
        assert_eq!(parsed.session_id, state.session_id);
        assert_eq!(
            parsed.last_summary.map(|s| s.summary),
            Some("covered greetings".to_string())
        );
        Ok(())
    }

    #[test]
    fn test_compaction_error_display() {
        let error = CompactionError::summarization_failed("empty summary");
        assert_eq!(error.to_string(), "Summarization failed: empty summary");
    }
}
