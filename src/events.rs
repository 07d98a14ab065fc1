//! Context events for observers.
//!
//! The [`ContextEvent`] enum describes what the context window manager and
//! the invocation observer decided on a turn. Events are delivered through
//! [`ContextHooks::on_event`](crate::hooks::ContextHooks::on_event).
//!
//! # Event Flow
//!
//! A typical turn produces:
//! 1. `ContextCompacted`, `CompactionSkipped` or `CompactionFailed`
//! 2. `TurnPrepared` - size of the list about to be sent
//! 3. `SummaryObserved` - only when a new summary reaches the model

use crate::types::SkipReason;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContextEvent {
    /// Outgoing message list measured before a model call
    TurnPrepared {
        message_count: usize,
        estimated_tokens: usize,
    },

    /// Context was compacted to reduce size
    ContextCompacted {
        /// Number of messages before compaction
        original_count: usize,
        /// Number of messages after compaction
        new_count: usize,
        /// Estimated tokens before compaction
        original_tokens: usize,
        /// Estimated tokens after compaction
        new_tokens: usize,
        /// Sequence of the summary record that was produced
        summary_sequence: u64,
    },

    /// A trigger fired but nothing could be dropped, or nothing fired
    CompactionSkipped { reason: SkipReason },

    /// Summarization failed; history was left intact
    CompactionFailed { message: String },

    /// A summary not reported before is at the head of the outgoing list
    SummaryObserved { summary: String },
}

impl ContextEvent {
    #[must_use]
    pub const fn turn_prepared(message_count: usize, estimated_tokens: usize) -> Self {
        Self::TurnPrepared {
            message_count,
            estimated_tokens,
        }
    }

    #[must_use]
    pub const fn context_compacted(
        original_count: usize,
        new_count: usize,
        original_tokens: usize,
        new_tokens: usize,
        summary_sequence: u64,
    ) -> Self {
        Self::ContextCompacted {
            original_count,
            new_count,
            original_tokens,
            new_tokens,
            summary_sequence,
        }
    }

    #[must_use]
    pub const fn compaction_skipped(reason: SkipReason) -> Self {
        Self::CompactionSkipped { reason }
    }

    #[must_use]
    pub fn compaction_failed(message: impl Into<String>) -> Self {
        Self::CompactionFailed {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn summary_observed(summary: impl Into<String>) -> Self {
        Self::SummaryObserved {
            summary: summary.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_serialization() -> anyhow::Result<()> {
        let event = ContextEvent::context_compacted(9, 7, 40, 25, 1);
        assert_eq!(
            serde_json::to_value(&event)?,
            json!({
                "type": "context_compacted",
                "original_count": 9,
                "new_count": 7,
                "original_tokens": 40,
                "new_tokens": 25,
                "summary_sequence": 1
            })
        );

        let skipped = ContextEvent::compaction_skipped(SkipReason::InvalidBoundary);
        assert_eq!(
            serde_json::to_value(&skipped)?,
            json!({"type": "compaction_skipped", "reason": "invalid_boundary"})
        );
        Ok(())
    }
}
