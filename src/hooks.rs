//! Lifecycle hooks for the context pipeline.
//!
//! Hooks let callers intercept compaction and observe every decision:
//!
//! - [`ContextHooks::on_context_compact`] - Supply a custom summary
//! - [`ContextHooks::on_event`] - Log or process events
//!
//! # Built-in Implementations
//!
//! - [`DefaultHooks`] - No-op, model-generated summaries
//! - [`LoggingHooks`] - Debug logging for all events

use crate::events::ContextEvent;
use crate::llm::Message;
use async_trait::async_trait;

/// Hooks called by the context window manager and the conversation pipeline.
#[async_trait]
pub trait ContextHooks: Send + Sync {
    /// Called with the droppable prefix when compaction is about to happen.
    /// Return a summary to use, or None to ask the model.
    async fn on_context_compact(&self, _messages: &[Message]) -> Option<String> {
        // Default: use built-in summarization
        None
    }

    /// Called for every context event.
    async fn on_event(&self, _event: &ContextEvent) {
        // Default: no-op
    }
}

/// Default hooks: model summaries, no event handling
pub struct DefaultHooks;

#[async_trait]
impl ContextHooks for DefaultHooks {}

/// Hooks that log all events (useful for debugging)
pub struct LoggingHooks;

#[async_trait]
impl ContextHooks for LoggingHooks {
    async fn on_event(&self, event: &ContextEvent) {
        match event {
            ContextEvent::CompactionFailed { message } => {
                tracing::warn!(%message, "Context compaction failed");
            }
            ContextEvent::ContextCompacted {
                original_count,
                new_count,
                original_tokens,
                new_tokens,
                summary_sequence,
            } => {
                tracing::debug!(
                    original_count,
                    new_count,
                    original_tokens,
                    new_tokens,
                    summary_sequence,
                    "Context compacted"
                );
            }
            _ => tracing::debug!(?event, "Context event"),
        }
    }
}
