//! The context window manager: evaluate, compact, rewrite.

use crate::events::ContextEvent;
use crate::hooks::{ContextHooks, DefaultHooks};
use crate::llm::{LlmProvider, Message};
use crate::types::{
    CompactionError, Phase, ReplacedRange, SessionState, SkipReason, SummaryRecord,
};
use log::{debug, info, trace, warn};
use std::sync::Arc;

use super::config::CompactionConfig;
use super::estimator::{ContextSize, TokenEstimator};
use super::retention::retention_split;
use super::summarizer::summarize;
use super::trigger::{Trigger, fired_trigger};

/// Result of evaluating (and possibly compacting) one history.
#[derive(Debug, Clone)]
pub struct CompactionOutcome {
    /// The history to use from now on. Identical to the input unless
    /// compaction succeeded.
    pub history: Vec<Message>,
    /// The new summary record, present exactly when compaction happened.
    pub summary: Option<SummaryRecord>,
    pub size_before: ContextSize,
    pub size_after: ContextSize,
    pub skipped: Option<SkipReason>,
    pub error: Option<CompactionError>,
}

impl CompactionOutcome {
    fn unchanged(history: Vec<Message>, size: ContextSize) -> Self {
        Self {
            history,
            summary: None,
            size_before: size,
            size_after: size,
            skipped: None,
            error: None,
        }
    }

    #[must_use]
    pub const fn compaction_occurred(&self) -> bool {
        self.summary.is_some()
    }
}

/// Result of [`ContextWindowManager::prepare_turn`].
#[derive(Debug, Clone)]
pub struct TurnPreparation {
    /// Session state with the user message appended and history possibly
    /// rewritten.
    pub state: SessionState,
    pub compaction_occurred: bool,
    /// Bare summary text when compaction happened on this turn.
    pub summary: Option<String>,
    pub size_before: ContextSize,
    pub size_after: ContextSize,
    pub skipped: Option<SkipReason>,
    /// Recoverable failure surfaced to the caller; history is intact.
    pub error: Option<CompactionError>,
}

/// Keeps a conversation inside its size budget.
///
/// Before every model call the manager measures the history, checks the
/// configured triggers and, when one fires, replaces the droppable prefix
/// with a single [`Role::Summary`](crate::llm::Role::Summary) message
/// followed by the retained tail. It holds no per-session state: everything
/// that changes between turns lives in the [`SessionState`] passed through
/// [`prepare_turn`](Self::prepare_turn).
///
/// # Example
///
/// ```ignore
/// let manager = ContextWindowManager::new(
///     Arc::new(provider),
///     CompactionConfig::new()
///         .with_trigger(Trigger::Messages(8))
///         .with_retention(RetentionPolicy::Messages(6)),
/// );
///
/// let prepared = manager.prepare_turn(state, Message::user("Next question")).await;
/// if prepared.compaction_occurred {
///     println!("summary: {:?}", prepared.summary);
/// }
/// ```
pub struct ContextWindowManager<P: LlmProvider + ?Sized, H: ContextHooks = DefaultHooks> {
    provider: Arc<P>,
    hooks: Arc<H>,
    config: CompactionConfig,
    estimator: TokenEstimator,
}

impl<P: LlmProvider + ?Sized> ContextWindowManager<P, DefaultHooks> {
    /// Create a manager with default hooks.
    #[must_use]
    pub fn new(provider: Arc<P>, config: CompactionConfig) -> Self {
        Self::with_hooks(provider, Arc::new(DefaultHooks), config)
    }
}

impl<P: LlmProvider + ?Sized, H: ContextHooks> ContextWindowManager<P, H> {
    #[must_use]
    pub fn with_hooks(provider: Arc<P>, hooks: Arc<H>, config: CompactionConfig) -> Self {
        Self {
            provider,
            hooks,
            config,
            estimator: TokenEstimator::default(),
        }
    }

    /// Replace the token estimator.
    #[must_use]
    pub fn with_estimator(mut self, estimator: TokenEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &CompactionConfig {
        &self.config
    }

    #[must_use]
    pub const fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    #[must_use]
    pub const fn hooks(&self) -> &Arc<H> {
        &self.hooks
    }

    #[must_use]
    pub fn measure(&self, messages: &[Message]) -> ContextSize {
        self.estimator.measure(messages)
    }

    /// Context window used by fraction triggers: configured first, then the
    /// provider's advertised window.
    #[must_use]
    pub fn model_context_limit(&self) -> Option<usize> {
        self.config
            .model_context_limit
            .or_else(|| self.provider.context_window())
    }

    /// Check if any trigger is satisfied for this history.
    #[must_use]
    pub fn needs_compaction(&self, messages: &[Message]) -> bool {
        fired_trigger(
            &self.config.triggers,
            self.measure(messages),
            self.model_context_limit(),
        )
        .is_some()
    }

    /// Evaluate the triggers and compact when one fires.
    ///
    /// Pure with respect to `history` and the configuration apart from the
    /// summarization call: the same input yields the same decision.
    pub async fn compact_if_needed(
        &self,
        history: Vec<Message>,
        previous: Option<&SummaryRecord>,
    ) -> CompactionOutcome {
        let size = self.measure(&history);
        match self.triggered(size) {
            Some(min_dropped) => self.compact_with(history, previous, min_dropped).await,
            None => {
                let mut outcome = CompactionOutcome::unchanged(history, size);
                outcome.skipped = Some(SkipReason::NotTriggered);
                outcome
            }
        }
    }

    /// Smallest droppable prefix worth summarizing, or `None` when no trigger
    /// fires.
    ///
    /// Folding one message into a summary lowers the token estimate but not
    /// the message count, so it only counts when a token or fraction trigger
    /// is satisfied.
    fn triggered(&self, size: ContextSize) -> Option<usize> {
        let limit = self.model_context_limit();
        let trigger = fired_trigger(&self.config.triggers, size, limit)?;
        debug!(
            "Context compaction triggered (trigger={trigger}, message_count={}, estimated_tokens={})",
            size.message_count, size.estimated_tokens
        );

        let over_budget = self
            .config
            .triggers
            .iter()
            .filter(|t| !matches!(t, Trigger::Messages(_)))
            .any(|t| t.is_satisfied(size, limit));
        Some(if over_budget { 1 } else { 2 })
    }

    /// Compact regardless of triggers.
    ///
    /// Skips with [`SkipReason::InvalidBoundary`] when the retained tail would
    /// cover the whole history.
    pub async fn compact(
        &self,
        history: Vec<Message>,
        previous: Option<&SummaryRecord>,
    ) -> CompactionOutcome {
        self.compact_with(history, previous, 1).await
    }

    async fn compact_with(
        &self,
        history: Vec<Message>,
        previous: Option<&SummaryRecord>,
        min_dropped: usize,
    ) -> CompactionOutcome {
        let size = self.measure(&history);
        let retain = self.config.retention.requested(history.len());
        let split = retention_split(&history, retain);

        if split < min_dropped {
            debug!(
                "Context compaction skipped, nothing to summarize (message_count={}, split={split})",
                history.len()
            );
            self.hooks
                .on_event(&ContextEvent::compaction_skipped(SkipReason::InvalidBoundary))
                .await;
            let mut outcome = CompactionOutcome::unchanged(history, size);
            outcome.skipped = Some(SkipReason::InvalidBoundary);
            return outcome;
        }

        let (dropped, kept) = history.split_at(split);
        let text = match summarize(self.provider.as_ref(), self.hooks.as_ref(), dropped).await {
            Ok(text) => text,
            Err(error) => {
                warn!("Context compaction failed, continuing with full history: {error}");
                self.hooks
                    .on_event(&ContextEvent::compaction_failed(error.to_string()))
                    .await;
                let mut outcome = CompactionOutcome::unchanged(history, size);
                outcome.error = Some(error);
                return outcome;
            }
        };

        let mut new_history = Vec::with_capacity(1 + kept.len());
        new_history.push(Message::summary(&text));
        new_history.extend(kept.iter().cloned());

        let record = SummaryRecord::next(previous, text, ReplacedRange::of(dropped, 0));
        let new_size = self.measure(&new_history);

        info!(
            "Context compacted successfully (original_count={}, new_count={}, original_tokens={}, new_tokens={})",
            size.message_count,
            new_size.message_count,
            size.estimated_tokens,
            new_size.estimated_tokens
        );
        self.hooks
            .on_event(&ContextEvent::context_compacted(
                size.message_count,
                new_size.message_count,
                size.estimated_tokens,
                new_size.estimated_tokens,
                record.sequence,
            ))
            .await;

        CompactionOutcome {
            history: new_history,
            summary: Some(record),
            size_before: size,
            size_after: new_size,
            skipped: None,
            error: None,
        }
    }

    /// Append the user message, then evaluate and possibly compact.
    ///
    /// Never fails: a summarization failure is reported in
    /// [`TurnPreparation::error`] with the history left as it was.
    pub async fn prepare_turn(
        &self,
        mut state: SessionState,
        user_message: Message,
    ) -> TurnPreparation {
        transition(&mut state, Phase::Idle);
        state.history.push(user_message);

        transition(&mut state, Phase::Evaluating);
        let history = std::mem::take(&mut state.history);
        let size = self.measure(&history);

        let outcome = if let Some(min_dropped) = self.triggered(size) {
            transition(&mut state, Phase::Compacting);
            self.compact_with(history, state.last_summary.as_ref(), min_dropped)
                .await
        } else {
            let mut outcome = CompactionOutcome::unchanged(history, size);
            outcome.skipped = Some(SkipReason::NotTriggered);
            outcome
        };

        state.history = outcome.history;
        let summary = outcome.summary.as_ref().map(|r| r.summary.clone());
        if let Some(record) = outcome.summary {
            state.last_summary = Some(record);
            transition(&mut state, Phase::Compacted);
        } else {
            transition(&mut state, Phase::Idle);
        }

        TurnPreparation {
            state,
            compaction_occurred: summary.is_some(),
            summary,
            size_before: outcome.size_before,
            size_after: outcome.size_after,
            skipped: outcome.skipped,
            error: outcome.error,
        }
    }
}

fn transition(state: &mut SessionState, next: Phase) {
    trace!(
        "Session {} phase {:?} -> {next:?}",
        state.session_id, state.phase
    );
    state.phase = next;
}
