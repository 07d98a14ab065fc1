//! One conversation: context window manager, then invocation observer, then
//! the model.
//!
//! [`Conversation`] owns a [`SessionState`] and runs turns strictly in
//! sequence. Each turn:
//! 1. appends the user message and lets the manager compact if needed
//! 2. measures the outgoing list and checks it for a new summary
//! 3. calls the model, running tool calls through the executor when one is
//!    attached
//! 4. appends the reply and returns a [`TurnReport`]

use crate::context::ContextWindowManager;
use crate::events::ContextEvent;
use crate::hooks::{ContextHooks, DefaultHooks};
use crate::llm::{LlmProvider, Message};
use crate::observer::{InvocationObserver, InvocationReport};
use crate::tools::{ToolExecutor, execute_call};
use crate::types::{CompactionError, SessionState};
use anyhow::{Context, Result};
use log::{debug, warn};
use serde::Serialize;
use std::sync::Arc;

/// Default bound on model round-trips spent answering tool calls in one turn.
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 4;

/// Per-turn observable output.
#[derive(Clone, Debug, Serialize)]
pub struct TurnReport {
    /// Size of the list sent for the turn's first model call.
    pub message_count: usize,
    pub estimated_tokens: usize,
    pub compaction_occurred: bool,
    pub summary: Option<String>,
    pub reply: Message,
    #[serde(skip)]
    pub compaction_error: Option<CompactionError>,
}

pub struct Conversation<P: LlmProvider + ?Sized, H: ContextHooks = DefaultHooks> {
    manager: ContextWindowManager<P, H>,
    observer: InvocationObserver,
    tools: Option<Arc<dyn ToolExecutor>>,
    max_tool_rounds: usize,
    state: SessionState,
}

impl<P: LlmProvider + ?Sized, H: ContextHooks> Conversation<P, H> {
    #[must_use]
    pub fn new(manager: ContextWindowManager<P, H>) -> Self {
        Self {
            manager,
            observer: InvocationObserver::default(),
            tools: None,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            state: SessionState::new(),
        }
    }

    /// Resume from a saved session.
    #[must_use]
    pub fn with_state(mut self, state: SessionState) -> Self {
        self.state = state;
        self
    }

    #[must_use]
    pub fn with_tools(mut self, tools: Arc<dyn ToolExecutor>) -> Self {
        self.tools = Some(tools);
        self
    }

    #[must_use]
    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: InvocationObserver) -> Self {
        self.observer = observer;
        self
    }

    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn history(&self) -> &[Message] {
        &self.state.history
    }

    #[must_use]
    pub const fn observer(&self) -> &InvocationObserver {
        &self.observer
    }

    #[must_use]
    pub fn into_state(self) -> SessionState {
        self.state
    }

    /// Run a turn for a plain user message.
    ///
    /// # Errors
    /// Returns an error if the model call fails.
    pub async fn run_turn(&mut self, text: impl Into<String>) -> Result<TurnReport> {
        self.send(Message::user(text)).await
    }

    /// Run a turn for `user_message`.
    ///
    /// A failed model call fails the turn but keeps the prepared history,
    /// including the user message and any compaction that already happened.
    ///
    /// # Errors
    /// Returns an error if the model call fails.
    pub async fn send(&mut self, user_message: Message) -> Result<TurnReport> {
        let state = std::mem::take(&mut self.state);
        let prepared = self.manager.prepare_turn(state, user_message).await;
        self.state = prepared.state;

        let (mut reply, first) = self.invoke().await?;

        let mut rounds = 0;
        while reply.has_tool_calls() {
            let Some(tools) = self.tools.clone() else {
                break;
            };
            if rounds == self.max_tool_rounds {
                warn!(
                    "Tool round limit reached, returning reply with pending calls (session={}, rounds={rounds})",
                    self.state.session_id
                );
                break;
            }
            rounds += 1;

            let calls = reply.tool_calls.clone();
            self.state.history.push(reply);
            for call in &calls {
                let result = execute_call(tools.as_ref(), call).await;
                self.state.history.push(result);
            }
            debug!(
                "Executed tool calls (session={}, round={rounds}, calls={})",
                self.state.session_id,
                calls.len()
            );

            (reply, _) = self.invoke().await?;
        }

        self.state.history.push(reply.clone());

        Ok(TurnReport {
            message_count: first.size.message_count,
            estimated_tokens: first.size.estimated_tokens,
            compaction_occurred: prepared.compaction_occurred,
            summary: prepared.summary,
            reply,
            compaction_error: prepared.error,
        })
    }

    async fn invoke(&mut self) -> Result<(Message, InvocationReport)> {
        let provider = Arc::clone(self.manager.provider());
        let history = &self.state.history;
        let (reply, report) = self
            .observer
            .observe(history, provider.complete(history))
            .await;

        let hooks = self.manager.hooks();
        hooks
            .on_event(&ContextEvent::turn_prepared(
                report.size.message_count,
                report.size.estimated_tokens,
            ))
            .await;
        if let Some(summary) = &report.new_summary {
            hooks.on_event(&ContextEvent::summary_observed(summary)).await;
        }

        let reply = reply.with_context(|| {
            format!(
                "Model call failed (model={}, session={})",
                provider.model(),
                self.state.session_id
            )
        })?;
        Ok((reply, report))
    }
}
