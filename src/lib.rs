//! Context window management for multi-turn LLM agents.
//!
//! This crate keeps a running conversation inside a bounded size budget:
//! - Deterministic size estimation and OR-combined compaction triggers
//! - LLM summarization of older messages with a typed summary role
//! - Retention that never splits a tool call from its result
//! - A passive observer reporting per-invocation size and new summaries
//!
//! # Example
//!
//! ```ignore
//! use context_window::{
//!     Conversation, ContextWindowManager,
//!     context::{CompactionConfig, RetentionPolicy, Trigger},
//! };
//!
//! let config = CompactionConfig::new()
//!     .with_trigger(Trigger::Messages(8))
//!     .with_retention(RetentionPolicy::Messages(6));
//! let manager = ContextWindowManager::new(Arc::new(provider), config);
//! let mut conversation = Conversation::new(manager);
//!
//! let report = conversation.run_turn("What is ownership?").await?;
//! println!(
//!     "{} messages, ~{} tokens, compacted: {}",
//!     report.message_count, report.estimated_tokens, report.compaction_occurred
//! );
//! ```

#![forbid(unsafe_code)]

pub mod context;
mod events;
mod hooks;
pub mod llm;
pub mod observer;
mod session;
#[cfg(test)]
mod test_utils;
pub mod tools;
mod types;

pub use context::{CompactionConfig, ContextWindowManager};
pub use events::ContextEvent;
pub use hooks::{ContextHooks, DefaultHooks, LoggingHooks};
pub use llm::{LlmProvider, Message, Role};
pub use observer::{InvocationObserver, InvocationReport, SummaryDetection};
pub use session::{Conversation, DEFAULT_MAX_TOOL_ROUNDS, TurnReport};
pub use tools::ToolExecutor;
pub use types::{
    CompactionError, Phase, ReplacedRange, SessionId, SessionState, SkipReason, SummaryRecord,
};
