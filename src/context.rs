//! Context compaction for long-running conversations.
//!
//! This module keeps a conversation inside a size budget. When the message
//! history grows past a configured trigger, older messages are summarized by
//! the model and replaced with a single summary message.
//!
//! # Overview
//!
//! The compaction system works as follows:
//! 1. Measure the history (message count and estimated tokens)
//! 2. Evaluate the triggers, OR-combined
//! 3. Pick the retained tail, widened so no tool result loses its call
//! 4. Summarize the dropped prefix using the LLM
//! 5. Replace history with summary + retained tail
//!
//! A failed or empty summary leaves the history exactly as it was.
//!
//! # Example
//!
//! ```ignore
//! use context_window::context::{CompactionConfig, ContextWindowManager, RetentionPolicy, Trigger};
//!
//! let manager = ContextWindowManager::new(
//!     Arc::new(my_provider),
//!     CompactionConfig::new()
//!         .with_trigger(Trigger::Tokens(1000))
//!         .with_trigger(Trigger::Messages(8))
//!         .with_retention(RetentionPolicy::Messages(6)),
//! );
//! ```
//!
//! # Configuration
//!
//! Use [`CompactionConfig`] to customize compaction behavior:
//! - `triggers`: When to compact (`tokens`, `messages`, `fraction`)
//! - `retention`: How many recent messages to keep intact
//! - `model_context_limit`: Window size for fraction triggers

mod config;
mod estimator;
mod manager;
mod retention;
mod summarizer;
mod trigger;

pub use config::CompactionConfig;
pub use estimator::{ContextSize, TokenEstimator};
pub use manager::{CompactionOutcome, ContextWindowManager, TurnPreparation};
pub use retention::{RetentionPolicy, retention_split};
pub use summarizer::summarize;
pub use trigger::{Trigger, fired_trigger, should_compact};
