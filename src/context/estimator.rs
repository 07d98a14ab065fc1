//! Token estimation for context size calculation.

use crate::llm::{Content, Message};
use log::trace;
use serde::{Deserialize, Serialize};

/// Size of a message list as seen by the trigger evaluator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSize {
    pub message_count: usize,
    pub estimated_tokens: usize,
}

/// Estimates token count for messages.
///
/// Uses `ceil(chars / 4)` over text content. Structured content and tool-call
/// payloads count as zero, so the estimate undercounts tool-heavy histories.
/// This is a cheap, deterministic proxy and not a tokenizer.
#[derive(Clone, Copy, Debug)]
pub struct TokenEstimator {
    chars_per_token: usize,
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self {
            chars_per_token: Self::CHARS_PER_TOKEN,
        }
    }
}

impl TokenEstimator {
    /// Characters per token estimate.
    pub const CHARS_PER_TOKEN: usize = 4;

    /// Estimator with a custom divisor. A divisor of zero falls back to the default.
    #[must_use]
    pub const fn with_chars_per_token(chars_per_token: usize) -> Self {
        let chars_per_token = if chars_per_token == 0 {
            Self::CHARS_PER_TOKEN
        } else {
            chars_per_token
        };
        Self { chars_per_token }
    }

    /// Estimate tokens for a text string.
    #[must_use]
    pub fn estimate_text(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token)
    }

    /// Estimate tokens for a single message.
    ///
    /// A message with neither text nor tool data is counted as zero and left
    /// for the caller to pass through.
    #[must_use]
    pub fn estimate_message(&self, message: &Message) -> usize {
        if message.is_malformed() {
            trace!(
                "Estimating malformed {} message as zero tokens",
                message.role.label()
            );
            return 0;
        }
        match &message.content {
            Content::Text(text) => self.estimate_text(text),
            Content::Structured(_) => 0,
        }
    }

    /// Estimate total tokens for a message history.
    #[must_use]
    pub fn estimate_history(&self, messages: &[Message]) -> usize {
        messages.iter().map(|m| self.estimate_message(m)).sum()
    }

    /// Count and estimate in one pass. Always recomputed from the messages.
    #[must_use]
    pub fn measure(&self, messages: &[Message]) -> ContextSize {
        ContextSize {
            message_count: messages.len(),
            estimated_tokens: self.estimate_history(messages),
        }
    }
}
