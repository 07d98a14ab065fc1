//! Tool execution seam.
//!
//! The core never calls tools itself. A [`ToolExecutor`] answers a topic
//! string with explanatory text; the conversation pipeline turns each
//! assistant tool call into a `Role::Tool` result message linked by
//! `tool_call_id`.
//!
//! # Implementing an executor
//!
//! ```ignore
//! use context_window::tools::ToolExecutor;
//!
//! struct Glossary;
//!
//! #[async_trait::async_trait]
//! impl ToolExecutor for Glossary {
//!     async fn execute(&self, topic: &str) -> anyhow::Result<String> {
//!         Ok(format!("{topic}: see chapter 4"))
//!     }
//! }
//! ```

use crate::llm::{Message, ToolCall};
use anyhow::Result;
use async_trait::async_trait;
use log::warn;
use serde_json::Value;

#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Look up `topic` and return text for the model.
    ///
    /// # Errors
    /// Returns an error if the lookup fails.
    async fn execute(&self, topic: &str) -> Result<String>;
}

/// Topic for a call: `arguments.topic` when it is a string, otherwise the
/// arguments themselves.
#[must_use]
pub fn topic_of(call: &ToolCall) -> String {
    match &call.arguments {
        Value::Object(map) => match map.get("topic") {
            Some(Value::String(topic)) => topic.clone(),
            _ => call.arguments.to_string(),
        },
        Value::String(topic) => topic.clone(),
        other => other.to_string(),
    }
}

/// Run one call and wrap the outcome as a tool-result message. Failures
/// become error text so the model still sees a result for every call.
pub async fn execute_call<T>(executor: &T, call: &ToolCall) -> Message
where
    T: ToolExecutor + ?Sized,
{
    let topic = topic_of(call);
    match executor.execute(&topic).await {
        Ok(text) => Message::tool_result(&call.id, text),
        Err(error) => {
            warn!(
                "Tool execution failed (tool={}, call_id={}): {error:#}",
                call.name, call.id
            );
            Message::tool_result(&call.id, format!("Error: {error}"))
        }
    }
}
