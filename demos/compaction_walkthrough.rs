//! Compaction walkthrough.
//!
//! Runs a scripted, offline conversation through several turns so the
//! history crosses its message trigger and gets compacted. A tiny topic
//! lookup stands in for a real tool.
//!
//! # Running
//!
//! ```bash
//! cargo run --example compaction_walkthrough
//! ```
//!
//! To see debug logs from the crate:
//! ```bash
//! RUST_LOG=context_window=debug cargo run --example compaction_walkthrough
//! ```

use anyhow::Result;
use async_trait::async_trait;
use context_window::{
    CompactionConfig, ContextWindowManager, Conversation, LlmProvider, LoggingHooks, Message,
    Role, ToolExecutor,
    context::{RetentionPolicy, Trigger},
    llm::ToolCall,
};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const TOPICS_LABEL: &str = "The user asked about: ";

/// Answers every user question with one lookup, then a short reply.
struct ScriptedProvider {
    calls: AtomicUsize,
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(&self, messages: &[Message]) -> Result<Message> {
        let last = messages.last();
        if let Some(result) = last.filter(|m| m.role == Role::Tool) {
            let text = result.text_content().unwrap_or_default();
            return Ok(Message::assistant(format!("From my notes: {text}")));
        }

        let question = last.and_then(Message::text_content).unwrap_or_default();
        let id = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Message::assistant_with_tool_calls(
            None,
            vec![ToolCall::new(
                format!("call_{id}"),
                "lookup",
                json!({ "topic": question }),
            )],
        ))
    }

    async fn summarize(&self, messages: &[Message]) -> Result<String> {
        let mut topics: Vec<&str> = Vec::new();
        for message in messages {
            let Some(text) = message.text_content() else {
                continue;
            };
            match message.role {
                // Carry forward what the previous summary already covered
                Role::Summary => {
                    if let Some((_, earlier)) = text.split_once(TOPICS_LABEL) {
                        topics.extend(earlier.split("; "));
                    }
                }
                Role::User => topics.push(text),
                _ => {}
            }
        }
        Ok(format!("{TOPICS_LABEL}{}", topics.join("; ")))
    }

    fn model(&self) -> &'static str {
        "scripted"
    }
}

struct TopicLookup;

#[async_trait]
impl ToolExecutor for TopicLookup {
    async fn execute(&self, topic: &str) -> Result<String> {
        Ok(format!("{topic} is covered in the Rust book."))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging for debug output (the crate uses the `log` crate)
    env_logger::init();

    let config = CompactionConfig::new()
        .with_trigger(Trigger::Tokens(1000))
        .with_trigger(Trigger::Messages(8))
        .with_retention(RetentionPolicy::Messages(6));

    let manager = ContextWindowManager::with_hooks(
        Arc::new(ScriptedProvider {
            calls: AtomicUsize::new(0),
        }),
        Arc::new(LoggingHooks),
        config,
    );
    let mut conversation = Conversation::new(manager).with_tools(Arc::new(TopicLookup));

    for question in ["ownership", "borrowing", "lifetimes", "traits", "generics"] {
        let report = conversation.run_turn(question).await?;
        println!(
            "[{question}] sent {} messages (~{} tokens), compacted: {}",
            report.message_count, report.estimated_tokens, report.compaction_occurred
        );
        if let Some(summary) = report.summary {
            println!("  summary: {summary}");
        }
        if let Some(error) = report.compaction_error {
            println!("  compaction skipped: {error}");
        }
    }

    println!("\nFinal history:");
    for message in conversation.history() {
        println!(
            "  {:<9} {}",
            message.role.label(),
            message.text_content().unwrap_or_default()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_summary_carries_earlier_topics() -> Result<()> {
        let provider = ScriptedProvider {
            calls: AtomicUsize::new(0),
        };
        let dropped = [
            Message::summary("The user asked about: ownership"),
            Message::user("borrowing"),
            Message::assistant("From my notes: borrowing is covered in the Rust book."),
        ];

        let summary = provider.summarize(&dropped).await?;

        assert_eq!(summary, "The user asked about: ownership; borrowing");
        Ok(())
    }
}
