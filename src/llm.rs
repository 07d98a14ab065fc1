pub mod types;

pub use types::*;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::fmt::Write;

/// Longest tool result (in characters) copied into a summarization transcript.
const MAX_TOOL_RESULT_CHARS: usize = 500;

const SUMMARY_SYSTEM_PROMPT: &str = "You are a precise summarizer. Your task is to create concise but complete summaries of conversations, preserving every fact the assistant would need to continue the conversation.";

/// The language model collaborator.
///
/// `complete` answers a turn; `summarize` condenses a message range. The
/// default `summarize` is a specially prompted `complete` call, so most
/// providers only implement the first.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Produce the next assistant message for the given history.
    ///
    /// # Errors
    /// Returns an error if the model call fails.
    async fn complete(&self, messages: &[Message]) -> Result<Message>;

    /// Summarize a range of messages into free-form text.
    ///
    /// # Errors
    /// Returns an error if the model call fails or yields no text.
    async fn summarize(&self, messages: &[Message]) -> Result<String> {
        summarize_via_complete(self, messages).await
    }

    fn model(&self) -> &str;

    /// Context window of the model in tokens, when known.
    fn context_window(&self) -> Option<usize> {
        None
    }
}

/// Summarize by prompting the provider's ordinary `complete` call.
///
/// # Errors
/// Returns an error if the model call fails or the reply carries no text.
pub async fn summarize_via_complete<P>(provider: &P, messages: &[Message]) -> Result<String>
where
    P: LlmProvider + ?Sized,
{
    let transcript = format_transcript(messages);
    let request = vec![
        Message::system(SUMMARY_SYSTEM_PROMPT),
        Message::user(build_summary_prompt(&transcript)),
    ];

    let reply = provider
        .complete(&request)
        .await
        .context("Failed to call LLM for summarization")?;

    match reply.text_content() {
        Some(text) => Ok(text.to_string()),
        None => bail!("No text in summarization response"),
    }
}

/// Render messages as a plain transcript for summarization.
#[must_use]
pub fn format_transcript(messages: &[Message]) -> String {
    let mut output = String::new();

    for message in messages {
        let _ = write!(output, "{}: ", message.role.label());

        match &message.content {
            Content::Text(text) if message.role == Role::Tool => {
                let truncated = if text.chars().count() > MAX_TOOL_RESULT_CHARS {
                    let prefix: String = text.chars().take(MAX_TOOL_RESULT_CHARS).collect();
                    format!("{prefix}... (truncated)")
                } else {
                    text.clone()
                };
                let id = message.tool_call_id.as_deref().unwrap_or("unknown");
                let _ = writeln!(output, "[Tool result ({id}): {truncated}]");
            }
            Content::Text(text) => {
                let _ = writeln!(output, "{text}");
            }
            Content::Structured(_) => {
                let _ = writeln!(output, "[Structured content]");
            }
        }

        for call in &message.tool_calls {
            let _ = writeln!(
                output,
                "[Called tool: {} with input: {}]",
                call.name,
                serde_json::to_string(&call.arguments).unwrap_or_default()
            );
        }
        output.push('\n');
    }

    output
}

fn build_summary_prompt(transcript: &str) -> String {
    format!(
        r"Summarize this conversation concisely, preserving:
- The topics covered so far
- Key facts and conclusions established
- Any open questions or threads still in progress

If the conversation starts with an earlier summary, merge it into the new one instead of repeating it.

Conversation:
{transcript}

Provide a concise summary:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockProvider;
    use serde_json::json;

    #[test]
    fn test_format_transcript() {
        let messages = vec![
            Message::user("Hello"),
            Message::assistant("Hi there!"),
            Message::summary("Earlier we covered greetings."),
        ];

        let formatted = format_transcript(&messages);

        assert!(formatted.contains("User: Hello"));
        assert!(formatted.contains("Assistant: Hi there!"));
        assert!(formatted.contains("Summary: Here is a summary"));
    }

    #[test]
    fn test_format_transcript_includes_tool_calls_and_results() {
        let messages = vec![
            Message::assistant_with_tool_calls(
                None,
                vec![ToolCall::new("call_1", "lookup", json!({"topic": "traits"}))],
            ),
            Message::tool_result("call_1", "Traits define shared behavior."),
        ];

        let formatted = format_transcript(&messages);

        assert!(formatted.contains(r#"[Called tool: lookup with input: {"topic":"traits"}]"#));
        assert!(formatted.contains("[Tool result (call_1): Traits define shared behavior.]"));
    }

    #[test]
    fn test_format_transcript_truncates_tool_results_unicode_safely() {
        let messages = vec![Message::tool_result("call_1", "é".repeat(600))];

        let formatted = format_transcript(&messages);

        assert!(formatted.contains("... (truncated)"));
    }

    #[tokio::test]
    async fn test_default_summarize_uses_complete() -> Result<()> {
        let provider = MockProvider::new(vec![Message::assistant("They discussed lifetimes.")]);

        let summary = provider.summarize(&[Message::user("Explain lifetimes")]).await?;

        assert_eq!(summary, "They discussed lifetimes.");
        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0][0].role, Role::System);
        let prompt = requests[0][1].text_content().unwrap_or_default();
        assert!(prompt.contains("User: Explain lifetimes"));
        Ok(())
    }
}
