//! Turns a droppable prefix into the synthetic summary message.

use crate::hooks::ContextHooks;
use crate::llm::{LlmProvider, Message};
use crate::types::CompactionError;

/// Produce summary text for `dropped`, asking the hooks first and the model
/// second. Empty or whitespace-only text is a failure, so callers never
/// replace history with nothing.
///
/// # Errors
/// Returns [`CompactionError::SummarizationFailed`] if the model call errors
/// or no usable text comes back.
pub async fn summarize<P, H>(
    provider: &P,
    hooks: &H,
    dropped: &[Message],
) -> Result<String, CompactionError>
where
    P: LlmProvider + ?Sized,
    H: ContextHooks + ?Sized,
{
    let text = match hooks.on_context_compact(dropped).await {
        Some(custom) => custom,
        None => provider
            .summarize(dropped)
            .await
            .map_err(|error| CompactionError::summarization_failed(format!("{error:#}")))?,
    };

    let text = text.trim();
    if text.is_empty() {
        return Err(CompactionError::summarization_failed(
            "model returned an empty summary",
        ));
    }

    Ok(text.to_string())
}
