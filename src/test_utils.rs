use crate::llm::{LlmProvider, Message, ToolCall, summarize_via_complete};
use crate::tools::ToolExecutor;
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

// ===================
// Mock LLM Provider
// ===================

/// How the mock answers `summarize`.
#[derive(Clone, Debug)]
pub enum SummaryBehavior {
    /// Go through `complete`, like a real provider would by default.
    ViaComplete,
    Text(String),
    Empty,
    Fail,
}

pub struct MockProvider {
    replies: Mutex<VecDeque<Result<Message, String>>>,
    summary: SummaryBehavior,
    context_window: Option<usize>,
    requests: Mutex<Vec<Vec<Message>>>,
    summarize_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(replies: Vec<Message>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Ok).collect()),
            summary: SummaryBehavior::ViaComplete,
            context_window: None,
            requests: Mutex::new(Vec::new()),
            summarize_calls: AtomicUsize::new(0),
        }
    }

    pub fn summarizing(summary: &str) -> Self {
        Self::new(Vec::new()).with_summary(SummaryBehavior::Text(summary.to_string()))
    }

    pub fn with_summary(mut self, behavior: SummaryBehavior) -> Self {
        self.summary = behavior;
        self
    }

    pub fn with_context_window(mut self, tokens: usize) -> Self {
        self.context_window = Some(tokens);
        self
    }

    pub fn push_error(&self, message: &str) {
        self.replies
            .lock()
            .expect("lock poisoned")
            .push_back(Err(message.to_string()));
    }

    /// Every message list passed to `complete`, in call order.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().expect("lock poisoned").clone()
    }

    pub fn summarize_calls(&self) -> usize {
        self.summarize_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn complete(&self, messages: &[Message]) -> Result<Message> {
        self.requests
            .lock()
            .expect("lock poisoned")
            .push(messages.to_vec());
        let next = self.replies.lock().expect("lock poisoned").pop_front();
        match next {
            Some(Ok(message)) => Ok(message),
            Some(Err(error)) => Err(anyhow!(error)),
            // Default: end conversation
            None => Ok(Message::assistant("Done")),
        }
    }

    async fn summarize(&self, messages: &[Message]) -> Result<String> {
        self.summarize_calls.fetch_add(1, Ordering::SeqCst);
        match &self.summary {
            SummaryBehavior::ViaComplete => summarize_via_complete(self, messages).await,
            SummaryBehavior::Text(text) => Ok(text.clone()),
            SummaryBehavior::Empty => Ok(String::new()),
            SummaryBehavior::Fail => bail!("Server error during summarization: overloaded"),
        }
    }

    fn model(&self) -> &'static str {
        "mock-model"
    }

    fn context_window(&self) -> Option<usize> {
        self.context_window
    }
}

// ===================
// Mock Tool Executor
// ===================

pub struct EchoTool {
    pub calls: Mutex<Vec<String>>,
}

impl EchoTool {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ToolExecutor for EchoTool {
    async fn execute(&self, topic: &str) -> Result<String> {
        self.calls
            .lock()
            .expect("lock poisoned")
            .push(topic.to_string());
        Ok(format!("Notes on {topic}"))
    }
}

// ===================
// History builders
// ===================

/// `count` alternating user/assistant messages, starting with a user turn.
pub fn plain_history(count: usize) -> Vec<Message> {
    (0..count)
        .map(|i| {
            if i % 2 == 0 {
                Message::user(format!("Question {i}"))
            } else {
                Message::assistant(format!("Answer {i}"))
            }
        })
        .collect()
}

pub fn lookup_call(id: &str, topic: &str) -> Message {
    Message::assistant_with_tool_calls(
        None,
        vec![ToolCall::new(id, "lookup", json!({ "topic": topic }))],
    )
}
