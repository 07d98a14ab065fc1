//! Passive measurement around each model invocation.
//!
//! The observer never changes the message list. Before a call it records
//! the list's size; after the call it reports a summary sitting at index 0
//! the first time that summary is seen. Callers holding the manager's
//! `compaction_occurred` flag should prefer [`SummaryDetection::Typed`];
//! [`SummaryDetection::Heuristic`] exists for streams where the summary is
//! only recognisable by its wording.

use crate::context::{ContextSize, TokenEstimator};
use crate::llm::Message;
use serde::{Deserialize, Serialize};
use std::future::Future;

const SUMMARY_MARKERS: [&str; 3] = ["summary of", "discussed", "covered"];
const DELIMITERS: [char; 4] = ['?', ';', '|', '•'];
const MIN_DELIMITERS: usize = 3;
/// At least one delimiter per this many characters.
const DELIMITER_SPACING: usize = 40;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryDetection {
    /// Only messages with [`Role::Summary`](crate::llm::Role::Summary) count.
    #[default]
    Typed,
    /// Any index-0 message whose text looks like a condensed summary.
    Heuristic,
}

/// What the observer saw around one invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationReport {
    pub size: ContextSize,
    pub compaction_occurred: bool,
    /// Summary text, present only the first time it is observed.
    pub new_summary: Option<String>,
}

#[derive(Debug, Default)]
pub struct InvocationObserver {
    detection: SummaryDetection,
    estimator: TokenEstimator,
    last_reported: Option<String>,
    last_report: Option<InvocationReport>,
}

impl InvocationObserver {
    #[must_use]
    pub fn new(detection: SummaryDetection) -> Self {
        Self {
            detection,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn detection(&self) -> SummaryDetection {
        self.detection
    }

    /// Report from the most recent invocation.
    #[must_use]
    pub const fn last_report(&self) -> Option<&InvocationReport> {
        self.last_report.as_ref()
    }

    /// Measure `messages`, run `invoke`, then check for a new summary.
    pub async fn observe<F, T>(&mut self, messages: &[Message], invoke: F) -> (T, InvocationReport)
    where
        F: Future<Output = T>,
    {
        let size = self.estimator.measure(messages);
        let output = invoke.await;
        let report = self.report(messages, size);
        (output, report)
    }

    /// The post-invocation half of [`observe`](Self::observe), usable when the
    /// call happens elsewhere.
    pub fn inspect(&mut self, messages: &[Message]) -> InvocationReport {
        let size = self.estimator.measure(messages);
        self.report(messages, size)
    }

    fn report(&mut self, messages: &[Message], size: ContextSize) -> InvocationReport {
        let candidate = messages
            .first()
            .filter(|m| self.looks_like_summary(m))
            .and_then(Message::text_content);

        let new_summary = match candidate {
            Some(text) if self.last_reported.as_deref() != Some(text) => {
                self.last_reported = Some(text.to_string());
                Some(text.to_string())
            }
            _ => None,
        };

        let report = InvocationReport {
            size,
            compaction_occurred: new_summary.is_some(),
            new_summary,
        };
        self.last_report = Some(report.clone());
        report
    }

    fn looks_like_summary(&self, message: &Message) -> bool {
        match self.detection {
            SummaryDetection::Typed => message.is_summary(),
            SummaryDetection::Heuristic => {
                message.is_summary() || message.text_content().is_some_and(looks_synthetic)
            }
        }
    }
}

/// Marker phrasing or a dense run of delimiters, as in a condensed topic list.
#[must_use]
pub fn looks_synthetic(text: &str) -> bool {
    let lower = text.to_lowercase();
    if SUMMARY_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return true;
    }

    let total = text.chars().count();
    let delimiters = text.chars().filter(|c| DELIMITERS.contains(c)).count();
    delimiters >= MIN_DELIMITERS && delimiters * DELIMITER_SPACING >= total
}
