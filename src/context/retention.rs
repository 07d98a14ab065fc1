//! Retention policy and the boundary between dropped and kept messages.

use crate::llm::{Message, Role};
use serde::{Deserialize, Serialize};

/// How many recent messages survive compaction verbatim.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionPolicy {
    /// Keep the last N messages.
    Messages(usize),
    /// Keep `floor(fraction * len)` of the pre-compaction messages, at least
    /// one.
    Fraction(f64),
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::Messages(6)
    }
}

impl RetentionPolicy {
    /// Requested tail length for a history of `len` messages.
    ///
    /// Never below one, so the newest message always survives, and never
    /// above `len`.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn requested(&self, len: usize) -> usize {
        let count = match *self {
            Self::Messages(count) => count,
            Self::Fraction(fraction) => (len as f64 * fraction.clamp(0.0, 1.0)).floor() as usize,
        };
        count.max(1).min(len)
    }
}

/// Index where the retained tail starts, so that `history[..split]` is dropped.
///
/// Starts from the last `retain` messages and moves the split backward until
/// every tool result in the tail has its issuing assistant message in the tail
/// too. Results whose issuer is nowhere in the history cannot be repaired and
/// are left alone.
#[must_use]
pub fn retention_split(history: &[Message], retain: usize) -> usize {
    let mut split = history.len().saturating_sub(retain);

    loop {
        let required = history[split..]
            .iter()
            .filter(|m| m.role == Role::Tool)
            .filter_map(|m| m.tool_call_id.as_deref())
            .filter_map(|id| history[..split].iter().rposition(|m| m.issued_call(id)))
            .min();

        match required {
            Some(index) => split = index,
            None => return split,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolCall;
    use crate::test_utils::{lookup_call, plain_history};
    use serde_json::json;

    #[test]
    fn test_requested_by_count_and_fraction() {
        assert_eq!(RetentionPolicy::Messages(6).requested(9), 6);
        assert_eq!(RetentionPolicy::Messages(6).requested(4), 4);
        assert_eq!(RetentionPolicy::Fraction(0.5).requested(9), 4);
        assert_eq!(RetentionPolicy::Fraction(1.0).requested(9), 9);
    }

    #[test]
    fn test_requested_keeps_at_least_newest_message() {
        assert_eq!(RetentionPolicy::Fraction(0.2).requested(4), 1);
        assert_eq!(RetentionPolicy::Messages(0).requested(5), 1);
        assert_eq!(RetentionPolicy::Messages(3).requested(0), 0);
    }

    #[test]
    fn test_plain_history_splits_at_requested_count() {
        let history = plain_history(9);
        assert_eq!(retention_split(&history, 6), 3);
        assert_eq!(retention_split(&history, 0), 9);
        assert_eq!(retention_split(&history, 20), 0);
    }

    #[test]
    fn test_split_moves_back_to_include_tool_call() {
        let history = vec![
            Message::user("What is borrowing?"),
            lookup_call("call_1", "borrowing"),
            Message::tool_result("call_1", "Borrowing lends references."),
            Message::assistant("Borrowing lends references without moving."),
        ];

        // Naive split lands on the tool result at index 2
        assert_eq!(retention_split(&history, 2), 1);
    }

    #[test]
    fn test_split_covers_every_result_of_a_parallel_call() {
        let history = vec![
            Message::user("Compare traits and generics"),
            Message::assistant_with_tool_calls(
                None,
                vec![
                    ToolCall::new("a", "lookup", json!({"topic": "traits"})),
                    ToolCall::new("b", "lookup", json!({"topic": "generics"})),
                ],
            ),
            Message::tool_result("a", "Traits..."),
            Message::tool_result("b", "Generics..."),
            Message::assistant("Both enable polymorphism."),
        ];

        assert_eq!(retention_split(&history, 2), 1);
        assert_eq!(retention_split(&history, 3), 1);
    }

    #[test]
    fn test_split_follows_chained_calls() {
        let history = vec![
            Message::user("Research"),
            lookup_call("c1", "one"),
            lookup_call("c2", "two"),
            Message::tool_result("c2", "Two"),
            Message::tool_result("c1", "One"),
            Message::assistant("Done"),
        ];

        // Tail [result c1, Done] needs c1 at index 1, which pulls in result c2 too
        assert_eq!(retention_split(&history, 2), 1);
    }

    #[test]
    fn test_split_may_consume_whole_history() {
        let history = vec![
            lookup_call("c1", "one"),
            Message::tool_result("c1", "One"),
            Message::assistant("Done"),
        ];

        assert_eq!(retention_split(&history, 2), 0);
    }

    #[test]
    fn test_orphan_result_does_not_extend() {
        let history = vec![
            Message::user("hi"),
            Message::assistant("hello"),
            Message::tool_result("missing", "stale"),
            Message::assistant("ok"),
        ];

        assert_eq!(retention_split(&history, 2), 2);
    }
}
