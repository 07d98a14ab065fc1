//! Compaction triggers and their OR-combined evaluation.

use super::estimator::ContextSize;
use serde::{Deserialize, Serialize};

/// One threshold rule. Serialized as `{"tokens": 1000}`, `{"messages": 8}` or
/// `{"fraction": 0.8}`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    /// Fires when estimated tokens reach the limit.
    Tokens(usize),
    /// Fires when the message count reaches the limit.
    Messages(usize),
    /// Fires when estimated tokens reach this fraction of the model context
    /// window. Skipped when the window is unknown.
    Fraction(f64),
}

impl Trigger {
    /// Whether this trigger alone is satisfied.
    #[must_use]
    pub fn is_satisfied(&self, size: ContextSize, model_context_limit: Option<usize>) -> bool {
        match *self {
            Self::Tokens(limit) => size.estimated_tokens >= limit,
            Self::Messages(limit) => size.message_count >= limit,
            Self::Fraction(fraction) => model_context_limit.is_some_and(|window| {
                #[allow(clippy::cast_precision_loss)]
                let threshold = fraction * window as f64;
                #[allow(clippy::cast_precision_loss)]
                let tokens = size.estimated_tokens as f64;
                tokens >= threshold
            }),
        }
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tokens(limit) => write!(f, "tokens >= {limit}"),
            Self::Messages(limit) => write!(f, "messages >= {limit}"),
            Self::Fraction(fraction) => write!(f, "tokens >= {fraction} of context window"),
        }
    }
}

/// First satisfied trigger, in configured order.
#[must_use]
pub fn fired_trigger(
    triggers: &[Trigger],
    size: ContextSize,
    model_context_limit: Option<usize>,
) -> Option<Trigger> {
    triggers
        .iter()
        .find(|t| t.is_satisfied(size, model_context_limit))
        .copied()
}

/// OR of every trigger. An empty set never fires.
#[must_use]
pub fn should_compact(
    triggers: &[Trigger],
    size: ContextSize,
    model_context_limit: Option<usize>,
) -> bool {
    fired_trigger(triggers, size, model_context_limit).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn size(message_count: usize, estimated_tokens: usize) -> ContextSize {
        ContextSize {
            message_count,
            estimated_tokens,
        }
    }

    #[test]
    fn test_or_semantics() {
        let triggers = [Trigger::Tokens(1000), Trigger::Messages(8)];

        assert!(should_compact(&triggers, size(9, 10), None));
        assert!(should_compact(&triggers, size(7, 1200), None));
        assert!(!should_compact(&triggers, size(5, 400), None));
    }

    #[test]
    fn test_limits_are_inclusive() {
        assert!(should_compact(&[Trigger::Messages(8)], size(8, 0), None));
        assert!(should_compact(&[Trigger::Tokens(100)], size(1, 100), None));
        assert!(!should_compact(&[Trigger::Tokens(100)], size(1, 99), None));
    }

    #[test]
    fn test_empty_trigger_set_never_fires() {
        assert!(!should_compact(&[], size(10_000, 10_000_000), Some(1)));
    }

    #[test]
    fn test_fraction_requires_known_window() {
        let triggers = [Trigger::Fraction(0.5)];

        assert!(!should_compact(&triggers, size(1, 1_000_000), None));
        assert!(should_compact(&triggers, size(1, 500), Some(1000)));
        assert!(!should_compact(&triggers, size(1, 499), Some(1000)));
    }

    #[test]
    fn test_evaluation_is_repeatable() {
        let triggers = [Trigger::Tokens(50), Trigger::Fraction(0.9)];
        let current = size(3, 60);

        let first = should_compact(&triggers, current, Some(100));
        let second = should_compact(&triggers, current, Some(100));
        assert_eq!(first, second);
    }

    #[test]
    fn test_fired_trigger_reports_first_match() {
        let triggers = [Trigger::Tokens(10), Trigger::Messages(2)];
        assert_eq!(
            fired_trigger(&triggers, size(5, 50), None),
            Some(Trigger::Tokens(10))
        );
        assert_eq!(
            fired_trigger(&triggers, size(5, 5), None),
            Some(Trigger::Messages(2))
        );
    }

    #[test]
    fn test_serde_shape() -> anyhow::Result<()> {
        let triggers: Vec<Trigger> =
            serde_json::from_str(r#"[{"tokens": 1000}, {"messages": 8}, {"fraction": 0.8}]"#)?;
        assert_eq!(
            triggers,
            vec![
                Trigger::Tokens(1000),
                Trigger::Messages(8),
                Trigger::Fraction(0.8)
            ]
        );
        Ok(())
    }
}
