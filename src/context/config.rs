//! Configuration for context compaction.

use super::retention::RetentionPolicy;
use super::trigger::Trigger;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Configuration for context compaction.
///
/// Triggers are OR-combined: compaction is attempted when any of them is
/// satisfied. An empty trigger list disables automatic compaction.
///
/// # Example
///
/// ```
/// use context_window::context::{CompactionConfig, RetentionPolicy, Trigger};
///
/// let config = CompactionConfig::new()
///     .with_trigger(Trigger::Tokens(1000))
///     .with_trigger(Trigger::Messages(8))
///     .with_retention(RetentionPolicy::Messages(6));
/// assert_eq!(config.triggers.len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompactionConfig {
    /// Ordered trigger set.
    #[serde(default)]
    pub triggers: Vec<Trigger>,

    /// How much recent history survives compaction.
    /// Default: last 6 messages
    #[serde(default)]
    pub retention: RetentionPolicy,

    /// Model context window in tokens, used by fraction triggers.
    /// When unset, the provider's advertised window is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_context_limit: Option<usize>,
}

impl CompactionConfig {
    /// Create a configuration with no triggers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON configuration.
    ///
    /// ```
    /// use context_window::context::CompactionConfig;
    ///
    /// let config = CompactionConfig::from_json(
    ///     r#"{"triggers": [{"tokens": 1000}, {"messages": 8}], "retention": {"messages": 6}}"#,
    /// ).unwrap();
    /// assert_eq!(config.triggers.len(), 2);
    /// ```
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed or fails validation.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).context("Failed to parse compaction config")?;
        config.validate()?;
        Ok(config)
    }

    /// Append a trigger.
    #[must_use]
    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.triggers.push(trigger);
        self
    }

    /// Set the retention policy.
    #[must_use]
    pub const fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    /// Set the model context window used by fraction triggers.
    #[must_use]
    pub const fn with_model_context_limit(mut self, tokens: usize) -> Self {
        self.model_context_limit = Some(tokens);
        self
    }

    /// Check limits and fractions.
    ///
    /// # Errors
    /// Returns an error for zero limits, zero retention or fractions outside
    /// `(0.0, 1.0]`.
    pub fn validate(&self) -> Result<()> {
        for trigger in &self.triggers {
            match *trigger {
                Trigger::Tokens(0) => bail!("Token trigger limit must be greater than zero"),
                Trigger::Messages(0) => bail!("Message trigger limit must be greater than zero"),
                Trigger::Fraction(f) if !valid_fraction(f) => {
                    bail!("Fraction trigger must be in (0.0, 1.0], got {f}")
                }
                _ => {}
            }
        }

        match self.retention {
            RetentionPolicy::Messages(0) => bail!("Retention must keep at least one message"),
            RetentionPolicy::Fraction(f) if !valid_fraction(f) => {
                bail!("Retention fraction must be in (0.0, 1.0], got {f}")
            }
            _ => {}
        }

        if self.model_context_limit == Some(0) {
            bail!("Model context limit must be greater than zero");
        }

        Ok(())
    }
}

fn valid_fraction(f: f64) -> bool {
    f > 0.0 && f <= 1.0
}
