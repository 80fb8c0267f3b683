//! Runtime configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::RuntimeError;

/// What to do when a timer fires for a node the editor has since deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingNodePolicy {
    /// End the playthrough.
    #[default]
    EndGame,
    /// Drop the timer task and keep waiting.
    Ignore,
}

/// Configuration for the story runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Interval between countdown ticks reported to observers.
    pub tick_interval_ms: u64,

    /// Behavior when the current node disappears mid-playthrough.
    pub missing_node_policy: MissingNodePolicy,

    /// Maximum immediate-scene resolutions per clock advance.
    pub max_chained_transitions: usize,

    /// Events kept for `drain_events`; the oldest are dropped beyond this.
    pub event_buffer_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            missing_node_policy: MissingNodePolicy::EndGame,
            max_chained_transitions: 256,
            event_buffer_capacity: 1024,
        }
    }
}

impl RuntimeConfig {
    /// Parse and validate a TOML configuration. Absent keys take defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, RuntimeError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the scheduler cannot work with.
    pub fn validate(&self) -> Result<(), RuntimeError> {
        if self.tick_interval_ms == 0 {
            return Err(RuntimeError::InvalidConfig(
                "tick_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.max_chained_transitions == 0 {
            return Err(RuntimeError::InvalidConfig(
                "max_chained_transitions must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.tick_interval(), Duration::from_millis(100));
        assert_eq!(config.missing_node_policy, MissingNodePolicy::EndGame);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            tick_interval_ms = 250
            missing_node_policy = "ignore"
            "#,
        )
        .unwrap();

        assert_eq!(config.tick_interval_ms, 250);
        assert_eq!(config.missing_node_policy, MissingNodePolicy::Ignore);
        assert_eq!(config.max_chained_transitions, 256);
    }

    #[test]
    fn test_from_toml_empty() {
        assert_eq!(RuntimeConfig::from_toml_str("").unwrap(), RuntimeConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            RuntimeConfig::from_toml_str("tick_interval_ms = 0"),
            Err(RuntimeError::InvalidConfig(_))
        ));
        assert!(matches!(
            RuntimeConfig::from_toml_str("max_chained_transitions = 0"),
            Err(RuntimeError::InvalidConfig(_))
        ));
        assert!(matches!(
            RuntimeConfig::from_toml_str("tick_interval_ms = \"fast\""),
            Err(RuntimeError::Config(_))
        ));
    }
}
