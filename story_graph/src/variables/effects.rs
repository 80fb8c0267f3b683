//! Effect applier - pure transforms over a list of variables.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::Variable;

/// Variable deltas carried by a choice. Unlisted names have a delta of 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Effects(HashMap<String, i64>);

impl Effects {
    /// Create an empty effect set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or overwrite) the delta for a variable.
    pub fn with(mut self, name: impl Into<String>, delta: i64) -> Self {
        self.0.insert(name.into(), delta);
        self
    }

    /// Get the delta for a variable, 0 when unlisted.
    pub fn delta_for(&self, name: &str) -> i64 {
        self.0.get(name).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Apply deltas to every variable, clamping to bounds.
///
/// Returns a new list; `variables` is never modified. Variables with a zero
/// delta are copied unchanged and effect keys with no matching variable are
/// ignored.
pub fn apply_effects(variables: &[Variable], effects: &Effects) -> Vec<Variable> {
    variables
        .iter()
        .map(|variable| match effects.delta_for(&variable.name) {
            0 => variable.clone(),
            delta => Variable {
                value: variable.clamp(variable.value.saturating_add(delta)),
                ..variable.clone()
            },
        })
        .collect()
}

/// Restore every variable to its initial value, clamped to bounds.
pub fn reset_to_initial(variables: &[Variable]) -> Vec<Variable> {
    variables
        .iter()
        .map(|variable| Variable {
            value: variable.clamp(variable.initial_value),
            ..variable.clone()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_variables() -> Vec<Variable> {
        vec![
            Variable::new("energy", 1).with_bounds(0, 5),
            Variable::new("gold", 10),
            Variable::new("trust", 0).with_min(-3),
        ]
    }

    #[test]
    fn test_apply_single_delta() {
        let vars = sample_variables();
        let next = apply_effects(&vars, &Effects::new().with("gold", 5));

        assert_eq!(next[1].value, 15);
        // Other variables are unchanged
        assert_eq!(next[0], vars[0]);
        assert_eq!(next[2], vars[2]);
    }

    #[test]
    fn test_apply_clamps_to_bounds() {
        let vars = sample_variables();

        let over = apply_effects(&vars, &Effects::new().with("energy", 10));
        assert_eq!(over[0].value, 5);

        let under = apply_effects(&vars, &Effects::new().with("energy", -10).with("trust", -10));
        assert_eq!(under[0].value, 0);
        assert_eq!(under[2].value, -3);
    }

    #[test]
    fn test_clamp_matches_property_for_every_variable() {
        let vars = sample_variables();

        for var in &vars {
            for delta in [-100, -1, 1, 3, 100] {
                let next = apply_effects(&vars, &Effects::new().with(var.name.clone(), delta));
                let changed = next.iter().find(|v| v.name == var.name).unwrap();
                assert_eq!(changed.value, var.clamp(var.value + delta));

                for (before, after) in vars.iter().zip(&next) {
                    if before.name != var.name {
                        assert_eq!(before, after);
                    }
                }
            }
        }
    }

    #[test]
    fn test_unknown_effect_keys_ignored() {
        let vars = sample_variables();
        let next = apply_effects(&vars, &Effects::new().with("mana", 4));
        assert_eq!(next, vars);
    }

    #[test]
    fn test_saturating_add() {
        let vars = vec![Variable::new("big", i64::MAX - 1)];
        let next = apply_effects(&vars, &Effects::new().with("big", 10));
        assert_eq!(next[0].value, i64::MAX);
    }

    #[test]
    fn test_reset_to_initial_is_idempotent() {
        let vars = apply_effects(
            &sample_variables(),
            &Effects::new().with("energy", 3).with("gold", -4),
        );

        let once = reset_to_initial(&vars);
        let twice = reset_to_initial(&once);

        assert_eq!(once, twice);
        assert!(once.iter().all(|v| v.value == v.initial_value));
    }

    #[test]
    fn test_reset_clamps_initial_value() {
        let vars = vec![Variable::new("energy", 10).with_bounds(0, 5).with_value(2)];
        let reset = reset_to_initial(&vars);
        assert_eq!(reset[0].value, 5);
        assert_eq!(reset_to_initial(&reset), reset);
    }

    #[test]
    fn test_effects_deserialize_from_map() {
        let effects: Effects = serde_json::from_str(r#"{"energy": -2, "gold": 3}"#).unwrap();
        assert_eq!(effects.delta_for("energy"), -2);
        assert_eq!(effects.delta_for("gold"), 3);
        assert_eq!(effects.delta_for("trust"), 0);
    }
}
