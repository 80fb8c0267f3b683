//! Variable store - the named counters that make up player/world state.

mod effects;

pub use effects::*;

use serde::{Deserialize, Serialize};

/// A bounded integer counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    /// Unique key within a store.
    pub name: String,
    pub value: i64,
    /// Value restored whenever a playthrough starts.
    pub initial_value: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
}

impl Variable {
    /// Create an unbounded variable whose current value is its initial value.
    pub fn new(name: impl Into<String>, initial_value: i64) -> Self {
        Self {
            name: name.into(),
            value: initial_value,
            initial_value,
            min: None,
            max: None,
        }
    }

    /// Set the lower bound.
    pub fn with_min(mut self, min: i64) -> Self {
        self.min = Some(min);
        self
    }

    /// Set the upper bound.
    pub fn with_max(mut self, max: i64) -> Self {
        self.max = Some(max);
        self
    }

    /// Set both bounds.
    pub fn with_bounds(self, min: i64, max: i64) -> Self {
        self.with_min(min).with_max(max)
    }

    /// Set the current value without touching the initial value.
    pub fn with_value(mut self, value: i64) -> Self {
        self.value = value;
        self
    }

    /// Clamp a candidate value into this variable's bounds.
    ///
    /// The lower bound is applied first; with well-formed bounds the order
    /// does not matter.
    pub fn clamp(&self, value: i64) -> i64 {
        let value = self.min.map_or(value, |min| value.max(min));
        self.max.map_or(value, |max| value.min(max))
    }

    /// Check that `min <= max` when both are present.
    pub fn has_valid_bounds(&self) -> bool {
        match (self.min, self.max) {
            (Some(min), Some(max)) => min <= max,
            _ => true,
        }
    }
}

/// Ordered collection of variables, keyed by name.
///
/// Mutation during play happens only through [`VariableStore::with_effects`]
/// and [`VariableStore::reset_to_initial`], which return new stores and leave
/// the original untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableStore {
    variables: Vec<Variable>,
}

impl VariableStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a variable by name.
    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Get the current value of a variable.
    pub fn value_of(&self, name: &str) -> Option<i64> {
        self.get(name).map(|v| v.value)
    }

    /// Define a variable, replacing any existing definition with the same name.
    ///
    /// Returns the replaced definition.
    pub fn define(&mut self, variable: Variable) -> Option<Variable> {
        match self.variables.iter_mut().find(|v| v.name == variable.name) {
            Some(existing) => Some(std::mem::replace(existing, variable)),
            None => {
                self.variables.push(variable);
                None
            }
        }
    }

    /// Remove a variable definition.
    pub fn remove(&mut self, name: &str) -> Option<Variable> {
        let index = self.variables.iter().position(|v| v.name == name)?;
        Some(self.variables.remove(index))
    }

    /// Check if a variable is defined.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate over variables in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }

    pub fn as_slice(&self) -> &[Variable] {
        &self.variables
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Apply a choice's deltas, producing a new store.
    pub fn with_effects(&self, effects: &Effects) -> Self {
        Self {
            variables: apply_effects(&self.variables, effects),
        }
    }

    /// Restore every variable to its initial value, producing a new store.
    pub fn reset_to_initial(&self) -> Self {
        Self {
            variables: reset_to_initial(&self.variables),
        }
    }
}

impl AsRef<[Variable]> for VariableStore {
    fn as_ref(&self) -> &[Variable] {
        &self.variables
    }
}

impl FromIterator<Variable> for VariableStore {
    fn from_iter<T: IntoIterator<Item = Variable>>(iter: T) -> Self {
        let mut store = Self::new();
        for variable in iter {
            store.define(variable);
        }
        store
    }
}

impl<'a> IntoIterator for &'a VariableStore {
    type Item = &'a Variable;
    type IntoIter = std::slice::Iter<'a, Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.variables.iter()
    }
}
