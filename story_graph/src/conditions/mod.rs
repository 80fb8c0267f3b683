//! Condition evaluator: access rules for scenes.

use serde::{Deserialize, Serialize};

use crate::variables::Variable;

/// Comparison operators usable in a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOp {
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `==`
    Eq,
    /// `!=`
    Neq,
    /// `>=`
    Gte,
    /// `>`
    Gt,
}

impl ComparisonOp {
    /// Compare a variable's value (left) to the condition's value (right).
    pub fn compare(&self, lhs: i64, rhs: i64) -> bool {
        match self {
            ComparisonOp::Lt => lhs < rhs,
            ComparisonOp::Lte => lhs <= rhs,
            ComparisonOp::Eq => lhs == rhs,
            ComparisonOp::Neq => lhs != rhs,
            ComparisonOp::Gte => lhs >= rhs,
            ComparisonOp::Gt => lhs > rhs,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOp::Lt => "<",
            ComparisonOp::Lte => "<=",
            ComparisonOp::Eq => "==",
            ComparisonOp::Neq => "!=",
            ComparisonOp::Gte => ">=",
            ComparisonOp::Gt => ">",
        }
    }
}

impl std::fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A comparison between one variable and a constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub var_name: String,
    pub op: ComparisonOp,
    pub value: i64,
}

impl Condition {
    pub fn new(var_name: impl Into<String>, op: ComparisonOp, value: i64) -> Self {
        Self {
            var_name: var_name.into(),
            op,
            value,
        }
    }

    /// Check the condition against a list of variables.
    ///
    /// A condition on a variable that does not exist is `false`.
    pub fn is_satisfied(&self, variables: &[Variable]) -> bool {
        variables
            .iter()
            .find(|v| v.name == self.var_name)
            .is_some_and(|v| self.op.compare(v.value, self.value))
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.var_name, self.op, self.value)
    }
}

/// The access rule of a scene: one condition or a conjunction of several.
///
/// Deserializes from either a single condition object or an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionSet {
    Single(Condition),
    All(Vec<Condition>),
}

impl ConditionSet {
    /// View the set as a slice of conditions.
    pub fn conditions(&self) -> &[Condition] {
        match self {
            ConditionSet::Single(condition) => std::slice::from_ref(condition),
            ConditionSet::All(conditions) => conditions,
        }
    }

    /// Check that every condition holds. An empty set always holds.
    pub fn is_satisfied(&self, variables: &[Variable]) -> bool {
        self.conditions().iter().all(|c| c.is_satisfied(variables))
    }

    /// Names of the variables this set reads.
    pub fn referenced_variables(&self) -> impl Iterator<Item = &str> {
        self.conditions().iter().map(|c| c.var_name.as_str())
    }
}

impl From<Condition> for ConditionSet {
    fn from(condition: Condition) -> Self {
        ConditionSet::Single(condition)
    }
}

impl From<Vec<Condition>> for ConditionSet {
    fn from(conditions: Vec<Condition>) -> Self {
        ConditionSet::All(conditions)
    }
}

/// Evaluate an optional access rule. No rule means always accessible.
pub fn evaluate(variables: &[Variable], conditions: Option<&ConditionSet>) -> bool {
    conditions.map_or(true, |set| set.is_satisfied(variables))
}
