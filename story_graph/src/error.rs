//! Errors raised while loading story definitions.

use thiserror::Error;

use crate::graph::NodeId;

/// Errors for the fallible, load-time surface of the story graph.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("project JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate node id: {0}")]
    DuplicateNode(NodeId),

    #[error("duplicate variable name: {0}")]
    DuplicateVariable(String),

    #[error("variable {name} has min {min} greater than max {max}")]
    InvalidBounds { name: String, min: i64, max: i64 },

    #[error("variable {name} starts at {initial_value}, outside its bounds")]
    InitialOutOfBounds { name: String, initial_value: i64 },

    #[error("start node not found: {0}")]
    UnknownStartNode(NodeId),
}
