//! Runtime error types.

use story_graph::GraphError;
use thiserror::Error;

/// Errors from loading a runtime. Playing never fails.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),
}
