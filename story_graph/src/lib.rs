//! # Story Graph
//!
//! The authored half of an interactive story: variables, access conditions,
//! choice effects, and the directed graph of scenes and choices.
//! This crate holds no play state and no timers; it is the single source of
//! truth the runtime reads from.
//!
//! ## Core Components
//!
//! - **variables**: Bounded integer counters and the pure effect transforms
//! - **conditions**: Comparison predicates gating scene access
//! - **graph**: Scene/choice nodes, edges, and the `GraphStore` query surface
//! - **project**: The durable definitions that round-trip through JSON

pub mod conditions;
pub mod error;
pub mod graph;
pub mod project;
pub mod variables;

pub use conditions::*;
pub use error::*;
pub use graph::*;
pub use project::*;
pub use variables::*;
