//! # Story Runtime
//!
//! Plays a story graph. This crate reads the definitions in `story_graph`,
//! tracks where the player is, runs scene timers, and resolves choices into
//! variable changes and scene transitions.
//!
//! ## Core Components
//!
//! - **runtime**: The play-mode state machine and its generation-tagged scheduler
//! - **events**: What the runtime reports to observers
//! - **config**: Runtime tuning, loadable from TOML
//! - **playback**: Async driver that runs the runtime's clock on tokio
//!
//! ## Design Philosophy
//!
//! - **No failure paths during play**: Malformed graphs degrade to no-ops; game over is a normal state
//! - **One owner of time**: Only node entry creates timers, and it always cancels the previous ones first
//! - **Observers read, actions write**: UI code reads snapshots and calls `start`, `stop`, `reset`, `resolve_choice`

pub mod config;
pub mod error;
pub mod events;
pub mod playback;
pub mod runtime;

pub use config::*;
pub use error::*;
pub use events::*;
pub use playback::*;
pub use runtime::*;
