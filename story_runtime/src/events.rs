//! Runtime events - what the runtime reports to its observers.

use serde::{Deserialize, Serialize};
use story_graph::NodeId;

use crate::runtime::Generation;

/// Why a playthrough ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    /// The current scene timed out with no choices to offer.
    NoChoices,
    /// The current node was deleted from the graph.
    MissingNode,
    /// The start node does not exist or is not a scene.
    InvalidStart,
}

/// Events emitted by the runtime, in the order they happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuntimeEvent {
    /// A playthrough began (or restarted).
    Started { start_node: NodeId },

    /// Play mode was left.
    Stopped,

    /// A scene became current.
    SceneEntered {
        scene: NodeId,
        generation: Generation,
        duration_ms: u64,
    },

    /// Countdown report for the current scene.
    Tick { scene: NodeId, remaining_ms: u64 },

    /// The current scene's countdown ran out.
    TimerExpired { scene: NodeId },

    /// A choice was resolved and its target scene committed.
    ChoiceResolved {
        choice: NodeId,
        from: NodeId,
        to: NodeId,
    },

    /// A choice was resolved (its effects applied) but its target is locked.
    ChoiceBlocked { choice: NodeId, target: NodeId },

    /// The playthrough reached its terminal state.
    GameOver {
        scene: Option<NodeId>,
        reason: GameOverReason,
    },
}

impl RuntimeEvent {
    /// Short event name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            RuntimeEvent::Started { .. } => "started",
            RuntimeEvent::Stopped => "stopped",
            RuntimeEvent::SceneEntered { .. } => "scene_entered",
            RuntimeEvent::Tick { .. } => "tick",
            RuntimeEvent::TimerExpired { .. } => "timer_expired",
            RuntimeEvent::ChoiceResolved { .. } => "choice_resolved",
            RuntimeEvent::ChoiceBlocked { .. } => "choice_blocked",
            RuntimeEvent::GameOver { .. } => "game_over",
        }
    }

    /// Check if this event changes which scene is current or ends play.
    pub fn is_transition(&self) -> bool {
        matches!(
            self,
            RuntimeEvent::SceneEntered { .. }
                | RuntimeEvent::GameOver { .. }
                | RuntimeEvent::Stopped
        )
    }
}
