//! Node definitions - scenes and the choices between them.

use serde::{Deserialize, Serialize};

use super::NodeId;
use crate::conditions::ConditionSet;
use crate::variables::Effects;

/// A content node: shown for `duration_sec`, then resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneNode {
    pub id: NodeId,
    pub label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Seconds before the timeout handler runs. 0 resolves immediately.
    #[serde(default)]
    pub duration_sec: f64,

    /// Access rule checked when a choice leads here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionSet>,

    /// Choice taken automatically when the timer runs out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_choice_id: Option<NodeId>,

    /// Opaque reference into the video subsystem.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_segment_id: Option<String>,
}

impl SceneNode {
    /// Create an immediate scene with no condition.
    pub fn new(id: impl Into<NodeId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            duration_sec: 0.0,
            condition: None,
            default_choice_id: None,
            video_segment_id: None,
        }
    }

    /// Set the duration in seconds.
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_sec = seconds;
        self
    }

    /// Set the access rule.
    pub fn with_condition(mut self, condition: impl Into<ConditionSet>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Set the default choice.
    pub fn with_default_choice(mut self, choice_id: impl Into<NodeId>) -> Self {
        self.default_choice_id = Some(choice_id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_video_segment(mut self, segment_id: impl Into<String>) -> Self {
        self.video_segment_id = Some(segment_id.into());
        self
    }

    /// Whether the duration is a usable, non-negative number of seconds.
    pub fn has_valid_duration(&self) -> bool {
        self.duration_sec.is_finite() && self.duration_sec >= 0.0
    }

    /// Duration in whole milliseconds. Negative or non-finite durations are 0,
    /// and any positive duration is at least 1ms.
    pub fn duration_ms(&self) -> u64 {
        if !self.has_valid_duration() || self.duration_sec == 0.0 {
            return 0;
        }
        ((self.duration_sec * 1000.0).round() as u64).max(1)
    }

    /// Check if this scene resolves without a visible timer.
    pub fn is_immediate(&self) -> bool {
        self.duration_ms() == 0
    }
}

/// A player decision leading from one scene to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceNode {
    pub id: NodeId,
    pub label: String,

    /// Deltas applied when the choice is resolved.
    #[serde(default)]
    pub effects: Effects,
}

impl ChoiceNode {
    pub fn new(id: impl Into<NodeId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            effects: Effects::new(),
        }
    }

    /// Add a delta for one variable.
    pub fn with_effect(mut self, name: impl Into<String>, delta: i64) -> Self {
        self.effects = self.effects.with(name, delta);
        self
    }

    pub fn with_effects(mut self, effects: Effects) -> Self {
        self.effects = effects;
        self
    }
}

/// Any node in the story graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoryNode {
    Scene(SceneNode),
    Choice(ChoiceNode),
}

impl StoryNode {
    pub fn id(&self) -> &NodeId {
        match self {
            StoryNode::Scene(scene) => &scene.id,
            StoryNode::Choice(choice) => &choice.id,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            StoryNode::Scene(scene) => &scene.label,
            StoryNode::Choice(choice) => &choice.label,
        }
    }

    pub fn as_scene(&self) -> Option<&SceneNode> {
        match self {
            StoryNode::Scene(scene) => Some(scene),
            StoryNode::Choice(_) => None,
        }
    }

    pub fn as_choice(&self) -> Option<&ChoiceNode> {
        match self {
            StoryNode::Choice(choice) => Some(choice),
            StoryNode::Scene(_) => None,
        }
    }

    pub fn into_scene(self) -> Option<SceneNode> {
        match self {
            StoryNode::Scene(scene) => Some(scene),
            StoryNode::Choice(_) => None,
        }
    }

    pub fn into_choice(self) -> Option<ChoiceNode> {
        match self {
            StoryNode::Choice(choice) => Some(choice),
            StoryNode::Scene(_) => None,
        }
    }

    pub fn is_scene(&self) -> bool {
        matches!(self, StoryNode::Scene(_))
    }

    pub fn is_choice(&self) -> bool {
        matches!(self, StoryNode::Choice(_))
    }
}

impl From<SceneNode> for StoryNode {
    fn from(scene: SceneNode) -> Self {
        StoryNode::Scene(scene)
    }
}

impl From<ChoiceNode> for StoryNode {
    fn from(choice: ChoiceNode) -> Self {
        StoryNode::Choice(choice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::{ComparisonOp, Condition};

    #[test]
    fn test_scene_builder() {
        let scene = SceneNode::new("S1", "The bridge")
            .with_duration(5.0)
            .with_default_choice("C1")
            .with_condition(Condition::new("energy", ComparisonOp::Gte, 3))
            .with_video_segment("seg-7")
            .with_description("A rope bridge over the gorge");

        assert_eq!(scene.id.as_str(), "S1");
        assert_eq!(scene.description.as_deref(), Some("A rope bridge over the gorge"));
        assert_eq!(scene.duration_ms(), 5000);
        assert!(!scene.is_immediate());
        assert_eq!(scene.default_choice_id, Some(NodeId::from("C1")));
        assert!(scene.condition.is_some());
    }

    #[test]
    fn test_scene_duration_edge_cases() {
        assert!(SceneNode::new("a", "A").is_immediate());
        assert_eq!(SceneNode::new("b", "B").with_duration(0.25).duration_ms(), 250);

        let negative = SceneNode::new("c", "C").with_duration(-3.0);
        assert!(!negative.has_valid_duration());
        assert_eq!(negative.duration_ms(), 0);

        let nan = SceneNode::new("d", "D").with_duration(f64::NAN);
        assert!(nan.is_immediate());

        let tiny = SceneNode::new("e", "E").with_duration(0.0001);
        assert_eq!(tiny.duration_ms(), 1);
        assert!(!tiny.is_immediate());
    }

    #[test]
    fn test_choice_builder() {
        let choice = ChoiceNode::new("C1", "Run")
            .with_effect("energy", -2)
            .with_effect("courage", 1);

        assert_eq!(choice.effects.delta_for("energy"), -2);
        assert_eq!(choice.effects.delta_for("courage"), 1);
        assert_eq!(choice.effects.delta_for("gold"), 0);
    }

    #[test]
    fn test_story_node_accessors() {
        let scene: StoryNode = SceneNode::new("S1", "Start").into();
        let choice: StoryNode = ChoiceNode::new("C1", "Go").into();

        assert!(scene.is_scene());
        assert!(choice.is_choice());
        assert_eq!(scene.id().as_str(), "S1");
        assert_eq!(choice.label(), "Go");
        assert!(scene.as_choice().is_none());
        assert!(choice.clone().into_choice().is_some());
    }

    #[test]
    fn test_story_node_tagged_json() {
        let json = r#"{
            "type": "scene",
            "id": "S1",
            "label": "Intro",
            "durationSec": 2.5,
            "defaultChoiceId": "C1",
            "condition": [{"varName": "energy", "op": "gt", "value": 0}]
        }"#;
        let node: StoryNode = serde_json::from_str(json).unwrap();
        let scene = node.as_scene().unwrap();
        assert_eq!(scene.duration_ms(), 2500);
        assert_eq!(scene.condition.as_ref().unwrap().conditions().len(), 1);

        let choice: StoryNode =
            serde_json::from_str(r#"{"type": "choice", "id": "C1", "label": "Go"}"#).unwrap();
        assert!(choice.as_choice().unwrap().effects.is_empty());

        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["type"], "scene");
    }
}
