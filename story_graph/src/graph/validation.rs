//! Well-formedness report for a story graph.
//!
//! The runtime never requires a valid graph; malformed shapes degrade to
//! no-ops during play. This report exists so the editor can show authors
//! what will not behave as intended.

use super::{EdgeId, NodeId, StoryGraph, StoryNode};

/// A structural problem found in the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphIssue {
    /// An edge points at (or from) a node that does not exist.
    DanglingEdge { edge: EdgeId, missing: NodeId },

    /// A choice must be offered by exactly one scene. Edges from other
    /// choices do not count.
    ChoiceIncomingCount { choice: NodeId, count: usize },

    /// A choice must lead to exactly one scene.
    ChoiceOutgoingCount { choice: NodeId, count: usize },

    /// A choice leads to another choice.
    ChoiceTargetNotScene { choice: NodeId, target: NodeId },

    /// The default choice is not among the scene's outgoing choices.
    DefaultChoiceNotOffered { scene: NodeId, choice: NodeId },

    /// Negative or non-finite duration.
    InvalidDuration { scene: NodeId, duration_sec: f64 },
}

impl std::fmt::Display for GraphIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphIssue::DanglingEdge { edge, missing } => {
                write!(f, "edge {} references missing node {}", edge, missing)
            }
            GraphIssue::ChoiceIncomingCount { choice, count } => {
                write!(f, "choice {} has {} incoming edges, expected 1", choice, count)
            }
            GraphIssue::ChoiceOutgoingCount { choice, count } => {
                write!(f, "choice {} has {} outgoing edges, expected 1", choice, count)
            }
            GraphIssue::ChoiceTargetNotScene { choice, target } => {
                write!(f, "choice {} leads to {}, which is not a scene", choice, target)
            }
            GraphIssue::DefaultChoiceNotOffered { scene, choice } => {
                write!(f, "scene {} defaults to {}, which it does not offer", scene, choice)
            }
            GraphIssue::InvalidDuration { scene, duration_sec } => {
                write!(f, "scene {} has invalid duration {}", scene, duration_sec)
            }
        }
    }
}

impl StoryGraph {
    /// Collect every structural issue, in a stable order.
    pub fn validate(&self) -> Vec<GraphIssue> {
        let mut issues = Vec::new();

        let mut edges: Vec<_> = self.edges().collect();
        edges.sort_by(|a, b| a.id.cmp(&b.id));
        for edge in edges {
            for endpoint in [&edge.source, &edge.target] {
                if !self.contains(endpoint.as_str()) {
                    issues.push(GraphIssue::DanglingEdge {
                        edge: edge.id.clone(),
                        missing: endpoint.clone(),
                    });
                }
            }
        }

        let mut nodes: Vec<_> = self.nodes().collect();
        nodes.sort_by(|a, b| a.id().cmp(b.id()));
        for node in nodes {
            match node {
                StoryNode::Scene(scene) => {
                    if !scene.has_valid_duration() {
                        issues.push(GraphIssue::InvalidDuration {
                            scene: scene.id.clone(),
                            duration_sec: scene.duration_sec,
                        });
                    }
                    if let Some(default) = &scene.default_choice_id {
                        let offered = self
                            .choices_of(scene.id.as_str())
                            .iter()
                            .any(|c| &c.id == default);
                        if !offered {
                            issues.push(GraphIssue::DefaultChoiceNotOffered {
                                scene: scene.id.clone(),
                                choice: default.clone(),
                            });
                        }
                    }
                }
                StoryNode::Choice(choice) => {
                    let incoming = self
                        .incoming_edges(choice.id.as_str())
                        .filter(|edge| self.get_node(edge.source.as_str()).is_some_and(StoryNode::is_scene))
                        .count();
                    if incoming != 1 {
                        issues.push(GraphIssue::ChoiceIncomingCount {
                            choice: choice.id.clone(),
                            count: incoming,
                        });
                    }

                    let outgoing: Vec<_> = self.outgoing_edges(choice.id.as_str()).collect();
                    if outgoing.len() != 1 {
                        issues.push(GraphIssue::ChoiceOutgoingCount {
                            choice: choice.id.clone(),
                            count: outgoing.len(),
                        });
                    }
                    for edge in outgoing {
                        if self.get_node(edge.target.as_str()).is_some_and(StoryNode::is_choice) {
                            issues.push(GraphIssue::ChoiceTargetNotScene {
                                choice: choice.id.clone(),
                                target: edge.target.clone(),
                            });
                        }
                    }
                }
            }
        }

        issues
    }

    /// Check if the graph has no structural issues.
    pub fn is_well_formed(&self) -> bool {
        self.validate().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ChoiceNode, Edge, SceneNode};

    fn well_formed() -> StoryGraph {
        let mut graph = StoryGraph::new();
        graph.add_node(SceneNode::new("S1", "Start").with_duration(3.0).with_default_choice("C1"));
        graph.add_node(ChoiceNode::new("C1", "Onward"));
        graph.add_node(SceneNode::new("S2", "End"));
        graph.add_edge(Edge::with_id("e1", "S1", "C1"));
        graph.add_edge(Edge::with_id("e2", "C1", "S2"));
        graph
    }

    #[test]
    fn test_well_formed_graph() {
        assert!(well_formed().is_well_formed());
    }

    #[test]
    fn test_dangling_edge() {
        let mut graph = well_formed();
        graph.add_edge(Edge::with_id("e3", "S2", "ghost"));

        let issues = graph.validate();
        assert_eq!(
            issues,
            vec![GraphIssue::DanglingEdge {
                edge: EdgeId::from("e3"),
                missing: NodeId::from("ghost"),
            }]
        );
        assert!(issues[0].to_string().contains("ghost"));
    }

    #[test]
    fn test_choice_shape() {
        let mut graph = well_formed();
        graph.add_node(ChoiceNode::new("C2", "Orphan"));
        graph.add_node(ChoiceNode::new("C3", "Chained"));
        graph.add_edge(Edge::with_id("e4", "S1", "C3"));
        graph.add_edge(Edge::with_id("e5", "C3", "C2"));

        let issues = graph.validate();
        assert!(issues.contains(&GraphIssue::ChoiceIncomingCount {
            choice: NodeId::from("C2"),
            count: 0,
        }));
        assert!(issues.contains(&GraphIssue::ChoiceOutgoingCount {
            choice: NodeId::from("C2"),
            count: 0,
        }));
        assert!(issues.contains(&GraphIssue::ChoiceTargetNotScene {
            choice: NodeId::from("C3"),
            target: NodeId::from("C2"),
        }));
    }

    #[test]
    fn test_choice_offered_by_scene_and_choice() {
        let mut graph = well_formed();
        graph.add_node(ChoiceNode::new("C4", "Shortcut"));
        graph.add_edge(Edge::with_id("e6", "S2", "C4"));
        graph.add_edge(Edge::with_id("e7", "C4", "C1"));

        let issues = graph.validate();
        // C1 is still offered by S1 only
        assert!(!issues
            .iter()
            .any(|issue| matches!(issue, GraphIssue::ChoiceIncomingCount { choice, .. } if choice.as_str() == "C1")));
        assert!(issues.contains(&GraphIssue::ChoiceTargetNotScene {
            choice: NodeId::from("C4"),
            target: NodeId::from("C1"),
        }));
    }

    #[test]
    fn test_default_choice_not_offered() {
        let mut graph = well_formed();
        graph.remove_edge(&EdgeId::from("e1"));

        let issues = graph.validate();
        assert!(issues.contains(&GraphIssue::DefaultChoiceNotOffered {
            scene: NodeId::from("S1"),
            choice: NodeId::from("C1"),
        }));
    }

    #[test]
    fn test_invalid_duration() {
        let mut graph = well_formed();
        graph.add_node(SceneNode::new("S3", "Broken").with_duration(-1.0));

        let issues = graph.validate();
        assert!(matches!(
            issues.as_slice(),
            [GraphIssue::InvalidDuration { scene, .. }] if scene.as_str() == "S3"
        ));
    }
}
