//! Story project - the durable definitions behind a playthrough.
//!
//! Only the graph and the variable definitions are stored. Play-session state
//! (current node, game over, live variable values) never is.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::GraphError;
use crate::graph::{Edge, NodeId, StoryGraph, StoryNode};
use crate::variables::{Variable, VariableStore};

/// Import/export shape of a story.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryProject {
    pub name: String,

    /// Scene a playthrough starts from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_node_id: Option<NodeId>,

    #[serde(default)]
    pub variables: Vec<Variable>,

    #[serde(default)]
    pub nodes: Vec<StoryNode>,

    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl StoryProject {
    /// Create an empty project.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Capture a graph and its variable definitions.
    ///
    /// Nodes are ordered by ID and edges by source, so exports are stable.
    pub fn from_parts(
        name: impl Into<String>,
        start_node_id: Option<NodeId>,
        graph: &StoryGraph,
        variables: &VariableStore,
    ) -> Self {
        let mut nodes: Vec<StoryNode> = graph.nodes().cloned().collect();
        nodes.sort_by(|a, b| a.id().cmp(b.id()));

        Self {
            name: name.into(),
            start_node_id,
            variables: variables.reset_to_initial().iter().cloned().collect(),
            nodes,
            edges: graph.edges_by_source().into_iter().cloned().collect(),
        }
    }

    /// Parse a project from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the project as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the definitions can be loaded.
    ///
    /// Graph shape problems are not errors here; see [`StoryGraph::validate`].
    pub fn check(&self) -> Result<(), GraphError> {
        let mut node_ids = HashSet::new();
        for node in &self.nodes {
            if !node_ids.insert(node.id()) {
                return Err(GraphError::DuplicateNode(node.id().clone()));
            }
        }

        let mut names = HashSet::new();
        for variable in &self.variables {
            if !names.insert(variable.name.as_str()) {
                return Err(GraphError::DuplicateVariable(variable.name.clone()));
            }
            if let (Some(min), Some(max)) = (variable.min, variable.max) {
                if min > max {
                    return Err(GraphError::InvalidBounds {
                        name: variable.name.clone(),
                        min,
                        max,
                    });
                }
            }
            if variable.clamp(variable.initial_value) != variable.initial_value {
                return Err(GraphError::InitialOutOfBounds {
                    name: variable.name.clone(),
                    initial_value: variable.initial_value,
                });
            }
        }

        if let Some(start) = &self.start_node_id {
            if !node_ids.contains(start) {
                return Err(GraphError::UnknownStartNode(start.clone()));
            }
        }

        Ok(())
    }

    /// Build the graph and variable store a runtime plays from.
    ///
    /// Variables start at their initial values.
    pub fn into_parts(self) -> Result<(StoryGraph, VariableStore), GraphError> {
        self.check()?;

        let mut graph = StoryGraph::new();
        for node in self.nodes {
            graph.add_node(node);
        }
        for edge in self.edges {
            graph.add_edge(edge);
        }

        let variables: VariableStore = self.variables.into_iter().collect();

        tracing::debug!(
            project = %self.name,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            variables = variables.len(),
            "loaded story project"
        );

        Ok((graph, variables.reset_to_initial()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::{ComparisonOp, Condition};
    use crate::graph::{ChoiceNode, GraphStore, SceneNode};

    const PROJECT_JSON: &str = r#"{
        "name": "Bridge",
        "startNodeId": "S1",
        "variables": [
            {"name": "energy", "value": 4, "initialValue": 1, "min": 0, "max": 5}
        ],
        "nodes": [
            {"type": "scene", "id": "S1", "label": "Bridge", "durationSec": 5, "defaultChoiceId": "C1"},
            {"type": "choice", "id": "C1", "label": "Cross", "effects": {"energy": -1}},
            {"type": "scene", "id": "S2", "label": "Far side",
             "condition": {"varName": "energy", "op": "gte", "value": 3}}
        ],
        "edges": [
            {"id": "e1", "source": "S1", "target": "C1"},
            {"id": "e2", "source": "C1", "target": "S2"}
        ]
    }"#;

    #[test]
    fn test_load_project() {
        let project = StoryProject::from_json_str(PROJECT_JSON).unwrap();
        assert_eq!(project.start_node_id, Some(NodeId::from("S1")));

        let (graph, variables) = project.into_parts().unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_target(&NodeId::from("C1")), Some(NodeId::from("S2")));

        // Stored live values are discarded in favour of initial values
        assert_eq!(variables.value_of("energy"), Some(1));
    }

    #[test]
    fn test_round_trip_definitions() {
        let mut graph = StoryGraph::new();
        graph.add_node(
            SceneNode::new("S1", "Start")
                .with_duration(2.0)
                .with_condition(Condition::new("gold", ComparisonOp::Lt, 10)),
        );
        graph.add_node(ChoiceNode::new("C1", "Buy").with_effect("gold", -3));
        graph.add_node(SceneNode::new("S2", "Shop"));
        graph.add_edge(Edge::with_id("e1", "S1", "C1"));
        graph.add_edge(Edge::with_id("e2", "C1", "S2"));

        let variables: VariableStore = [Variable::new("gold", 5).with_value(2)].into_iter().collect();

        let project = StoryProject::from_parts("Shop", Some(NodeId::from("S1")), &graph, &variables);
        let json = project.to_json_string().unwrap();
        let restored = StoryProject::from_json_str(&json).unwrap();

        assert_eq!(restored, project);
        assert_eq!(restored.variables[0].value, 5);
        assert!(!json.contains("currentNodeId"));
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let mut project = StoryProject::new("Dup");
        project.nodes.push(SceneNode::new("S1", "A").into());
        project.nodes.push(SceneNode::new("S1", "B").into());

        assert!(matches!(project.check(), Err(GraphError::DuplicateNode(id)) if id.as_str() == "S1"));
    }

    #[test]
    fn test_invalid_variables_rejected() {
        let mut project = StoryProject::new("Vars");
        project.variables.push(Variable::new("energy", 0).with_bounds(5, 1));
        assert!(matches!(project.check(), Err(GraphError::InvalidBounds { .. })));

        let mut project = StoryProject::new("Vars");
        project.variables.push(Variable::new("energy", 0));
        project.variables.push(Variable::new("energy", 1));
        assert!(matches!(project.check(), Err(GraphError::DuplicateVariable(_))));

        let mut project = StoryProject::new("Vars");
        project.variables.push(Variable::new("energy", 10).with_bounds(0, 5));
        assert!(matches!(
            project.check(),
            Err(GraphError::InitialOutOfBounds { initial_value: 10, .. })
        ));
    }

    #[test]
    fn test_unknown_start_node() {
        let mut project = StoryProject::new("Empty");
        project.start_node_id = Some(NodeId::from("S9"));
        assert!(matches!(project.into_parts(), Err(GraphError::UnknownStartNode(_))));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            StoryProject::from_json_str("{not json"),
            Err(GraphError::Json(_))
        ));
    }
}
