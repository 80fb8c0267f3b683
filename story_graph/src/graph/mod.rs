//! Story graph - scene and choice nodes joined by directed edges.
//!
//! The graph consists of:
//! - **Scenes**: Timed content nodes with optional access conditions
//! - **Choices**: Decision nodes carrying variable effects
//! - **Edges**: Scene -> Choice and Choice -> Scene links
//!
//! The runtime only ever reads the graph, through the [`GraphStore`] trait.

mod node;
mod validation;

pub use node::*;
pub use validation::*;

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

/// Unique identifier for nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a new random node ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&NodeId> for NodeId {
    fn from(id: &NodeId) -> Self {
        id.clone()
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for edges.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub String);

impl EdgeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a new random edge ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EdgeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A directed link between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
}

impl Edge {
    /// Create an edge with a generated ID.
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self::with_id(EdgeId::generate(), source, target)
    }

    pub fn with_id(id: impl Into<EdgeId>, source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
        }
    }
}

impl From<String> for EdgeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Structural queries the runtime makes against the graph.
///
/// Every query may report "not found" at any time: the editor can delete
/// nodes and edges while a playthrough is running. Results are owned so the
/// trait can sit in front of a lock.
pub trait GraphStore {
    /// Get a node by ID.
    fn node(&self, id: &NodeId) -> Option<StoryNode>;

    /// All choices reachable by a single edge from `scene_id`.
    fn outgoing_choices(&self, scene_id: &NodeId) -> Vec<ChoiceNode>;

    /// Target of the node's (first) outgoing edge.
    fn edge_target(&self, node_id: &NodeId) -> Option<NodeId>;

    /// Source of the node's (first) incoming edge.
    fn edge_source(&self, node_id: &NodeId) -> Option<NodeId>;
}

/// The in-memory story graph.
#[derive(Debug, Clone, Default)]
pub struct StoryGraph {
    /// All nodes stored by ID.
    nodes: HashMap<NodeId, StoryNode>,

    /// All edges stored by ID.
    edges: HashMap<EdgeId, Edge>,

    /// Index: source node -> edges leaving it, in insertion order.
    outgoing: HashMap<NodeId, Vec<EdgeId>>,

    /// Index: target node -> edges entering it, in insertion order.
    incoming: HashMap<NodeId, Vec<EdgeId>>,
}

/// A graph the editor and a running playthrough can share.
pub type SharedGraph = Arc<RwLock<StoryGraph>>;

impl StoryGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap the graph for shared editor/runtime access.
    pub fn into_shared(self) -> SharedGraph {
        Arc::new(RwLock::new(self))
    }

    /// Add a node, replacing any node with the same ID.
    ///
    /// Edges attached to a replaced node are kept.
    pub fn add_node(&mut self, node: impl Into<StoryNode>) -> NodeId {
        let node = node.into();
        let id = node.id().clone();
        self.nodes.insert(id.clone(), node);
        id
    }

    /// Remove a node and every edge attached to it.
    pub fn remove_node(&mut self, id: &NodeId) -> Option<StoryNode> {
        let node = self.nodes.remove(id)?;

        let attached: Vec<EdgeId> = self
            .outgoing
            .get(id)
            .into_iter()
            .chain(self.incoming.get(id))
            .flatten()
            .cloned()
            .collect();
        for edge_id in &attached {
            self.remove_edge(edge_id);
        }

        tracing::debug!(node = %id, edges = attached.len(), "removed node");
        Some(node)
    }

    /// Add an edge, replacing any edge with the same ID.
    ///
    /// Endpoints are not required to exist.
    pub fn add_edge(&mut self, edge: Edge) -> EdgeId {
        let id = edge.id.clone();
        self.remove_edge(&id);

        self.outgoing
            .entry(edge.source.clone())
            .or_default()
            .push(id.clone());
        self.incoming
            .entry(edge.target.clone())
            .or_default()
            .push(id.clone());
        self.edges.insert(id.clone(), edge);
        id
    }

    /// Link two nodes with a new edge.
    pub fn connect(&mut self, source: impl Into<NodeId>, target: impl Into<NodeId>) -> EdgeId {
        self.add_edge(Edge::new(source, target))
    }

    /// Remove an edge.
    pub fn remove_edge(&mut self, id: &EdgeId) -> Option<Edge> {
        let edge = self.edges.remove(id)?;

        if let Some(ids) = self.outgoing.get_mut(&edge.source) {
            ids.retain(|e| e != id);
            if ids.is_empty() {
                self.outgoing.remove(&edge.source);
            }
        }
        if let Some(ids) = self.incoming.get_mut(&edge.target) {
            ids.retain(|e| e != id);
            if ids.is_empty() {
                self.incoming.remove(&edge.target);
            }
        }

        Some(edge)
    }

    /// Get node by ID.
    pub fn get_node(&self, id: &str) -> Option<&StoryNode> {
        self.nodes.get(id)
    }

    /// Get a scene by ID.
    pub fn scene(&self, id: &str) -> Option<&SceneNode> {
        self.get_node(id).and_then(StoryNode::as_scene)
    }

    /// Get a choice by ID.
    pub fn choice(&self, id: &str) -> Option<&ChoiceNode> {
        self.get_node(id).and_then(StoryNode::as_choice)
    }

    /// Get mutable node by ID.
    pub fn get_node_mut(&mut self, id: &str) -> Option<&mut StoryNode> {
        self.nodes.get_mut(id)
    }

    /// Get edge by ID.
    pub fn get_edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    /// Edges leaving a node, in insertion order.
    pub fn outgoing_edges(&self, id: &str) -> impl Iterator<Item = &Edge> {
        self.outgoing
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|edge_id| self.edges.get(edge_id))
    }

    /// Edges entering a node, in insertion order.
    pub fn incoming_edges(&self, id: &str) -> impl Iterator<Item = &Edge> {
        self.incoming
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|edge_id| self.edges.get(edge_id))
    }

    /// Choices offered by a scene, without duplicates.
    pub fn choices_of(&self, scene_id: &str) -> Vec<&ChoiceNode> {
        let mut choices: Vec<&ChoiceNode> = Vec::new();
        for choice in self
            .outgoing_edges(scene_id)
            .filter_map(|edge| self.choice(edge.target.as_str()))
        {
            if !choices.iter().any(|c| c.id == choice.id) {
                choices.push(choice);
            }
        }
        choices
    }

    /// Get all nodes in the graph.
    pub fn nodes(&self) -> impl Iterator<Item = &StoryNode> {
        self.nodes.values()
    }

    /// Get all edges in the graph.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Edges grouped by source in ascending source order, keeping insertion
    /// order within a source.
    pub fn edges_by_source(&self) -> Vec<&Edge> {
        let mut sources: Vec<&NodeId> = self.outgoing.keys().collect();
        sources.sort();
        sources
            .into_iter()
            .flat_map(|source| self.outgoing_edges(source.as_str()))
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Check if a node exists in the graph.
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }
}

impl GraphStore for StoryGraph {
    fn node(&self, id: &NodeId) -> Option<StoryNode> {
        self.get_node(id.as_str()).cloned()
    }

    fn outgoing_choices(&self, scene_id: &NodeId) -> Vec<ChoiceNode> {
        self.choices_of(scene_id.as_str())
            .into_iter()
            .cloned()
            .collect()
    }

    fn edge_target(&self, node_id: &NodeId) -> Option<NodeId> {
        self.outgoing_edges(node_id.as_str())
            .next()
            .map(|edge| edge.target.clone())
    }

    fn edge_source(&self, node_id: &NodeId) -> Option<NodeId> {
        self.incoming_edges(node_id.as_str())
            .next()
            .map(|edge| edge.source.clone())
    }
}

// A poisoned lock only means an editor thread panicked mid-edit; the graph is
// still readable.
impl<G: GraphStore> GraphStore for RwLock<G> {
    fn node(&self, id: &NodeId) -> Option<StoryNode> {
        self.read().unwrap_or_else(PoisonError::into_inner).node(id)
    }

    fn outgoing_choices(&self, scene_id: &NodeId) -> Vec<ChoiceNode> {
        self.read()
            .unwrap_or_else(PoisonError::into_inner)
            .outgoing_choices(scene_id)
    }

    fn edge_target(&self, node_id: &NodeId) -> Option<NodeId> {
        self.read()
            .unwrap_or_else(PoisonError::into_inner)
            .edge_target(node_id)
    }

    fn edge_source(&self, node_id: &NodeId) -> Option<NodeId> {
        self.read()
            .unwrap_or_else(PoisonError::into_inner)
            .edge_source(node_id)
    }
}

impl<G: GraphStore + ?Sized> GraphStore for Arc<G> {
    fn node(&self, id: &NodeId) -> Option<StoryNode> {
        (**self).node(id)
    }

    fn outgoing_choices(&self, scene_id: &NodeId) -> Vec<ChoiceNode> {
        (**self).outgoing_choices(scene_id)
    }

    fn edge_target(&self, node_id: &NodeId) -> Option<NodeId> {
        (**self).edge_target(node_id)
    }

    fn edge_source(&self, node_id: &NodeId) -> Option<NodeId> {
        (**self).edge_source(node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branching_graph() -> StoryGraph {
        let mut graph = StoryGraph::new();
        graph.add_node(SceneNode::new("S1", "Crossroads").with_duration(5.0));
        graph.add_node(ChoiceNode::new("C1", "Left").with_effect("energy", -1));
        graph.add_node(ChoiceNode::new("C2", "Right"));
        graph.add_node(SceneNode::new("S2", "Forest"));
        graph.add_node(SceneNode::new("S3", "River"));

        graph.add_edge(Edge::with_id("e1", "S1", "C1"));
        graph.add_edge(Edge::with_id("e2", "S1", "C2"));
        graph.add_edge(Edge::with_id("e3", "C1", "S2"));
        graph.add_edge(Edge::with_id("e4", "C2", "S3"));
        graph
    }

    #[test]
    fn test_add_and_get_node() {
        let graph = branching_graph();
        assert_eq!(graph.node_count(), 5);
        assert_eq!(graph.edge_count(), 4);
        assert!(graph.scene("S1").is_some());
        assert!(graph.scene("C1").is_none());
        assert_eq!(graph.choice("C1").map(|c| c.label.as_str()), Some("Left"));
    }

    #[test]
    fn test_outgoing_choices() {
        let graph = branching_graph();
        let choices = graph.outgoing_choices(&NodeId::from("S1"));
        let ids: Vec<_> = choices.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["C1", "C2"]);

        assert!(graph.outgoing_choices(&NodeId::from("S2")).is_empty());
        assert!(graph.outgoing_choices(&NodeId::from("missing")).is_empty());
    }

    #[test]
    fn test_outgoing_choices_skip_scenes_and_duplicates() {
        let mut graph = branching_graph();
        graph.connect("S1", "S3");
        graph.connect("S1", "C1");

        let choices = graph.outgoing_choices(&NodeId::from("S1"));
        assert_eq!(choices.len(), 2);
    }

    #[test]
    fn test_edge_target_and_source() {
        let graph = branching_graph();
        assert_eq!(graph.edge_target(&NodeId::from("C1")), Some(NodeId::from("S2")));
        assert_eq!(graph.edge_source(&NodeId::from("C2")), Some(NodeId::from("S1")));
        assert_eq!(graph.edge_target(&NodeId::from("S2")), None);
        assert_eq!(graph.edge_source(&NodeId::from("S1")), None);
    }

    #[test]
    fn test_remove_node_drops_attached_edges() {
        let mut graph = branching_graph();

        let removed = graph.remove_node(&NodeId::from("C1"));
        assert!(removed.is_some());
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.get_edge(&EdgeId::from("e1")).is_none());
        assert!(graph.get_edge(&EdgeId::from("e3")).is_none());
        assert_eq!(graph.choices_of("S1").len(), 1);

        assert!(graph.remove_node(&NodeId::from("C1")).is_none());
    }

    #[test]
    fn test_add_edge_replaces_same_id() {
        let mut graph = branching_graph();
        graph.add_edge(Edge::with_id("e3", "C1", "S3"));

        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.edge_target(&NodeId::from("C1")), Some(NodeId::from("S3")));
        assert_eq!(graph.incoming_edges("S2").count(), 0);
    }

    #[test]
    fn test_dangling_edges_tolerated() {
        let mut graph = StoryGraph::new();
        graph.add_node(ChoiceNode::new("C1", "Go"));
        graph.connect("C1", "nowhere");

        assert_eq!(graph.edge_target(&NodeId::from("C1")), Some(NodeId::from("nowhere")));
        assert!(graph.node(&NodeId::from("nowhere")).is_none());
    }

    #[test]
    fn test_shared_graph_sees_edits() {
        let shared = branching_graph().into_shared();
        assert!(shared.node(&NodeId::from("S3")).is_some());

        shared.write().unwrap().remove_node(&NodeId::from("S3"));
        assert!(shared.node(&NodeId::from("S3")).is_none());
        assert_eq!(shared.edge_target(&NodeId::from("C2")), None);
    }

    #[test]
    fn test_edges_by_source_is_stable() {
        let graph = branching_graph();
        let ids: Vec<_> = graph.edges_by_source().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e3", "e4", "e1", "e2"]);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(NodeId::generate(), NodeId::generate());
        assert_ne!(Edge::new("a", "b").id, Edge::new("a", "b").id);
    }
}
