use super::node::{Edge, EdgeId, Node, NodeId};
use crate::TreeFloat;
use crate::events::Event;
use crate::parsers::error::WriteError;
use crate::parsers::protocol::{
    EdgeDataProvider, EventReceiver, NodeDataProvider, TopologyProvider,
};
use crate::phylo::annotation::AnnotationEntry;

use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use std::sync::Arc;
use thiserror::Error;

/// In-memory tree or network built from an event stream.
///
/// Nodes and edges live in slot maps; the ids they had in the event stream
/// are indexed so the tree can act as a writer's data provider.
#[derive(Debug, Default, Clone)]
pub struct Tree {
    event_id: String,
    label: Option<String>,
    network: bool,
    nodes: SlotMap<NodeId, Node>,
    edges: SlotMap<EdgeId, Edge>,
    node_index: FxHashMap<String, NodeId>,
    edge_index: FxHashMap<String, EdgeId>,
    start_node_id: Option<NodeId>,
    comments: Vec<String>,
}

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Duplicate {0} id: {1}.")]
    DuplicateId(&'static str, String),
    #[error("Node with NodeId: {0} does not exist.")]
    NodeDoesNotExist(NodeId),
    #[error("A node cannot have more than one root edge: {0}.")]
    SecondRootEdge(NodeId),
}

impl Tree {
    // =========================================================================
    // Construction
    // =========================================================================

    pub fn new(event_id: impl Into<String>) -> Self {
        Self { event_id: event_id.into(), ..Self::default() }
    }

    pub fn event_id(&self) -> &str { &self.event_id }
    pub fn label(&self) -> Option<&str> { self.label.as_deref() }
    pub fn set_label(&mut self, label: Option<String>) { self.label = label }

    /// Whether the tree was read as an eNewick network.
    pub fn read_as_network(&self) -> bool { self.network }
    pub(crate) fn set_read_as_network(&mut self, network: bool) { self.network = network }

    /// Comments that preceded the tree in its document.
    pub fn comments(&self) -> &[String] { &self.comments }
    pub(crate) fn add_comment(&mut self, comment: String) { self.comments.push(comment) }

    pub fn add_node(&mut self, node: Node) -> Result<NodeId, TreeError> {
        if self.node_index.contains_key(node.event_id()) {
            return Err(TreeError::DuplicateId("node", node.event_id().to_string()));
        }

        let event_id = node.event_id().to_string();
        let mut node = node;
        let node_id = self.nodes.insert_with_key(|node_id| {
            node.set_node_id(node_id);
            node
        });
        _ = self.node_index.insert(event_id, node_id);
        Ok(node_id)
    }

    /// Adds an edge and links it to its endpoints. An edge without a source
    /// is the root edge of its target.
    pub fn add_edge(&mut self, edge: Edge) -> Result<EdgeId, TreeError> {
        if self.edge_index.contains_key(edge.event_id()) {
            return Err(TreeError::DuplicateId("edge", edge.event_id().to_string()));
        }
        let target_id = edge.target_id();
        if !self.nodes.contains_key(target_id) {
            return Err(TreeError::NodeDoesNotExist(target_id));
        }
        if let Some(source_id) = edge.source_id() {
            if !self.nodes.contains_key(source_id) {
                return Err(TreeError::NodeDoesNotExist(source_id));
            }
        } else if self.root_edge_id(target_id).is_some() {
            return Err(TreeError::SecondRootEdge(target_id));
        }

        let event_id = edge.event_id().to_string();
        let source_id = edge.source_id();
        let mut edge = edge;
        let edge_id = self.edges.insert_with_key(|edge_id| {
            edge.set_edge_id(edge_id);
            edge
        });
        _ = self.edge_index.insert(event_id, edge_id);

        if let Some(source) = source_id.and_then(|id| self.nodes.get_mut(id)) {
            source.add_child_edge_id(edge_id);
        }
        if let Some(target) = self.nodes.get_mut(target_id) {
            target.add_afferent_edge_id(edge_id);
        }
        Ok(edge_id)
    }

    // =========================================================================
    // Access
    // =========================================================================

    pub fn node(&self, node_id: NodeId) -> Option<&Node> { self.nodes.get(node_id) }
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> { self.nodes.get_mut(node_id) }
    pub fn edge(&self, edge_id: EdgeId) -> Option<&Edge> { self.edges.get(edge_id) }
    pub fn edge_mut(&mut self, edge_id: EdgeId) -> Option<&mut Edge> { self.edges.get_mut(edge_id) }

    /// Node that had `event_id` in the event stream.
    pub fn node_id(&self, event_id: &str) -> Option<NodeId> {
        self.node_index.get(event_id).copied()
    }

    pub fn edge_id(&self, event_id: &str) -> Option<EdgeId> {
        self.edge_index.get(event_id).copied()
    }

    pub fn node_ids_all(&self) -> Vec<NodeId> {
        self.nodes.keys().collect()
    }

    pub fn node_id_by_label<'a>(&self, label: impl Into<&'a str>) -> Option<NodeId> {
        let label: &str = label.into();
        self.nodes.iter().find_map(|(node_id, node)| {
            node.label().filter(|l| &**l == label).map(|_| node_id)
        })
    }

    pub fn node_label(&self, node_id: NodeId) -> Option<Arc<str>> {
        self.node(node_id).and_then(Node::label)
    }

    pub fn start_node_id(&self) -> Option<NodeId> { self.start_node_id }
    pub fn set_start_node_id(&mut self, node_id: NodeId) { self.start_node_id = Some(node_id) }

    /// Child nodes in the order they were read.
    pub fn child_ids(&self, node_id: NodeId) -> Vec<NodeId> {
        self.node(node_id)
            .map(|node| {
                node.child_edge_ids()
                    .iter()
                    .filter_map(|edge_id| self.edge(*edge_id))
                    .map(Edge::target_id)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Sources of all incoming edges except the root edge.
    pub fn parent_ids(&self, node_id: NodeId) -> Vec<NodeId> {
        self.node(node_id)
            .map(|node| {
                node.afferent_edge_ids()
                    .iter()
                    .filter_map(|edge_id| self.edge(*edge_id))
                    .filter_map(Edge::source_id)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn root_edge_id(&self, node_id: NodeId) -> Option<EdgeId> {
        self.node(node_id)?
            .afferent_edge_ids()
            .iter()
            .copied()
            .find(|edge_id| self.edge(*edge_id).is_some_and(Edge::is_root_edge))
    }

    /// Length of the edge leading into `node_id`, the root edge included.
    pub fn branch_length(&self, node_id: NodeId) -> Option<TreeFloat> {
        let edge_id = *self.node(node_id)?.afferent_edge_ids().first()?;
        self.edge(edge_id)?.length()
    }

    // =========================================================================
    // Counts and properties
    // =========================================================================

    pub fn node_count_all(&self) -> usize { self.nodes.len() }
    pub fn edge_count_all(&self) -> usize { self.edges.len() }

    pub fn tip_count_all(&self) -> usize {
        self.nodes.values().filter(|node| node.is_tip()).count()
    }

    pub fn has_branch_lengths(&self) -> bool {
        self.edges.values().any(|edge| edge.length().is_some())
    }

    /// Whether the start node is flagged as the root.
    pub fn is_rooted(&self) -> bool {
        self.start_node_id
            .and_then(|node_id| self.node(node_id))
            .is_some_and(Node::is_root)
    }

    /// Whether some node has more than one parent.
    pub fn is_network(&self) -> bool {
        self.nodes.keys().any(|node_id| self.parent_ids(node_id).len() > 1)
    }
}

fn send_content(
    prefix: &str,
    annotations: &[AnnotationEntry],
    comments: &[String],
    receiver: &mut dyn EventReceiver,
) -> Result<(), WriteError> {
    for (i, entry) in annotations.iter().enumerate() {
        for event in entry.to_events(format!("{prefix}m{i}")) {
            receiver.add(event)?;
        }
    }
    for comment in comments {
        receiver.add(Event::comment(comment.as_str()))?;
    }
    Ok(())
}

// =============================================================================
// Writer data providers
// =============================================================================

impl Tree {
    fn node_by_event_id(&self, event_id: &str) -> Option<&Node> {
        self.node(self.node_id(event_id)?)
    }

    fn edge_by_event_id(&self, event_id: &str) -> Option<&Edge> {
        self.edge(self.edge_id(event_id)?)
    }
}

impl TopologyProvider for Tree {
    fn start_node_id(&self) -> Option<&str> {
        self.node(self.start_node_id?).map(Node::event_id)
    }

    fn is_root(&self, node_id: &str) -> bool {
        self.node_by_event_id(node_id).is_some_and(Node::is_root)
    }

    fn child_node_ids(&self, node_id: &str) -> Vec<&str> {
        let Some(node_id) = self.node_id(node_id) else {
            return Vec::new();
        };
        self.child_ids(node_id)
            .into_iter()
            .filter_map(|child_id| self.node(child_id))
            .map(Node::event_id)
            .collect()
    }

    fn afferent_edge_ids(&self, node_id: &str) -> Vec<&str> {
        let Some(node) = self.node_by_event_id(node_id) else {
            return Vec::new();
        };
        node.afferent_edge_ids()
            .iter()
            .filter_map(|edge_id| self.edge(*edge_id))
            .map(Edge::event_id)
            .collect()
    }
}

impl NodeDataProvider for Tree {
    fn node_label(&self, node_id: &str) -> Option<&str> {
        let node_id = self.node_id(node_id)?;
        self.nodes.get(node_id)?.label_str()
    }

    fn write_node_content(
        &self,
        node_id: &str,
        receiver: &mut dyn EventReceiver,
    ) -> Result<(), WriteError> {
        let Some(node) = self.node_by_event_id(node_id) else {
            return Err(WriteError::UnknownId { kind: "node", id: node_id.to_string() });
        };
        send_content(node.event_id(), node.annotations(), node.comments(), receiver)
    }
}

impl EdgeDataProvider for Tree {
    fn edge_length(&self, edge_id: &str) -> Option<TreeFloat> {
        self.edge_by_event_id(edge_id)?.length()
    }

    fn write_edge_content(
        &self,
        edge_id: &str,
        receiver: &mut dyn EventReceiver,
    ) -> Result<(), WriteError> {
        let Some(edge) = self.edge_by_event_id(edge_id) else {
            return Err(WriteError::UnknownId { kind: "edge", id: edge_id.to_string() });
        };
        send_content(edge.event_id(), edge.annotations(), edge.comments(), receiver)
    }
}
