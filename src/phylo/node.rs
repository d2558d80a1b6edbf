use crate::TreeFloat;
use crate::phylo::annotation::AnnotationEntry;

use slotmap::new_key_type;
use std::fmt::Display;
use std::sync::Arc;

new_key_type! { pub struct NodeId; }
new_key_type! { pub struct EdgeId; }

/// A node of a [Tree](super::tree::Tree). `event_id` is the id the node
/// had in the event stream it was built from.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Node {
    node_id: Option<NodeId>,
    event_id: String,
    label: Option<Arc<str>>,
    is_root: bool,
    annotations: Vec<AnnotationEntry>,
    comments: Vec<String>,
    child_edge_ids: Vec<EdgeId>,
    afferent_edge_ids: Vec<EdgeId>,
}

/// A directed edge. The root edge has no source.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    edge_id: Option<EdgeId>,
    event_id: String,
    source_id: Option<NodeId>,
    target_id: NodeId,
    length: Option<TreeFloat>,
    annotations: Vec<AnnotationEntry>,
    comments: Vec<String>,
}

// =============================================================================
// Node
// =============================================================================

impl Node {
    pub fn new(event_id: impl Into<String>) -> Self {
        Self { event_id: event_id.into(), ..Self::default() }
    }

    pub fn node_id(&self) -> Option<NodeId> { self.node_id }
    pub(crate) fn set_node_id(&mut self, node_id: NodeId) { self.node_id = Some(node_id) }
    pub fn event_id(&self) -> &str { &self.event_id }
    pub fn label(&self) -> Option<Arc<str>> { self.label.clone() }

    pub(crate) fn label_str(&self) -> Option<&str> { self.label.as_deref() }

    pub fn set_label<'a>(&mut self, label: Option<impl Into<&'a str>>) {
        self.label = label.map(|label| label.into().into());
    }

    pub fn is_root(&self) -> bool { self.is_root }
    pub fn set_root(&mut self, is_root: bool) { self.is_root = is_root }
    pub fn is_tip(&self) -> bool { self.child_edge_ids.is_empty() }
    pub fn annotations(&self) -> &[AnnotationEntry] { &self.annotations }
    pub fn add_annotation(&mut self, entry: AnnotationEntry) { self.annotations.push(entry) }

    /// First annotation whose key matches `key` exactly.
    pub fn annotation(&self, key: &str) -> Option<&AnnotationEntry> {
        self.annotations.iter().find(|entry| entry.key == key)
    }

    pub fn comments(&self) -> &[String] { &self.comments }
    pub(crate) fn comments_mut(&mut self) -> &mut Vec<String> { &mut self.comments }
    pub fn add_comment(&mut self, comment: impl Into<String>) { self.comments.push(comment.into()) }

    /// Outgoing edges in child order.
    pub fn child_edge_ids(&self) -> &[EdgeId] { &self.child_edge_ids }
    pub(crate) fn add_child_edge_id(&mut self, edge_id: EdgeId) { self.child_edge_ids.push(edge_id) }

    /// Incoming edges, the root edge included. More than one makes the
    /// node a network node.
    pub fn afferent_edge_ids(&self) -> &[EdgeId] { &self.afferent_edge_ids }
    pub(crate) fn add_afferent_edge_id(&mut self, edge_id: EdgeId) { self.afferent_edge_ids.push(edge_id) }
}

impl<'a> From<&'a str> for Node {
    fn from(value: &'a str) -> Self {
        let mut node = Node::default();
        let label = match value {
            "" => None,
            v => Some(v),
        };
        node.set_label(label);
        node
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let disp = format!("{self:?}");
        write!(f, "{}", &disp[7..disp.len() - 1])
    }
}

// =============================================================================
// Edge
// =============================================================================

impl Edge {
    pub fn new(
        event_id: impl Into<String>,
        source_id: Option<NodeId>,
        target_id: NodeId,
        length: Option<TreeFloat>,
    ) -> Self {
        Self {
            edge_id: None,
            event_id: event_id.into(),
            source_id,
            target_id,
            length,
            annotations: Vec::new(),
            comments: Vec::new(),
        }
    }

    pub fn edge_id(&self) -> Option<EdgeId> { self.edge_id }
    pub(crate) fn set_edge_id(&mut self, edge_id: EdgeId) { self.edge_id = Some(edge_id) }
    pub fn event_id(&self) -> &str { &self.event_id }
    pub fn source_id(&self) -> Option<NodeId> { self.source_id }
    pub fn target_id(&self) -> NodeId { self.target_id }
    pub fn is_root_edge(&self) -> bool { self.source_id.is_none() }
    pub fn length(&self) -> Option<TreeFloat> { self.length }
    pub fn set_length(&mut self, length: Option<TreeFloat>) { self.length = length }
    pub fn annotations(&self) -> &[AnnotationEntry] { &self.annotations }
    pub fn add_annotation(&mut self, entry: AnnotationEntry) { self.annotations.push(entry) }

    pub fn annotation(&self, key: &str) -> Option<&AnnotationEntry> {
        self.annotations.iter().find(|entry| entry.key == key)
    }

    pub fn comments(&self) -> &[String] { &self.comments }
    pub(crate) fn comments_mut(&mut self) -> &mut Vec<String> { &mut self.comments }
    pub fn add_comment(&mut self, comment: impl Into<String>) { self.comments.push(comment.into()) }
}

impl Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let disp = format!("{self:?}");
        write!(f, "{}", &disp[7..disp.len() - 1])
    }
}
