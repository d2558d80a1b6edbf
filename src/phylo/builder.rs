use super::annotation::{AnnotationCollector, AnnotationEntry};
use super::node::{Edge, EdgeId, Node, NodeId};
use super::tree::Tree;
use crate::events::{ContentEvent, EdgeEvent, Event, EventContentType};
use crate::parsers::EventReader;
use crate::parsers::error::ReadError;

/// Builds [Tree] values from a stream of events.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    trees: Vec<Tree>,
    current: Option<Tree>,
    target: Option<Target>,
    last_node_id: Option<NodeId>,
    collector: AnnotationCollector,
    comment_continued: bool,
    pending_comments: Vec<String>,
}

/// Node or edge the nested content events belong to.
#[derive(Debug, Clone, Copy)]
enum Target {
    Node(NodeId),
    Edge(EdgeId),
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads all remaining events from `reader` and returns the trees.
    pub fn read_all(
        mut self,
        reader: &mut dyn EventReader,
    ) -> Result<Vec<Tree>, ReadError> {
        while let Some(event) = reader.next_event()? {
            self.add(event)?;
        }
        self.finish()
    }

    /// Consumes one event.
    pub fn add(&mut self, event: Event) -> Result<(), ReadError> {
        match event {
            Event::Start(ContentEvent::Document)
            | Event::End(EventContentType::Document) => Ok(()),
            Event::Start(ContentEvent::Tree(tree)) => self.start_tree(tree.id, tree.label, false),
            Event::Start(ContentEvent::Network(tree)) => self.start_tree(tree.id, tree.label, true),
            Event::End(EventContentType::Tree | EventContentType::Network) => self.end_tree(),
            Event::Start(ContentEvent::Node(event)) => {
                let tree = self.tree_mut()?;
                let mut node = Node::new(event.id);
                node.set_label(event.label.as_deref());
                node.set_root(event.is_root);
                let node_id = tree.add_node(node).map_err(|err| ReadError::inconsistent(err.to_string()))?;
                if event.is_root && tree.start_node_id().is_none() {
                    tree.set_start_node_id(node_id);
                }
                self.last_node_id = Some(node_id);
                self.open_target(Target::Node(node_id))
            }
            Event::Start(ContentEvent::Edge(edge) | ContentEvent::RootEdge(edge)) => {
                let edge_id = self.add_edge(edge)?;
                self.open_target(Target::Edge(edge_id))
            }
            Event::End(
                EventContentType::Node | EventContentType::Edge | EventContentType::RootEdge,
            ) => {
                if self.collector.is_open() {
                    return Err(ReadError::inconsistent("metadata entry was not closed"));
                }
                self.target = None;
                self.comment_continued = false;
                Ok(())
            }
            Event::Start(ContentEvent::LiteralMeta(meta)) => {
                self.collector.start(meta).map_err(ReadError::inconsistent)
            }
            Event::Sole(ContentEvent::LiteralMetaContent(content)) => {
                self.collector.content(content).map_err(ReadError::inconsistent)
            }
            Event::End(EventContentType::LiteralMeta) => {
                let entry = self.collector.end().map_err(ReadError::inconsistent)?;
                self.add_annotation(entry)
            }
            Event::Sole(ContentEvent::Comment(comment)) => {
                self.add_comment(comment.content, comment.continued);
                Ok(())
            }
            other => Err(ReadError::inconsistent(format!(
                "unexpected {} event",
                other.content_type()
            ))),
        }
    }

    /// Returns the completed trees. Fails if a tree is still open.
    ///
    /// Comments after the last tree are attached to that tree.
    pub fn finish(mut self) -> Result<Vec<Tree>, ReadError> {
        if self.current.is_some() {
            return Err(ReadError::inconsistent("event stream ended inside a tree"));
        }
        if let Some(tree) = self.trees.last_mut() {
            for comment in self.pending_comments.drain(..) {
                tree.add_comment(comment);
            }
        }
        Ok(self.trees)
    }

    fn tree_mut(&mut self) -> Result<&mut Tree, ReadError> {
        self.current
            .as_mut()
            .ok_or_else(|| ReadError::inconsistent("node or edge outside of a tree"))
    }

    fn start_tree(
        &mut self,
        id: String,
        label: Option<String>,
        network: bool,
    ) -> Result<(), ReadError> {
        if self.current.is_some() {
            return Err(ReadError::inconsistent("tree starts inside another tree"));
        }
        let mut tree = Tree::new(id);
        tree.set_label(label);
        tree.set_read_as_network(network);
        for comment in self.pending_comments.drain(..) {
            tree.add_comment(comment);
        }
        self.current = Some(tree);
        self.last_node_id = None;
        Ok(())
    }

    fn end_tree(&mut self) -> Result<(), ReadError> {
        let Some(mut tree) = self.current.take() else {
            return Err(ReadError::inconsistent("tree ends without a start"));
        };
        // Unrooted trees have no flagged root; the top node comes last.
        if tree.start_node_id().is_none() {
            if let Some(node_id) = self.last_node_id {
                tree.set_start_node_id(node_id);
            }
        }
        self.trees.push(tree);
        Ok(())
    }

    fn open_target(&mut self, target: Target) -> Result<(), ReadError> {
        if self.target.is_some() {
            return Err(ReadError::inconsistent("node or edge starts inside another one"));
        }
        self.target = Some(target);
        self.comment_continued = false;
        Ok(())
    }

    fn add_edge(&mut self, edge: EdgeEvent) -> Result<EdgeId, ReadError> {
        let tree = self.tree_mut()?;
        let lookup = |tree: &Tree, event_id: &str| {
            tree.node_id(event_id).ok_or_else(|| {
                ReadError::inconsistent(format!("edge refers to unknown node {event_id}"))
            })
        };
        let target_id = lookup(&*tree, &edge.target_id)?;
        let source_id = match &edge.source_id {
            Some(source) => Some(lookup(&*tree, source)?),
            None => None,
        };
        tree.add_edge(Edge::new(edge.id, source_id, target_id, edge.length))
            .map_err(|err| ReadError::inconsistent(err.to_string()))
    }

    fn add_annotation(&mut self, entry: AnnotationEntry) -> Result<(), ReadError> {
        let Some(target) = self.target else {
            return Err(ReadError::inconsistent("metadata outside of a node or edge"));
        };
        let tree = self.tree_mut()?;
        match target {
            Target::Node(node_id) => {
                if let Some(node) = tree.node_mut(node_id) {
                    node.add_annotation(entry);
                }
            }
            Target::Edge(edge_id) => {
                if let Some(edge) = tree.edge_mut(edge_id) {
                    edge.add_annotation(entry);
                }
            }
        }
        Ok(())
    }

    /// Comments outside of nodes and edges are kept with the next tree.
    fn add_comment(&mut self, content: String, continued: bool) {
        let join = self.comment_continued;
        self.comment_continued = continued;

        let comments = match (self.target, self.current.as_mut()) {
            (Some(Target::Node(node_id)), Some(tree)) => {
                tree.node_mut(node_id).map(|node| node.comments_mut())
            }
            (Some(Target::Edge(edge_id)), Some(tree)) => {
                tree.edge_mut(edge_id).map(|edge| edge.comments_mut())
            }
            _ => Some(&mut self.pending_comments),
        };
        let Some(comments) = comments else {
            return;
        };
        match comments.last_mut() {
            Some(last) if join => last.push_str(&content),
            _ => comments.push(content),
        }
    }
}
