use crate::TreeFloat;
use crate::events::Event;
use crate::parsers::error::WriteError;

/// Sink for the metadata and comment events a data provider describes.
pub trait EventReceiver {
    fn add(&mut self, event: Event) -> Result<(), WriteError>;
}

/// Shape of the graph handed to a writer.
pub trait TopologyProvider {
    /// Node the traversal starts from.
    fn start_node_id(&self) -> Option<&str>;
    /// Whether the start node is flagged as the root of a rooted tree.
    fn is_root(&self, node_id: &str) -> bool;
    /// Children in output order.
    fn child_node_ids(&self, node_id: &str) -> Vec<&str>;
    /// Incoming edges. A tree node has at most one.
    fn afferent_edge_ids(&self, node_id: &str) -> Vec<&str>;
}

pub trait NodeDataProvider {
    fn node_label(&self, node_id: &str) -> Option<&str>;
    /// Sends the node's `LITERAL_META` groups and comments to `receiver`.
    fn write_node_content(
        &self,
        node_id: &str,
        receiver: &mut dyn EventReceiver,
    ) -> Result<(), WriteError>;
}

pub trait EdgeDataProvider {
    fn edge_length(&self, edge_id: &str) -> Option<TreeFloat>;
    fn write_edge_content(
        &self,
        edge_id: &str,
        receiver: &mut dyn EventReceiver,
    ) -> Result<(), WriteError>;
}

impl EventReceiver for Vec<Event> {
    fn add(&mut self, event: Event) -> Result<(), WriteError> {
        self.push(event);
        Ok(())
    }
}
