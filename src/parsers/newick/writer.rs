use super::labels::format_name;
use super::nhx::is_nhx_writable;
use crate::TreeFloat;
use crate::config::{LabelEdit, WriterConfig};
use crate::events::{ContentEvent, Event, EventContentType};
use crate::parsers::error::{Diagnostic, DiagnosticKind, WriteError};
use crate::parsers::protocol::{
    EdgeDataProvider, EventReceiver, NodeDataProvider, TopologyProvider,
};
use crate::parsers::{EventWriter, WriteReport};
use crate::phylo::annotation::{AnnotationCollector, AnnotationEntry};
use crate::phylo::literal::{LiteralTranslator, LiteralValue};

use rustc_hash::FxHashSet;
use std::io::Write;

/// Serializes trees supplied through the provider traits as Newick.
///
/// Node metadata is written as one hot comment after the name, edge
/// metadata as one hot comment after the length. Networks are refused.
#[derive(Debug, Default)]
pub struct NewickWriter {
    diagnostics: Vec<Diagnostic>,
}

/// Everything a node or an edge sends to its [EventReceiver].
#[derive(Debug, Default)]
struct ContentCollector {
    annotations: Vec<AnnotationEntry>,
    comments: Vec<String>,
    comment_continued: bool,
    collector: AnnotationCollector,
}

/// A node whose children are being written.
struct Frame<'a> {
    node_id: &'a str,
    children: Vec<&'a str>,
    next_child: usize,
}

struct WriteContext<'a> {
    topology: &'a dyn TopologyProvider,
    nodes: &'a dyn NodeDataProvider,
    edges: &'a dyn EdgeDataProvider,
    config: &'a WriterConfig,
}

impl NewickWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Writes one tree followed by `;` and a newline.
    ///
    /// If the topology is a network (a node with several afferent edges, or
    /// a node reachable twice) nothing is written and the returned report
    /// says so; a [DiagnosticKind::NetworkNotWritten] warning is recorded.
    pub fn write_tree(
        &mut self,
        topology: &dyn TopologyProvider,
        nodes: &dyn NodeDataProvider,
        edges: &dyn EdgeDataProvider,
        sink: &mut dyn Write,
        config: &WriterConfig,
    ) -> Result<WriteReport, WriteError> {
        let Some(start) = topology.start_node_id() else {
            return Err(WriteError::inconsistent("topology has no start node"));
        };

        if let Some(node_id) = find_network_node(topology, start) {
            tracing::warn!(
                node_id = %node_id,
                "Refusing to write a network as Newick"
            );
            self.diagnostics.push(Diagnostic::new(
                DiagnosticKind::NetworkNotWritten,
                format!(
                    "node {node_id} has more than one parent; networks are not written"
                ),
                None,
            ));
            return Ok(WriteReport { written: false, node_count: 0 });
        }

        let context = WriteContext { topology, nodes, edges, config };
        let mut newick = String::new();
        if config.write_rooting_marker() {
            newick.push_str(if topology.is_root(start) { "[&R] " } else { "[&U] " });
        }
        let node_count = self.write_node(start, &context, &mut newick)?;
        newick.push_str(";\n");

        sink.write_all(newick.as_bytes())?;
        Ok(WriteReport { written: true, node_count })
    }

    /// Appends a node with its subtree; returns the number of nodes written.
    ///
    /// Walks the subtree with an explicit stack of open nodes.
    fn write_node(
        &mut self,
        start: &str,
        context: &WriteContext,
        newick: &mut String,
    ) -> Result<usize, WriteError> {
        let mut node_count = 0;
        let mut stack = vec![enter_node(start, context, newick)];

        while let Some(frame) = stack.last_mut() {
            if let Some(&child_id) = frame.children.get(frame.next_child) {
                if frame.next_child > 0 {
                    newick.push(',');
                }
                frame.next_child += 1;
                let child = enter_node(child_id, context, newick);
                stack.push(child);
                continue;
            }

            let Some(frame) = stack.pop() else {
                break;
            };
            if !frame.children.is_empty() {
                newick.push(')');
            }
            self.write_node_data(frame.node_id, context, newick)?;
            node_count += 1;
        }

        Ok(node_count)
    }

    /// Appends name, node metadata, length and edge metadata of one node.
    fn write_node_data(
        &mut self,
        node_id: &str,
        context: &WriteContext,
        newick: &mut String,
    ) -> Result<(), WriteError> {
        if let Some(label) = context.nodes.node_label(node_id) {
            let name = self.edit_label(node_id, label, context.config);
            newick.push_str(&name);
        }

        let mut node_content = ContentCollector::default();
        context.nodes.write_node_content(node_id, &mut node_content)?;
        node_content.finish()?;

        let mut edge_content = ContentCollector::default();
        let mut length = None;
        if let Some(edge_id) = context.topology.afferent_edge_ids(node_id).first() {
            length = context.edges.edge_length(edge_id);
            context.edges.write_edge_content(edge_id, &mut edge_content)?;
            edge_content.finish()?;
            if length.is_some_and(|length: TreeFloat| !length.is_finite()) {
                return Err(WriteError::inconsistent(format!(
                    "edge {edge_id} has a non-finite length"
                )));
            }
        }

        let translator = context.config.literal_translator();
        newick.push_str(&node_content.to_newick(translator));

        // Keeps the edge metadata from being read back as node metadata.
        if length.is_none()
            && node_content.annotations.is_empty()
            && !edge_content.annotations.is_empty()
        {
            newick.push_str("[&]");
        }

        if let Some(length) = length {
            newick.push_str(&format!(":{length}"));
        }
        newick.push_str(&edge_content.to_newick(translator));

        Ok(())
    }

    fn edit_label(
        &mut self,
        node_id: &str,
        label: &str,
        config: &WriterConfig,
    ) -> String {
        let truncated: String = match config.max_name_length() {
            Some(max) if label.chars().count() > max => {
                label.chars().take(max).collect()
            }
            _ => label.to_string(),
        };
        let name = format_name(&truncated);

        let spaces_replaced = name.contains('_') && !name.starts_with('\'');
        if truncated != label || spaces_replaced {
            let edit = LabelEdit {
                node_id: node_id.to_string(),
                original: label.to_string(),
                edited: name.clone(),
            };
            tracing::debug!(
                node_id = %node_id,
                original = %label,
                edited = %name,
                "Label edited for output"
            );
            config.report_label_edit(&edit);
            self.diagnostics.push(Diagnostic::new(
                DiagnosticKind::LabelEdited,
                format!("label \"{label}\" of node {node_id} written as {name}"),
                None,
            ));
        }

        name
    }
}

impl EventWriter for NewickWriter {
    fn write(
        &mut self,
        topology: &dyn TopologyProvider,
        nodes: &dyn NodeDataProvider,
        edges: &dyn EdgeDataProvider,
        sink: &mut dyn Write,
        config: &WriterConfig,
    ) -> Result<WriteReport, WriteError> {
        self.write_tree(topology, nodes, edges, sink, config)
    }

    fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// Opens a node: writes `(` if it has children.
fn enter_node<'a>(
    node_id: &'a str,
    context: &WriteContext<'a>,
    newick: &mut String,
) -> Frame<'a> {
    let children = context.topology.child_node_ids(node_id);
    if !children.is_empty() {
        newick.push('(');
    }
    Frame { node_id, children, next_child: 0 }
}

/// Returns a node that makes the topology a network, if there is one.
fn find_network_node(topology: &dyn TopologyProvider, start: &str) -> Option<String> {
    let mut visited: FxHashSet<&str> = FxHashSet::default();
    let mut stack = vec![start];
    while let Some(node_id) = stack.pop() {
        if !visited.insert(node_id) || topology.afferent_edge_ids(node_id).len() > 1 {
            return Some(node_id.to_string());
        }
        stack.extend(topology.child_node_ids(node_id));
    }
    None
}

// =============================================================================
// ContentCollector
// =============================================================================

impl ContentCollector {
    fn finish(&self) -> Result<(), WriteError> {
        if self.collector.is_open() {
            return Err(WriteError::inconsistent("metadata entry was not closed"));
        }
        if self.comment_continued {
            return Err(WriteError::inconsistent(
                "continued comment was never terminated",
            ));
        }
        Ok(())
    }

    /// Hot comment with all annotations followed by the free-text comments.
    fn to_newick(&self, translator: &dyn LiteralTranslator) -> String {
        let mut newick = format_annotations(&self.annotations, translator);
        for comment in &self.comments {
            newick.push('[');
            newick.push_str(comment);
            newick.push(']');
        }
        newick
    }
}

impl EventReceiver for ContentCollector {
    fn add(&mut self, event: Event) -> Result<(), WriteError> {
        match event {
            Event::Start(ContentEvent::LiteralMeta(meta)) => self
                .collector
                .start(meta)
                .map_err(|message| WriteError::inconsistent(message)),
            Event::Sole(ContentEvent::LiteralMetaContent(content)) => self
                .collector
                .content(content)
                .map_err(|message| WriteError::inconsistent(message)),
            Event::End(EventContentType::LiteralMeta) => {
                let entry = self
                    .collector
                    .end()
                    .map_err(|message| WriteError::inconsistent(message))?;
                self.annotations.push(entry);
                Ok(())
            }
            Event::Sole(ContentEvent::Comment(comment)) => {
                match (self.comment_continued, self.comments.last_mut()) {
                    (true, Some(last)) => last.push_str(&comment.content),
                    _ => self.comments.push(comment.content),
                }
                self.comment_continued = comment.continued;
                Ok(())
            }
            other => Err(WriteError::inconsistent(format!(
                "{} event in node or edge content",
                other.content_type()
            ))),
        }
    }
}

// =============================================================================
// Hot comment formatting
// =============================================================================

fn format_annotations(
    entries: &[AnnotationEntry],
    translator: &dyn LiteralTranslator,
) -> String {
    if entries.is_empty() {
        return String::new();
    }

    if is_nhx_writable(entries, translator) {
        let parts: Vec<String> = entries
            .iter()
            .map(|entry| match &entry.value {
                Some(value) => {
                    format!("{}={}", entry.key, translator.format(value))
                }
                None => entry.key.clone(),
            })
            .collect();
        return format!("[&&NHX:{}]", parts.join(":"));
    }

    let parts: Vec<String> = entries
        .iter()
        .map(|entry| match &entry.value {
            Some(value) => format!("{}={}", entry.key, format_value(value, translator)),
            None => entry.key.clone(),
        })
        .collect();
    format!("[&{}]", parts.join(","))
}

/// Text is always double quoted so it is never read back as a number.
fn format_value(value: &LiteralValue, translator: &dyn LiteralTranslator) -> String {
    match value {
        LiteralValue::Text(text) => format!("\"{}\"", text.replace('"', "\"\"")),
        LiteralValue::List(items) => {
            let items: Vec<String> =
                items.iter().map(|item| format_value(item, translator)).collect();
            format!("{{{}}}", items.join(","))
        }
        other => translator.format(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phylo::literal::DefaultLiteralTranslator;

    #[test]
    fn test_format_annotations() {
        let translator = DefaultLiteralTranslator;
        let test_cases = vec![
            (vec![], ""),
            (
                vec![
                    AnnotationEntry::new("S", Some("Human".into())),
                    AnnotationEntry::new("B", Some(LiteralValue::Integer(100))),
                ],
                "[&&NHX:S=Human:B=100]",
            ),
            (
                vec![
                    AnnotationEntry::new("rate", Some(LiteralValue::Decimal(1.0))),
                    AnnotationEntry::new("name", Some(LiteralValue::Text("a \"b\"".into()))),
                ],
                "[&rate=1.0,name=\"a \"\"b\"\"\"]",
            ),
            (
                vec![AnnotationEntry::new(
                    "set",
                    Some(LiteralValue::List(vec![
                        LiteralValue::Integer(1),
                        LiteralValue::Text("x".into()),
                    ])),
                )],
                "[&set={1,\"x\"}]",
            ),
            (vec![AnnotationEntry::new("flag", None)], "[&flag]"),
        ];

        for (entries, expected) in test_cases {
            println!("{expected}");
            assert_eq!(format_annotations(&entries, &translator), expected);
        }
    }
}
