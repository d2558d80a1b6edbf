pub(crate) mod attributes;
pub(crate) mod labels;
pub(crate) mod nhx;
pub mod scanner;
pub mod writer;

use crate::TreeFloat;
use crate::config::{ReaderConfig, WriterConfig};
use crate::events::{ContentEvent, EdgeEvent, Event, EventContentType, LabeledIdEvent, NodeEvent};
use crate::parsers::EventReader;
use crate::parsers::error::{
    Diagnostic, DiagnosticKind, EndContext, ReadError, SourcePosition, WriteError,
};
use crate::phylo::builder::TreeBuilder;
use crate::phylo::tree::Tree;
use attributes::parse_hot_comment;
use labels::NetworkLabel;
use scanner::{NewickScanner, Token, TokenKind};
use writer::NewickWriter;

use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::io::Read;

// =============================================================================
// Type definitions
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    BeforeDocument,
    /// Between trees: leading comments and rooting commands.
    BeforeTree,
    /// Inside the bracket structure of a tree.
    InTree,
    /// The top node is complete; waiting for `;` or the end of input.
    AfterTree,
    Finished,
}

/// Edge to a completed child node, queued until the parent's `)` is read.
#[derive(Debug)]
struct PendingEdge {
    target_node_id: String,
    length: Option<TreeFloat>,
    nested_events: Vec<Event>,
}

/// One open `(`: completed children and the comments written before it.
#[derive(Debug, Default)]
struct Subtree {
    children: Vec<PendingEdge>,
    leading_comments: Vec<Token>,
}

/// Tokens belonging to one node position: name, length and comments.
#[derive(Debug, Default)]
struct NodePosition {
    name: Option<String>,
    length: Option<TreeFloat>,
    node_comments: Vec<Token>,
    edge_comments: Vec<Token>,
    position: SourcePosition,
}

/// Pull-based Newick / eNewick event reader.
///
/// Each call produces the events of one parsing step. Nesting is tracked
/// with an explicit stack of sibling queues, one per open `(`, so the
/// depth of the input never turns into call depth.
///
/// For `(A,B)C;` the events inside the document are: tree start, node `A`,
/// node `B`, node `C`, edges `C→A` and `C→B`, an optional root edge, tree
/// end.
pub struct NewickReader<R: Read> {
    scanner: NewickScanner<R>,
    config: ReaderConfig,
    state: ReaderState,
    buffer: VecDeque<Event>,
    sibling_stack: Vec<Subtree>,
    leading_comments: Vec<Token>,
    expect_node: bool,
    rooted: bool,
    network_nodes: FxHashMap<u64, String>,
    tree_count: usize,
    node_count: usize,
    edge_count: usize,
    meta_count: usize,
    network_labels_seen: usize,
    diagnostics: Vec<Diagnostic>,
}

// =============================================================================
// Convenience functions
// =============================================================================

/// Parses a Newick string into [Tree] objects.
pub fn parse_newick(s: &str) -> Result<Vec<Tree>, ReadError> {
    let mut reader = NewickReader::new(s.as_bytes(), ReaderConfig::default());
    TreeBuilder::new().read_all(&mut reader)
}

/// Parses an eNewick string; `#H1`-style labels become shared nodes.
pub fn parse_enewick(s: &str) -> Result<Vec<Tree>, ReadError> {
    let mut reader = NewickReader::new(
        s.as_bytes(),
        ReaderConfig::default().with_network(true),
    );
    TreeBuilder::new().read_all(&mut reader)
}

/// Converts multiple [Tree] objects to Newick, one tree per line.
///
/// Networks cannot be written and are skipped; see [NewickWriter].
pub fn write_newick(trees: &[Tree]) -> Result<String, WriteError> {
    let mut writer = NewickWriter::new();
    let mut output: Vec<u8> = Vec::new();
    let config = WriterConfig::default();
    for tree in trees {
        _ = writer.write_tree(tree, tree, tree, &mut output, &config)?;
    }
    String::from_utf8(output)
        .map_err(|err| WriteError::inconsistent(err.to_string()))
}

// =============================================================================
// NewickReader
// =============================================================================

impl<R: Read> NewickReader<R> {
    pub fn new(reader: R, config: ReaderConfig) -> Self {
        Self {
            scanner: NewickScanner::new(reader, config.replace_underscores()),
            config,
            state: ReaderState::BeforeDocument,
            buffer: VecDeque::new(),
            sibling_stack: Vec::new(),
            leading_comments: Vec::new(),
            expect_node: true,
            rooted: true,
            network_nodes: FxHashMap::default(),
            tree_count: 0,
            node_count: 0,
            edge_count: 0,
            meta_count: 0,
            network_labels_seen: 0,
            diagnostics: Vec::new(),
        }
    }

    /// Number of eNewick network labels (`name#H1`) read so far.
    pub fn network_labels_seen(&self) -> usize {
        self.network_labels_seen
    }

    fn fill_buffer(&mut self) -> Result<(), ReadError> {
        while self.buffer.is_empty() && self.state != ReaderState::Finished {
            let result = match self.state {
                ReaderState::BeforeDocument => {
                    self.buffer.push_back(Event::Start(ContentEvent::Document));
                    self.state = ReaderState::BeforeTree;
                    Ok(())
                }
                ReaderState::BeforeTree => self.read_tree_start(),
                ReaderState::InTree => self.read_in_tree(),
                ReaderState::AfterTree => self.read_tree_end(),
                ReaderState::Finished => Ok(()),
            };

            if let Err(err) = result {
                self.state = ReaderState::Finished;
                self.buffer.clear();
                return Err(err);
            }
        }
        Ok(())
    }

    // ===== Token helpers =====================================================

    fn peek_kind(&mut self) -> Result<Option<TokenKind>, ReadError> {
        Ok(self.scanner.peek()?.map(|token| token.kind))
    }

    fn take(&mut self) -> Result<Token, ReadError> {
        match self.scanner.next_token()? {
            Some(token) => Ok(token),
            None => Err(self.unexpected_end()),
        }
    }

    fn unexpected_end(&self) -> ReadError {
        let context = if self.sibling_stack.len() > 1 {
            EndContext::InsideSubtree
        } else {
            EndContext::TopLevel
        };
        ReadError::UnexpectedEnd { position: self.scanner.position(), context }
    }

    fn unexpected_token(&mut self, expected: &str) -> ReadError {
        let found = match self.scanner.peek() {
            Ok(token) => token.map(|t| (t.position, t.to_string())),
            Err(err) => return err,
        };
        match found {
            Some((position, found)) => ReadError::UnexpectedToken {
                position,
                found,
                expected: expected.to_string(),
            },
            None => self.unexpected_end(),
        }
    }

    fn next_node_id(&mut self) -> String {
        let id = format!("n{}", self.node_count);
        self.node_count += 1;
        id
    }

    fn next_edge_id(&mut self) -> String {
        let id = format!("e{}", self.edge_count);
        self.edge_count += 1;
        id
    }

    fn next_meta_id(&mut self) -> String {
        let id = format!("m{}", self.meta_count);
        self.meta_count += 1;
        id
    }

    fn tree_content_type(&self) -> EventContentType {
        if self.config.expect_network() {
            EventContentType::Network
        } else {
            EventContentType::Tree
        }
    }

    // ===== States ============================================================

    fn read_tree_start(&mut self) -> Result<(), ReadError> {
        let mut rooting_command = None;
        loop {
            match self.peek_kind()? {
                Some(TokenKind::Comment { .. }) => {
                    let token = self.take()?;
                    self.buffer.push_back(Event::comment(token.text));
                }
                Some(kind @ (TokenKind::RootedCommand | TokenKind::UnrootedCommand)) => {
                    _ = self.take()?;
                    rooting_command = Some(kind);
                }
                _ => break,
            }
        }

        match self.peek_kind()? {
            None => {
                if rooting_command.is_some() || self.tree_count == 0 {
                    return Err(self.unexpected_end());
                }
                self.buffer.push_back(Event::End(EventContentType::Document));
                self.state = ReaderState::Finished;
            }
            Some(
                TokenKind::TerminalSymbol
                | TokenKind::SubtreeEnd
                | TokenKind::ElementSeparator,
            ) => {
                return Err(self.unexpected_token("'(' or a node"));
            }
            Some(_) => {
                self.rooted = rooting_command != Some(TokenKind::UnrootedCommand);
                let tree = LabeledIdEvent {
                    id: format!("t{}", self.tree_count),
                    label: None,
                };
                self.tree_count += 1;
                self.buffer.push_back(Event::Start(
                    if self.config.expect_network() {
                        ContentEvent::Network(tree)
                    } else {
                        ContentEvent::Tree(tree)
                    },
                ));
                self.sibling_stack = vec![Subtree::default()];
                self.leading_comments.clear();
                self.network_nodes.clear();
                self.expect_node = true;
                self.state = ReaderState::InTree;
            }
        }
        Ok(())
    }

    fn read_in_tree(&mut self) -> Result<(), ReadError> {
        let Some(kind) = self.peek_kind()? else {
            return Err(self.unexpected_end());
        };

        if self.expect_node {
            match kind {
                // Kept until it is known whether a subtree or a leaf follows.
                TokenKind::Comment { .. } => {
                    let token = self.take()?;
                    self.leading_comments.push(token);
                }
                TokenKind::SubtreeStart => {
                    _ = self.take()?;
                    self.sibling_stack.push(Subtree {
                        children: Vec::new(),
                        leading_comments: std::mem::take(&mut self.leading_comments),
                    });
                }
                // Also covers empty leaves as in `(,)`.
                _ => {
                    let leading = std::mem::take(&mut self.leading_comments);
                    self.read_node(Vec::new(), leading)?;
                }
            }
            return Ok(());
        }

        match kind {
            TokenKind::ElementSeparator => {
                _ = self.take()?;
                self.expect_node = true;
            }
            TokenKind::SubtreeEnd => {
                _ = self.take()?;
                let subtree = self.sibling_stack.pop().unwrap_or_default();
                self.read_node(subtree.children, subtree.leading_comments)?;
            }
            _ => return Err(self.unexpected_token("',' or ')'")),
        }
        Ok(())
    }

    fn read_tree_end(&mut self) -> Result<(), ReadError> {
        match self.peek_kind()? {
            Some(TokenKind::TerminalSymbol) => {
                _ = self.take()?;
                self.close_tree()
            }
            // A single tree may omit its terminal symbol.
            None => self.close_tree(),
            Some(_) => Err(self.unexpected_token("';'")),
        }
    }

    fn close_tree(&mut self) -> Result<(), ReadError> {
        let mut top = self.sibling_stack.pop().unwrap_or_default().children;
        let root = match top.pop() {
            Some(root) if top.is_empty() && self.sibling_stack.is_empty() => root,
            _ => {
                return Err(ReadError::inconsistent(
                    "tree closed with other than exactly one top node",
                ));
            }
        };

        if root.length.is_some() || !root.nested_events.is_empty() {
            let edge = EdgeEvent {
                id: self.next_edge_id(),
                source_id: None,
                target_id: root.target_node_id,
                length: root.length,
            };
            self.buffer.push_back(Event::Start(ContentEvent::RootEdge(edge)));
            self.buffer.extend(root.nested_events);
            self.buffer.push_back(Event::End(EventContentType::RootEdge));
        }

        self.buffer.push_back(Event::End(self.tree_content_type()));
        self.state = ReaderState::BeforeTree;
        Ok(())
    }

    // ===== Node positions ====================================================

    /// Reads name, length and comments of a node. `leading` comments were
    /// written before the node and count as node comments.
    fn read_node_position(&mut self, leading: Vec<Token>) -> Result<NodePosition, ReadError> {
        let position = match leading.first() {
            Some(token) => Some(token.position),
            None => self.scanner.peek()?.map(|token| token.position),
        };
        let mut node = NodePosition {
            position: position.unwrap_or_else(|| self.scanner.position()),
            node_comments: leading,
            ..NodePosition::default()
        };

        loop {
            match self.peek_kind()? {
                Some(TokenKind::Name { .. })
                    if node.name.is_none() && node.length.is_none() =>
                {
                    node.name = Some(self.take()?.text);
                }
                Some(TokenKind::Length) if node.length.is_none() => {
                    node.length = self.take()?.numeric_value;
                }
                Some(TokenKind::Comment { .. }) => {
                    let token = self.take()?;
                    if node.length.is_some() {
                        node.edge_comments.push(token);
                    } else {
                        node.node_comments.push(token);
                    }
                }
                _ => break,
            }
        }

        // Without a length the comment boundary between node and edge is
        // unknown: the first hot comment stays with the node, every later
        // one belongs to the edge. A single hot comment stays with the node.
        let is_hot = |token: &Token| token.kind == TokenKind::Comment { hot: true };
        if node.length.is_none()
            && node.node_comments.iter().filter(|t| is_hot(*t)).count() >= 2
        {
            let mut first_hot_seen = false;
            let (kept, moved): (Vec<Token>, Vec<Token>) =
                std::mem::take(&mut node.node_comments).into_iter().partition(
                    |token| {
                        if !is_hot(token) {
                            return true;
                        }
                        let keep = !first_hot_seen;
                        first_hot_seen = true;
                        keep
                    },
                );
            node.node_comments = kept;
            node.edge_comments = moved;
        }

        Ok(node)
    }

    /// Reads the node position that follows a leaf start or a `)`, emits the
    /// node and the edges to its `children`, and queues the node's own edge.
    fn read_node(
        &mut self,
        children: Vec<PendingEdge>,
        leading: Vec<Token>,
    ) -> Result<(), ReadError> {
        let NodePosition { name, length, node_comments, edge_comments, position } =
            self.read_node_position(leading)?;
        let is_top = self.sibling_stack.len() == 1;
        let mut label = name.filter(|name| !name.is_empty());

        let mut existing_id = None;
        let mut new_id = None;
        let network = if self.config.expect_network() {
            label.as_deref().and_then(NetworkLabel::parse)
        } else {
            None
        };
        if let Some(network) = network {
            self.network_labels_seen += 1;
            label = Some(network.base_label).filter(|base| !base.is_empty());
            match self.network_nodes.get(&network.network_index) {
                Some(id) => existing_id = Some(id.clone()),
                None => {
                    let id = self.next_node_id();
                    _ = self.network_nodes.insert(network.network_index, id.clone());
                    new_id = Some(id);
                }
            }
        }

        let node_id = match (existing_id.clone(), new_id) {
            (Some(id), _) | (None, Some(id)) => id,
            (None, None) => self.next_node_id(),
        };

        if existing_id.is_some() {
            if !node_comments.is_empty() {
                let message = format!(
                    "metadata on repeated occurrence of network node {node_id} was discarded"
                );
                tracing::warn!(
                    node_id = %node_id,
                    position = %position,
                    "Discarding metadata of repeated network node"
                );
                self.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::DiscardedNetworkNodeMetadata,
                    message,
                    Some(position),
                ));
            }
        } else {
            self.buffer.push_back(Event::Start(ContentEvent::Node(NodeEvent {
                id: node_id.clone(),
                label,
                is_root: is_top && self.rooted,
            })));
            let mut nested = Vec::new();
            for token in node_comments {
                self.comment_events(token, &mut nested);
            }
            self.buffer.extend(nested);
            self.buffer.push_back(Event::End(EventContentType::Node));
        }

        for child in children {
            let edge = EdgeEvent {
                id: self.next_edge_id(),
                source_id: Some(node_id.clone()),
                target_id: child.target_node_id,
                length: child.length,
            };
            self.buffer.push_back(Event::Start(ContentEvent::Edge(edge)));
            self.buffer.extend(child.nested_events);
            self.buffer.push_back(Event::End(EventContentType::Edge));
        }

        let mut nested_events = Vec::new();
        for token in edge_comments {
            self.comment_events(token, &mut nested_events);
        }
        let Some(subtree) = self.sibling_stack.last_mut() else {
            return Err(ReadError::inconsistent("node outside of a tree"));
        };
        subtree.children.push(PendingEdge { target_node_id: node_id, length, nested_events });

        if is_top {
            self.state = ReaderState::AfterTree;
        } else {
            self.expect_node = false;
        }
        Ok(())
    }

    /// Converts one comment token into metadata events, or into a verbatim
    /// comment event if it is free text or cannot be parsed.
    fn comment_events(&mut self, token: Token, out: &mut Vec<Event>) {
        if token.kind != (TokenKind::Comment { hot: true }) {
            out.push(Event::comment(token.text));
            return;
        }

        match parse_hot_comment(&token.text, self.config.literal_translator()) {
            Ok(entries) => {
                for entry in entries {
                    let meta_id = self.next_meta_id();
                    out.extend(entry.to_events(meta_id));
                }
            }
            Err(err) => {
                tracing::warn!(
                    position = %token.position,
                    error = %err,
                    "Keeping malformed hot comment as plain comment"
                );
                self.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::DegradedHotComment,
                    err.to_string(),
                    Some(token.position),
                ));
                out.push(Event::comment(token.text));
            }
        }
    }
}

impl<R: Read> EventReader for NewickReader<R> {
    fn has_next_event(&mut self) -> Result<bool, ReadError> {
        self.fill_buffer()?;
        Ok(!self.buffer.is_empty())
    }

    fn next_event(&mut self) -> Result<Option<Event>, ReadError> {
        self.fill_buffer()?;
        Ok(self.buffer.pop_front())
    }

    fn peek_event(&mut self) -> Result<Option<&Event>, ReadError> {
        self.fill_buffer()?;
        Ok(self.buffer.front())
    }

    fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

impl<R: Read> Iterator for NewickReader<R> {
    type Item = Result<Event, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(s: &str) -> Vec<Event> {
        NewickReader::new(s.as_bytes(), ReaderConfig::default())
            .collect::<Result<Vec<Event>, ReadError>>()
            .unwrap()
    }

    fn shape(events: &[Event]) -> Vec<String> {
        events
            .iter()
            .map(|event| match event {
                Event::Start(ContentEvent::Node(node)) => {
                    format!("NODE {}", node.label.as_deref().unwrap_or("-"))
                }
                Event::Start(ContentEvent::Edge(edge)) => format!(
                    "EDGE {}>{}",
                    edge.source_id.as_deref().unwrap_or("-"),
                    edge.target_id
                ),
                Event::Start(content) => format!("+{}", content.content_type()),
                Event::End(content_type) => format!("-{content_type}"),
                Event::Sole(content) => content.content_type().to_string(),
            })
            .collect()
    }

    #[test]
    fn test_event_order() {
        assert_eq!(
            shape(&events("(A,B)C;")),
            vec![
                "+DOCUMENT",
                "+TREE",
                "NODE A",
                "-NODE",
                "NODE B",
                "-NODE",
                "NODE C",
                "-NODE",
                "EDGE n2>n0",
                "-EDGE",
                "EDGE n2>n1",
                "-EDGE",
                "-TREE",
                "-DOCUMENT",
            ]
        );
    }

    #[test]
    fn test_root_edge_comes_last() {
        let shape = shape(&events("(A:1)B:0.5;"));
        assert_eq!(
            &shape[shape.len() - 4..],
            &["+ROOT_EDGE", "-ROOT_EDGE", "-TREE", "-DOCUMENT"]
        );
    }

    #[test]
    fn test_comments_before_subtree_belong_to_its_node() {
        let events = events("([note](A,B),C);");
        let inner = events
            .iter()
            .position(|event| {
                matches!(
                    event,
                    Event::Start(ContentEvent::Node(node)) if node.label.is_none()
                )
            })
            .unwrap();
        assert_eq!(events[inner + 1], Event::comment("note"));
        assert_eq!(events[inner + 2], Event::End(EventContentType::Node));
    }

    #[test]
    fn test_rooting_flag() {
        let top_is_root = |s: &str| {
            events(s).into_iter().rev().find_map(|event| match event {
                Event::Start(ContentEvent::Node(node)) => Some(node.is_root),
                _ => None,
            })
        };
        assert_eq!(top_is_root("(A,B);"), Some(true));
        assert_eq!(top_is_root("[&R] (A,B);"), Some(true));
        assert_eq!(top_is_root("[&U] (A,B);"), Some(false));
        assert_eq!(top_is_root("[&u](A,B);"), Some(false));
    }

    #[test]
    fn test_structural_errors() {
        let test_cases = vec![
            ("(A,B;", "unexpected token"),
            ("(A,(B,C);", "unexpected token"),
            ("(A,B", "inside subtree"),
            ("[&R]", "top level"),
            ("", "top level"),
            ("(A)(B);", "unexpected token"),
            ("A,B;", "unexpected token"),
            (";", "unexpected token"),
        ];

        for (input, expected) in test_cases {
            println!("{input}");
            let result: Result<Vec<Event>, ReadError> =
                NewickReader::new(input.as_bytes(), ReaderConfig::default()).collect();
            let err = result.unwrap_err();
            match expected {
                "unexpected token" => {
                    assert!(matches!(err, ReadError::UnexpectedToken { .. }), "{err}")
                }
                "inside subtree" => assert!(matches!(
                    err,
                    ReadError::UnexpectedEnd { context: EndContext::InsideSubtree, .. }
                )),
                _ => assert!(matches!(
                    err,
                    ReadError::UnexpectedEnd { context: EndContext::TopLevel, .. }
                )),
            }
        }
    }

    #[test]
    fn test_reader_stops_after_error() {
        let mut reader = NewickReader::new("(A,B;".as_bytes(), ReaderConfig::default());
        let mut saw_error = false;
        for event in reader.by_ref() {
            if event.is_err() {
                saw_error = true;
            }
        }
        assert!(saw_error);
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_degraded_hot_comment() {
        let mut reader =
            NewickReader::new("A[&a={1,2];".as_bytes(), ReaderConfig::default());
        let events: Vec<Event> = reader.by_ref().map(|e| e.unwrap()).collect();
        assert!(events.contains(&Event::comment("&a={1,2")));
        assert_eq!(reader.diagnostics().len(), 1);
        assert_eq!(reader.diagnostics()[0].kind, DiagnosticKind::DegradedHotComment);
    }
}
