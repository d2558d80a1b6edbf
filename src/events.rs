use crate::TreeFloat;
use crate::phylo::literal::{LiteralType, LiteralValue};

use std::fmt::Display;

// =============================================================================
// Type definitions
// =============================================================================

/// Content type of an [Event].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventContentType {
    Document,
    Tree,
    Network,
    Node,
    Edge,
    RootEdge,
    LiteralMeta,
    LiteralMetaContent,
    Comment,
}

/// Whether an [Event] opens a group, closes one, or stands alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTopologyType {
    None,
    Start,
    End,
}

/// A single element of the well-nested event stream shared by readers and
/// writers.
///
/// Every `Start` is matched by exactly one `End` of the same content type.
/// `LiteralMetaContent` and `Comment` payloads are always `Sole`.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Start(ContentEvent),
    End(EventContentType),
    Sole(ContentEvent),
}

/// Type-specific payload carried by [Event::Start] and [Event::Sole].
#[derive(Debug, Clone, PartialEq)]
pub enum ContentEvent {
    Document,
    Tree(LabeledIdEvent),
    Network(LabeledIdEvent),
    Node(NodeEvent),
    Edge(EdgeEvent),
    RootEdge(EdgeEvent),
    LiteralMeta(LiteralMetaEvent),
    LiteralMetaContent(LiteralContentEvent),
    Comment(CommentEvent),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledIdEvent {
    pub id: String,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeEvent {
    pub id: String,
    pub label: Option<String>,
    pub is_root: bool,
}

/// Edge between two nodes. Root edges have no `source_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeEvent {
    pub id: String,
    pub source_id: Option<String>,
    pub target_id: String,
    pub length: Option<TreeFloat>,
}

/// Opens one metadata entry. `key` is the key as it was spelled in the
/// source, `predicate` its canonical meaning.
#[derive(Debug, Clone, PartialEq)]
pub struct LiteralMetaEvent {
    pub id: String,
    pub predicate: Predicate,
    pub key: Option<String>,
    pub value_type: Option<LiteralType>,
}

/// Value of the enclosing metadata entry. A `continued` event must be
/// followed by further content before the entry ends.
#[derive(Debug, Clone, PartialEq)]
pub struct LiteralContentEvent {
    pub value: Option<LiteralValue>,
    pub string_value: Option<String>,
    pub continued: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentEvent {
    pub content: String,
    pub continued: bool,
}

/// Canonical predicate vocabulary for literal metadata.
///
/// The named variants are the ones the NHX convention reserves keys for;
/// everything else is [Predicate::HasLiteralMeta] with its original key
/// kept on the [LiteralMetaEvent].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predicate {
    GeneName,
    SequenceAccession,
    Confidence,
    ScientificName,
    TaxonomyId,
    Event,
    HasLiteralMeta,
}

// =============================================================================
// Event implementations
// =============================================================================

impl Event {
    pub fn content_type(&self) -> EventContentType {
        match self {
            Event::Start(content) | Event::Sole(content) => {
                content.content_type()
            }
            Event::End(content_type) => *content_type,
        }
    }

    pub fn topology_type(&self) -> EventTopologyType {
        match self {
            Event::Start(_) => EventTopologyType::Start,
            Event::End(_) => EventTopologyType::End,
            Event::Sole(_) => EventTopologyType::None,
        }
    }

    pub fn is_start(&self, content_type: EventContentType) -> bool {
        matches!(self, Event::Start(c) if c.content_type() == content_type)
    }

    pub fn is_end(&self, content_type: EventContentType) -> bool {
        matches!(self, Event::End(c) if *c == content_type)
    }

    pub fn comment(content: impl Into<String>) -> Self {
        Event::Sole(ContentEvent::Comment(CommentEvent {
            content: content.into(),
            continued: false,
        }))
    }

    pub fn literal_content(
        value: Option<LiteralValue>,
        string_value: Option<String>,
    ) -> Self {
        Event::Sole(ContentEvent::LiteralMetaContent(LiteralContentEvent {
            value,
            string_value,
            continued: false,
        }))
    }
}

impl ContentEvent {
    pub fn content_type(&self) -> EventContentType {
        match self {
            ContentEvent::Document => EventContentType::Document,
            ContentEvent::Tree(_) => EventContentType::Tree,
            ContentEvent::Network(_) => EventContentType::Network,
            ContentEvent::Node(_) => EventContentType::Node,
            ContentEvent::Edge(_) => EventContentType::Edge,
            ContentEvent::RootEdge(_) => EventContentType::RootEdge,
            ContentEvent::LiteralMeta(_) => EventContentType::LiteralMeta,
            ContentEvent::LiteralMetaContent(_) => {
                EventContentType::LiteralMetaContent
            }
            ContentEvent::Comment(_) => EventContentType::Comment,
        }
    }
}

impl Display for EventContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                EventContentType::Document => "DOCUMENT",
                EventContentType::Tree => "TREE",
                EventContentType::Network => "NETWORK",
                EventContentType::Node => "NODE",
                EventContentType::Edge => "EDGE",
                EventContentType::RootEdge => "ROOT_EDGE",
                EventContentType::LiteralMeta => "LITERAL_META",
                EventContentType::LiteralMetaContent => {
                    "LITERAL_META_CONTENT"
                }
                EventContentType::Comment => "COMMENT",
            }
        )
    }
}

// =============================================================================
// Predicate implementations
// =============================================================================

impl Predicate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Predicate::GeneName => "phyloxml:sequence.name",
            Predicate::SequenceAccession => "phyloxml:sequence.accession",
            Predicate::Confidence => "phyloxml:confidence",
            Predicate::ScientificName => "phyloxml:taxonomy.scientific_name",
            Predicate::TaxonomyId => "phyloxml:taxonomy.id",
            Predicate::Event => "phyloxml:events",
            Predicate::HasLiteralMeta => "dendros:hasLiteralMeta",
        }
    }
}

impl Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
