// -------------------------------------
// #![allow(dead_code)]
// #![allow(unused_imports)]
// #![allow(clippy::type_complexity)]
// #![allow(clippy::too_many_arguments)]
// -------------------------------------

pub mod config;
pub mod events;
mod parsers;
mod phylo;

pub type TreeFloat = f64;
pub type TreeInt = i64;

pub use parsers::EventReader;
pub use parsers::EventWriter;
pub use parsers::WriteReport;
pub use parsers::error::Diagnostic;
pub use parsers::error::DiagnosticKind;
pub use parsers::error::EndContext;
pub use parsers::error::ReadError;
pub use parsers::error::SourcePosition;
pub use parsers::error::WriteError;
pub use parsers::formats::DetectedReader;
pub use parsers::formats::FormatCapability;
pub use parsers::formats::FormatRegistry;
pub use parsers::formats::NewickFormat;
pub use parsers::newick::NewickReader;
pub use parsers::newick::labels::NetworkLabel;
pub use parsers::newick::parse_enewick;
pub use parsers::newick::parse_newick;
pub use parsers::newick::scanner::NewickScanner;
pub use parsers::newick::scanner::Token;
pub use parsers::newick::scanner::TokenKind;
pub use parsers::newick::write_newick;
pub use parsers::newick::writer::NewickWriter;
pub use parsers::parse_trees;
pub use parsers::protocol::EdgeDataProvider;
pub use parsers::protocol::EventReceiver;
pub use parsers::protocol::NodeDataProvider;
pub use parsers::protocol::TopologyProvider;
pub use parsers::sniff::ProbeInput;
pub use parsers::sniff::Replay;
pub use parsers::sniff::SniffStream;
pub use phylo::AnnotationEntry;
pub use phylo::BigDecimal;
pub use phylo::DefaultLiteralTranslator;
pub use phylo::Edge;
pub use phylo::EdgeId;
pub use phylo::LiteralTranslator;
pub use phylo::LiteralType;
pub use phylo::LiteralValue;
pub use phylo::Node;
pub use phylo::NodeId;
pub use phylo::Tree;
pub use phylo::TreeBuilder;
pub use phylo::TreeError;
