pub(crate) mod error;
pub(crate) mod formats;
pub(crate) mod newick;
pub(crate) mod protocol;
pub(crate) mod sniff;

use crate::config::{ReaderConfig, WriterConfig};
use crate::events::Event;
use crate::phylo::builder::TreeBuilder;
use crate::phylo::tree::Tree;
use error::{Diagnostic, ReadError, WriteError};
use formats::FormatRegistry;
use protocol::{EdgeDataProvider, NodeDataProvider, TopologyProvider};

use std::io::{Read, Write};

/// Pull-based source of [Event] values.
///
/// After an error is returned the reader is finished: later calls return
/// no more events.
pub trait EventReader {
    fn has_next_event(&mut self) -> Result<bool, ReadError>;
    fn next_event(&mut self) -> Result<Option<Event>, ReadError>;
    /// The event [next_event](EventReader::next_event) would return.
    fn peek_event(&mut self) -> Result<Option<&Event>, ReadError>;
    /// Non-fatal conditions recorded so far.
    fn diagnostics(&self) -> &[Diagnostic];
}

/// Serializes one tree at a time from data providers.
pub trait EventWriter {
    fn write(
        &mut self,
        topology: &dyn TopologyProvider,
        nodes: &dyn NodeDataProvider,
        edges: &dyn EdgeDataProvider,
        sink: &mut dyn Write,
        config: &WriterConfig,
    ) -> Result<WriteReport, WriteError>;

    fn diagnostics(&self) -> &[Diagnostic];
}

/// Outcome of [EventWriter::write].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteReport {
    /// False when the writer refused the input and wrote nothing.
    pub written: bool,
    pub node_count: usize,
}

/// Detects the format of `input` (gzip is unwrapped) and reads all trees.
pub fn parse_trees(input: impl Read + 'static) -> Result<Vec<Tree>, ReadError> {
    let config = ReaderConfig::default();
    let Some(mut detected) = FormatRegistry::default().guess_and_open(input, &config)? else {
        tracing::debug!("Not Newick or eNewick");
        return Err(ReadError::UnknownFormat);
    };
    tracing::debug!(
        format = %detected.format_id,
        compressed = detected.compressed,
        "Reading trees"
    );
    let trees = TreeBuilder::new().read_all(detected.reader.as_mut())?;
    tracing::debug!(format = %detected.format_id, trees = trees.len(), "Trees read");
    Ok(trees)
}
