use crate::phylo::literal::{DefaultLiteralTranslator, LiteralTranslator};

use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Read-ahead limit used by format sniffing when the caller does not give
/// one explicitly.
pub const DEFAULT_READ_AHEAD_LIMIT: usize = 64 * 1024;

static READ_AHEAD_LIMIT: AtomicUsize = AtomicUsize::new(DEFAULT_READ_AHEAD_LIMIT);

/// Current process-wide read-ahead limit in bytes.
pub fn default_read_ahead_limit() -> usize {
    READ_AHEAD_LIMIT.load(Ordering::Relaxed)
}

/// Changes the process-wide read-ahead limit. Zero is clamped to one byte.
pub fn set_default_read_ahead_limit(limit: usize) {
    READ_AHEAD_LIMIT.store(limit.max(1), Ordering::Relaxed);
}

/// A label the writer had to change before it could be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEdit {
    pub node_id: String,
    pub original: String,
    pub edited: String,
}

pub type LabelEditReporter = Arc<dyn Fn(&LabelEdit) + Send + Sync>;

// =============================================================================
// ReaderConfig
// =============================================================================

/// Options recognized by event readers.
#[derive(Clone)]
pub struct ReaderConfig {
    expect_network: bool,
    replace_underscores: bool,
    literal_translator: Arc<dyn LiteralTranslator>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            expect_network: false,
            replace_underscores: true,
            literal_translator: Arc::new(DefaultLiteralTranslator),
        }
    }
}

impl ReaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interpret `name#H1`-style labels as shared network nodes (eNewick).
    pub fn with_network(mut self, expect_network: bool) -> Self {
        self.expect_network = expect_network;
        self
    }

    /// Whether underscores in unquoted names are read as spaces.
    pub fn with_replace_underscores(mut self, replace: bool) -> Self {
        self.replace_underscores = replace;
        self
    }

    pub fn with_literal_translator(
        mut self,
        translator: Arc<dyn LiteralTranslator>,
    ) -> Self {
        self.literal_translator = translator;
        self
    }

    pub fn expect_network(&self) -> bool {
        self.expect_network
    }

    pub fn replace_underscores(&self) -> bool {
        self.replace_underscores
    }

    pub fn literal_translator(&self) -> &dyn LiteralTranslator {
        self.literal_translator.as_ref()
    }
}

impl Debug for ReaderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderConfig")
            .field("expect_network", &self.expect_network)
            .field("replace_underscores", &self.replace_underscores)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// WriterConfig
// =============================================================================

/// Options recognized by event writers.
#[derive(Clone)]
pub struct WriterConfig {
    max_name_length: Option<usize>,
    label_edit_reporter: Option<LabelEditReporter>,
    literal_translator: Arc<dyn LiteralTranslator>,
    write_rooting_marker: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            max_name_length: None,
            label_edit_reporter: None,
            literal_translator: Arc::new(DefaultLiteralTranslator),
            write_rooting_marker: true,
        }
    }
}

impl WriterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Truncate node names longer than `max` characters.
    pub fn with_max_name_length(mut self, max: usize) -> Self {
        self.max_name_length = Some(max);
        self
    }

    pub fn with_label_edit_reporter(
        mut self,
        reporter: LabelEditReporter,
    ) -> Self {
        self.label_edit_reporter = Some(reporter);
        self
    }

    pub fn with_literal_translator(
        mut self,
        translator: Arc<dyn LiteralTranslator>,
    ) -> Self {
        self.literal_translator = translator;
        self
    }

    /// Whether a leading `[&R]`/`[&U]` is written before each tree.
    pub fn with_rooting_marker(mut self, write: bool) -> Self {
        self.write_rooting_marker = write;
        self
    }

    pub fn max_name_length(&self) -> Option<usize> {
        self.max_name_length
    }

    pub fn literal_translator(&self) -> &dyn LiteralTranslator {
        self.literal_translator.as_ref()
    }

    pub fn write_rooting_marker(&self) -> bool {
        self.write_rooting_marker
    }

    pub(crate) fn report_label_edit(&self, edit: &LabelEdit) {
        if let Some(reporter) = &self.label_edit_reporter {
            reporter(edit);
        }
    }
}

impl Debug for WriterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterConfig")
            .field("max_name_length", &self.max_name_length)
            .field("write_rooting_marker", &self.write_rooting_marker)
            .field("has_label_edit_reporter", &self.label_edit_reporter.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_ahead_limit_is_clamped() {
        let previous = default_read_ahead_limit();
        set_default_read_ahead_limit(0);
        assert_eq!(default_read_ahead_limit(), 1);
        set_default_read_ahead_limit(previous);
        assert_eq!(default_read_ahead_limit(), previous);
    }

    #[test]
    fn test_reader_config_builder() {
        let config = ReaderConfig::new()
            .with_network(true)
            .with_replace_underscores(false);
        assert!(config.expect_network());
        assert!(!config.replace_underscores());
    }
}
