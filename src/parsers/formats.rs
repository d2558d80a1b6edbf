use crate::config::{ReaderConfig, default_read_ahead_limit};
use crate::events::{ContentEvent, Event};
use crate::parsers::error::ReadError;
use crate::parsers::newick::NewickReader;
use crate::parsers::newick::writer::NewickWriter;
use crate::parsers::sniff::{ProbeInput, SniffStream};
use crate::parsers::{EventReader, EventWriter};

use flate2::read::MultiGzDecoder;
use std::io::{ErrorKind, Read};

/// Events a Newick probe reads before it accepts the input.
const NEWICK_PROBE_EVENTS: usize = 20;

/// Events an eNewick probe reads while looking for a network label.
const ENEWICK_PROBE_EVENTS: usize = 1000;

/// What a format contributes to a [FormatRegistry].
pub trait FormatCapability: Send + Sync {
    fn format_id(&self) -> &str;

    /// Checks if `input` looks like this format. Errors count as "no".
    fn probe(
        &self,
        input: &mut dyn ProbeInput,
        config: &ReaderConfig,
    ) -> Result<bool, ReadError>;

    fn create_reader(
        &self,
        input: Box<dyn Read>,
        config: &ReaderConfig,
    ) -> Result<Box<dyn EventReader>, ReadError>;

    fn create_writer(&self) -> Option<Box<dyn EventWriter>>;
}

/// Reader chosen by [FormatRegistry::guess_and_open].
pub struct DetectedReader {
    pub format_id: String,
    /// Whether the input was gzip compressed.
    pub compressed: bool,
    pub reader: Box<dyn EventReader>,
}

/// Ordered list of format capabilities. Formats are probed in order and
/// the first match wins, so permissive formats belong at the end.
pub struct FormatRegistry {
    formats: Vec<Box<dyn FormatCapability>>,
}

/// Newick (`network == false`) or eNewick capability.
#[derive(Debug, Clone, Copy)]
pub struct NewickFormat {
    network: bool,
}

// =============================================================================
// FormatRegistry
// =============================================================================

impl Default for FormatRegistry {
    /// eNewick first, then Newick, which accepts almost anything.
    fn default() -> Self {
        let mut registry = Self::new();
        _ = registry
            .register(NewickFormat::enewick())
            .register(NewickFormat::newick());
        registry
    }
}

impl FormatRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self { formats: Vec::new() }
    }

    /// Appends a format; it is probed after all formats already present.
    pub fn register(
        &mut self,
        format: impl FormatCapability + 'static,
    ) -> &mut Self {
        self.formats.push(Box::new(format));
        self
    }

    /// Inserts a format at `index` (clamped to the end).
    pub fn insert(
        &mut self,
        index: usize,
        format: impl FormatCapability + 'static,
    ) -> &mut Self {
        let index = index.min(self.formats.len());
        self.formats.insert(index, Box::new(format));
        self
    }

    pub fn format_ids(&self) -> Vec<&str> {
        self.formats.iter().map(|format| format.format_id()).collect()
    }

    pub fn get(&self, format_id: &str) -> Option<&dyn FormatCapability> {
        self.formats
            .iter()
            .find(|format| format.format_id() == format_id)
            .map(|format| format.as_ref())
    }

    /// Identifies the format of `input`, reading at most `limit` bytes.
    pub fn guess<R: Read>(
        &self,
        input: R,
        limit: usize,
        config: &ReaderConfig,
    ) -> Result<Option<String>, ReadError> {
        let mut stream = SniffStream::new(input, limit);
        Ok(self.guess_stream(&mut stream, config)?.map(str::to_string))
    }

    /// Probes every format against `stream` from its current position and
    /// leaves the stream rewound to that position.
    pub fn guess_stream<R: Read>(
        &self,
        stream: &mut SniffStream<R>,
        config: &ReaderConfig,
    ) -> Result<Option<&str>, ReadError> {
        stream.mark();
        for format in &self.formats {
            let format_id = format.format_id();
            let detected = match format.probe(stream, config) {
                Ok(detected) if stream.close_requested() => {
                    tracing::debug!(
                        format = %format_id,
                        detected,
                        "Probe closed its input; treating as not detected"
                    );
                    false
                }
                Ok(detected) => detected,
                Err(err) => {
                    tracing::debug!(format = %format_id, error = %err, "Probe failed");
                    false
                }
            };
            stream.reset();

            if detected {
                tracing::debug!(format = %format_id, "Format detected");
                return Ok(Some(format_id));
            }
        }
        tracing::debug!("No format detected");
        Ok(None)
    }

    /// Detects the format with the process-wide read-ahead limit and opens
    /// a reader for it.
    ///
    /// Gzip input is decompressed transparently. The reader sees the input
    /// from its first byte.
    pub fn guess_and_open<R: Read + 'static>(
        &self,
        input: R,
        config: &ReaderConfig,
    ) -> Result<Option<DetectedReader>, ReadError> {
        self.guess_and_open_with_limit(input, default_read_ahead_limit(), config)
    }

    pub fn guess_and_open_with_limit<R: Read + 'static>(
        &self,
        input: R,
        limit: usize,
        config: &ReaderConfig,
    ) -> Result<Option<DetectedReader>, ReadError> {
        let mut stream = SniffStream::new(input, limit);
        stream.mark();
        let compressed = is_gzip(&mut stream)?;
        stream.reset();

        if compressed {
            tracing::debug!("Input is gzip compressed");
            let decoder: Box<dyn Read> =
                Box::new(MultiGzDecoder::new(stream.into_replay()));
            self.open(SniffStream::new(decoder, limit), true, config)
        } else {
            self.open(stream, false, config)
        }
    }

    fn open<R: Read + 'static>(
        &self,
        mut stream: SniffStream<R>,
        compressed: bool,
        config: &ReaderConfig,
    ) -> Result<Option<DetectedReader>, ReadError> {
        let Some(format_id) = self.guess_stream(&mut stream, config)? else {
            return Ok(None);
        };
        let Some(format) = self.get(format_id) else {
            return Ok(None);
        };

        let reader =
            format.create_reader(Box::new(stream.into_replay()), config)?;
        Ok(Some(DetectedReader {
            format_id: format_id.to_string(),
            compressed,
            reader,
        }))
    }
}

/// Tries to decompress one byte. Header errors mean the input is not gzip.
fn is_gzip<R: Read>(stream: &mut SniffStream<R>) -> Result<bool, ReadError> {
    let mut decoder = MultiGzDecoder::new(stream);
    let mut byte = [0u8; 1];
    match decoder.read(&mut byte) {
        Ok(n) => Ok(n > 0),
        Err(err)
            if matches!(
                err.kind(),
                ErrorKind::InvalidInput
                    | ErrorKind::InvalidData
                    | ErrorKind::UnexpectedEof
            ) =>
        {
            Ok(false)
        }
        Err(err) => Err(err.into()),
    }
}

// =============================================================================
// NewickFormat
// =============================================================================

impl NewickFormat {
    pub fn newick() -> Self {
        Self { network: false }
    }

    pub fn enewick() -> Self {
        Self { network: true }
    }

    fn reader_config(&self, config: &ReaderConfig) -> ReaderConfig {
        config.clone().with_network(self.network)
    }
}

impl FormatCapability for NewickFormat {
    fn format_id(&self) -> &str {
        if self.network { "enewick" } else { "newick" }
    }

    /// Newick accepts input whose first events form a tree with at least
    /// one node and read without error. eNewick additionally needs a
    /// network label.
    fn probe(
        &self,
        input: &mut dyn ProbeInput,
        config: &ReaderConfig,
    ) -> Result<bool, ReadError> {
        let mut reader = NewickReader::new(input, self.reader_config(config));
        let max_events = if self.network {
            ENEWICK_PROBE_EVENTS
        } else {
            NEWICK_PROBE_EVENTS
        };

        let mut saw_tree = false;
        let mut saw_node = false;
        let mut count = 0;
        while count < max_events {
            let Some(event) = reader.next_event()? else {
                break;
            };
            count += 1;
            match event {
                Event::Start(
                    ContentEvent::Tree(_) | ContentEvent::Network(_),
                ) => saw_tree = true,
                Event::Start(ContentEvent::Node(_)) => saw_node = true,
                Event::Start(ContentEvent::Document) | Event::Sole(_) => {}
                _ if saw_tree => {}
                _ => return Ok(false),
            }

            if self.network
                && saw_node
                && count >= NEWICK_PROBE_EVENTS
                && reader.network_labels_seen() > 0
            {
                return Ok(true);
            }
        }

        Ok(saw_node && (!self.network || reader.network_labels_seen() > 0))
    }

    fn create_reader(
        &self,
        input: Box<dyn Read>,
        config: &ReaderConfig,
    ) -> Result<Box<dyn EventReader>, ReadError> {
        Ok(Box::new(NewickReader::new(input, self.reader_config(config))))
    }

    fn create_writer(&self) -> Option<Box<dyn EventWriter>> {
        Some(Box::new(NewickWriter::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_order() {
        assert_eq!(
            FormatRegistry::default().format_ids(),
            vec!["enewick", "newick"]
        );
    }

    #[test]
    fn test_insert_is_clamped() {
        let mut registry = FormatRegistry::new();
        _ = registry
            .insert(5, NewickFormat::newick())
            .insert(0, NewickFormat::enewick());
        assert_eq!(registry.format_ids(), vec!["enewick", "newick"]);
        assert!(registry.get("newick").is_some());
        assert!(registry.get("nexus").is_none());
    }

    #[test]
    fn test_guess() {
        let registry = FormatRegistry::default();
        let config = ReaderConfig::default();
        let test_cases = vec![
            ("(A,B)C;", Some("newick")),
            ("[&R] ((A:1,B:2)X#H1,(X#H1,C));", Some("enewick")),
            ("A;", Some("newick")),
            ("", None),
            ("#NEXUS\nbegin trees;", None),
            ("(A,B", None),
        ];
        for (input, expected) in test_cases {
            println!("{input}");
            let guessed =
                registry.guess(input.as_bytes(), 1024, &config).unwrap();
            assert_eq!(guessed.as_deref(), expected);
        }
    }
}
