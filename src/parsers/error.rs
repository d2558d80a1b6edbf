use std::fmt::Display;
use thiserror::Error;

/// Location in a character stream. All fields are zero based; Display
/// prints line and column one based.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SourcePosition {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

/// Where the input ended when it was not supposed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndContext {
    InsideSubtree,
    TopLevel,
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Malformed input at {position}: {message}.")]
    Malformed { position: SourcePosition, message: String },
    #[error("Unexpected {found} at {position}; expected {expected}.")]
    UnexpectedToken {
        position: SourcePosition,
        found: String,
        expected: String,
    },
    #[error("Unexpected end of input {context} at {position}.")]
    UnexpectedEnd { position: SourcePosition, context: EndContext },
    #[error("Invalid branch length \"{text}\" at {position}.")]
    InvalidBranchLength { position: SourcePosition, text: String },
    #[error("Inconsistent input: {message}.")]
    Inconsistent { message: String },
    #[error("Input format could not be detected.")]
    UnknownFormat,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Inconsistent data: {message}.")]
    Inconsistent { message: String },
    #[error("Unknown {kind} id: {id}.")]
    UnknownId { kind: &'static str, id: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Kind of a non-fatal condition reported by a reader or writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    DegradedHotComment,
    DiscardedNetworkNodeMetadata,
    NetworkNotWritten,
    LabelEdited,
}

/// A non-fatal condition. Processing continues after it is recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub position: Option<SourcePosition>,
}

impl ReadError {
    pub fn position(&self) -> Option<SourcePosition> {
        match self {
            ReadError::Malformed { position, .. }
            | ReadError::UnexpectedToken { position, .. }
            | ReadError::UnexpectedEnd { position, .. }
            | ReadError::InvalidBranchLength { position, .. } => {
                Some(*position)
            }
            ReadError::Inconsistent { .. }
            | ReadError::UnknownFormat
            | ReadError::Io(_) => None,
        }
    }

    pub(crate) fn malformed(
        position: SourcePosition,
        message: impl Into<String>,
    ) -> Self {
        ReadError::Malformed { position, message: message.into() }
    }

    pub(crate) fn inconsistent(message: impl Into<String>) -> Self {
        ReadError::Inconsistent { message: message.into() }
    }
}

impl WriteError {
    pub(crate) fn inconsistent(message: impl Into<String>) -> Self {
        WriteError::Inconsistent { message: message.into() }
    }
}

impl Diagnostic {
    pub(crate) fn new(
        kind: DiagnosticKind,
        message: impl Into<String>,
        position: Option<SourcePosition>,
    ) -> Self {
        Self { kind, message: message.into(), position }
    }
}

impl Display for SourcePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line + 1, self.column + 1)
    }
}

impl Display for EndContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                EndContext::InsideSubtree => "inside a subtree",
                EndContext::TopLevel => "at the top level",
            }
        )
    }
}
