use crate::TreeFloat;
use crate::parsers::error::{ReadError, SourcePosition};

use std::collections::VecDeque;
use std::fmt::Display;
use std::io::{BufReader, Read};
use utf8::{BufReadDecoder, BufReadDecoderError};

/// Lexical token kinds of the Newick grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Node name; `delimited` if it was written in quotes.
    Name { delimited: bool },
    /// Branch length introduced by `:`.
    Length,
    SubtreeStart,
    SubtreeEnd,
    ElementSeparator,
    TerminalSymbol,
    /// Bracketed comment; `hot` if its content starts with `&`.
    Comment { hot: bool },
    RootedCommand,
    UnrootedCommand,
}

/// A token with its (already unescaped) text and where it started.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub numeric_value: Option<TreeFloat>,
    pub position: SourcePosition,
}

/// Checks if a character ends an unquoted name or a branch length.
fn is_name_delimiter(c: char) -> bool {
    matches!(c, '(' | ')' | '[' | ']' | ',' | ';' | ':') || c.is_whitespace()
}

// =============================================================================
// Character source
// =============================================================================

/// UTF-8 decoding character stream with one character of lookahead.
struct CharSource<R: Read> {
    decoder: BufReadDecoder<BufReader<R>>,
    pending: VecDeque<char>,
    position: SourcePosition,
    exhausted: bool,
}

impl<R: Read> CharSource<R> {
    fn new(reader: R) -> Self {
        Self {
            decoder: BufReadDecoder::new(BufReader::new(reader)),
            pending: VecDeque::new(),
            position: SourcePosition::default(),
            exhausted: false,
        }
    }

    fn fill(&mut self) -> Result<(), ReadError> {
        while self.pending.is_empty() && !self.exhausted {
            match self.decoder.next_strict() {
                Some(Ok(chunk)) => self.pending.extend(chunk.chars()),
                Some(Err(BufReadDecoderError::InvalidByteSequence(bytes))) => {
                    return Err(ReadError::malformed(
                        self.position,
                        format!("invalid UTF-8 byte sequence {bytes:02X?}"),
                    ));
                }
                Some(Err(BufReadDecoderError::Io(err))) => {
                    return Err(err.into());
                }
                None => self.exhausted = true,
            }
        }
        Ok(())
    }

    fn peek(&mut self) -> Result<Option<char>, ReadError> {
        self.fill()?;
        Ok(self.pending.front().copied())
    }

    fn next(&mut self) -> Result<Option<char>, ReadError> {
        self.fill()?;
        let c = self.pending.pop_front();
        if let Some(c) = c {
            self.position.offset += 1;
            if c == '\n' {
                self.position.line += 1;
                self.position.column = 0;
            } else {
                self.position.column += 1;
            }
        }
        Ok(c)
    }

    fn position(&self) -> SourcePosition {
        self.position
    }
}

// =============================================================================
// Scanner
// =============================================================================

/// Lazily turns a byte stream into Newick [Token]s.
///
/// Whitespace between tokens is skipped. `[&R]` and `[&U]` (any case) are
/// reported as rooting commands only at the start of a tree, i.e. before
/// the first structural token of the document or after a `;`.
pub struct NewickScanner<R: Read> {
    chars: CharSource<R>,
    lookahead: VecDeque<Token>,
    replace_underscores: bool,
    expect_rooting_command: bool,
}

impl<R: Read> NewickScanner<R> {
    pub fn new(reader: R, replace_underscores: bool) -> Self {
        Self {
            chars: CharSource::new(reader),
            lookahead: VecDeque::new(),
            replace_underscores,
            expect_rooting_command: true,
        }
    }

    pub fn next_token(&mut self) -> Result<Option<Token>, ReadError> {
        if self.lookahead.is_empty() {
            self.scan()?;
        }
        Ok(self.lookahead.pop_front())
    }

    pub fn peek(&mut self) -> Result<Option<&Token>, ReadError> {
        if self.lookahead.is_empty() {
            self.scan()?;
        }
        Ok(self.lookahead.front())
    }

    pub fn has_more_tokens(&mut self) -> Result<bool, ReadError> {
        Ok(self.peek()?.is_some())
    }

    /// Position of the next unread character.
    pub fn position(&self) -> SourcePosition {
        self.chars.position()
    }

    fn skip_whitespace(&mut self) -> Result<(), ReadError> {
        while let Some(c) = self.chars.peek()? {
            if !c.is_whitespace() {
                break;
            }
            _ = self.chars.next()?;
        }
        Ok(())
    }

    /// Scans at least one token into the lookahead, or nothing at end of
    /// input.
    fn scan(&mut self) -> Result<(), ReadError> {
        self.skip_whitespace()?;
        let position = self.chars.position();
        let Some(c) = self.chars.peek()? else {
            return Ok(());
        };

        let token = match c {
            '(' => self.symbol(TokenKind::SubtreeStart, position)?,
            ')' => self.symbol(TokenKind::SubtreeEnd, position)?,
            ',' => self.symbol(TokenKind::ElementSeparator, position)?,
            ';' => self.symbol(TokenKind::TerminalSymbol, position)?,
            '[' => self.read_comment(position)?,
            ':' => return self.read_length(position),
            '\'' | '"' => self.read_delimited_name(position)?,
            ']' => {
                return Err(ReadError::malformed(
                    position,
                    "closing ']' without an open comment",
                ));
            }
            _ => self.read_unquoted_name(position)?,
        };

        match token.kind {
            TokenKind::TerminalSymbol => self.expect_rooting_command = true,
            TokenKind::Comment { .. } => {}
            _ => self.expect_rooting_command = false,
        }
        self.lookahead.push_back(token);
        Ok(())
    }

    fn symbol(
        &mut self,
        kind: TokenKind,
        position: SourcePosition,
    ) -> Result<Token, ReadError> {
        let text = self.chars.next()?.map(String::from).unwrap_or_default();
        Ok(Token { kind, text, numeric_value: None, position })
    }

    fn read_comment(
        &mut self,
        position: SourcePosition,
    ) -> Result<Token, ReadError> {
        _ = self.chars.next()?;
        let mut content = String::new();
        let mut depth = 1;
        let mut quote: Option<char> = None;

        loop {
            let Some(c) = self.chars.next()? else {
                return Err(ReadError::malformed(
                    position,
                    "unterminated comment",
                ));
            };

            // Quotes only protect brackets inside hot comments; free text
            // is full of apostrophes.
            if let Some(q) = quote {
                if c == q {
                    quote = None;
                }
                content.push(c);
                continue;
            }

            match c {
                '[' => {
                    depth += 1;
                    content.push(c);
                }
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    content.push(c);
                }
                '"' | '\'' if content.starts_with('&') => {
                    quote = Some(c);
                    content.push(c);
                }
                _ => content.push(c),
            }
        }

        let kind = match content.trim() {
            command
                if self.expect_rooting_command
                    && command.eq_ignore_ascii_case("&r") =>
            {
                TokenKind::RootedCommand
            }
            command
                if self.expect_rooting_command
                    && command.eq_ignore_ascii_case("&u") =>
            {
                TokenKind::UnrootedCommand
            }
            _ => TokenKind::Comment { hot: content.starts_with('&') },
        };

        Ok(Token { kind, text: content, numeric_value: None, position })
    }

    /// Reads `:` and the following number. Comments between the colon and
    /// the number are queued after the length token.
    fn read_length(&mut self, position: SourcePosition) -> Result<(), ReadError> {
        _ = self.chars.next()?;
        let mut comments = Vec::new();
        loop {
            self.skip_whitespace()?;
            if self.chars.peek()? == Some('[') {
                let comment_position = self.chars.position();
                comments.push(self.read_comment(comment_position)?);
            } else {
                break;
            }
        }

        let mut text = String::new();
        while let Some(c) = self.chars.peek()? {
            if is_name_delimiter(c) {
                break;
            }
            text.push(c);
            _ = self.chars.next()?;
        }

        let length = match text.parse::<TreeFloat>() {
            Ok(length) if length.is_finite() => length,
            _ => {
                return Err(ReadError::InvalidBranchLength { position, text });
            }
        };

        self.expect_rooting_command = false;
        self.lookahead.push_back(Token {
            kind: TokenKind::Length,
            text,
            numeric_value: Some(length),
            position,
        });
        self.lookahead.extend(comments);
        Ok(())
    }

    /// Reads a quoted name. A doubled delimiter stands for one literal
    /// delimiter character.
    fn read_delimited_name(
        &mut self,
        position: SourcePosition,
    ) -> Result<Token, ReadError> {
        let delimiter = self.chars.next()?.unwrap_or('\'');
        let mut text = String::new();
        loop {
            match self.chars.next()? {
                None => {
                    return Err(ReadError::malformed(
                        position,
                        "unterminated quoted name",
                    ));
                }
                Some(c) if c == delimiter => {
                    if self.chars.peek()? == Some(delimiter) {
                        _ = self.chars.next()?;
                        text.push(delimiter);
                    } else {
                        break;
                    }
                }
                Some(c) => text.push(c),
            }
        }

        Ok(Token {
            kind: TokenKind::Name { delimited: true },
            text,
            numeric_value: None,
            position,
        })
    }

    fn read_unquoted_name(
        &mut self,
        position: SourcePosition,
    ) -> Result<Token, ReadError> {
        let mut text = String::new();
        while let Some(c) = self.chars.peek()? {
            if is_name_delimiter(c) {
                break;
            }
            text.push(c);
            _ = self.chars.next()?;
        }

        if self.replace_underscores {
            text = text.replace('_', " ");
        }

        Ok(Token {
            kind: TokenKind::Name { delimited: false },
            text,
            numeric_value: None,
            position,
        })
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                TokenKind::Name { .. } => "name",
                TokenKind::Length => "branch length",
                TokenKind::SubtreeStart => "'('",
                TokenKind::SubtreeEnd => "')'",
                TokenKind::ElementSeparator => "','",
                TokenKind::TerminalSymbol => "';'",
                TokenKind::Comment { .. } => "comment",
                TokenKind::RootedCommand => "rooted command",
                TokenKind::UnrootedCommand => "unrooted command",
            }
        )
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TokenKind::Name { .. } => write!(f, "name \"{}\"", self.text),
            TokenKind::Length => write!(f, "branch length \"{}\"", self.text),
            kind => write!(f, "{kind}"),
        }
    }
}
