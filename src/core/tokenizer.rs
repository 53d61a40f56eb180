//! XML Tokenizer - State machine for XML token extraction
//!
//! Implements a pull-parser style tokenizer that extracts XML tokens:
//! - Element start/end tags
//! - Text content (entities decoded)
//! - CDATA sections
//! - Comments
//! - Processing instructions and the XML declaration
//! - DOCTYPE declarations (kept raw, internal subset skipped)
//!
//! Broken markup (unterminated tags, comments, CDATA, PIs) is always an
//! error. Strict mode adds character and name validation.

use super::entities::{decode_text, decode_text_strict};
use super::scanner::{is_whitespace, Scanner};
use std::borrow::Cow;
use thiserror::Error;

/// Type of XML token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Element start tag: <element>
    StartTag,
    /// Element end tag: </element>
    EndTag,
    /// Empty element: <element/>
    EmptyTag,
    /// Text content
    Text,
    /// CDATA section: <![CDATA[...]]>
    CData,
    /// Comment: <!--...-->
    Comment,
    /// Processing instruction: <?target ...?>
    ProcessingInstruction,
    /// XML declaration: <?xml ...?>
    XmlDeclaration,
    /// DOCTYPE declaration
    DocType,
    /// End of input
    Eof,
}

/// A parsed XML token
#[derive(Debug, Clone)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Raw span in input (start, end)
    pub span: (usize, usize),
    /// Tag name or PI target
    pub name: Option<Cow<'a, [u8]>>,
    /// Text, CDATA, comment or PI data
    pub content: Option<Cow<'a, [u8]>>,
}

impl<'a> Token<'a> {
    fn new(kind: TokenKind, span: (usize, usize)) -> Self {
        Token {
            kind,
            span,
            name: None,
            content: None,
        }
    }

    fn with_name(mut self, name: &'a [u8]) -> Self {
        self.name = Some(Cow::Borrowed(name));
        self
    }

    fn with_content(mut self, content: Cow<'a, [u8]>) -> Self {
        self.content = Some(content);
        self
    }
}

/// A well-formedness error with the byte offset where it was detected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (line {line}, column {column})")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        ParseError {
            message: message.into(),
            position,
            line: 0,
            column: 0,
        }
    }

    /// Fill in line and column from the input the error was raised against
    pub fn locate(mut self, input: &[u8]) -> Self {
        let (line, column) = Scanner::new(input).line_and_column(self.position);
        self.line = line;
        self.column = column;
        self
    }
}

/// XML tokenizer implementing a pull-parser pattern
pub struct Tokenizer<'a> {
    scanner: Scanner<'a>,
    strict: bool,
    started: bool,
    done: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Tokenizer {
            scanner: Scanner::new(input),
            strict: false,
            started: false,
            done: false,
        }
    }

    /// Tokenizer that also validates characters, names and comment content
    pub fn new_strict(input: &'a [u8]) -> Self {
        Tokenizer {
            strict: true,
            ..Tokenizer::new(input)
        }
    }

    pub fn position(&self) -> usize {
        self.scanner.position()
    }

    fn error<T>(&self, message: impl Into<String>, position: usize) -> Result<T, ParseError> {
        Err(ParseError::new(message, position))
    }

    /// Get the next token; returns `Eof` once input is exhausted
    pub fn next_token(&mut self) -> Result<Token<'a>, ParseError> {
        if !self.started {
            self.started = true;
            // Byte order mark
            if self.scanner.starts_with(b"\xEF\xBB\xBF") {
                self.scanner.advance(3);
            }
            if !self.strict {
                self.scanner.skip_whitespace();
            }
        }

        let pos = self.scanner.position();
        match self.scanner.peek() {
            None => {
                self.done = true;
                Ok(Token::new(TokenKind::Eof, (pos, pos)))
            }
            Some(b'<') => self.parse_markup(),
            Some(_) => self.parse_text(),
        }
    }

    fn parse_markup(&mut self) -> Result<Token<'a>, ParseError> {
        let start = self.scanner.position();
        self.scanner.advance(1); // Skip '<'

        match self.scanner.peek() {
            Some(b'/') => self.parse_end_tag(start),
            Some(b'!') => self.parse_bang_markup(start),
            Some(b'?') => self.parse_pi(start),
            Some(_) => self.parse_start_tag(start),
            None => self.error("Unexpected end of input after '<'", start),
        }
    }

    fn parse_start_tag(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        let Some(name) = self.scanner.read_name() else {
            return self.error("Invalid element name: must start with letter, underscore, or colon", start);
        };
        if self.strict && name.contains(&b':') && (name.starts_with(b":") || name.ends_with(b":")) {
            return self.error("Invalid qualified name", start);
        }

        let Some(end) = self.scanner.find_tag_end_quoted() else {
            return self.error(format!("Unterminated start tag <{}>", String::from_utf8_lossy(name)), start);
        };
        let is_empty = self.scanner.slice(start, end).ends_with(b"/");

        self.scanner.set_position(end + 1);
        let kind = if is_empty { TokenKind::EmptyTag } else { TokenKind::StartTag };
        Ok(Token::new(kind, (start, end + 1)).with_name(name))
    }

    fn parse_end_tag(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(1); // Skip '/'

        let Some(name) = self.scanner.read_name() else {
            return self.error("Invalid element name in end tag", start);
        };
        self.scanner.skip_whitespace();
        if self.scanner.peek() != Some(b'>') {
            return self.error(format!("Malformed end tag </{}>", String::from_utf8_lossy(name)), start);
        }
        self.scanner.advance(1);

        Ok(Token::new(TokenKind::EndTag, (start, self.scanner.position())).with_name(name))
    }

    /// Comment, CDATA or DOCTYPE
    fn parse_bang_markup(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(1); // Skip '!'

        if self.scanner.starts_with(b"--") {
            self.scanner.advance(2);
            let content_start = self.scanner.position();
            let Some(end) = self.scanner.find_sequence(b"-->") else {
                return self.error("Unterminated comment", start);
            };
            let content = self.scanner.slice(content_start, end);
            if self.strict && (content.windows(2).any(|w| w == b"--") || content.ends_with(b"-")) {
                return self.error("'--' is not allowed inside a comment", start);
            }
            self.scanner.set_position(end + 3);
            Ok(Token::new(TokenKind::Comment, (start, end + 3)).with_content(Cow::Borrowed(content)))
        } else if self.scanner.starts_with(b"[CDATA[") {
            self.scanner.advance(7);
            let content_start = self.scanner.position();
            let Some(end) = self.scanner.find_sequence(b"]]>") else {
                return self.error("Unterminated CDATA section", start);
            };
            let content = self.scanner.slice(content_start, end);
            self.scanner.set_position(end + 3);
            Ok(Token::new(TokenKind::CData, (start, end + 3)).with_content(Cow::Borrowed(content)))
        } else if self.scanner.starts_with(b"DOCTYPE") {
            self.parse_doctype(start)
        } else {
            self.error("Invalid declaration - expected comment, CDATA, or DOCTYPE", start)
        }
    }

    /// DOCTYPE with an optional internal subset; the raw text is the content
    fn parse_doctype(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(7);
        let mut depth = 0usize;
        let mut quote: Option<u8> = None;

        while let Some(b) = self.scanner.peek() {
            self.scanner.advance(1);
            match (quote, b) {
                (Some(q), _) if q == b => quote = None,
                (Some(_), _) => {}
                (None, b'"' | b'\'') => quote = Some(b),
                (None, b'[') => depth += 1,
                (None, b']') => depth = depth.saturating_sub(1),
                (None, b'>') if depth == 0 => {
                    let end = self.scanner.position();
                    let raw = self.scanner.slice(start, end);
                    return Ok(Token::new(TokenKind::DocType, (start, end)).with_content(Cow::Borrowed(raw)));
                }
                _ => {}
            }
        }
        self.error("Unterminated DOCTYPE declaration", start)
    }

    fn parse_pi(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(1); // Skip '?'

        let Some(target) = self.scanner.read_name() else {
            return self.error("Invalid processing instruction target", start);
        };
        let is_xml_decl = target.eq_ignore_ascii_case(b"xml");
        if self.strict && is_xml_decl && (target != b"xml" || start != 0) {
            return self.error("XML declaration is only allowed at the start of the document", start);
        }

        let content_start = self.scanner.position();
        let Some(end) = self.scanner.find_sequence(b"?>") else {
            return self.error("Unterminated processing instruction", start);
        };
        let data = trim_whitespace(self.scanner.slice(content_start, end));
        self.scanner.set_position(end + 2);

        let kind = if is_xml_decl {
            TokenKind::XmlDeclaration
        } else {
            TokenKind::ProcessingInstruction
        };
        let token = Token::new(kind, (start, end + 2)).with_name(target);
        Ok(if data.is_empty() {
            token
        } else {
            token.with_content(Cow::Borrowed(data))
        })
    }

    fn parse_text(&mut self) -> Result<Token<'a>, ParseError> {
        let start = self.scanner.position();
        let end = self
            .scanner
            .find_tag_start()
            .unwrap_or(start + self.scanner.remaining().len());
        let content = self.scanner.slice(start, end);
        self.scanner.set_position(end);

        let decoded = if self.strict {
            if content.windows(3).any(|w| w == b"]]>") {
                return self.error("']]>' is not allowed in text content", start);
            }
            decode_text_strict(content).map_err(|msg| ParseError::new(msg, start))?
        } else {
            decode_text(content)
        };

        Ok(Token::new(TokenKind::Text, (start, end)).with_content(decoded))
    }
}

fn trim_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| !is_whitespace(b)).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|&b| !is_whitespace(b)).map_or(start, |i| i + 1);
    &bytes[start..end]
}

/// Iterator adapter for tokenizer; stops after the first error
impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<Token<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_token() {
            Ok(token) if token.kind == TokenKind::Eof => None,
            Ok(token) => Some(Ok(token)),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
