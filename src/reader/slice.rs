//! Zero-Copy Slice Reader
//!
//! Pulls `XmlEvent`s from a byte slice. Names and undecoded text borrow
//! directly from the input.

use super::events::{EndElement, StartElement, XmlEvent};
use crate::core::attributes::{parse_attributes, Attribute};
use crate::core::tokenizer::{ParseError, Token, TokenKind, Tokenizer};
use std::borrow::Cow;

/// XML event reader over a byte slice
pub struct SliceReader<'a> {
    input: &'a [u8],
    tokenizer: Tokenizer<'a>,
    strict: bool,
    finished: bool,
}

impl<'a> SliceReader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        SliceReader {
            input,
            tokenizer: Tokenizer::new(input),
            strict: false,
            finished: false,
        }
    }

    pub fn new_strict(input: &'a [u8]) -> Self {
        SliceReader {
            input,
            tokenizer: Tokenizer::new_strict(input),
            strict: true,
            finished: false,
        }
    }

    /// Byte offset of the next unread token
    pub fn position(&self) -> usize {
        self.tokenizer.position()
    }

    /// Get the next XML event; `EndDocument` marks the end of input
    pub fn next_event(&mut self) -> Result<XmlEvent<'a>, ParseError> {
        let token = self.tokenizer.next_token()?;
        let start = token.span.0;

        let event = match token.kind {
            TokenKind::Eof => XmlEvent::EndDocument,
            TokenKind::StartTag | TokenKind::EmptyTag => {
                let attrs = self.tag_attributes(&token)?;
                let elem = StartElement::new(self.token_name(&token), attrs);
                if token.kind == TokenKind::StartTag {
                    XmlEvent::StartElement(elem)
                } else {
                    XmlEvent::EmptyElement(elem)
                }
            }
            TokenKind::EndTag => XmlEvent::EndElement(EndElement::new(self.token_name(&token))),
            TokenKind::Text => XmlEvent::Text(token.content.unwrap_or(Cow::Borrowed(b""))),
            TokenKind::CData => XmlEvent::CData(token.content.unwrap_or(Cow::Borrowed(b""))),
            TokenKind::Comment => XmlEvent::Comment(token.content.unwrap_or(Cow::Borrowed(b""))),
            TokenKind::ProcessingInstruction => XmlEvent::ProcessingInstruction {
                target: token.name.unwrap_or(Cow::Borrowed(b"")),
                data: token.content,
            },
            TokenKind::XmlDeclaration => {
                let attrs = token
                    .content
                    .as_deref()
                    .map(|data| parse_attributes(data, self.strict))
                    .transpose()
                    .map_err(|msg| ParseError::new(msg, start))?
                    .unwrap_or_default();
                let find = |name: &[u8]| {
                    attrs
                        .iter()
                        .find(|a| a.name.as_ref() == name)
                        .map(|a| Cow::Owned(a.value.to_vec()))
                };
                let version = find(b"version");
                if self.strict && version.is_none() {
                    return Err(ParseError::new("XML declaration requires a version", start));
                }
                XmlEvent::XmlDeclaration {
                    raw: Cow::Borrowed(&self.input[token.span.0..token.span.1]),
                    version: version.unwrap_or(Cow::Borrowed(b"1.0")),
                    encoding: find(b"encoding"),
                    standalone: find(b"standalone").map(|v| v.as_ref() == b"yes"),
                }
            }
            TokenKind::DocType => XmlEvent::DocType(token.content.unwrap_or(Cow::Borrowed(b""))),
        };
        Ok(event)
    }

    fn token_name(&self, token: &Token<'a>) -> &'a [u8] {
        match token.name {
            Some(Cow::Borrowed(name)) => name,
            _ => b"",
        }
    }

    /// Parse attributes from a start or empty tag token
    fn tag_attributes(&self, token: &Token<'a>) -> Result<Vec<Attribute<'a>>, ParseError> {
        let (start, end) = token.span;
        let name_len = token.name.as_ref().map_or(0, |n| n.len());
        let attr_start = start + 1 + name_len;
        let mut attr_end = end - 1; // '>'
        if token.kind == TokenKind::EmptyTag {
            attr_end -= 1; // '/'
        }
        if attr_start >= attr_end {
            return Ok(Vec::new());
        }
        let content = &self.input[attr_start..attr_end];
        if self.strict && !content.first().is_some_and(|&b| crate::core::scanner::is_whitespace(b)) {
            return Err(ParseError::new("Whitespace required before attributes", start));
        }
        parse_attributes(content, self.strict).map_err(|msg| ParseError::new(msg, start))
    }
}

impl<'a> Iterator for SliceReader<'a> {
    type Item = Result<XmlEvent<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_event() {
            Ok(XmlEvent::EndDocument) => {
                self.finished = true;
                None
            }
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
