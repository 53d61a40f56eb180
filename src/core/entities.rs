//! XML Entity Decoding and Escaping
//!
//! Handles decoding of XML entities:
//! - Built-in entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//!
//! Unknown named references are kept verbatim. Uses Cow for zero-copy when
//! no entities are present.

use memchr::{memchr, memchr3};
use std::borrow::Cow;

/// Decode text content, handling entity references
///
/// Returns Borrowed if no entities present (zero-copy),
/// returns Owned if entities were decoded.
#[inline]
pub fn decode_text(input: &[u8]) -> Cow<'_, [u8]> {
    if memchr(b'&', input).is_none() {
        return Cow::Borrowed(input);
    }
    Cow::Owned(decode_entities(input, false).unwrap_or_else(|_| input.to_vec()))
}

/// Decode text content, rejecting character references to non-XML characters
/// and raw control characters
pub fn decode_text_strict(input: &[u8]) -> Result<Cow<'_, [u8]>, &'static str> {
    if input.iter().any(|&b| b < 0x20 && !matches!(b, 0x9 | 0xA | 0xD)) {
        return Err("Invalid XML character in content");
    }
    if memchr(b'&', input).is_none() {
        return Ok(Cow::Borrowed(input));
    }
    decode_entities(input, true).map(Cow::Owned)
}

fn decode_entities(input: &[u8], strict: bool) -> Result<Vec<u8>, &'static str> {
    let mut result = Vec::with_capacity(input.len());
    let mut pos = 0;

    while let Some(amp) = memchr(b'&', &input[pos..]) {
        result.extend_from_slice(&input[pos..pos + amp]);
        pos += amp;

        let decoded = memchr(b';', &input[pos..]).and_then(|semi| {
            let entity = &input[pos + 1..pos + semi];
            decode_entity(entity, strict).map(|c| (c, semi))
        });

        match decoded {
            Some((Ok(c), semi)) => {
                let mut buf = [0u8; 4];
                result.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                pos += semi + 1;
            }
            Some((Err(msg), _)) => return Err(msg),
            None => {
                // Unknown entity or stray ampersand, keep as-is
                result.push(b'&');
                pos += 1;
            }
        }
    }
    result.extend_from_slice(&input[pos..]);
    Ok(result)
}

/// Decode a single entity body (without & and ;)
fn decode_entity(entity: &[u8], strict: bool) -> Option<Result<char, &'static str>> {
    match entity {
        b"lt" => Some(Ok('<')),
        b"gt" => Some(Ok('>')),
        b"amp" => Some(Ok('&')),
        b"quot" => Some(Ok('"')),
        b"apos" => Some(Ok('\'')),
        [b'#', digits @ ..] => {
            let codepoint = match digits {
                [b'x' | b'X', hex @ ..] => std::str::from_utf8(hex)
                    .ok()
                    .and_then(|s| u32::from_str_radix(s, 16).ok()),
                dec => std::str::from_utf8(dec).ok().and_then(|s| s.parse::<u32>().ok()),
            };
            match codepoint {
                Some(cp) if strict && !is_valid_xml_char(cp) => {
                    Some(Err("Invalid character reference"))
                }
                Some(cp) => char::from_u32(cp).map(Ok),
                None if strict => Some(Err("Malformed character reference")),
                None => None,
            }
        }
        _ => None,
    }
}

/// Check if a code point is a valid XML 1.0 Char
/// Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
#[inline]
pub fn is_valid_xml_char(codepoint: u32) -> bool {
    matches!(codepoint,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}

/// Escape character data for element content
pub fn escape_text(input: &str) -> Cow<'_, str> {
    if memchr3(b'<', b'>', b'&', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }
    escape(input, false)
}

/// Escape an attribute value for output inside double quotes
pub fn escape_attribute(input: &str) -> Cow<'_, str> {
    let bytes = input.as_bytes();
    let needs_escape = memchr3(b'<', b'&', b'"', bytes).is_some()
        || memchr3(b'\n', b'\r', b'\t', bytes).is_some();
    if !needs_escape {
        return Cow::Borrowed(input);
    }
    escape(input, true)
}

fn escape(input: &str, attribute: bool) -> Cow<'_, str> {
    let mut result = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '"' if attribute => result.push_str("&quot;"),
            '\n' if attribute => result.push_str("&#10;"),
            '\r' if attribute => result.push_str("&#13;"),
            '\t' if attribute => result.push_str("&#9;"),
            _ => result.push(c),
        }
    }
    Cow::Owned(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_entities() {
        let result = decode_text(b"Hello, World!");
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result.as_ref(), b"Hello, World!");
    }

    #[test]
    fn test_basic_entities() {
        let result = decode_text(b"&lt;hello&gt; &amp; &quot;world&quot; &apos;");
        assert_eq!(result.as_ref(), b"<hello> & \"world\" '");
    }

    #[test]
    fn test_numeric_references() {
        assert_eq!(decode_text(b"&#65;&#x42;&#X43;").as_ref(), b"ABC");
        let emoji = decode_text(b"&#x1F600;");
        assert_eq!(std::str::from_utf8(emoji.as_ref()).unwrap(), "\u{1F600}");
    }

    #[test]
    fn test_unknown_entity_kept() {
        assert_eq!(decode_text(b"&unknown; & done").as_ref(), b"&unknown; & done");
    }

    #[test]
    fn test_strict_rejects_bad_reference() {
        assert!(decode_text_strict(b"&#0;").is_err());
        assert!(decode_text_strict(b"&#xZZ;").is_err());
        assert!(decode_text_strict(b"a\x01b").is_err());
        assert_eq!(decode_text_strict(b"a &amp; b").unwrap().as_ref(), b"a & b");
    }

    #[test]
    fn test_escape_text() {
        assert!(matches!(escape_text("plain"), Cow::Borrowed(_)));
        assert_eq!(escape_text("<a> & \"b\"").as_ref(), "&lt;a&gt; &amp; \"b\"");
    }

    #[test]
    fn test_escape_attribute() {
        assert_eq!(escape_attribute("say \"hi\" & <go>").as_ref(), "say &quot;hi&quot; &amp; &lt;go&gt;");
        assert_eq!(escape_attribute("a\nb").as_ref(), "a&#10;b");
    }
}
