//! XML Attribute Parsing
//!
//! Parses the attribute list of a start tag into name/value pairs with
//! entity references decoded.

use super::entities::{decode_text, decode_text_strict};
use super::scanner::{is_name_start_char, Scanner};
use memchr::memchr;
use std::borrow::Cow;

/// A parsed XML attribute
#[derive(Debug, Clone)]
pub struct Attribute<'a> {
    /// Attribute name as written (may include a prefix)
    pub name: Cow<'a, [u8]>,
    /// Attribute value (entities decoded)
    pub value: Cow<'a, [u8]>,
    /// Local name (after colon, if prefixed)
    pub local_name: Cow<'a, [u8]>,
    /// Namespace prefix (before colon), if any
    pub prefix: Option<Cow<'a, [u8]>>,
}

impl<'a> Attribute<'a> {
    pub fn new(name: &'a [u8], value: Cow<'a, [u8]>) -> Self {
        let (prefix, local_name) = split_name(name);
        Attribute {
            name: Cow::Borrowed(name),
            value,
            local_name: Cow::Borrowed(local_name),
            prefix: prefix.map(Cow::Borrowed),
        }
    }

    pub fn name_str(&self) -> Option<&str> {
        std::str::from_utf8(self.name.as_ref()).ok()
    }

    pub fn value_str(&self) -> Option<&str> {
        std::str::from_utf8(self.value.as_ref()).ok()
    }

    pub fn local_name_str(&self) -> Option<&str> {
        std::str::from_utf8(self.local_name.as_ref()).ok()
    }

    /// True for `xmlns` and `xmlns:*` declarations
    pub fn is_namespace_declaration(&self) -> bool {
        self.name.as_ref() == b"xmlns" || self.prefix.as_deref() == Some(b"xmlns".as_slice())
    }
}

/// Split a qualified name into prefix and local name at the first colon
pub fn split_name(name: &[u8]) -> (Option<&[u8]>, &[u8]) {
    match memchr(b':', name) {
        Some(colon) => (Some(&name[..colon]), &name[colon + 1..]),
        None => (None, name),
    }
}

/// Parse attributes from the tag content following the element name
///
/// Lenient mode skips stray bytes and accepts unquoted or valueless
/// attributes; strict mode reports them.
pub fn parse_attributes(input: &[u8], strict: bool) -> Result<Vec<Attribute<'_>>, &'static str> {
    let mut attrs = Vec::new();
    let mut scanner = Scanner::new(input);

    loop {
        scanner.skip_whitespace();
        let Some(first) = scanner.peek() else { break };
        if first == b'/' || first == b'?' || first == b'>' {
            break;
        }

        let Some(name) = scanner.read_name() else {
            if strict && !is_name_start_char(first) {
                return Err("Attribute name must start with letter, underscore, or colon");
            }
            scanner.advance(1);
            continue;
        };

        scanner.skip_whitespace();
        if scanner.peek() != Some(b'=') {
            if strict {
                return Err("Attribute value required");
            }
            attrs.push(Attribute::new(name, Cow::Borrowed(b"")));
            continue;
        }
        scanner.advance(1);
        scanner.skip_whitespace();

        let value = match scanner.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                scanner.advance(1);
                let start = scanner.position();
                let Some(len) = memchr(quote, scanner.remaining()) else {
                    return Err("Attribute value has mismatched quotes");
                };
                let raw = scanner.slice(start, start + len);
                scanner.advance(len + 1);
                if strict {
                    if memchr(b'<', raw).is_some() {
                        return Err("Attribute value cannot contain '<'");
                    }
                    decode_text_strict(raw)?
                } else {
                    decode_text(raw)
                }
            }
            Some(_) if !strict => {
                let start = scanner.position();
                while scanner
                    .peek()
                    .is_some_and(|b| !matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'/' | b'>'))
                {
                    scanner.advance(1);
                }
                decode_text(scanner.slice(start, scanner.position()))
            }
            _ => return Err("Attribute value must be quoted"),
        };
        attrs.push(Attribute::new(name, value));
    }

    Ok(attrs)
}

/// Find the first attribute name that occurs twice
pub fn find_duplicate<'b>(attrs: &'b [Attribute<'_>]) -> Option<&'b [u8]> {
    attrs.iter().enumerate().find_map(|(i, a)| {
        attrs[i + 1..]
            .iter()
            .any(|b| b.name == a.name)
            .then_some(a.name.as_ref())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_attributes() {
        let attrs = parse_attributes(b" id=\"test\" class='foo'", false).unwrap();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].name_str(), Some("id"));
        assert_eq!(attrs[0].value_str(), Some("test"));
        assert_eq!(attrs[1].name_str(), Some("class"));
        assert_eq!(attrs[1].value_str(), Some("foo"));
    }

    #[test]
    fn test_namespaced_attribute() {
        let attrs = parse_attributes(b" xmlns:patch=\"http://schemas.xmlpatch\"", false).unwrap();
        assert_eq!(attrs[0].prefix.as_deref(), Some(b"xmlns".as_slice()));
        assert_eq!(attrs[0].local_name_str(), Some("patch"));
        assert!(attrs[0].is_namespace_declaration());
    }

    #[test]
    fn test_entity_and_gt_in_value() {
        let attrs = parse_attributes(b" create=\"after&gt;node[last()]\" find='a>b'", false).unwrap();
        assert_eq!(attrs[0].value_str(), Some("after>node[last()]"));
        assert_eq!(attrs[1].value_str(), Some("a>b"));
    }

    #[test]
    fn test_whitespace_handling() {
        let attrs = parse_attributes(b"  id  =  \"test\"  /", false).unwrap();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].value_str(), Some("test"));
    }

    #[test]
    fn test_lenient_unquoted_and_valueless() {
        let attrs = parse_attributes(b" a=1 checked", false).unwrap();
        assert_eq!(attrs[0].value_str(), Some("1"));
        assert_eq!(attrs[1].value_str(), Some(""));
    }

    #[test]
    fn test_strict_errors() {
        assert!(parse_attributes(b" a=1", true).is_err());
        assert!(parse_attributes(b" checked", true).is_err());
        assert!(parse_attributes(b" a=\"<\"", true).is_err());
    }

    #[test]
    fn test_find_duplicate() {
        let attrs = parse_attributes(b" a='1' b='2' a='3'", false).unwrap();
        assert_eq!(find_duplicate(&attrs), Some(b"a".as_slice()));
    }
}
