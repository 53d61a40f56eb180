//! XML Serialization
//!
//! Writes a document (or a subtree) back to text. Uses an explicit stack so
//! deep documents do not overflow the call stack.
//!
//! Namespace bindings are tracked while writing: an element or attribute
//! whose prefix is not bound to its namespace URI at that point gets an
//! `xmlns` declaration added, which covers nodes created or imported after
//! parsing.

use super::document::XmlDocument;
use super::node::{NodeId, NodeKind};
use crate::core::entities::{escape_attribute, escape_text};
use std::io;

/// Serializer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Emit the XML declaration the source was parsed with, if any
    pub xml_declaration: bool,
    /// Indent element-only content by this many spaces per level
    pub indent: Option<usize>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            xml_declaration: true,
            indent: None,
        }
    }
}

enum StackEntry {
    Enter(NodeId, usize),
    /// Closing tag, with the binding count to restore and whether to indent
    Close(NodeId, usize, usize, bool),
    Newline(usize),
}

/// Prefix bindings in scope while writing ("" is the default namespace)
struct Bindings {
    scope: Vec<(String, String)>,
}

impl Bindings {
    fn lookup(&self, prefix: &str) -> Option<&str> {
        match prefix {
            "xml" => Some(super::namespace::ns::XML),
            _ => self
                .scope
                .iter()
                .rev()
                .find(|(p, _)| p == prefix)
                .map(|(_, uri)| uri.as_str()),
        }
    }

    fn is_bound(&self, prefix: &str, uri: &str) -> bool {
        self.lookup(prefix).unwrap_or("") == uri
    }
}

/// Serialize a whole document
pub fn write_document(doc: &XmlDocument, options: &WriteOptions) -> String {
    let mut buf = String::with_capacity(1024);

    if options.xml_declaration {
        if let Some(decl) = doc.xml_declaration() {
            buf.push_str(decl);
            buf.push('\n');
        }
    }
    if let Some(doctype) = doc.doctype() {
        buf.push_str(doctype);
        buf.push('\n');
    }

    for (index, child) in doc.children(doc.document_node_id()).enumerate() {
        if index > 0 && options.indent.is_some() {
            buf.push('\n');
        }
        write_subtree(doc, child, options.indent, &mut buf);
    }
    buf
}

/// Serialize a whole document into a writer
pub fn write_to<W: io::Write>(doc: &XmlDocument, options: &WriteOptions, out: &mut W) -> io::Result<()> {
    out.write_all(write_document(doc, options).as_bytes())
}

fn write_subtree(doc: &XmlDocument, node_id: NodeId, indent: Option<usize>, buf: &mut String) {
    let mut bindings = Bindings { scope: Vec::new() };
    let mut stack: Vec<StackEntry> = Vec::with_capacity(64);
    stack.push(StackEntry::Enter(node_id, 0));

    while let Some(entry) = stack.pop() {
        match entry {
            StackEntry::Newline(depth) => {
                buf.push('\n');
                if let Some(width) = indent {
                    buf.extend(std::iter::repeat(' ').take(width * depth));
                }
            }
            StackEntry::Close(id, restore, depth, pretty) => {
                if pretty {
                    stack.push(StackEntry::Close(id, restore, depth, false));
                    stack.push(StackEntry::Newline(depth));
                    continue;
                }
                buf.push_str("</");
                buf.push_str(doc.node_name(id).unwrap_or(""));
                buf.push('>');
                bindings.scope.truncate(restore);
            }
            StackEntry::Enter(current_id, depth) => {
                let Some(node) = doc.get_node(current_id) else {
                    continue;
                };

                match node.kind {
                    NodeKind::Element => {
                        let restore = bindings.scope.len();
                        buf.push('<');
                        buf.push_str(doc.node_name(current_id).unwrap_or(""));
                        write_attributes(doc, current_id, &mut bindings, buf);

                        if node.first_child.is_none() {
                            buf.push_str("/>");
                            bindings.scope.truncate(restore);
                            continue;
                        }
                        buf.push('>');

                        // Indent only element-only content; mixed content is written as is
                        let pretty = indent.is_some() && doc.children(current_id).all(|c| !is_text(doc, c));
                        stack.push(StackEntry::Close(current_id, restore, depth, pretty));

                        let mut child_id = node.last_child;
                        while let Some(cid) = child_id {
                            stack.push(StackEntry::Enter(cid, depth + 1));
                            if pretty {
                                stack.push(StackEntry::Newline(depth + 1));
                            }
                            child_id = doc.prev_sibling(cid);
                        }
                    }
                    NodeKind::Text => {
                        buf.push_str(&escape_text(&node.value));
                    }
                    NodeKind::CData => {
                        buf.push_str("<![CDATA[");
                        buf.push_str(&node.value);
                        buf.push_str("]]>");
                    }
                    NodeKind::Comment => {
                        buf.push_str("<!--");
                        buf.push_str(&node.value);
                        buf.push_str("-->");
                    }
                    NodeKind::ProcessingInstruction => {
                        buf.push_str("<?");
                        buf.push_str(doc.node_name(current_id).unwrap_or(""));
                        if !node.value.is_empty() {
                            buf.push(' ');
                            buf.push_str(&node.value);
                        }
                        buf.push_str("?>");
                    }
                    NodeKind::Document => {}
                }
            }
        }
    }
}

fn is_text(doc: &XmlDocument, id: NodeId) -> bool {
    doc.get_node(id).is_some_and(|n| n.is_text())
}

/// Write the attribute list of an element, adding any missing namespace
/// declarations for the element and its attributes
fn write_attributes(doc: &XmlDocument, element: NodeId, bindings: &mut Bindings, buf: &mut String) {
    let attrs = doc.attributes(element);

    // Declarations written on the element come into scope first
    for attr in attrs.iter().filter(|a| doc.is_namespace_declaration(a)) {
        let prefix = if doc.attribute_prefix(attr).is_some() {
            doc.attribute_local_name(attr)
        } else {
            ""
        };
        bindings.scope.push((prefix.to_string(), attr.value.clone()));
    }

    let mut missing: Vec<(String, String)> = Vec::new();
    let element_uri = doc.node_namespace_uri(element).unwrap_or("");
    let element_prefix = doc.node_prefix(element).unwrap_or("");
    if !element_prefix.is_empty() {
        if !element_uri.is_empty() {
            require(&mut missing, bindings, element_prefix, element_uri);
        }
    } else {
        require(&mut missing, bindings, "", element_uri);
    }
    for attr in attrs.iter().filter(|a| !doc.is_namespace_declaration(a)) {
        if let (Some(prefix), Some(uri)) = (doc.attribute_prefix(attr), doc.attribute_namespace(attr)) {
            require(&mut missing, bindings, prefix, uri);
        }
    }

    for attr in attrs {
        buf.push(' ');
        buf.push_str(doc.attribute_name(attr));
        buf.push_str("=\"");
        buf.push_str(&escape_attribute(&attr.value));
        buf.push('"');
    }
    for (prefix, uri) in missing {
        buf.push_str(if prefix.is_empty() { " xmlns" } else { " xmlns:" });
        buf.push_str(&prefix);
        buf.push_str("=\"");
        buf.push_str(&escape_attribute(&uri));
        buf.push('"');
        bindings.scope.push((prefix, uri));
    }
}

/// Record a binding the output needs but does not have in scope
fn require(missing: &mut Vec<(String, String)>, bindings: &Bindings, prefix: &str, uri: &str) {
    if !bindings.is_bound(prefix, uri) && !missing.iter().any(|(p, _)| p == prefix) {
        missing.push((prefix.to_string(), uri.to_string()));
    }
}

impl XmlDocument {
    /// Serialize with default options
    pub fn to_xml(&self) -> String {
        write_document(self, &WriteOptions::default())
    }

    pub fn to_xml_with(&self, options: &WriteOptions) -> String {
        write_document(self, options)
    }
}
