//! XML Document - Arena-based DOM representation
//!
//! Efficient DOM storage with:
//! - Arena allocation for nodes
//! - NodeId indices for traversal
//! - String interning for names and namespace URIs
//! - A lazily built pre-order index for document-order sorting
//!
//! The document owns its content and is edited in place (see `edit.rs`).
//! Removed nodes stay in the arena, detached.

use super::namespace::{ns, NamespaceResolver};
use super::node::{NodeId, NodeKind, XmlAttribute, XmlNode};
use super::strings::StringPool;
use crate::core::attributes::find_duplicate;
use crate::core::tokenizer::ParseError;
use crate::reader::events::{StartElement, XmlEvent};
use crate::reader::slice::SliceReader;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Parser configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Keep whitespace-only text nodes inside elements
    pub preserve_whitespace: bool,
    /// Reject duplicate attributes, unbound prefixes, invalid characters and
    /// malformed attribute syntax
    pub strict: bool,
}

impl ParseOptions {
    pub fn strict() -> Self {
        ParseOptions {
            strict: true,
            ..ParseOptions::default()
        }
    }

    pub fn preserve_whitespace(mut self, preserve: bool) -> Self {
        self.preserve_whitespace = preserve;
        self
    }
}

/// An XML document stored in arena format
#[derive(Debug, Clone)]
pub struct XmlDocument {
    /// Arena of nodes; slot 0 is the document node
    pub(super) nodes: Vec<XmlNode>,
    /// Interned names, prefixes and URIs
    pub(super) strings: StringPool,
    xml_declaration: Option<String>,
    doctype: Option<String>,
    /// Pre-order position of every node, reset on mutation
    order: OnceLock<Vec<u32>>,
}

impl Default for XmlDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlDocument {
    /// Create an empty document holding only the document node
    pub fn new() -> Self {
        XmlDocument {
            nodes: vec![XmlNode::document()],
            strings: StringPool::new(),
            xml_declaration: None,
            doctype: None,
            order: OnceLock::new(),
        }
    }

    /// Parse an XML document with default options
    pub fn parse(input: &[u8]) -> Result<Self, ParseError> {
        Self::parse_with_options(input, ParseOptions::default())
    }

    pub fn parse_str(input: &str) -> Result<Self, ParseError> {
        Self::parse(input.as_bytes())
    }

    /// Parse an XML document; well-formedness errors are always reported
    pub fn parse_with_options(input: &[u8], options: ParseOptions) -> Result<Self, ParseError> {
        if let Err(e) = std::str::from_utf8(input) {
            return Err(ParseError::new("Input is not valid UTF-8", e.valid_up_to()).locate(input));
        }

        let mut doc = XmlDocument::new();
        let reader = if options.strict {
            SliceReader::new_strict(input)
        } else {
            SliceReader::new(input)
        };
        doc.build_from_events(reader, options)
            .map_err(|e| e.locate(input))?;
        Ok(doc)
    }

    /// Build the arena from reader events, checking document structure
    fn build_from_events(&mut self, mut reader: SliceReader<'_>, options: ParseOptions) -> Result<(), ParseError> {
        let mut resolver = NamespaceResolver::new(&mut self.strings);
        let mut stack: Vec<NodeId> = vec![0];
        let mut tag_stack: Vec<String> = Vec::new();

        loop {
            let position = reader.position();
            let event = reader.next_event()?;
            let parent_id = stack.last().copied().unwrap_or(0);
            let at_top_level = stack.len() == 1;

            match event {
                XmlEvent::StartElement(elem) | XmlEvent::EmptyElement(elem)
                    if at_top_level && self.root_element_id().is_some() =>
                {
                    return Err(ParseError::new(
                        format!(
                            "Document has multiple root elements (<{}>)",
                            String::from_utf8_lossy(elem.name.as_ref())
                        ),
                        position,
                    ));
                }

                XmlEvent::StartElement(elem) => {
                    let name = String::from_utf8_lossy(elem.name.as_ref()).into_owned();
                    let node_id = self.handle_element(&elem, parent_id, &mut resolver, options, position)?;
                    stack.push(node_id);
                    tag_stack.push(name);
                }

                XmlEvent::EmptyElement(elem) => {
                    self.handle_element(&elem, parent_id, &mut resolver, options, position)?;
                    resolver.pop_scope();
                }

                XmlEvent::EndElement(end) => {
                    let end_name = String::from_utf8_lossy(end.name.as_ref());
                    match tag_stack.pop() {
                        Some(start_name) if start_name == end_name => {}
                        Some(start_name) => {
                            return Err(ParseError::new(
                                format!("Tag mismatch: <{}> closed with </{}>", start_name, end_name),
                                position,
                            ));
                        }
                        None => {
                            return Err(ParseError::new(
                                format!("Unexpected end tag: </{}> without matching start tag", end_name),
                                position,
                            ));
                        }
                    }
                    stack.pop();
                    resolver.pop_scope();
                }

                XmlEvent::Text(content) => {
                    let is_whitespace = content.iter().all(|&b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'));
                    if at_top_level {
                        if !is_whitespace {
                            return Err(ParseError::new(
                                "Text content not allowed outside the document element",
                                position,
                            ));
                        }
                    } else if !is_whitespace || options.preserve_whitespace {
                        let text = String::from_utf8_lossy(content.as_ref()).into_owned();
                        self.push_child(parent_id, XmlNode::character_data(NodeKind::Text, text));
                    }
                }

                XmlEvent::CData(content) => {
                    if at_top_level {
                        return Err(ParseError::new(
                            "CDATA section not allowed outside the document element",
                            position,
                        ));
                    }
                    let text = String::from_utf8_lossy(content.as_ref()).into_owned();
                    self.push_child(parent_id, XmlNode::character_data(NodeKind::CData, text));
                }

                XmlEvent::Comment(content) => {
                    let text = String::from_utf8_lossy(content.as_ref()).into_owned();
                    self.push_child(parent_id, XmlNode::character_data(NodeKind::Comment, text));
                }

                XmlEvent::ProcessingInstruction { target, data } => {
                    let target_id = self.strings.intern(&String::from_utf8_lossy(target.as_ref()));
                    let data = data
                        .map(|d| String::from_utf8_lossy(d.as_ref()).into_owned())
                        .unwrap_or_default();
                    self.push_child(parent_id, XmlNode::processing_instruction(target_id, data));
                }

                XmlEvent::XmlDeclaration { raw, .. } => {
                    if self.xml_declaration.is_some() || self.nodes.len() > 1 || self.doctype.is_some() {
                        return Err(ParseError::new("XML declaration must come first", position));
                    }
                    self.xml_declaration = Some(String::from_utf8_lossy(raw.as_ref()).into_owned());
                }

                XmlEvent::DocType(raw) => {
                    if !at_top_level || self.root_element_id().is_some() || self.doctype.is_some() {
                        return Err(ParseError::new("DOCTYPE must come before the document element", position));
                    }
                    self.doctype = Some(String::from_utf8_lossy(raw.as_ref()).into_owned());
                }

                XmlEvent::EndDocument => break,
            }
        }

        if let Some(unclosed) = tag_stack.last() {
            return Err(ParseError::new(format!("Unclosed tag: <{}>", unclosed), reader.position()));
        }
        if self.root_element_id().is_none() {
            return Err(ParseError::new("Missing root element", reader.position()));
        }
        Ok(())
    }

    /// Create the element for a start or empty tag and link it under `parent_id`.
    /// Opens a namespace scope the caller must close.
    fn handle_element(
        &mut self,
        elem: &StartElement<'_>,
        parent_id: NodeId,
        resolver: &mut NamespaceResolver,
        options: ParseOptions,
        position: usize,
    ) -> Result<NodeId, ParseError> {
        if options.strict {
            if let Some(dup) = find_duplicate(&elem.attributes) {
                return Err(ParseError::new(
                    format!("Duplicate attribute: {}", String::from_utf8_lossy(dup)),
                    position,
                ));
            }
        }

        resolver.push_scope();
        for attr in elem.attributes.iter().filter(|a| a.is_namespace_declaration()) {
            let uri_id = self.strings.intern(&String::from_utf8_lossy(attr.value.as_ref()));
            if attr.prefix.is_none() {
                resolver.declare_default(uri_id);
            } else {
                let prefix_id = self.strings.intern(&String::from_utf8_lossy(attr.local_name.as_ref()));
                if !resolver.declare(prefix_id, uri_id) && options.strict && self.strings.get(prefix_id) == "xmlns" {
                    return Err(ParseError::new("The xmlns prefix cannot be declared", position));
                }
            }
        }

        let name_id = self.strings.intern(&String::from_utf8_lossy(elem.name.as_ref()));
        let local_id = self.strings.intern(&String::from_utf8_lossy(elem.local_name.as_ref()));
        let (prefix_id, namespace_id) = match &elem.prefix {
            Some(prefix) => {
                let prefix_id = self.strings.intern(&String::from_utf8_lossy(prefix.as_ref()));
                let namespace_id = self.resolve_prefix(resolver, prefix_id, options, position)?;
                (prefix_id, namespace_id)
            }
            None => (0, resolver.resolve_default().unwrap_or(0)),
        };

        let mut node = XmlNode::element(name_id, local_id, prefix_id, namespace_id);
        let xmlns_uri_id = self.strings.intern(ns::XMLNS);
        for attr in &elem.attributes {
            let attr_name_id = self.strings.intern(&String::from_utf8_lossy(attr.name.as_ref()));
            let attr_local_id = self.strings.intern(&String::from_utf8_lossy(attr.local_name.as_ref()));
            let value = String::from_utf8_lossy(attr.value.as_ref()).into_owned();
            let mut stored = XmlAttribute::new(attr_name_id, attr_local_id, value);
            if attr.is_namespace_declaration() {
                stored.namespace_id = xmlns_uri_id;
                if attr.prefix.is_some() {
                    stored.prefix_id = self.strings.intern("xmlns");
                }
            } else if let Some(prefix) = &attr.prefix {
                stored.prefix_id = self.strings.intern(&String::from_utf8_lossy(prefix.as_ref()));
                stored.namespace_id = self.resolve_prefix(resolver, stored.prefix_id, options, position)?;
            }
            node.attributes.push(stored);
        }

        Ok(self.push_child(parent_id, node))
    }

    fn resolve_prefix(
        &self,
        resolver: &NamespaceResolver,
        prefix_id: u32,
        options: ParseOptions,
        position: usize,
    ) -> Result<u32, ParseError> {
        match resolver.resolve(prefix_id) {
            Some(uri) => Ok(uri),
            None if options.strict => Err(ParseError::new(
                format!("Unbound namespace prefix: {}", self.strings.get(prefix_id)),
                position,
            )),
            None => Ok(0),
        }
    }

    /// Push a node into the arena and link it as last child of `parent_id`
    fn push_child(&mut self, parent_id: NodeId, node: XmlNode) -> NodeId {
        let node_id = self.alloc(node);
        self.link_last(parent_id, node_id);
        node_id
    }

    /// Add a detached node to the arena
    pub(super) fn alloc(&mut self, node: XmlNode) -> NodeId {
        let node_id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        node_id
    }

    /// Link a detached node as the last child of `parent_id`
    pub(super) fn link_last(&mut self, parent_id: NodeId, child_id: NodeId) {
        let last_child_opt = self.nodes[parent_id as usize].last_child;

        if let Some(last_child_id) = last_child_opt {
            self.nodes[child_id as usize].prev_sibling = Some(last_child_id);
            self.nodes[last_child_id as usize].next_sibling = Some(child_id);
        } else {
            self.nodes[parent_id as usize].first_child = Some(child_id);
        }
        self.nodes[parent_id as usize].last_child = Some(child_id);
        self.nodes[child_id as usize].parent = Some(parent_id);
        self.invalidate_order();
    }

    pub(super) fn invalidate_order(&mut self) {
        self.order.take();
    }

    /// The document node (always 0)
    #[inline]
    pub fn document_node_id(&self) -> NodeId {
        0
    }

    /// First element child of the document node
    pub fn root_element_id(&self) -> Option<NodeId> {
        self.children(0).find(|&id| self.nodes[id as usize].is_element())
    }

    pub fn get_node(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes.get(id as usize)
    }

    pub fn node_kind(&self, id: NodeId) -> Option<NodeKind> {
        self.get_node(id).map(|n| n.kind)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.get_node(id).is_some_and(XmlNode::is_element)
    }

    pub fn strings(&self) -> &StringPool {
        &self.strings
    }

    /// Raw `<?xml ...?>` declaration, if the source had one
    pub fn xml_declaration(&self) -> Option<&str> {
        self.xml_declaration.as_deref()
    }

    /// Raw `<!DOCTYPE ...>` declaration, if the source had one
    pub fn doctype(&self) -> Option<&str> {
        self.doctype.as_deref()
    }

    /// Qualified name of an element, or the target of a PI
    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Element | NodeKind::ProcessingInstruction => Some(self.strings.get(node.name_id)),
            _ => None,
        }
    }

    pub fn node_local_name(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Element | NodeKind::ProcessingInstruction => Some(self.strings.get(node.local_id)),
            _ => None,
        }
    }

    pub fn node_prefix(&self, id: NodeId) -> Option<&str> {
        self.strings.get_opt(self.get_node(id)?.prefix_id)
    }

    pub fn node_namespace_uri(&self, id: NodeId) -> Option<&str> {
        self.strings.get_opt(self.get_node(id)?.namespace_id)
    }

    /// Content of a text, CDATA, comment or PI node
    pub fn node_value(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Document | NodeKind::Element => None,
            _ => Some(node.value.as_str()),
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.parent
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.next_sibling
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.prev_sibling
    }

    /// Attributes of an element (empty for other kinds)
    pub fn attributes(&self, id: NodeId) -> &[XmlAttribute] {
        self.get_node(id).map_or(&[], |n| n.attributes.as_slice())
    }

    pub fn attribute_name(&self, attr: &XmlAttribute) -> &str {
        self.strings.get(attr.name_id)
    }

    pub fn attribute_local_name(&self, attr: &XmlAttribute) -> &str {
        self.strings.get(attr.local_id)
    }

    pub fn attribute_prefix(&self, attr: &XmlAttribute) -> Option<&str> {
        self.strings.get_opt(attr.prefix_id)
    }

    pub fn attribute_namespace(&self, attr: &XmlAttribute) -> Option<&str> {
        self.strings.get_opt(attr.namespace_id)
    }

    /// True for `xmlns` and `xmlns:*` attributes
    pub fn is_namespace_declaration(&self, attr: &XmlAttribute) -> bool {
        self.strings.get(attr.namespace_id) == ns::XMLNS
    }

    /// Attribute value by qualified name as written
    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| self.strings.get(a.name_id) == name)
            .map(|a| a.value.as_str())
    }

    /// Attribute value by namespace URI and local name
    pub fn get_attribute_ns(&self, id: NodeId, namespace: &str, local_name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| self.strings.get(a.namespace_id) == namespace && self.strings.get(a.local_id) == local_name)
            .map(|a| a.value.as_str())
    }

    /// Iterate over children of a node
    pub fn children(&self, id: NodeId) -> ChildIter<'_> {
        let first = self.get_node(id).and_then(|n| n.first_child);
        ChildIter { doc: self, next: first }
    }

    /// Iterate over all descendants of a node in document order
    pub fn descendants(&self, id: NodeId) -> DescendantIter<'_> {
        let mut iter = DescendantIter {
            doc: self,
            stack: Vec::new(),
        };
        iter.push_children(id);
        iter
    }

    /// All attached elements in pre-order, the document element first
    pub fn elements(&self) -> Vec<NodeId> {
        self.descendants(0).filter(|&id| self.is_element(id)).collect()
    }

    /// Concatenated direct text and CDATA children
    pub fn own_text(&self, id: NodeId) -> String {
        self.children(id)
            .filter_map(|c| {
                let node = &self.nodes[c as usize];
                node.is_text().then_some(node.value.as_str())
            })
            .collect()
    }

    /// Number of element ancestors; 0 for the document element
    pub fn depth(&self, id: NodeId) -> usize {
        std::iter::successors(self.parent(id), |&p| self.parent(p))
            .filter(|&p| self.is_element(p))
            .count()
    }

    /// True when the node is reachable from the document node
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == 0 {
                return true;
            }
            current = self.parent(node_id);
        }
        false
    }

    /// Resolve a prefix ("" for the default namespace) from the declarations
    /// in scope at `id`
    pub fn lookup_namespace_uri(&self, id: NodeId, prefix: &str) -> Option<&str> {
        match prefix {
            "xml" => return Some(ns::XML),
            "xmlns" => return Some(ns::XMLNS),
            _ => {}
        }
        let mut current = Some(id);
        while let Some(node_id) = current {
            for attr in self.attributes(node_id) {
                if self.is_namespace_declaration(attr) && self.declared_prefix(attr) == prefix {
                    return (!attr.value.is_empty()).then_some(attr.value.as_str());
                }
            }
            current = self.parent(node_id);
        }
        None
    }

    /// Prefix bindings in scope at `id`, nearest declaration winning; the
    /// default namespace is keyed by ""
    pub fn in_scope_namespaces(&self, id: NodeId) -> HashMap<String, String> {
        let mut bindings = HashMap::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            for attr in self.attributes(node_id) {
                if self.is_namespace_declaration(attr) {
                    bindings
                        .entry(self.declared_prefix(attr).to_string())
                        .or_insert_with(|| attr.value.clone());
                }
            }
            current = self.parent(node_id);
        }
        bindings.retain(|_, uri| !uri.is_empty());
        bindings
    }

    /// Prefix bound by an `xmlns` declaration ("" for the default namespace)
    fn declared_prefix(&self, attr: &XmlAttribute) -> &str {
        if attr.prefix_id == 0 {
            ""
        } else {
            self.strings.get(attr.local_id)
        }
    }

    /// Pre-order position of every node; detached nodes sort last
    fn order_index(&self) -> &[u32] {
        self.order.get_or_init(|| {
            let mut index = vec![u32::MAX; self.nodes.len()];
            index[0] = 0;
            for (position, id) in self.descendants(0).enumerate() {
                index[id as usize] = position as u32 + 1;
            }
            index
        })
    }

    /// Sort node IDs into document order and drop duplicates
    pub fn sort_document_order(&self, nodes: &mut Vec<NodeId>) {
        let index = self.order_index();
        nodes.sort_by_key(|&id| (index.get(id as usize).copied().unwrap_or(u32::MAX), id));
        nodes.dedup();
    }
}

/// Iterator over child nodes
pub struct ChildIter<'d> {
    doc: &'d XmlDocument,
    next: Option<NodeId>,
}

impl Iterator for ChildIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.next_sibling(current);
        Some(current)
    }
}

/// Iterator over descendant nodes (pre-order)
pub struct DescendantIter<'d> {
    doc: &'d XmlDocument,
    stack: Vec<NodeId>,
}

impl DescendantIter<'_> {
    fn push_children(&mut self, id: NodeId) {
        let mut child_id = self.doc.get_node(id).and_then(|n| n.last_child);
        while let Some(cid) = child_id {
            self.stack.push(cid);
            child_id = self.doc.prev_sibling(cid);
        }
    }
}

impl Iterator for DescendantIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        self.push_children(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> XmlDocument {
        XmlDocument::parse_str(xml).unwrap()
    }

    #[test]
    fn test_parse_simple() {
        let doc = parse("<root><child attr=\"v\">text</child></root>");
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.node_name(root), Some("root"));
        let child = doc.children(root).next().unwrap();
        assert_eq!(doc.get_attribute(child, "attr"), Some("v"));
        assert_eq!(doc.own_text(child), "text");
    }

    #[test]
    fn test_depth() {
        let doc = parse("<a><b><c/></b></a>");
        let depths: Vec<usize> = doc.elements().into_iter().map(|id| doc.depth(id)).collect();
        assert_eq!(depths, vec![0, 1, 2]);
    }

    #[test]
    fn test_whitespace_dropped_by_default() {
        let doc = parse("<root>\n  <a/>\n  <b> x </b>\n</root>");
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.children(root).count(), 2);
        let b = doc.children(root).nth(1).unwrap();
        assert_eq!(doc.own_text(b), " x ");

        let kept = XmlDocument::parse_with_options(
            b"<root>\n  <a/>\n</root>",
            ParseOptions::default().preserve_whitespace(true),
        )
        .unwrap();
        let root = kept.root_element_id().unwrap();
        assert_eq!(kept.children(root).count(), 3);
    }

    #[test]
    fn test_namespaces_resolved() {
        let doc = parse(
            "<root xmlns=\"urn:default\" xmlns:p=\"urn:p\"><p:child p:attr=\"1\" plain=\"2\"/><inner/></root>",
        );
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.node_namespace_uri(root), Some("urn:default"));
        let child = doc.children(root).next().unwrap();
        assert_eq!(doc.node_prefix(child), Some("p"));
        assert_eq!(doc.node_local_name(child), Some("child"));
        assert_eq!(doc.node_namespace_uri(child), Some("urn:p"));
        let attrs = doc.attributes(child);
        assert_eq!(doc.attribute_namespace(&attrs[0]), Some("urn:p"));
        assert_eq!(doc.attribute_namespace(&attrs[1]), None);
        assert_eq!(doc.get_attribute_ns(child, "urn:p", "attr"), Some("1"));

        let inner = doc.children(root).nth(1).unwrap();
        assert_eq!(doc.node_namespace_uri(inner), Some("urn:default"));
        assert_eq!(doc.lookup_namespace_uri(inner, "p"), Some("urn:p"));
        assert_eq!(doc.lookup_namespace_uri(inner, ""), Some("urn:default"));
        assert_eq!(doc.in_scope_namespaces(inner).len(), 2);
    }

    #[test]
    fn test_namespace_declarations_are_attributes() {
        let doc = parse("<root xmlns:patch=\"http://schemas.xmlpatch\"/>");
        let root = doc.root_element_id().unwrap();
        let attr = &doc.attributes(root)[0];
        assert!(doc.is_namespace_declaration(attr));
        assert_eq!(doc.attribute_prefix(attr), Some("xmlns"));
        assert_eq!(doc.attribute_local_name(attr), "patch");
    }

    #[test]
    fn test_declaration_and_doctype_kept() {
        let doc = parse("<?xml version=\"1.0\"?>\n<!DOCTYPE root>\n<root/>");
        assert_eq!(doc.xml_declaration(), Some("<?xml version=\"1.0\"?>"));
        assert_eq!(doc.doctype(), Some("<!DOCTYPE root>"));
    }

    #[test]
    fn test_well_formedness_errors() {
        for xml in [
            "<a><b></a>",
            "<a>",
            "</a>",
            "<a/><b/>",
            "text<a/>",
            "<a/>text",
            "",
            "<a/><?xml version=\"1.0\"?>",
        ] {
            assert!(XmlDocument::parse_str(xml).is_err(), "expected error for {:?}", xml);
        }
    }

    #[test]
    fn test_strict_errors() {
        for xml in ["<a x=\"1\" x=\"2\"/>", "<p:a/>", "<a p:x=\"1\"/>"] {
            assert!(XmlDocument::parse_with_options(xml.as_bytes(), ParseOptions::strict()).is_err());
            assert!(XmlDocument::parse_str(xml).is_ok());
        }
    }

    #[test]
    fn test_error_has_location() {
        let err = XmlDocument::parse_str("<a>\n<b></c></a>").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("Tag mismatch"));
    }

    #[test]
    fn test_elements_in_document_order() {
        let doc = parse("<settings><node/><settings2><node/></settings2></settings>");
        let names: Vec<_> = doc.elements().iter().filter_map(|&id| doc.node_name(id)).collect();
        assert_eq!(names, vec!["settings", "node", "settings2", "node"]);
    }

    #[test]
    fn test_sort_document_order() {
        let doc = parse("<r><a/><b><c/></b></r>");
        let elements = doc.elements();
        let mut shuffled = vec![elements[3], elements[1], elements[2], elements[1]];
        doc.sort_document_order(&mut shuffled);
        assert_eq!(shuffled, vec![elements[1], elements[2], elements[3]]);
    }

    #[test]
    fn test_pi_and_comment_nodes() {
        let doc = parse("<r><!-- note --><?target data?></r>");
        let root = doc.root_element_id().unwrap();
        let kids: Vec<_> = doc.children(root).collect();
        assert_eq!(doc.node_kind(kids[0]), Some(NodeKind::Comment));
        assert_eq!(doc.node_value(kids[0]), Some(" note "));
        assert_eq!(doc.node_name(kids[1]), Some("target"));
        assert_eq!(doc.node_value(kids[1]), Some("data"));
    }
}
