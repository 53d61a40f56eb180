//! DOM Module - Arena-based XML Document
//!
//! Implements an editable DOM representation using:
//! - Arena allocation for nodes
//! - NodeId (u32) indices for cache-friendly traversal
//! - String interning for element/attribute names and namespace URIs
//! - Namespace resolution stack while parsing
//! - In-place editing and serialization

pub mod document;
pub mod edit;
pub mod namespace;
pub mod node;
pub mod strings;
pub mod writer;

pub use document::{ParseOptions, XmlDocument};
pub use node::{NodeId, NodeKind, XmlAttribute, XmlNode};
pub use strings::StringPool;
pub use writer::WriteOptions;

/// Trait for document access - the seam XPath evaluation works through
pub trait DocumentAccess {
    /// The document node
    fn document_node_id(&self) -> NodeId;

    /// Get root element ID
    fn root_element_id(&self) -> Option<NodeId>;

    /// Get a node by ID
    fn get_node(&self, id: NodeId) -> Option<&XmlNode>;

    /// Get node name as string
    fn node_name(&self, id: NodeId) -> Option<&str>;

    /// Get node local name (without prefix)
    fn node_local_name(&self, id: NodeId) -> Option<&str>;

    fn node_prefix(&self, id: NodeId) -> Option<&str>;

    fn node_namespace_uri(&self, id: NodeId) -> Option<&str>;

    /// Content of a text, CDATA, comment or PI node
    fn node_value(&self, id: NodeId) -> Option<&str>;

    /// Get attributes for an element
    fn attributes(&self, id: NodeId) -> &[XmlAttribute];

    /// Get attribute value by name
    fn get_attribute(&self, node_id: NodeId, name: &str) -> Option<&str>;

    /// True for `xmlns` declarations stored as attributes
    fn is_namespace_declaration(&self, attr: &XmlAttribute) -> bool;

    /// Get the string pool for direct access
    fn strings(&self) -> &StringPool;

    /// Iterate over children - returns collected Vec for trait object compatibility
    fn children_vec(&self, id: NodeId) -> Vec<NodeId>;

    /// Iterate over descendants - returns collected Vec for trait object compatibility
    fn descendants_vec(&self, id: NodeId) -> Vec<NodeId>;

    /// Sort into document order, removing duplicates
    fn sort_document_order(&self, nodes: &mut Vec<NodeId>);

    fn node_kind_of(&self, id: NodeId) -> Option<NodeKind> {
        self.get_node(id).map(|n| n.kind)
    }

    fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.parent
    }

    fn next_sibling_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.next_sibling
    }

    fn prev_sibling_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.prev_sibling
    }
}

impl DocumentAccess for XmlDocument {
    fn document_node_id(&self) -> NodeId {
        XmlDocument::document_node_id(self)
    }

    fn root_element_id(&self) -> Option<NodeId> {
        XmlDocument::root_element_id(self)
    }

    fn get_node(&self, id: NodeId) -> Option<&XmlNode> {
        XmlDocument::get_node(self, id)
    }

    fn node_name(&self, id: NodeId) -> Option<&str> {
        XmlDocument::node_name(self, id)
    }

    fn node_local_name(&self, id: NodeId) -> Option<&str> {
        XmlDocument::node_local_name(self, id)
    }

    fn node_prefix(&self, id: NodeId) -> Option<&str> {
        XmlDocument::node_prefix(self, id)
    }

    fn node_namespace_uri(&self, id: NodeId) -> Option<&str> {
        XmlDocument::node_namespace_uri(self, id)
    }

    fn node_value(&self, id: NodeId) -> Option<&str> {
        XmlDocument::node_value(self, id)
    }

    fn attributes(&self, id: NodeId) -> &[XmlAttribute] {
        XmlDocument::attributes(self, id)
    }

    fn get_attribute(&self, node_id: NodeId, name: &str) -> Option<&str> {
        XmlDocument::get_attribute(self, node_id, name)
    }

    fn is_namespace_declaration(&self, attr: &XmlAttribute) -> bool {
        XmlDocument::is_namespace_declaration(self, attr)
    }

    fn strings(&self) -> &StringPool {
        XmlDocument::strings(self)
    }

    fn children_vec(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).collect()
    }

    fn descendants_vec(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id).collect()
    }

    fn sort_document_order(&self, nodes: &mut Vec<NodeId>) {
        XmlDocument::sort_document_order(self, nodes)
    }
}

/// XPath string-value of a node: concatenated descendant text for the
/// document and elements, the content itself otherwise
pub fn node_string_value<D: DocumentAccess + ?Sized>(doc: &D, id: NodeId) -> String {
    match doc.get_node(id).map(|n| n.kind) {
        Some(NodeKind::Document) | Some(NodeKind::Element) => doc
            .descendants_vec(id)
            .into_iter()
            .filter(|&d| doc.get_node(d).is_some_and(XmlNode::is_text))
            .filter_map(|d| doc.node_value(d))
            .collect(),
        Some(_) => doc.node_value(id).unwrap_or("").to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_value() {
        let doc = XmlDocument::parse_str("<r>a<b>b<!--no--></b><![CDATA[c]]></r>").unwrap();
        let root = doc.root_element_id().unwrap();
        assert_eq!(node_string_value(&doc, root), "abc");
        assert_eq!(node_string_value(&doc, 0), "abc");
    }

    #[test]
    fn test_trait_object_access() {
        let doc = XmlDocument::parse_str("<r><a/><b/></r>").unwrap();
        let access: &dyn DocumentAccess = &doc;
        let root = access.root_element_id().unwrap();
        assert_eq!(access.children_vec(root).len(), 2);
        assert_eq!(access.descendants_vec(access.document_node_id()).len(), 3);
    }
}
