//! XML Node representation
//!
//! Uses NodeId (u32) for compact, cache-friendly node references.
//! Names are string-pool IDs; content lives on the node so it can be
//! edited in place.

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// Type of XML node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Document root
    Document,
    /// Element node
    Element,
    /// Text content
    Text,
    /// CDATA section
    CData,
    /// Comment
    Comment,
    /// Processing instruction
    ProcessingInstruction,
}

/// An XML node in the arena
#[derive(Debug, Clone)]
pub struct XmlNode {
    pub kind: NodeKind,
    /// Parent node (None for the document node and detached nodes)
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    /// Qualified name for elements, target for PIs
    pub name_id: u32,
    /// Local part of the qualified name
    pub local_id: u32,
    /// Namespace prefix, or 0
    pub prefix_id: u32,
    /// Namespace URI, or 0
    pub namespace_id: u32,
    /// Text, CDATA, comment or PI data
    pub value: String,
    /// Element attributes in document order, namespace declarations included
    pub attributes: Vec<XmlAttribute>,
}

impl XmlNode {
    fn with_kind(kind: NodeKind) -> Self {
        XmlNode {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            name_id: 0,
            local_id: 0,
            prefix_id: 0,
            namespace_id: 0,
            value: String::new(),
            attributes: Vec::new(),
        }
    }

    pub fn document() -> Self {
        Self::with_kind(NodeKind::Document)
    }

    pub fn element(name_id: u32, local_id: u32, prefix_id: u32, namespace_id: u32) -> Self {
        XmlNode {
            name_id,
            local_id,
            prefix_id,
            namespace_id,
            ..Self::with_kind(NodeKind::Element)
        }
    }

    /// Text, CDATA or comment node
    pub fn character_data(kind: NodeKind, value: String) -> Self {
        XmlNode {
            value,
            ..Self::with_kind(kind)
        }
    }

    pub fn processing_instruction(target_id: u32, data: String) -> Self {
        XmlNode {
            name_id: target_id,
            local_id: target_id,
            value: data,
            ..Self::with_kind(NodeKind::ProcessingInstruction)
        }
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Text or CDATA
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text | NodeKind::CData)
    }

    /// Document or element, the only kinds that may hold children
    #[inline]
    pub fn is_container(&self) -> bool {
        matches!(self.kind, NodeKind::Document | NodeKind::Element)
    }
}

/// Stored attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    /// Qualified name as written
    pub name_id: u32,
    pub local_id: u32,
    pub prefix_id: u32,
    /// Namespace URI; `xmlns` declarations use the XMLNS namespace
    pub namespace_id: u32,
    pub value: String,
}

impl XmlAttribute {
    pub fn new(name_id: u32, local_id: u32, value: String) -> Self {
        XmlAttribute {
            name_id,
            local_id,
            prefix_id: 0,
            namespace_id: 0,
            value,
        }
    }
}
