//! In-place document editing
//!
//! Node creation, relinking and content replacement on the arena. Every
//! structural change invalidates the cached document order.

use super::document::XmlDocument;
use super::node::{NodeId, NodeKind, XmlAttribute, XmlNode};
use crate::core::attributes::split_name;
use crate::error::DomError;

impl XmlDocument {
    fn check_node(&self, id: NodeId) -> Result<&XmlNode, DomError> {
        self.get_node(id).ok_or(DomError::InvalidNode(id))
    }

    /// Create a detached element. The prefix is taken from `qualified_name`.
    pub fn create_element(&mut self, qualified_name: &str, namespace_uri: Option<&str>) -> NodeId {
        let (prefix, local) = split_name(qualified_name.as_bytes());
        let prefix_id = prefix
            .map(|p| self.strings.intern(&String::from_utf8_lossy(p)))
            .unwrap_or(0);
        let local_id = self.strings.intern(&String::from_utf8_lossy(local));
        let name_id = self.strings.intern(qualified_name);
        let namespace_id = namespace_uri.map_or(0, |uri| self.strings.intern(uri));
        self.alloc(XmlNode::element(name_id, local_id, prefix_id, namespace_id))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(XmlNode::character_data(NodeKind::Text, text.to_string()))
    }

    /// Check that `child` may be linked under `parent`
    fn check_insertion(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let parent_node = self.check_node(parent)?;
        let child_node = self.check_node(child)?;

        if !parent_node.is_container() {
            return Err(DomError::HierarchyRequest(format!(
                "a {:?} node cannot have children",
                parent_node.kind
            )));
        }
        if child_node.kind == NodeKind::Document {
            return Err(DomError::HierarchyRequest("the document node cannot be inserted".into()));
        }
        if parent_node.kind == NodeKind::Document {
            if child_node.is_text() {
                return Err(DomError::HierarchyRequest(
                    "text cannot be inserted at the document level".into(),
                ));
            }
            if child_node.is_element() && self.root_element_id().is_some_and(|root| root != child) {
                return Err(DomError::HierarchyRequest(
                    "the document already has a document element".into(),
                ));
            }
        }

        let mut ancestor = Some(parent);
        while let Some(id) = ancestor {
            if id == child {
                return Err(DomError::HierarchyRequest(
                    "a node cannot be inserted into its own subtree".into(),
                ));
            }
            ancestor = self.parent(id);
        }
        Ok(())
    }

    /// Append `child` as the last child of `parent`, moving it if attached
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_insertion(parent, child)?;
        self.unlink(child);
        self.link_last(parent, child);
        Ok(())
    }

    /// Insert `new_node` as the previous sibling of `reference`
    pub fn insert_before(&mut self, reference: NodeId, new_node: NodeId) -> Result<(), DomError> {
        let parent = self.sibling_parent(reference, new_node)?;
        self.check_insertion(parent, new_node)?;
        self.unlink(new_node);

        let prev = self.nodes[reference as usize].prev_sibling;
        {
            let node = &mut self.nodes[new_node as usize];
            node.parent = Some(parent);
            node.prev_sibling = prev;
            node.next_sibling = Some(reference);
        }
        self.nodes[reference as usize].prev_sibling = Some(new_node);
        match prev {
            Some(prev_id) => self.nodes[prev_id as usize].next_sibling = Some(new_node),
            None => self.nodes[parent as usize].first_child = Some(new_node),
        }
        self.invalidate_order();
        Ok(())
    }

    /// Insert `new_node` as the next sibling of `reference`
    pub fn insert_after(&mut self, reference: NodeId, new_node: NodeId) -> Result<(), DomError> {
        let parent = self.sibling_parent(reference, new_node)?;
        match self.next_sibling(reference) {
            Some(next) => self.insert_before(next, new_node),
            None => self.append_child(parent, new_node),
        }
    }

    fn sibling_parent(&self, reference: NodeId, new_node: NodeId) -> Result<NodeId, DomError> {
        self.check_node(new_node)?;
        if reference == new_node {
            return Err(DomError::HierarchyRequest("a node cannot be its own sibling".into()));
        }
        self.check_node(reference)?
            .parent
            .ok_or_else(|| DomError::HierarchyRequest("the reference node has no parent".into()))
    }

    /// Remove a node (and its subtree) from its parent; it stays in the arena
    pub fn detach(&mut self, id: NodeId) -> Result<(), DomError> {
        let node = self.check_node(id)?;
        if node.kind == NodeKind::Document {
            return Err(DomError::HierarchyRequest("the document node cannot be removed".into()));
        }
        self.unlink(id);
        Ok(())
    }

    fn unlink(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let node = &self.nodes[id as usize];
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        let Some(parent) = parent else {
            return;
        };

        match prev {
            Some(prev_id) => self.nodes[prev_id as usize].next_sibling = next,
            None => self.nodes[parent as usize].first_child = next,
        }
        match next {
            Some(next_id) => self.nodes[next_id as usize].prev_sibling = prev,
            None => self.nodes[parent as usize].last_child = prev,
        }

        let node = &mut self.nodes[id as usize];
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
        self.invalidate_order();
    }

    /// Detach every child of `id`
    pub fn remove_children(&mut self, id: NodeId) -> Result<(), DomError> {
        self.check_node(id)?;
        let children: Vec<NodeId> = self.children(id).collect();
        for child in children {
            self.unlink(child);
        }
        Ok(())
    }

    /// Set an attribute matched by qualified name, adding it when missing.
    /// A new attribute takes the prefix of `qualified_name` and `namespace_uri`.
    pub fn set_attribute(
        &mut self,
        element: NodeId,
        qualified_name: &str,
        namespace_uri: Option<&str>,
        value: &str,
    ) -> Result<(), DomError> {
        let node = self.check_node(element)?;
        if !node.is_element() {
            return Err(DomError::HierarchyRequest(format!(
                "attributes can only be set on elements, not {:?}",
                node.kind
            )));
        }

        let existing = node
            .attributes
            .iter()
            .position(|a| self.strings.get(a.name_id) == qualified_name);
        if let Some(index) = existing {
            self.nodes[element as usize].attributes[index].value = value.to_string();
            return Ok(());
        }

        let (prefix, local) = split_name(qualified_name.as_bytes());
        let mut attr = XmlAttribute::new(
            self.strings.intern(qualified_name),
            self.strings.intern(&String::from_utf8_lossy(local)),
            value.to_string(),
        );
        if let Some(prefix) = prefix {
            attr.prefix_id = self.strings.intern(&String::from_utf8_lossy(prefix));
        }
        attr.namespace_id = namespace_uri.map_or(0, |uri| self.strings.intern(uri));
        self.nodes[element as usize].attributes.push(attr);
        Ok(())
    }

    /// Replace the direct text and CDATA children of an element with one text
    /// node. Element children stay; the new text takes the place of the first
    /// removed text node, or goes last.
    pub fn set_own_text(&mut self, element: NodeId, text: &str) -> Result<(), DomError> {
        self.check_node(element)?;
        let text_children: Vec<NodeId> = self
            .children(element)
            .filter(|&c| self.nodes[c as usize].is_text())
            .collect();

        // First non-text sibling after the first text child
        let anchor = text_children.first().and_then(|&first| {
            let mut next = self.next_sibling(first);
            while let Some(id) = next {
                if !self.nodes[id as usize].is_text() {
                    break;
                }
                next = self.next_sibling(id);
            }
            next
        });
        for &child in &text_children {
            self.unlink(child);
        }

        let text_id = self.create_text(text);
        match anchor {
            Some(anchor) => self.insert_before(anchor, text_id),
            None => self.append_child(element, text_id),
        }
    }

    /// Deep-copy a node from another document into this one, detached
    pub fn import_node(&mut self, source: &XmlDocument, id: NodeId) -> Result<NodeId, DomError> {
        let node = source.get_node(id).ok_or(DomError::InvalidNode(id))?;
        if node.kind == NodeKind::Document {
            return Err(DomError::HierarchyRequest("the document node cannot be imported".into()));
        }

        let mut copy = XmlNode {
            kind: node.kind,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            name_id: self.strings.intern(source.strings().get(node.name_id)),
            local_id: self.strings.intern(source.strings().get(node.local_id)),
            prefix_id: self.strings.intern(source.strings().get(node.prefix_id)),
            namespace_id: self.strings.intern(source.strings().get(node.namespace_id)),
            value: node.value.clone(),
            attributes: Vec::with_capacity(node.attributes.len()),
        };
        for attr in &node.attributes {
            copy.attributes.push(XmlAttribute {
                name_id: self.strings.intern(source.strings().get(attr.name_id)),
                local_id: self.strings.intern(source.strings().get(attr.local_id)),
                prefix_id: self.strings.intern(source.strings().get(attr.prefix_id)),
                namespace_id: self.strings.intern(source.strings().get(attr.namespace_id)),
                value: attr.value.clone(),
            });
        }

        let copy_id = self.alloc(copy);
        for child in source.children(id) {
            let child_copy = self.import_node(source, child)?;
            self.link_last(copy_id, child_copy);
        }
        Ok(copy_id)
    }

    /// Replace all children of `target` with deep copies of `children` taken
    /// from `source`
    pub fn replace_children_with_import(
        &mut self,
        target: NodeId,
        source: &XmlDocument,
        children: &[NodeId],
    ) -> Result<(), DomError> {
        let mut copies = Vec::with_capacity(children.len());
        for &child in children {
            copies.push(self.import_node(source, child)?);
        }
        self.remove_children(target)?;
        for copy in copies {
            self.append_child(target, copy)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> XmlDocument {
        XmlDocument::parse_str(xml).unwrap()
    }

    fn names(doc: &XmlDocument, parent: NodeId) -> Vec<String> {
        doc.children(parent)
            .map(|c| doc.node_name(c).map_or_else(|| doc.node_value(c).unwrap_or("").to_string(), str::to_string))
            .collect()
    }

    #[test]
    fn test_append_and_insert() {
        let mut doc = parse("<r><b/></r>");
        let root = doc.root_element_id().unwrap();
        let b = doc.children(root).next().unwrap();

        let a = doc.create_element("a", None);
        doc.insert_before(b, a).unwrap();
        let c = doc.create_element("c", None);
        doc.insert_after(b, c).unwrap();
        let d = doc.create_element("d", None);
        doc.insert_after(b, d).unwrap();
        let e = doc.create_element("e", None);
        doc.append_child(root, e).unwrap();

        assert_eq!(names(&doc, root), vec!["a", "b", "d", "c", "e"]);
        let order: Vec<_> = doc.elements().iter().filter_map(|&id| doc.node_name(id)).collect();
        assert_eq!(order, vec!["r", "a", "b", "d", "c", "e"]);
    }

    #[test]
    fn test_detach() {
        let mut doc = parse("<r><a/><b/><c/></r>");
        let root = doc.root_element_id().unwrap();
        let b = doc.children(root).nth(1).unwrap();
        doc.detach(b).unwrap();
        assert_eq!(names(&doc, root), vec!["a", "c"]);
        assert!(!doc.is_attached(b));
        assert!(doc.detach(0).is_err());
    }

    #[test]
    fn test_hierarchy_errors() {
        let mut doc = parse("<r><a/></r>");
        let root = doc.root_element_id().unwrap();
        let a = doc.children(root).next().unwrap();

        assert!(matches!(doc.append_child(a, root), Err(DomError::HierarchyRequest(_))));
        let extra = doc.create_element("extra", None);
        assert!(matches!(doc.insert_after(root, extra), Err(DomError::HierarchyRequest(_))));
        let text = doc.create_text("x");
        assert!(doc.append_child(text, extra).is_err());
        assert!(matches!(doc.insert_before(extra, text), Err(DomError::HierarchyRequest(_))));
        assert!(matches!(doc.append_child(root, 999), Err(DomError::InvalidNode(999))));
    }

    #[test]
    fn test_set_attribute() {
        let mut doc = parse("<r a=\"1\"/>");
        let root = doc.root_element_id().unwrap();
        doc.set_attribute(root, "a", None, "2").unwrap();
        doc.set_attribute(root, "p:b", Some("urn:p"), "3").unwrap();
        assert_eq!(doc.get_attribute(root, "a"), Some("2"));
        assert_eq!(doc.get_attribute_ns(root, "urn:p", "b"), Some("3"));
        assert_eq!(doc.attribute_prefix(&doc.attributes(root)[1]), Some("p"));
    }

    #[test]
    fn test_set_own_text_keeps_elements() {
        let mut doc = parse("<r>old<a/>more</r>");
        let root = doc.root_element_id().unwrap();
        doc.set_own_text(root, "new").unwrap();
        assert_eq!(names(&doc, root), vec!["new", "a"]);

        let mut doc = parse("<r><a/></r>");
        let root = doc.root_element_id().unwrap();
        doc.set_own_text(root, "t").unwrap();
        assert_eq!(names(&doc, root), vec!["a", "t"]);
    }

    #[test]
    fn test_import_deep_copy() {
        let source = parse("<s xmlns:p=\"urn:p\"><p:x k=\"v\">text<y/></p:x></s>");
        let x = source.children(source.root_element_id().unwrap()).next().unwrap();

        let mut target = parse("<t><old/></t>");
        let root = target.root_element_id().unwrap();
        target.replace_children_with_import(root, &source, &[x]).unwrap();

        let copy = target.children(root).next().unwrap();
        assert_eq!(target.children(root).count(), 1);
        assert_eq!(target.node_name(copy), Some("p:x"));
        assert_eq!(target.node_namespace_uri(copy), Some("urn:p"));
        assert_eq!(target.get_attribute(copy, "k"), Some("v"));
        assert_eq!(target.own_text(copy), "text");
    }
}
