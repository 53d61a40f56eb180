//! XPath Axes Implementation
//!
//! Node axes return candidates in axis order: document order for forward
//! axes, nearest-first for the reverse ones (ancestor, ancestor-or-self,
//! preceding, preceding-sibling). The attribute axis yields values rather
//! than nodes since attributes are not arena nodes.

use super::compiler::CompiledNodeTest;
use super::parser::Axis;
use super::NamespaceMap;
use crate::dom::{DocumentAccess, NodeId, NodeKind, XmlAttribute};

/// Navigate along a node axis from a context node
pub fn navigate<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId, axis: Axis) -> Vec<NodeId> {
    match axis {
        Axis::Child => doc.children_vec(context),
        Axis::Descendant => doc.descendants_vec(context),
        Axis::DescendantOrSelf => {
            let descendants = doc.descendants_vec(context);
            let mut result = Vec::with_capacity(1 + descendants.len());
            result.push(context);
            result.extend(descendants);
            result
        }
        Axis::Parent => doc.parent_of(context).into_iter().collect(),
        Axis::Ancestor => ancestor_axis(doc, context),
        Axis::AncestorOrSelf => {
            let mut result = vec![context];
            result.extend(ancestor_axis(doc, context));
            result
        }
        Axis::FollowingSibling => siblings(doc, context, |d, id| d.next_sibling_of(id)),
        Axis::PrecedingSibling => siblings(doc, context, |d, id| d.prev_sibling_of(id)),
        Axis::Following => following_axis(doc, context),
        Axis::Preceding => preceding_axis(doc, context),
        Axis::Self_ => vec![context],
        Axis::Attribute => Vec::new(),
    }
}

/// ancestor:: axis - parent first, document node last
fn ancestor_axis<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut current = context;

    while let Some(parent) = doc.parent_of(current) {
        result.push(parent);
        current = parent;
    }

    result
}

fn siblings<D, F>(doc: &D, context: NodeId, step: F) -> Vec<NodeId>
where
    D: DocumentAccess + ?Sized,
    F: Fn(&D, NodeId) -> Option<NodeId>,
{
    let mut result = Vec::new();
    let mut sibling = step(doc, context);
    while let Some(sib_id) = sibling {
        result.push(sib_id);
        sibling = step(doc, sib_id);
    }
    result
}

/// following:: axis - all nodes after in document order (not descendants)
fn following_axis<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut current = Some(context);

    while let Some(node) = current {
        let mut sibling = doc.next_sibling_of(node);
        while let Some(sib_id) = sibling {
            result.push(sib_id);
            result.extend(doc.descendants_vec(sib_id));
            sibling = doc.next_sibling_of(sib_id);
        }
        current = doc.parent_of(node);
    }

    result
}

/// preceding:: axis - all nodes before in document order (not ancestors),
/// nearest first
fn preceding_axis<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut current = Some(context);

    while let Some(node) = current {
        let mut sibling = doc.prev_sibling_of(node);
        while let Some(sib_id) = sibling {
            // Descendants of a preceding sibling, last one first
            let mut subtree = vec![sib_id];
            subtree.extend(doc.descendants_vec(sib_id));
            result.extend(subtree.into_iter().rev());
            sibling = doc.prev_sibling_of(sib_id);
        }
        current = doc.parent_of(node);
    }

    result
}

/// Check if a node matches a node test.
///
/// Unprefixed names compare against the qualified name. A prefix bound in
/// `namespaces` compares namespace URI and local name; an unbound prefix
/// falls back to comparing the name as written.
pub fn matches_node_test<D: DocumentAccess + ?Sized>(
    doc: &D,
    node_id: NodeId,
    node_test: &CompiledNodeTest,
    namespaces: &NamespaceMap,
) -> bool {
    let Some(kind) = doc.node_kind_of(node_id) else {
        return false;
    };

    match node_test {
        CompiledNodeTest::Any => kind == NodeKind::Element,
        CompiledNodeTest::Name(name) => {
            kind == NodeKind::Element && doc.node_name(node_id) == Some(name.as_str())
        }
        CompiledNodeTest::QName(prefix, local) => {
            if kind != NodeKind::Element {
                return false;
            }
            match namespaces.get(prefix) {
                Some(uri) => {
                    doc.node_namespace_uri(node_id) == Some(uri.as_str())
                        && doc.node_local_name(node_id) == Some(local.as_str())
                }
                None => doc
                    .node_name(node_id)
                    .and_then(|name| name.split_once(':'))
                    .is_some_and(|(p, l)| p == prefix && l == local),
            }
        }
        CompiledNodeTest::NamespaceWildcard(prefix) => {
            if kind != NodeKind::Element {
                return false;
            }
            match namespaces.get(prefix) {
                Some(uri) => doc.node_namespace_uri(node_id) == Some(uri.as_str()),
                None => doc.node_prefix(node_id) == Some(prefix.as_str()),
            }
        }
        CompiledNodeTest::Node => true,
        CompiledNodeTest::Text => kind == NodeKind::Text || kind == NodeKind::CData,
        CompiledNodeTest::Comment => kind == NodeKind::Comment,
        CompiledNodeTest::ProcessingInstruction(target) => {
            kind == NodeKind::ProcessingInstruction
                && target
                    .as_ref()
                    .is_none_or(|expected| doc.node_name(node_id) == Some(expected.as_str()))
        }
    }
}

/// Values of the attributes of `element` selected by a name test.
/// Namespace declarations are not attributes here.
pub fn attribute_values<D: DocumentAccess + ?Sized>(
    doc: &D,
    element: NodeId,
    node_test: &CompiledNodeTest,
    namespaces: &NamespaceMap,
) -> Vec<String> {
    doc.attributes(element)
        .iter()
        .filter(|attr| !doc.is_namespace_declaration(attr))
        .filter(|attr| matches_attribute_test(doc, attr, node_test, namespaces))
        .map(|attr| attr.value.clone())
        .collect()
}

fn matches_attribute_test<D: DocumentAccess + ?Sized>(
    doc: &D,
    attr: &XmlAttribute,
    node_test: &CompiledNodeTest,
    namespaces: &NamespaceMap,
) -> bool {
    let strings = doc.strings();
    match node_test {
        CompiledNodeTest::Any | CompiledNodeTest::Node => true,
        CompiledNodeTest::Name(name) => strings.get(attr.name_id) == name,
        CompiledNodeTest::QName(prefix, local) => match namespaces.get(prefix) {
            Some(uri) => strings.get(attr.namespace_id) == uri && strings.get(attr.local_id) == local,
            None => strings
                .get(attr.name_id)
                .split_once(':')
                .is_some_and(|(p, l)| p == prefix && l == local),
        },
        CompiledNodeTest::NamespaceWildcard(prefix) => match namespaces.get(prefix) {
            Some(uri) => strings.get(attr.namespace_id) == uri,
            None => strings.get_opt(attr.prefix_id) == Some(prefix.as_str()),
        },
        _ => false,
    }
}
