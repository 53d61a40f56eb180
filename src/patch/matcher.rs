//! Candidate lookup in the source document

use crate::dom::{NodeId, XmlDocument};
use crate::error::PatchError;
use crate::xpath::{evaluate_compiled, EvalContext, NamespaceMap, XPathCache, XPathValue};
use std::collections::HashSet;
use tracing::trace;

/// Evaluate `expr` with `context` as the context node and return the
/// selected nodes in document order
pub fn select(
    cache: &XPathCache,
    doc: &XmlDocument,
    context: NodeId,
    expr: &str,
    namespaces: &NamespaceMap,
) -> Result<Vec<NodeId>, PatchError> {
    let failed = |reason: String| PatchError::Expression {
        expr: expr.to_string(),
        reason,
    };

    let compiled = cache.get_or_compile(expr).map_err(failed)?;
    let ctx = EvalContext::new(doc, context, namespaces);
    match evaluate_compiled(&compiled, &ctx).map_err(failed)? {
        XPathValue::NodeSet(nodes) => Ok(nodes),
        other => Err(failed(format!("expected a node-set, got {:?}", other))),
    }
}

/// Source candidates for a patch node under `parent`, skipping nodes
/// already claimed in this run
pub fn find_candidates(
    cache: &XPathCache,
    source: &XmlDocument,
    parent: NodeId,
    expr: &str,
    namespaces: &NamespaceMap,
    claimed: &HashSet<NodeId>,
) -> Result<Vec<NodeId>, PatchError> {
    let mut candidates = select(cache, source, parent, expr, namespaces)?;
    let found = candidates.len();
    candidates.retain(|id| !claimed.contains(id));
    trace!(expr, parent, found, unclaimed = candidates.len(), "matched candidates");
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(doc: &XmlDocument) -> NodeId {
        doc.elements()
            .into_iter()
            .find(|&id| doc.node_name(id) == Some("settings"))
            .unwrap()
    }

    #[test]
    fn test_candidates_in_document_order() {
        let doc = XmlDocument::parse_str("<r><settings><node/><other/><node/></settings></r>").unwrap();
        let cache = XPathCache::new(8);
        let parent = settings(&doc);
        let found = find_candidates(&cache, &doc, parent, "node", &NamespaceMap::new(), &HashSet::new()).unwrap();
        let expected: Vec<NodeId> = doc
            .children(parent)
            .filter(|&c| doc.node_name(c) == Some("node"))
            .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_claimed_nodes_excluded() {
        let doc = XmlDocument::parse_str("<r><settings><node/><node/></settings></r>").unwrap();
        let cache = XPathCache::new(8);
        let parent = settings(&doc);
        let first = doc.children(parent).next().unwrap();
        let claimed: HashSet<NodeId> = [first].into_iter().collect();
        let found = find_candidates(&cache, &doc, parent, "node", &NamespaceMap::new(), &claimed).unwrap();
        assert_eq!(found.len(), 1);
        assert_ne!(found[0], first);
    }

    #[test]
    fn test_non_node_set_is_an_error() {
        let doc = XmlDocument::parse_str("<r a=\"1\"/>").unwrap();
        let cache = XPathCache::new(8);
        let root = doc.root_element_id().unwrap();
        for expr in ["count(*)", "@a", "node["] {
            let err = select(&cache, &doc, root, expr, &NamespaceMap::new()).unwrap_err();
            assert!(matches!(err, PatchError::Expression { .. }), "{}", expr);
        }
    }

    #[test]
    fn test_prefixed_expression_uses_bindings() {
        let doc = XmlDocument::parse_str("<r xmlns:s=\"urn:s\"><s:item/></r>").unwrap();
        let cache = XPathCache::new(8);
        let root = doc.root_element_id().unwrap();
        let mut namespaces = NamespaceMap::new();
        namespaces.insert("p".into(), "urn:s".into());
        assert_eq!(select(&cache, &doc, root, "p:item", &namespaces).unwrap().len(), 1);
    }
}
