//! Patch engine
//!
//! Applies a patch document to a source document in place. Every patch
//! element is resolved to a set of [`Directives`](scheme::Directives), matched
//! against the children of its parent's source counterparts, and then merged
//! into a match, crafted when nothing matches, or used to remove matches.
//!
//! ```text
//! source:  <root><settings2><node/></settings2></root>
//! patch:   <root><settings2><newnode/></settings2></root>
//! result:  <root><settings2><node/><newnode/></settings2></root>
//! ```

pub mod craft;
pub mod files;
pub mod matcher;
pub mod merge;
pub mod parallel;
pub mod scheme;

use crate::dom::{NodeId, NodeKind, XmlDocument};
use crate::error::PatchError;
use crate::xpath::XPathCache;
use scheme::{ActionKind, Directives};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

pub use files::{patch_file_in_place, patch_files, patch_str, FileOptions};
pub use parallel::patch_parallel;

/// Engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchOptions {
    /// Compiled match expressions kept per `Patcher`; 0 disables the cache
    pub xpath_cache_size: usize,
}

impl Default for PatchOptions {
    fn default() -> Self {
        PatchOptions { xpath_cache_size: 256 }
    }
}

/// Outcome counts of one patch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchReport {
    /// Existing source elements merged into
    pub merged: usize,
    /// Elements crafted (and merged into)
    pub created: usize,
    /// Source elements removed
    pub removed: usize,
    /// Patch nodes (or fan-out branches) that had no effect on the source
    pub skipped: usize,
}

/// State of a single run
struct PatchRun {
    /// Patch node -> source counterparts
    counterparts: HashMap<NodeId, Vec<NodeId>>,
    /// Source nodes already matched by some patch node
    claimed: HashSet<NodeId>,
    report: PatchReport,
}

impl PatchRun {
    fn new(patch_root: NodeId, source_root: NodeId) -> Self {
        PatchRun {
            counterparts: HashMap::from([(patch_root, vec![source_root])]),
            claimed: HashSet::from([source_root]),
            report: PatchReport::default(),
        }
    }

    fn register(&mut self, patch_node: NodeId, source_node: NodeId) {
        self.counterparts.entry(patch_node).or_default().push(source_node);
        self.claimed.insert(source_node);
    }
}

/// Applies patch documents; holds the compiled expression cache
#[derive(Debug, Default)]
pub struct Patcher {
    cache: XPathCache,
}

impl Patcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: PatchOptions) -> Self {
        Patcher {
            cache: XPathCache::new(options.xpath_cache_size),
        }
    }

    /// Apply every element of `patch`, the document element included
    pub fn patch(&self, source: &mut XmlDocument, patch: &XmlDocument) -> Result<PatchReport, PatchError> {
        if patch.root_element_id().is_none() {
            return Err(PatchError::InvalidArgument("the patch document has no document element".into()));
        }
        let source_root = source.document_node_id();
        self.patch_subtree(source, source_root, patch, patch.document_node_id())
    }

    /// Apply the element descendants of `patch_root`, with `patch_root`
    /// corresponding to `source_root`
    pub fn patch_subtree(
        &self,
        source: &mut XmlDocument,
        source_root: NodeId,
        patch: &XmlDocument,
        patch_root: NodeId,
    ) -> Result<PatchReport, PatchError> {
        check_seed(source, source_root, "source")?;
        check_seed(patch, patch_root, "patch")?;

        let plan = plan(patch, patch_root)?;
        let mut run = PatchRun::new(patch_root, source_root);

        for (patch_node, directives) in &plan {
            let parents = patch
                .parent(*patch_node)
                .and_then(|parent| run.counterparts.get(&parent))
                .cloned()
                .unwrap_or_default();
            if parents.is_empty() {
                debug!(node = %directives.node, "parent was skipped, skipping node");
                run.report.skipped += 1;
                continue;
            }
            self.apply(&mut run, source, patch, *patch_node, directives, &parents)?;
        }

        let report = run.report;
        info!(
            merged = report.merged,
            created = report.created,
            removed = report.removed,
            skipped = report.skipped,
            "patch applied"
        );
        Ok(report)
    }

    /// Process one patch node under each of its parent's counterparts
    fn apply(
        &self,
        run: &mut PatchRun,
        source: &mut XmlDocument,
        patch: &XmlDocument,
        patch_node: NodeId,
        directives: &Directives,
        parents: &[NodeId],
    ) -> Result<(), PatchError> {
        let namespaces = scheme::expression_namespaces(patch, patch_node);
        let action = directives.action;

        for &parent in parents {
            let candidates = if action == ActionKind::Create {
                Vec::new()
            } else {
                matcher::find_candidates(
                    &self.cache,
                    source,
                    parent,
                    &directives.match_expr,
                    &namespaces,
                    &run.claimed,
                )?
            };
            debug!(node = %directives.node, %action, parent, candidates = candidates.len(), "resolved");

            if action.is_removal() {
                let limit = if action.is_all() { candidates.len() } else { 1 };
                for candidate in candidates.into_iter().take(limit) {
                    source.detach(candidate)?;
                    run.report.removed += 1;
                }
                continue;
            }

            if action == ActionKind::Create || candidates.is_empty() {
                let Some(crafted) = craft::craft(&self.cache, source, parent, directives, &namespaces)? else {
                    warn!(node = %directives.node, "creation target not found, skipping subtree");
                    run.report.skipped += 1;
                    continue;
                };
                merge::merge_node(source, crafted, patch, patch_node)?;
                run.register(patch_node, crafted);
                run.report.created += 1;
                continue;
            }

            let limit = if action.is_all() { candidates.len() } else { 1 };
            for candidate in candidates.into_iter().take(limit) {
                merge::merge_node(source, candidate, patch, patch_node)?;
                run.register(patch_node, candidate);
                run.report.merged += 1;
            }
        }
        Ok(())
    }
}

fn check_seed(doc: &XmlDocument, id: NodeId, which: &str) -> Result<(), PatchError> {
    let live = matches!(doc.node_kind(id), Some(NodeKind::Element | NodeKind::Document)) && doc.is_attached(id);
    if live {
        Ok(())
    } else {
        Err(PatchError::InvalidArgument(format!(
            "{} node {} is not an element or document node of its document",
            which, id
        )))
    }
}

/// Resolve every patch element below `patch_root` in pre-order, rejecting
/// bad directives before the source is touched
fn plan(patch: &XmlDocument, patch_root: NodeId) -> Result<Vec<(NodeId, Directives)>, PatchError> {
    patch
        .descendants(patch_root)
        .filter(|&id| patch.is_element(id))
        .map(|id| {
            let directives = scheme::resolve(patch, id)?;
            if directives.action.is_removal() && patch.children(id).any(|c| patch.is_element(c)) {
                return Err(PatchError::RemoveWithChildren {
                    node: directives.node,
                });
            }
            Ok((id, directives))
        })
        .collect()
}

/// Patch with a default [`Patcher`]
pub fn patch(source: &mut XmlDocument, patch: &XmlDocument) -> Result<PatchReport, PatchError> {
    Patcher::new().patch(source, patch)
}

/// Patch a subtree with a default [`Patcher`]
pub fn patch_subtree(
    source: &mut XmlDocument,
    source_root: NodeId,
    patch: &XmlDocument,
    patch_root: NodeId,
) -> Result<PatchReport, PatchError> {
    Patcher::new().patch_subtree(source, source_root, patch, patch_root)
}

/// All elements of a document in pre-order, the document element first
pub fn list_all_elements(doc: &XmlDocument) -> Vec<NodeId> {
    doc.elements()
}

#[cfg(test)]
mod tests {
    use super::scheme::{NODE_ACTION_NAMESPACE, SCHEME_NAMESPACE};
    use super::*;
    use crate::dom::WriteOptions;

    fn parse(xml: &str) -> XmlDocument {
        XmlDocument::parse_str(xml).unwrap()
    }

    fn serialize(doc: &XmlDocument) -> String {
        doc.to_xml_with(&WriteOptions {
            xml_declaration: false,
            indent: None,
        })
    }

    fn apply(source_xml: &str, patch_xml: &str) -> Result<(XmlDocument, PatchReport), PatchError> {
        let mut source = parse(source_xml);
        let report = patch(&mut source, &parse(patch_xml))?;
        Ok((source, report))
    }

    fn check(source_xml: &str, patch_xml: &str, expected_xml: &str) {
        let (source, _) = apply(source_xml, patch_xml).unwrap();
        assert_eq!(serialize(&source), serialize(&parse(expected_xml)));
    }

    fn with_scheme(body: &str) -> String {
        format!("<root xmlns:patch=\"{}\">{}</root>", SCHEME_NAMESPACE, body)
    }

    fn with_action_prefix(prefix: &str, action: &str, body: &str) -> String {
        format!(
            "<root xmlns:{}=\"{}/{}\">{}</root>",
            prefix, NODE_ACTION_NAMESPACE, action, body
        )
    }

    const SETTINGS: &str = "<settings><node/><node/></settings>";

    #[test]
    fn test_select_all_nodes() {
        let doc = parse(
            "<root>
                <settings>
                    <node attr='foo' />
                    <node gaga='asd'>123456</node>
                </settings>
                <settings2>
                    <node>blabla</node>
                </settings2>
            </root>",
        );
        let elements = list_all_elements(&doc);
        assert_eq!(elements.len(), 6);
        assert_eq!(elements[0], doc.root_element_id().unwrap());
    }

    #[test]
    fn test_simple_merge() {
        check(
            &format!("<root>{}<settings2><node/></settings2></root>", SETTINGS),
            "<root><settings2><newnode/></settings2></root>",
            &format!("<root>{}<settings2><node/><newnode/></settings2></root>", SETTINGS),
        );
    }

    #[test]
    fn test_simple_merge_by_mod_prefix() {
        check(
            &format!("<root>{}<settings2><node/></settings2></root>", SETTINGS),
            &with_action_prefix("merge", "Merge", "<settings2><merge:newnode/><newnode/></settings2>"),
            &format!(
                "<root>{}<settings2><node/><newnode/><newnode/></settings2></root>",
                SETTINGS
            ),
        );
    }

    #[test]
    fn test_already_existing_node_is_kept() {
        let source = format!("<root>{}<settings2><node/><newnode/></settings2></root>", SETTINGS);
        check(&source, "<root><settings2><newnode/></settings2></root>", &source);
    }

    #[test]
    fn test_already_merged_nodes_are_not_matched_twice() {
        check(
            &format!("<root>{}<settings2><node/><newnode/></settings2></root>", SETTINGS),
            "<root><settings2><newnode/><newnode/></settings2></root>",
            &format!(
                "<root>{}<settings2><node/><newnode/><newnode/></settings2></root>",
                SETTINGS
            ),
        );
    }

    #[test]
    fn test_scheme_attributes_are_not_copied() {
        let source = format!(
            "<root>{}<settings2><node/><newnode/><newnode/></settings2></root>",
            SETTINGS
        );
        check(
            &source,
            &with_scheme("<settings2><newnode patch:action=\"Merge\"/><newnode/></settings2>"),
            &source,
        );
    }

    #[test]
    fn test_remove_nodes() {
        check(
            &format!(
                "<root>{}<settings2><node/><newnode/><newnode/></settings2></root>",
                SETTINGS
            ),
            &with_scheme(
                "<settings2><newnode patch:action=\"Remove\"/><newnode patch:action=\"Remove\"/></settings2>",
            ),
            &format!("<root>{}<settings2><node/></settings2></root>", SETTINGS),
        );
    }

    #[test]
    fn test_remove_nodes_by_mod_prefix() {
        check(
            &format!(
                "<root>{}<settings2><node/><newnode/><newnode/></settings2></root>",
                SETTINGS
            ),
            &with_action_prefix(
                "remove",
                "Remove",
                "<settings2><remove:newnode/><remove:newnode/></settings2>",
            ),
            &format!("<root>{}<settings2><node/></settings2></root>", SETTINGS),
        );
    }

    #[test]
    fn test_remove_all_by_mod_prefix() {
        check(
            "<root><settings><node/><newnode/><node/></settings>\
             <settings2><node/><newnode/><newnode/></settings2></root>",
            &with_action_prefix("removeall", "RemoveAll", "<settings2><removeall:newnode/></settings2>"),
            "<root><settings><node/><newnode/><node/></settings><settings2><node/></settings2></root>",
        );
    }

    const KEYED_SOURCE: &str = "<root><settings><node/><node/></settings>\
         <settings2><node/><node attr=\"val2\"/><node/></settings2></root>";

    #[test]
    fn test_merge_by_find_expression() {
        check(
            "<root><settings><node/><node/></settings>\
             <settings2><node/><node attr=\"val\"/><node/></settings2></root>",
            &with_scheme(
                "<settings2><node patch:find=\"node[@attr='val']\" foo=\"123\">blabla</node></settings2>",
            ),
            "<root><settings><node/><node/></settings>\
             <settings2><node/><node attr=\"val\" foo=\"123\">blabla</node><node/></settings2></root>",
        );
    }

    #[test]
    fn test_find_expression_not_found_appends() {
        check(
            KEYED_SOURCE,
            &with_scheme(
                "<settings2><node patch:find=\"node[@attr='val12345']\" attr=\"val\" foo=\"123\">blabla</node></settings2>",
            ),
            "<root><settings><node/><node/></settings>\
             <settings2><node/><node attr=\"val2\"/><node/><node attr=\"val\" foo=\"123\">blabla</node></settings2></root>",
        );
    }

    #[test]
    fn test_find_expression_changes_attribute_value() {
        check(
            KEYED_SOURCE,
            &with_scheme(
                "<settings2><node patch:find=\"node[@attr='val2']\" attr=\"val\" foo=\"123\">blabla</node></settings2>",
            ),
            "<root><settings><node/><node/></settings>\
             <settings2><node/><node attr=\"val\" foo=\"123\">blabla</node><node/></settings2></root>",
        );
    }

    #[test]
    fn test_craft_append_explicit() {
        check(
            KEYED_SOURCE,
            &with_scheme(
                "<settings2><node patch:find=\"node[@attr='val']\" patch:create=\"append>.\" attr=\"val2\" foo=\"123\">blabla</node></settings2>",
            ),
            "<root><settings><node/><node/></settings>\
             <settings2><node/><node attr=\"val2\"/><node/><node attr=\"val2\" foo=\"123\">blabla</node></settings2></root>",
        );
    }

    #[test]
    fn test_craft_after_last() {
        check(
            KEYED_SOURCE,
            &with_scheme(
                "<settings2><node patch:find=\"node[@attr='val']\" patch:create=\"after>node[last()]\" attr=\"val2\" foo=\"123\">blabla</node></settings2>",
            ),
            "<root><settings><node/><node/></settings>\
             <settings2><node/><node attr=\"val2\"/><node/><node attr=\"val2\" foo=\"123\">blabla</node></settings2></root>",
        );
    }

    #[test]
    fn test_craft_before_first() {
        check(
            "<root><s><a/><b/></s></root>",
            &with_scheme("<s><n patch:create=\"Before>*[1]\"/></s>"),
            "<root><s><n/><a/><b/></s></root>",
        );
    }

    #[test]
    fn test_primary_key_attribute() {
        check(
            "<root><s><n id=\"1\"/><n id=\"2\"/></s></root>",
            &format!(
                "<root xmlns:key=\"{}/mod/attr/key\"><s><n key:id=\"2\" v=\"x\"/><n key:id=\"3\"/></s></root>",
                SCHEME_NAMESPACE
            ),
            "<root><s><n id=\"1\"/><n id=\"2\" v=\"x\"/><n id=\"3\"/></s></root>",
        );
    }

    #[test]
    fn test_merge_all_versus_merge() {
        let source = "<root><s><n/><n/><n/></s></root>";
        check(
            source,
            &with_scheme("<s><n patch:action=\"MergeAll\" v=\"1\"/></s>"),
            "<root><s><n v=\"1\"/><n v=\"1\"/><n v=\"1\"/></s></root>",
        );
        check(
            source,
            &with_scheme("<s><n patch:action=\"merge\" v=\"1\"/></s>"),
            "<root><s><n v=\"1\"/><n/><n/></s></root>",
        );
    }

    #[test]
    fn test_merge_all_fans_out_children() {
        check(
            "<root><s><n/><n/></s></root>",
            &with_scheme("<s><n patch:action=\"MergeAll\"><c/></n></s>"),
            "<root><s><n><c/></n><n><c/></n></s></root>",
        );
    }

    #[test]
    fn test_remove_all_versus_remove() {
        let source = "<root><s><n/><n/><n/><k/></s></root>";
        check(
            source,
            &with_scheme("<s><n patch:action=\"RemoveAll\"/></s>"),
            "<root><s><k/></s></root>",
        );
        check(
            source,
            &with_scheme("<s><n patch:action=\"Remove\"/></s>"),
            "<root><s><n/><n/><k/></s></root>",
        );
    }

    #[test]
    fn test_remove_without_match_is_a_no_op() {
        let (doc, report) = apply("<root><s/></root>", &with_scheme("<s><n patch:action=\"Remove\"/></s>")).unwrap();
        assert_eq!(serialize(&doc), "<root><s/></root>");
        assert_eq!(report.removed, 0);
    }

    #[test]
    fn test_create_action_always_crafts() {
        check(
            "<root><s><n/></s></root>",
            &with_scheme("<s><n patch:action=\"Create\" v=\"2\"/></s>"),
            "<root><s><n/><n v=\"2\"/></s></root>",
        );
    }

    #[test]
    fn test_missing_creation_target_skips_subtree() {
        let (doc, report) = apply(
            "<root><s/></root>",
            &with_scheme("<s><n patch:create=\"after>missing\"><child/></n></s>"),
        )
        .unwrap();
        assert_eq!(serialize(&doc), "<root><s/></root>");
        assert_eq!(report.skipped, 2);
        assert_eq!(report.created, 0);
    }

    #[test]
    fn test_invalid_action_fails_before_mutation() {
        let mut source = parse("<root><s><n/></s></root>");
        let before = serialize(&source);
        let err = patch(
            &mut source,
            &parse(&with_scheme("<s><n patch:action=\"Remove\"/><m patch:action=\"Bogus\"/></s>")),
        )
        .unwrap_err();
        assert!(matches!(err, PatchError::MalformedDirective { ref value, .. } if value == "Bogus"));
        assert_eq!(serialize(&source), before);
    }

    #[test]
    fn test_numeric_action_rejected() {
        let err = apply("<root/>", &with_scheme("<n patch:action=\"0\"/>")).unwrap_err();
        assert!(matches!(err, PatchError::MalformedDirective { .. }));
    }

    #[test]
    fn test_remove_with_children_rejected() {
        let mut source = parse("<root><s><n/></s></root>");
        let err = patch(
            &mut source,
            &parse(&with_scheme("<s><n patch:action=\"RemoveAll\"><c/></n></s>")),
        )
        .unwrap_err();
        assert!(matches!(err, PatchError::RemoveWithChildren { ref node } if node == "n"));
        assert_eq!(serialize(&source), "<root><s><n/></s></root>");
    }

    #[test]
    fn test_missing_separator_rejected() {
        let err = apply("<root><s/></root>", &with_scheme("<s><n patch:create=\"append.\"/></s>")).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported attribute value (missing >): append.");
    }

    #[test]
    fn test_unpositionable_create() {
        let err = apply("<root><s/></root>", &with_scheme("<s><n patch:create=\"before>/\"/></s>")).unwrap_err();
        assert!(matches!(err, PatchError::UnpositionableCreate { ref node, .. } if node == "n"));
    }

    #[test]
    fn test_bad_find_expression() {
        let err = apply("<root><s/></root>", &with_scheme("<s><n patch:find=\"n[\"/></s>")).unwrap_err();
        assert!(matches!(err, PatchError::Expression { ref expr, .. } if expr == "n["));
    }

    #[test]
    fn test_repeated_patch_is_idempotent() {
        let patch_xml = with_scheme(
            "<settings2><node patch:find=\"node[@attr='val']\" attr=\"val\" foo=\"123\">blabla</node><extra/></settings2>",
        );
        let (once, _) = apply(KEYED_SOURCE, &patch_xml).unwrap();
        let mut twice = once.clone();
        patch(&mut twice, &parse(&patch_xml)).unwrap();
        assert_eq!(serialize(&once), serialize(&twice));
    }

    #[test]
    fn test_namespaced_documents() {
        check(
            "<root xmlns=\"urn:d\"><item/></root>",
            "<root xmlns=\"urn:d\"><item v=\"1\"/><new/></root>",
            "<root xmlns=\"urn:d\"><item v=\"1\"/><new/></root>",
        );
        check(
            "<root xmlns:a=\"urn:x\"><a:item/></root>",
            "<root xmlns:b=\"urn:x\"><b:item v=\"1\"/></root>",
            "<root xmlns:a=\"urn:x\" xmlns:b=\"urn:x\"><a:item v=\"1\"/></root>",
        );
    }

    #[test]
    fn test_report_counts() {
        let (_, report) = apply(
            "<root><s><a/><b/></s></root>",
            &with_scheme("<s><a v=\"1\"/><b patch:action=\"Remove\"/><c/></s>"),
        )
        .unwrap();
        // root and s are merged too
        assert_eq!(
            report,
            PatchReport {
                merged: 3,
                created: 1,
                removed: 1,
                skipped: 0
            }
        );
    }

    #[test]
    fn test_patch_subtree_seeds() {
        let mut source = parse("<root><s><n/></s><t/></root>");
        let patch_doc = parse("<p><n v=\"1\"/></p>");
        let s = source.children(source.root_element_id().unwrap()).next().unwrap();
        let report = patch_subtree(&mut source, s, &patch_doc, patch_doc.root_element_id().unwrap()).unwrap();
        assert_eq!(report.merged, 1);
        assert_eq!(serialize(&source), "<root><s><n v=\"1\"/></s><t/></root>");
    }

    #[test]
    fn test_patch_subtree_rejects_bad_seeds() {
        let mut source = parse("<root>text</root>");
        let patch_doc = parse("<p/>");
        let text = source.children(source.root_element_id().unwrap()).next().unwrap();
        let err = patch_subtree(&mut source, text, &patch_doc, 0).unwrap_err();
        assert!(matches!(err, PatchError::InvalidArgument(_)));

        let err = patch_subtree(&mut source, 0, &patch_doc, 99).unwrap_err();
        assert!(matches!(err, PatchError::InvalidArgument(_)));
    }

    #[test]
    fn test_no_cache_patcher() {
        let patcher = Patcher::with_options(PatchOptions { xpath_cache_size: 0 });
        let mut source = parse("<root><s/></root>");
        patcher.patch(&mut source, &parse("<root><s><n/></s></root>")).unwrap();
        assert_eq!(serialize(&source), "<root><s><n/></s></root>");
    }
}
