//! Crafting new source elements for patch nodes without a counterpart

use super::matcher::select;
use super::scheme::{CraftMode, Directives};
use crate::dom::{NodeId, XmlDocument};
use crate::error::PatchError;
use crate::xpath::{NamespaceMap, XPathCache};
use tracing::debug;

/// Create an empty element for a patch node and position it according to
/// its creation directive, relative to `parent`.
///
/// Returns `None` when the directive's path selects no reference node; the
/// patch node is then skipped.
pub fn craft(
    cache: &XPathCache,
    source: &mut XmlDocument,
    parent: NodeId,
    directives: &Directives,
    namespaces: &NamespaceMap,
) -> Result<Option<NodeId>, PatchError> {
    let directive = directives.create_directive()?;

    let Some(&reference) = select(cache, source, parent, &directive.path, namespaces)?.first() else {
        debug!(node = %directives.node, path = %directive.path, "no reference node for creation");
        return Ok(None);
    };
    let mode = directive.craft_mode(&directives.node)?;

    let element = source.create_element(&directives.name, directives.namespace.as_deref());
    match mode {
        CraftMode::Append => source.append_child(reference, element)?,
        CraftMode::After | CraftMode::Before => {
            if source.parent(reference).is_none() {
                return Err(PatchError::UnpositionableCreate {
                    mode: mode.name().to_string(),
                    node: directives.node.clone(),
                });
            }
            if mode == CraftMode::After {
                source.insert_after(reference, element)?;
            } else {
                source.insert_before(reference, element)?;
            }
        }
    }

    debug!(node = %directives.node, %mode, reference, "crafted element");
    Ok(Some(element))
}
