//! Copying patch node content onto a source node

use super::scheme::{is_mod_namespace, is_reserved_attribute};
use crate::dom::{NodeId, XmlDocument};
use crate::error::PatchError;
use tracing::{debug, trace};

/// Merge the attributes and text of `patch_node` into `target`.
/// Applying the same patch node twice leaves the target unchanged.
pub fn merge_node(
    source: &mut XmlDocument,
    target: NodeId,
    patch: &XmlDocument,
    patch_node: NodeId,
) -> Result<(), PatchError> {
    merge_attributes(source, target, patch, patch_node)?;

    let text = patch.own_text(patch_node);
    if !text.trim().is_empty() {
        source.set_own_text(target, &text)?;
    }

    // A single non-element child replaces the whole content
    let mut children = patch.children(patch_node);
    if let (Some(only), None) = (children.next(), children.next()) {
        if !patch.is_element(only) {
            source.replace_children_with_import(target, patch, &[only])?;
        }
    }

    Ok(())
}

fn merge_attributes(
    source: &mut XmlDocument,
    target: NodeId,
    patch: &XmlDocument,
    patch_node: NodeId,
) -> Result<(), PatchError> {
    for attr in patch.attributes(patch_node) {
        if is_reserved_attribute(patch, attr) {
            continue;
        }

        let namespace = patch.attribute_namespace(attr);
        if namespace.is_some_and(is_mod_namespace) {
            let local = patch.attribute_local_name(attr);
            trace!(node = target, attr = local, "set mod attribute");
            source.set_attribute(target, local, None, &attr.value)?;
            continue;
        }

        let name = patch.attribute_name(attr);
        // A default namespace declaration must agree with the element's own namespace
        if name == "xmlns" && source.node_namespace_uri(target).unwrap_or("") != attr.value {
            debug!(node = target, uri = %attr.value, "default namespace declaration not copied");
            continue;
        }
        trace!(node = target, attr = name, "set attribute");
        source.set_attribute(target, name, namespace, &attr.value)?;
    }
    Ok(())
}
