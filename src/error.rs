//! Error types

use crate::core::tokenizer::ParseError;
use crate::dom::NodeId;
use std::path::PathBuf;
use thiserror::Error;

/// Tree-shape violations raised by DOM editing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("hierarchy request error: {0}")]
    HierarchyRequest(String),
    #[error("node {0} does not exist in this document")]
    InvalidNode(NodeId),
}

/// Which directive a [`PatchError::MalformedDirective`] refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    /// The node action (`action` attribute or mod-node namespace suffix)
    Action,
    /// The mode half of a creation directive
    CreateMode,
    /// A creation directive without the `>` separator
    CreateDirective,
}

/// Errors raised while applying a patch
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An action, craft mode or creation directive that cannot be parsed.
    /// `valid` lists the accepted values; it is empty when the separator is missing.
    #[error("{}", malformed_message(*.kind, .value, .node, .valid))]
    MalformedDirective {
        kind: DirectiveKind,
        value: String,
        node: String,
        valid: String,
    },

    #[error("cannot create node \"{node}\" {mode} a node without a parent")]
    UnpositionableCreate { mode: String, node: String },

    #[error("node \"{node}\" is marked for removal but has child elements")]
    RemoveWithChildren { node: String },

    #[error("XPath expression \"{expr}\" failed: {reason}")]
    Expression { expr: String, reason: String },

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error("XML parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn malformed_message(kind: DirectiveKind, value: &str, node: &str, valid: &str) -> String {
    let subject = match kind {
        DirectiveKind::Action => "node action",
        DirectiveKind::CreateMode => "create mode",
        DirectiveKind::CreateDirective => {
            return format!("Unsupported attribute value (missing >): {}", value);
        }
    };
    format!(
        "Value of the {} is not valid - \"{}\" (node \"{}\"). The possible values: {}",
        subject, value, node, valid
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_messages() {
        let err = PatchError::MalformedDirective {
            kind: DirectiveKind::Action,
            value: "Bogus".into(),
            node: "node".into(),
            valid: "Merge, Create, Remove, MergeAll, RemoveAll".into(),
        };
        assert_eq!(
            err.to_string(),
            "Value of the node action is not valid - \"Bogus\" (node \"node\"). \
             The possible values: Merge, Create, Remove, MergeAll, RemoveAll"
        );

        let err = PatchError::MalformedDirective {
            kind: DirectiveKind::CreateDirective,
            value: "append.".into(),
            node: "node".into(),
            valid: String::new(),
        };
        assert_eq!(err.to_string(), "Unsupported attribute value (missing >): append.");

        let err = PatchError::MalformedDirective {
            kind: DirectiveKind::CreateMode,
            value: "inside".into(),
            node: "n".into(),
            valid: "After, Before, Append".into(),
        };
        assert_eq!(
            err.to_string(),
            "Value of the create mode is not valid - \"inside\" (node \"n\"). \
             The possible values: After, Before, Append"
        );
    }

    #[test]
    fn test_dom_error_converts() {
        let err: PatchError = DomError::InvalidNode(7).into();
        assert!(matches!(err, PatchError::Dom(DomError::InvalidNode(7))));
    }
}
