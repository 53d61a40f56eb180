//! Reserved namespaces and directive resolution
//!
//! A patch document steers the engine through attributes in
//! [`SCHEME_NAMESPACE`] and through element namespaces under
//! [`MOD_SCHEME_NAMESPACE`]. Everything that reads those reserved names lives
//! here; the rest of the engine works on the resolved [`Directives`].

use crate::dom::namespace::ns;
use crate::dom::{NodeId, XmlAttribute, XmlDocument};
use crate::error::{DirectiveKind, PatchError};
use std::fmt;

pub const SCHEME_NAMESPACE: &str = "http://schemas.xmlpatch";
pub const MOD_SCHEME_NAMESPACE: &str = "http://schemas.xmlpatch/mod";
pub const PRIMARY_ATTRIBUTE_NAMESPACE: &str = "http://schemas.xmlpatch/mod/attr/key";
pub const NODE_ACTION_NAMESPACE: &str = "http://schemas.xmlpatch/mod/node";

pub const ACTION_ATTRIBUTE: &str = "action";
pub const FIND_ATTRIBUTE: &str = "find";
pub const CREATE_ATTRIBUTE: &str = "create";
pub const CRAFT_SEPARATOR: char = '>';

/// What a patch node does to its source counterparts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Merge,
    Create,
    Remove,
    MergeAll,
    RemoveAll,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        ActionKind::Merge,
        ActionKind::Create,
        ActionKind::Remove,
        ActionKind::MergeAll,
        ActionKind::RemoveAll,
    ];

    /// Case-insensitive; surrounding whitespace is ignored
    pub fn from_name(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|a| a.name().eq_ignore_ascii_case(s))
    }

    pub fn name(self) -> &'static str {
        match self {
            ActionKind::Merge => "Merge",
            ActionKind::Create => "Create",
            ActionKind::Remove => "Remove",
            ActionKind::MergeAll => "MergeAll",
            ActionKind::RemoveAll => "RemoveAll",
        }
    }

    pub fn is_removal(self) -> bool {
        matches!(self, ActionKind::Remove | ActionKind::RemoveAll)
    }

    /// Whether every candidate is processed rather than only the first
    pub fn is_all(self) -> bool {
        matches!(self, ActionKind::MergeAll | ActionKind::RemoveAll)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a crafted node goes relative to its reference node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CraftMode {
    After,
    Before,
    Append,
}

impl CraftMode {
    pub const ALL: [CraftMode; 3] = [CraftMode::After, CraftMode::Before, CraftMode::Append];

    pub fn from_name(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|m| m.name().eq_ignore_ascii_case(s))
    }

    pub fn name(self) -> &'static str {
        match self {
            CraftMode::After => "After",
            CraftMode::Before => "Before",
            CraftMode::Append => "Append",
        }
    }
}

impl fmt::Display for CraftMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Comma-separated names for error messages
fn valid_names<I: IntoIterator<Item = &'static str>>(names: I) -> String {
    names.into_iter().collect::<Vec<_>>().join(", ")
}

/// A creation directive split at the separator; the mode is parsed later
/// because a directive whose path selects nothing is not an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDirective {
    pub mode: String,
    pub path: String,
}

impl CreateDirective {
    /// `Append` relative to the source parent itself
    pub fn append_to_parent() -> Self {
        CreateDirective {
            mode: CraftMode::Append.name().to_string(),
            path: ".".to_string(),
        }
    }

    pub fn parse(value: &str, node: &str) -> Result<Self, PatchError> {
        let (mode, path) = value
            .split_once(CRAFT_SEPARATOR)
            .ok_or_else(|| PatchError::MalformedDirective {
                kind: DirectiveKind::CreateDirective,
                value: value.to_string(),
                node: node.to_string(),
                valid: String::new(),
            })?;
        Ok(CreateDirective {
            mode: mode.to_string(),
            path: path.to_string(),
        })
    }

    pub fn craft_mode(&self, node: &str) -> Result<CraftMode, PatchError> {
        CraftMode::from_name(&self.mode).ok_or_else(|| PatchError::MalformedDirective {
            kind: DirectiveKind::CreateMode,
            value: self.mode.clone(),
            node: node.to_string(),
            valid: valid_names(CraftMode::ALL.map(CraftMode::name)),
        })
    }
}

/// Everything the engine needs to know about one patch node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directives {
    pub action: ActionKind,
    /// XPath expression selecting candidates under the source parent
    pub match_expr: String,
    /// Raw `create` attribute, if any
    pub create: Option<String>,
    /// Name for crafted elements
    pub name: String,
    /// Namespace URI for crafted elements
    pub namespace: Option<String>,
    /// Qualified name of the patch node, for messages
    pub node: String,
}

impl Directives {
    pub fn create_directive(&self) -> Result<CreateDirective, PatchError> {
        match &self.create {
            Some(value) => CreateDirective::parse(value, &self.node),
            None => Ok(CreateDirective::append_to_parent()),
        }
    }
}

pub fn is_mod_namespace(uri: &str) -> bool {
    uri.starts_with(MOD_SCHEME_NAMESPACE)
}

/// Attributes that steer the engine and are never copied to the source
pub fn is_reserved_attribute(doc: &XmlDocument, attr: &XmlAttribute) -> bool {
    if doc.attribute_namespace(attr) == Some(SCHEME_NAMESPACE) {
        return true;
    }
    doc.attribute_prefix(attr) == Some("xmlns") && attr.value.starts_with(SCHEME_NAMESPACE)
}

fn scheme_attribute<'d>(doc: &'d XmlDocument, node: NodeId, local: &str) -> Option<&'d str> {
    doc.get_attribute_ns(node, SCHEME_NAMESPACE, local)
}

/// Resolve the action of a patch node
pub fn resolve_action(doc: &XmlDocument, node: NodeId) -> Result<ActionKind, PatchError> {
    let raw = match scheme_attribute(doc, node, ACTION_ATTRIBUTE) {
        Some(value) => value,
        None => match doc
            .node_namespace_uri(node)
            .and_then(|uri| uri.strip_prefix(NODE_ACTION_NAMESPACE))
        {
            Some(suffix) => suffix.trim_start_matches('/'),
            None => return Ok(ActionKind::Merge),
        },
    };

    ActionKind::from_name(raw).ok_or_else(|| PatchError::MalformedDirective {
        kind: DirectiveKind::Action,
        value: raw.to_string(),
        node: doc.node_name(node).unwrap_or_default().to_string(),
        valid: valid_names(ActionKind::ALL.map(ActionKind::name)),
    })
}

/// Tag name used for matching and crafting: the local name for nodes in the
/// mod namespaces, the qualified name otherwise
pub fn effective_name(doc: &XmlDocument, node: NodeId) -> &str {
    match doc.node_namespace_uri(node) {
        Some(uri) if is_mod_namespace(uri) => doc.node_local_name(node).unwrap_or_default(),
        _ => doc.node_name(node).unwrap_or_default(),
    }
}

/// First attribute in the primary-key namespace, as (local name, value)
pub fn primary_key(doc: &XmlDocument, node: NodeId) -> Option<(&str, &str)> {
    doc.attributes(node)
        .iter()
        .find(|attr| doc.attribute_namespace(attr) == Some(PRIMARY_ATTRIBUTE_NAMESPACE))
        .map(|attr| (doc.attribute_local_name(attr), attr.value.as_str()))
}

/// Quote a value as an XPath string literal
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{}'", value)
    } else if !value.contains('"') {
        format!("\"{}\"", value)
    } else {
        let parts: Vec<String> = value
            .split('\'')
            .map(|part| format!("'{}'", part))
            .collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// The expression matching this node's source candidates
pub fn match_expression(doc: &XmlDocument, node: NodeId) -> String {
    if let Some(find) = scheme_attribute(doc, node, FIND_ATTRIBUTE) {
        return find.to_string();
    }

    let name = effective_name(doc, node);
    match primary_key(doc, node) {
        Some((key, value)) => format!("{}[@{} = {}]", name, key, xpath_literal(value)),
        None => name.to_string(),
    }
}

/// Resolve all directives of a patch node
pub fn resolve(doc: &XmlDocument, node: NodeId) -> Result<Directives, PatchError> {
    let action = resolve_action(doc, node)?;
    let mod_family = doc.node_namespace_uri(node).is_some_and(is_mod_namespace);

    Ok(Directives {
        action,
        match_expr: match_expression(doc, node),
        create: scheme_attribute(doc, node, CREATE_ATTRIBUTE).map(str::to_string),
        name: effective_name(doc, node).to_string(),
        namespace: if mod_family {
            None
        } else {
            doc.node_namespace_uri(node).map(str::to_string)
        },
        node: doc.node_name(node).unwrap_or_default().to_string(),
    })
}

/// Prefix bindings for evaluating a patch node's expressions. The default
/// namespace does not apply to XPath name tests.
pub fn expression_namespaces(doc: &XmlDocument, node: NodeId) -> crate::xpath::NamespaceMap {
    let mut bindings = doc.in_scope_namespaces(node);
    bindings.remove("");
    bindings.insert("xml".to_string(), ns::XML.to_string());
    bindings
}
