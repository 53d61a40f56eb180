//! XPath Evaluation Engine
//!
//! Evaluates compiled XPath expressions against an XML document.

use super::axes::{attribute_values, matches_node_test, navigate};
use super::compiler::{CompiledExpr, Op};
use super::functions;
use super::parser::{Axis, BinaryOp};
use super::value::{parse_number, XPathValue};
use super::NamespaceMap;
use crate::dom::{node_string_value, DocumentAccess, NodeId};

/// Evaluation context - generic over document type
pub struct EvalContext<'a, D: DocumentAccess + ?Sized> {
    pub doc: &'a D,
    pub context_node: NodeId,
    pub context_position: usize,
    pub context_size: usize,
    /// Prefix bindings for qualified name tests
    pub namespaces: &'a NamespaceMap,
}

impl<'a, D: DocumentAccess + ?Sized> EvalContext<'a, D> {
    pub fn new(doc: &'a D, context_node: NodeId, namespaces: &'a NamespaceMap) -> Self {
        EvalContext {
            doc,
            context_node,
            context_position: 1,
            context_size: 1,
            namespaces,
        }
    }

    fn at(&self, node: NodeId, position: usize, size: usize) -> Self {
        EvalContext {
            doc: self.doc,
            context_node: node,
            context_position: position,
            context_size: size,
            namespaces: self.namespaces,
        }
    }
}

/// Evaluate an XPath expression with the document node as context
#[must_use = "XPath evaluation result should be used"]
pub fn evaluate<D: DocumentAccess + ?Sized>(doc: &D, xpath: &str) -> Result<XPathValue, String> {
    evaluate_from_node(doc, doc.document_node_id(), xpath)
}

/// Evaluate an XPath expression from a specific context node
#[must_use = "XPath evaluation result should be used"]
pub fn evaluate_from_node<D: DocumentAccess + ?Sized>(
    doc: &D,
    context_node: NodeId,
    xpath: &str,
) -> Result<XPathValue, String> {
    let compiled = super::compiler::compile(xpath)?;
    let namespaces = NamespaceMap::new();
    evaluate_compiled(&compiled, &EvalContext::new(doc, context_node, &namespaces))
}

/// Evaluate a compiled expression
pub fn evaluate_compiled<D: DocumentAccess + ?Sized>(
    expr: &CompiledExpr,
    ctx: &EvalContext<'_, D>,
) -> Result<XPathValue, String> {
    let mut stack: Vec<XPathValue> = Vec::with_capacity(4);

    for op in &expr.ops {
        match op {
            Op::Root => {
                stack.push(XPathValue::single_node(ctx.doc.document_node_id()));
            }

            Op::Context => {
                stack.push(XPathValue::single_node(ctx.context_node));
            }

            Op::Step { axis, test, predicates } => {
                let nodes = match pop(&mut stack)? {
                    XPathValue::NodeSet(nodes) => nodes,
                    // Attribute values have no children or attributes of their own
                    XPathValue::StringList(_) => {
                        stack.push(XPathValue::empty_nodeset());
                        continue;
                    }
                    _ => return Err("Location step applied to a non-node-set value".to_string()),
                };

                if *axis == Axis::Attribute {
                    if !predicates.is_empty() {
                        return Err("Predicates on attribute steps are not supported".to_string());
                    }
                    let mut values = Vec::new();
                    for node in nodes {
                        values.extend(attribute_values(ctx.doc, node, test, ctx.namespaces));
                    }
                    stack.push(XPathValue::StringList(values));
                    continue;
                }

                let mut result = Vec::with_capacity(nodes.len());
                for node in nodes {
                    // Candidates stay in axis order so predicates see proximity positions
                    let mut candidates: Vec<NodeId> = navigate(ctx.doc, node, *axis)
                        .into_iter()
                        .filter(|&candidate| matches_node_test(ctx.doc, candidate, test, ctx.namespaces))
                        .collect();
                    for predicate in predicates {
                        candidates = filter_nodes(predicate, candidates, ctx)?;
                    }
                    result.extend(candidates);
                }
                ctx.doc.sort_document_order(&mut result);
                stack.push(XPathValue::NodeSet(result));
            }

            Op::Predicate(pred_expr) => match pop(&mut stack)? {
                XPathValue::NodeSet(nodes) => {
                    let filtered = filter_nodes(pred_expr, nodes, ctx)?;
                    stack.push(XPathValue::NodeSet(filtered));
                }
                _ => return Err("Predicate applied to a non-node-set value".to_string()),
            },

            Op::Union => {
                let right = pop(&mut stack)?;
                let left = pop(&mut stack)?;

                let merged = match (left, right) {
                    (XPathValue::NodeSet(mut l), XPathValue::NodeSet(r)) => {
                        l.extend(r);
                        ctx.doc.sort_document_order(&mut l);
                        XPathValue::NodeSet(l)
                    }
                    (XPathValue::StringList(mut l), XPathValue::StringList(r)) => {
                        l.extend(r);
                        XPathValue::StringList(l)
                    }
                    (XPathValue::NodeSet(n), list @ XPathValue::StringList(_))
                    | (list @ XPathValue::StringList(_), XPathValue::NodeSet(n))
                        if n.is_empty() =>
                    {
                        list
                    }
                    _ => return Err("Union requires two node-sets".to_string()),
                };
                stack.push(merged);
            }

            Op::Number(n) => {
                stack.push(XPathValue::Number(*n));
            }

            Op::String(s) => {
                stack.push(XPathValue::String(s.clone()));
            }

            Op::Negate => {
                let val = pop(&mut stack)?;
                stack.push(XPathValue::Number(-number_of(ctx.doc, &val)));
            }

            Op::Binary(op) => {
                let right = pop(&mut stack)?;
                let left = pop(&mut stack)?;

                let result = match op {
                    BinaryOp::Or => XPathValue::Boolean(left.to_boolean() || right.to_boolean()),
                    BinaryOp::And => XPathValue::Boolean(left.to_boolean() && right.to_boolean()),
                    BinaryOp::Eq
                    | BinaryOp::NotEq
                    | BinaryOp::Lt
                    | BinaryOp::LtEq
                    | BinaryOp::Gt
                    | BinaryOp::GtEq => XPathValue::Boolean(compare_values(ctx.doc, *op, &left, &right)),
                    _ => {
                        let (l, r) = (number_of(ctx.doc, &left), number_of(ctx.doc, &right));
                        XPathValue::Number(match op {
                            BinaryOp::Add => l + r,
                            BinaryOp::Sub => l - r,
                            BinaryOp::Mul => l * r,
                            BinaryOp::Div => l / r,
                            _ => l % r,
                        })
                    }
                };

                stack.push(result);
            }

            Op::Call(name, arg_count) => {
                if stack.len() < *arg_count {
                    return Err(format!("Missing arguments for {}()", name));
                }
                let args = stack.split_off(stack.len() - arg_count);

                let result = functions::call(
                    name,
                    args,
                    ctx.doc,
                    ctx.context_node,
                    ctx.context_position,
                    ctx.context_size,
                )?;

                stack.push(result);
            }
        }
    }

    Ok(stack.pop().unwrap_or_default())
}

fn pop(stack: &mut Vec<XPathValue>) -> Result<XPathValue, String> {
    stack
        .pop()
        .ok_or_else(|| "Malformed expression: operand missing".to_string())
}

/// Keep the nodes for which `predicate` holds. A numeric result selects by
/// position; positions follow the order of `nodes`.
fn filter_nodes<D: DocumentAccess + ?Sized>(
    predicate: &CompiledExpr,
    nodes: Vec<NodeId>,
    ctx: &EvalContext<'_, D>,
) -> Result<Vec<NodeId>, String> {
    let size = nodes.len();
    let mut kept = Vec::with_capacity(size);

    for (i, node) in nodes.into_iter().enumerate() {
        let include = match evaluate_compiled(predicate, &ctx.at(node, i + 1, size))? {
            XPathValue::Number(n) => (i + 1) as f64 == n,
            other => other.to_boolean(),
        };
        if include {
            kept.push(node);
        }
    }

    Ok(kept)
}

/// number() with document access for node-sets
fn number_of<D: DocumentAccess + ?Sized>(doc: &D, value: &XPathValue) -> f64 {
    match value {
        XPathValue::NodeSet(nodes) => nodes
            .first()
            .map_or(f64::NAN, |&n| parse_number(&node_string_value(doc, n))),
        other => other.to_number(),
    }
}

/// Members of a node-set or attribute list as strings; `None` for scalars
fn set_members<D: DocumentAccess + ?Sized>(doc: &D, value: &XPathValue) -> Option<Vec<String>> {
    match value {
        XPathValue::NodeSet(nodes) => Some(nodes.iter().map(|&n| node_string_value(doc, n)).collect()),
        XPathValue::StringList(values) => Some(values.clone()),
        _ => None,
    }
}

/// XPath 1.0 comparison. Sets compare member-wise (true if any member
/// satisfies the comparison), except against a boolean where the set is
/// converted with boolean().
fn compare_values<D: DocumentAccess + ?Sized>(
    doc: &D,
    op: BinaryOp,
    left: &XPathValue,
    right: &XPathValue,
) -> bool {
    match (set_members(doc, left), set_members(doc, right)) {
        (Some(l), Some(r)) => l.iter().any(|a| {
            r.iter().any(|b| {
                compare_scalars(
                    op,
                    &XPathValue::String(a.clone()),
                    &XPathValue::String(b.clone()),
                )
            })
        }),
        (Some(l), None) => match right {
            XPathValue::Boolean(_) => compare_scalars(op, &XPathValue::Boolean(!l.is_empty()), right),
            _ => l.into_iter().any(|a| compare_scalars(op, &XPathValue::String(a), right)),
        },
        (None, Some(r)) => match left {
            XPathValue::Boolean(_) => compare_scalars(op, left, &XPathValue::Boolean(!r.is_empty())),
            _ => r.into_iter().any(|b| compare_scalars(op, left, &XPathValue::String(b))),
        },
        (None, None) => compare_scalars(op, left, right),
    }
}

/// Compare two non-set values
fn compare_scalars(op: BinaryOp, left: &XPathValue, right: &XPathValue) -> bool {
    let is_bool = |v: &XPathValue| matches!(v, XPathValue::Boolean(_));
    let is_number = |v: &XPathValue| matches!(v, XPathValue::Number(_));

    match op {
        BinaryOp::Eq | BinaryOp::NotEq => {
            let equal = if is_bool(left) || is_bool(right) {
                left.to_boolean() == right.to_boolean()
            } else if is_number(left) || is_number(right) {
                left.to_number() == right.to_number()
            } else {
                left.to_string_value() == right.to_string_value()
            };
            if op == BinaryOp::Eq {
                equal
            } else {
                !equal
            }
        }
        BinaryOp::Lt => left.to_number() < right.to_number(),
        BinaryOp::LtEq => left.to_number() <= right.to_number(),
        BinaryOp::Gt => left.to_number() > right.to_number(),
        BinaryOp::GtEq => left.to_number() >= right.to_number(),
        _ => false,
    }
}
