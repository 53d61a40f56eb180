//! XPath 1.0 core function library
//!
//! Node-set: last, position, count, local-name, namespace-uri, name.
//! String: string, concat, starts-with, contains, substring,
//! substring-before, substring-after, string-length, normalize-space, translate.
//! Boolean: boolean, not, true, false, lang.
//! Number: number, sum, floor, ceiling, round.
//!
//! `id()` is rejected since documents are never DTD-validated.

use super::value::{parse_number, XPathValue};
use crate::dom::{self, namespace::ns, DocumentAccess, NodeId};
use std::ops::RangeInclusive;

/// Evaluated arguments of one call, with the document for node-set conversions
struct Args<'a, D: ?Sized> {
    name: &'a str,
    values: Vec<XPathValue>,
    doc: &'a D,
    context: NodeId,
}

impl<D: DocumentAccess + ?Sized> Args<'_, D> {
    fn arity(&self, allowed: RangeInclusive<usize>) -> Result<(), String> {
        if allowed.contains(&self.values.len()) {
            return Ok(());
        }
        let expected = match (*allowed.start(), *allowed.end()) {
            (lo, hi) if lo == hi => format!("exactly {}", lo),
            (lo, usize::MAX) => format!("at least {}", lo),
            (lo, hi) => format!("{} to {}", lo, hi),
        };
        Err(format!(
            "{}() takes {} argument(s), got {}",
            self.name,
            expected,
            self.values.len()
        ))
    }

    fn string(&self, index: usize) -> String {
        match &self.values[index] {
            XPathValue::NodeSet(nodes) => nodes
                .first()
                .map(|&n| dom::node_string_value(self.doc, n))
                .unwrap_or_default(),
            other => other.to_string_value(),
        }
    }

    /// Argument `index` as a string, or the context node's string-value when absent
    fn string_or_context(&self, index: usize) -> String {
        if index < self.values.len() {
            self.string(index)
        } else {
            dom::node_string_value(self.doc, self.context)
        }
    }

    fn number(&self, index: usize) -> f64 {
        match &self.values[index] {
            XPathValue::NodeSet(_) => parse_number(&self.string(index)),
            other => other.to_number(),
        }
    }

    /// First node of a node-set argument, or the context node when absent.
    /// `None` for an empty node-set.
    fn node_or_context(&self, index: usize) -> Result<Option<NodeId>, String> {
        match self.values.get(index) {
            None => Ok(Some(self.context)),
            Some(XPathValue::NodeSet(nodes)) => Ok(nodes.first().copied()),
            Some(_) => Err(format!("{}() argument must be a node-set", self.name)),
        }
    }

    fn node_name(&self, name_of: impl Fn(&D, NodeId) -> Option<&str>) -> Result<XPathValue, String> {
        self.arity(0..=1)?;
        let value = self
            .node_or_context(0)?
            .and_then(|node| name_of(self.doc, node))
            .unwrap_or_default();
        Ok(value.into())
    }
}

/// Evaluate a function call
pub fn call<D: DocumentAccess + ?Sized>(
    name: &str,
    args: Vec<XPathValue>,
    doc: &D,
    context: NodeId,
    position: usize,
    size: usize,
) -> Result<XPathValue, String> {
    let args = Args {
        name,
        values: args,
        doc,
        context,
    };

    let value: XPathValue = match name {
        "last" => {
            args.arity(0..=0)?;
            (size as f64).into()
        }
        "position" => {
            args.arity(0..=0)?;
            (position as f64).into()
        }
        "count" => {
            args.arity(1..=1)?;
            match &args.values[0] {
                XPathValue::NodeSet(nodes) => (nodes.len() as f64).into(),
                XPathValue::StringList(values) => (values.len() as f64).into(),
                _ => return Err("count() argument must be a node-set".to_string()),
            }
        }
        "local-name" => return args.node_name(|d, n| d.node_local_name(n)),
        "namespace-uri" => return args.node_name(|d, n| d.node_namespace_uri(n)),
        "name" => return args.node_name(|d, n| d.node_name(n)),
        "id" => return Err("id() is not supported without DTD processing".to_string()),

        "string" => {
            args.arity(0..=1)?;
            args.string_or_context(0).into()
        }
        "concat" => {
            args.arity(2..=usize::MAX)?;
            (0..args.values.len()).map(|i| args.string(i)).collect::<String>().into()
        }
        "starts-with" => {
            args.arity(2..=2)?;
            args.string(0).starts_with(&args.string(1)).into()
        }
        "contains" => {
            args.arity(2..=2)?;
            args.string(0).contains(&args.string(1)).into()
        }
        "substring" => {
            args.arity(2..=3)?;
            let length = (args.values.len() == 3).then(|| args.number(2));
            substring(&args.string(0), args.number(1), length).into()
        }
        "substring-before" => {
            args.arity(2..=2)?;
            let (s, pattern) = (args.string(0), args.string(1));
            s.find(&pattern).map(|i| &s[..i]).unwrap_or_default().into()
        }
        "substring-after" => {
            args.arity(2..=2)?;
            let (s, pattern) = (args.string(0), args.string(1));
            s.find(&pattern)
                .map(|i| &s[i + pattern.len()..])
                .unwrap_or_default()
                .into()
        }
        "string-length" => {
            args.arity(0..=1)?;
            (args.string_or_context(0).chars().count() as f64).into()
        }
        "normalize-space" => {
            args.arity(0..=1)?;
            args.string_or_context(0)
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .into()
        }
        "translate" => {
            args.arity(3..=3)?;
            translate(&args.string(0), &args.string(1), &args.string(2)).into()
        }

        "boolean" => {
            args.arity(1..=1)?;
            args.values[0].to_boolean().into()
        }
        "not" => {
            args.arity(1..=1)?;
            (!args.values[0].to_boolean()).into()
        }
        "true" | "false" => {
            args.arity(0..=0)?;
            (name == "true").into()
        }
        "lang" => {
            args.arity(1..=1)?;
            lang(doc, context, &args.string(0)).into()
        }

        "number" => {
            args.arity(0..=1)?;
            if args.values.is_empty() {
                parse_number(&dom::node_string_value(doc, context)).into()
            } else {
                args.number(0).into()
            }
        }
        "sum" => {
            args.arity(1..=1)?;
            match &args.values[0] {
                XPathValue::NodeSet(nodes) => nodes
                    .iter()
                    .map(|&n| parse_number(&dom::node_string_value(doc, n)))
                    .sum::<f64>()
                    .into(),
                XPathValue::StringList(values) => values.iter().map(|v| parse_number(v)).sum::<f64>().into(),
                _ => return Err("sum() argument must be a node-set".to_string()),
            }
        }
        "floor" | "ceiling" | "round" => {
            args.arity(1..=1)?;
            let n = args.number(0);
            let rounded = match name {
                "floor" => n.floor(),
                "ceiling" => n.ceil(),
                _ => round(n),
            };
            rounded.into()
        }

        _ => return Err(format!("Unknown function: {}", name)),
    };
    Ok(value)
}

/// Halves round towards positive infinity
fn round(n: f64) -> f64 {
    if !n.is_finite() || n.fract() == 0.0 {
        n
    } else if (-0.5..0.0).contains(&n) {
        -0.0
    } else {
        (n + 0.5).floor()
    }
}

/// Characters at 1-based positions p with round(start) <= p < round(start) + round(length)
fn substring(s: &str, start: f64, length: Option<f64>) -> String {
    let first = round(start);
    let end = length.map_or(f64::INFINITY, |len| first + round(len));
    s.chars()
        .enumerate()
        .filter(|&(i, _)| {
            let p = (i + 1) as f64;
            p >= first && p < end
        })
        .map(|(_, c)| c)
        .collect()
}

fn translate(s: &str, from: &str, to: &str) -> String {
    let from: Vec<char> = from.chars().collect();
    let to: Vec<char> = to.chars().collect();
    s.chars()
        .filter_map(|c| match from.iter().position(|&f| f == c) {
            Some(i) => to.get(i).copied(),
            None => Some(c),
        })
        .collect()
}

/// Nearest `xml:lang` on the context node or an ancestor matches `target`
/// exactly or as a subtag prefix, ignoring case
fn lang<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId, target: &str) -> bool {
    let declared = std::iter::successors(Some(context), |&n| doc.parent_of(n)).find_map(|node| {
        let strings = doc.strings();
        doc.attributes(node)
            .iter()
            .find(|a| strings.get(a.namespace_id) == ns::XML && strings.get(a.local_id) == "lang")
            .map(|a| a.value.to_lowercase())
    });
    let target = target.to_lowercase();
    declared.is_some_and(|lang| {
        lang == target || lang.strip_prefix(target.as_str()).is_some_and(|rest| rest.starts_with('-'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDocument;

    fn eval(doc: &XmlDocument, name: &str, args: Vec<XPathValue>) -> XPathValue {
        let root = doc.root_element_id().unwrap();
        call(name, args, doc, root, 1, 1).unwrap()
    }

    fn strings(values: &[&str]) -> Vec<XPathValue> {
        values.iter().map(|&s| XPathValue::from(s)).collect()
    }

    #[test]
    fn test_string_functions() {
        let doc = XmlDocument::parse_str("<r/>").unwrap();
        assert_eq!(eval(&doc, "concat", strings(&["hello", " ", "world"])), "hello world".into());
        assert_eq!(eval(&doc, "contains", strings(&["hello world", "world"])), true.into());
        assert_eq!(eval(&doc, "starts-with", strings(&["hello", "he"])), true.into());
        assert_eq!(eval(&doc, "substring-before", strings(&["1999/04/01", "/"])), "1999".into());
        assert_eq!(eval(&doc, "substring-after", strings(&["1999/04/01", "/"])), "04/01".into());
        assert_eq!(eval(&doc, "substring-after", strings(&["abc", "x"])), "".into());
        assert_eq!(eval(&doc, "normalize-space", strings(&["  hello   world  "])), "hello world".into());
        assert_eq!(eval(&doc, "translate", strings(&["--aaa--", "abc-", "ABC"])), "AAA".into());
        assert_eq!(eval(&doc, "string-length", strings(&["h\u{e9}llo"])), XPathValue::Number(5.0));
    }

    #[test]
    fn test_substring_rounding() {
        assert_eq!(substring("12345", 2.0, Some(3.0)), "234");
        assert_eq!(substring("12345", 1.5, Some(2.6)), "234");
        assert_eq!(substring("12345", 0.0, Some(3.0)), "12");
        assert_eq!(substring("12345", 2.0, None), "2345");
        assert_eq!(substring("12345", f64::NAN, Some(3.0)), "");
        assert_eq!(substring("12345", -42.0, Some(f64::INFINITY)), "12345");
    }

    #[test]
    fn test_round() {
        assert_eq!(round(2.5), 3.0);
        assert_eq!(round(-2.5), -2.0);
        assert_eq!(round(-0.2), 0.0);
        assert!(round(-0.2).is_sign_negative());
        assert!(round(f64::NAN).is_nan());
    }

    #[test]
    fn test_arity_errors() {
        let doc = XmlDocument::parse_str("<r/>").unwrap();
        let err = call("concat", strings(&["a"]), &doc, 0, 1, 1).unwrap_err();
        assert_eq!(err, "concat() takes at least 2 argument(s), got 1");
        let err = call("not", Vec::new(), &doc, 0, 1, 1).unwrap_err();
        assert_eq!(err, "not() takes exactly 1 argument(s), got 0");
        assert!(call("bogus", Vec::new(), &doc, 0, 1, 1).is_err());
        assert!(call("id", strings(&["x"]), &doc, 0, 1, 1).unwrap_err().contains("not supported"));
    }

    #[test]
    fn test_count_and_sum_accept_attribute_values() {
        let doc = XmlDocument::parse_str("<r/>").unwrap();
        let values = XPathValue::StringList(vec!["1".to_string(), "2.5".to_string()]);
        assert_eq!(eval(&doc, "count", vec![values.clone()]), XPathValue::Number(2.0));
        assert_eq!(eval(&doc, "sum", vec![values]), XPathValue::Number(3.5));
    }

    #[test]
    fn test_node_set_arguments_use_string_value() {
        let doc = XmlDocument::parse_str("<r><n> 42 </n><m>2.6</m></r>").unwrap();
        let root = doc.root_element_id().unwrap();
        let kids: Vec<NodeId> = doc.children(root).collect();
        assert_eq!(eval(&doc, "number", vec![kids[..1].to_vec().into()]), XPathValue::Number(42.0));
        assert_eq!(eval(&doc, "floor", vec![vec![kids[1]].into()]), XPathValue::Number(2.0));
        assert_eq!(eval(&doc, "string", Vec::new()), " 42 2.6".into());
    }

    #[test]
    fn test_name_functions() {
        let doc = XmlDocument::parse_str("<root xmlns:ns=\"http://example.com\"><ns:child/></root>").unwrap();
        let child = doc.children(doc.root_element_id().unwrap()).next().unwrap();
        let set = || vec![XPathValue::NodeSet(vec![child])];
        assert_eq!(eval(&doc, "namespace-uri", set()), "http://example.com".into());
        assert_eq!(eval(&doc, "local-name", set()), "child".into());
        assert_eq!(eval(&doc, "name", set()), "ns:child".into());
        assert_eq!(eval(&doc, "name", vec![XPathValue::empty_nodeset()]), "".into());
        assert_eq!(eval(&doc, "name", Vec::new()), "root".into());
    }

    #[test]
    fn test_lang() {
        let doc = XmlDocument::parse_str("<root xml:lang=\"en-US\"><child/><other xml:lang=\"de\"/></root>").unwrap();
        let kids: Vec<NodeId> = doc.children(doc.root_element_id().unwrap()).collect();
        let lang_of = |node, target: &str| call("lang", strings(&[target]), &doc, node, 1, 1).unwrap();
        assert_eq!(lang_of(kids[0], "en"), true.into());
        assert_eq!(lang_of(kids[0], "EN-us"), true.into());
        assert_eq!(lang_of(kids[0], "e"), false.into());
        assert_eq!(lang_of(kids[1], "en"), false.into());
    }

    #[test]
    fn test_position_and_last() {
        let doc = XmlDocument::parse_str("<r/>").unwrap();
        assert_eq!(call("position", Vec::new(), &doc, 0, 2, 5).unwrap(), XPathValue::Number(2.0));
        assert_eq!(call("last", Vec::new(), &doc, 0, 2, 5).unwrap(), XPathValue::Number(5.0));
    }
}
