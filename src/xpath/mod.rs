//! XPath 1.0 Engine
//!
//! XPath 1.0 over the arena DOM:
//! - All axes except namespace::
//! - Core function library
//! - Namespace-aware name tests with caller-supplied prefix bindings
//! - Compiled expression caching

pub mod axes;
pub mod cache;
pub mod compiler;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod value;

use std::collections::HashMap;

/// Prefix to namespace URI bindings used by qualified name tests
pub type NamespaceMap = HashMap<String, String>;

pub use cache::XPathCache;
pub use compiler::{compile, CompiledExpr};
pub use eval::{evaluate, evaluate_compiled, evaluate_from_node, EvalContext};
pub use value::XPathValue;
