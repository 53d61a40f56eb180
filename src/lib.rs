//! xmlpatch - merge patch documents into XML documents in place
//!
//! A patch document mirrors the shape of the source it edits. Each patch
//! element is matched against the source by name (or by an explicit XPath
//! expression), then merged into its match, created when nothing matches,
//! or removed. Directives ride on reserved namespaces:
//!
//! - `http://schemas.xmlpatch`: `action`, `find` and `create` attributes
//! - `http://schemas.xmlpatch/mod/node/<Action>`: the element's own namespace selects the action
//! - `http://schemas.xmlpatch/mod/attr/key`: attributes that identify the source match
//!
//! Layers:
//! - core/reader: zero-copy tokenizer and pull reader
//! - dom: arena document with editing and serialization
//! - xpath: XPath 1.0 evaluation with compiled expression caching
//! - patch: the patch engine

pub mod core;
pub mod dom;
pub mod error;
pub mod patch;
pub mod reader;
pub mod xpath;

#[cfg(feature = "nif")]
mod nif;

pub use dom::{ParseOptions, WriteOptions, XmlDocument};
pub use error::{DirectiveKind, DomError, PatchError};
pub use patch::{
    list_all_elements, patch, patch_file_in_place, patch_files, patch_parallel, patch_str, patch_subtree,
    FileOptions, PatchOptions, PatchReport, Patcher,
};
