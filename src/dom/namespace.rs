//! Namespace Resolution
//!
//! Stack-based prefix resolver used while building a document. After the
//! document exists, prefixes are resolved by walking ancestor declarations
//! (see `XmlDocument::lookup_namespace_uri`).

use super::strings::StringPool;

/// Well-known namespace URIs
pub mod ns {
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
}

/// Namespace binding (prefix -> URI); prefix 0 is the default namespace
#[derive(Debug, Clone)]
struct NsBinding {
    prefix_id: u32,
    uri_id: u32,
    depth: u16,
}

/// Stack-based namespace resolver
#[derive(Debug)]
pub struct NamespaceResolver {
    bindings: Vec<NsBinding>,
    depth: u16,
    xml_prefix_id: u32,
    xmlns_prefix_id: u32,
}

impl NamespaceResolver {
    /// Create a resolver with the xml and xmlns prefixes pre-bound
    pub fn new(strings: &mut StringPool) -> Self {
        let xml_prefix_id = strings.intern("xml");
        let xmlns_prefix_id = strings.intern("xmlns");
        let bindings = vec![
            NsBinding {
                prefix_id: xml_prefix_id,
                uri_id: strings.intern(ns::XML),
                depth: 0,
            },
            NsBinding {
                prefix_id: xmlns_prefix_id,
                uri_id: strings.intern(ns::XMLNS),
                depth: 0,
            },
        ];

        NamespaceResolver {
            bindings,
            depth: 0,
            xml_prefix_id,
            xmlns_prefix_id,
        }
    }

    /// Enter a new element scope
    pub fn push_scope(&mut self) {
        self.depth += 1;
    }

    /// Leave an element scope, removing any bindings declared in it
    pub fn pop_scope(&mut self) {
        while self.bindings.last().is_some_and(|b| b.depth >= self.depth && b.depth > 0) {
            self.bindings.pop();
        }
        self.depth = self.depth.saturating_sub(1);
    }

    /// Declare a binding for the current scope; returns false for reserved prefixes
    pub fn declare(&mut self, prefix_id: u32, uri_id: u32) -> bool {
        if prefix_id == self.xml_prefix_id || prefix_id == self.xmlns_prefix_id {
            return false;
        }
        self.bindings.push(NsBinding {
            prefix_id,
            uri_id,
            depth: self.depth,
        });
        true
    }

    /// Declare the default namespace for the current scope (`xmlns=""` undeclares it)
    pub fn declare_default(&mut self, uri_id: u32) {
        self.declare(0, uri_id);
    }

    /// Resolve a prefix to a namespace URI ID
    pub fn resolve(&self, prefix_id: u32) -> Option<u32> {
        self.bindings
            .iter()
            .rev()
            .find(|b| b.prefix_id == prefix_id)
            .map(|b| b.uri_id)
            .filter(|&uri| uri != 0)
    }

    /// Resolve the default namespace
    pub fn resolve_default(&self) -> Option<u32> {
        self.resolve(0)
    }

    pub fn depth(&self) -> u16 {
        self.depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_namespaces() {
        let mut strings = StringPool::new();
        let resolver = NamespaceResolver::new(&mut strings);
        let xml_id = strings.intern("xml");
        let uri = resolver.resolve(xml_id).map(|id| strings.get(id).to_string());
        assert_eq!(uri.as_deref(), Some(ns::XML));
    }

    #[test]
    fn test_scope_pop() {
        let mut strings = StringPool::new();
        let mut resolver = NamespaceResolver::new(&mut strings);
        let prefix = strings.intern("patch");
        let uri = strings.intern("http://schemas.xmlpatch");

        resolver.push_scope();
        assert!(resolver.declare(prefix, uri));
        assert_eq!(resolver.resolve(prefix), Some(uri));

        resolver.pop_scope();
        assert_eq!(resolver.resolve(prefix), None);
        assert_eq!(resolver.depth(), 0);
    }

    #[test]
    fn test_shadow_binding() {
        let mut strings = StringPool::new();
        let mut resolver = NamespaceResolver::new(&mut strings);
        let prefix = strings.intern("ns");
        let uri1 = strings.intern("http://example.com/ns1");
        let uri2 = strings.intern("http://example.com/ns2");

        resolver.push_scope();
        resolver.declare(prefix, uri1);
        resolver.push_scope();
        resolver.declare(prefix, uri2);
        assert_eq!(resolver.resolve(prefix), Some(uri2));
        resolver.pop_scope();
        assert_eq!(resolver.resolve(prefix), Some(uri1));
    }

    #[test]
    fn test_default_undeclared() {
        let mut strings = StringPool::new();
        let mut resolver = NamespaceResolver::new(&mut strings);
        let uri = strings.intern("urn:a");

        resolver.push_scope();
        resolver.declare_default(uri);
        resolver.push_scope();
        resolver.declare_default(0);
        assert_eq!(resolver.resolve_default(), None);
        resolver.pop_scope();
        assert_eq!(resolver.resolve_default(), Some(uri));
    }

    #[test]
    fn test_reserved_prefix_rejected() {
        let mut strings = StringPool::new();
        let mut resolver = NamespaceResolver::new(&mut strings);
        let xmlns = strings.intern("xmlns");
        let other = strings.intern("urn:other");
        assert!(!resolver.declare(xmlns, other));
    }
}
