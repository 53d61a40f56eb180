//! Compiled expression cache
//!
//! Match expressions repeat heavily across a patch run (every patch node
//! with the same name produces the same expression), so compiled programs
//! are kept in a bounded LRU keyed by the expression text.

use super::compiler::{self, CompiledExpr};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

/// Thread-safe LRU cache of compiled XPath expressions
pub struct XPathCache {
    inner: Option<Mutex<LruCache<String, Arc<CompiledExpr>>>>,
}

impl XPathCache {
    /// A cache holding up to `capacity` expressions; 0 disables caching
    pub fn new(capacity: usize) -> Self {
        XPathCache {
            inner: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    /// Return the compiled form of `expr`, compiling it on a miss
    pub fn get_or_compile(&self, expr: &str) -> Result<Arc<CompiledExpr>, String> {
        let Some(inner) = &self.inner else {
            return compiler::compile(expr).map(Arc::new);
        };

        // A poisoned lock only means another thread panicked mid-insert
        if let Some(hit) = inner.lock().unwrap_or_else(|e| e.into_inner()).get(expr) {
            return Ok(Arc::clone(hit));
        }

        let compiled = Arc::new(compiler::compile(expr)?);
        inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .put(expr.to_string(), Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Number of cached expressions
    pub fn len(&self) -> usize {
        self.inner
            .as_ref()
            .map_or(0, |m| m.lock().unwrap_or_else(|e| e.into_inner()).len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for XPathCache {
    fn default() -> Self {
        XPathCache::new(256)
    }
}

impl std::fmt::Debug for XPathCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XPathCache").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_returns_same_program() {
        let cache = XPathCache::new(4);
        let first = cache.get_or_compile("//a[@k='1']").unwrap();
        let second = cache.get_or_compile("//a[@k='1']").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_eviction() {
        let cache = XPathCache::new(2);
        for expr in ["a", "b", "c"] {
            cache.get_or_compile(expr).unwrap();
        }
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_disabled_cache() {
        let cache = XPathCache::new(0);
        cache.get_or_compile("a").unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_errors_not_cached() {
        let cache = XPathCache::new(4);
        assert!(cache.get_or_compile("a[").is_err());
        assert!(cache.is_empty());
    }
}
