//! String Interning Pool
//!
//! Deduplicated storage for element names, attribute names, prefixes and
//! namespace URIs. Node content (text, attribute values) is stored on the
//! nodes themselves since it is edited in place while patching.
//!
//! Uses hash-based lookup to avoid storing duplicate string data.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// String interning pool
///
/// Memory layout:
/// - `entries`: (offset, length) into `data` for each interned string ID
/// - `data`: one buffer holding every interned string back to back
/// - `hash_index`: hash -> list of IDs (handles rare collisions)
///
/// ID 0 is always the empty string.
#[derive(Debug, Clone)]
pub struct StringPool {
    entries: Vec<(u32, u32)>,
    data: String,
    hash_index: HashMap<u64, Vec<u32>>,
}

impl Default for StringPool {
    fn default() -> Self {
        Self::new()
    }
}

impl StringPool {
    pub fn new() -> Self {
        let mut pool = StringPool {
            entries: Vec::with_capacity(64),
            data: String::with_capacity(1024),
            hash_index: HashMap::new(),
        };
        pool.entries.push((0, 0));
        pool
    }

    #[inline]
    fn compute_hash(s: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        s.hash(&mut hasher);
        hasher.finish()
    }

    /// Intern a string, returning the ID of an existing copy when present
    pub fn intern(&mut self, s: &str) -> u32 {
        if s.is_empty() {
            return 0;
        }
        if let Some(id) = self.lookup(s) {
            return id;
        }

        let id = self.entries.len() as u32;
        self.entries.push((self.data.len() as u32, s.len() as u32));
        self.data.push_str(s);
        self.hash_index.entry(Self::compute_hash(s)).or_default().push(id);
        id
    }

    /// Find the ID of an already interned string without inserting it
    pub fn lookup(&self, s: &str) -> Option<u32> {
        if s.is_empty() {
            return Some(0);
        }
        self.hash_index
            .get(&Self::compute_hash(s))?
            .iter()
            .copied()
            .find(|&id| self.get(id) == s)
    }

    /// Resolve an ID; unknown IDs resolve to the empty string
    #[inline]
    pub fn get(&self, id: u32) -> &str {
        match self.entries.get(id as usize) {
            Some(&(offset, len)) => {
                let start = offset as usize;
                self.data.get(start..start + len as usize).unwrap_or("")
            }
            None => "",
        }
    }

    /// `None` for ID 0, the string otherwise
    #[inline]
    pub fn get_opt(&self, id: u32) -> Option<&str> {
        if id == 0 {
            None
        } else {
            Some(self.get(id))
        }
    }

    /// Number of distinct strings, the reserved empty entry included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_and_get() {
        let mut pool = StringPool::new();
        let id = pool.intern("settings");
        assert!(id > 0);
        assert_eq!(pool.get(id), "settings");
    }

    #[test]
    fn test_intern_duplicate() {
        let mut pool = StringPool::new();
        let id1 = pool.intern("node");
        let id2 = pool.intern("node");
        assert_eq!(id1, id2);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_intern_different() {
        let mut pool = StringPool::new();
        assert_ne!(pool.intern("hello"), pool.intern("world"));
    }

    #[test]
    fn test_empty_string() {
        let mut pool = StringPool::new();
        assert_eq!(pool.intern(""), 0);
        assert_eq!(pool.get(0), "");
        assert_eq!(pool.get_opt(0), None);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_lookup_does_not_insert() {
        let mut pool = StringPool::new();
        pool.intern("a");
        assert_eq!(pool.lookup("b"), None);
        assert_eq!(pool.len(), 2);
    }
}
