//! String interning pool
//!
//! Deduplicated storage for tag names, attribute names/values and text
//! content. A snapshot of a real page repeats the same handful of tag and
//! class names thousands of times; interning keeps the arena small and
//! makes name comparison an id comparison.
//!
//! Uses hash-based lookup to avoid storing duplicate string data.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// String interning pool
///
/// Memory layout:
/// - `spans`: (offset, len) into `data` for each interned string id
/// - `data`: one contiguous buffer holding every unique string
/// - `hash_index`: hash -> list of ids (handles rare collisions)
#[derive(Debug, Default)]
pub struct StringPool {
    /// (offset, len) spans indexed by string id
    spans: Vec<(u32, u32)>,
    /// Buffer holding all unique string bytes
    data: String,
    /// Hash of string content -> ids with that hash
    hash_index: HashMap<u64, Vec<u32>>,
}

impl StringPool {
    /// Create a new empty string pool
    pub fn new() -> Self {
        let mut pool = StringPool {
            spans: Vec::with_capacity(256),
            data: String::with_capacity(4096),
            hash_index: HashMap::new(),
        };
        // Id 0 is reserved for the empty string
        pool.spans.push((0, 0));
        pool
    }

    #[inline]
    fn compute_hash(s: &str) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        let mut hasher = DefaultHasher::new();
        s.hash(&mut hasher);
        hasher.finish()
    }

    /// Intern a string, returning its id. Repeated calls with equal
    /// content return the same id.
    pub fn intern(&mut self, s: &str) -> u32 {
        if s.is_empty() {
            return 0;
        }

        let hash = Self::compute_hash(s);

        if let Some(ids) = self.hash_index.get(&hash) {
            for &id in ids {
                if self.get(id) == Some(s) {
                    return id;
                }
            }
        }

        let offset = self.data.len() as u32;
        self.data.push_str(s);

        let id = self.spans.len() as u32;
        self.spans.push((offset, s.len() as u32));
        self.hash_index.entry(hash).or_default().push(id);

        id
    }

    /// Get a string by id
    pub fn get(&self, id: u32) -> Option<&str> {
        let (offset, len) = *self.spans.get(id as usize)?;
        self.data.get(offset as usize..(offset + len) as usize)
    }

    /// Number of unique strings stored (including the reserved empty
    /// string)
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Check if the pool holds no interned strings
    pub fn is_empty(&self) -> bool {
        self.spans.len() <= 1
    }
}
