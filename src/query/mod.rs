//! Path-query engine
//!
//! Compiles and evaluates the invariant path-expression language:
//! lexer -> parser -> evaluator, plus an LRU cache of compiled queries.
//! Baseline checks re-evaluate the same expressions on every document,
//! so compiled queries are cached keyed by expression text.

pub mod eval;
pub mod lexer;
pub mod parser;

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;

use crate::dom::{DomAccess, NodeId};
use crate::error::QueryError;

pub use parser::{Axis, NameTest, PathQuery, Predicate, Step};

/// Parse a path expression
pub fn parse(expr: &str) -> Result<PathQuery, QueryError> {
    parser::parse(expr)
}

/// Parse and evaluate a path expression against a document
pub fn evaluate<D: DomAccess + ?Sized>(doc: &D, expr: &str) -> Result<Vec<NodeId>, QueryError> {
    let query = parser::parse(expr)?;
    Ok(eval::evaluate_query(doc, &query))
}

/// Evaluate a path expression, reusing a compiled query from the cache
/// when available
pub fn evaluate_cached<D: DomAccess + ?Sized>(
    doc: &D,
    cache: &QueryCache,
    expr: &str,
) -> Result<Vec<NodeId>, QueryError> {
    let query = cache.get(expr)?;
    Ok(eval::evaluate_query(doc, &query))
}

/// Thread-safe LRU cache of compiled path queries
pub struct QueryCache {
    inner: Mutex<LruCache<String, Arc<PathQuery>>>,
}

impl QueryCache {
    /// Create a cache holding up to `capacity` compiled queries
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        QueryCache {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Get the compiled form of `expr`, parsing and inserting on miss
    pub fn get(&self, expr: &str) -> Result<Arc<PathQuery>, QueryError> {
        let mut cache = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(query) = cache.get(expr) {
            return Ok(Arc::clone(query));
        }
        let query = Arc::new(parser::parse(expr)?);
        cache.put(expr.to_string(), Arc::clone(&query));
        Ok(query)
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache").finish_non_exhaustive()
    }
}
