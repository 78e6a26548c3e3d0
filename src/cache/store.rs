//! Preprocessor cache
//!
//! A process-wide map of value-cleared preprocessors keyed by namespace,
//! operation, and structural signature. Entries accumulate for the process
//! lifetime: there is no eviction, a deliberate latency-over-memory
//! tradeoff. The set of collections and call shapes has bounded, known
//! cardinality in practice.
//!
//! Concurrent calls racing on the same missing signature may both perform a
//! full analysis; the last insert wins. Both entries are structurally
//! equivalent (a deterministic function of the schema table and the call
//! shape), so no locking is needed beyond the atomicity of the map insert.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::preprocess::{Operation, Preprocessor};

/// Cache key: namespace, operation, and structural signature
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// `<connection>.<database>.<collection>`
    pub namespace: String,
    /// Operation name
    pub operation: Operation,
    /// Structural signature of the call arguments
    pub signature: String,
}

impl CacheKey {
    /// Builds a key from its parts.
    pub fn new(namespace: impl Into<String>, operation: Operation, signature: String) -> Self {
        Self {
            namespace: namespace.into(),
            operation,
            signature,
        }
    }
}

/// Process-wide preprocessor cache
#[derive(Debug, Default)]
pub struct PreprocessorCache {
    entries: RwLock<HashMap<CacheKey, Preprocessor>>,
}

impl PreprocessorCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a clone of the cached preprocessor for a key, if any.
    pub fn get(&self, key: &CacheKey) -> Option<Preprocessor> {
        self.entries
            .read()
            .expect("cache lock poisoned")
            .get(key)
            .cloned()
    }

    /// Stores a value-cleared preprocessor. Racing inserts overwrite.
    pub fn insert(&self, key: CacheKey, preprocessor: Preprocessor) {
        self.entries
            .write()
            .expect("cache lock poisoned")
            .insert(key, preprocessor);
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.read().expect("cache lock poisoned").len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
