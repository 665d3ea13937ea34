use crate::ast::CompiledPath;
use crate::error::Error;
use crate::parser;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Entries the process-wide cache holds before it stops admitting new paths.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Hit and miss counters of a [`PathCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Bounded map from path text to its compiled form, safe to share across
/// threads. Once full, newly compiled paths are returned without being
/// stored; nothing is evicted.
pub struct PathCache {
    entries: DashMap<(String, bool), Arc<CompiledPath>>,
    capacity: usize,
    reserved: AtomicUsize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PathCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity,
            reserved: AtomicUsize::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Compile with null values dropped from mapped sequences.
    pub fn compile(&self, text: &str) -> Result<Arc<CompiledPath>, Error> {
        self.compile_with(text, true)
    }

    /// Look the path up, compiling and storing it on a miss.
    pub fn compile_with(&self, text: &str, ignore_null_value: bool) -> Result<Arc<CompiledPath>, Error> {
        let key = (text.to_string(), ignore_null_value);
        if let Some(hit) = self.entries.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(hit.value()));
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let compiled = Arc::new(parser::parse(text, ignore_null_value)?);
        trace!(path = text, segments = compiled.segments().len(), "compiled path");

        let reserved = self
            .reserved
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.capacity).then_some(n + 1)
            })
            .is_ok();
        if !reserved {
            debug!(path = text, capacity = self.capacity, "path cache full, not caching");
            return Ok(compiled);
        }

        let mut inserted = false;
        let stored = Arc::clone(
            self.entries
                .entry(key)
                .or_insert_with(|| {
                    inserted = true;
                    Arc::clone(&compiled)
                })
                .value(),
        );
        // Another thread stored the same path first.
        if !inserted {
            self.reserved.fetch_sub(1, Ordering::AcqRel);
        }
        Ok(stored)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every entry and reset the counters.
    pub fn clear(&self) {
        self.entries.clear();
        self.reserved.store(0, Ordering::Release);
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for PathCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

lazy_static::lazy_static! {
    pub static ref GLOBAL_CACHE: PathCache = PathCache::default();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_compiles_share_one_entry() {
        let cache = PathCache::new(4);
        let a = cache.compile("$.a.b").unwrap();
        let b = cache.compile("$.a.b").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.stats(), CacheStats { entries: 1, hits: 1, misses: 1 });
    }

    #[test]
    fn options_are_part_of_the_key() {
        let cache = PathCache::new(4);
        let dropping = cache.compile_with("$.a", true).unwrap();
        let keeping = cache.compile_with("$.a", false).unwrap();
        assert!(dropping.ignore_null_value());
        assert!(!keeping.ignore_null_value());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn full_cache_still_compiles() {
        let cache = PathCache::new(1);
        cache.compile("$.a").unwrap();
        let b = cache.compile("$.b").unwrap();
        assert_eq!(b.text(), "$.b");
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
        cache.compile("$.b").unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn syntax_errors_are_not_cached() {
        let cache = PathCache::new(4);
        assert!(cache.compile("$.a b").is_err());
        assert!(cache.is_empty());
    }
}
