//! Compiled-expression cache.
//!
//! Unbounded mode memoizes every distinct source text in a concurrent map and
//! only forgets entries on an explicit clear. Bounded mode keeps the most
//! recently used entries in an LRU.

use dashmap::DashMap;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use super::CompiledExpression;
use crate::error::EvalResult;

pub(crate) enum ExpressionCache {
    Disabled,
    Unbounded(DashMap<String, Arc<CompiledExpression>>),
    Bounded(Mutex<LruCache<String, Arc<CompiledExpression>>>),
}

impl ExpressionCache {
    pub(crate) fn new(enabled: bool, capacity: Option<usize>) -> Self {
        match (enabled, capacity.and_then(NonZeroUsize::new)) {
            (false, _) => ExpressionCache::Disabled,
            (true, Some(capacity)) => ExpressionCache::Bounded(Mutex::new(LruCache::new(capacity))),
            (true, None) => ExpressionCache::Unbounded(DashMap::new()),
        }
    }

    /// Returns the cached compiled form of `source`, compiling it on a miss.
    ///
    /// Compilation failures are not cached.
    pub(crate) fn get_or_compile(
        &self,
        source: &str,
        compile: impl FnOnce(&str) -> EvalResult<CompiledExpression>,
    ) -> EvalResult<Arc<CompiledExpression>> {
        match self {
            ExpressionCache::Disabled => compile(source).map(Arc::new),
            ExpressionCache::Unbounded(map) => {
                if let Some(hit) = map.get(source) {
                    return Ok(Arc::clone(hit.value()));
                }
                let compiled = Arc::new(compile(source)?);
                Ok(Arc::clone(
                    map.entry(source.to_string()).or_insert(compiled).value(),
                ))
            }
            ExpressionCache::Bounded(lru) => {
                if let Some(hit) = lock(lru).get(source) {
                    return Ok(Arc::clone(hit));
                }
                // Compile outside the lock.
                let compiled = Arc::new(compile(source)?);
                lock(lru).put(source.to_string(), Arc::clone(&compiled));
                Ok(compiled)
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            ExpressionCache::Disabled => 0,
            ExpressionCache::Unbounded(map) => map.len(),
            ExpressionCache::Bounded(lru) => lock(lru).len(),
        }
    }

    pub(crate) fn clear(&self) -> usize {
        let dropped = self.len();
        match self {
            ExpressionCache::Disabled => {}
            ExpressionCache::Unbounded(map) => map.clear(),
            ExpressionCache::Bounded(lru) => lock(lru).clear(),
        }
        dropped
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
