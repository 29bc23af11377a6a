//! Correlation id storage and propagation.
//!
//! The interceptor only ever *reads* the current id through a
//! [`TraceIdProvider`]. Establishing an id, and carrying it across thread or
//! task boundaries, is the caller's job; this module offers the helpers for
//! it:
//!
//! - [`TraceScope`] / [`with_trace_id`]: set an id for a region of code and
//!   restore the previous one on every exit path, including panics
//! - [`spawn_inheriting`]: spawn a thread that starts with the spawner's id
//! - [`propagate`] / [`with_task_trace_id`]: carry an id into a future
//!
//! The ambient lookup checks the tokio task-local slot first (set by
//! [`propagate`]) and falls back to the thread-local slot.
//!
//! # Example
//! ```rust,ignore
//! use interlog::context::{TraceId, current_trace_id, with_trace_id};
//!
//! with_trace_id(TraceId::new("req-1"), || {
//!     assert_eq!(current_trace_id().unwrap().as_str(), "req-1");
//! });
//! assert!(current_trace_id().is_none());
//! ```

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::thread::JoinHandle;

/// Correlation id of one logical request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(String);

impl TraceId {
    /// Wraps an externally supplied id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh, time-ordered id (UUID v7 without hyphens).
    ///
    /// Intended for request entry points; the interceptor never calls it.
    pub fn generate() -> Self {
        Self(
            uuid::Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext))
                .simple()
                .to_string(),
        )
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the id, returning the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TraceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for TraceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for TraceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Provider
// =============================================================================

/// Source of the current correlation id.
pub trait TraceIdProvider: Send + Sync {
    /// Returns the id for the current execution context, if one is set.
    fn current(&self) -> Option<TraceId>;

    /// Sets the id for the current execution context.
    fn set(&self, id: TraceId);

    /// Clears the id for the current execution context.
    fn clear(&self);
}

thread_local! {
    static THREAD_TRACE_ID: RefCell<Option<TraceId>> = const { RefCell::new(None) };
}

tokio::task_local! {
    static TASK_TRACE_ID: RefCell<Option<TraceId>>;
}

/// Provider backed by task-local and thread-local storage.
#[derive(Debug, Clone, Copy, Default)]
pub struct AmbientTraceIds;

impl TraceIdProvider for AmbientTraceIds {
    fn current(&self) -> Option<TraceId> {
        TASK_TRACE_ID
            .try_with(|slot| slot.borrow().clone())
            .unwrap_or_else(|_| THREAD_TRACE_ID.with(|slot| slot.borrow().clone()))
    }

    fn set(&self, id: TraceId) {
        let mut id = Some(id);
        let in_task = TASK_TRACE_ID
            .try_with(|slot| *slot.borrow_mut() = id.take())
            .is_ok();
        if !in_task {
            THREAD_TRACE_ID.with(|slot| *slot.borrow_mut() = id);
        }
    }

    fn clear(&self) {
        if TASK_TRACE_ID
            .try_with(|slot| *slot.borrow_mut() = None)
            .is_err()
        {
            THREAD_TRACE_ID.with(|slot| *slot.borrow_mut() = None);
        }
    }
}

/// Returns the ambient correlation id.
pub fn current_trace_id() -> Option<TraceId> {
    AmbientTraceIds.current()
}

// =============================================================================
// Scopes
// =============================================================================

/// Guard that sets an ambient id and restores the previous one on drop.
///
/// The guard is `!Send`, so it is always dropped on the thread it was
/// created on.
#[must_use = "the previous trace id is restored as soon as the scope is dropped"]
#[derive(Debug)]
pub struct TraceScope {
    previous: Option<TraceId>,
    _not_send: PhantomData<*const ()>,
}

impl TraceScope {
    /// Sets `id` as the ambient correlation id until the guard is dropped.
    pub fn enter(id: TraceId) -> Self {
        let previous = AmbientTraceIds.current();
        AmbientTraceIds.set(id);
        Self {
            previous,
            _not_send: PhantomData,
        }
    }
}

impl Drop for TraceScope {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(previous) => AmbientTraceIds.set(previous),
            None => AmbientTraceIds.clear(),
        }
    }
}

/// Runs `f` with `id` as the ambient correlation id.
pub fn with_trace_id<R>(id: TraceId, f: impl FnOnce() -> R) -> R {
    let _scope = TraceScope::enter(id);
    f()
}

/// Spawns a thread that starts with the spawner's current correlation id.
///
/// The id is copied at spawn time; later changes on either side are not
/// shared.
pub fn spawn_inheriting<F, T>(f: F) -> JoinHandle<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let inherited = current_trace_id();
    std::thread::spawn(move || match inherited {
        Some(id) => with_trace_id(id, f),
        None => f(),
    })
}

/// Carries the current correlation id into `future`.
///
/// The id is captured now and visible for every poll of the future,
/// regardless of which thread polls it.
pub fn propagate<F: Future>(future: F) -> impl Future<Output = F::Output> {
    TASK_TRACE_ID.scope(RefCell::new(current_trace_id()), future)
}

/// Runs `future` with `id` as its correlation id.
pub fn with_task_trace_id<F: Future>(id: TraceId, future: F) -> impl Future<Output = F::Output> {
    TASK_TRACE_ID.scope(RefCell::new(Some(id)), future)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_restores_previous_id() {
        with_trace_id(TraceId::new("outer"), || {
            with_trace_id(TraceId::new("inner"), || {
                assert_eq!(current_trace_id(), Some(TraceId::new("inner")));
            });
            assert_eq!(current_trace_id(), Some(TraceId::new("outer")));
        });
        assert_eq!(current_trace_id(), None);
    }

    #[test]
    fn test_scope_restores_on_panic() {
        let outcome = std::panic::catch_unwind(|| {
            with_trace_id(TraceId::new("doomed"), || panic!("boom"));
        });
        assert!(outcome.is_err());
        assert_eq!(current_trace_id(), None);
    }

    #[test]
    fn test_generated_ids_are_unique_and_compact() {
        let a = TraceId::generate();
        let b = TraceId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
        assert!(!a.as_str().contains('-'));
    }
}
