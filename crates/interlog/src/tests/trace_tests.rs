//! Trace tests - Correlation id scopes and propagation
//!
//! Scopes must restore the previous id on every exit path, and ids must
//! follow work onto spawned threads and into propagated futures.

use proptest::prelude::*;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::context::{
    AmbientTraceIds, TraceId, TraceIdProvider, TraceScope, current_trace_id, propagate,
    spawn_inheriting, with_task_trace_id, with_trace_id,
};

fn nest(ids: &[String], panic_at: Option<usize>, depth: usize) {
    let Some((first, rest)) = ids.split_first() else {
        return;
    };
    let _scope = TraceScope::enter(TraceId::new(first.clone()));
    assert_eq!(current_trace_id(), Some(TraceId::new(first.clone())));
    if panic_at == Some(depth) {
        panic!("unwinding at depth {depth}");
    }
    nest(rest, panic_at, depth + 1);
    assert_eq!(current_trace_id(), Some(TraceId::new(first.clone())));
}

// =============================================================================
// Property-Based Tests
// =============================================================================

proptest! {
    /// Property: Nested scopes restore the outer id on normal exit and on unwind
    #[test]
    fn prop_scopes_restore_on_every_exit_path(
        ids in prop::collection::vec("[a-f0-9]{4,8}", 1..6),
        panic_at in prop::option::of(0usize..6),
    ) {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            with_trace_id(TraceId::new("root"), || nest(&ids, panic_at, 0))
        }));
        prop_assert_eq!(outcome.is_err(), panic_at.is_some_and(|p| p < ids.len()));
        prop_assert_eq!(current_trace_id(), None);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn test_provider_set_and_clear() {
    let provider = AmbientTraceIds;
    provider.set(TraceId::new("manual"));
    assert_eq!(provider.current(), Some(TraceId::new("manual")));
    provider.clear();
    assert_eq!(provider.current(), None);
}

#[test]
fn test_spawn_inheriting_copies_current_id() {
    let handle = with_trace_id(TraceId::new("parent"), || {
        spawn_inheriting(current_trace_id)
    });
    assert_eq!(handle.join().unwrap(), Some(TraceId::new("parent")));

    let orphan = spawn_inheriting(current_trace_id);
    assert_eq!(orphan.join().unwrap(), None);
}

#[tokio::test]
async fn test_propagate_captures_id_at_creation() {
    let future = with_trace_id(TraceId::new("request-1"), || {
        propagate(async { current_trace_id() })
    });
    assert_eq!(current_trace_id(), None);
    assert_eq!(future.await, Some(TraceId::new("request-1")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_task_id_follows_spawned_task() {
    let id = TraceId::new("task-7");
    let seen = tokio::spawn(with_task_trace_id(id.clone(), async {
        tokio::task::yield_now().await;
        current_trace_id()
    }))
    .await
    .unwrap();
    assert_eq!(seen, Some(id));
}

#[tokio::test]
async fn test_scope_inside_task_writes_task_slot() {
    let seen = with_task_trace_id(TraceId::new("outer"), async {
        {
            let _scope = TraceScope::enter(TraceId::new("inner"));
            assert_eq!(current_trace_id(), Some(TraceId::new("inner")));
        }
        current_trace_id()
    })
    .await;
    assert_eq!(seen, Some(TraceId::new("outer")));
}
