//! Execution context for expression evaluation.
//!
//! - **snapshot**: immutable, phase-scoped capture of one call
//! - **binder**: variable environment derived from a snapshot
//! - **trace**: correlation id storage and scoped propagation helpers

mod binder;
mod snapshot;
pub mod trace;

pub use binder::{BUILTIN_VARIABLES, Bindings};
pub use snapshot::{ErrorInfo, ExecutionSnapshot, SnapshotBuilder};
pub use trace::{
    AmbientTraceIds, TraceId, TraceIdProvider, TraceScope, current_trace_id, propagate,
    spawn_inheriting, with_task_trace_id, with_trace_id,
};
