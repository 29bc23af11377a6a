//! Immutable per-phase capture of an intercepted call.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::handler::{Classify, ErrorKind};
use crate::types::{CallPhase, CallSite};
use crate::value::{Record, Value, short_type_name};

/// Failure details captured from the error returned by an intercepted call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    /// Short type name of the error.
    pub type_name: String,
    /// Hierarchical kind used for handler resolution.
    pub kind: ErrorKind,
    /// Display message.
    pub message: String,
    /// Messages of the error's sources, outermost first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub chain: Vec<String>,
}

impl ErrorInfo {
    /// Captures kind, message and source chain from a classified error.
    pub fn from_error<E: Classify + fmt::Display + ?Sized>(error: &E) -> Self {
        Self {
            type_name: short_type_name(std::any::type_name::<E>()).to_string(),
            kind: error.error_kind(),
            message: error.to_string(),
            chain: error.source_chain(),
        }
    }

    /// Creates failure details by hand.
    pub fn new(
        type_name: impl Into<String>,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            kind,
            message: message.into(),
            chain: Vec::new(),
        }
    }

    /// Value bound to the `exception` variable.
    pub fn to_value(&self) -> Value {
        Record::new("exception")
            .with_field("type", self.type_name.as_str())
            .with_field("kind", self.kind.as_str())
            .with_field("message", self.message.as_str())
            .into()
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.message)
    }
}

/// Point-in-time view of one intercepted call.
///
/// A snapshot is built fresh for every lifecycle phase and never mutated.
/// The argument list is an owned capture shared by reference between the
/// phases of one call, so later changes made by the callee are not visible.
#[derive(Debug, Clone)]
pub struct ExecutionSnapshot {
    trace_id: Option<String>,
    class_name: String,
    method_name: String,
    phase: CallPhase,
    args: Option<Arc<Value>>,
    result: Option<Value>,
    error: Option<ErrorInfo>,
    elapsed: Option<Duration>,
    variables: BTreeMap<String, Value>,
}

impl ExecutionSnapshot {
    /// Starts a snapshot for `class_name.method_name`.
    pub fn builder(class_name: impl Into<String>, method_name: impl Into<String>) -> SnapshotBuilder {
        SnapshotBuilder {
            snapshot: ExecutionSnapshot {
                trace_id: None,
                class_name: class_name.into(),
                method_name: method_name.into(),
                phase: CallPhase::NotStarted,
                args: None,
                result: None,
                error: None,
                elapsed: None,
                variables: BTreeMap::new(),
            },
        }
    }

    /// Starts a snapshot for a call site.
    pub fn for_site(site: &CallSite) -> SnapshotBuilder {
        Self::builder(site.class_name(), site.method_name())
    }

    /// Starts a new snapshot carrying everything this one holds.
    ///
    /// Used to move to the next phase; the original stays untouched.
    pub fn to_builder(&self) -> SnapshotBuilder {
        SnapshotBuilder {
            snapshot: self.clone(),
        }
    }

    /// Correlation id, if one was established.
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    /// Owning type name.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Method name.
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// Lifecycle phase this snapshot describes.
    pub fn phase(&self) -> CallPhase {
        self.phase
    }

    /// Captured arguments, absent when the caller supplied none.
    pub fn args(&self) -> Option<&[Value]> {
        self.args.as_deref().and_then(Value::as_list)
    }

    pub(crate) fn args_value(&self) -> Option<&Value> {
        self.args.as_deref()
    }

    /// Return value, present after a successful call.
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Failure details, present after a failed call.
    pub fn error(&self) -> Option<&ErrorInfo> {
        self.error.as_ref()
    }

    /// Time spent in the call, present once it returned.
    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    /// Custom variable by name.
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// All custom variables.
    pub fn variables(&self) -> &BTreeMap<String, Value> {
        &self.variables
    }
}

/// Builder for [`ExecutionSnapshot`].
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    snapshot: ExecutionSnapshot,
}

impl SnapshotBuilder {
    /// Sets the correlation id.
    pub fn trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.snapshot.trace_id = Some(trace_id.into());
        self
    }

    pub(crate) fn maybe_trace_id(mut self, trace_id: Option<String>) -> Self {
        self.snapshot.trace_id = trace_id;
        self
    }

    /// Sets the lifecycle phase.
    pub fn phase(mut self, phase: CallPhase) -> Self {
        self.snapshot.phase = phase;
        self
    }

    /// Sets the captured argument list.
    pub fn args(mut self, args: Vec<Value>) -> Self {
        self.snapshot.args = Some(Arc::new(Value::List(args)));
        self
    }

    pub(crate) fn shared_args(mut self, args: Option<Arc<Value>>) -> Self {
        self.snapshot.args = args;
        self
    }

    /// Sets the return value.
    pub fn result(mut self, result: Value) -> Self {
        self.snapshot.result = Some(result);
        self
    }

    /// Sets the failure details.
    pub fn error(mut self, error: ErrorInfo) -> Self {
        self.snapshot.error = Some(error);
        self
    }

    /// Sets the elapsed time.
    pub fn elapsed(mut self, elapsed: Duration) -> Self {
        self.snapshot.elapsed = Some(elapsed);
        self
    }

    /// Adds a custom variable.
    pub fn variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.snapshot.variables.insert(name.into(), value.into());
        self
    }

    /// Finishes the snapshot.
    pub fn build(self) -> ExecutionSnapshot {
        self.snapshot
    }
}
