//! Variable environment derived from an [`ExecutionSnapshot`].

use std::borrow::Cow;

use super::snapshot::ExecutionSnapshot;
use crate::error::{EvalError, EvalResult};
use crate::value::Value;

/// Names bound by every snapshot.
///
/// [`Bindings::lookup`] resolves these before custom variables, so a custom
/// variable with one of these names is never visible.
pub const BUILTIN_VARIABLES: &[&str] = &[
    "args",
    "result",
    "exception",
    "methodName",
    "className",
    "executionTime",
    "traceId",
    "phase",
];

/// Read-only variable environment for one evaluation.
///
/// Lookups are lazy: only the variables an expression references are
/// materialized, and the argument list is borrowed from the snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Bindings<'a> {
    snapshot: &'a ExecutionSnapshot,
}

impl<'a> Bindings<'a> {
    /// Binds the variables of `snapshot`.
    pub fn new(snapshot: &'a ExecutionSnapshot) -> Self {
        Self { snapshot }
    }

    /// Resolves a variable by name.
    ///
    /// Referencing `args` on a snapshot without arguments is an error rather
    /// than an empty list. `result` and `exception` are null until the
    /// matching phase, and `traceId` is the empty string when absent.
    pub fn lookup(&self, name: &str) -> EvalResult<Cow<'a, Value>> {
        let snapshot = self.snapshot;
        let value = match name {
            "args" => match snapshot.args_value() {
                Some(args) => Cow::Borrowed(args),
                None => {
                    return Err(EvalError::ArgsUnavailable {
                        method: snapshot.method_name().to_string(),
                    });
                }
            },
            "result" => snapshot
                .result()
                .map_or(Cow::Owned(Value::Null), Cow::Borrowed),
            "exception" => Cow::Owned(snapshot.error().map_or(Value::Null, |e| e.to_value())),
            "methodName" => Cow::Owned(Value::from(snapshot.method_name())),
            "className" => Cow::Owned(Value::from(snapshot.class_name())),
            "executionTime" => Cow::Owned(
                snapshot
                    .elapsed()
                    .map_or(Value::Null, |d| Value::from(d.as_millis() as u64)),
            ),
            "traceId" => Cow::Owned(Value::from(snapshot.trace_id().unwrap_or_default())),
            "phase" => Cow::Owned(Value::from(snapshot.phase().as_str())),
            other => match snapshot.variable(other) {
                Some(value) => Cow::Borrowed(value),
                None => {
                    return Err(EvalError::UnknownVariable {
                        name: other.to_string(),
                    });
                }
            },
        };
        Ok(value)
    }

    /// The snapshot these bindings were built from.
    pub fn snapshot(&self) -> &'a ExecutionSnapshot {
        self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_missing_args_is_an_error() {
        let snapshot = ExecutionSnapshot::builder("UserService", "find").build();
        let err = Bindings::new(&snapshot).lookup("args").unwrap_err();
        assert_eq!(
            err,
            EvalError::ArgsUnavailable {
                method: "find".into()
            }
        );
    }

    #[test]
    fn test_builtins_and_custom_variables() {
        let snapshot = ExecutionSnapshot::builder("UserService", "find")
            .args(vec![Value::from(1)])
            .elapsed(Duration::from_millis(42))
            .variable("tenant", "acme")
            .variable("methodName", "shadowed")
            .build();
        let env = Bindings::new(&snapshot);

        assert_eq!(env.lookup("methodName").unwrap().as_str(), Some("find"));
        assert_eq!(env.lookup("className").unwrap().as_str(), Some("UserService"));
        assert_eq!(env.lookup("executionTime").unwrap().into_owned(), Value::from(42u64));
        assert_eq!(env.lookup("traceId").unwrap().as_str(), Some(""));
        assert_eq!(env.lookup("tenant").unwrap().as_str(), Some("acme"));
        assert!(env.lookup("result").unwrap().is_null());
        assert!(matches!(
            env.lookup("nope"),
            Err(EvalError::UnknownVariable { .. })
        ));
    }

    #[test]
    fn test_every_builtin_shadows_custom_variables() {
        let builder = BUILTIN_VARIABLES.iter().fold(
            ExecutionSnapshot::builder("UserService", "find").args(Vec::new()),
            |builder, name| builder.variable(*name, "custom"),
        );
        let snapshot = builder.build();
        let env = Bindings::new(&snapshot);

        for name in BUILTIN_VARIABLES {
            let value = env.lookup(name).unwrap();
            assert_ne!(value.as_str(), Some("custom"), "{name} was shadowed");
        }
    }
}
