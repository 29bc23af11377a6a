//! Interception core.
//!
//! [`Interceptor`] wraps a call, drives it through its lifecycle and turns
//! each phase into log events according to the call's directives:
//!
//! ```text
//! NotStarted -> Entered -> Succeeded | Failed -> Completed
//! ```
//!
//! The wrapped call always runs, whatever the directives' conditions say,
//! and its outcome is returned unchanged. Panics are logged as failures of
//! kind `panic` and then resumed. Anything that goes wrong while logging is
//! reported through `tracing` and never reaches the caller.
//!
//! # Example
//!
//! ```rust,ignore
//! use interlog::prelude::*;
//!
//! let interceptor = Interceptor::builder()
//!     .with_sink(MemorySink::new())
//!     .build()?;
//!
//! let directive = Directive::new()
//!     .with_log_args(true)
//!     .with_exit_message("Found user #{args[0]}");
//!
//! let user = interceptor.intercept(
//!     &CallSite::new("UserService", "find"),
//!     &directive.into(),
//!     Some(vec![Value::from(7)]),
//!     || repository.find(7),
//! )?;
//! ```

mod call;
mod details;

use futures::FutureExt;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::sync::Arc;

use crate::config::{ConfigValidationError, InterceptorConfig};
use crate::context::{
    AmbientTraceIds, BUILTIN_VARIABLES, ErrorInfo, ExecutionSnapshot, SnapshotBuilder,
    TraceIdProvider,
};
use crate::directive::{DirectiveRegistry, DirectiveSet};
use crate::expression::ExpressionEngine;
use crate::handler::Classify;
use crate::lifecycle::log_interceptor_init;
use crate::serializer::ContentSerializer;
use crate::sink::{LogEvent, LogSink, TracingSink};
use crate::types::CallSite;
use crate::value::Value;
use call::ActiveCall;

// =============================================================================
// Interceptor
// =============================================================================

/// Logs intercepted calls according to their directives.
///
/// An interceptor is built once and shared; every method takes `&self`.
pub struct Interceptor {
    config: InterceptorConfig,
    engine: Arc<ExpressionEngine>,
    serializer: Arc<ContentSerializer>,
    sink: Arc<dyn LogSink>,
    trace_ids: Arc<dyn TraceIdProvider>,
    variables: BTreeMap<String, Value>,
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("config", &self.config)
            .field("engine", &self.engine)
            .field("serializer", &self.serializer)
            .field("variables", &self.variables.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Interceptor {
    /// Starts building an interceptor.
    pub fn builder() -> InterceptorBuilder {
        InterceptorBuilder::default()
    }

    /// Creates an interceptor with the default sink and trace id provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: InterceptorConfig) -> Result<Self, ConfigValidationError> {
        Self::builder().with_config(config).build()
    }

    /// The configuration in use.
    pub fn config(&self) -> &InterceptorConfig {
        &self.config
    }

    /// The expression engine.
    pub fn engine(&self) -> &ExpressionEngine {
        &self.engine
    }

    /// The content serializer.
    pub fn serializer(&self) -> &ContentSerializer {
        &self.serializer
    }

    /// Runs `call` and logs it according to `directives`.
    ///
    /// `args` is the captured argument list; pass `None` when arguments are
    /// not available, in which case templates referencing `args` render a
    /// diagnostic instead of an empty list.
    ///
    /// The call's result or error is returned unchanged. A panic inside
    /// `call` is logged and then resumed.
    pub fn intercept<T, E, F>(
        &self,
        site: &CallSite,
        directives: &DirectiveSet,
        args: Option<Vec<Value>>,
        call: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        T: Serialize,
        E: Classify + fmt::Display,
    {
        let Some(mut active) = self.begin(site, directives, args) else {
            return call();
        };
        self.guarded(site, || active.enter());

        match catch_unwind(AssertUnwindSafe(call)) {
            Ok(outcome) => {
                self.finish(site, &mut active, &outcome);
                outcome
            }
            Err(payload) => {
                self.guarded(site, || {
                    active.fail_with_panic(&*payload);
                    active.complete();
                });
                resume_unwind(payload)
            }
        }
    }

    /// Awaits `future` and logs it according to `directives`.
    ///
    /// The future runs on the caller's task; nothing is spawned.
    pub async fn intercept_async<T, E, Fut>(
        &self,
        site: &CallSite,
        directives: &DirectiveSet,
        args: Option<Vec<Value>>,
        future: Fut,
    ) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
        E: Classify + fmt::Display,
    {
        let Some(mut active) = self.begin(site, directives, args) else {
            return future.await;
        };
        self.guarded(site, || active.enter());

        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(outcome) => {
                self.finish(site, &mut active, &outcome);
                outcome
            }
            Err(payload) => {
                self.guarded(site, || {
                    active.fail_with_panic(&*payload);
                    active.complete();
                });
                resume_unwind(payload)
            }
        }
    }

    /// Looks up the directives for `site` in `registry`, then intercepts.
    ///
    /// Sites that are ignored or have no directives run without logging.
    pub fn intercept_registered<T, E, F>(
        &self,
        registry: &DirectiveRegistry,
        site: &CallSite,
        args: Option<Vec<Value>>,
        call: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        T: Serialize,
        E: Classify + fmt::Display,
    {
        match registry.resolve(site) {
            Some(directives) => self.intercept(site, &directives, args, call),
            None => call(),
        }
    }

    /// Async form of [`intercept_registered`](Self::intercept_registered).
    pub async fn intercept_registered_async<T, E, Fut>(
        &self,
        registry: &DirectiveRegistry,
        site: &CallSite,
        args: Option<Vec<Value>>,
        future: Fut,
    ) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
        E: Classify + fmt::Display,
    {
        match registry.resolve(site) {
            Some(directives) => self.intercept_async(site, &directives, args, future).await,
            None => future.await,
        }
    }

    /// Drops the compiled-expression cache and the field-plan cache.
    pub fn clear_caches(&self) {
        self.engine.clear_cache();
        self.serializer.clear_caches();
    }

    fn begin<'a>(
        &'a self,
        site: &'a CallSite,
        directives: &'a DirectiveSet,
        args: Option<Vec<Value>>,
    ) -> Option<ActiveCall<'a>> {
        catch_unwind(AssertUnwindSafe(|| ActiveCall::begin(self, site, directives, args)))
            .unwrap_or_else(|_| {
                tracing::warn!(site = %site, "Interception setup panicked, running call unlogged");
                None
            })
    }

    fn finish<T: Serialize, E: Classify + fmt::Display>(
        &self,
        site: &CallSite,
        active: &mut ActiveCall<'_>,
        outcome: &Result<T, E>,
    ) {
        self.guarded(site, || {
            match outcome {
                Ok(value) => active.succeed(value),
                Err(error) => active.fail(ErrorInfo::from_error(error)),
            }
            active.complete();
        });
    }

    /// Runs a logging step, containing any panic it raises.
    fn guarded(&self, site: &CallSite, step: impl FnOnce()) {
        if catch_unwind(AssertUnwindSafe(step)).is_err() {
            tracing::warn!(site = %site, "Logging step panicked, call outcome unaffected");
        }
    }

    pub(crate) fn base_snapshot(&self, site: &CallSite) -> SnapshotBuilder {
        self.variables
            .iter()
            .fold(ExecutionSnapshot::for_site(site), |builder, (name, value)| {
                builder.variable(name.clone(), value.clone())
            })
    }

    pub(crate) fn deliver(&self, event: &LogEvent) {
        if catch_unwind(AssertUnwindSafe(|| self.sink.emit(event))).is_err() {
            tracing::warn!(
                class = %event.class_name,
                method = %event.method_name,
                phase = %event.phase,
                "Log sink panicked, event dropped"
            );
        }
    }
}

// =============================================================================
// InterceptorBuilder
// =============================================================================

/// Builder for [`Interceptor`].
///
/// Unset parts default to an engine and serializer built from the
/// configuration, a [`TracingSink`] and the ambient trace id provider.
#[derive(Default)]
pub struct InterceptorBuilder {
    config: InterceptorConfig,
    engine: Option<Arc<ExpressionEngine>>,
    serializer: Option<Arc<ContentSerializer>>,
    sink: Option<Arc<dyn LogSink>>,
    trace_ids: Option<Arc<dyn TraceIdProvider>>,
    variables: BTreeMap<String, Value>,
}

impl fmt::Debug for InterceptorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorBuilder")
            .field("config", &self.config)
            .field("has_sink", &self.sink.is_some())
            .field("has_trace_ids", &self.trace_ids.is_some())
            .finish_non_exhaustive()
    }
}

impl InterceptorBuilder {
    /// Sets the configuration.
    #[must_use = "This method returns a new InterceptorBuilder and does not modify self"]
    pub fn with_config(mut self, config: InterceptorConfig) -> Self {
        self.config = config;
        self
    }

    /// Shares an existing expression engine.
    #[must_use = "This method returns a new InterceptorBuilder and does not modify self"]
    pub fn with_engine(mut self, engine: Arc<ExpressionEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Shares an existing content serializer.
    #[must_use = "This method returns a new InterceptorBuilder and does not modify self"]
    pub fn with_serializer(mut self, serializer: Arc<ContentSerializer>) -> Self {
        self.serializer = Some(serializer);
        self
    }

    /// Sets the sink events are delivered to.
    #[must_use = "This method returns a new InterceptorBuilder and does not modify self"]
    pub fn with_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Sets the trace id provider.
    #[must_use = "This method returns a new InterceptorBuilder and does not modify self"]
    pub fn with_trace_ids(mut self, provider: impl TraceIdProvider + 'static) -> Self {
        self.trace_ids = Some(Arc::new(provider));
        self
    }

    /// Adds a variable visible to every template.
    ///
    /// Built-in variables take precedence over custom ones of the same name.
    #[must_use = "This method returns a new InterceptorBuilder and does not modify self"]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        if BUILTIN_VARIABLES.contains(&name.as_str()) {
            tracing::warn!(variable = %name, "Custom variable is shadowed by a built-in");
        }
        self.variables.insert(name, value.into());
        self
    }

    /// Validates the configuration and builds the interceptor.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<Interceptor, ConfigValidationError> {
        self.config.validate()?;

        let engine = self
            .engine
            .unwrap_or_else(|| Arc::new(ExpressionEngine::new(self.config.engine.clone())));
        let serializer = self
            .serializer
            .unwrap_or_else(|| Arc::new(ContentSerializer::new(&self.config.masking)));
        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(TracingSink) as Arc<dyn LogSink>);
        let trace_ids = self
            .trace_ids
            .unwrap_or_else(|| Arc::new(AmbientTraceIds) as Arc<dyn TraceIdProvider>);

        log_interceptor_init(&format!(
            "enabled: {}, fail_safe: {}, min_level: {}, exclusions: {}, variables: {}",
            self.config.enabled,
            engine.config().fail_safe,
            self.config.min_level,
            self.config.exclusions.len(),
            self.variables.len(),
        ));

        Ok(Interceptor {
            config: self.config,
            engine,
            serializer,
            sink,
            trace_ids,
            variables: self.variables,
        })
    }
}
