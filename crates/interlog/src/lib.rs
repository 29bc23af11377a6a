#![warn(missing_docs)]
//! # interlog
//!
//! Declarative method-interception logging.
//!
//! ## Overview
//!
//! Each intercepted call is turned into zero or more structured log events,
//! driven by per-call [`Directive`]s:
//! - **Conditions** decide whether a phase is logged (`#{args[0] > 5}`)
//! - **Templates** render messages from arguments, results and failures
//!   (`"User #{args[0]} saved in #{executionTime}ms"`)
//! - **Content masking** hides sensitive fields before anything is written
//! - **Handler rules** pick level and message per failure kind
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   snapshot    ┌──────────────────┐
//! │ Interceptor  │──────────────▶│ ExpressionEngine │──▶ Bindings
//! │ (lifecycle)  │               └──────────────────┘
//! │              │   args/result ┌──────────────────┐
//! │              │──────────────▶│ ContentSerializer│──▶ mask, format, truncate
//! │              │   error kind  ┌──────────────────┐
//! │              │──────────────▶│ handler::resolve │
//! │              │   LogEvent    ┌──────────────────┐
//! │              │──────────────▶│ LogSink          │
//! └──────────────┘               └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use interlog::prelude::*;
//!
//! let interceptor = Interceptor::builder()
//!     .with_config(InterceptorConfig::new().with_exclusion("HealthService.*"))
//!     .build()?;
//!
//! let directive = Directive::new()
//!     .with_log_args(true)
//!     .with_condition("#{args[0] > 5}")
//!     .with_exit_message("Loaded order #{args[0]}")
//!     .with_handler(
//!         HandlerRule::new("io", LogLevel::Warn).with_message("Storage failed: #{exception.message}"),
//!     );
//!
//! let _scope = TraceScope::enter(TraceId::generate());
//! let order = interceptor.intercept(
//!     &CallSite::new("OrderService", "load"),
//!     &directive.into(),
//!     Some(vec![Value::from(42)]),
//!     || store.load(42),
//! )?;
//! ```
//!
//! ## Registries
//!
//! Directives can be attached to call sites up front and looked up per call:
//!
//! ```rust,ignore
//! let registry = DirectiveRegistry::new()
//!     .with_class("OrderService", Directive::new().with_level(LogLevel::Debug))
//!     .with_ignored("OrderService", "ping");
//!
//! interceptor.intercept_registered(&registry, &site, None, || service.ping())?;
//! ```
//!
//! ## Module Structure
//!
//! - [`interceptor`] - Call lifecycle and event rendering
//! - [`expression`] - Template classification, compilation and evaluation
//! - [`context`] - Execution snapshots, variable bindings and trace ids
//! - [`serializer`] - Masking and formatting of payloads
//! - [`handler`] - Error kinds and handler rule resolution
//! - [`directive`] - Directive model and registry
//! - [`sink`] - Event destinations
//! - [`value`] - Captured value model
//!
//! ## Prelude
//!
//! ```rust,ignore
//! use interlog::prelude::*;
//! ```

mod config;
pub mod constants;
pub mod context;
pub mod directive;
mod error;
pub mod expression;
pub mod handler;
pub mod interceptor;
mod lifecycle;
mod pattern;
pub mod serializer;
pub mod sink;
pub mod types;
pub mod value;

#[cfg(test)]
mod tests;

// Public API
pub use config::{ConfigValidationError, EngineConfig, InterceptorConfig, MaskingConfig};
pub use context::{
    AmbientTraceIds, Bindings, ErrorInfo, ExecutionSnapshot, SnapshotBuilder, TraceId,
    TraceIdProvider, TraceScope, current_trace_id, propagate, spawn_inheriting,
    with_task_trace_id, with_trace_id,
};
pub use directive::{Directive, DirectiveRegistry, DirectiveSet};
pub use error::{EvalError, EvalResult};
pub use expression::{CompiledExpression, ExpressionEngine, ExpressionType, coerce_to_bool};
pub use handler::{Classify, ErrorKind, HandlerRule, resolve, source_chain_of};
pub use interceptor::{Interceptor, InterceptorBuilder};
pub use lifecycle::{
    log_cache_cleared, log_directive_registered, log_interceptor_init,
    log_sensitive_fields_registered,
};
pub use pattern::pattern_matches;
pub use serializer::{
    ArgumentFormatter, ContentSerializer, FormatterRegistry, JsonFormatter, KeyValueFormatter,
    MaskingPolicy, truncate,
};
pub use sink::{JsonSink, LogEvent, LogSink, MemorySink, TracingSink};
pub use types::{CallPhase, CallSite, LogLevel};
pub use value::{CaptureError, Record, Value};

/// Prelude for convenient imports
///
/// ```rust,ignore
/// use interlog::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Interception
        CallPhase,
        CallSite,
        Classify,
        // Configuration
        ConfigValidationError,
        // Serialization
        ContentSerializer,
        // Directives
        Directive,
        DirectiveRegistry,
        DirectiveSet,
        EngineConfig,
        ErrorKind,
        // Expressions
        EvalError,
        ExecutionSnapshot,
        ExpressionEngine,
        HandlerRule,
        Interceptor,
        InterceptorConfig,
        // Sinks
        JsonSink,
        LogEvent,
        LogLevel,
        LogSink,
        MaskingConfig,
        MemorySink,
        Record,
        // Trace ids
        TraceId,
        TraceScope,
        TracingSink,
        Value,
        propagate,
        with_trace_id,
    };
}
