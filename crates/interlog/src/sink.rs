//! Log sinks.
//!
//! The interceptor renders every event into a [`LogEvent`] and hands it to a
//! [`LogSink`]. Three sinks are provided:
//!
//! - [`TracingSink`]: structured `tracing` events at the event's level
//! - [`JsonSink`]: one JSON line per event under the `interlog_json` target
//! - [`MemorySink`]: keeps events in memory for inspection

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::context::ErrorInfo;
use crate::types::{CallPhase, LogLevel};

/// `tracing` target of [`TracingSink`] events.
pub const TRACING_TARGET: &str = "interlog";

/// `tracing` target of [`JsonSink`] events.
pub const JSON_TARGET: &str = "interlog_json";

// =============================================================================
// LogEvent
// =============================================================================

/// One rendered event of an intercepted call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEvent {
    /// When the event was rendered.
    pub timestamp: DateTime<Utc>,
    /// Severity.
    pub level: LogLevel,
    /// Lifecycle phase the event belongs to.
    pub phase: CallPhase,
    /// Correlation id, or the missing-id sentinel.
    pub trace_id: String,
    /// Owning type of the intercepted method.
    pub class_name: String,
    /// Intercepted method.
    pub method_name: String,
    /// Tags of the directive that produced the event.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    /// Rendered message.
    pub message: String,
    /// Details line (trace id, args, result, timing, failure).
    pub details: String,
    /// Final text: `<details> | <message>`, cut to the configured length.
    pub text: String,
    /// Elapsed time for exit and failure events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    /// Failure attached to the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl LogEvent {
    /// Source chain of the attached failure, when there is one to report.
    pub fn causes(&self) -> Option<&[String]> {
        self.error
            .as_ref()
            .map(|error| error.chain.as_slice())
            .filter(|chain| !chain.is_empty())
    }
}

// =============================================================================
// LogSink
// =============================================================================

/// Destination of rendered events.
///
/// `emit` runs on the caller's thread inside the intercepted call; sinks
/// should not block.
pub trait LogSink: Send + Sync {
    /// Emits one event.
    fn emit(&self, event: &LogEvent);
}

impl<S: LogSink + ?Sized> LogSink for Arc<S> {
    fn emit(&self, event: &LogEvent) {
        (**self).emit(event);
    }
}

// =============================================================================
// TracingSink
// =============================================================================

/// Emits events through `tracing` with structured fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

macro_rules! emit_at {
    ($macro:ident, $event:expr, $kind:expr) => {
        tracing::$macro!(
            target: TRACING_TARGET,
            trace_id = %$event.trace_id,
            class = %$event.class_name,
            method = %$event.method_name,
            phase = %$event.phase,
            elapsed_ms = ?$event.elapsed_ms,
            error_kind = ?$kind,
            "{}",
            $event.text
        )
    };
}

macro_rules! emit_causes_at {
    ($macro:ident, $event:expr, $chain:expr) => {
        tracing::$macro!(
            target: TRACING_TARGET,
            trace_id = %$event.trace_id,
            chain = ?$chain,
            "Caused by"
        )
    };
}

impl LogSink for TracingSink {
    fn emit(&self, event: &LogEvent) {
        let kind = event.error.as_ref().map(|e| e.kind.as_str());
        match event.level {
            LogLevel::Trace => emit_at!(trace, event, kind),
            LogLevel::Debug => emit_at!(debug, event, kind),
            LogLevel::Info => emit_at!(info, event, kind),
            LogLevel::Warn => emit_at!(warn, event, kind),
            LogLevel::Error => emit_at!(error, event, kind),
            LogLevel::Off => return,
        }

        let Some(chain) = event.causes() else {
            return;
        };
        match event.level {
            LogLevel::Trace => emit_causes_at!(trace, event, chain),
            LogLevel::Debug => emit_causes_at!(debug, event, chain),
            LogLevel::Info => emit_causes_at!(info, event, chain),
            LogLevel::Warn => emit_causes_at!(warn, event, chain),
            LogLevel::Error => emit_causes_at!(error, event, chain),
            LogLevel::Off => {}
        }
    }
}

// =============================================================================
// JsonSink
// =============================================================================

/// Emits each event as one JSON line.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSink;

impl LogSink for JsonSink {
    fn emit(&self, event: &LogEvent) {
        let json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(error) => {
                tracing::warn!(error = %error, "Failed to encode log event as JSON");
                return;
            }
        };
        match event.level {
            LogLevel::Trace => tracing::trace!(target: JSON_TARGET, "{}", json),
            LogLevel::Debug => tracing::debug!(target: JSON_TARGET, "{}", json),
            LogLevel::Info => tracing::info!(target: JSON_TARGET, "{}", json),
            LogLevel::Warn => tracing::warn!(target: JSON_TARGET, "{}", json),
            LogLevel::Error => tracing::error!(target: JSON_TARGET, "{}", json),
            LogLevel::Off => {}
        }
    }
}

// =============================================================================
// MemorySink
// =============================================================================

/// Keeps emitted events in memory.
///
/// Clones share the same buffer, so a clone can be handed to the
/// interceptor while the original is inspected.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<LogEvent>>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LogEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns all captured events.
    pub fn events(&self) -> Vec<LogEvent> {
        self.lock().clone()
    }

    /// Returns the text of all captured events.
    pub fn texts(&self) -> Vec<String> {
        self.lock().iter().map(|e| e.text.clone()).collect()
    }

    /// Clears captured events.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of captured events.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing has been captured.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl LogSink for MemorySink {
    fn emit(&self, event: &LogEvent) {
        self.lock().push(event.clone());
    }
}
