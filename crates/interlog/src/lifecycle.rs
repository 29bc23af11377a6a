//! Lifecycle logging for administrative operations.
//!
//! Interceptor construction, directive registration and cache resets are
//! reported through `tracing` so hosts can see when shared state changes.

/// Log interceptor initialization.
///
/// Logged at Info level with a short configuration summary.
///
/// # Example
///
/// ```rust,ignore
/// log_interceptor_init("enabled: true, fail_safe: true, sink: TracingSink");
/// ```
pub fn log_interceptor_init(config_summary: &str) {
    tracing::info!(
        config = %config_summary,
        "Interceptor initialized"
    );
}

/// Log registration of a directive for a call site or class.
///
/// Logged at Trace level.
pub fn log_directive_registered(key: &str, scope: &str) {
    tracing::trace!(
        key = %key,
        scope = %scope,
        "Directive registered"
    );
}

/// Log a full cache reset.
///
/// Logged at Debug level with the number of entries dropped.
pub fn log_cache_cleared(cache: &str, entries: usize) {
    tracing::debug!(
        cache = %cache,
        entries = %entries,
        "Cache cleared"
    );
}

/// Log registration of custom sensitive field names.
pub fn log_sensitive_fields_registered(count: usize) {
    tracing::debug!(
        count = %count,
        "Sensitive fields registered"
    );
}
