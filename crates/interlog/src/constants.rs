//! Constants and default values shared across the crate.
//!
//! Centralizes the tokens that appear in rendered output (mask token,
//! truncation marker, placeholders) together with the default limits used
//! by configuration types.

/// Default token that replaces the value of a sensitive field.
pub const DEFAULT_MASK_TOKEN: &str = "***";

/// Marker appended to output cut at its configured maximum length.
pub const TRUNCATION_MARKER: &str = "[TRUNCATED]";

/// Correlation id used when none has been established for the current call.
///
/// The interceptor never generates an id on its own; it only falls back to
/// this sentinel so every event still carries a value.
pub const MISSING_TRACE_ID: &str = "MISSING-TRACE-ID";

/// Default maximum length for serialized arguments and results.
pub const DEFAULT_MAX_LENGTH: usize = 1000;

/// Default threshold for slow call warnings in milliseconds.
pub const DEFAULT_SLOW_CALL_THRESHOLD_MS: u64 = 1000;

/// Default threshold for slow expression evaluation warnings in milliseconds.
pub const DEFAULT_SLOW_EVALUATION_THRESHOLD_MS: u64 = 1000;

/// Default nesting depth after which records are rendered as type tags.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Group assigned to directives that do not name one.
pub const DEFAULT_GROUP: &str = "default";

/// Name of the formatter used when none (or an unknown one) is selected.
pub const DEFAULT_FORMATTER: &str = "json";

/// Placeholder for arguments excluded by index.
pub const EXCLUDED_PLACEHOLDER: &str = "[excluded]";

/// Error kind assigned to panics raised by an intercepted call.
pub const PANIC_KIND: &str = "panic";

/// Default exact field names treated as sensitive (compared case-insensitively).
pub const DEFAULT_SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "passwd",
    "pwd",
    "secret",
    "token",
    "access_token",
    "accessToken",
    "refresh_token",
    "refreshToken",
    "api_key",
    "apiKey",
    "private_key",
    "privateKey",
    "credential",
    "credentials",
    "authorization",
    "credit_card",
    "creditCard",
    "card_number",
    "cardNumber",
    "cvv",
    "ssn",
];

/// Default regex patterns for sensitive field names.
///
/// Patterns are compiled case-insensitively and matched anywhere in the name,
/// so `UserPassword` or `client_secret_hash` are caught as well.
pub const DEFAULT_SENSITIVE_PATTERNS: &[&str] = &[
    "password",
    "secret",
    "token",
    "api_?key",
    "private_?key",
    "credential",
];

/// Type name prefixes that are never introspected by the masker.
///
/// Values of these types are rendered as `TypeName@identity` tags.
pub const DEFAULT_FOREIGN_TYPE_PREFIXES: &[&str] = &[
    "std::",
    "core::",
    "alloc::",
    "tokio::",
    "futures::",
    "dashmap::",
    "tracing::",
];
