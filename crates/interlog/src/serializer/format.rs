//! Argument and result formatters.
//!
//! Formatters turn already-masked values into the text embedded in log
//! messages. Two are built in:
//!
//! - `json` (default): `["bob",{"password":"***"}]`
//! - `key-value`: `arg0=bob&arg1={"password":"***"}`
//!
//! Additional formatters can be registered by name; lookups are
//! case-insensitive and unknown names fall back to the default.

use dashmap::DashMap;
use std::borrow::Cow;
use std::sync::Arc;

use crate::constants::{DEFAULT_FORMATTER, TRUNCATION_MARKER};
use crate::value::Value;

/// Renders arguments and results as text.
pub trait ArgumentFormatter: Send + Sync {
    /// Registry name of this formatter.
    fn name(&self) -> &str;

    /// Renders the argument list of one call.
    fn format_args(&self, args: &[Value]) -> String;

    /// Renders a single value, typically a result.
    fn format_value(&self, value: &Value) -> String;
}

// =============================================================================
// JsonFormatter
// =============================================================================

/// Formats values as compact JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl ArgumentFormatter for JsonFormatter {
    fn name(&self) -> &str {
        "json"
    }

    fn format_args(&self, args: &[Value]) -> String {
        serde_json::to_string(args).unwrap_or_else(|error| {
            tracing::debug!(error = %error, "JSON formatting of arguments failed");
            format!("[list of {}]", args.len())
        })
    }

    fn format_value(&self, value: &Value) -> String {
        value.to_json_string()
    }
}

// =============================================================================
// KeyValueFormatter
// =============================================================================

/// Formats arguments as `arg0=a&arg1=b`.
///
/// Strings render raw; composite values render as compact JSON.
#[derive(Debug, Clone)]
pub struct KeyValueFormatter {
    separator: String,
    assignment: String,
    prefix: String,
}

impl Default for KeyValueFormatter {
    fn default() -> Self {
        Self {
            separator: "&".to_string(),
            assignment: "=".to_string(),
            prefix: "arg".to_string(),
        }
    }
}

impl KeyValueFormatter {
    /// Creates a formatter with `&`, `=` and the `arg` prefix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pair separator.
    #[must_use = "This method returns a new KeyValueFormatter and does not modify self"]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Sets the key/value assignment token.
    #[must_use = "This method returns a new KeyValueFormatter and does not modify self"]
    pub fn with_assignment(mut self, assignment: impl Into<String>) -> Self {
        self.assignment = assignment.into();
        self
    }

    /// Sets the prefix used for positional argument keys.
    #[must_use = "This method returns a new KeyValueFormatter and does not modify self"]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn pair(&self, key: &str, value: &Value) -> String {
        format!("{key}{}{value}", self.assignment)
    }
}

impl ArgumentFormatter for KeyValueFormatter {
    fn name(&self) -> &str {
        "key-value"
    }

    fn format_args(&self, args: &[Value]) -> String {
        args.iter()
            .enumerate()
            .map(|(i, arg)| self.pair(&format!("{}{i}", self.prefix), arg))
            .collect::<Vec<_>>()
            .join(&self.separator)
    }

    fn format_value(&self, value: &Value) -> String {
        match value {
            Value::Map(map) => map
                .iter()
                .map(|(k, v)| self.pair(k, v))
                .collect::<Vec<_>>()
                .join(&self.separator),
            Value::Object(record) => record
                .fields
                .iter()
                .map(|(k, v)| self.pair(k, v))
                .collect::<Vec<_>>()
                .join(&self.separator),
            other => other.to_string(),
        }
    }
}

// =============================================================================
// FormatterRegistry
// =============================================================================

/// Named formatters with a default.
pub struct FormatterRegistry {
    formatters: DashMap<String, Arc<dyn ArgumentFormatter>>,
    default_name: String,
}

impl std::fmt::Debug for FormatterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatterRegistry")
            .field("formatters", &self.names())
            .field("default_name", &self.default_name)
            .finish()
    }
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatterRegistry {
    /// Creates a registry holding the `json` and `key-value` formatters.
    pub fn new() -> Self {
        let registry = Self {
            formatters: DashMap::new(),
            default_name: DEFAULT_FORMATTER.to_string(),
        };
        registry.register(JsonFormatter);
        registry.register(KeyValueFormatter::default());
        registry
    }

    /// Registers a formatter under its own name, replacing any previous one.
    pub fn register(&self, formatter: impl ArgumentFormatter + 'static) {
        self.register_arc(Arc::new(formatter));
    }

    /// Registers a shared formatter.
    pub fn register_arc(&self, formatter: Arc<dyn ArgumentFormatter>) {
        let name = formatter.name().to_lowercase();
        tracing::debug!(formatter = %name, "Formatter registered");
        self.formatters.insert(name, formatter);
    }

    /// Removes a formatter. The default formatter cannot be removed.
    pub fn remove(&self, name: &str) -> bool {
        let key = name.to_lowercase();
        if key == self.default_name {
            tracing::warn!(formatter = %name, "Refusing to remove the default formatter");
            return false;
        }
        self.formatters.remove(&key).is_some()
    }

    /// Returns true if a formatter named `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.formatters.contains_key(&name.to_lowercase())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.formatters.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Looks up a formatter; missing or unknown names yield the default.
    pub fn get(&self, name: Option<&str>) -> Arc<dyn ArgumentFormatter> {
        if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
            if let Some(found) = self.formatters.get(&name.to_lowercase()) {
                return Arc::clone(found.value());
            }
            tracing::warn!(formatter = %name, "Unknown formatter, using default");
        }
        self.formatters
            .get(&self.default_name)
            .map(|found| Arc::clone(found.value()))
            .unwrap_or_else(|| Arc::new(JsonFormatter))
    }
}

/// Cuts `text` to `max_length` characters and appends the truncation marker.
///
/// A limit of 0 means unlimited.
pub fn truncate(text: &str, max_length: usize) -> Cow<'_, str> {
    if max_length == 0 {
        return Cow::Borrowed(text);
    }
    match text.char_indices().nth(max_length) {
        Some((cut, _)) => Cow::Owned(format!("{}{}", &text[..cut], TRUNCATION_MARKER)),
        None => Cow::Borrowed(text),
    }
}
