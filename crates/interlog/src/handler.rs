//! Exception handler resolution.
//!
//! Failures are classified into a dotted [`ErrorKind`] hierarchy such as
//! `runtime.illegal_state`. A kind is a supertype of every kind it is a strict
//! segment prefix of, so a rule for `runtime` also covers
//! `runtime.illegal_state`.
//!
//! [`resolve`] picks exactly one [`HandlerRule`] for a failure:
//!
//! 1. the first rule whose selector equals the kind,
//! 2. else the first rule, in declaration order, whose selector is a supertype,
//! 3. else a synthesized fallback (error level, stack trace included).
//!
//! # Example
//! ```rust,ignore
//! use interlog::{ErrorKind, HandlerRule, LogLevel, resolve};
//!
//! let rules = vec![HandlerRule::new("runtime", LogLevel::Warn)];
//! let rule = resolve(&ErrorKind::new("runtime.illegal_state"), &rules);
//! assert_eq!(rule.level, LogLevel::Warn);
//! ```

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

use crate::constants::PANIC_KIND;
use crate::error::EvalError;
use crate::pattern::is_segment_prefix;
use crate::types::LogLevel;

// =============================================================================
// ErrorKind
// =============================================================================

/// Hierarchical, dot-separated failure kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorKind(Cow<'static, str>);

impl ErrorKind {
    /// Creates a kind from a static path.
    pub const fn from_static(path: &'static str) -> Self {
        Self(Cow::Borrowed(path))
    }

    /// Creates a kind from a dotted path.
    pub fn new(path: impl Into<String>) -> Self {
        Self(Cow::Owned(path.into()))
    }

    /// Kind assigned to panics raised by an intercepted call.
    pub const fn panic() -> Self {
        Self::from_static(PANIC_KIND)
    }

    /// Returns the dotted path.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if `self` is a strict ancestor of `other`.
    pub fn is_supertype_of(&self, other: &ErrorKind) -> bool {
        is_segment_prefix(self.as_str(), other.as_str())
    }

    /// Returns the immediate parent kind, if any.
    pub fn parent(&self) -> Option<ErrorKind> {
        self.as_str()
            .rsplit_once('.')
            .map(|(parent, _)| ErrorKind::new(parent))
    }

    /// Appends a child segment.
    pub fn child(&self, segment: &str) -> ErrorKind {
        ErrorKind::new(format!("{}.{}", self.as_str(), segment))
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for ErrorKind {
    fn from(path: &'static str) -> Self {
        Self::from_static(path)
    }
}

impl From<String> for ErrorKind {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

// =============================================================================
// Classify
// =============================================================================

/// Maps an error value onto the [`ErrorKind`] hierarchy.
///
/// Implement this for the error types returned by intercepted calls.
pub trait Classify {
    /// Kind of this failure.
    fn error_kind(&self) -> ErrorKind;

    /// Messages of the underlying causes, outermost first.
    fn source_chain(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Collects the `source()` messages of an error, outermost first.
pub fn source_chain_of(error: &(dyn std::error::Error + 'static)) -> Vec<String> {
    let mut chain = Vec::new();
    let mut current = error.source();
    while let Some(cause) = current {
        chain.push(cause.to_string());
        current = cause.source();
    }
    chain
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

impl Classify for std::io::Error {
    fn error_kind(&self) -> ErrorKind {
        ErrorKind::new(format!("io.{}", snake_case(&format!("{:?}", self.kind()))))
    }

    fn source_chain(&self) -> Vec<String> {
        source_chain_of(self)
    }
}

impl Classify for serde_json::Error {
    fn error_kind(&self) -> ErrorKind {
        let category = match self.classify() {
            serde_json::error::Category::Io => "io",
            serde_json::error::Category::Syntax => "syntax",
            serde_json::error::Category::Data => "data",
            serde_json::error::Category::Eof => "eof",
        };
        ErrorKind::new(format!("serde.json.{category}"))
    }
}

impl Classify for std::fmt::Error {
    fn error_kind(&self) -> ErrorKind {
        ErrorKind::from_static("fmt")
    }
}

impl Classify for EvalError {
    fn error_kind(&self) -> ErrorKind {
        ErrorKind::new(format!("interlog.eval.{}", self.code().to_ascii_lowercase()))
    }

    fn source_chain(&self) -> Vec<String> {
        source_chain_of(self)
    }
}

impl Classify for Box<dyn std::error::Error + Send + Sync> {
    fn error_kind(&self) -> ErrorKind {
        ErrorKind::from_static("error")
    }

    fn source_chain(&self) -> Vec<String> {
        source_chain_of(self.as_ref())
    }
}

impl Classify for String {
    fn error_kind(&self) -> ErrorKind {
        ErrorKind::from_static("error")
    }
}

impl Classify for &str {
    fn error_kind(&self) -> ErrorKind {
        ErrorKind::from_static("error")
    }
}

// =============================================================================
// HandlerRule
// =============================================================================

/// How failures of one kind are logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerRule {
    /// Kind this rule handles, including its subtypes.
    pub selector: ErrorKind,
    /// Level of the emitted event.
    pub level: LogLevel,
    /// Message template; when absent the directive's messages apply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Whether the error's source chain is attached to the event.
    #[serde(default = "default_include_stack_trace")]
    pub include_stack_trace: bool,
}

fn default_include_stack_trace() -> bool {
    true
}

impl HandlerRule {
    /// Creates a rule for `selector` at `level`, with stack traces included.
    pub fn new(selector: impl Into<ErrorKind>, level: LogLevel) -> Self {
        Self {
            selector: selector.into(),
            level,
            message: None,
            include_stack_trace: true,
        }
    }

    /// Sets the message template.
    #[must_use = "This method returns a new HandlerRule and does not modify self"]
    pub fn with_message(mut self, template: impl Into<String>) -> Self {
        self.message = Some(template.into());
        self
    }

    /// Sets whether the source chain is attached.
    #[must_use = "This method returns a new HandlerRule and does not modify self"]
    pub fn with_stack_trace(mut self, include: bool) -> Self {
        self.include_stack_trace = include;
        self
    }

    /// Rule used when no declared rule matches `kind`.
    pub fn fallback(kind: &ErrorKind) -> Self {
        Self {
            selector: kind.clone(),
            level: LogLevel::Error,
            message: None,
            include_stack_trace: true,
        }
    }
}

/// Resolves the handler rule for a failure of `kind`.
///
/// Never fails: when no rule matches, a fallback rule is synthesized.
pub fn resolve<'r>(kind: &ErrorKind, rules: &'r [HandlerRule]) -> Cow<'r, HandlerRule> {
    if let Some(rule) = rules.iter().find(|rule| rule.selector == *kind) {
        tracing::trace!(kind = %kind, selector = %rule.selector, "Handler matched exactly");
        return Cow::Borrowed(rule);
    }

    if let Some(rule) = rules.iter().find(|rule| rule.selector.is_supertype_of(kind)) {
        tracing::trace!(kind = %kind, selector = %rule.selector, "Handler matched by supertype");
        return Cow::Borrowed(rule);
    }

    tracing::trace!(kind = %kind, "No handler matched, using fallback");
    Cow::Owned(HandlerRule::fallback(kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_kind() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert_eq!(err.error_kind().as_str(), "io.not_found");
        assert!(ErrorKind::from_static("io").is_supertype_of(&err.error_kind()));
    }

    #[test]
    fn test_kind_parent_and_child() {
        let kind = ErrorKind::new("runtime.illegal_state");
        assert_eq!(kind.parent(), Some(ErrorKind::new("runtime")));
        assert_eq!(ErrorKind::new("runtime").child("io").as_str(), "runtime.io");
        assert_eq!(ErrorKind::new("runtime").parent(), None);
    }
}
