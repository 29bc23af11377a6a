//! Core types shared by the interceptor, the sink and the directive model.
//!
//! - [`LogLevel`]: severity of an emitted event
//! - [`CallPhase`]: lifecycle state of one intercepted call
//! - [`CallSite`]: identity of the intercepted method

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// LogLevel
// =============================================================================

/// Severity of a log event.
///
/// Levels are ordered from most verbose (Trace) to least verbose (Off).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose level.
    Trace,
    /// Debug information useful for development.
    Debug,
    /// General informational messages (default).
    #[default]
    Info,
    /// Potentially problematic situations.
    Warn,
    /// Failures.
    Error,
    /// Logging disabled.
    Off,
}

impl LogLevel {
    /// Checks if a threshold at this level lets events at `target` through.
    pub fn should_log(&self, target: LogLevel) -> bool {
        match self {
            LogLevel::Off => false,
            LogLevel::Error => matches!(target, LogLevel::Error),
            LogLevel::Warn => matches!(target, LogLevel::Error | LogLevel::Warn),
            LogLevel::Info => matches!(target, LogLevel::Error | LogLevel::Warn | LogLevel::Info),
            LogLevel::Debug => !matches!(target, LogLevel::Trace | LogLevel::Off),
            LogLevel::Trace => target != LogLevel::Off,
        }
    }

    /// Returns the lowercase name of this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// CallPhase
// =============================================================================

/// Lifecycle state of one intercepted call.
///
/// ```text
/// NotStarted -> Entered -> Succeeded -> Completed
///                       \-> Failed    -/
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallPhase {
    /// The call has not been entered yet.
    #[default]
    NotStarted,
    /// Entry events have been processed and the call is running.
    Entered,
    /// The call returned a value.
    Succeeded,
    /// The call returned an error or panicked.
    Failed,
    /// Exit processing finished.
    Completed,
}

impl CallPhase {
    /// Returns true if moving from this phase to `next` is a legal transition.
    pub fn can_transition_to(&self, next: CallPhase) -> bool {
        matches!(
            (self, next),
            (CallPhase::NotStarted, CallPhase::Entered)
                | (CallPhase::Entered, CallPhase::Succeeded)
                | (CallPhase::Entered, CallPhase::Failed)
                | (CallPhase::Succeeded, CallPhase::Completed)
                | (CallPhase::Failed, CallPhase::Completed)
        )
    }

    /// Returns the name exposed to expressions as `phase`.
    pub fn as_str(&self) -> &'static str {
        match self {
            CallPhase::NotStarted => "not_started",
            CallPhase::Entered => "entered",
            CallPhase::Succeeded => "succeeded",
            CallPhase::Failed => "failed",
            CallPhase::Completed => "completed",
        }
    }
}

impl fmt::Display for CallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// CallSite
// =============================================================================

/// Identity of an intercepted method.
///
/// Parameters can be marked as ignored; their values are never captured
/// into log output and render as `[ignored:<reason>]` instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallSite {
    class_name: String,
    method_name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    ignored_params: BTreeMap<usize, String>,
}

impl CallSite {
    /// Creates a call site for `class_name.method_name`.
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            ignored_params: BTreeMap::new(),
        }
    }

    /// Marks the parameter at `index` as never logged.
    #[must_use = "This method returns a new CallSite and does not modify self"]
    pub fn with_ignored_param(mut self, index: usize, reason: impl Into<String>) -> Self {
        self.ignored_params.insert(index, reason.into());
        self
    }

    /// Owning type name.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Method name.
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// Returns `Class.method`.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.class_name, self.method_name)
    }

    /// Returns the ignore reason for the parameter at `index`, if any.
    pub fn ignore_reason(&self, index: usize) -> Option<&str> {
        self.ignored_params.get(&index).map(String::as_str)
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class_name, self.method_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_transitions() {
        assert!(CallPhase::NotStarted.can_transition_to(CallPhase::Entered));
        assert!(CallPhase::Entered.can_transition_to(CallPhase::Failed));
        assert!(CallPhase::Succeeded.can_transition_to(CallPhase::Completed));
        assert!(!CallPhase::NotStarted.can_transition_to(CallPhase::Succeeded));
        assert!(!CallPhase::Completed.can_transition_to(CallPhase::Entered));
        assert!(!CallPhase::Succeeded.can_transition_to(CallPhase::Failed));
    }

    #[test]
    fn test_call_site_ignored_params() {
        let site = CallSite::new("UserService", "login").with_ignored_param(1, "credentials");
        assert_eq!(site.qualified_name(), "UserService.login");
        assert_eq!(site.ignore_reason(1), Some("credentials"));
        assert_eq!(site.ignore_reason(0), None);
    }
}
