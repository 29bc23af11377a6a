//! Directive model and registry.
//!
//! A [`Directive`] is the declarative description of how one call is logged:
//! level, message templates, condition, what to serialize and how failures
//! are handled. Directives attach to a call site at method level or class
//! level, either singly or as a repeated list. [`DirectiveSet`] holds the
//! four buckets for one site and always yields them in the same order:
//!
//! 1. method-level single
//! 2. method-level repeated
//! 3. class-level single
//! 4. class-level repeated
//!
//! # Example
//!
//! ```rust,ignore
//! use interlog::{CallSite, Directive, DirectiveRegistry, LogLevel};
//!
//! let registry = DirectiveRegistry::new()
//!     .with_method("UserService", "find", Directive::new().with_log_args(true))
//!     .with_class("UserService", Directive::new().with_level(LogLevel::Debug))
//!     .with_ignored("UserService", "health");
//!
//! let set = registry.resolve(&CallSite::new("UserService", "find")).unwrap();
//! assert_eq!(set.len(), 2);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::constants::{DEFAULT_GROUP, DEFAULT_MAX_LENGTH};
use crate::handler::HandlerRule;
use crate::lifecycle::log_directive_registered;
use crate::types::{CallSite, LogLevel};

// =============================================================================
// Directive
// =============================================================================

/// Declarative logging configuration for one call.
///
/// Templates may embed `#{...}` expressions over the call's variables
/// (`args`, `result`, `exception`, `methodName`, `className`,
/// `executionTime`, `traceId`, `phase`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Directive {
    /// Level of the enter and exit events (default: Info)
    pub level: LogLevel,
    /// General message template, used when no phase template applies
    pub message: Option<String>,
    /// Condition gating the events; absent or blank means always
    pub condition: Option<String>,
    /// Tags matched against the interceptor's enabled tags
    pub tags: BTreeSet<String>,
    /// Group matched against the interceptor's enabled groups (default: "default")
    pub group: String,
    /// Append serialized arguments to the details line (default: false)
    pub log_args: bool,
    /// Append the serialized result to the details line (default: false)
    pub log_result: bool,
    /// Append the elapsed time to exit and failure events (default: true)
    pub log_execution_time: bool,
    /// Emit an event when the call fails (default: true)
    pub log_exception: bool,
    /// Argument indices rendered as `[excluded]`
    pub excluded_args: BTreeSet<usize>,
    /// Maximum serialized argument length; 0 = unlimited (default: 1000)
    pub max_arg_length: usize,
    /// Maximum serialized result length; 0 = unlimited (default: 1000)
    pub max_result_length: usize,
    /// Template for the enter event; no enter event without it
    pub enter_message: Option<String>,
    /// Template for the exit event
    pub exit_message: Option<String>,
    /// Template for the failure event
    pub exception_message: Option<String>,
    /// Ordered failure handling rules
    pub handlers: Vec<HandlerRule>,
    /// Formatter for arguments (default: json)
    pub args_formatter: Option<String>,
    /// Formatter for the result (default: json)
    pub result_formatter: Option<String>,
}

impl Default for Directive {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            message: None,
            condition: None,
            tags: BTreeSet::new(),
            group: DEFAULT_GROUP.to_string(),
            log_args: false,
            log_result: false,
            log_execution_time: true,
            log_exception: true,
            excluded_args: BTreeSet::new(),
            max_arg_length: DEFAULT_MAX_LENGTH,
            max_result_length: DEFAULT_MAX_LENGTH,
            enter_message: None,
            exit_message: None,
            exception_message: None,
            handlers: Vec::new(),
            args_formatter: None,
            result_formatter: None,
        }
    }
}

impl Directive {
    /// Create a directive with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the event level.
    #[must_use = "This method returns a new Directive and does not modify self"]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Set the general message template.
    #[must_use = "This method returns a new Directive and does not modify self"]
    pub fn with_message(mut self, template: impl Into<String>) -> Self {
        self.message = Some(template.into());
        self
    }

    /// Set the condition template.
    #[must_use = "This method returns a new Directive and does not modify self"]
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Add a tag.
    #[must_use = "This method returns a new Directive and does not modify self"]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Set the group.
    #[must_use = "This method returns a new Directive and does not modify self"]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Log serialized arguments.
    #[must_use = "This method returns a new Directive and does not modify self"]
    pub fn with_log_args(mut self, enabled: bool) -> Self {
        self.log_args = enabled;
        self
    }

    /// Log the serialized result.
    #[must_use = "This method returns a new Directive and does not modify self"]
    pub fn with_log_result(mut self, enabled: bool) -> Self {
        self.log_result = enabled;
        self
    }

    /// Log the elapsed time.
    #[must_use = "This method returns a new Directive and does not modify self"]
    pub fn with_log_execution_time(mut self, enabled: bool) -> Self {
        self.log_execution_time = enabled;
        self
    }

    /// Log failures.
    #[must_use = "This method returns a new Directive and does not modify self"]
    pub fn with_log_exception(mut self, enabled: bool) -> Self {
        self.log_exception = enabled;
        self
    }

    /// Exclude the argument at `index` from serialized output.
    #[must_use = "This method returns a new Directive and does not modify self"]
    pub fn with_excluded_arg(mut self, index: usize) -> Self {
        self.excluded_args.insert(index);
        self
    }

    /// Set the maximum serialized argument length.
    #[must_use = "This method returns a new Directive and does not modify self"]
    pub fn with_max_arg_length(mut self, max: usize) -> Self {
        self.max_arg_length = max;
        self
    }

    /// Set the maximum serialized result length.
    #[must_use = "This method returns a new Directive and does not modify self"]
    pub fn with_max_result_length(mut self, max: usize) -> Self {
        self.max_result_length = max;
        self
    }

    /// Set the enter event template.
    #[must_use = "This method returns a new Directive and does not modify self"]
    pub fn with_enter_message(mut self, template: impl Into<String>) -> Self {
        self.enter_message = Some(template.into());
        self
    }

    /// Set the exit event template.
    #[must_use = "This method returns a new Directive and does not modify self"]
    pub fn with_exit_message(mut self, template: impl Into<String>) -> Self {
        self.exit_message = Some(template.into());
        self
    }

    /// Set the failure event template.
    #[must_use = "This method returns a new Directive and does not modify self"]
    pub fn with_exception_message(mut self, template: impl Into<String>) -> Self {
        self.exception_message = Some(template.into());
        self
    }

    /// Append a failure handling rule.
    #[must_use = "This method returns a new Directive and does not modify self"]
    pub fn with_handler(mut self, rule: HandlerRule) -> Self {
        self.handlers.push(rule);
        self
    }

    /// Select the argument formatter by name.
    #[must_use = "This method returns a new Directive and does not modify self"]
    pub fn with_args_formatter(mut self, name: impl Into<String>) -> Self {
        self.args_formatter = Some(name.into());
        self
    }

    /// Select the result formatter by name.
    #[must_use = "This method returns a new Directive and does not modify self"]
    pub fn with_result_formatter(mut self, name: impl Into<String>) -> Self {
        self.result_formatter = Some(name.into());
        self
    }
}

// =============================================================================
// DirectiveSet
// =============================================================================

/// The directives that apply to one call site, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectiveSet {
    /// Single method-level directive.
    pub method_single: Option<Directive>,
    /// Repeated method-level directives.
    pub method_repeated: Vec<Directive>,
    /// Single class-level directive.
    pub class_single: Option<Directive>,
    /// Repeated class-level directives.
    pub class_repeated: Vec<Directive>,
}

impl DirectiveSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set holding one method-level directive.
    pub fn single(directive: Directive) -> Self {
        Self {
            method_single: Some(directive),
            ..Self::default()
        }
    }

    /// Iterates method single, method repeated, class single, class repeated.
    pub fn iter(&self) -> impl Iterator<Item = &Directive> {
        self.method_single
            .iter()
            .chain(&self.method_repeated)
            .chain(self.class_single.iter())
            .chain(&self.class_repeated)
    }

    /// Total number of directives.
    pub fn len(&self) -> usize {
        self.method_single.iter().count()
            + self.method_repeated.len()
            + self.class_single.iter().count()
            + self.class_repeated.len()
    }

    /// Returns true if no directive applies.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Directive> for DirectiveSet {
    fn from(directive: Directive) -> Self {
        Self::single(directive)
    }
}

/// Collects directives as repeated method-level directives, keeping order.
impl FromIterator<Directive> for DirectiveSet {
    fn from_iter<I: IntoIterator<Item = Directive>>(iter: I) -> Self {
        Self {
            method_repeated: iter.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl<'a> IntoIterator for &'a DirectiveSet {
    type Item = &'a Directive;
    type IntoIter = Box<dyn Iterator<Item = &'a Directive> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

// =============================================================================
// DirectiveRegistry
// =============================================================================

#[derive(Debug, Clone, Default)]
struct Attached {
    single: Option<Directive>,
    repeated: Vec<Directive>,
}

/// Explicit registration of directives per call site.
///
/// Method-level entries are keyed by `Class.method`, class-level entries by
/// `Class`. The registry is built once and then only read.
#[derive(Debug, Clone, Default)]
pub struct DirectiveRegistry {
    methods: HashMap<String, Attached>,
    classes: HashMap<String, Attached>,
    ignored: HashSet<String>,
}

impl DirectiveRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the single method-level directive, replacing a previous one.
    #[must_use = "This method returns a new DirectiveRegistry and does not modify self"]
    pub fn with_method(mut self, class: &str, method: &str, directive: Directive) -> Self {
        let key = format!("{class}.{method}");
        log_directive_registered(&key, "method");
        let slot = self.methods.entry(key).or_default();
        if slot.single.replace(directive).is_some() {
            tracing::warn!(class = %class, method = %method, "Replacing method-level directive");
        }
        self
    }

    /// Appends repeated method-level directives.
    #[must_use = "This method returns a new DirectiveRegistry and does not modify self"]
    pub fn with_method_repeated(
        mut self,
        class: &str,
        method: &str,
        directives: impl IntoIterator<Item = Directive>,
    ) -> Self {
        let key = format!("{class}.{method}");
        log_directive_registered(&key, "method");
        self.methods.entry(key).or_default().repeated.extend(directives);
        self
    }

    /// Sets the single class-level directive, replacing a previous one.
    #[must_use = "This method returns a new DirectiveRegistry and does not modify self"]
    pub fn with_class(mut self, class: &str, directive: Directive) -> Self {
        log_directive_registered(class, "class");
        let slot = self.classes.entry(class.to_string()).or_default();
        if slot.single.replace(directive).is_some() {
            tracing::warn!(class = %class, "Replacing class-level directive");
        }
        self
    }

    /// Appends repeated class-level directives.
    #[must_use = "This method returns a new DirectiveRegistry and does not modify self"]
    pub fn with_class_repeated(
        mut self,
        class: &str,
        directives: impl IntoIterator<Item = Directive>,
    ) -> Self {
        log_directive_registered(class, "class");
        self.classes
            .entry(class.to_string())
            .or_default()
            .repeated
            .extend(directives);
        self
    }

    /// Marks `Class.method` as never logged, whatever its class directives say.
    #[must_use = "This method returns a new DirectiveRegistry and does not modify self"]
    pub fn with_ignored(mut self, class: &str, method: &str) -> Self {
        let key = format!("{class}.{method}");
        log_directive_registered(&key, "ignored");
        self.ignored.insert(key);
        self
    }

    /// Returns true if the site is marked as ignored.
    pub fn is_ignored(&self, site: &CallSite) -> bool {
        self.ignored.contains(&site.qualified_name())
    }

    /// Collects the directives for `site`.
    ///
    /// Returns None when the site is ignored or nothing is registered for it.
    pub fn resolve(&self, site: &CallSite) -> Option<DirectiveSet> {
        let key = site.qualified_name();
        if self.ignored.contains(&key) {
            return None;
        }
        let method = self.methods.get(&key);
        let class = self.classes.get(site.class_name());
        if method.is_none() && class.is_none() {
            return None;
        }
        let (method_single, method_repeated) = split(method);
        let (class_single, class_repeated) = split(class);
        let set = DirectiveSet {
            method_single,
            method_repeated,
            class_single,
            class_repeated,
        };
        (!set.is_empty()).then_some(set)
    }

    /// Number of registered method and class keys.
    pub fn len(&self) -> usize {
        self.methods.len() + self.classes.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty() && self.classes.is_empty()
    }
}

fn split(attached: Option<&Attached>) -> (Option<Directive>, Vec<Directive>) {
    attached
        .map(|a| (a.single.clone(), a.repeated.clone()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(message: &str) -> Directive {
        Directive::new().with_message(message)
    }

    #[test]
    fn test_directive_defaults() {
        let directive = Directive::default();
        assert_eq!(directive.level, LogLevel::Info);
        assert_eq!(directive.group, "default");
        assert!(!directive.log_args);
        assert!(!directive.log_result);
        assert!(directive.log_execution_time);
        assert!(directive.log_exception);
        assert_eq!(directive.max_arg_length, 1000);
        assert_eq!(directive.max_result_length, 1000);
    }

    #[test]
    fn test_directive_deserializes_with_defaults() {
        let directive: Directive =
            serde_json::from_str(r#"{"level":"debug","log_args":true}"#).unwrap();
        assert_eq!(directive.level, LogLevel::Debug);
        assert!(directive.log_args);
        assert!(directive.log_exception);
        assert_eq!(directive.group, "default");
    }

    #[test]
    fn test_resolve_preserves_bucket_order() {
        let registry = DirectiveRegistry::new()
            .with_class_repeated("Svc", [named("c1"), named("c2")])
            .with_class("Svc", named("cs"))
            .with_method_repeated("Svc", "get", [named("m1"), named("m2")])
            .with_method("Svc", "get", named("ms"));

        let set = registry.resolve(&CallSite::new("Svc", "get")).unwrap();
        let order: Vec<_> = set.iter().filter_map(|d| d.message.as_deref()).collect();
        assert_eq!(order, vec!["ms", "m1", "m2", "cs", "c1", "c2"]);
    }

    #[test]
    fn test_class_directives_apply_to_every_method() {
        let registry = DirectiveRegistry::new().with_class("Svc", named("cs"));
        let set = registry.resolve(&CallSite::new("Svc", "other")).unwrap();
        assert_eq!(set.len(), 1);
        assert!(registry.resolve(&CallSite::new("Other", "get")).is_none());
    }

    #[test]
    fn test_ignored_site_resolves_to_none() {
        let registry = DirectiveRegistry::new()
            .with_class("Svc", named("cs"))
            .with_ignored("Svc", "health");
        assert!(registry.is_ignored(&CallSite::new("Svc", "health")));
        assert!(registry.resolve(&CallSite::new("Svc", "health")).is_none());
        assert!(registry.resolve(&CallSite::new("Svc", "get")).is_some());
    }

    #[test]
    fn test_collected_set_keeps_order() {
        let set: DirectiveSet = vec![named("a"), named("b")].into_iter().collect();
        let order: Vec<_> = (&set).into_iter().filter_map(|d| d.message.as_deref()).collect();
        assert_eq!(order, vec!["a", "b"]);
    }
}
