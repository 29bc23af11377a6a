//! State of one intercepted call.

use chrono::Utc;
use serde::Serialize;
use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::Interceptor;
use super::details::{Details, compose};
use crate::constants::MISSING_TRACE_ID;
use crate::context::{ErrorInfo, ExecutionSnapshot};
use crate::directive::{Directive, DirectiveSet};
use crate::handler::{ErrorKind, resolve};
use crate::sink::LogEvent;
use crate::types::{CallPhase, CallSite, LogLevel};
use crate::value::Value;

/// Lifecycle of one call: `NotStarted -> Entered -> Succeeded|Failed -> Completed`.
///
/// Every method here runs on the logging path; none of them may affect the
/// outcome of the intercepted call.
pub(super) struct ActiveCall<'a> {
    interceptor: &'a Interceptor,
    site: &'a CallSite,
    directives: Vec<&'a Directive>,
    trace_id: Option<String>,
    args: Option<Arc<Value>>,
    phase: CallPhase,
    started: Instant,
    snapshot: ExecutionSnapshot,
}

impl<'a> ActiveCall<'a> {
    /// Applies the global filters; returns None when nothing would be logged.
    pub(super) fn begin(
        interceptor: &'a Interceptor,
        site: &'a CallSite,
        directives: &'a DirectiveSet,
        args: Option<Vec<Value>>,
    ) -> Option<Self> {
        let config = &interceptor.config;
        if !config.enabled || directives.is_empty() {
            return None;
        }
        if config.is_excluded(&site.qualified_name()) {
            tracing::trace!(site = %site, "Call site excluded from logging");
            return None;
        }
        let active: Vec<&Directive> = directives
            .iter()
            .filter(|d| config.accepts(&d.tags, &d.group))
            .collect();
        if active.is_empty() {
            tracing::trace!(site = %site, "No directive passed the tag and group filters");
            return None;
        }

        let trace_id = interceptor.trace_ids.current().map(|id| id.into_string());
        if trace_id.is_none() {
            tracing::warn!(site = %site, "No trace id established for intercepted call");
        }
        let args = args.map(|list| Arc::new(Value::List(list)));
        let snapshot = interceptor
            .base_snapshot(site)
            .maybe_trace_id(trace_id.clone())
            .shared_args(args.clone())
            .build();

        Some(Self {
            interceptor,
            site,
            directives: active,
            trace_id,
            args,
            phase: CallPhase::NotStarted,
            started: Instant::now(),
            snapshot,
        })
    }

    fn trace_id(&self) -> &str {
        self.trace_id.as_deref().unwrap_or(MISSING_TRACE_ID)
    }

    fn transition(&mut self, next: CallPhase) -> bool {
        if !self.phase.can_transition_to(next) {
            tracing::warn!(
                site = %self.site,
                from = %self.phase,
                to = %next,
                "Illegal call phase transition"
            );
            return false;
        }
        self.phase = next;
        true
    }

    fn next_snapshot(&self, phase: CallPhase) -> crate::context::SnapshotBuilder {
        self.snapshot.to_builder().phase(phase)
    }

    /// Emits enter events.
    pub(super) fn enter(&mut self) {
        if !self.transition(CallPhase::Entered) {
            return;
        }
        self.snapshot = self.next_snapshot(CallPhase::Entered).build();
        self.started = Instant::now();

        for &directive in &self.directives {
            if !self.condition_holds(directive) {
                continue;
            }
            let Some(template) = non_blank(directive.enter_message.as_deref()) else {
                continue;
            };
            let message = self.render(template, || format!("Entering: {}", self.site.method_name()));
            let details = self.base_details(directive).render();
            self.emit(directive.level, &directive.tags, message, details, None, None);
        }
    }

    /// Emits exit events for a successful call.
    pub(super) fn succeed<T: Serialize + ?Sized>(&mut self, result: &T) {
        let elapsed = self.started.elapsed();
        if !self.transition(CallPhase::Succeeded) {
            return;
        }
        let result = Value::capture(result);
        self.snapshot = self
            .next_snapshot(CallPhase::Succeeded)
            .result(result.clone())
            .elapsed(elapsed)
            .build();

        for &directive in &self.directives {
            if !self.condition_holds(directive) {
                continue;
            }
            let template = non_blank(directive.exit_message.as_deref())
                .or_else(|| non_blank(directive.message.as_deref()));
            let message = match template {
                Some(template) => self.render(template, || self.completed_message()),
                None => self.completed_message(),
            };

            let mut details = self.base_details(directive);
            if directive.log_result && !result.is_null() {
                details = details.push(
                    "Result",
                    self.interceptor.serializer.serialize_value(
                        &result,
                        directive.result_formatter.as_deref(),
                        directive.max_result_length,
                    ),
                );
            }
            if directive.log_execution_time {
                details = details.push("ExecutionTime", format_args!("{}ms", elapsed.as_millis()));
            }
            self.emit(
                directive.level,
                &directive.tags,
                message,
                details.render(),
                Some(elapsed),
                None,
            );
        }
        self.check_slow(elapsed);
    }

    /// Emits failure events.
    pub(super) fn fail(&mut self, error: ErrorInfo) {
        let elapsed = self.started.elapsed();
        if !self.transition(CallPhase::Failed) {
            return;
        }
        self.snapshot = self
            .next_snapshot(CallPhase::Failed)
            .error(error.clone())
            .elapsed(elapsed)
            .build();

        for &directive in &self.directives {
            if !directive.log_exception || !self.condition_holds(directive) {
                continue;
            }
            let rule = resolve(&error.kind, &directive.handlers);
            let template = non_blank(rule.message.as_deref())
                .or_else(|| non_blank(directive.exception_message.as_deref()))
                .or_else(|| non_blank(directive.message.as_deref()));
            let message = match template {
                Some(template) => self.render(template, || self.failed_message()),
                None => self.failed_message(),
            };

            let mut details = self.base_details(directive);
            if directive.log_execution_time {
                details = details.push("ExecutionTime", format_args!("{}ms", elapsed.as_millis()));
            }
            details = details.push("Exception", format_args!("{}: {}", error.kind, error.message));

            let mut attached = error.clone();
            if !rule.include_stack_trace {
                attached.chain.clear();
            }
            self.emit(
                rule.level,
                &directive.tags,
                message,
                details.render(),
                Some(elapsed),
                Some(attached),
            );
        }
        self.check_slow(elapsed);
    }

    /// Emits failure events for a panic payload.
    pub(super) fn fail_with_panic(&mut self, payload: &(dyn Any + Send)) {
        self.fail(ErrorInfo::new("panic", ErrorKind::panic(), panic_message(payload)));
    }

    /// Closes the lifecycle.
    pub(super) fn complete(&mut self) {
        if self.transition(CallPhase::Completed) {
            tracing::trace!(site = %self.site, trace_id = %self.trace_id(), "Intercepted call completed");
        }
    }

    fn completed_message(&self) -> String {
        format!("Completed: {}", self.site.method_name())
    }

    fn failed_message(&self) -> String {
        format!("Failed: {}", self.site.method_name())
    }

    fn condition_holds(&self, directive: &Directive) -> bool {
        let Some(condition) = non_blank(directive.condition.as_deref()) else {
            return true;
        };
        match self
            .interceptor
            .engine
            .evaluate_condition(condition, Some(&self.snapshot))
        {
            Ok(holds) => holds,
            Err(error) => {
                tracing::warn!(
                    site = %self.site,
                    condition = %condition,
                    error = %error,
                    "Condition evaluation failed, logging anyway"
                );
                true
            }
        }
    }

    fn render(&self, template: &str, fallback: impl FnOnce() -> String) -> String {
        match self.interceptor.engine.evaluate(template, Some(&self.snapshot)) {
            Ok(message) => message,
            Err(error) => {
                tracing::warn!(
                    site = %self.site,
                    template = %template,
                    error = %error,
                    "Message rendering failed, using default message"
                );
                fallback()
            }
        }
    }

    fn base_details(&self, directive: &Directive) -> Details {
        let details = Details::new(self.trace_id()).tags(&directive.tags);
        if !directive.log_args {
            return details;
        }
        match self.args.as_deref().and_then(Value::as_list) {
            Some(args) => details.push(
                "Args",
                self.interceptor.serializer.serialize_args(
                    self.site,
                    args,
                    &directive.excluded_args,
                    directive.args_formatter.as_deref(),
                    directive.max_arg_length,
                ),
            ),
            None => details,
        }
    }

    fn check_slow(&self, elapsed: Duration) {
        let Some(threshold) = self.interceptor.config.slow_call_threshold() else {
            return;
        };
        if elapsed <= threshold {
            return;
        }
        let message = format!(
            "Slow call: {} took {}ms (threshold {}ms)",
            self.site,
            elapsed.as_millis(),
            threshold.as_millis()
        );
        let details = Details::new(self.trace_id()).render();
        self.emit(LogLevel::Warn, &Default::default(), message, details, Some(elapsed), None);
    }

    fn emit(
        &self,
        level: LogLevel,
        tags: &std::collections::BTreeSet<String>,
        message: String,
        details: String,
        elapsed: Option<Duration>,
        error: Option<ErrorInfo>,
    ) {
        if !self.interceptor.config.min_level.should_log(level) {
            return;
        }
        let event = LogEvent {
            timestamp: Utc::now(),
            level,
            phase: self.phase,
            trace_id: self.trace_id().to_string(),
            class_name: self.site.class_name().to_string(),
            method_name: self.site.method_name().to_string(),
            tags: tags.clone(),
            text: compose(&details, &message, self.interceptor.config.max_message_length),
            message,
            details,
            elapsed_ms: elapsed.map(|d| d.as_millis() as u64),
            error,
        };
        self.interceptor.deliver(&event);
    }
}

fn non_blank(template: Option<&str>) -> Option<&str> {
    template.filter(|t| !t.trim().is_empty())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
