use std::sync::Arc;
use std::time::{Duration, Instant};

use super::CompiledExpression;
use super::cache::ExpressionCache;
use super::template::{ExpressionType, extract_spans, pure_inner};
use crate::config::EngineConfig;
use crate::context::{Bindings, ExecutionSnapshot};
use crate::error::{EvalError, EvalResult};
use crate::lifecycle::log_cache_cleared;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    FailSafe,
    Strict,
}

/// Evaluates conditions and renders message templates.
///
/// The engine is shared by every intercepted call; its only mutable state is
/// the compiled-expression cache.
pub struct ExpressionEngine {
    config: EngineConfig,
    cache: ExpressionCache,
}

impl std::fmt::Debug for ExpressionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpressionEngine")
            .field("config", &self.config)
            .field("cache_size", &self.cache.len())
            .finish()
    }
}

impl Default for ExpressionEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl ExpressionEngine {
    /// Creates an engine with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        let cache = ExpressionCache::new(config.cache_enabled, config.cache_capacity);
        Self { config, cache }
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Classifies `input` without evaluating it.
    pub fn detect_type(&self, input: &str) -> ExpressionType {
        ExpressionType::detect(input)
    }

    /// Compiles one expression, consulting the cache.
    pub fn compile(&self, source: &str) -> EvalResult<Arc<CompiledExpression>> {
        self.cache.get_or_compile(source, CompiledExpression::compile)
    }

    /// Renders `expression` against `snapshot`.
    ///
    /// Plain text is returned verbatim, a pure expression yields its
    /// stringified value, and a template has each span replaced by its value.
    /// Blank input always yields an empty string.
    ///
    /// In fail-safe mode a failing span is replaced by a bracketed diagnostic
    /// and rendering continues. In strict mode the first failing span aborts
    /// rendering with an error naming it.
    pub fn evaluate(
        &self,
        expression: &str,
        snapshot: Option<&ExecutionSnapshot>,
    ) -> EvalResult<String> {
        self.render(expression, snapshot, self.mode())
    }

    /// Evaluates a single expression to its value rather than its text.
    ///
    /// Accepts either a bare expression or one wrapped in `#{...}`.
    pub fn evaluate_value(
        &self,
        expression: &str,
        snapshot: &ExecutionSnapshot,
    ) -> EvalResult<Value> {
        let inner = pure_inner(expression).unwrap_or(expression);
        let compiled = self.compile(inner)?;
        Ok(compiled.evaluate(Bindings::new(snapshot))?.into_owned())
    }

    /// Evaluates a condition and coerces the rendered text to a boolean.
    ///
    /// Blank conditions are true. Evaluation errors make the condition true
    /// in fail-safe mode and are returned in strict mode.
    pub fn evaluate_condition(
        &self,
        condition: &str,
        snapshot: Option<&ExecutionSnapshot>,
    ) -> EvalResult<bool> {
        if condition.trim().is_empty() {
            return Ok(true);
        }
        match self.render(condition, snapshot, Mode::Strict) {
            Ok(text) => Ok(coerce_to_bool(&text)),
            Err(error) if self.config.fail_safe => {
                tracing::warn!(
                    condition = %condition,
                    error = %error,
                    "Condition evaluation failed, defaulting to true"
                );
                Ok(true)
            }
            Err(error) => Err(error),
        }
    }

    /// Drops every cached compiled expression.
    pub fn clear_cache(&self) {
        let dropped = self.cache.clear();
        log_cache_cleared("expressions", dropped);
    }

    /// Number of cached compiled expressions.
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    fn mode(&self) -> Mode {
        if self.config.fail_safe {
            Mode::FailSafe
        } else {
            Mode::Strict
        }
    }

    fn render(
        &self,
        expression: &str,
        snapshot: Option<&ExecutionSnapshot>,
        mode: Mode,
    ) -> EvalResult<String> {
        if expression.trim().is_empty() {
            return Ok(String::new());
        }

        let kind = ExpressionType::detect(expression);
        if kind == ExpressionType::PlainText {
            return Ok(expression.to_string());
        }

        let Some(snapshot) = snapshot else {
            return match mode {
                Mode::FailSafe => {
                    tracing::warn!(expression = %expression, "No execution context for expression");
                    Ok(format!("[No execution context: {}]", expression.trim()))
                }
                Mode::Strict => Err(EvalError::MissingContext {
                    expression: expression.to_string(),
                }),
            };
        };

        let started = Instant::now();
        let env = Bindings::new(snapshot);
        let rendered = match kind {
            ExpressionType::PureExpression => self.render_pure(expression, env, mode),
            _ => self.render_template(expression, env, mode),
        };
        self.check_duration(expression, started.elapsed());
        rendered
    }

    fn render_pure(&self, expression: &str, env: Bindings<'_>, mode: Mode) -> EvalResult<String> {
        let trimmed = expression.trim();
        let inner = pure_inner(trimmed).unwrap_or(trimmed);
        match self.evaluate_inner(inner, env) {
            Ok(text) => Ok(text),
            Err(error) if mode == Mode::Strict => Err(error.in_span(trimmed)),
            Err(error) => {
                tracing::warn!(expression = %trimmed, error = %error, "Expression evaluation failed");
                Ok(match error {
                    EvalError::ArgsUnavailable { .. } => format!("[Args unavailable: {inner}]"),
                    _ => format!("[Expression evaluation failed: {trimmed}]"),
                })
            }
        }
    }

    fn render_template(
        &self,
        template: &str,
        env: Bindings<'_>,
        mode: Mode,
    ) -> EvalResult<String> {
        let spans = extract_spans(template);
        let mut output = template.to_string();

        // Right to left so earlier offsets stay valid.
        for span in spans.iter().rev() {
            let replacement = match self.evaluate_inner(span.inner, env) {
                Ok(text) => text,
                Err(error) if mode == Mode::Strict => return Err(error.in_span(span.text)),
                Err(error) => {
                    tracing::warn!(span = %span.text, error = %error, "Template span failed");
                    match error {
                        EvalError::ArgsUnavailable { .. } => {
                            format!("[Args unavailable: {}]", span.inner)
                        }
                        _ => format!("[Expression error: {}]", span.inner),
                    }
                }
            };
            output.replace_range(span.start..span.end, &replacement);
        }

        Ok(output)
    }

    fn evaluate_inner(&self, inner: &str, env: Bindings<'_>) -> EvalResult<String> {
        let compiled = self.compile(inner)?;
        let value = compiled.evaluate(env)?;
        Ok(value.to_string())
    }

    fn check_duration(&self, expression: &str, elapsed: Duration) {
        if let Some(threshold) = self.config.slow_evaluation_threshold() {
            if elapsed > threshold {
                tracing::warn!(
                    expression = %expression,
                    elapsed_ms = %elapsed.as_millis(),
                    threshold_ms = %threshold.as_millis(),
                    "Slow expression evaluation"
                );
            }
        }
    }
}

/// Coerces rendered text to a boolean.
///
/// `true`/`false` in any case map directly; numbers are true when non-zero;
/// any other non-empty text is true and empty text is false.
pub fn coerce_to_bool(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        return true;
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return false;
    }
    if let Ok(number) = trimmed.parse::<f64>() {
        return number != 0.0;
    }
    !trimmed.is_empty()
}
