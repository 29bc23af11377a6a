//! Template classification, span extraction and expression normalization.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::LazyLock;

use super::lexer::{is_ident_continue, is_ident_start};
use super::parser::is_keyword;

static SPAN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\{([^}]+)\}").expect("span pattern is valid"));

static PURE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#\{([^}]+)\}$").expect("pure pattern is valid"));

/// How an input string is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpressionType {
    /// No `#{...}` spans; returned verbatim.
    PlainText,
    /// The whole trimmed input is a single `#{...}` span.
    PureExpression,
    /// Literal text interleaved with one or more spans.
    Template,
}

impl ExpressionType {
    /// Classifies `input`.
    pub fn detect(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            ExpressionType::PlainText
        } else if PURE_PATTERN.is_match(trimmed) {
            ExpressionType::PureExpression
        } else if SPAN_PATTERN.is_match(trimmed) {
            ExpressionType::Template
        } else {
            ExpressionType::PlainText
        }
    }
}

/// One `#{...}` region of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span<'s> {
    /// The span including its delimiters.
    pub text: &'s str,
    /// The expression between the delimiters.
    pub inner: &'s str,
    /// Byte offset of `#`.
    pub start: usize,
    /// Byte offset one past `}`.
    pub end: usize,
}

/// Extracts every span of `template` in one left-to-right pass.
pub fn extract_spans(template: &str) -> Vec<Span<'_>> {
    SPAN_PATTERN
        .captures_iter(template)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let inner = caps.get(1)?;
            Some(Span {
                text: whole.as_str(),
                inner: inner.as_str(),
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

/// Returns the inner expression of a pure-expression input.
pub(crate) fn pure_inner(input: &str) -> Option<&str> {
    PURE_PATTERN
        .captures(input.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Rewrites a leading bare identifier into a variable reference.
///
/// `args[0]` becomes `#args[0]`, `result.ok` becomes `#result.ok` and a
/// lone `args` becomes `#args`. Only the start of the expression is
/// rewritten; literals, keywords and already-prefixed references are left
/// alone.
pub fn normalize(expression: &str) -> Cow<'_, str> {
    let trimmed = expression.trim();
    let mut chars = trimmed.char_indices();
    match chars.next() {
        Some((_, first)) if is_ident_start(first) => {}
        _ => return Cow::Borrowed(trimmed),
    }

    let ident_end = chars
        .find(|(_, c)| !is_ident_continue(*c))
        .map_or(trimmed.len(), |(i, _)| i);
    let ident = &trimmed[..ident_end];
    let rest = &trimmed[ident_end..];

    let rewritable = rest.is_empty() || rest.starts_with('[') || rest.starts_with('.');
    if rewritable && !is_keyword(ident) {
        Cow::Owned(format!("#{trimmed}"))
    } else {
        Cow::Borrowed(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() {
        assert_eq!(ExpressionType::detect(""), ExpressionType::PlainText);
        assert_eq!(ExpressionType::detect("   "), ExpressionType::PlainText);
        assert_eq!(ExpressionType::detect("hello"), ExpressionType::PlainText);
        assert_eq!(ExpressionType::detect(" #{args[0]} "), ExpressionType::PureExpression);
        assert_eq!(ExpressionType::detect("id=#{args[0]}"), ExpressionType::Template);
        assert_eq!(ExpressionType::detect("#{a}#{b}"), ExpressionType::Template);
        assert_eq!(ExpressionType::detect("#{}"), ExpressionType::PlainText);
    }

    #[test]
    fn test_extract_spans_offsets() {
        let template = "User ID=#{args[0]}, Name=#{args[1]}";
        let spans = extract_spans(template);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].inner, "args[0]");
        assert_eq!(&template[spans[0].start..spans[0].end], "#{args[0]}");
        assert_eq!(spans[1].text, "#{args[1]}");
        assert!(spans[0].end <= spans[1].start);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("args[0]"), "#args[0]");
        assert_eq!(normalize("result.ok"), "#result.ok");
        assert_eq!(normalize("args"), "#args");
        assert_eq!(normalize("#args[0]"), "#args[0]");
        assert_eq!(normalize("'text'"), "'text'");
        assert_eq!(normalize("true"), "true");
        assert_eq!(normalize("not #flag"), "not #flag");
        assert_eq!(normalize("args[0] > 5"), "#args[0] > 5");
        assert_eq!(normalize("count > 5"), "count > 5");
    }
}
