//! Error types for expression evaluation.
//!
//! Evaluation errors only surface to callers in strict mode. In fail-safe
//! mode the engine renders a bracketed diagnostic in place of the failing
//! span and reports the error through `tracing` instead.
//!
//! # Example
//! ```rust,ignore
//! use interlog::{EngineConfig, EvalError, ExpressionEngine};
//!
//! let engine = ExpressionEngine::new(EngineConfig::strict());
//! match engine.evaluate("#{args[0]}", None) {
//!     Err(EvalError::MissingContext { expression }) => assert_eq!(expression, "#{args[0]}"),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use thiserror::Error;

/// Error raised while compiling or evaluating an embedded expression.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum EvalError {
    /// The expression text is not valid in the expression grammar.
    #[error("cannot parse `{expression}` at offset {offset}: {message}")]
    Parse {
        /// Expression source text.
        expression: String,
        /// Byte offset of the offending token.
        offset: usize,
        /// What the parser expected.
        message: String,
    },

    /// A variable is referenced that the execution context does not bind.
    #[error("unknown variable `{name}`")]
    UnknownVariable {
        /// Variable name without the `#` prefix.
        name: String,
    },

    /// `args` is referenced but the snapshot carries no argument list.
    #[error("arguments are not available for `{method}`")]
    ArgsUnavailable {
        /// Method whose snapshot lacks arguments.
        method: String,
    },

    /// An expression needs an execution context and none was supplied.
    #[error("no execution context for `{expression}`")]
    MissingContext {
        /// The expression as given by the caller.
        expression: String,
    },

    /// An operator was applied to operands it does not support.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// A list or string was indexed outside its bounds.
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// Requested index.
        index: i64,
        /// Length of the indexed value.
        len: usize,
    },

    /// A property or index was read from `null` without `?.`.
    #[error("cannot read `{property}` of null")]
    NullReference {
        /// Property or index being read.
        property: String,
    },

    /// A property does not exist on the value it was read from.
    #[error("unknown property `{property}` on {type_name}")]
    UnknownProperty {
        /// Property being read.
        property: String,
        /// Type label of the receiver.
        type_name: String,
    },

    /// A template span failed; names the span exactly as written.
    #[error("expression evaluation failed for `{expression}`: {source}")]
    Evaluation {
        /// Span text including its delimiters.
        expression: String,
        /// Underlying failure.
        #[source]
        source: Box<EvalError>,
    },
}

impl EvalError {
    /// Returns a stable, machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "PARSE",
            Self::UnknownVariable { .. } => "UNKNOWN_VARIABLE",
            Self::ArgsUnavailable { .. } => "ARGS_UNAVAILABLE",
            Self::MissingContext { .. } => "MISSING_CONTEXT",
            Self::TypeMismatch(_) => "TYPE_MISMATCH",
            Self::IndexOutOfBounds { .. } => "INDEX_OUT_OF_BOUNDS",
            Self::NullReference { .. } => "NULL_REFERENCE",
            Self::UnknownProperty { .. } => "UNKNOWN_PROPERTY",
            Self::Evaluation { .. } => "EVALUATION_FAILED",
        }
    }

    /// Wraps an error raised by one template span, naming the span text.
    ///
    /// Argument and context errors are returned as they are so callers can
    /// match on them directly.
    pub(crate) fn in_span(self, span: &str) -> Self {
        match self {
            Self::ArgsUnavailable { .. } | Self::MissingContext { .. } | Self::Evaluation { .. } => {
                self
            }
            other => Self::Evaluation {
                expression: span.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Returns the innermost error, unwrapping span context.
    pub fn root_cause(&self) -> &EvalError {
        match self {
            Self::Evaluation { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub(crate) fn type_mismatch(message: impl Into<String>) -> Self {
        Self::TypeMismatch(message.into())
    }
}

/// Convenience alias for evaluation results.
pub type EvalResult<T> = Result<T, EvalError>;
