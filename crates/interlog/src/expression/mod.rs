//! Expression template engine.
//!
//! Strings are classified into plain text, pure expressions and templates
//! (see [`ExpressionType`]). Embedded expressions use `#{...}` delimiters and
//! a deliberately small grammar:
//!
//! - variables: `#args`, `#result`, or bare `args`, `result`
//! - access: `.field`, `?.field`, `[index]`, `.size()`
//! - literals: `'text'`, `"text"`, `42`, `1.5`, `true`, `false`, `null`
//! - comparisons: `== != < <= > >=` and `eq ne lt le gt ge`
//! - boolean operators: `and or not`, `&& || !`
//!
//! # Example
//! ```rust,ignore
//! use interlog::{EngineConfig, ExecutionSnapshot, ExpressionEngine, Value};
//!
//! let engine = ExpressionEngine::new(EngineConfig::default());
//! let snapshot = ExecutionSnapshot::builder("UserService", "find")
//!     .args(vec![Value::from("7"), Value::from("Alice")])
//!     .build();
//! let text = engine.evaluate("User ID=#{args[0]}, Name=#{args[1]}", Some(&snapshot))?;
//! assert_eq!(text, "User ID=7, Name=Alice");
//! ```

mod cache;
mod engine;
mod eval;
mod lexer;
mod parser;
mod template;

use std::borrow::Cow;

pub use engine::{ExpressionEngine, coerce_to_bool};
pub use template::{ExpressionType, Span, extract_spans, normalize};

use crate::context::Bindings;
use crate::error::EvalResult;
use crate::value::Value;

/// Parsed form of one expression.
#[derive(Debug)]
pub struct CompiledExpression {
    source: String,
    ast: parser::Expr,
}

impl CompiledExpression {
    /// Normalizes and parses `source`.
    pub fn compile(source: &str) -> EvalResult<Self> {
        let normalized = normalize(source);
        let ast = parser::parse(&normalized)?;
        Ok(Self {
            source: source.to_string(),
            ast,
        })
    }

    /// Source text this expression was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates the expression against `env`.
    pub fn evaluate<'e>(&'e self, env: Bindings<'e>) -> EvalResult<Cow<'e, Value>> {
        eval::evaluate(&self.ast, env)
    }
}
