//! Tree-walking evaluator over [`Bindings`].
//!
//! Evaluation borrows from the bindings and the compiled expression wherever
//! possible; only computed values (comparisons, pseudo-properties, bound
//! scalars) are allocated.

use std::borrow::Cow;
use std::cmp::Ordering;

use super::parser::{BinaryOp, Expr, UnaryOp};
use crate::context::Bindings;
use crate::error::{EvalError, EvalResult};
use crate::value::Value;

enum Access<'v> {
    Ref(&'v Value),
    Computed(Value),
}

enum Step<'k> {
    Field { name: &'k str, null_safe: bool },
    Index(&'k Value),
}

pub(crate) fn evaluate<'e>(expr: &'e Expr, env: Bindings<'e>) -> EvalResult<Cow<'e, Value>> {
    match expr {
        Expr::Literal(value) => Ok(Cow::Borrowed(value)),
        Expr::Variable(name) => env.lookup(name),
        Expr::Field {
            target,
            name,
            null_safe,
        } => {
            let base = evaluate(target, env)?;
            apply(
                base,
                &Step::Field {
                    name,
                    null_safe: *null_safe,
                },
            )
        }
        Expr::Index { target, index } => {
            let base = evaluate(target, env)?;
            let key = evaluate(index, env)?;
            apply(base, &Step::Index(&key))
        }
        Expr::Call {
            target,
            name,
            null_safe,
        } => {
            let base = evaluate(target, env)?;
            if base.is_null() {
                return if *null_safe {
                    Ok(Cow::Owned(Value::Null))
                } else {
                    Err(EvalError::NullReference {
                        property: format!("{name}()"),
                    })
                };
            }
            call(&base, name).map(Cow::Owned)
        }
        Expr::Unary { op, operand } => {
            let value = evaluate(operand, env)?;
            unary(*op, &value).map(Cow::Owned)
        }
        Expr::Binary { op, lhs, rhs } => binary(*op, lhs, rhs, env).map(Cow::Owned),
    }
}

fn apply<'e>(base: Cow<'e, Value>, step: &Step<'_>) -> EvalResult<Cow<'e, Value>> {
    match base {
        Cow::Borrowed(value) => Ok(match access(value, step)? {
            Access::Ref(found) => Cow::Borrowed(found),
            Access::Computed(computed) => Cow::Owned(computed),
        }),
        Cow::Owned(value) => Ok(Cow::Owned(match access(&value, step)? {
            Access::Ref(found) => found.clone(),
            Access::Computed(computed) => computed,
        })),
    }
}

fn access<'v>(value: &'v Value, step: &Step<'_>) -> EvalResult<Access<'v>> {
    match *step {
        Step::Field { name, null_safe } => field(value, name, null_safe),
        Step::Index(key) => index(value, key),
    }
}

fn field<'v>(value: &'v Value, name: &str, null_safe: bool) -> EvalResult<Access<'v>> {
    match value {
        Value::Null if null_safe => Ok(Access::Computed(Value::Null)),
        Value::Null => Err(EvalError::NullReference {
            property: name.to_string(),
        }),
        Value::Map(map) => Ok(map
            .get(name)
            .map_or(Access::Computed(Value::Null), Access::Ref)),
        Value::Object(record) => record
            .get(name)
            .map(Access::Ref)
            .ok_or_else(|| unknown_property(value, name)),
        Value::List(items) if matches!(name, "length" | "size") => {
            Ok(Access::Computed(Value::from(items.len())))
        }
        Value::String(s) if name == "length" => {
            Ok(Access::Computed(Value::from(s.chars().count())))
        }
        other => Err(unknown_property(other, name)),
    }
}

fn index<'v>(value: &'v Value, key: &Value) -> EvalResult<Access<'v>> {
    match value {
        Value::Null => Err(EvalError::NullReference {
            property: format!("[{key}]"),
        }),
        Value::List(items) => {
            let i = as_index(key)?;
            usize::try_from(i)
                .ok()
                .and_then(|i| items.get(i))
                .map(Access::Ref)
                .ok_or(EvalError::IndexOutOfBounds {
                    index: i,
                    len: items.len(),
                })
        }
        Value::String(s) => {
            let i = as_index(key)?;
            let len = s.chars().count();
            usize::try_from(i)
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map(|ch| Access::Computed(Value::String(ch.to_string())))
                .ok_or(EvalError::IndexOutOfBounds { index: i, len })
        }
        Value::Map(map) => {
            let name = key_name(key)?;
            Ok(map
                .get(&*name)
                .map_or(Access::Computed(Value::Null), Access::Ref))
        }
        Value::Object(record) => {
            let name = key_name(key)?;
            record
                .get(&name)
                .map(Access::Ref)
                .ok_or_else(|| unknown_property(value, &name))
        }
        other => Err(EvalError::type_mismatch(format!(
            "cannot index {}",
            other.type_label()
        ))),
    }
}

fn as_index(key: &Value) -> EvalResult<i64> {
    match key {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .ok_or_else(|| EvalError::type_mismatch(format!("`{n}` is not an integer index"))),
        other => Err(EvalError::type_mismatch(format!(
            "list index must be a number, found {}",
            other.type_label()
        ))),
    }
}

fn key_name(key: &Value) -> EvalResult<Cow<'_, str>> {
    match key {
        Value::String(s) => Ok(Cow::Borrowed(s)),
        Value::Number(n) => Ok(Cow::Owned(n.to_string())),
        Value::Bool(b) => Ok(Cow::Owned(b.to_string())),
        other => Err(EvalError::type_mismatch(format!(
            "key must be a string, found {}",
            other.type_label()
        ))),
    }
}

fn unknown_property(value: &Value, name: &str) -> EvalError {
    EvalError::UnknownProperty {
        property: name.to_string(),
        type_name: value.type_label().into_owned(),
    }
}

fn call(value: &Value, name: &str) -> EvalResult<Value> {
    let len = match value {
        Value::List(items) => Some(items.len()),
        Value::Map(map) => Some(map.len()),
        Value::String(s) => Some(s.chars().count()),
        Value::Object(record) => Some(record.fields.len()),
        _ => None,
    };
    match (name, len) {
        ("size" | "length", Some(len)) => Ok(Value::from(len)),
        ("isEmpty", Some(len)) => Ok(Value::Bool(len == 0)),
        ("toString", _) => Ok(Value::String(value.to_string())),
        _ => Err(unknown_property(value, &format!("{name}()"))),
    }
}

fn unary(op: UnaryOp, value: &Value) -> EvalResult<Value> {
    match op {
        UnaryOp::Not => value.as_bool().map(|b| Value::Bool(!b)).ok_or_else(|| {
            EvalError::type_mismatch(format!("`not` expects a boolean, found {}", value.type_label()))
        }),
        UnaryOp::Neg => match value {
            Value::Number(n) => Ok(match n.as_i64().and_then(i64::checked_neg) {
                Some(negated) => Value::from(negated),
                None => Value::from_f64(-n.as_f64().unwrap_or(f64::NAN)),
            }),
            other => Err(EvalError::type_mismatch(format!(
                "`-` expects a number, found {}",
                other.type_label()
            ))),
        },
    }
}

fn require_bool(value: &Value, op: &str) -> EvalResult<bool> {
    value.as_bool().ok_or_else(|| {
        EvalError::type_mismatch(format!("`{op}` expects booleans, found {}", value.type_label()))
    })
}

fn binary(op: BinaryOp, lhs: &Expr, rhs: &Expr, env: Bindings<'_>) -> EvalResult<Value> {
    match op {
        BinaryOp::And => {
            if !require_bool(&*evaluate(lhs, env)?, "and")? {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(require_bool(&*evaluate(rhs, env)?, "and")?))
        }
        BinaryOp::Or => {
            if require_bool(&*evaluate(lhs, env)?, "or")? {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(require_bool(&*evaluate(rhs, env)?, "or")?))
        }
        BinaryOp::Eq => Ok(Value::Bool(values_equal(
            &*evaluate(lhs, env)?,
            &*evaluate(rhs, env)?,
        ))),
        BinaryOp::Ne => Ok(Value::Bool(!values_equal(
            &*evaluate(lhs, env)?,
            &*evaluate(rhs, env)?,
        ))),
        BinaryOp::Lt => ordered(lhs, rhs, env, |o| o == Ordering::Less),
        BinaryOp::Le => ordered(lhs, rhs, env, |o| o != Ordering::Greater),
        BinaryOp::Gt => ordered(lhs, rhs, env, |o| o == Ordering::Greater),
        BinaryOp::Ge => ordered(lhs, rhs, env, |o| o != Ordering::Less),
    }
}

fn ordered(
    lhs: &Expr,
    rhs: &Expr,
    env: Bindings<'_>,
    accept: fn(Ordering) -> bool,
) -> EvalResult<Value> {
    let left = evaluate(lhs, env)?;
    let right = evaluate(rhs, env)?;
    Ok(Value::Bool(accept(compare(&left, &right)?)))
}

/// Numbers compare by value across integer and float representations;
/// everything else compares structurally.
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn compare(left: &Value, right: &Value) -> EvalResult<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .zip(b.as_f64())
            .and_then(|(a, b)| a.partial_cmp(&b))
            .ok_or_else(|| EvalError::type_mismatch(format!("cannot order `{a}` and `{b}`"))),
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        _ => Err(EvalError::type_mismatch(format!(
            "cannot compare {} with {}",
            left.type_label(),
            right.type_label()
        ))),
    }
}
