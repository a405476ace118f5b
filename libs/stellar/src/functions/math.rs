//! Numeric functions.

use super::helpers::{check_arity, type_mismatch};
use super::Builtin;
use crate::error::{Error, Result};
use crate::value::Value;
use std::cmp::Ordering;

pub(super) const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "ABS",
        description: "Returns the absolute value of a number",
        params: &["number - The number"],
        returns: "The absolute value, or null for a null input",
        func: abs,
    },
    Builtin {
        name: "MAX",
        description: "Returns the maximum of a list of values, or of the arguments",
        params: &["values - A list, or two or more comparable values"],
        returns: "The largest non-null value",
        func: max,
    },
    Builtin {
        name: "MIN",
        description: "Returns the minimum of a list of values, or of the arguments",
        params: &["values - A list, or two or more comparable values"],
        returns: "The smallest non-null value",
        func: min,
    },
];

fn abs(args: &[Value]) -> Result<Value> {
    check_arity("ABS", args, 1, Some(1))?;
    match &args[0] {
        Value::Null => Ok(Value::Null),
        Value::Int(n) => n
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| Error::EvaluationError(format!("ABS: integer overflow on {n}"))),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        other => Err(type_mismatch("ABS", 0, "number", other)),
    }
}

fn max(args: &[Value]) -> Result<Value> {
    extreme("MAX", args, Ordering::Greater)
}

fn min(args: &[Value]) -> Result<Value> {
    extreme("MIN", args, Ordering::Less)
}

/// Fold the non-null candidates keeping the one that orders `wanted` against
/// the rest. A single list argument supplies the candidates.
fn extreme(function: &str, args: &[Value], wanted: Ordering) -> Result<Value> {
    check_arity(function, args, 1, None)?;
    let candidates: &[Value] = match args {
        [Value::List(items)] => items,
        _ => args,
    };

    let mut best: Option<&Value> = None;
    for value in candidates.iter().filter(|v| !v.is_null()) {
        best = match best {
            None => Some(value),
            Some(current) => match value.compare(current) {
                Some(ordering) if ordering == wanted => Some(value),
                Some(_) => Some(current),
                None => {
                    return Err(Error::type_error(format!(
                        "{function}: cannot compare {} with {}",
                        value.type_name(),
                        current.type_name()
                    )))
                }
            },
        };
    }
    Ok(best.cloned().unwrap_or(Value::Null))
}
