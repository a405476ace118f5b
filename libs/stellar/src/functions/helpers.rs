//! Shared argument handling for built-in functions.

use crate::error::{Error, Result};
use crate::value::Value;

/// Fail unless `min <= args.len() <= max` (`max` of `None` is unbounded).
pub(crate) fn check_arity(
    function: &str,
    args: &[Value],
    min: usize,
    max: Option<usize>,
) -> Result<()> {
    let count = args.len();
    let within = count >= min && max.map_or(true, |max| count <= max);
    if within {
        return Ok(());
    }
    let expected = match max {
        Some(max) if max == min => min.to_string(),
        Some(max) => format!("{min}-{max}"),
        None => format!("at least {min}"),
    };
    Err(Error::Arity {
        function: function.to_string(),
        expected,
        actual: count,
    })
}

/// String argument at `index`; `Null` or absent becomes `None`.
pub(crate) fn opt_str<'a>(
    function: &str,
    args: &'a [Value],
    index: usize,
) -> Result<Option<&'a str>> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(type_mismatch(function, index, "string", other)),
    }
}

/// Integer argument at `index`; `Null` or absent becomes `None`. Whole floats
/// are accepted.
pub(crate) fn opt_int(function: &str, args: &[Value], index: usize) -> Result<Option<i64>> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Int(n)) => Ok(Some(*n)),
        Some(Value::Float(f)) if f.fract() == 0.0 => Ok(Some(*f as i64)),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| type_mismatch(function, index, "integer", &args[index])),
        Some(other) => Err(type_mismatch(function, index, "integer", other)),
    }
}

pub(crate) fn type_mismatch(function: &str, index: usize, expected: &str, found: &Value) -> Error {
    Error::type_error(format!(
        "{function}: argument {} must be a {expected}, got {}",
        index + 1,
        found.type_name()
    ))
}

/// Render a scalar as text the way string functions see it
pub(crate) fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
