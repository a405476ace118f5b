//! Type conversion functions. Unparseable input converts to `Null` rather
//! than failing, so conversions can be chained with null checks.

use super::helpers::{as_text, check_arity};
use super::Builtin;
use crate::error::Result;
use crate::value::Value;

pub(super) const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "TO_STRING",
        description: "Transforms the first argument to a string",
        params: &["input - Object of string or numeric type"],
        returns: "String",
        func: to_string,
    },
    Builtin {
        name: "TO_INTEGER",
        description: "Transforms the first argument to an integer",
        params: &["input - Object of string or numeric type"],
        returns: "Integer version of the first argument",
        func: to_integer,
    },
    Builtin {
        name: "TO_LONG",
        description: "Transforms the first argument to a long integer",
        params: &["input - Object of string or numeric type"],
        returns: "Long version of the first argument",
        func: to_integer,
    },
    Builtin {
        name: "TO_DOUBLE",
        description: "Transforms the first argument to a double precision number",
        params: &["input - Object of string or numeric type"],
        returns: "Double version of the first argument",
        func: to_double,
    },
    Builtin {
        name: "TO_FLOAT",
        description: "Transforms the first argument to a floating point number",
        params: &["input - Object of string or numeric type"],
        returns: "Float version of the first argument",
        func: to_double,
    },
    Builtin {
        name: "TO_BOOLEAN",
        description: "Transforms the first argument to a boolean",
        params: &["input - Object of string or boolean type"],
        returns: "Boolean, or null when the input is not recognized",
        func: to_boolean,
    },
];

fn to_string(args: &[Value]) -> Result<Value> {
    check_arity("TO_STRING", args, 1, Some(1))?;
    Ok(as_text(&args[0]).map(Value::String).unwrap_or(Value::Null))
}

fn to_integer(args: &[Value]) -> Result<Value> {
    check_arity("TO_INTEGER", args, 1, Some(1))?;
    let converted = match &args[0] {
        Value::Int(n) => Some(*n),
        Value::Float(f) if f.is_finite() && f.trunc().abs() < i64::MAX as f64 => {
            Some(f.trunc() as i64)
        }
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => parse_integer(s.trim()),
        _ => None,
    };
    Ok(converted.map(Value::Int).unwrap_or(Value::Null))
}

fn parse_integer(text: &str) -> Option<i64> {
    text.parse::<i64>().ok().or_else(|| {
        text.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && f.trunc().abs() < i64::MAX as f64)
            .map(|f| f.trunc() as i64)
    })
}

fn to_double(args: &[Value]) -> Result<Value> {
    check_arity("TO_DOUBLE", args, 1, Some(1))?;
    let converted = match &args[0] {
        Value::Int(n) => Some(*n as f64),
        Value::Float(f) => Some(*f),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(converted.map(Value::Float).unwrap_or(Value::Null))
}

fn to_boolean(args: &[Value]) -> Result<Value> {
    check_arity("TO_BOOLEAN", args, 1, Some(1))?;
    let converted = match &args[0] {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        Value::Int(n) => Some(*n != 0),
        _ => None,
    };
    Ok(converted.map(Value::Bool).unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_conversion_truncates_and_parses() {
        assert_eq!(to_integer(&[Value::Float(3.9)]).unwrap(), Value::Int(3));
        assert_eq!(to_integer(&[Value::string(" 42 ")]).unwrap(), Value::Int(42));
        assert_eq!(to_integer(&[Value::string("7.5")]).unwrap(), Value::Int(7));
        assert_eq!(to_integer(&[Value::string("abc")]).unwrap(), Value::Null);
    }

    #[test]
    fn boolean_conversion_is_case_insensitive() {
        assert_eq!(to_boolean(&[Value::string("TRUE")]).unwrap(), Value::Bool(true));
        assert_eq!(to_boolean(&[Value::string("nope")]).unwrap(), Value::Null);
    }

    #[test]
    fn to_string_keeps_null() {
        assert_eq!(to_string(&[Value::Null]).unwrap(), Value::Null);
        assert_eq!(to_string(&[Value::Int(5)]).unwrap(), Value::string("5"));
    }
}
