//! String functions.

use super::helpers::{as_text, check_arity, opt_str, type_mismatch};
use super::Builtin;
use crate::error::Result;
use crate::value::Value;

pub(super) const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "TO_UPPER",
        description: "Transforms the first argument to an uppercase string",
        params: &["input - Value to transform"],
        returns: "Uppercase string",
        func: to_upper,
    },
    Builtin {
        name: "TO_LOWER",
        description: "Transforms the first argument to a lowercase string",
        params: &["input - Value to transform"],
        returns: "Lowercase string",
        func: to_lower,
    },
    Builtin {
        name: "TRIM",
        description: "Trims whitespace from both sides of a string",
        params: &["input - String"],
        returns: "String",
        func: trim,
    },
    Builtin {
        name: "LENGTH",
        description: "Returns the length of a string, list or map",
        params: &["input - String, list or map"],
        returns: "Integer",
        func: length,
    },
    Builtin {
        name: "IS_EMPTY",
        description: "Returns true if a string, list or map is empty or null",
        params: &["input - String, list or map"],
        returns: "Boolean",
        func: is_empty,
    },
    Builtin {
        name: "STARTS_WITH",
        description: "Determines whether a string starts with a prefix",
        params: &["string - The string to test", "prefix - The prefix"],
        returns: "Boolean",
        func: starts_with,
    },
    Builtin {
        name: "ENDS_WITH",
        description: "Determines whether a string ends with a suffix",
        params: &["string - The string to test", "suffix - The suffix"],
        returns: "Boolean",
        func: ends_with,
    },
    Builtin {
        name: "SPLIT",
        description: "Splits a string by a delimiter",
        params: &["input - String to split", "delim - Delimiter"],
        returns: "List of strings",
        func: split,
    },
    Builtin {
        name: "JOIN",
        description: "Joins the non-null items of a list with a delimiter",
        params: &["list - Items to join", "delim - Delimiter"],
        returns: "String",
        func: join,
    },
];

fn map_text(function: &str, args: &[Value], f: impl Fn(&str) -> String) -> Result<Value> {
    check_arity(function, args, 1, Some(1))?;
    Ok(as_text(&args[0])
        .map(|s| Value::String(f(&s)))
        .unwrap_or(Value::Null))
}

fn to_upper(args: &[Value]) -> Result<Value> {
    map_text("TO_UPPER", args, str::to_uppercase)
}

fn to_lower(args: &[Value]) -> Result<Value> {
    map_text("TO_LOWER", args, str::to_lowercase)
}

fn trim(args: &[Value]) -> Result<Value> {
    map_text("TRIM", args, |s| s.trim().to_string())
}

fn length(args: &[Value]) -> Result<Value> {
    check_arity("LENGTH", args, 1, Some(1))?;
    let len = match &args[0] {
        Value::Null => 0,
        Value::String(s) => s.chars().count(),
        Value::List(items) => items.len(),
        Value::Map(map) => map.len(),
        other => return Err(type_mismatch("LENGTH", 0, "string, list or map", other)),
    };
    Ok(Value::Int(len as i64))
}

fn is_empty(args: &[Value]) -> Result<Value> {
    check_arity("IS_EMPTY", args, 1, Some(1))?;
    let empty = match &args[0] {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::List(items) => items.is_empty(),
        Value::Map(map) => map.is_empty(),
        _ => false,
    };
    Ok(Value::Bool(empty))
}

fn affix(function: &str, args: &[Value], test: fn(&str, &str) -> bool) -> Result<Value> {
    check_arity(function, args, 2, Some(2))?;
    let matched = match (as_text(&args[0]), opt_str(function, args, 1)?) {
        (Some(s), Some(affix)) => test(&s, affix),
        _ => false,
    };
    Ok(Value::Bool(matched))
}

fn starts_with(args: &[Value]) -> Result<Value> {
    affix("STARTS_WITH", args, |s, p| s.starts_with(p))
}

fn ends_with(args: &[Value]) -> Result<Value> {
    affix("ENDS_WITH", args, |s, p| s.ends_with(p))
}

fn split(args: &[Value]) -> Result<Value> {
    check_arity("SPLIT", args, 2, Some(2))?;
    let Some(input) = as_text(&args[0]) else {
        return Ok(Value::Null);
    };
    let delim = opt_str("SPLIT", args, 1)?.unwrap_or(",");
    let parts = if delim.is_empty() {
        vec![Value::String(input)]
    } else {
        input.split(delim).map(Value::string).collect()
    };
    Ok(Value::List(parts))
}

fn join(args: &[Value]) -> Result<Value> {
    check_arity("JOIN", args, 2, Some(2))?;
    let items = match &args[0] {
        Value::Null => return Ok(Value::Null),
        Value::List(items) => items,
        other => return Err(type_mismatch("JOIN", 0, "list", other)),
    };
    let delim = opt_str("JOIN", args, 1)?.unwrap_or("");
    let joined: Vec<String> = items.iter().filter_map(as_text).collect();
    Ok(Value::String(joined.join(delim)))
}
