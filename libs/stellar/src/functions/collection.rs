//! List and map accessors.

use super::helpers::{check_arity, opt_int, opt_str, type_mismatch};
use super::Builtin;
use crate::error::Result;
use crate::value::Value;

pub(super) const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "GET",
        description: "Returns the i'th element of the list",
        params: &["input - List", "i - The index (0-based)"],
        returns: "First element of the list",
        func: get,
    },
    Builtin {
        name: "GET_FIRST",
        description: "Returns the first element of the list",
        params: &["input - List"],
        returns: "First element of the list",
        func: get_first,
    },
    Builtin {
        name: "GET_LAST",
        description: "Returns the last element of the list",
        params: &["input - List"],
        returns: "Last element of the list",
        func: get_last,
    },
    Builtin {
        name: "LIST_ADD",
        description: "Adds an element to a list",
        params: &["list - List to add element to", "element - Element to add"],
        returns: "Resulting list with the item added at the end",
        func: list_add,
    },
    Builtin {
        name: "MAP_GET",
        description: "Gets the value associated with a key from a map",
        params: &[
            "key - The key",
            "map - The map",
            "default - Optionally the default value to return if the key is not in the map",
        ],
        returns: "The object associated with the key in the map",
        func: map_get,
    },
    Builtin {
        name: "MAP_EXISTS",
        description: "Checks for existence of a key in a map",
        params: &["key - The key to check for existence", "map - The map"],
        returns: "True if the key is found in the map",
        func: map_exists,
    },
];

/// The list argument at index 0; `Null` is treated as an empty list.
fn list_arg<'a>(function: &str, args: &'a [Value]) -> Result<&'a [Value]> {
    match &args[0] {
        Value::Null => Ok(&[]),
        Value::List(items) => Ok(items),
        other => Err(type_mismatch(function, 0, "list", other)),
    }
}

fn get(args: &[Value]) -> Result<Value> {
    check_arity("GET", args, 2, Some(2))?;
    let items = list_arg("GET", args)?;
    let element = opt_int("GET", args, 1)?
        .and_then(|i| usize::try_from(i).ok())
        .and_then(|i| items.get(i));
    Ok(element.cloned().unwrap_or(Value::Null))
}

fn get_first(args: &[Value]) -> Result<Value> {
    check_arity("GET_FIRST", args, 1, Some(1))?;
    Ok(list_arg("GET_FIRST", args)?
        .first()
        .cloned()
        .unwrap_or(Value::Null))
}

fn get_last(args: &[Value]) -> Result<Value> {
    check_arity("GET_LAST", args, 1, Some(1))?;
    Ok(list_arg("GET_LAST", args)?
        .last()
        .cloned()
        .unwrap_or(Value::Null))
}

fn list_add(args: &[Value]) -> Result<Value> {
    check_arity("LIST_ADD", args, 2, Some(2))?;
    let mut items = list_arg("LIST_ADD", args)?.to_vec();
    items.push(args[1].clone());
    Ok(Value::List(items))
}

fn map_get(args: &[Value]) -> Result<Value> {
    check_arity("MAP_GET", args, 2, Some(3))?;
    let default = args.get(2).cloned().unwrap_or(Value::Null);
    let Some(key) = opt_str("MAP_GET", args, 0)? else {
        return Ok(default);
    };
    match &args[1] {
        Value::Null => Ok(default),
        Value::Map(map) => Ok(map.get(key).cloned().unwrap_or(default)),
        other => Err(type_mismatch("MAP_GET", 1, "map", other)),
    }
}

fn map_exists(args: &[Value]) -> Result<Value> {
    check_arity("MAP_EXISTS", args, 2, Some(2))?;
    let found = match (opt_str("MAP_EXISTS", args, 0)?, &args[1]) {
        (Some(key), Value::Map(map)) => map.contains_key(key),
        _ => false,
    };
    Ok(Value::Bool(found))
}
