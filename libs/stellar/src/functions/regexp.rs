//! Regular expression functions.
//!
//! Compiled patterns are memoized in a small process-wide LRU because the same
//! handful of patterns is applied to every event in a stream. Hits only take
//! the shared side of the lock and do not refresh recency, so parallel
//! evaluations never serialize on a known pattern.

use super::helpers::{as_text, check_arity, opt_int, opt_str};
use super::Builtin;
use crate::error::{Error, Result};
use crate::value::Value;
use ::regex::Regex;
use lru::LruCache;
use parking_lot::RwLock;
use std::num::NonZeroUsize;
use std::sync::OnceLock;

const PATTERN_CACHE_SIZE: usize = 256;

pub(super) const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "REGEXP_MATCH",
        description: "Determines whether a regex matches the whole string",
        params: &["string - The string to test", "pattern - The regex"],
        returns: "True if the string matches the pattern, false otherwise",
        func: regexp_match,
    },
    Builtin {
        name: "REGEXP_GROUP_VAL",
        description: "Returns the value of a capture group when the regex matches the whole string",
        params: &[
            "string - The string to test",
            "pattern - The regex",
            "group - The capture group index (0 is the whole match)",
        ],
        returns: "The captured text, or null when there is no match or no such group",
        func: regexp_group_val,
    },
    Builtin {
        name: "REGEXP_REPLACE",
        description: "Replaces every match of a regex",
        params: &[
            "string - The input string",
            "pattern - The regex",
            "replacement - Replacement text; $1 style group references are expanded",
        ],
        returns: "The string with all matches replaced",
        func: regexp_replace,
    },
];

type PatternCache = RwLock<LruCache<(bool, String), Regex>>;

fn pattern_cache() -> &'static PatternCache {
    static CACHE: OnceLock<PatternCache> = OnceLock::new();
    CACHE.get_or_init(|| {
        RwLock::new(LruCache::new(
            NonZeroUsize::new(PATTERN_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN),
        ))
    })
}

/// Compile `pattern`, optionally anchored to the whole input.
fn compile(function: &str, pattern: &str, whole: bool) -> Result<Regex> {
    let key = (whole, pattern.to_string());
    if let Some(regex) = pattern_cache().read().peek(&key) {
        return Ok(regex.clone());
    }

    let source = if whole {
        format!(r"\A(?:{pattern})\z")
    } else {
        pattern.to_string()
    };
    let regex = Regex::new(&source).map_err(|e| {
        Error::EvaluationError(format!("{function}: invalid regex '{pattern}': {e}"))
    })?;

    pattern_cache().write().put(key, regex.clone());
    Ok(regex)
}

fn regexp_match(args: &[Value]) -> Result<Value> {
    check_arity("REGEXP_MATCH", args, 2, Some(2))?;
    let (Some(input), Some(pattern)) = (as_text(&args[0]), opt_str("REGEXP_MATCH", args, 1)?)
    else {
        return Ok(Value::Bool(false));
    };
    let regex = compile("REGEXP_MATCH", pattern, true)?;
    Ok(Value::Bool(regex.is_match(&input)))
}

fn regexp_group_val(args: &[Value]) -> Result<Value> {
    check_arity("REGEXP_GROUP_VAL", args, 3, Some(3))?;
    let input = match as_text(&args[0]) {
        Some(input) if !input.is_empty() => input,
        _ => return Ok(Value::Null),
    };
    let Some(pattern) = opt_str("REGEXP_GROUP_VAL", args, 1)? else {
        return Ok(Value::Null);
    };
    let Some(group) = opt_int("REGEXP_GROUP_VAL", args, 2)? else {
        return Ok(Value::Null);
    };

    let regex = compile("REGEXP_GROUP_VAL", pattern, true)?;
    let Ok(group) = usize::try_from(group) else {
        return Ok(Value::Null);
    };
    let captured = regex
        .captures(&input)
        .and_then(|caps| caps.get(group))
        .map(|m| Value::string(m.as_str()));
    Ok(captured.unwrap_or(Value::Null))
}

fn regexp_replace(args: &[Value]) -> Result<Value> {
    check_arity("REGEXP_REPLACE", args, 3, Some(3))?;
    let Some(input) = as_text(&args[0]) else {
        return Ok(Value::Null);
    };
    let (Some(pattern), Some(replacement)) = (
        opt_str("REGEXP_REPLACE", args, 1)?,
        opt_str("REGEXP_REPLACE", args, 2)?,
    ) else {
        return Ok(Value::String(input));
    };
    let regex = compile("REGEXP_REPLACE", pattern, false)?;
    Ok(Value::String(regex.replace_all(&input, replacement).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_string_anchoring() {
        let args = [Value::string("abc123"), Value::string(r"\d+")];
        assert_eq!(regexp_match(&args).unwrap(), Value::Bool(false));
        let args = [Value::string("123"), Value::string(r"\d+")];
        assert_eq!(regexp_match(&args).unwrap(), Value::Bool(true));
    }

    #[test]
    fn alternation_is_anchored_as_a_whole() {
        let args = [Value::string("xa"), Value::string("a|xa")];
        assert_eq!(regexp_match(&args).unwrap(), Value::Bool(true));
        let args = [Value::string("ax"), Value::string("a|xa")];
        assert_eq!(regexp_match(&args).unwrap(), Value::Bool(false));
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let args = [Value::string("x"), Value::string("(")];
        assert!(matches!(
            regexp_match(&args),
            Err(Error::EvaluationError(_))
        ));
    }

    #[test]
    fn compiled_patterns_are_shared_across_threads() {
        let pattern = r"shared-(\d+)";
        compile("REGEXP_MATCH", pattern, true).unwrap();
        let key = (true, pattern.to_string());
        assert!(pattern_cache().read().peek(&key).is_some());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                std::thread::spawn(move || {
                    let args = [Value::string(format!("shared-{i}")), Value::string(pattern)];
                    regexp_match(&args).unwrap()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), Value::Bool(true));
        }
        assert!(pattern_cache().read().len() <= PATTERN_CACHE_SIZE);
    }

    #[test]
    fn replace_expands_groups() {
        let args = [
            Value::string("a1b2"),
            Value::string(r"(\d)"),
            Value::string("<$1>"),
        ];
        assert_eq!(regexp_replace(&args).unwrap(), Value::string("a<1>b<2>"));
    }
}
