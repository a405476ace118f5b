//! Variable resolution
//!
//! The engine never reads telemetry storage itself; callers hand it a
//! [`VariableResolver`] for the event being evaluated. Missing variables resolve
//! to [`Value::Null`], never to an error.

use crate::value::Value;
use std::collections::HashMap;

/// Maps a variable name to its value in the current evaluation
pub trait VariableResolver {
    fn resolve(&self, name: &str) -> Value;
}

impl<R: VariableResolver + ?Sized> VariableResolver for &R {
    fn resolve(&self, name: &str) -> Value {
        (**self).resolve(name)
    }
}

/// Resolver that knows no variables
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyResolver;

impl VariableResolver for EmptyResolver {
    fn resolve(&self, _name: &str) -> Value {
        Value::Null
    }
}

/// Resolver over an owned field map
#[derive(Debug, Default, Clone)]
pub struct MapResolver {
    variables: HashMap<String, Value>,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(name.into(), value.into());
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for MapResolver {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            variables: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl VariableResolver for MapResolver {
    fn resolve(&self, name: &str) -> Value {
        self.variables.get(name).cloned().unwrap_or_default()
    }
}

/// Resolver over a telemetry event held as a JSON object
#[derive(Debug, Clone)]
pub struct JsonResolver<'a> {
    event: &'a serde_json::Map<String, serde_json::Value>,
}

impl<'a> JsonResolver<'a> {
    pub fn new(event: &'a serde_json::Map<String, serde_json::Value>) -> Self {
        Self { event }
    }
}

impl VariableResolver for JsonResolver<'_> {
    fn resolve(&self, name: &str) -> Value {
        self.event
            .get(name)
            .cloned()
            .map(Value::from_json)
            .unwrap_or_default()
    }
}

/// Resolver backed by a closure
pub struct FnResolver<F>(pub F);

impl<F> VariableResolver for FnResolver<F>
where
    F: Fn(&str) -> Option<Value>,
{
    fn resolve(&self, name: &str) -> Value {
        (self.0)(name).unwrap_or_default()
    }
}

/// Fields computed so far, layered over a base resolver. Overlay entries win;
/// an overlay entry of `Null` hides the base field.
pub struct LayeredResolver<'a> {
    overlay: &'a HashMap<String, Value>,
    base: &'a dyn VariableResolver,
}

impl<'a> LayeredResolver<'a> {
    pub fn new(overlay: &'a HashMap<String, Value>, base: &'a dyn VariableResolver) -> Self {
        Self { overlay, base }
    }
}

impl VariableResolver for LayeredResolver<'_> {
    fn resolve(&self, name: &str) -> Value {
        match self.overlay.get(name) {
            Some(value) => value.clone(),
            None => self.base.resolve(name),
        }
    }
}

/// One step of a variable path
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

/// Resolve `name`, falling back to walking `a.b`, `a['b']` and `a[0]` paths
/// through maps and lists when the full name is not a field of its own.
pub(crate) fn resolve_path(resolver: &dyn VariableResolver, name: &str) -> Value {
    let direct = resolver.resolve(name);
    if !direct.is_null() || !name.contains(['.', '[']) {
        return direct;
    }

    let Some((base, segments)) = split_path(name) else {
        return Value::Null;
    };

    let mut current = resolver.resolve(base);
    for segment in segments {
        current = match (current, segment) {
            (Value::Map(mut map), Segment::Key(key)) => map.remove(key).unwrap_or_default(),
            (Value::Map(mut map), Segment::Index(i)) => {
                map.remove(&i.to_string()).unwrap_or_default()
            }
            (Value::List(mut items), Segment::Index(i)) if i < items.len() => items.swap_remove(i),
            _ => return Value::Null,
        };
    }
    current
}

fn split_path(name: &str) -> Option<(&str, Vec<Segment<'_>>)> {
    let base_end = name.find(['.', '[']).unwrap_or(name.len());
    let base = &name[..base_end];
    let mut rest = &name[base_end..];
    let mut segments = Vec::new();

    while !rest.is_empty() {
        if let Some(after_dot) = rest.strip_prefix('.') {
            let end = after_dot.find(['.', '[']).unwrap_or(after_dot.len());
            if end == 0 {
                return None;
            }
            segments.push(Segment::Key(&after_dot[..end]));
            rest = &after_dot[end..];
        } else if let Some(after_bracket) = rest.strip_prefix('[') {
            let close = after_bracket.find(']')?;
            let inner = &after_bracket[..close];
            let segment = match inner.as_bytes().first() {
                Some(b'\'' | b'"') if inner.len() >= 2 => Segment::Key(&inner[1..inner.len() - 1]),
                _ => Segment::Index(inner.parse().ok()?),
            };
            segments.push(segment);
            rest = &after_bracket[close + 1..];
        } else {
            return None;
        }
    }

    (!base.is_empty()).then_some((base, segments))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_mixed_paths() {
        let (base, segments) = split_path("event['src'][1].port").unwrap();
        assert_eq!(base, "event");
        assert_eq!(
            segments,
            vec![Segment::Key("src"), Segment::Index(1), Segment::Key("port")]
        );
    }

    #[test]
    fn direct_field_wins_over_path() {
        let resolver = MapResolver::new().with("source.type", "bro");
        assert_eq!(resolve_path(&resolver, "source.type"), Value::string("bro"));
    }

    #[test]
    fn missing_segment_is_null() {
        let resolver = MapResolver::new().with("a", Value::List(vec![Value::Int(1)]));
        assert_eq!(resolve_path(&resolver, "a[3]"), Value::Null);
        assert_eq!(resolve_path(&resolver, "a[0]"), Value::Int(1));
    }
}
