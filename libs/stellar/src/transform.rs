//! Field transformations and Stellar enrichment groups
//!
//! A [`FieldTransformation`] is an ordered list of `field := expression`
//! assignments applied to an event. Each assignment sees the outputs of the
//! ones before it, and a `Null` result removes the field.
//!
//! [`StellarEnrichmentConfig`] wraps one flat transformation or several
//! named groups. Groups are evaluated independently against the incoming
//! event and their outputs merged in declaration order.

use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::resolver::{JsonResolver, LayeredResolver, VariableResolver};
use crate::value::Value;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;

type Event = Map<String, JsonValue>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldTransformation {
    assignments: Vec<(String, String)>,
}

impl FieldTransformation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `field := expression`
    pub fn assign(mut self, field: impl Into<String>, expression: impl Into<String>) -> Self {
        self.assignments.push((field.into(), expression.into()));
        self
    }

    pub fn assignments(&self) -> &[(String, String)] {
        &self.assignments
    }

    /// Build from `{"field": "expr", ...}` (insertion order kept) or from
    /// `["field := expr", ...]`.
    pub fn from_json(json: &JsonValue) -> Result<Self> {
        match json {
            JsonValue::Object(fields) => fields
                .iter()
                .try_fold(Self::new(), |acc, (field, expr)| match expr {
                    JsonValue::String(expr) => Ok(acc.assign(field.as_str(), expr.as_str())),
                    _ => Err(Error::InvalidConfig(format!(
                        "assignment to '{field}' must be a Stellar string"
                    ))),
                }),
            JsonValue::Array(lines) => lines.iter().try_fold(Self::new(), |acc, line| {
                let (field, expr) = line
                    .as_str()
                    .and_then(|line| line.split_once(":="))
                    .ok_or_else(|| {
                        Error::InvalidConfig(format!("expected 'field := expression', got {line}"))
                    })?;
                Ok(acc.assign(field.trim(), expr.trim()))
            }),
            other => Err(Error::InvalidConfig(format!(
                "field transformation must be an object or a list, got {other}"
            ))),
        }
    }

    /// Parse every expression and check the functions it calls.
    pub fn validate(&self, engine: &Engine) -> Result<()> {
        for (field, expr) in &self.assignments {
            if field.is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "assignment of '{expr}' has an empty field name"
                )));
            }
            engine.validate(expr)?;
        }
        Ok(())
    }

    /// Evaluate the assignments and return the final value of each assigned
    /// field, in first-assignment order. `Null` means "remove".
    pub fn evaluate(
        &self,
        engine: &Engine,
        resolver: &dyn VariableResolver,
    ) -> Result<Vec<(String, Value)>> {
        let mut computed: HashMap<String, Value> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();

        for (field, expr) in &self.assignments {
            let value = {
                let layered = LayeredResolver::new(&computed, resolver);
                engine.evaluate(expr, &layered)?
            };
            if !computed.contains_key(field) {
                order.push(field);
            }
            computed.insert(field.clone(), value);
        }

        Ok(order
            .into_iter()
            .map(|field| {
                let value = computed.remove(field).unwrap_or_default();
                (field.to_string(), value)
            })
            .collect())
    }

    /// Apply the assignments to `event` in place.
    pub fn apply(&self, engine: &Engine, event: &mut Event) -> Result<()> {
        let outputs = self.evaluate(engine, &JsonResolver::new(event))?;
        write_back(event, outputs);
        Ok(())
    }
}

fn write_back(event: &mut Event, outputs: Vec<(String, Value)>) {
    for (field, value) in outputs {
        if value.is_null() {
            event.remove(&field);
        } else {
            event.insert(field, value.to_json());
        }
    }
}

/// `{"config": ...}` block of a sensor's Stellar enrichment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StellarEnrichmentConfig {
    groups: Vec<(Option<String>, FieldTransformation)>,
}

impl StellarEnrichmentConfig {
    /// A single unnamed group
    pub fn flat(transformation: FieldTransformation) -> Self {
        Self {
            groups: vec![(None, transformation)],
        }
    }

    pub fn group(mut self, name: impl Into<String>, transformation: FieldTransformation) -> Self {
        self.groups.push((Some(name.into()), transformation));
        self
    }

    pub fn groups(&self) -> impl Iterator<Item = (Option<&str>, &FieldTransformation)> {
        self.groups.iter().map(|(name, t)| (name.as_deref(), t))
    }

    /// Accepts `{"config": {...}}` or the bare `config` object. When every
    /// value is a string the object is one flat group; otherwise each value
    /// is a named group (object or `field := expr` list). A `config` key
    /// holding anything but an object is an ordinary field or group.
    pub fn from_json(json: &JsonValue) -> Result<Self> {
        let config = json.get("config").filter(|c| c.is_object()).unwrap_or(json);
        let JsonValue::Object(entries) = config else {
            return Err(Error::InvalidConfig(
                "stellar enrichment config must be an object".into(),
            ));
        };

        if entries.values().all(JsonValue::is_string) {
            return FieldTransformation::from_json(config).map(Self::flat);
        }
        entries
            .iter()
            .try_fold(Self::default(), |acc, (name, group)| {
                Ok(acc.group(name.as_str(), FieldTransformation::from_json(group)?))
            })
    }

    pub fn validate(&self, engine: &Engine) -> Result<()> {
        self.groups
            .iter()
            .try_for_each(|(_, transformation)| transformation.validate(engine))
    }

    /// Evaluate every group against the unmodified `event`, then write all
    /// outputs back. A failure leaves `event` untouched.
    pub fn apply(&self, engine: &Engine, event: &mut Event) -> Result<()> {
        let mut outputs = Vec::new();
        {
            let resolver = JsonResolver::new(event);
            for (name, transformation) in &self.groups {
                tracing::debug!(group = name.as_deref().unwrap_or("<flat>"), "Applying enrichment group");
                outputs.extend(transformation.evaluate(engine, &resolver)?);
            }
        }
        write_back(event, outputs);
        Ok(())
    }
}
