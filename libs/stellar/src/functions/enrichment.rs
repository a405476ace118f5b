//! Enrichment lookups against an external key/value store.
//!
//! `ENRICHMENT_GET` and `ENRICHMENT_EXISTS` are stateful: they bind to the
//! [`EnrichmentStore`] carried by the registry's [`Context`] on first use and
//! fail to initialize when none is configured.

use super::helpers::{check_arity, opt_str};
use super::{Builtin, FunctionInfo, StellarFunction};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::value::Value;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};

/// Read access to enrichment records keyed by `(enrichment type, indicator)`
pub trait EnrichmentStore: Send + Sync {
    fn get(&self, enrichment_type: &str, indicator: &str)
        -> Result<Option<BTreeMap<String, Value>>>;
}

/// Process-local store, mostly for tests and the CLI
#[derive(Debug, Default)]
pub struct InMemoryEnrichmentStore {
    records: RwLock<HashMap<(String, String), BTreeMap<String, Value>>>,
}

impl InMemoryEnrichmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &self,
        enrichment_type: impl Into<String>,
        indicator: impl Into<String>,
        record: BTreeMap<String, Value>,
    ) {
        self.records
            .write()
            .insert((enrichment_type.into(), indicator.into()), record);
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(
        self,
        enrichment_type: impl Into<String>,
        indicator: impl Into<String>,
        record: BTreeMap<String, Value>,
    ) -> Self {
        self.insert(enrichment_type, indicator, record);
        self
    }

    /// Load `{ "<type>": { "<indicator>": { ...record } } }`.
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        let invalid = |what: &str| Error::InvalidConfig(format!("enrichment data: {what}"));
        let store = Self::new();
        let types = json
            .as_object()
            .ok_or_else(|| invalid("expected an object of enrichment types"))?;
        for (enrichment_type, indicators) in types {
            let indicators = indicators.as_object().ok_or_else(|| {
                invalid(&format!("'{enrichment_type}' must map indicators to records"))
            })?;
            for (indicator, record) in indicators {
                let Value::Map(record) = Value::from_json(record.clone()) else {
                    return Err(invalid(&format!(
                        "record for '{enrichment_type}'/'{indicator}' must be an object"
                    )));
                };
                store.insert(enrichment_type.as_str(), indicator.as_str(), record);
            }
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EnrichmentStore for InMemoryEnrichmentStore {
    fn get(
        &self,
        enrichment_type: &str,
        indicator: &str,
    ) -> Result<Option<BTreeMap<String, Value>>> {
        Ok(self
            .records
            .read()
            .get(&(enrichment_type.to_string(), indicator.to_string()))
            .cloned())
    }
}

pub(super) const BUILTINS: &[Builtin] = &[];

pub(super) fn stateful_functions() -> Vec<(FunctionInfo, Arc<dyn StellarFunction>)> {
    let get: Arc<dyn StellarFunction> =
        Arc::new(EnrichmentLookup::new("ENRICHMENT_GET", LookupMode::Get));
    let exists: Arc<dyn StellarFunction> =
        Arc::new(EnrichmentLookup::new("ENRICHMENT_EXISTS", LookupMode::Exists));
    vec![
        (
            FunctionInfo::new(
                "ENRICHMENT_GET",
                "Interrogates the enrichment store for the record of an indicator",
            )
            .param("enrichment_type - The enrichment type")
            .param("indicator - The string indicator to look up")
            .returns("A map of the enrichment record, or null when absent"),
            get,
        ),
        (
            FunctionInfo::new(
                "ENRICHMENT_EXISTS",
                "Interrogates the enrichment store for the existence of an indicator",
            )
            .param("enrichment_type - The enrichment type")
            .param("indicator - The string indicator to look up")
            .returns("True if a record exists and false otherwise"),
            exists,
        ),
    ]
}

#[derive(Debug, Clone, Copy)]
enum LookupMode {
    Get,
    Exists,
}

struct EnrichmentLookup {
    name: &'static str,
    mode: LookupMode,
    store: OnceLock<Arc<dyn EnrichmentStore>>,
}

impl EnrichmentLookup {
    fn new(name: &'static str, mode: LookupMode) -> Self {
        Self {
            name,
            mode,
            store: OnceLock::new(),
        }
    }
}

impl StellarFunction for EnrichmentLookup {
    fn apply(&self, args: &[Value], _context: &Context) -> Result<Value> {
        check_arity(self.name, args, 2, Some(2))?;
        let store = self.store.get().ok_or_else(|| Error::Initialization {
            function: self.name.to_string(),
            message: "not initialized".into(),
        })?;

        let (Some(enrichment_type), Some(indicator)) =
            (opt_str(self.name, args, 0)?, opt_str(self.name, args, 1)?)
        else {
            return Ok(match self.mode {
                LookupMode::Get => Value::Null,
                LookupMode::Exists => Value::Bool(false),
            });
        };

        let record = store.get(enrichment_type, indicator)?;
        Ok(match self.mode {
            LookupMode::Get => record.map(Value::Map).unwrap_or(Value::Null),
            LookupMode::Exists => Value::Bool(record.is_some()),
        })
    }

    fn is_stateful(&self) -> bool {
        true
    }

    fn initialize(&self, context: &Context) -> Result<()> {
        let store = context
            .enrichment_store()
            .ok_or_else(|| Error::Initialization {
                function: self.name.to_string(),
                message: "no enrichment store configured".into(),
            })?;
        // A second initialize (only possible outside the registry) keeps the first store.
        let _ = self.store.set(Arc::clone(store));
        Ok(())
    }
}
