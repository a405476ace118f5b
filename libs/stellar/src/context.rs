//! Function context
//!
//! The context is owned by the function registry and handed to every function
//! on `initialize` and `apply`. It carries the external capabilities stateful
//! functions acquire; stateless functions ignore it.

use crate::functions::EnrichmentStore;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct Context {
    enrichment_store: Option<Arc<dyn EnrichmentStore>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provide the store read by `ENRICHMENT_GET` / `ENRICHMENT_EXISTS`
    pub fn with_enrichment_store(mut self, store: Arc<dyn EnrichmentStore>) -> Self {
        self.enrichment_store = Some(store);
        self
    }

    pub fn enrichment_store(&self) -> Option<&Arc<dyn EnrichmentStore>> {
        self.enrichment_store.as_ref()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("enrichment_store", &self.enrichment_store.is_some())
            .finish()
    }
}
