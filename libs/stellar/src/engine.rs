//! Stellar engine
//!
//! Ties the pipeline together: source text is parsed once through the
//! [`ExpressionCache`], then evaluated against a caller-supplied
//! [`VariableResolver`] using the engine's [`FunctionRegistry`].

use crate::ast::ParsedExpression;
use crate::cache::ExpressionCache;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::evaluator::{self, to_predicate};
use crate::functions::FunctionRegistry;
use crate::parser::{self, MAX_RECURSION_DEPTH};
use crate::resolver::VariableResolver;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

/// Default number of parsed expressions kept by the cache
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct EngineConfig {
    /// Maximum number of cached parsed expressions
    pub cache_capacity: usize,
    /// Maximum expression nesting accepted by the parser
    pub max_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            max_depth: MAX_RECURSION_DEPTH,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 {
            return Err(Error::InvalidConfig(
                "cache_capacity must be at least 1".into(),
            ));
        }
        if self.max_depth == 0 {
            return Err(Error::InvalidConfig("max_depth must be at least 1".into()));
        }
        Ok(())
    }
}

/// Parses, caches and evaluates Stellar expressions.
///
/// `Engine` is `Send + Sync`; share one instance across worker threads.
///
/// # Example
///
/// ```rust
/// use stellar_dsl::{Engine, EngineConfig, MapResolver};
///
/// let engine = Engine::new(EngineConfig::default()).unwrap();
/// let event = MapResolver::new().with("ip_src_addr", "10.0.2.3");
/// assert!(engine
///     .run_predicate("IN_SUBNET(ip_src_addr, '10.0.0.0/8')", &event)
///     .unwrap());
/// ```
pub struct Engine {
    config: EngineConfig,
    registry: Arc<FunctionRegistry>,
    cache: ExpressionCache,
}

impl Engine {
    /// Engine with the built-in function catalog and an empty context
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_registry(
            config,
            Arc::new(FunctionRegistry::with_builtins(Context::default())),
        )
    }

    /// Engine over a caller-built registry (plugins, enrichment store, ...)
    pub fn with_registry(config: EngineConfig, registry: Arc<FunctionRegistry>) -> Result<Self> {
        config.validate()?;
        let cache = ExpressionCache::new(config.cache_capacity)?;
        Ok(Self {
            config,
            registry,
            cache,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &ExpressionCache {
        &self.cache
    }

    /// Parse `source`, reusing the cached expression when present.
    pub fn parse(&self, source: &str) -> Result<Arc<ParsedExpression>> {
        let max_depth = self.config.max_depth;
        self.cache
            .get_or_compile(source, |source| parser::parse_with_depth(source, max_depth))
    }

    /// Parse (cached) and evaluate `source`.
    pub fn evaluate(&self, source: &str, resolver: &dyn VariableResolver) -> Result<Value> {
        let expr = self.parse(source)?;
        self.evaluate_expr(&expr, resolver)
    }

    pub fn evaluate_expr(
        &self,
        expr: &ParsedExpression,
        resolver: &dyn VariableResolver,
    ) -> Result<Value> {
        evaluator::evaluate(expr, resolver, &self.registry)
    }

    /// Evaluate `source` as a predicate. Null counts as false; a result that
    /// is neither boolean nor null is [`Error::NotBoolean`].
    pub fn run_predicate(&self, source: &str, resolver: &dyn VariableResolver) -> Result<bool> {
        to_predicate(&self.evaluate(source, resolver)?)
    }

    /// Check that `source` parses and that every function it calls is
    /// registered. Nothing is evaluated.
    pub fn validate(&self, source: &str) -> Result<Arc<ParsedExpression>> {
        let expr = self.parse(source)?;
        if let Some(missing) = expr
            .functions()
            .into_iter()
            .find(|name| !self.registry.contains(name))
        {
            return Err(Error::UnknownFunction(missing.to_string()));
        }
        Ok(expr)
    }

    /// Release the resources of initialized stateful functions.
    pub fn close(&self) -> Result<()> {
        self.registry.close_all()
    }
}

impl Default for Engine {
    fn default() -> Self {
        let config = EngineConfig::default();
        Self {
            cache: ExpressionCache::with_capacity(config.cache_capacity),
            registry: Arc::new(FunctionRegistry::with_builtins(Context::default())),
            config,
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("cache", &self.cache)
            .finish()
    }
}

/// Process-wide engine with the built-in catalog and default configuration
pub fn global() -> &'static Engine {
    static ENGINE: OnceLock<Engine> = OnceLock::new();
    ENGINE.get_or_init(Engine::default)
}

/// Evaluate `source` as a predicate on the [`global`] engine.
pub fn run_predicate(source: &str, resolver: &dyn VariableResolver) -> Result<bool> {
    global().run_predicate(source, resolver)
}
