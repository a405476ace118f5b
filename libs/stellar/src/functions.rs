//! Function registry for Stellar functions
//!
//! Maps canonical upper-case names to [`StellarFunction`] implementations. The
//! registry is built at startup (built-ins plus plugins) and is read-mostly
//! afterwards: lookups take a shared read lock and clone an `Arc`, so parallel
//! evaluations never serialize on it.
//!
//! Stateful functions are initialized lazily, exactly once, the first time an
//! evaluation resolves them, and closed by [`FunctionRegistry::close_all`].

mod collection;
mod conversion;
mod date;
mod enrichment;
mod helpers;
mod math;
mod network;
mod regexp;
mod string;

pub use enrichment::{EnrichmentStore, InMemoryEnrichmentStore};

use crate::context::Context;
use crate::error::{Error, Result};
use crate::value::Value;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// A function callable from Stellar expressions.
///
/// Implementations must tolerate concurrent `apply` calls. Stateful functions
/// return `true` from [`is_stateful`](Self::is_stateful) and acquire their
/// resources in [`initialize`](Self::initialize).
pub trait StellarFunction: Send + Sync {
    fn apply(&self, args: &[Value], context: &Context) -> Result<Value>;

    fn is_stateful(&self) -> bool {
        false
    }

    fn initialize(&self, _context: &Context) -> Result<()> {
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Descriptive metadata shown by catalog listings
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FunctionInfo {
    pub name: String,
    pub description: String,
    pub params: Vec<String>,
    pub returns: String,
}

impl FunctionInfo {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn param(mut self, param: impl Into<String>) -> Self {
        self.params.push(param.into());
        self
    }

    pub fn returns(mut self, returns: impl Into<String>) -> Self {
        self.returns = returns.into();
        self
    }
}

impl From<&str> for FunctionInfo {
    fn from(name: &str) -> Self {
        FunctionInfo::new(name, "")
    }
}

/// Stateless function backed by a closure or fn pointer
pub struct FnFunction<F>(pub F);

impl<F> StellarFunction for FnFunction<F>
where
    F: Fn(&[Value]) -> Result<Value> + Send + Sync,
{
    fn apply(&self, args: &[Value], _context: &Context) -> Result<Value> {
        (self.0)(args)
    }
}

/// Static description of a stateless built-in
pub(crate) struct Builtin {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [&'static str],
    pub returns: &'static str,
    pub func: fn(&[Value]) -> Result<Value>,
}

impl Builtin {
    fn info(&self) -> FunctionInfo {
        FunctionInfo {
            name: self.name.to_string(),
            description: self.description.to_string(),
            params: self.params.iter().map(|p| p.to_string()).collect(),
            returns: self.returns.to_string(),
        }
    }
}

struct Registration {
    info: FunctionInfo,
    function: Arc<dyn StellarFunction>,
    init: OnceLock<Result<()>>,
    closed: AtomicBool,
}

impl Registration {
    fn new(info: FunctionInfo, function: Arc<dyn StellarFunction>) -> Self {
        Self {
            info,
            function,
            init: OnceLock::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Run `initialize` once for stateful functions and replay its outcome.
    fn ensure_initialized(&self, context: &Context) -> Result<()> {
        if !self.function.is_stateful() {
            return Ok(());
        }
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Initialization {
                function: self.info.name.clone(),
                message: "function has been closed".into(),
            });
        }
        self.init
            .get_or_init(|| {
                tracing::debug!(function = %self.info.name, "Initializing stateful function");
                let result = self.function.initialize(context);
                if let Err(e) = &result {
                    tracing::warn!(function = %self.info.name, error = %e, "Stateful function failed to initialize");
                }
                result
            })
            .clone()
    }

    /// Close the function if it initialized successfully. Later calls, and
    /// later resolutions, see it as closed.
    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if !matches!(self.init.get(), Some(Ok(()))) {
            return Ok(());
        }
        tracing::debug!(function = %self.info.name, "Closing stateful function");
        self.function.close().map_err(|e| {
            tracing::warn!(function = %self.info.name, error = %e, "Failed to close function");
            e
        })
    }
}

/// Canonical-name to function mapping
pub struct FunctionRegistry {
    functions: RwLock<HashMap<String, Arc<Registration>>>,
    context: Context,
}

impl FunctionRegistry {
    /// An empty registry with a default context
    pub fn new() -> Self {
        Self::with_context(Context::default())
    }

    pub fn with_context(context: Context) -> Self {
        Self {
            functions: RwLock::new(HashMap::new()),
            context,
        }
    }

    /// A registry preloaded with the built-in catalog
    pub fn with_builtins(context: Context) -> Self {
        let registry = Self::with_context(context);
        registry.register_builtins();
        registry
    }

    fn register_builtins(&self) {
        let tables: [&[Builtin]; 8] = [
            string::BUILTINS,
            regexp::BUILTINS,
            conversion::BUILTINS,
            collection::BUILTINS,
            math::BUILTINS,
            network::BUILTINS,
            date::BUILTINS,
            enrichment::BUILTINS,
        ];

        let mut functions = self.functions.write();
        for builtin in tables.into_iter().flatten() {
            functions.insert(
                builtin.name.to_string(),
                Arc::new(Registration::new(
                    builtin.info(),
                    Arc::new(FnFunction(builtin.func)),
                )),
            );
        }
        for (info, function) in enrichment::stateful_functions() {
            functions.insert(info.name.clone(), Arc::new(Registration::new(info, function)));
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Register a function under the upper-cased `info.name`. Fails if the
    /// name is taken.
    pub fn register<F>(&self, info: impl Into<FunctionInfo>, function: F) -> Result<()>
    where
        F: StellarFunction + 'static,
    {
        self.insert(info.into(), Arc::new(function), false)
    }

    /// Register a stateless closure
    pub fn register_fn<F>(&self, info: impl Into<FunctionInfo>, function: F) -> Result<()>
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.register(info, FnFunction(function))
    }

    /// Register a function, replacing any existing one of the same name. An
    /// initialized predecessor is closed once it is out of the table.
    pub fn replace<F>(&self, info: impl Into<FunctionInfo>, function: F) -> Result<()>
    where
        F: StellarFunction + 'static,
    {
        self.insert(info.into(), Arc::new(function), true)
    }

    fn insert(
        &self,
        mut info: FunctionInfo,
        function: Arc<dyn StellarFunction>,
        replace: bool,
    ) -> Result<()> {
        let name = info.name.trim().to_ascii_uppercase();
        if name.is_empty() {
            return Err(Error::InvalidConfig("function name must not be empty".into()));
        }
        info.name = name.clone();

        let previous = {
            let mut functions = self.functions.write();
            if !replace && functions.contains_key(&name) {
                return Err(Error::DuplicateFunction(name));
            }
            tracing::debug!(function = %name, stateful = function.is_stateful(), "Registered function");
            functions.insert(name, Arc::new(Registration::new(info, function)))
        };
        match previous {
            Some(previous) => previous.close(),
            None => Ok(()),
        }
    }

    /// Whether `name` is registered (case-sensitive, canonical spelling)
    pub fn contains(&self, name: &str) -> bool {
        self.functions.read().contains_key(name)
    }

    /// Look up a function, initializing it first if it is stateful.
    ///
    /// The registry lock is released before initialization, so a slow
    /// `initialize` only delays callers of that same function.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn StellarFunction>> {
        let registration = self.lookup(name)?;
        registration.ensure_initialized(&self.context)?;
        Ok(Arc::clone(&registration.function))
    }

    /// Resolve and apply `name` to already-evaluated arguments
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        self.resolve(name)?.apply(args, &self.context)
    }

    fn lookup(&self, name: &str) -> Result<Arc<Registration>> {
        self.functions
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownFunction(name.to_string()))
    }

    pub fn info(&self, name: &str) -> Option<FunctionInfo> {
        self.functions.read().get(name).map(|r| r.info.clone())
    }

    /// All registered functions, sorted by name
    pub fn functions(&self) -> Vec<FunctionInfo> {
        let mut infos: Vec<FunctionInfo> = self
            .functions
            .read()
            .values()
            .map(|r| r.info.clone())
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    pub fn len(&self) -> usize {
        self.functions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close every stateful function that initialized successfully, each at
    /// most once. All of them are attempted; the first failure is returned.
    /// A closed stateful function no longer resolves.
    pub fn close_all(&self) -> Result<()> {
        let registrations: Vec<Arc<Registration>> =
            self.functions.read().values().cloned().collect();

        let mut first_error = None;
        for registration in registrations {
            if let Err(e) = registration.close() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.len())
            .field("context", &self.context)
            .finish()
    }
}
