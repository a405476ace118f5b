#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use stellar_dsl::{Engine, EngineConfig, FunctionRegistry, MapResolver, Value, VariableResolver};

static ENGINE: OnceLock<Engine> = OnceLock::new();

/// Shared engine with the built-in catalog
pub fn engine() -> &'static Engine {
    ENGINE.get_or_init(|| Engine::new(EngineConfig::default()).expect("default engine"))
}

/// Evaluate `source` on the shared engine, panicking on error
pub fn eval(source: &str, resolver: &dyn VariableResolver) -> Value {
    engine()
        .evaluate(source, resolver)
        .unwrap_or_else(|e| panic!("evaluating {source:?} failed: {e}"))
}

pub fn predicate(source: &str, resolver: &dyn VariableResolver) -> bool {
    engine()
        .run_predicate(source, resolver)
        .unwrap_or_else(|e| panic!("predicate {source:?} failed: {e}"))
}

/// Variables used by the regex scenarios
pub fn regex_event() -> MapResolver {
    MapResolver::new()
        .with("numbers", "12345")
        .with("numberPattern", r"\d(\d)(\d).*")
        .with("numberPatternNoCaptures", r"\d\d\d.*")
        .with("letters", "abcde")
        .with("empty", "")
}

/// Engine whose registry counts calls to `SIDE_EFFECT()` and provides
/// `TRUE()` / `FALSE()`
pub fn counting_engine() -> (Engine, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = FunctionRegistry::with_builtins(Default::default());

    let counter = Arc::clone(&calls);
    registry
        .register_fn("SIDE_EFFECT", move |_args: &[Value]| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Bool(true))
        })
        .unwrap();
    registry
        .register_fn("TRUE", |_args: &[Value]| Ok(Value::Bool(true)))
        .unwrap();
    registry
        .register_fn("FALSE", |_args: &[Value]| Ok(Value::Bool(false)))
        .unwrap();

    let engine = Engine::with_registry(EngineConfig::default(), Arc::new(registry)).unwrap();
    (engine, calls)
}
