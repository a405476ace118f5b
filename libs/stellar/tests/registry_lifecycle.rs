//! Function registration and stateful function lifecycle

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use stellar_dsl::{
    Context, EmptyResolver, Engine, EngineConfig, Error, FunctionInfo, FunctionRegistry,
    InMemoryEnrichmentStore, MapResolver, StellarFunction, Value,
};

/// Lifecycle counters shared between a test and its function
#[derive(Default)]
struct Tracked {
    inits: AtomicUsize,
    closes: AtomicUsize,
    fail_init: bool,
}

/// Stateful function reporting into a [`Tracked`]
struct TrackedFn(Arc<Tracked>);

impl StellarFunction for TrackedFn {
    fn apply(&self, _args: &[Value], _context: &Context) -> stellar_dsl::Result<Value> {
        Ok(Value::Int(self.0.inits.load(Ordering::SeqCst) as i64))
    }

    fn is_stateful(&self) -> bool {
        true
    }

    fn initialize(&self, _context: &Context) -> stellar_dsl::Result<()> {
        self.0.inits.fetch_add(1, Ordering::SeqCst);
        thread::sleep(std::time::Duration::from_millis(10));
        if self.0.fail_init {
            return Err(Error::Initialization {
                function: "TRACKED".into(),
                message: "backend unavailable".into(),
            });
        }
        Ok(())
    }

    fn close(&self) -> stellar_dsl::Result<()> {
        self.0.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn engine_with(tracked: &Arc<Tracked>) -> Engine {
    let registry = FunctionRegistry::new();
    registry.register("tracked", TrackedFn(Arc::clone(tracked))).unwrap();
    Engine::with_registry(EngineConfig::default(), Arc::new(registry)).unwrap()
}

#[test]
fn test_initialization_is_lazy() {
    let tracked = Arc::new(Tracked::default());
    let engine = engine_with(&tracked);
    engine.validate("TRACKED()").unwrap();
    assert_eq!(tracked.inits.load(Ordering::SeqCst), 0);

    assert_eq!(engine.evaluate("TRACKED()", &EmptyResolver).unwrap(), Value::Int(1));
    assert_eq!(engine.evaluate("TRACKED()", &EmptyResolver).unwrap(), Value::Int(1));
    assert_eq!(tracked.inits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_concurrent_first_use_initializes_once() {
    let tracked = Arc::new(Tracked::default());
    let engine = Arc::new(engine_with(&tracked));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                engine.evaluate("TRACKED()", &EmptyResolver).unwrap()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), Value::Int(1));
    }
    assert_eq!(tracked.inits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_failed_initialization_is_remembered() {
    let tracked = Arc::new(Tracked {
        fail_init: true,
        ..Default::default()
    });
    let engine = engine_with(&tracked);
    for _ in 0..3 {
        let err = engine.evaluate("TRACKED()", &EmptyResolver).unwrap_err();
        assert!(matches!(err, Error::Initialization { .. }));
    }
    assert_eq!(tracked.inits.load(Ordering::SeqCst), 1);

    // Never initialized successfully, so never closed
    engine.close().unwrap();
    assert_eq!(tracked.closes.load(Ordering::SeqCst), 0);
}

#[test]
fn test_close_only_touches_initialized_functions() {
    let used = Arc::new(Tracked::default());
    let unused = Arc::new(Tracked::default());
    let registry = FunctionRegistry::new();
    registry.register("USED", TrackedFn(Arc::clone(&used))).unwrap();
    registry.register("UNUSED", TrackedFn(Arc::clone(&unused))).unwrap();

    registry.call("USED", &[]).unwrap();
    registry.close_all().unwrap();

    assert_eq!(used.closes.load(Ordering::SeqCst), 1);
    assert_eq!(unused.closes.load(Ordering::SeqCst), 0);
}

#[test]
fn test_close_is_idempotent_and_final() {
    let tracked = Arc::new(Tracked::default());
    let registry = FunctionRegistry::new();
    registry.register("TRACKED", TrackedFn(Arc::clone(&tracked))).unwrap();

    registry.call("TRACKED", &[]).unwrap();
    registry.close_all().unwrap();
    registry.close_all().unwrap();
    assert_eq!(tracked.closes.load(Ordering::SeqCst), 1);

    let err = registry.call("TRACKED", &[]).unwrap_err();
    assert!(matches!(err, Error::Initialization { .. }));
    assert_eq!(tracked.inits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_replace_closes_initialized_predecessor() {
    let old = Arc::new(Tracked::default());
    let new = Arc::new(Tracked::default());
    let registry = FunctionRegistry::new();
    registry.register("TRACKED", TrackedFn(Arc::clone(&old))).unwrap();
    registry.call("TRACKED", &[]).unwrap();

    registry.replace("TRACKED", TrackedFn(Arc::clone(&new))).unwrap();
    assert_eq!(old.closes.load(Ordering::SeqCst), 1);

    // The replacement starts fresh and is closed on its own schedule
    registry.call("TRACKED", &[]).unwrap();
    assert_eq!(new.inits.load(Ordering::SeqCst), 1);
    registry.close_all().unwrap();
    assert_eq!(old.closes.load(Ordering::SeqCst), 1);
    assert_eq!(new.closes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_replace_skips_close_for_unused_predecessor() {
    let unused = Arc::new(Tracked::default());
    let registry = FunctionRegistry::new();
    registry.register("TRACKED", TrackedFn(Arc::clone(&unused))).unwrap();
    registry
        .replace("TRACKED", TrackedFn(Arc::new(Tracked::default())))
        .unwrap();
    assert_eq!(unused.closes.load(Ordering::SeqCst), 0);
}

#[test]
fn test_registration_rules() {
    let registry = FunctionRegistry::new();
    registry
        .register_fn("double", |args: &[Value]| {
            Ok(Value::Int(args[0].as_i64().unwrap_or(0) * 2))
        })
        .unwrap();

    assert!(registry.contains("DOUBLE"));
    assert!(!registry.contains("double"));
    assert_eq!(registry.call("DOUBLE", &[Value::Int(4)]).unwrap(), Value::Int(8));

    let err = registry
        .register_fn("DOUBLE", |_: &[Value]| Ok(Value::Null))
        .unwrap_err();
    assert_eq!(err, Error::DuplicateFunction("DOUBLE".into()));

    registry
        .replace(
            FunctionInfo::new("double", "Always null"),
            stellar_dsl::FnFunction(|_: &[Value]| -> stellar_dsl::Result<Value> {
                Ok(Value::Null)
            }),
        )
        .unwrap();
    assert_eq!(registry.call("DOUBLE", &[Value::Int(4)]).unwrap(), Value::Null);
    assert_eq!(registry.info("DOUBLE").unwrap().description, "Always null");

    assert!(matches!(
        registry.register_fn("  ", |_: &[Value]| Ok(Value::Null)),
        Err(Error::InvalidConfig(_))
    ));
}

#[test]
fn test_plugin_function_in_engine() {
    let registry = FunctionRegistry::with_builtins(Context::default());
    registry
        .register_fn("IS_INTERNAL", |args: &[Value]| {
            let ip = args.first().and_then(Value::as_str).unwrap_or_default();
            Ok(Value::Bool(ip.starts_with("10.")))
        })
        .unwrap();
    let engine = Engine::with_registry(EngineConfig::default(), Arc::new(registry)).unwrap();
    let event = MapResolver::new().with("ip", "10.1.1.1");
    assert!(engine.run_predicate("IS_INTERNAL(ip) and IS_IP(ip)", &event).unwrap());
}

#[test]
fn test_enrichment_functions_use_context_store() {
    let record = BTreeMap::from([("owner".to_string(), Value::string("finance"))]);
    let store = InMemoryEnrichmentStore::new().with("asset", "10.0.0.5", record);
    let context = Context::new().with_enrichment_store(Arc::new(store));
    let engine = Engine::with_registry(
        EngineConfig::default(),
        Arc::new(FunctionRegistry::with_builtins(context)),
    )
    .unwrap();

    let event = MapResolver::new().with("ip", "10.0.0.5");
    assert!(engine
        .run_predicate("ENRICHMENT_EXISTS('asset', ip)", &event)
        .unwrap());
    assert_eq!(
        engine
            .evaluate("MAP_GET('owner', ENRICHMENT_GET('asset', ip))", &event)
            .unwrap(),
        Value::string("finance")
    );
    assert!(!engine
        .run_predicate("ENRICHMENT_EXISTS('asset', '10.9.9.9')", &event)
        .unwrap());
}

#[test]
fn test_enrichment_without_store_fails_to_initialize() {
    let engine = Engine::new(EngineConfig::default()).unwrap();
    let err = engine
        .evaluate("ENRICHMENT_GET('asset', 'x')", &EmptyResolver)
        .unwrap_err();
    assert!(matches!(err, Error::Initialization { .. }));
}
