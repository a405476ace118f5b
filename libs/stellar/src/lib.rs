//! Stellar - the expression and predicate language of the telemetry pipeline
//!
//! Operators author short Stellar expressions for field transformation,
//! enrichment and threat triage. The engine evaluates them against a
//! high-volume event stream, so parsing is done once per distinct source
//! string and cached.
//!
//! # Architecture Overview
//!
//! ```text
//! Source text
//!      |
//!   Lexer -> Tokens
//!      |
//!   Parser -> AST (ParsedExpression, cached by source)
//!      |
//! Evaluator + VariableResolver + FunctionRegistry -> Value
//! ```
//!
//! # Example
//!
//! ```rust
//! use stellar_dsl::{MapResolver, Value};
//!
//! let event = MapResolver::new().with("numbers", "12345");
//! let value = stellar_dsl::global()
//!     .evaluate("REGEXP_GROUP_VAL(numbers, '([0-9]+)', 1)", &event)
//!     .unwrap();
//! assert_eq!(value, Value::string("12345"));
//! ```

pub mod ast;
pub mod cache;
pub mod context;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod token;
pub mod transform;
pub mod triage;
pub mod value;

// Re-export main types
pub use ast::{Expr, ParsedExpression};
pub use cache::{CacheStats, ExpressionCache};
pub use context::Context;
pub use engine::{global, run_predicate, Engine, EngineConfig};
pub use error::{Error, ErrorKind, Result};
pub use evaluator::evaluate;
pub use functions::{
    EnrichmentStore, FnFunction, FunctionInfo, FunctionRegistry, InMemoryEnrichmentStore,
    StellarFunction,
};
pub use parser::parse;
pub use resolver::{
    EmptyResolver, FnResolver, JsonResolver, LayeredResolver, MapResolver, VariableResolver,
};
pub use transform::{FieldTransformation, StellarEnrichmentConfig};
pub use triage::{Aggregator, ThreatScore, TriageConfig};
pub use value::Value;
