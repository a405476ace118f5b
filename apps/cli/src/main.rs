//! Stellar CLI
//!
//! Evaluate and validate Stellar expressions, score events against a triage
//! configuration and apply field transformations from the command line.

mod logging;
mod settings;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use serde_json::{Map, Value as JsonValue};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stellar_dsl::{
    Context, Engine, FunctionRegistry, InMemoryEnrichmentStore, JsonResolver,
    StellarEnrichmentConfig, TriageConfig,
};

use settings::Settings;

#[derive(Parser)]
#[command(name = "stellar", version, about = "Stellar expression engine")]
struct Cli {
    /// Settings file (TOML); `STELLAR_*` environment variables override it
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enrichment data for ENRICHMENT_GET / ENRICHMENT_EXISTS, as
    /// `{"<type>": {"<indicator>": {...}}}`
    #[arg(long, global = true, value_name = "FILE")]
    enrichments: Option<PathBuf>,

    /// Log level for stellar crates (ignored when RUST_LOG is set)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate an expression and print the result as JSON
    Eval {
        expression: String,
        /// Variable binding `name=value`; the value is parsed as JSON when possible
        #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
        vars: Vec<(String, JsonValue)>,
        /// JSON object whose fields are the variables
        #[arg(long, value_name = "FILE")]
        event: Option<PathBuf>,
        /// Coerce the result to a boolean predicate
        #[arg(long)]
        predicate: bool,
    },
    /// Validate expressions without evaluating them
    Check {
        #[arg(required = true)]
        expressions: Vec<String>,
    },
    /// Score an event against a triage configuration
    Triage {
        #[arg(long, value_name = "FILE")]
        rules: PathBuf,
        #[arg(long, value_name = "FILE")]
        event: PathBuf,
    },
    /// Apply a Stellar enrichment configuration to an event
    Transform {
        #[arg(long, value_name = "FILE")]
        definition: PathBuf,
        #[arg(long, value_name = "FILE")]
        event: PathBuf,
    },
    /// List the registered functions
    Functions,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(level) = &cli.log_level {
        settings.logging.level = level.clone();
    }
    settings.logging.json |= cli.log_json;
    logging::init_logging(&settings.logging).context("Failed to initialize logging")?;

    let engine = build_engine(&settings, cli.enrichments.as_deref())?;
    let outcome = run(&engine, cli.command);

    if let Err(e) = engine.close() {
        tracing::warn!(error = %e, "Failed to close stateful functions");
    }
    outcome
}

fn build_engine(settings: &Settings, enrichments: Option<&Path>) -> anyhow::Result<Engine> {
    let mut context = Context::new();
    if let Some(path) = enrichments {
        let store = InMemoryEnrichmentStore::from_json(&read_json(path)?)
            .with_context(|| format!("Invalid enrichment data in {}", path.display()))?;
        tracing::debug!(records = store.len(), "Loaded enrichment data");
        context = context.with_enrichment_store(Arc::new(store));
    }
    let registry = Arc::new(FunctionRegistry::with_builtins(context));
    Engine::with_registry(settings.engine.clone(), registry).context("Failed to create engine")
}

fn run(engine: &Engine, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Eval {
            expression,
            vars,
            event,
            predicate,
        } => {
            let mut fields = match event {
                Some(path) => read_object(&path)?,
                None => Map::new(),
            };
            fields.extend(vars);
            let resolver = JsonResolver::new(&fields);

            let output = if predicate {
                JsonValue::Bool(engine.run_predicate(&expression, &resolver)?)
            } else {
                engine.evaluate(&expression, &resolver)?.to_json()
            };
            print_json(&output)
        }
        Command::Check { expressions } => {
            for expression in &expressions {
                engine
                    .validate(expression)
                    .with_context(|| format!("Invalid expression: {expression}"))?;
                println!("ok: {expression}");
            }
            Ok(())
        }
        Command::Triage { rules, event } => {
            let config: TriageConfig = serde_json::from_value(read_json(&rules)?)
                .with_context(|| format!("Invalid triage configuration in {}", rules.display()))?;
            config.validate(engine)?;
            let event = read_object(&event)?;
            let score = config.score(engine, &JsonResolver::new(&event));
            print_json(&serde_json::to_value(score)?)
        }
        Command::Transform { definition, event } => {
            let config = StellarEnrichmentConfig::from_json(&read_json(&definition)?)
                .with_context(|| format!("Invalid enrichment config in {}", definition.display()))?;
            config.validate(engine)?;
            let mut event = read_object(&event)?;
            config.apply(engine, &mut event)?;
            print_json(&JsonValue::Object(event))
        }
        Command::Functions => {
            for info in engine.registry().functions() {
                println!("{}({})", info.name, info.params.len());
                if !info.description.is_empty() {
                    println!("    {}", info.description);
                }
                for param in &info.params {
                    println!("    - {param}");
                }
                if !info.returns.is_empty() {
                    println!("    returns: {}", info.returns);
                }
            }
            Ok(())
        }
    }
}

fn parse_var(raw: &str) -> Result<(String, JsonValue), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    let value =
        serde_json::from_str(value).unwrap_or_else(|_| JsonValue::String(value.to_string()));
    Ok((name.trim().to_string(), value))
}

fn read_json(path: &Path) -> anyhow::Result<JsonValue> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse JSON in {}", path.display()))
}

fn read_object(path: &Path) -> anyhow::Result<Map<String, JsonValue>> {
    match read_json(path)? {
        JsonValue::Object(map) => Ok(map),
        _ => anyhow::bail!("{} must contain a JSON object", path.display()),
    }
}

fn print_json(value: &JsonValue) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn var_values_parse_as_json_when_possible() {
        assert_eq!(parse_var("n=5").unwrap(), ("n".to_string(), JsonValue::from(5)));
        assert_eq!(
            parse_var("ip=10.0.0.1").unwrap(),
            ("ip".to_string(), JsonValue::from("10.0.0.1"))
        );
        assert!(parse_var("novalue").is_err());
    }

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["stellar", "check", "a == 1", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(cli.command, Command::Check { .. }));
    }
}
