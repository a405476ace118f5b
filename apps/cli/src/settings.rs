//! CLI settings
//!
//! Loaded with the `config` crate from an optional TOML file, then overridden
//! by `STELLAR_*` environment variables (`__` separates nested keys, e.g.
//! `STELLAR_ENGINE__CACHE_CAPACITY=500`, `STELLAR_LOGGING__LEVEL=debug`).

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use stellar_dsl::EngineConfig;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level for the stellar crates when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings: Settings = builder
            .add_source(
                config::Environment::with_prefix("STELLAR")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration sources")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        settings
            .engine
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid engine configuration: {e}"))?;
        Ok(settings)
    }
}
