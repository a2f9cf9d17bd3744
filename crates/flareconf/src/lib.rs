//! Layered configuration loading for Flare Copilot.
//!
//! Every value has a compiled default, so the gateway starts with no config
//! file at all as long as `ANTHROPIC_API_KEY` is set.
//!
//! # Usage
//!
//! ```rust,no_run
//! use flareconf::CopilotConfig;
//!
//! let config = CopilotConfig::load().expect("Failed to load config");
//! println!("listening on {}", config.bind.addr());
//! println!("model: {}", config.model.model);
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins, tables merge key by key):
//! 1. `/etc/flare-copilot/config.toml` (system)
//! 2. `~/.config/flare-copilot/config.toml` (user)
//! 3. `./flare-copilot.toml` or the `--config` path (local override)
//! 4. Environment variables (`FLARE_COPILOT_*`, `ANTHROPIC_API_KEY`, `RUST_LOG`)
//!
//! # Example Config
//!
//! ```toml
//! [bind]
//! http_port = 8000
//!
//! [telemetry]
//! log_level = "info,copilot_agent=debug"
//! otlp_endpoint = "127.0.0.1:4317"
//!
//! [model]
//! model = "claude-sonnet-4-5-20250929"
//! max_tokens = 4096
//!
//! [agent]
//! max_rounds = 8
//! wall_clock_secs = 120
//!
//! [oracle]
//! rpc_url = "https://coston2-api.flare.network/ext/C/rpc"
//! verifier_timeout_secs = 10
//! da_timeout_secs = 5
//!
//! [oracle.submission]
//! mode = "simulated"
//! delay_ms = 1000
//! ```

pub mod infra;
pub mod loader;
pub mod services;

pub use infra::{BindConfig, TelemetryConfig};
pub use loader::{discover_config_files_with_override, ConfigSources};
pub use services::{
    AgentConfig, ModelConfig, OracleConfig, SubmissionConfig, SubmissionKind,
    DEFAULT_SYSTEM_PROMPT,
};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("{key} is not set. {hint}")]
    Missing { key: &'static str, hint: &'static str },
}

/// Complete Flare Copilot configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CopilotConfig {
    #[serde(default)]
    pub bind: BindConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub oracle: OracleConfig,
}

impl CopilotConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration from a specific file path, then apply env overrides.
    ///
    /// If `config_path` is provided, it takes precedence over the local
    /// `./flare-copilot.toml` override. System and user configs still load first.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return where values came from.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut merged = toml::Table::new();

        for path in loader::discover_config_files_with_override(config_path) {
            let table = loader::load_table(&path)?;
            loader::merge_tables(&mut merged, table);
            sources.files.push(path);
        }

        let mut config = Self::from_table(merged)?;
        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Deserialize a merged TOML table; absent keys take their defaults.
    pub fn from_table(table: toml::Table) -> Result<Self, ConfigError> {
        toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Invalid(e.to_string()))
    }

    /// The model API key, or a startup error explaining how to set it.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.model
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::Missing {
                key: "ANTHROPIC_API_KEY",
                hint: "Export it, add it to .env, or set model.api_key in flare-copilot.toml.",
            })
    }

    /// Serialize config to TOML with secrets redacted.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let mut redacted = self.clone();
        if redacted.model.api_key.is_some() {
            redacted.model.api_key = Some("<redacted>".to_string());
        }

        let body = toml::to_string_pretty(&redacted)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(format!("# Flare Copilot Configuration\n\n{}", body))
    }
}
