//! Shellwright configuration system.
//!
//! TOML-based configuration with per-section defaults and validation.
//! Every section uses `serde(default)` so partial configs work out of the
//! box. Resolved paths are computed here once and handed to constructors
//! rather than re-derived deeper in the stack.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use shellwright_config::load_config;
//!
//! let config = load_config(None).expect("failed to load config");
//! println!("model: {}", config.model.name);
//! ```

pub mod paths;
pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    AgentSection, LogLevel, LoggingConfig, ModelConfig, SecurityConfig, ShellConfig,
    ShellwrightConfig, StorageConfig,
};

use std::path::Path;

use shellwright_common::ConfigError;

/// Load config from an explicit path, or from the platform default path
/// (creating a commented default file there if none exists), then validate.
pub fn load_config(path: Option<&Path>) -> Result<ShellwrightConfig, ConfigError> {
    let config = match path {
        Some(p) => toml_loader::load_from_path(p)?,
        None => toml_loader::load_default()?,
    };
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &ShellwrightConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
