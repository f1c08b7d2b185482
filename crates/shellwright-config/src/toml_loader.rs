//! TOML config file loading and creation.

use crate::paths;
use crate::schema::ShellwrightConfig;
use shellwright_common::ConfigError;
use std::path::{Path, PathBuf};
use tracing::info;

/// Load config from a specific TOML file path.
///
/// Missing fields fall back to serde defaults. Validation is left to the
/// caller so a bad value is reported rather than silently replaced.
pub fn load_from_path(path: &Path) -> Result<ShellwrightConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::ParseError(format!("failed to read {}: {e}", path.display()))
    })?;

    let config: ShellwrightConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Load config from the platform-specific default path.
///
/// If the file does not exist, creates a commented default file and
/// returns defaults.
pub fn load_default() -> Result<ShellwrightConfig, ConfigError> {
    let path = default_config_path()?;

    if !path.exists() {
        info!("no config found at {}, creating default", path.display());
        create_default_config(&path)?;
        return Ok(ShellwrightConfig::default());
    }

    load_from_path(&path)
}

/// Get the platform-specific default config file path.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    paths::config_file()
}

/// Create a default TOML config file with documentation comments.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ConfigError::PathError(format!(
                "failed to create config directory {}: {e}",
                parent.display()
            ))
        })?;
    }

    std::fs::write(path, default_config_toml()).map_err(|e| {
        ConfigError::PathError(format!(
            "failed to write default config to {}: {e}",
            path.display()
        ))
    })?;

    info!("created default config at {}", path.display());
    Ok(())
}

/// Generate the default TOML config content with comments.
fn default_config_toml() -> &'static str {
    r##"# Shellwright Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[model]
# name = "gemini-2.0-flash"
# api_key = ""              # falls back to $GEMINI_API_KEY
# embedding_model = "text-embedding-004"
# max_tokens = 8192
# temperature = 0.7
# max_attempts = 3          # 1-10
# retry_base_delay_ms = 1000

[agent]
# interactive_mode = false  # confirm shell commands and file edits
# recall_limit = 5          # 1-50
# default_session = "default"
# distill_min_turns = 5

[shell]
# program = "bash"          # empty: detect from $SHELL
# args = ["--noprofile", "--norc"]
# command_timeout_secs = 10
# init_timeout_secs = 3
# cols = 200
# rows = 50

[shell.env]
# PAGER = "cat"

[security]
# command_allowlist = []    # empty: every command is allowed

[storage]
# history_dir = "/path/to/history"
# memory_dir = "/path/to/memory"

[logging]
# level = "info"            # trace, debug, info, warn, error
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::LogLevel;

    #[test]
    fn load_from_nonexistent_returns_file_not_found() {
        let result = load_from_path(Path::new("/tmp/nonexistent_shellwright_config.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn load_valid_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[model]
name = "gemini-1.5-pro"

[logging]
level = "warn"
"#,
        )
        .unwrap();

        let config = load_from_path(&path).unwrap();
        assert_eq!(config.model.name, "gemini-1.5-pro");
        assert_eq!(config.logging.level, LogLevel::Warn);
        assert_eq!(config.shell.command_timeout_secs, 10);
    }

    #[test]
    fn load_invalid_toml_returns_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[model\nname = ").unwrap();

        let result = load_from_path(&path);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn default_template_parses_to_defaults() {
        let config: ShellwrightConfig = toml::from_str(default_config_toml()).unwrap();
        assert_eq!(config.model.name, "gemini-2.0-flash");
        assert_eq!(config.agent.recall_limit, 5);
    }

    #[test]
    fn create_default_config_writes_file_and_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        create_default_config(&path).unwrap();
        assert!(path.exists());
        let config = load_from_path(&path).unwrap();
        assert!(config.security.command_allowlist.is_empty());
    }
}
