//! Platform-specific locations for shellwright files.

use std::path::PathBuf;

use shellwright_common::ConfigError;

pub(crate) const APP_NAME: &str = "shellwright";

/// Returns the platform-specific configuration directory.
///
/// - macOS: `~/Library/Application Support/shellwright`
/// - Linux: `$XDG_CONFIG_HOME/shellwright` (defaults to `~/.config/shellwright`)
/// - Windows: `%APPDATA%\shellwright`
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    Ok(dirs::config_dir()
        .ok_or_else(|| ConfigError::PathError("could not determine config directory".into()))?
        .join(APP_NAME))
}

/// Returns the platform-specific data directory.
///
/// - macOS: `~/Library/Application Support/shellwright`
/// - Linux: `$XDG_DATA_HOME/shellwright` (defaults to `~/.local/share/shellwright`)
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    Ok(dirs::data_dir()
        .ok_or_else(|| ConfigError::PathError("could not determine data directory".into()))?
        .join(APP_NAME))
}

/// Returns the path to the main configuration file.
pub fn config_file() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Default directory for per-session chat transcripts.
pub fn history_dir() -> Result<PathBuf, ConfigError> {
    Ok(data_dir()?.join("history"))
}

/// Default directory for the long-term memory store.
pub fn memory_dir() -> Result<PathBuf, ConfigError> {
    Ok(data_dir()?.join("memory"))
}
