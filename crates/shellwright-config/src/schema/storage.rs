//! On-disk locations for chat history and long-term memory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use shellwright_common::ConfigError;

use crate::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory of per-session JSONL transcripts. `None` means the
    /// platform data directory.
    pub history_dir: Option<PathBuf>,
    /// Directory of the vector memory store. `None` means the platform
    /// data directory.
    pub memory_dir: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolve_history_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.history_dir {
            Some(dir) => Ok(dir.clone()),
            None => paths::history_dir(),
        }
    }

    pub fn resolve_memory_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.memory_dir {
            Some(dir) => Ok(dir.clone()),
            None => paths::memory_dir(),
        }
    }
}
