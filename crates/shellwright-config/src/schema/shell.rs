//! Shell process configuration types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Settings for the persistent shell each conversation runs against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Shell program. Empty string means detect from `$SHELL`.
    pub program: String,
    /// Arguments passed to an explicitly configured shell. A detected
    /// shell gets flags matching its kind instead.
    pub args: Vec<String>,
    /// Extra environment variables injected into the shell.
    pub env: HashMap<String, String>,
    /// Per-command deadline.
    pub command_timeout_secs: u64,
    /// Deadline for the startup round-trip that makes a session ready.
    pub init_timeout_secs: u64,
    pub cols: u16,
    pub rows: u16,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            program: "bash".to_string(),
            args: vec!["--noprofile".to_string(), "--norc".to_string()],
            env: HashMap::new(),
            command_timeout_secs: 10,
            init_timeout_secs: 3,
            cols: 200,
            rows: 50,
        }
    }
}

impl ShellConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn init_timeout(&self) -> Duration {
        Duration::from_secs(self.init_timeout_secs)
    }
}
