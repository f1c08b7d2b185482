//! Agent loop and command policy settings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    /// Ask before running shell commands or editing files.
    pub interactive_mode: bool,
    /// How many memories are recalled to enrich each prompt.
    pub recall_limit: usize,
    /// Session used when the caller does not name one.
    pub default_session: String,
    /// Minimum transcript length before distillation does anything.
    pub distill_min_turns: usize,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            interactive_mode: false,
            recall_limit: 5,
            default_session: "default".to_string(),
            distill_min_turns: 5,
        }
    }
}

/// Command policy. An empty allowlist permits every command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub command_allowlist: Vec<String>,
}
