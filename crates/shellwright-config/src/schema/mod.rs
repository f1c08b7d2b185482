//! Configuration schema types for shellwright.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod agent;
mod model;
mod shell;
mod storage;
mod system;

pub use agent::*;
pub use model::*;
pub use shell::*;
pub use storage::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellwrightConfig {
    pub model: ModelConfig,
    pub agent: AgentSection,
    pub shell: ShellConfig,
    pub security: SecurityConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}
