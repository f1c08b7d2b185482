//! Language-model client settings.

use serde::{Deserialize, Serialize};

/// Environment variable consulted when `model.api_key` is not set.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Generation model name.
    pub name: String,
    /// API key. `None` falls back to `$GEMINI_API_KEY`.
    pub api_key: Option<String>,
    /// Embedding model used by long-term memory.
    pub embedding_model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    /// Total attempts per model call, including the first.
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles on each further retry.
    pub retry_base_delay_ms: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "gemini-2.0-flash".to_string(),
            api_key: None,
            embedding_model: "text-embedding-004".to_string(),
            max_tokens: 8192,
            temperature: 0.7,
            max_attempts: 3,
            retry_base_delay_ms: 1000,
        }
    }
}

impl ModelConfig {
    /// The configured key, or the environment fallback.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("name", &self.name)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("embedding_model", &self.embedding_model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("max_attempts", &self.max_attempts)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .finish()
    }
}
