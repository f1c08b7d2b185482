//! Builds the agent and its collaborators from configuration.

use std::sync::Arc;
use std::time::Duration;

use shellwright_agent::{
    Agent, AgentOptions, CommandExecutor, FileHistory, StdinConfirmer, VectorMemory,
};
use shellwright_ai::{GeminiClient, GeminiConfig, RetryPolicy};
use shellwright_common::{ConfigError, ShellwrightError};
use shellwright_config::schema::API_KEY_ENV;
use shellwright_config::{ModelConfig, ShellwrightConfig};
use shellwright_terminal::{PtyOptions, SessionManager};
use tracing::info;

pub struct Runtime {
    pub agent: Agent,
    pub sessions: Arc<SessionManager>,
}

impl Runtime {
    pub async fn build(
        config: &ShellwrightConfig,
        interactive: bool,
    ) -> Result<Self, ShellwrightError> {
        let api_key = config.model.resolve_api_key().ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "no API key: set model.api_key or ${API_KEY_ENV}"
            ))
        })?;
        let gemini = Arc::new(
            GeminiClient::new(gemini_config(&config.model, api_key))
                .map_err(|e| ShellwrightError::Ai(e.to_string()))?,
        );

        let sessions = Arc::new(SessionManager::new(PtyOptions::from(&config.shell)));
        let executor = Arc::new(CommandExecutor::new(
            Arc::clone(&sessions),
            config.security.command_allowlist.clone(),
        ));

        let history = open_history(config).await?;
        let memory_dir = config.storage.resolve_memory_dir()?;
        let memory = VectorMemory::open(&memory_dir, gemini.clone())
            .await
            .map_err(|e| ShellwrightError::Storage(e.to_string()))?;

        let mut agent = Agent::new(gemini, executor, Arc::new(memory), Arc::new(history))
            .with_options(AgentOptions {
                recall_limit: config.agent.recall_limit,
                distill_min_turns: config.agent.distill_min_turns,
            });
        if interactive || config.agent.interactive_mode {
            agent = agent.with_confirmer(Arc::new(StdinConfirmer::new()));
        }

        info!(
            model = %config.model.name,
            interactive = agent.is_interactive(),
            allowlist = config.security.command_allowlist.len(),
            "runtime ready"
        );
        Ok(Self { agent, sessions })
    }
}

pub async fn open_history(config: &ShellwrightConfig) -> Result<FileHistory, ShellwrightError> {
    let dir = config.storage.resolve_history_dir()?;
    FileHistory::open(dir)
        .await
        .map_err(|e| ShellwrightError::Storage(e.to_string()))
}

pub fn gemini_config(model: &ModelConfig, api_key: String) -> GeminiConfig {
    GeminiConfig::new(api_key)
        .with_model(&model.name)
        .with_embedding_model(&model.embedding_model)
        .with_max_tokens(model.max_tokens)
        .with_temperature(model.temperature)
        .with_retry(RetryPolicy::new(
            model.max_attempts,
            Duration::from_millis(model.retry_base_delay_ms),
        ))
}
