//! The agent: one prompt in, one answer out, with model-requested tool
//! calls dispatched in between.
//!
//! Each turn alternates between awaiting the model and dispatching the
//! tool calls it asked for, ending when a reply carries no tool calls.

mod dispatch;
mod distill;
mod runner;

#[cfg(test)]
mod tests;

use std::sync::{Arc, Mutex};

use shellwright_ai::{AiError, LanguageModel, TokenTracker, TokenUsage, ToolDefinition};
use tracing::warn;

use crate::confirm::Confirmer;
use crate::editor::FileEditor;
use crate::executor::Executor;
use crate::history::{History, HistoryError};
use crate::memory::{Memory, MemoryError};
use crate::tools::builtin_tools;

/// Turn-fatal failures. Tool-level errors never surface here; they are
/// reported back to the model as text.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("history error: {0}")]
    History(#[from] HistoryError),

    #[error("model error: {0}")]
    Model(#[from] AiError),

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentOptions {
    /// Memories prepended to each prompt.
    pub recall_limit: usize,
    /// Turns a session needs before it is worth distilling.
    pub distill_min_turns: usize,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            recall_limit: 5,
            distill_min_turns: 5,
        }
    }
}

pub struct Agent {
    model: Arc<dyn LanguageModel>,
    executor: Arc<dyn Executor>,
    memory: Arc<dyn Memory>,
    history: Arc<dyn History>,
    editor: FileEditor,
    /// `Some` in interactive mode.
    confirmer: Option<Arc<dyn Confirmer>>,
    options: AgentOptions,
    tools: Vec<ToolDefinition>,
    tracker: Mutex<TokenTracker>,
}

impl Agent {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        executor: Arc<dyn Executor>,
        memory: Arc<dyn Memory>,
        history: Arc<dyn History>,
    ) -> Self {
        Self {
            model,
            executor,
            memory,
            history,
            editor: FileEditor::new(),
            confirmer: None,
            options: AgentOptions::default(),
            tools: builtin_tools(),
            tracker: Mutex::new(TokenTracker::new()),
        }
    }

    /// Require confirmation for mutating tool calls.
    pub fn with_confirmer(mut self, confirmer: Arc<dyn Confirmer>) -> Self {
        self.confirmer = Some(confirmer);
        self
    }

    pub fn with_options(mut self, options: AgentOptions) -> Self {
        self.options = options;
        self
    }

    pub fn is_interactive(&self) -> bool {
        self.confirmer.is_some()
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn history(&self) -> &Arc<dyn History> {
        &self.history
    }

    /// Tokens used by `session` so far in this process.
    pub fn token_usage(&self, session: &str) -> TokenUsage {
        self.lock_tracker()
            .for_session(session)
            .copied()
            .unwrap_or_default()
    }

    fn record_usage(&self, session: &str, usage: &TokenUsage) {
        self.lock_tracker().record(session, usage);
    }

    fn lock_tracker(&self) -> std::sync::MutexGuard<'_, TokenTracker> {
        self.tracker.lock().unwrap_or_else(|e| {
            warn!("token tracker lock poisoned, recovering");
            e.into_inner()
        })
    }
}
