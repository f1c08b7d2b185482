//! Allowlist gate in front of the shell sessions.

use std::sync::Arc;

use shellwright_terminal::{SessionError, SessionManager};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("empty command")]
    Empty,

    #[error("command '{0}' is not in the allowlist")]
    NotAllowed(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Runs a command in the shell belonging to a conversation. Blocking.
pub trait Executor: Send + Sync {
    fn execute(&self, session_id: &str, command: &str) -> Result<String, ExecError>;
}

/// Checks the command's base token against the allowlist, then runs it in
/// the conversation's persistent shell. An empty allowlist permits every
/// command.
pub struct CommandExecutor {
    sessions: Arc<SessionManager>,
    allowlist: Vec<String>,
}

impl CommandExecutor {
    pub fn new(sessions: Arc<SessionManager>, allowlist: Vec<String>) -> Self {
        Self {
            sessions,
            allowlist,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Validate `command` without running it.
    pub fn check(&self, command: &str) -> Result<(), ExecError> {
        let base = command.split_whitespace().next().ok_or(ExecError::Empty)?;
        if !self.allowlist.is_empty() && !self.allowlist.iter().any(|a| a == base) {
            warn!(command = base, "command blocked by allowlist");
            return Err(ExecError::NotAllowed(base.to_string()));
        }
        Ok(())
    }
}

impl Executor for CommandExecutor {
    fn execute(&self, session_id: &str, command: &str) -> Result<String, ExecError> {
        self.check(command)?;
        debug!(session = session_id, command, "executing shell command");
        let shell = self.sessions.get_or_create(session_id)?;
        Ok(shell.execute(command)?)
    }
}
