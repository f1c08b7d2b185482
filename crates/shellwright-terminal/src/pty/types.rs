//! Public types for PTY-backed shell sessions.

use std::collections::HashMap;
use std::time::Duration;

use shellwright_config::ShellConfig;

use crate::shell::{quiet_args, resolve_program};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Errors originating from shell session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to spawn shell: {0}")]
    SpawnFailed(String),

    #[error("shell initialization failed: {0}")]
    InitFailed(String),

    #[error("session closed")]
    Closed,

    /// The command did not finish before its deadline. The shell keeps
    /// running it; later output may surface in the next call's capture.
    #[error("command timed out after {timeout:?}")]
    Timeout { timeout: Duration, partial: String },

    #[error("shell output stream ended: {reason}")]
    StreamEnded { reason: String, partial: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// Output captured before the failure, if any.
    pub fn partial_output(&self) -> Option<&str> {
        match self {
            Self::Timeout { partial, .. } | Self::StreamEnded { partial, .. } => Some(partial),
            _ => None,
        }
    }

    /// Whether the session can still be used after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// How to spawn and drive a shell session.
#[derive(Debug, Clone)]
pub struct PtyOptions {
    pub program: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub cols: u16,
    pub rows: u16,
    pub command_timeout: Duration,
    pub init_timeout: Duration,
}

impl Default for PtyOptions {
    fn default() -> Self {
        Self::from(&ShellConfig::default())
    }
}

impl From<&ShellConfig> for PtyOptions {
    /// A detected shell gets its own no-startup-files flags instead of the
    /// configured arguments.
    fn from(config: &ShellConfig) -> Self {
        let program = resolve_program(&config.program);
        let args = if config.program.trim().is_empty() {
            quiet_args(&program)
        } else {
            config.args.clone()
        };
        Self {
            program,
            args,
            env: config.env.clone(),
            cols: config.cols,
            rows: config.rows,
            command_timeout: config.command_timeout(),
            init_timeout: config.init_timeout(),
        }
    }
}

// ---------------------------------------------------------------------------
// Shell trait
// ---------------------------------------------------------------------------

/// A persistent shell that runs one command at a time.
///
/// Implementations block the calling thread; async callers should run
/// them on a blocking pool.
pub trait Shell: Send + Sync {
    fn id(&self) -> &str;

    /// Run `command` with the implementation's default deadline and
    /// return its cleaned output.
    fn execute(&self, command: &str) -> Result<String, SessionError>;

    /// Terminate the shell. Calling more than once is a no-op.
    fn close(&self) -> Result<(), SessionError>;

    fn is_closed(&self) -> bool;
}
