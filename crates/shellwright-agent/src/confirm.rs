//! Interactive confirmation for mutating tool calls.

use std::io::{BufRead, Write};

use async_trait::async_trait;
use tokio::sync::Mutex;

#[async_trait]
pub trait Confirmer: Send + Sync {
    /// Ask whether `action` may proceed.
    async fn confirm(&self, action: &str) -> bool;
}

/// Approves everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprove;

#[async_trait]
impl Confirmer for AutoApprove {
    async fn confirm(&self, _action: &str) -> bool {
        true
    }
}

/// Prompts on stdout and reads the answer from stdin. Concurrent prompts
/// are asked one at a time.
#[derive(Debug, Default)]
pub struct StdinConfirmer {
    prompt_lock: Mutex<()>,
}

impl StdinConfirmer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Confirmer for StdinConfirmer {
    async fn confirm(&self, action: &str) -> bool {
        let _guard = self.prompt_lock.lock().await;
        let action = action.to_string();
        let answer = tokio::task::spawn_blocking(move || {
            let mut stdout = std::io::stdout();
            let _ = write!(stdout, "\n[INTERACTIVE MODE] Confirm action: {action} (y/n): ");
            let _ = stdout.flush();
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line).map(|_| line)
        })
        .await;

        matches!(answer, Ok(Ok(line)) if is_affirmative(&line))
    }
}

/// `y` or `yes`, case-insensitive, surrounding whitespace ignored.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
