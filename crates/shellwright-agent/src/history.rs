//! Persistent conversation history.
//!
//! [`FileHistory`] keeps one append-only JSON Lines file per conversation
//! (`<id>.jsonl`) plus a small `<id>.meta.json` holding its display name.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shellwright_ai::Role;
use shellwright_common::new_id;
use tokio::io::AsyncWriteExt;
use tracing::debug;

pub const DEFAULT_SESSION_NAME: &str = "New Conversation";

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode history entry: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("corrupt history for session {session} at line {line}: {source}")]
    Corrupt {
        session: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid session id: {0:?}")]
    InvalidSession(String),
}

/// One persisted turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
    pub time: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            time: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub id: String,
    pub name: String,
    pub updated_at: DateTime<Utc>,
}

/// Ordered, append-only storage of conversation turns.
#[async_trait]
pub trait History: Send + Sync {
    async fn create_session(&self, name: &str) -> Result<String, HistoryError>;

    async fn add_message(&self, session: &str, role: Role, content: &str)
        -> Result<(), HistoryError>;

    /// All turns for `session`, oldest first. Unknown sessions are empty.
    async fn load_history(&self, session: &str) -> Result<Vec<HistoryEntry>, HistoryError>;

    /// Known sessions, most recently updated first.
    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, HistoryError>;

    async fn set_session_name(&self, session: &str, name: &str) -> Result<(), HistoryError>;

    /// Display name, or [`DEFAULT_SESSION_NAME`] when none was stored.
    async fn session_name(&self, session: &str) -> String;
}

#[derive(Serialize, Deserialize)]
struct SessionMeta {
    name: String,
}

pub struct FileHistory {
    dir: PathBuf,
}

impl FileHistory {
    /// Open (creating if needed) a history directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        debug!(dir = %dir.display(), "history store opened");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn session_path(&self, session: &str) -> Result<PathBuf, HistoryError> {
        validate_session_id(session)?;
        Ok(self.dir.join(format!("{session}.jsonl")))
    }

    fn meta_path(&self, session: &str) -> Result<PathBuf, HistoryError> {
        validate_session_id(session)?;
        Ok(self.dir.join(format!("{session}.meta.json")))
    }
}

/// Session ids become file names, so path separators and dot-only names
/// are refused.
fn validate_session_id(session: &str) -> Result<(), HistoryError> {
    let bad = session.is_empty()
        || session.chars().all(|c| c == '.')
        || session.contains(['/', '\\', '\0']);
    if bad {
        return Err(HistoryError::InvalidSession(session.to_string()));
    }
    Ok(())
}

#[async_trait]
impl History for FileHistory {
    async fn create_session(&self, name: &str) -> Result<String, HistoryError> {
        let id = new_id();
        let name = if name.trim().is_empty() {
            DEFAULT_SESSION_NAME
        } else {
            name
        };
        self.set_session_name(&id, name).await?;
        tokio::fs::write(self.session_path(&id)?, b"").await?;
        Ok(id)
    }

    async fn add_message(
        &self,
        session: &str,
        role: Role,
        content: &str,
    ) -> Result<(), HistoryError> {
        let path = self.session_path(session)?;
        let mut line = serde_json::to_vec(&HistoryEntry::new(role, content))?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn load_history(&self, session: &str) -> Result<Vec<HistoryEntry>, HistoryError> {
        let path = self.session_path(session)?;
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        data.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str(line).map_err(|source| HistoryError::Corrupt {
                    session: session.to_string(),
                    line: idx + 1,
                    source,
                })
            })
            .collect()
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, HistoryError> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut sessions = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            let Ok(modified) = entry.metadata().await.and_then(|m| m.modified()) else {
                continue;
            };
            sessions.push(SessionSummary {
                name: self.session_name(&id).await,
                id,
                updated_at: DateTime::<Utc>::from(modified),
            });
        }

        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    async fn set_session_name(&self, session: &str, name: &str) -> Result<(), HistoryError> {
        let meta = SessionMeta {
            name: name.to_string(),
        };
        tokio::fs::write(self.meta_path(session)?, serde_json::to_vec(&meta)?).await?;
        Ok(())
    }

    async fn session_name(&self, session: &str) -> String {
        let Ok(path) = self.meta_path(session) else {
            return DEFAULT_SESSION_NAME.to_string();
        };
        tokio::fs::read(&path)
            .await
            .ok()
            .and_then(|data| serde_json::from_slice::<SessionMeta>(&data).ok())
            .map(|meta| meta.name)
            .unwrap_or_else(|| DEFAULT_SESSION_NAME.to_string())
    }
}
