//! Line reads and exact-match text replacement on files.

use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("old text must not be empty")]
    EmptyPattern,

    #[error("old text not found in file")]
    NotFound,

    #[error("old text found multiple times ({count}), please be more specific")]
    Ambiguous { count: usize },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FileEditor;

impl FileEditor {
    pub fn new() -> Self {
        Self
    }

    /// Lines `start..=end` of the file, 1-indexed. `end <= 0` reads to the
    /// end of the file; `start < 1` is treated as 1.
    pub fn read_lines(&self, path: &Path, start: i64, end: i64) -> Result<Vec<String>, EditError> {
        let content = fs::read_to_string(path)?;
        let start = start.max(1) as usize;
        let lines = content.lines().skip(start - 1);
        let selected = if end > 0 {
            let count = (end as usize + 1).saturating_sub(start);
            lines.take(count).map(str::to_string).collect()
        } else {
            lines.map(str::to_string).collect()
        };
        Ok(selected)
    }

    /// Replace the single occurrence of `old` with `new`. The file is left
    /// untouched unless `old` occurs exactly once.
    pub fn replace(&self, path: &Path, old: &str, new: &str) -> Result<(), EditError> {
        if old.is_empty() {
            return Err(EditError::EmptyPattern);
        }
        let content = fs::read_to_string(path)?;
        match content.matches(old).count() {
            0 => Err(EditError::NotFound),
            1 => {
                fs::write(path, content.replacen(old, new, 1))?;
                Ok(())
            }
            count => Err(EditError::Ambiguous { count }),
        }
    }
}
