//! Tools the model can call, their schemas and argument decoding.

use std::path::PathBuf;

use serde_json::{json, Value};
use shellwright_ai::{ToolCall, ToolDefinition};

use crate::editor::EditError;
use crate::executor::ExecError;
use crate::memory::{MemoryError, MemoryHit};

pub const EXECUTE_COMMAND: &str = "execute_command";
pub const READ_FILE: &str = "read_file";
pub const REPLACE_TEXT: &str = "replace_text";
pub const MEMORY_SAVE: &str = "memory_save";
pub const MEMORY_LOAD: &str = "memory_load";
pub const MEMORY_FORGET: &str = "memory_forget";

pub const TEXT_REPLACED: &str = "Text replaced successfully";
pub const MEMORIZED: &str = "Information memorized";
pub const FORGOTTEN: &str = "Memory forgotten";
pub const CANCELLED: &str = "Action cancelled by user";
pub const NO_MEMORIES: &str = "No memories found";

pub const DEFAULT_RECALL_LIMIT: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("{tool}: missing required argument '{arg}'")]
    MissingArgument { tool: String, arg: &'static str },

    #[error("{tool}: argument '{arg}' must be {expected}")]
    InvalidArgument {
        tool: String,
        arg: &'static str,
        expected: &'static str,
    },

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error("tool task failed: {0}")]
    Task(String),
}

/// The tool declarations sent with every model request.
pub fn builtin_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: EXECUTE_COMMAND.to_string(),
            description: "Execute a shell command in this conversation's persistent shell. \
                          Working directory and environment carry over between calls."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "The shell command to execute"
                    }
                },
                "required": ["command"]
            }),
        },
        ToolDefinition {
            name: READ_FILE.to_string(),
            description: "Read a range of lines from a file.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "Path to the file" },
                    "start": { "type": "integer", "description": "Start line (1-indexed)" },
                    "end": {
                        "type": "integer",
                        "description": "End line, inclusive (optional; omit or 0 for end of file)"
                    }
                },
                "required": ["path", "start"]
            }),
        },
        ToolDefinition {
            name: REPLACE_TEXT.to_string(),
            description: "Replace text in a file. The old text must occur exactly once."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "Path to the file" },
                    "old_text": { "type": "string", "description": "Exact text to find" },
                    "new_text": { "type": "string", "description": "Replacement text" }
                },
                "required": ["path", "old_text", "new_text"]
            }),
        },
        ToolDefinition {
            name: MEMORY_SAVE.to_string(),
            description: "Save information to long-term memory.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "id": { "type": "string", "description": "Unique ID for the memory" },
                    "content": { "type": "string", "description": "Content to memorize" }
                },
                "required": ["id", "content"]
            }),
        },
        ToolDefinition {
            name: MEMORY_LOAD.to_string(),
            description: "Search long-term memory.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Search query" },
                    "limit": { "type": "integer", "description": "Max results (default 5)" }
                },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: MEMORY_FORGET.to_string(),
            description: "Delete information from long-term memory.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "id": { "type": "string", "description": "ID of the memory to delete" }
                },
                "required": ["id"]
            }),
        },
    ]
}

/// A decoded, argument-checked tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    ExecuteCommand {
        command: String,
    },
    ReadFile {
        path: PathBuf,
        start: i64,
        end: i64,
    },
    ReplaceText {
        path: PathBuf,
        old_text: String,
        new_text: String,
    },
    MemorySave {
        id: String,
        content: String,
    },
    MemoryLoad {
        query: String,
        limit: usize,
    },
    MemoryForget {
        id: String,
    },
}

impl ToolRequest {
    pub fn from_call(call: &ToolCall) -> Result<Self, ToolError> {
        let args = Args {
            tool: &call.name,
            value: &call.arguments,
        };
        let request = match call.name.as_str() {
            EXECUTE_COMMAND => Self::ExecuteCommand {
                command: args.string("command")?,
            },
            READ_FILE => Self::ReadFile {
                path: PathBuf::from(args.string("path")?),
                start: args.integer("start")?,
                end: args.optional_integer("end")?.unwrap_or(0),
            },
            REPLACE_TEXT => Self::ReplaceText {
                path: PathBuf::from(args.string("path")?),
                old_text: args.string("old_text")?,
                new_text: args.string("new_text")?,
            },
            MEMORY_SAVE => Self::MemorySave {
                id: args.string("id")?,
                content: args.string("content")?,
            },
            MEMORY_LOAD => Self::MemoryLoad {
                query: args.string("query")?,
                limit: match args.optional_integer("limit")? {
                    None => DEFAULT_RECALL_LIMIT,
                    Some(n) if n > 0 => n as usize,
                    Some(_) => return Err(args.invalid("limit", "a positive integer")),
                },
            },
            MEMORY_FORGET => Self::MemoryForget {
                id: args.string("id")?,
            },
            other => return Err(ToolError::UnknownTool(other.to_string())),
        };
        Ok(request)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ExecuteCommand { .. } => EXECUTE_COMMAND,
            Self::ReadFile { .. } => READ_FILE,
            Self::ReplaceText { .. } => REPLACE_TEXT,
            Self::MemorySave { .. } => MEMORY_SAVE,
            Self::MemoryLoad { .. } => MEMORY_LOAD,
            Self::MemoryForget { .. } => MEMORY_FORGET,
        }
    }

    /// Calls that change the host and need confirmation in interactive mode.
    pub fn is_mutating(&self) -> bool {
        matches!(self, Self::ExecuteCommand { .. } | Self::ReplaceText { .. })
    }

    /// Human-readable action shown when asking for confirmation.
    pub fn describe(&self) -> String {
        match self {
            Self::ExecuteCommand { command } => format!("Execute command: {command}"),
            Self::ReplaceText { path, .. } => format!("Replace text in {}", path.display()),
            other => other.name().to_string(),
        }
    }
}

struct Args<'a> {
    tool: &'a str,
    value: &'a Value,
}

impl Args<'_> {
    fn missing(&self, arg: &'static str) -> ToolError {
        ToolError::MissingArgument {
            tool: self.tool.to_string(),
            arg,
        }
    }

    fn invalid(&self, arg: &'static str, expected: &'static str) -> ToolError {
        ToolError::InvalidArgument {
            tool: self.tool.to_string(),
            arg,
            expected,
        }
    }

    fn get(&self, arg: &str) -> Option<&Value> {
        self.value.get(arg).filter(|v| !v.is_null())
    }

    fn string(&self, arg: &'static str) -> Result<String, ToolError> {
        match self.get(arg) {
            None => Err(self.missing(arg)),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(self.invalid(arg, "a string")),
        }
    }

    fn integer(&self, arg: &'static str) -> Result<i64, ToolError> {
        self.optional_integer(arg)?.ok_or_else(|| self.missing(arg))
    }

    /// Integers may arrive as JSON floats (`3.0`); fractional values are
    /// rejected.
    fn optional_integer(&self, arg: &'static str) -> Result<Option<i64>, ToolError> {
        let Some(value) = self.get(arg) else {
            return Ok(None);
        };
        if let Some(n) = value.as_i64() {
            return Ok(Some(n));
        }
        match value.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Some(f as i64)),
            _ => Err(self.invalid(arg, "an integer")),
        }
    }
}

/// Render recall hits for the model.
pub fn format_memory_hits(hits: &[MemoryHit]) -> String {
    if hits.is_empty() {
        return NO_MEMORIES.to_string();
    }
    hits.iter()
        .map(|hit| format!("ID: {}\nContent: {}\n\n", hit.id, hit.content))
        .collect()
}
