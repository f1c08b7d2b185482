//! The shellwright agent runtime.
//!
//! An [`Agent`] turns one prompt into one answer, letting the model call
//! host tools in between: shell commands through the allowlisted
//! [`CommandExecutor`], file reads and edits through [`FileEditor`], and
//! long-term memory through a [`Memory`] store. Conversation turns are
//! persisted by a [`History`] store.

pub mod agent;
pub mod confirm;
pub mod editor;
pub mod executor;
pub mod history;
pub mod memory;
pub mod orchestrator;
pub mod tools;

pub use agent::{Agent, AgentError, AgentOptions};
pub use confirm::{AutoApprove, Confirmer, StdinConfirmer};
pub use editor::{EditError, FileEditor};
pub use executor::{CommandExecutor, ExecError, Executor};
pub use history::{FileHistory, History, HistoryEntry, HistoryError, SessionSummary};
pub use memory::{Memory, MemoryDocument, MemoryError, MemoryHit, VectorMemory};
pub use orchestrator::{run_parallel, Task, TaskResult};
pub use tools::{builtin_tools, ToolError, ToolRequest};
