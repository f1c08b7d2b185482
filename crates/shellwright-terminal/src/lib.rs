//! Persistent shell sessions over pseudo-terminals.
//!
//! Each conversation owns one long-lived interactive shell ([`PtySession`])
//! and runs commands against it with request/response semantics layered
//! over the unframed terminal byte stream. [`SessionManager`] maps
//! conversation ids to sessions, creating them lazily.

pub mod manager;
pub mod pty;
pub mod shell;

pub use manager::{SessionManager, ShellFactory};
pub use pty::{PtyOptions, PtySession, SessionError, Shell};
pub use shell::detect_shell;
