//! Shared types for the shellwright workspace: the top-level error
//! taxonomy and identifier helpers.

pub mod errors;
pub mod id;

pub use errors::{ConfigError, ShellwrightError};
pub use id::{new_id, new_token, SessionId};

pub type Result<T> = std::result::Result<T, ShellwrightError>;
