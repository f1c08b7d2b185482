//! PTY-backed shell sessions.
//!
//! A raw terminal stream has no message framing, so every command is
//! followed by an echo of a fresh [`Sentinel`](sentinel::Sentinel) and the
//! output is whatever arrives before that marker.

mod sentinel;
mod session;
mod types;

pub use sentinel::{clean_output, Sentinel};
pub use session::PtySession;
pub use types::{PtyOptions, SessionError, Shell};
