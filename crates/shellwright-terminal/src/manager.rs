//! Registry of live shell sessions keyed by conversation id.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use crate::pty::{PtyOptions, PtySession, SessionError, Shell};

/// Creates the shell for a previously unseen id.
pub type ShellFactory = Box<dyn Fn(&str) -> Result<Arc<dyn Shell>, SessionError> + Send + Sync>;

/// One shell per id, created on first use and reused afterwards.
///
/// Lookups share a read lock; creation happens under the write lock after
/// a second existence check, so concurrent first callers for the same id
/// all receive the single session that was created.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<dyn Shell>>>,
    factory: ShellFactory,
}

impl SessionManager {
    /// A manager that spawns [`PtySession`]s with `opts`.
    pub fn new(opts: PtyOptions) -> Self {
        Self::with_factory(Box::new(move |id| {
            let session = PtySession::spawn(id, &opts)?;
            Ok(Arc::new(session) as Arc<dyn Shell>)
        }))
    }

    pub fn with_factory(factory: ShellFactory) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            factory,
        }
    }

    /// Return the session for `id`, creating it if needed.
    ///
    /// A failed creation is not registered; the next call tries again.
    pub fn get_or_create(&self, id: &str) -> Result<Arc<dyn Shell>, SessionError> {
        if let Some(session) = self.read().get(id) {
            return Ok(Arc::clone(session));
        }

        let mut sessions = self.write();
        if let Some(session) = sessions.get(id) {
            return Ok(Arc::clone(session));
        }

        debug!(session = %id, "creating shell session");
        let session = (self.factory)(id)?;
        sessions.insert(id.to_string(), Arc::clone(&session));
        Ok(session)
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Shell>> {
        self.read().get(id).cloned()
    }

    /// Close and forget one session. Returns whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.write().remove(id);
        match removed {
            Some(session) => {
                if let Err(e) = session.close() {
                    warn!(session = %id, error = %e, "failed to close session");
                }
                true
            }
            None => false,
        }
    }

    /// Close every tracked session and clear the registry.
    ///
    /// Sessions are closed after the lock is released, so a command still
    /// running on one of them cannot block registry access.
    pub fn cleanup(&self) {
        let drained: Vec<(String, Arc<dyn Shell>)> = self.write().drain().collect();
        if drained.is_empty() {
            return;
        }
        info!(count = drained.len(), "closing shell sessions");
        for (id, session) in drained {
            if let Err(e) = session.close() {
                warn!(session = %id, error = %e, "failed to close session");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<dyn Shell>>> {
        self.sessions.read().unwrap_or_else(|e| {
            warn!("session registry lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<dyn Shell>>> {
        self.sessions.write().unwrap_or_else(|e| {
            warn!("session registry lock poisoned, recovering");
            e.into_inner()
        })
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.cleanup();
    }
}
