//! In-memory session storage.

use async_trait::async_trait;
use parking_lot::RwLock;

use super::SessionStore;
use crate::error::StoreError;
use crate::model::SessionToken;

/// In-memory session store.
///
/// Not persistent; the session is lost when the process exits. Counts
/// writes so tests can assert how many sessions an attempt produced.
#[derive(Default)]
pub struct MemorySessionStore {
    current: RwLock<Option<SessionToken>>,
    saves: RwLock<usize>,
}

impl MemorySessionStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a session.
    pub fn with_session(session: SessionToken) -> Self {
        Self {
            current: RwLock::new(Some(session)),
            saves: RwLock::new(0),
        }
    }

    /// How many times [`save`](SessionStore::save) has been called.
    pub fn save_count(&self) -> usize {
        *self.saves.read()
    }

    /// Snapshot of the current session without going through the trait.
    pub fn current(&self) -> Option<SessionToken> {
        self.current.read().clone()
    }
}

impl std::fmt::Debug for MemorySessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySessionStore")
            .field("has_session", &self.current.read().is_some())
            .field("saves", &self.save_count())
            .finish()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<SessionToken>, StoreError> {
        Ok(self.current.read().clone())
    }

    async fn save(&self, session: &SessionToken) -> Result<(), StoreError> {
        *self.current.write() = Some(session.clone());
        *self.saves.write() += 1;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.current.write().take();
        Ok(())
    }
}
