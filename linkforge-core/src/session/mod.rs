//! Session token persistence.
//!
//! The Session Finalizer is the only writer; the rest of the application
//! reads the persisted [`SessionToken`] to authenticate REST calls.
//!
//! This module provides:
//! - [`SessionStore`] - Trait for session storage backends
//! - [`MemorySessionStore`] - In-memory implementation for tests and headless runs
//! - [`KeyringSessionStore`] - OS keyring implementation (with `keyring-store` feature)
//! - [`create_session_store`] - Helper to select backend based on availability
//!
//! # Example
//!
//! ```rust,ignore
//! use linkforge_core::session::create_session_store;
//!
//! let store = create_session_store(true, "default");
//! if let Some(session) = store.load().await? {
//!     println!("signed in as {}", session.uid);
//! }
//! ```

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::SessionToken;

mod memory;
#[cfg(feature = "keyring-store")]
mod keyring;

pub use memory::MemorySessionStore;
#[cfg(feature = "keyring-store")]
pub use keyring::KeyringSessionStore;

/// Abstraction over session storage backends.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the persisted session, if any.
    async fn load(&self) -> Result<Option<SessionToken>, StoreError>;

    /// Persist a session, replacing any previous one.
    async fn save(&self, session: &SessionToken) -> Result<(), StoreError>;

    /// Remove the persisted session.
    ///
    /// Returns `Ok(())` even if nothing was stored.
    async fn clear(&self) -> Result<(), StoreError>;
}

/// Create a session store with automatic backend selection.
///
/// - If `prefer_keyring` is `true` and the `keyring-store` feature is enabled,
///   tries a [`KeyringSessionStore`] for `profile` and falls back to memory
///   with a warning if the keyring is unavailable
/// - Otherwise returns a [`MemorySessionStore`]
pub fn create_session_store(prefer_keyring: bool, profile: &str) -> Box<dyn SessionStore> {
    #[cfg(feature = "keyring-store")]
    if prefer_keyring {
        match KeyringSessionStore::try_new(profile) {
            Ok(store) => {
                tracing::info!(profile, "Using OS keyring for session storage");
                return Box::new(store);
            }
            Err(e) => {
                tracing::warn!(
                    "Keyring unavailable ({}), falling back to memory session store. \
                     The session will not survive a restart.",
                    e
                );
            }
        }
    }

    #[cfg(not(feature = "keyring-store"))]
    if prefer_keyring {
        tracing::warn!(
            profile,
            "Keyring storage requested but keyring-store feature not enabled. \
             Using memory session store."
        );
    }

    tracing::debug!("Using in-memory session storage");
    Box::new(MemorySessionStore::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Identity, SessionSource};

    #[tokio::test]
    async fn test_create_session_store_memory() {
        let store = create_session_store(false, "test");

        let identity = Identity::new("uid-1", "google.com");
        let session = SessionToken::new("tok", &identity, SessionSource::Password);
        store.save(&session).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.map(|s| s.uid), Some("uid-1".to_string()));
    }
}
