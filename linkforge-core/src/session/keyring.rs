//! OS keyring-backed session storage.

use async_trait::async_trait;
use keyring::Entry;

use super::SessionStore;
use crate::error::StoreError;
use crate::model::SessionToken;

const KEYRING_SERVICE: &str = "linkforge";

/// OS keyring-backed session store.
///
/// Uses the platform's native keyring service (Keychain, Secret Service,
/// Credential Manager). The session is stored as one JSON entry under
/// service `linkforge`, user `session/{profile}`.
pub struct KeyringSessionStore {
    profile: String,
}

impl KeyringSessionStore {
    /// Try to create a keyring store for a profile.
    ///
    /// Returns an error if the keyring backend is not available on this platform.
    pub fn try_new(profile: &str) -> Result<Self, StoreError> {
        match Entry::new(KEYRING_SERVICE, &Self::user_for(profile)) {
            Ok(_) => Ok(Self {
                profile: profile.to_string(),
            }),
            Err(e) => Err(StoreError::KeyringUnavailable {
                message: format!("keyring backend not available: {}", e),
            }),
        }
    }

    fn user_for(profile: &str) -> String {
        format!("session/{}", profile)
    }

    fn entry(&self) -> Result<Entry, StoreError> {
        Entry::new(KEYRING_SERVICE, &Self::user_for(&self.profile)).map_err(|e| {
            StoreError::BackendError {
                message: format!("failed to create keyring entry: {}", e),
            }
        })
    }
}

impl std::fmt::Debug for KeyringSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyringSessionStore")
            .field("profile", &self.profile)
            .finish()
    }
}

#[async_trait]
impl SessionStore for KeyringSessionStore {
    async fn load(&self) -> Result<Option<SessionToken>, StoreError> {
        match self.entry()?.get_password() {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(keyring::Error::PlatformFailure(e)) => Err(StoreError::BackendError {
                message: format!("platform keyring failure: {}", e),
            }),
            Err(e) => Err(StoreError::BackendError {
                message: format!("keyring error: {}", e),
            }),
        }
    }

    async fn save(&self, session: &SessionToken) -> Result<(), StoreError> {
        let json = serde_json::to_string(session)?;
        self.entry()?
            .set_password(&json)
            .map_err(|e| StoreError::BackendError {
                message: format!("failed to write session to keyring: {}", e),
            })
    }

    async fn clear(&self) -> Result<(), StoreError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StoreError::BackendError {
                message: format!("failed to delete keyring entry: {}", e),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These only touch entries that are never written, so they are safe on
    // machines with a real keyring and skip where none is available.

    #[test]
    fn test_keyring_store_creation() {
        match KeyringSessionStore::try_new("linkforge-test") {
            Ok(store) => assert_eq!(store.profile, "linkforge-test"),
            Err(StoreError::KeyringUnavailable { .. }) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    #[test]
    fn test_keyring_user_naming() {
        assert_eq!(KeyringSessionStore::user_for("work"), "session/work");
    }
}
