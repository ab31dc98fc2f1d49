//! Capability traits the resolver is driven through.
//!
//! The resolver owns none of these implementations. A browser shell wires
//! in its identity SDK, REST client and modal forms; tests wire in
//! deterministic fakes.
//!
//! - [`IdentityProvider`] - popups, method lookup, linking, password sign-in
//! - [`Backend`] - server-mediated token exchange and custom-token sign-in
//! - [`EmailPrompter`] / [`PasswordPrompter`] - suspension points for user input
//! - [`Collaborators`] - the bundle handed to [`ConflictResolver`](crate::ConflictResolver)

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{BackendError, ProviderError};
use crate::model::{Identity, PendingCredential, ProviderId, SignInMethodSet};
use crate::secret::Secret;
use crate::session::SessionStore;

/// Result of binding a credential to an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// A new binding was created.
    Linked,

    /// The identity already had this credential; nothing changed.
    AlreadyLinked,
}

/// Federated identity provider operations.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Run an interactive (popup or redirect) sign-in with `provider`.
    ///
    /// Suspends until the user finishes or abandons the provider flow.
    async fn sign_in_interactive(&self, provider: &ProviderId) -> Result<Identity, ProviderError>;

    /// Provider-specific helper recovering a credential from a conflict error.
    ///
    /// Best-effort: returns `None` when `provider`'s helper finds nothing.
    fn recover_credential_from_error(
        &self,
        provider: &ProviderId,
        error: &ProviderError,
    ) -> Option<PendingCredential>;

    /// Sign-in methods already bound to `email`.
    async fn list_sign_in_methods(&self, email: &str) -> Result<SignInMethodSet, ProviderError>;

    /// Bind `credential` to `identity`.
    ///
    /// Linking a credential the identity already holds must not create a
    /// second binding; implementations report it as
    /// [`LinkStatus::AlreadyLinked`] or with an already-linked error code.
    async fn link_credential(
        &self,
        identity: &Identity,
        credential: PendingCredential,
    ) -> Result<LinkStatus, ProviderError>;

    /// Sign in with email and password.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &Secret,
    ) -> Result<Identity, ProviderError>;

    /// Obtain a session token for an authenticated identity.
    async fn fetch_session_token(&self, identity: &Identity) -> Result<Secret, ProviderError>;
}

/// Portal REST backend operations used during resolution.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Exchange a provider access token for a server-issued custom token.
    async fn exchange_provider_token(
        &self,
        provider_name: &str,
        access_token: &Secret,
    ) -> Result<Secret, BackendError>;

    /// Sign in with a server-issued custom token.
    async fn sign_in_with_custom_token(&self, token: &Secret) -> Result<Identity, BackendError>;
}

/// Asks the user for the email a conflict is about.
#[async_trait]
pub trait EmailPrompter: Send + Sync {
    /// `None` or blank input means the user declined.
    async fn prompt_for_email(&self, attempted: &ProviderId) -> Option<String>;
}

/// Asks the user for the password of an existing account.
#[async_trait]
pub trait PasswordPrompter: Send + Sync {
    /// `None` or blank input means the user declined.
    async fn prompt_for_password(&self, email: &str) -> Option<Secret>;
}

/// Everything the resolver talks to, injected rather than imported.
#[derive(Clone)]
pub struct Collaborators {
    pub identity: Arc<dyn IdentityProvider>,
    pub backend: Arc<dyn Backend>,
    pub email_prompter: Arc<dyn EmailPrompter>,
    pub password_prompter: Arc<dyn PasswordPrompter>,
    pub sessions: Arc<dyn SessionStore>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
