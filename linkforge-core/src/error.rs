//! Error types for Linkforge collaborators.
//!
//! Each collaborator boundary has its own error type. None of them escape
//! the resolver: every failure is mapped to an [`Outcome`](crate::Outcome)
//! at the stage that observed it.

use std::fmt;
use thiserror::Error;

use crate::model::{PendingCredential, ProviderId};

/// Error codes reported by the identity provider SDK.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// An account already exists for the email under a different credential.
    AccountExistsWithDifferentCredential,

    /// The credential is already bound to a user.
    CredentialAlreadyInUse,

    /// The provider is already linked to the user.
    ProviderAlreadyLinked,

    /// The user closed the provider popup.
    PopupClosedByUser,

    /// A newer popup request superseded this one.
    CancelledPopupRequest,

    /// The user denied the provider's consent screen.
    UserCancelled,

    /// The provider flow timed out.
    Timeout,

    /// Wrong password for email sign-in.
    WrongPassword,

    /// Transport-level failure talking to the provider.
    NetworkRequestFailed,

    /// Any other code, kept verbatim.
    Other(String),
}

impl ProviderErrorCode {
    /// Parse an SDK code string such as `auth/popup-closed-by-user`.
    ///
    /// The `auth/` prefix is optional.
    pub fn parse(code: &str) -> Self {
        let bare = code.trim().strip_prefix("auth/").unwrap_or(code.trim());
        match bare {
            "account-exists-with-different-credential" => Self::AccountExistsWithDifferentCredential,
            "credential-already-in-use" => Self::CredentialAlreadyInUse,
            "provider-already-linked" => Self::ProviderAlreadyLinked,
            "popup-closed-by-user" => Self::PopupClosedByUser,
            "cancelled-popup-request" => Self::CancelledPopupRequest,
            "user-cancelled" => Self::UserCancelled,
            "timeout" => Self::Timeout,
            "wrong-password" => Self::WrongPassword,
            "network-request-failed" => Self::NetworkRequestFailed,
            _ => Self::Other(code.trim().to_string()),
        }
    }

    /// The SDK code string for this error.
    pub fn as_str(&self) -> &str {
        match self {
            Self::AccountExistsWithDifferentCredential => {
                "auth/account-exists-with-different-credential"
            }
            Self::CredentialAlreadyInUse => "auth/credential-already-in-use",
            Self::ProviderAlreadyLinked => "auth/provider-already-linked",
            Self::PopupClosedByUser => "auth/popup-closed-by-user",
            Self::CancelledPopupRequest => "auth/cancelled-popup-request",
            Self::UserCancelled => "auth/user-cancelled",
            Self::Timeout => "auth/timeout",
            Self::WrongPassword => "auth/wrong-password",
            Self::NetworkRequestFailed => "auth/network-request-failed",
            Self::Other(code) => code,
        }
    }

    /// Codes that mean the user walked away from the provider flow.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            Self::PopupClosedByUser | Self::CancelledPopupRequest | Self::UserCancelled | Self::Timeout
        )
    }

    /// Codes a link call returns when the binding is already in place.
    pub fn is_already_linked(&self) -> bool {
        matches!(self, Self::ProviderAlreadyLinked | Self::CredentialAlreadyInUse)
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned by an [`IdentityProvider`](crate::IdentityProvider) call.
///
/// Conflict errors carry metadata the resolver mines: the email the
/// conflict is about and, when the SDK attached it, the pending credential.
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct ProviderError {
    /// Classified error code.
    pub code: ProviderErrorCode,

    /// Human-readable message from the provider.
    pub message: String,

    /// Email from the error's metadata.
    pub email: Option<String>,

    /// Credential attached to the error.
    pub credential: Option<PendingCredential>,

    /// Provider the error was raised for.
    pub provider_id: Option<ProviderId>,
}

impl ProviderError {
    /// Create an error with a code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            email: None,
            credential: None,
            provider_id: None,
        }
    }

    /// Shorthand for an account-exists conflict.
    pub fn account_exists(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AccountExistsWithDifferentCredential, message)
    }

    /// Attach the conflicting email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Attach the pending credential.
    pub fn with_credential(mut self, credential: PendingCredential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Attach the provider id.
    pub fn with_provider(mut self, provider: impl Into<ProviderId>) -> Self {
        self.provider_id = Some(provider.into());
        self
    }
}

/// Error returned by a [`Backend`](crate::Backend) call.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The request never got a response.
    #[error("network error: {message}")]
    Network { message: String },

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("invalid backend response: {message}")]
    InvalidResponse { message: String },

    /// The configured base URL is unusable.
    #[error("invalid backend URL: {message}")]
    InvalidUrl { message: String },
}

/// Error type for session store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage backend encountered an error.
    #[error("backend error: {message}")]
    BackendError { message: String },

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The keyring backend is not available.
    #[error("keyring not available: {message}")]
    KeyringUnavailable { message: String },
}

/// Top-level error type encompassing all Linkforge errors.
#[derive(Debug, Error)]
pub enum LinkforgeError {
    /// Error from the identity provider.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the portal backend.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Error from session persistence.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_parse_with_and_without_prefix() {
        assert_eq!(
            ProviderErrorCode::parse("auth/account-exists-with-different-credential"),
            ProviderErrorCode::AccountExistsWithDifferentCredential
        );
        assert_eq!(
            ProviderErrorCode::parse("popup-closed-by-user"),
            ProviderErrorCode::PopupClosedByUser
        );
        assert_eq!(
            ProviderErrorCode::parse("auth/quota-exceeded"),
            ProviderErrorCode::Other("auth/quota-exceeded".to_string())
        );
    }

    #[test]
    fn test_cancellation_codes() {
        assert!(ProviderErrorCode::PopupClosedByUser.is_cancellation());
        assert!(ProviderErrorCode::Timeout.is_cancellation());
        assert!(!ProviderErrorCode::WrongPassword.is_cancellation());
    }

    #[test]
    fn test_provider_error_display_is_verbatim() {
        let err = ProviderError::new(ProviderErrorCode::parse("auth/internal-error"), "boom");
        assert_eq!(err.to_string(), "auth/internal-error: boom");
    }
}
