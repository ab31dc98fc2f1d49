//! Trigger detection: what did the provider sign-in attempt produce?

use crate::error::{ProviderError, ProviderErrorCode};
use crate::model::Identity;

/// Classification of a provider sign-in result.
#[derive(Debug)]
pub enum Classification {
    /// The user is signed in.
    Success(Identity),

    /// The user closed, denied or timed out the provider flow.
    UserCancelled,

    /// An account exists for the email under another credential.
    ConflictingCredential(ProviderError),

    /// Anything else; reported verbatim.
    OtherFailure(ProviderError),
}

/// Classify a sign-in result.
///
/// Only [`Classification::ConflictingCredential`] leads into the rest of
/// the pipeline; the other three are terminal.
pub fn classify(result: Result<Identity, ProviderError>) -> Classification {
    match result {
        Ok(identity) => Classification::Success(identity),
        Err(error) if error.code.is_cancellation() => Classification::UserCancelled,
        Err(error) if error.code == ProviderErrorCode::AccountExistsWithDifferentCredential => {
            Classification::ConflictingCredential(error)
        }
        Err(error) => Classification::OtherFailure(error),
    }
}
