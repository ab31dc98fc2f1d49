//! Credential extraction from a conflict error.

use tracing::debug;

use super::ConflictResolver;
use crate::error::ProviderError;
use crate::model::PendingCredential;

impl ConflictResolver {
    /// Recover the credential the user just presented.
    ///
    /// Takes it straight from the error when the SDK attached one, otherwise
    /// asks each provider's recovery helper in registry order and keeps the
    /// first hit. `None` means no automatic linking is possible later.
    pub(super) fn extract_credential(&self, error: &mut ProviderError) -> Option<PendingCredential> {
        if let Some(credential) = error.credential.take() {
            debug!(provider = %credential.provider_id, "credential attached to conflict error");
            return Some(credential);
        }

        for provider in self.registry.recovery_order() {
            if let Some(credential) = self
                .collaborators
                .identity
                .recover_credential_from_error(provider, error)
            {
                debug!(helper = %provider, "credential recovered by provider helper");
                return Some(credential);
            }
        }

        debug!("no credential recoverable from conflict error");
        None
    }
}
