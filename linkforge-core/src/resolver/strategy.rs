//! Linking strategy.
//!
//! Paths are tried in a fixed priority:
//!
//! 1. Server-mediated exchange (exchange-eligible provider with an access token)
//! 2. OAuth-to-OAuth: popup for a provider already bound to the email, then link
//! 3. Password: prompt, sign in with email and password, then link
//! 4. Give up with [`Outcome::NoSupportedLinkingMethod`]
//!
//! A failed exchange falls through to 2 without surfacing anything to the
//! user. Every other path is terminal once chosen.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{ConflictResolver, Interrupted};
use crate::collaborator::LinkStatus;
use crate::error::ProviderError;
use crate::model::{Identity, PendingCredential, ProviderId, SessionSource, SignInMethodSet};
use crate::outcome::{Outcome, Stage};
use crate::secret::Secret;

/// An identity that is signed in and ready for the finalizer.
#[derive(Debug)]
pub(crate) struct Authenticated {
    pub(crate) identity: Identity,
    pub(crate) source: SessionSource,
}

impl ConflictResolver {
    /// Choose a linking path for `credential` and run it.
    pub(super) async fn link(
        &self,
        attempted: &ProviderId,
        email: &str,
        credential: PendingCredential,
        methods: &SignInMethodSet,
        cancel: &CancellationToken,
    ) -> Result<Authenticated, Outcome> {
        let exchange = self
            .registry
            .exchange_name(attempted)
            .zip(credential.usable_access_token().cloned());

        if let Some((provider_name, access_token)) = exchange {
            match self
                .exchange_and_sign_in(attempted, provider_name, &access_token, cancel)
                .await?
            {
                Some(identity) => {
                    self.link_best_effort(&identity, credential, cancel).await;
                    return Ok(Authenticated {
                        identity,
                        source: SessionSource::CustomToken,
                    });
                }
                None => debug!("continuing with interactive linking"),
            }
        }

        if let Some(existing) = methods.first_oauth_except(attempted, &self.registry) {
            return self.link_via_oauth(existing, credential, cancel).await;
        }

        if methods.contains_password() {
            return self.link_via_password(email, credential, cancel).await;
        }

        info!(
            methods = ?methods.iter().map(|m| m.as_str()).collect::<Vec<_>>(),
            "no linkable sign-in method for email"
        );
        Err(Outcome::NoSupportedLinkingMethod {
            email: email.to_string(),
            existing: methods.iter().cloned().collect(),
        })
    }

    /// Exchange the provider token for a custom token and sign in with it.
    ///
    /// `Ok(None)` means the exchange itself failed and the caller should fall
    /// through. A failed custom-token sign-in after a successful exchange is
    /// terminal.
    async fn exchange_and_sign_in(
        &self,
        attempted: &ProviderId,
        provider_name: &str,
        access_token: &Secret,
        cancel: &CancellationToken,
    ) -> Result<Option<Identity>, Outcome> {
        let exchanged = self
            .step(
                Stage::TokenExchange,
                cancel,
                self.collaborators
                    .backend
                    .exchange_provider_token(provider_name, access_token),
            )
            .await;

        let custom_token = match exchanged {
            Ok(Ok(token)) => token,
            Ok(Err(e)) => {
                warn!(
                    provider = provider_name,
                    error = %e,
                    fallthrough = "interactive_linking",
                    "server token exchange failed"
                );
                return Ok(None);
            }
            Err(Interrupted::TimedOut) => {
                warn!(
                    provider = provider_name,
                    fallthrough = "interactive_linking",
                    "server token exchange timed out"
                );
                return Ok(None);
            }
            Err(Interrupted::Cancelled) => {
                return Err(Outcome::Aborted {
                    stage: Stage::TokenExchange,
                });
            }
        };

        let signed_in = self
            .step(
                Stage::CustomTokenSignIn,
                cancel,
                self.collaborators.backend.sign_in_with_custom_token(&custom_token),
            )
            .await
            .map_err(|i| i.into_outcome(Stage::CustomTokenSignIn))?;

        match signed_in {
            Ok(identity) => {
                info!(uid = %identity.uid, "signed in with server-issued token");
                Ok(Some(identity))
            }
            Err(e) => {
                warn!(error = %e, "custom token sign-in failed after successful exchange");
                Err(Outcome::LinkingFailed {
                    provider: attempted.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Link after the session already exists; failures are only logged.
    async fn link_best_effort(
        &self,
        identity: &Identity,
        credential: PendingCredential,
        cancel: &CancellationToken,
    ) {
        let provider = credential.provider_id.clone();
        match self
            .step(
                Stage::LinkCredential,
                cancel,
                self.collaborators.identity.link_credential(identity, credential),
            )
            .await
        {
            Ok(Ok(status)) => debug!(%provider, ?status, "credential linked"),
            Ok(Err(e)) if e.code.is_already_linked() => {
                debug!(%provider, "credential already linked")
            }
            Ok(Err(e)) => warn!(%provider, error = %e, "best-effort link failed; session kept"),
            Err(interrupted) => {
                warn!(%provider, ?interrupted, "best-effort link interrupted; session kept")
            }
        }
    }

    async fn link_via_oauth(
        &self,
        existing: &ProviderId,
        credential: PendingCredential,
        cancel: &CancellationToken,
    ) -> Result<Authenticated, Outcome> {
        info!(%existing, "linking via existing provider");
        let attempted = credential.provider_id.clone();

        let popup = self
            .step(
                Stage::LinkingPopup,
                cancel,
                self.collaborators.identity.sign_in_interactive(existing),
            )
            .await
            .map_err(|i| i.into_outcome(Stage::LinkingPopup))?;

        let identity = match popup {
            Ok(identity) => identity,
            Err(e) if e.code.is_cancellation() => {
                info!(%existing, "linking popup dismissed");
                return Err(Outcome::LinkingCancelled {
                    provider: attempted,
                });
            }
            Err(e) => {
                warn!(%existing, error = %e, "linking popup failed");
                return Err(Outcome::LinkingFailed {
                    provider: attempted,
                    reason: e.to_string(),
                });
            }
        };

        self.link_required(&identity, credential, cancel).await?;
        Ok(Authenticated {
            identity,
            source: SessionSource::Provider(existing.clone()),
        })
    }

    async fn link_via_password(
        &self,
        email: &str,
        credential: PendingCredential,
        cancel: &CancellationToken,
    ) -> Result<Authenticated, Outcome> {
        info!("linking via password");
        let attempted = credential.provider_id.clone();

        let answer = self
            .step(
                Stage::PasswordPrompt,
                cancel,
                self.collaborators.password_prompter.prompt_for_password(email),
            )
            .await
            .map_err(|i| i.into_outcome(Stage::PasswordPrompt))?;

        let Some(password) = answer.filter(|p| !p.is_blank()) else {
            info!("user declined to supply a password");
            return Err(Outcome::LinkingCancelled {
                provider: attempted,
            });
        };

        let signed_in = self
            .step(
                Stage::PasswordSignIn,
                cancel,
                self.collaborators
                    .identity
                    .sign_in_with_password(email, &password),
            )
            .await
            .map_err(|i| i.into_outcome(Stage::PasswordSignIn))?;
        drop(password);

        let identity = signed_in.map_err(|e| {
            warn!(error = %e, "password sign-in failed");
            Outcome::LinkingFailed {
                provider: attempted.clone(),
                reason: e.to_string(),
            }
        })?;

        self.link_required(&identity, credential, cancel).await?;
        Ok(Authenticated {
            identity,
            source: SessionSource::Password,
        })
    }

    /// Link where failure fails the attempt. Already-linked counts as success.
    async fn link_required(
        &self,
        identity: &Identity,
        credential: PendingCredential,
        cancel: &CancellationToken,
    ) -> Result<LinkStatus, Outcome> {
        let provider = credential.provider_id.clone();
        let result = self
            .step(
                Stage::LinkCredential,
                cancel,
                self.collaborators.identity.link_credential(identity, credential),
            )
            .await
            .map_err(|i| i.into_outcome(Stage::LinkCredential))?;

        match result {
            Ok(status) => {
                info!(%provider, uid = %identity.uid, ?status, "credential linked");
                Ok(status)
            }
            Err(e) => link_error(provider, e),
        }
    }
}

fn link_error(provider: ProviderId, e: ProviderError) -> Result<LinkStatus, Outcome> {
    if e.code.is_already_linked() {
        debug!(%provider, "credential already linked");
        return Ok(LinkStatus::AlreadyLinked);
    }
    warn!(%provider, error = %e, "linking failed");
    Err(Outcome::LinkingFailed {
        provider,
        reason: e.to_string(),
    })
}
