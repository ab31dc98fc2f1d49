//! Federated credential-conflict resolution.
//!
//! A sign-in attempt flows strictly downward through five stages:
//!
//! 1. [`detect`] - classify the provider result
//! 2. [`extract`] - recover the pending credential from a conflict
//! 3. [`locate`] - find the email and the methods already bound to it
//! 4. [`strategy`] - pick and run a linking path
//! 5. [`finalize`] - obtain and persist the session token
//!
//! Every stage returns `Result<_, Outcome>`, so failures are mapped where they
//! happen and nothing raw escapes to the caller. Every suspending step races a
//! caller-supplied [`CancellationToken`] and an optional timeout.
//!
//! # Example
//!
//! ```rust,ignore
//! use linkforge_core::{ConflictResolver, ProviderId, ProviderRegistry, ResolverConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let resolver = ConflictResolver::new(collaborators, ProviderRegistry::with_defaults(), ResolverConfig::default());
//! let outcome = resolver.sign_in(&ProviderId::new("github.com"), &CancellationToken::new()).await;
//! if let Some(message) = outcome.user_message() {
//!     show_banner(&message);
//! }
//! ```

pub mod detect;
mod extract;
mod finalize;
mod locate;
mod strategy;

use std::future::Future;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::collaborator::Collaborators;
use crate::config::ResolverConfig;
use crate::error::ProviderError;
use crate::model::{ConflictContext, Identity, ProviderId, SessionSource, normalize_email};
use crate::outcome::{Outcome, Stage};
use crate::provider::ProviderRegistry;

use detect::{Classification, classify};
use strategy::Authenticated;

/// Why a guarded step did not produce a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupted {
    Cancelled,
    TimedOut,
}

impl Interrupted {
    fn into_outcome(self, stage: Stage) -> Outcome {
        match self {
            Self::Cancelled => Outcome::Aborted { stage },
            Self::TimedOut => Outcome::TimedOut { stage },
        }
    }
}

/// Runs sign-in attempts and resolves credential conflicts.
///
/// Attempts on one resolver are serialised: a second call waits until the
/// first has terminated, so at most one [`ConflictContext`] is ever live.
pub struct ConflictResolver {
    collaborators: Collaborators,
    registry: ProviderRegistry,
    config: ResolverConfig,
    attempt_lock: Mutex<()>,
}

impl ConflictResolver {
    /// Create a resolver over injected collaborators.
    pub fn new(
        collaborators: Collaborators,
        registry: ProviderRegistry,
        config: ResolverConfig,
    ) -> Self {
        Self {
            collaborators,
            registry,
            config,
            attempt_lock: Mutex::new(()),
        }
    }

    /// The provider registry this resolver consults.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Run an interactive sign-in with `provider` and resolve whatever it returns.
    pub async fn sign_in(&self, provider: &ProviderId, cancel: &CancellationToken) -> Outcome {
        let _attempt = self.attempt_lock.lock().await;
        debug!(%provider, "starting interactive sign-in");

        let result = match self
            .step(
                Stage::InitialSignIn,
                cancel,
                self.collaborators.identity.sign_in_interactive(provider),
            )
            .await
        {
            Ok(result) => result,
            Err(interrupted) => return interrupted.into_outcome(Stage::InitialSignIn),
        };

        self.dispatch(provider, result, cancel).await
    }

    /// Resolve the result of a sign-in attempt the caller already ran.
    pub async fn handle_attempt(
        &self,
        attempted: &ProviderId,
        result: Result<Identity, ProviderError>,
        cancel: &CancellationToken,
    ) -> Outcome {
        let _attempt = self.attempt_lock.lock().await;
        self.dispatch(attempted, result, cancel).await
    }

    /// Resolve a conflict error directly, skipping classification.
    pub async fn resolve_conflict(
        &self,
        attempted: &ProviderId,
        error: ProviderError,
        cancel: &CancellationToken,
    ) -> Outcome {
        let _attempt = self.attempt_lock.lock().await;
        self.run_conflict(attempted, error, cancel).await
    }

    async fn dispatch(
        &self,
        attempted: &ProviderId,
        result: Result<Identity, ProviderError>,
        cancel: &CancellationToken,
    ) -> Outcome {
        match classify(result) {
            Classification::Success(identity) => {
                let authenticated = Authenticated {
                    identity,
                    source: SessionSource::Provider(attempted.clone()),
                };
                self.finalize(authenticated, cancel).await
            }
            Classification::UserCancelled => {
                info!(%attempted, "sign-in dismissed by user");
                Outcome::UserCancelled
            }
            Classification::OtherFailure(error) => {
                info!(%attempted, code = %error.code, "sign-in failed");
                Outcome::OtherFailure {
                    code: error.code.to_string(),
                    message: error.message,
                }
            }
            Classification::ConflictingCredential(error) => {
                self.run_conflict(attempted, error, cancel).await
            }
        }
    }

    async fn run_conflict(
        &self,
        attempted: &ProviderId,
        error: ProviderError,
        cancel: &CancellationToken,
    ) -> Outcome {
        let mut ctx = ConflictContext::new(attempted.clone());
        let span = info_span!("conflict_resolution", attempt = %ctx.id, provider = %attempted);

        let outcome = self
            .resolve_in_context(&mut ctx, error, cancel)
            .instrument(span)
            .await;

        ctx.resolution_outcome = Some(outcome.kind());
        info!(attempt = %ctx.id, outcome = %outcome.kind(), "conflict resolution finished");
        outcome
    }

    async fn resolve_in_context(
        &self,
        ctx: &mut ConflictContext,
        mut error: ProviderError,
        cancel: &CancellationToken,
    ) -> Outcome {
        ctx.pending_credential = self.extract_credential(&mut error);

        let email_hint = normalize_email(error.email.as_deref());
        let email = match self
            .locate_email(&ctx.attempted_provider, email_hint, cancel)
            .await
        {
            Ok(email) => email,
            Err(outcome) => return outcome,
        };
        ctx.email = Some(email.clone());

        let methods = match self.lookup_methods(&email, cancel).await {
            Ok(methods) => methods,
            Err(outcome) => return outcome,
        };

        let Some(credential) = ctx.pending_credential.take() else {
            warn!(
                methods = methods.len(),
                "no pending credential recovered; cannot link automatically"
            );
            return Outcome::NoSupportedLinkingMethod {
                email,
                existing: methods.into_vec(),
            };
        };

        let authenticated = match self
            .link(&ctx.attempted_provider, &email, credential, &methods, cancel)
            .await
        {
            Ok(authenticated) => authenticated,
            Err(outcome) => return outcome,
        };

        self.finalize(authenticated, cancel).await
    }

    /// Race `fut` against cancellation and the step's configured timeout.
    async fn step<T>(
        &self,
        stage: Stage,
        cancel: &CancellationToken,
        fut: impl Future<Output = T>,
    ) -> Result<T, Interrupted> {
        let limit = self.config.timeout_for(stage);
        let bounded = async move {
            match limit {
                Some(limit) => tokio::time::timeout(limit, fut)
                    .await
                    .map_err(|_| Interrupted::TimedOut),
                None => Ok(fut.await),
            }
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Interrupted::Cancelled),
            result = bounded => result,
        };

        if let Err(interrupted) = &result {
            debug!(%stage, ?interrupted, "step interrupted");
        }
        result
    }
}

impl std::fmt::Debug for ConflictResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConflictResolver")
            .field("providers", &self.registry.len())
            .field("config", &self.config)
            .finish()
    }
}
