//! Identity location: which email is this conflict about, and how does it sign in?

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::ConflictResolver;
use crate::model::{ProviderId, SignInMethodSet, normalize_email};
use crate::outcome::{Outcome, Stage};

impl ConflictResolver {
    /// Produce a non-empty email, prompting the user when the error had none.
    pub(super) async fn locate_email(
        &self,
        attempted: &ProviderId,
        from_error: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<String, Outcome> {
        if let Some(email) = from_error {
            debug!("email taken from conflict error");
            return Ok(email);
        }

        let answer = self
            .step(
                Stage::EmailPrompt,
                cancel,
                self.collaborators.email_prompter.prompt_for_email(attempted),
            )
            .await
            .map_err(|i| i.into_outcome(Stage::EmailPrompt))?;

        match normalize_email(answer.as_deref()) {
            Some(email) => {
                debug!("email supplied by user");
                Ok(email)
            }
            None => {
                debug!("user declined to supply an email");
                Err(Outcome::InsufficientInformation)
            }
        }
    }

    /// Fetch the sign-in methods currently bound to `email`.
    pub(super) async fn lookup_methods(
        &self,
        email: &str,
        cancel: &CancellationToken,
    ) -> Result<SignInMethodSet, Outcome> {
        let result = self
            .step(
                Stage::MethodLookup,
                cancel,
                self.collaborators.identity.list_sign_in_methods(email),
            )
            .await
            .map_err(|i| i.into_outcome(Stage::MethodLookup))?;

        match result {
            Ok(methods) => {
                debug!(
                    methods = ?methods.iter().map(|m| m.as_str()).collect::<Vec<_>>(),
                    "sign-in methods located"
                );
                Ok(methods)
            }
            Err(e) => {
                warn!(error = %e, "sign-in method lookup failed");
                Err(Outcome::LinkingQueryFailed {
                    email: email.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}
