//! Session finalization: the single sink every successful path ends in.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::ConflictResolver;
use super::strategy::Authenticated;
use crate::model::SessionToken;
use crate::outcome::{Outcome, Stage};

impl ConflictResolver {
    /// Obtain a session token for `authenticated` and persist it.
    pub(super) async fn finalize(
        &self,
        authenticated: Authenticated,
        cancel: &CancellationToken,
    ) -> Outcome {
        let Authenticated { identity, source } = authenticated;

        let fetched = match self
            .step(
                Stage::Finalize,
                cancel,
                self.collaborators.identity.fetch_session_token(&identity),
            )
            .await
        {
            Ok(fetched) => fetched,
            Err(interrupted) => return interrupted.into_outcome(Stage::Finalize),
        };

        let value = match fetched {
            Ok(value) => value,
            Err(e) => {
                warn!(uid = %identity.uid, error = %e, "could not obtain session token");
                return Outcome::OtherFailure {
                    code: e.code.to_string(),
                    message: e.message,
                };
            }
        };

        let session = SessionToken::new(value, &identity, source);

        match self
            .step(Stage::Finalize, cancel, self.collaborators.sessions.save(&session))
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(uid = %session.uid, error = %e, "could not persist session");
                return Outcome::OtherFailure {
                    code: "session/persist-failed".to_string(),
                    message: format!("Your sign-in could not be saved: {}", e),
                };
            }
            Err(interrupted) => return interrupted.into_outcome(Stage::Finalize),
        }

        info!(uid = %session.uid, source = %session.source, "session established");
        Outcome::Success(session)
    }
}
