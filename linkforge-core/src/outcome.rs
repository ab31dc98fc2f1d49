//! Terminal outcomes of a sign-in attempt.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{ProviderId, SessionToken, SignInMethod};

/// The suspending step an attempt was in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// The original provider popup.
    InitialSignIn,
    /// Waiting on the user to type an email.
    EmailPrompt,
    /// Looking up the methods bound to the email.
    MethodLookup,
    /// Server-mediated token exchange.
    TokenExchange,
    /// Signing in with the server-issued custom token.
    CustomTokenSignIn,
    /// Popup for the provider the account already uses.
    LinkingPopup,
    /// Waiting on the user to type a password.
    PasswordPrompt,
    /// Email and password sign-in.
    PasswordSignIn,
    /// Binding the pending credential.
    LinkCredential,
    /// Obtaining and persisting the session token.
    Finalize,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InitialSignIn => "initial_sign_in",
            Self::EmailPrompt => "email_prompt",
            Self::MethodLookup => "method_lookup",
            Self::TokenExchange => "token_exchange",
            Self::CustomTokenSignIn => "custom_token_sign_in",
            Self::LinkingPopup => "linking_popup",
            Self::PasswordPrompt => "password_prompt",
            Self::PasswordSignIn => "password_sign_in",
            Self::LinkCredential => "link_credential",
            Self::Finalize => "finalize",
        }
    }

    /// Whether the step waits on a human rather than the network.
    pub fn is_interactive(&self) -> bool {
        matches!(
            self,
            Self::InitialSignIn | Self::EmailPrompt | Self::LinkingPopup | Self::PasswordPrompt
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a sign-in attempt ended.
///
/// Every provider and backend failure is mapped to exactly one of these at
/// the stage that observed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Signed in; the session has been persisted.
    Success(SessionToken),

    /// The user closed or timed out the provider flow. Silent.
    UserCancelled,

    /// Any other provider error, surfaced verbatim.
    OtherFailure { code: String, message: String },

    /// No email in the error and the user declined to supply one.
    InsufficientInformation,

    /// The method lookup for the email failed.
    LinkingQueryFailed { email: String, reason: String },

    /// The user declined a step required for linking.
    LinkingCancelled { provider: ProviderId },

    /// A sign-in or link call failed after a method was chosen.
    LinkingFailed { provider: ProviderId, reason: String },

    /// Nothing bound to the email can be used to link automatically.
    NoSupportedLinkingMethod {
        email: String,
        existing: Vec<SignInMethod>,
    },

    /// The caller cancelled the attempt. Silent.
    Aborted { stage: Stage },

    /// A step exceeded its configured timeout.
    TimedOut { stage: Stage },
}

/// Fieldless mirror of [`Outcome`] for logs and attempt bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    UserCancelled,
    OtherFailure,
    InsufficientInformation,
    LinkingQueryFailed,
    LinkingCancelled,
    LinkingFailed,
    NoSupportedLinkingMethod,
    Aborted,
    TimedOut,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::UserCancelled => "user_cancelled",
            Self::OtherFailure => "other_failure",
            Self::InsufficientInformation => "insufficient_information",
            Self::LinkingQueryFailed => "linking_query_failed",
            Self::LinkingCancelled => "linking_cancelled",
            Self::LinkingFailed => "linking_failed",
            Self::NoSupportedLinkingMethod => "no_supported_linking_method",
            Self::Aborted => "aborted",
            Self::TimedOut => "timed_out",
        };
        f.write_str(s)
    }
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Success(_) => OutcomeKind::Success,
            Self::UserCancelled => OutcomeKind::UserCancelled,
            Self::OtherFailure { .. } => OutcomeKind::OtherFailure,
            Self::InsufficientInformation => OutcomeKind::InsufficientInformation,
            Self::LinkingQueryFailed { .. } => OutcomeKind::LinkingQueryFailed,
            Self::LinkingCancelled { .. } => OutcomeKind::LinkingCancelled,
            Self::LinkingFailed { .. } => OutcomeKind::LinkingFailed,
            Self::NoSupportedLinkingMethod { .. } => OutcomeKind::NoSupportedLinkingMethod,
            Self::Aborted { .. } => OutcomeKind::Aborted,
            Self::TimedOut { .. } => OutcomeKind::TimedOut,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The session, if the attempt succeeded.
    pub fn session(&self) -> Option<&SessionToken> {
        match self {
            Self::Success(session) => Some(session),
            _ => None,
        }
    }

    /// Message telling the user what to do next.
    ///
    /// `None` for outcomes that should not show anything: success, a
    /// user-dismissed popup, or a caller-side abort.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::Success(_) | Self::UserCancelled | Self::Aborted { .. } => None,
            Self::OtherFailure { code, message } => {
                if message.trim().is_empty() {
                    Some(format!("Sign-in failed ({}). Please try again.", code))
                } else {
                    Some(message.clone())
                }
            }
            Self::InsufficientInformation => Some(
                "We need the email address of your existing account to continue. \
                 Please try signing in again and enter your email when asked."
                    .to_string(),
            ),
            Self::LinkingQueryFailed { email, .. } => Some(format!(
                "We couldn't look up how {} signs in right now. \
                 Check your connection and try again.",
                email
            )),
            Self::LinkingCancelled { provider } => Some(format!(
                "Linking was cancelled. To connect {} to your account, \
                 sign in again and complete the verification step.",
                provider
            )),
            Self::LinkingFailed { provider, .. } => Some(format!(
                "We couldn't connect your {} sign-in to your existing account. \
                 Please try again, or contact support if this keeps happening.",
                provider
            )),
            Self::NoSupportedLinkingMethod { email, existing } => {
                if existing.is_empty() {
                    Some(format!(
                        "An account already exists for {}. \
                         Please sign in with the method you originally used.",
                        email
                    ))
                } else {
                    let methods: Vec<&str> = existing.iter().map(|m| m.as_str()).collect();
                    Some(format!(
                        "An account already exists for {}. \
                         Please sign in with the method you originally used ({}).",
                        email,
                        methods.join(", ")
                    ))
                }
            }
            Self::TimedOut { stage } => Some(format!(
                "Signing in took too long (during {}). Please try again.",
                stage
            )),
        }
    }
}
