//! Domain model types for Linkforge.
//!
//! This module defines the core types used throughout Linkforge:
//! - [`ProviderId`] - Identifier for a federated identity provider (e.g., "google.com")
//! - [`PendingCredential`] - The credential presented by the conflicting sign-in attempt
//! - [`SignInMethod`] / [`SignInMethodSet`] - Methods already bound to an email
//! - [`Identity`] - An authenticated user as reported by a collaborator
//! - [`SessionToken`] - The only artifact a resolution attempt produces
//! - [`ConflictContext`] - Working state of one resolution attempt

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::outcome::OutcomeKind;
use crate::provider::ProviderRegistry;
use crate::secret::Secret;

/// Identifier for an identity provider (e.g., "google.com", "github.com").
///
/// Provider IDs are normalized to trimmed lowercase so values coming from
/// SDK error payloads and backend method lists compare equal.
///
/// # Examples
///
/// ```
/// use linkforge_core::ProviderId;
///
/// let google = ProviderId::new("Google.com");
/// assert_eq!(google.as_str(), "google.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ProviderId(String);

impl ProviderId {
    /// Create a new provider ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_lowercase())
    }

    /// Get the provider ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ProviderId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<ProviderId> for String {
    fn from(id: ProviderId) -> Self {
        id.0
    }
}

/// The token bundle presented by the second provider attempt.
///
/// Not `Clone` and not serialisable: linking takes it by value, so a
/// credential is bound at most once per attempt and never persisted.
///
/// ```compile_fail
/// use linkforge_core::PendingCredential;
///
/// let credential = PendingCredential::new("github.com").with_access_token("gho_x");
/// let _ = serde_json::to_string(&credential);
/// ```
#[derive(Debug)]
pub struct PendingCredential {
    /// Provider that issued the credential.
    pub provider_id: ProviderId,

    /// OAuth access token, when the provider returned one.
    pub access_token: Option<Secret>,

    /// OpenID Connect id token, when the provider returned one.
    pub id_token: Option<Secret>,
}

impl PendingCredential {
    /// Create a credential with no tokens attached.
    pub fn new(provider_id: impl Into<ProviderId>) -> Self {
        Self {
            provider_id: provider_id.into(),
            access_token: None,
            id_token: None,
        }
    }

    /// Attach an access token.
    pub fn with_access_token(mut self, token: impl Into<Secret>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Attach an id token.
    pub fn with_id_token(mut self, token: impl Into<Secret>) -> Self {
        self.id_token = Some(token.into());
        self
    }

    /// The access token, if present and non-blank.
    pub fn usable_access_token(&self) -> Option<&Secret> {
        self.access_token.as_ref().filter(|t| !t.is_blank())
    }
}

/// A single sign-in method bound to an email.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SignInMethod {
    /// Email and password.
    Password,

    /// Passwordless email link. Cannot be used for linking.
    EmailLink,

    /// A federated provider.
    OAuth(ProviderId),
}

impl SignInMethod {
    /// Parse a method string as reported by the identity backend.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "password" => Self::Password,
            "emailLink" | "emaillink" => Self::EmailLink,
            other => Self::OAuth(ProviderId::new(other)),
        }
    }

    /// The wire representation of this method.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Password => "password",
            Self::EmailLink => "emailLink",
            Self::OAuth(provider) => provider.as_str(),
        }
    }
}

impl fmt::Display for SignInMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for SignInMethod {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<SignInMethod> for String {
    fn from(m: SignInMethod) -> Self {
        m.as_str().to_string()
    }
}

/// Set of sign-in methods already bound to an email.
///
/// Preserves the order the backend reported them in and drops duplicates.
/// Fetched fresh for every attempt; never cache one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<SignInMethod>", into = "Vec<SignInMethod>")]
pub struct SignInMethodSet(Vec<SignInMethod>);

impl SignInMethodSet {
    /// Build a set from parsed methods.
    pub fn new(methods: impl IntoIterator<Item = SignInMethod>) -> Self {
        let mut out: Vec<SignInMethod> = Vec::new();
        for method in methods {
            if !out.contains(&method) {
                out.push(method);
            }
        }
        Self(out)
    }

    /// Build a set from raw backend strings.
    pub fn from_raw<S: AsRef<str>>(raw: impl IntoIterator<Item = S>) -> Self {
        Self::new(raw.into_iter().map(|s| SignInMethod::parse(s.as_ref())))
    }

    /// Whether `password` is among the methods.
    pub fn contains_password(&self) -> bool {
        self.0.contains(&SignInMethod::Password)
    }

    /// First registered OAuth provider that is not `attempted`.
    ///
    /// Unknown provider ids are skipped: the resolver cannot open a popup for
    /// a provider it has no configuration for.
    pub fn first_oauth_except(
        &self,
        attempted: &ProviderId,
        registry: &ProviderRegistry,
    ) -> Option<&ProviderId> {
        self.0.iter().find_map(|m| match m {
            SignInMethod::OAuth(p) if p != attempted && registry.contains(p.as_str()) => Some(p),
            _ => None,
        })
    }

    /// Iterate over the methods in backend order.
    pub fn iter(&self) -> impl Iterator<Item = &SignInMethod> {
        self.0.iter()
    }

    /// Number of methods.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no methods are bound.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume the set into a plain vector.
    pub fn into_vec(self) -> Vec<SignInMethod> {
        self.0
    }
}

impl From<Vec<SignInMethod>> for SignInMethodSet {
    fn from(methods: Vec<SignInMethod>) -> Self {
        Self::new(methods)
    }
}

impl From<SignInMethodSet> for Vec<SignInMethod> {
    fn from(set: SignInMethodSet) -> Self {
        set.0
    }
}

/// An authenticated user as reported by the identity provider or backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable user id.
    pub uid: String,

    /// Primary email, if the provider disclosed one.
    #[serde(default)]
    pub email: Option<String>,

    /// Provider the user authenticated with for this identity.
    pub provider_id: ProviderId,
}

impl Identity {
    /// Create a new identity.
    pub fn new(uid: impl Into<String>, provider_id: impl Into<ProviderId>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            provider_id: provider_id.into(),
        }
    }

    /// Attach an email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Which producer authenticated the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "provider", rename_all = "snake_case")]
pub enum SessionSource {
    /// Direct provider sign-in (original attempt or OAuth-to-OAuth popup).
    Provider(ProviderId),

    /// Email and password sign-in.
    Password,

    /// Server-issued custom token.
    CustomToken,
}

impl fmt::Display for SessionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provider(p) => write!(f, "provider:{}", p),
            Self::Password => write!(f, "password"),
            Self::CustomToken => write!(f, "custom_token"),
        }
    }
}

/// Proof of authentication for subsequent API calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    /// The bearer value sent to the REST backend.
    pub value: Secret,

    /// User the session belongs to.
    pub uid: String,

    /// Email of the signed-in user, if known.
    #[serde(default)]
    pub email: Option<String>,

    /// Producer that authenticated the session.
    pub source: SessionSource,

    /// When the session token was obtained.
    pub issued_at: DateTime<Utc>,
}

impl SessionToken {
    /// Create a session token for an identity, stamped with the current time.
    pub fn new(value: impl Into<Secret>, identity: &Identity, source: SessionSource) -> Self {
        Self {
            value: value.into(),
            uid: identity.uid.clone(),
            email: identity.email.clone(),
            source,
            issued_at: Utc::now(),
        }
    }
}

/// Working state of one resolution attempt.
///
/// Created when an attempt is classified as conflicting and dropped when the
/// attempt terminates.
#[derive(Debug)]
pub struct ConflictContext {
    /// Attempt id, attached to every log line of the attempt.
    pub id: Uuid,

    /// Email the conflict is about, once located.
    pub email: Option<String>,

    /// Credential recovered from the conflict, if any.
    pub pending_credential: Option<PendingCredential>,

    /// Provider the user just tried to sign in with.
    pub attempted_provider: ProviderId,

    /// Set once the attempt terminates.
    pub resolution_outcome: Option<OutcomeKind>,
}

impl ConflictContext {
    /// Start a new attempt for the given provider.
    pub fn new(attempted_provider: ProviderId) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: None,
            pending_credential: None,
            attempted_provider,
            resolution_outcome: None,
        }
    }
}

/// Normalize an email from an error payload or a prompt.
///
/// Returns `None` for empty or whitespace-only input.
pub fn normalize_email(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
}
