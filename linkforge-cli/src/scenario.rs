//! Recorded sign-in attempts replayed through the resolver.
//!
//! A scenario describes the attempted provider, what the provider returned,
//! and how the identity provider and (optionally) the backend should answer
//! the calls the resolver makes while resolving it.
//!
//! ```toml
//! provider = "github.com"
//!
//! [error]
//! code = "auth/account-exists-with-different-credential"
//! message = "An account already exists with the same email address"
//! email = "a@x.com"
//!
//! [error.credential]
//! provider = "github.com"
//! access_token = "gho_abc"
//!
//! [identity]
//! methods = ["google.com"]
//! popups = { "google.com" = { uid = "uid-google" } }
//!
//! [backend]
//! custom_token = "ct-1"
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::debug;

use linkforge_core::{
    Backend, BackendError, Identity, IdentityProvider, LinkStatus, PendingCredential,
    ProviderError, ProviderErrorCode, ProviderId, Secret, SignInMethodSet,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Provider the user attempted to sign in with.
    pub provider: ProviderId,

    /// Set when the attempt itself succeeded.
    #[serde(default)]
    pub uid: Option<String>,

    /// Set when the attempt failed.
    #[serde(default)]
    pub error: Option<ErrorSpec>,

    #[serde(default)]
    pub identity: IdentitySpec,

    /// Scripted backend. Absent means use the configured HTTP backend.
    #[serde(default)]
    pub backend: Option<BackendSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorSpec {
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub credential: Option<CredentialSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialSpec {
    pub provider: ProviderId,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

impl CredentialSpec {
    fn to_credential(&self) -> PendingCredential {
        let mut credential = PendingCredential::new(self.provider.clone());
        if let Some(token) = &self.access_token {
            credential = credential.with_access_token(token.as_str());
        }
        if let Some(token) = &self.id_token {
            credential = credential.with_id_token(token.as_str());
        }
        credential
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentitySpec {
    /// Methods bound to the email. Ignored when `method_lookup_error` is set.
    #[serde(default)]
    pub methods: Vec<String>,

    #[serde(default)]
    pub method_lookup_error: Option<String>,

    /// Popup results keyed by provider id.
    #[serde(default)]
    pub popups: HashMap<String, PopupSpec>,

    /// Credentials the provider recovery helpers can rebuild from the error.
    #[serde(default)]
    pub recoverable: HashMap<String, CredentialSpec>,

    /// uid for password sign-in. Absent means every password is wrong.
    #[serde(default)]
    pub password_uid: Option<String>,

    #[serde(default)]
    pub link_error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PopupSpec {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendSpec {
    /// Custom token returned by the exchange.
    #[serde(default)]
    pub custom_token: Option<String>,

    /// HTTP status the exchange fails with.
    #[serde(default)]
    pub exchange_status: Option<u16>,

    /// uid returned by custom-token sign-in. Defaults to the token itself.
    #[serde(default)]
    pub custom_sign_in_uid: Option<String>,

    #[serde(default)]
    pub custom_sign_in_fails: bool,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario from {:?}", path))?;
        Self::parse(&contents).with_context(|| format!("Invalid scenario {:?}", path))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(contents).context("Failed to parse scenario")?;
        match (&scenario.uid, &scenario.error) {
            (Some(_), Some(_)) => anyhow::bail!("scenario sets both `uid` and `[error]`"),
            (None, None) => anyhow::bail!("scenario must set either `uid` or `[error]`"),
            _ => Ok(scenario),
        }
    }

    /// The result of the original sign-in attempt.
    pub fn attempt_result(&self) -> Result<Identity, ProviderError> {
        match (&self.uid, &self.error) {
            (Some(uid), _) => Ok(Identity::new(uid.clone(), self.provider.clone())),
            (None, Some(spec)) => {
                let mut error = ProviderError::new(
                    ProviderErrorCode::parse(&spec.code),
                    spec.message.clone(),
                )
                .with_provider(self.provider.clone());
                if let Some(email) = &spec.email {
                    error = error.with_email(email.clone());
                }
                if let Some(credential) = &spec.credential {
                    error = error.with_credential(credential.to_credential());
                }
                Err(error)
            }
            (None, None) => Err(ProviderError::new(
                ProviderErrorCode::parse("auth/internal-error"),
                "scenario has no attempt result",
            )),
        }
    }
}

/// Identity provider answering from an [`IdentitySpec`].
pub struct ScriptedIdentityProvider {
    spec: IdentitySpec,
    bindings: Mutex<HashSet<(String, ProviderId)>>,
}

impl ScriptedIdentityProvider {
    pub fn new(spec: IdentitySpec) -> Self {
        Self {
            spec,
            bindings: Mutex::new(HashSet::new()),
        }
    }
}

fn scripted_error(code: &str, message: impl Into<String>) -> ProviderError {
    ProviderError::new(ProviderErrorCode::parse(code), message)
}

#[async_trait]
impl IdentityProvider for ScriptedIdentityProvider {
    async fn sign_in_interactive(&self, provider: &ProviderId) -> Result<Identity, ProviderError> {
        debug!(%provider, "scripted popup");
        match self.spec.popups.get(provider.as_str()) {
            Some(PopupSpec {
                error: Some(code), ..
            }) => Err(scripted_error(code, format!("{} popup failed", provider))),
            Some(PopupSpec { uid: Some(uid), .. }) => {
                Ok(Identity::new(uid.clone(), provider.clone()))
            }
            _ => Err(scripted_error(
                "auth/operation-not-allowed",
                format!("no popup scripted for {}", provider),
            )),
        }
    }

    fn recover_credential_from_error(
        &self,
        provider: &ProviderId,
        _error: &ProviderError,
    ) -> Option<PendingCredential> {
        self.spec
            .recoverable
            .get(provider.as_str())
            .map(CredentialSpec::to_credential)
    }

    async fn list_sign_in_methods(&self, email: &str) -> Result<SignInMethodSet, ProviderError> {
        debug!(email, "scripted method lookup");
        match &self.spec.method_lookup_error {
            Some(code) => Err(scripted_error(code, "method lookup failed")),
            None => Ok(SignInMethodSet::from_raw(&self.spec.methods)),
        }
    }

    async fn link_credential(
        &self,
        identity: &Identity,
        credential: PendingCredential,
    ) -> Result<LinkStatus, ProviderError> {
        if let Some(code) = &self.spec.link_error {
            return Err(scripted_error(code, "link rejected"));
        }
        let inserted = self
            .bindings
            .lock()
            .insert((identity.uid.clone(), credential.provider_id.clone()));
        Ok(if inserted {
            LinkStatus::Linked
        } else {
            LinkStatus::AlreadyLinked
        })
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        _password: &Secret,
    ) -> Result<Identity, ProviderError> {
        match &self.spec.password_uid {
            Some(uid) => Ok(Identity::new(uid.clone(), "password").with_email(email)),
            None => Err(scripted_error("auth/wrong-password", "The password is invalid")),
        }
    }

    async fn fetch_session_token(&self, identity: &Identity) -> Result<Secret, ProviderError> {
        Ok(Secret::new(format!(
            "scripted.{}.{}",
            identity.uid,
            chrono::Utc::now().timestamp()
        )))
    }
}

/// Backend answering from a [`BackendSpec`].
pub struct ScriptedBackend {
    spec: BackendSpec,
}

impl ScriptedBackend {
    pub fn new(spec: BackendSpec) -> Self {
        Self { spec }
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn exchange_provider_token(
        &self,
        provider_name: &str,
        _access_token: &Secret,
    ) -> Result<Secret, BackendError> {
        debug!(provider = provider_name, "scripted token exchange");
        if let Some(status) = self.spec.exchange_status {
            return Err(BackendError::Status {
                status,
                message: "scripted exchange failure".to_string(),
            });
        }
        match &self.spec.custom_token {
            Some(token) => Ok(Secret::new(token.clone())),
            None => Err(BackendError::Network {
                message: "no exchange scripted".to_string(),
            }),
        }
    }

    async fn sign_in_with_custom_token(&self, token: &Secret) -> Result<Identity, BackendError> {
        if self.spec.custom_sign_in_fails {
            return Err(BackendError::Status {
                status: 401,
                message: "scripted custom token rejection".to_string(),
            });
        }
        let uid = self
            .spec
            .custom_sign_in_uid
            .clone()
            .unwrap_or_else(|| token.expose().to_string());
        Ok(Identity::new(uid, "custom"))
    }
}
