//! Deterministic collaborators for resolver tests.
//!
//! Each fake records the calls it receives so tests can assert not only the
//! outcome but which popups, prompts and network calls happened.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use linkforge_core::{
    Backend, BackendError, Collaborators, ConflictResolver, EmailPrompter, Identity,
    IdentityProvider, LinkStatus, MemorySessionStore, PasswordPrompter, PendingCredential,
    ProviderError, ProviderErrorCode, ProviderId, ProviderRegistry, ResolverConfig, Secret,
    SignInMethodSet,
};

/// A call observed by one of the fakes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Popup(String),
    Recover(String),
    ListMethods(String),
    Link { uid: String, provider: String },
    PasswordPrompt(String),
    PasswordSignIn(String),
    SessionToken(String),
    Exchange(String),
    CustomTokenSignIn(String),
}

/// Operations that can be told to never complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hang {
    Popup,
    ListMethods,
    Link,
    Exchange,
}

async fn hang_forever() {
    std::future::pending::<()>().await
}

/// Fake identity provider with scripted answers.
#[derive(Default)]
pub struct FakeIdentityProvider {
    /// `None` makes the method lookup fail like a 503.
    methods: Option<Vec<String>>,
    /// Provider id -> `Ok(uid)` or `Err(error code)`.
    popups: HashMap<String, Result<String, String>>,
    /// Provider helper -> access token it recovers.
    recoverable: HashMap<String, Option<String>>,
    /// uid returned by password sign-in; `None` means wrong password.
    password_uid: Option<String>,
    /// Error code every link call fails with.
    link_error: Option<String>,
    /// Report existing bindings as an error code instead of `AlreadyLinked`.
    already_linked_as_error: bool,
    hang: Option<Hang>,
    calls: Mutex<Vec<Call>>,
    bindings: Mutex<HashSet<(String, String)>>,
}

impl FakeIdentityProvider {
    pub fn new() -> Self {
        Self {
            methods: Some(Vec::new()),
            ..Default::default()
        }
    }

    pub fn with_methods(mut self, methods: &[&str]) -> Self {
        self.methods = Some(methods.iter().map(|m| m.to_string()).collect());
        self
    }

    pub fn with_failing_method_lookup(mut self) -> Self {
        self.methods = None;
        self
    }

    pub fn with_popup(mut self, provider: &str, uid: &str) -> Self {
        self.popups.insert(provider.to_string(), Ok(uid.to_string()));
        self
    }

    pub fn with_popup_error(mut self, provider: &str, code: &str) -> Self {
        self.popups.insert(provider.to_string(), Err(code.to_string()));
        self
    }

    pub fn with_recoverable(mut self, helper: &str, access_token: Option<&str>) -> Self {
        self.recoverable
            .insert(helper.to_string(), access_token.map(String::from));
        self
    }

    pub fn with_password_uid(mut self, uid: &str) -> Self {
        self.password_uid = Some(uid.to_string());
        self
    }

    pub fn with_link_error(mut self, code: &str) -> Self {
        self.link_error = Some(code.to_string());
        self
    }

    pub fn with_already_linked_as_error(mut self) -> Self {
        self.already_linked_as_error = true;
        self
    }

    pub fn with_hang(mut self, hang: Hang) -> Self {
        self.hang = Some(hang);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn popup_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Popup(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    pub fn bindings(&self) -> HashSet<(String, String)> {
        self.bindings.lock().clone()
    }

    pub fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn sign_in_interactive(&self, provider: &ProviderId) -> Result<Identity, ProviderError> {
        self.record(Call::Popup(provider.to_string()));
        if self.hang == Some(Hang::Popup) {
            hang_forever().await;
        }
        match self.popups.get(provider.as_str()) {
            Some(Ok(uid)) => Ok(Identity::new(uid.clone(), provider.clone())),
            Some(Err(code)) => Err(ProviderError::new(
                ProviderErrorCode::parse(code),
                format!("popup for {} failed", provider),
            )),
            None => Err(ProviderError::new(
                ProviderErrorCode::parse("auth/operation-not-allowed"),
                format!("no popup scripted for {}", provider),
            )),
        }
    }

    fn recover_credential_from_error(
        &self,
        provider: &ProviderId,
        _error: &ProviderError,
    ) -> Option<PendingCredential> {
        self.record(Call::Recover(provider.to_string()));
        self.recoverable.get(provider.as_str()).map(|token| {
            let credential = PendingCredential::new(provider.clone());
            match token {
                Some(t) => credential.with_access_token(t.as_str()),
                None => credential,
            }
        })
    }

    async fn list_sign_in_methods(&self, email: &str) -> Result<SignInMethodSet, ProviderError> {
        self.record(Call::ListMethods(email.to_string()));
        if self.hang == Some(Hang::ListMethods) {
            hang_forever().await;
        }
        match &self.methods {
            Some(methods) => Ok(SignInMethodSet::from_raw(methods)),
            None => Err(ProviderError::new(
                ProviderErrorCode::NetworkRequestFailed,
                "503 Service Unavailable",
            )),
        }
    }

    async fn link_credential(
        &self,
        identity: &Identity,
        credential: PendingCredential,
    ) -> Result<LinkStatus, ProviderError> {
        let provider = credential.provider_id.to_string();
        self.record(Call::Link {
            uid: identity.uid.clone(),
            provider: provider.clone(),
        });
        if self.hang == Some(Hang::Link) {
            hang_forever().await;
        }
        if let Some(code) = &self.link_error {
            return Err(ProviderError::new(ProviderErrorCode::parse(code), "link rejected"));
        }

        let inserted = self.bindings.lock().insert((identity.uid.clone(), provider));
        match (inserted, self.already_linked_as_error) {
            (true, _) => Ok(LinkStatus::Linked),
            (false, false) => Ok(LinkStatus::AlreadyLinked),
            (false, true) => Err(ProviderError::new(
                ProviderErrorCode::ProviderAlreadyLinked,
                "already linked",
            )),
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        _password: &Secret,
    ) -> Result<Identity, ProviderError> {
        self.record(Call::PasswordSignIn(email.to_string()));
        match &self.password_uid {
            Some(uid) => Ok(Identity::new(uid.clone(), "password").with_email(email)),
            None => Err(ProviderError::new(
                ProviderErrorCode::WrongPassword,
                "The password is invalid",
            )),
        }
    }

    async fn fetch_session_token(&self, identity: &Identity) -> Result<Secret, ProviderError> {
        self.record(Call::SessionToken(identity.uid.clone()));
        Ok(Secret::new(format!("session:{}", identity.uid)))
    }
}

/// Fake portal backend.
#[derive(Default)]
pub struct FakeBackend {
    /// `Ok(custom token)` or `Err(http status)`.
    exchange: Option<Result<String, u16>>,
    custom_sign_in_fails: bool,
    hang_exchange: bool,
    calls: Mutex<Vec<Call>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exchange(mut self, custom_token: &str) -> Self {
        self.exchange = Some(Ok(custom_token.to_string()));
        self
    }

    pub fn with_exchange_status(mut self, status: u16) -> Self {
        self.exchange = Some(Err(status));
        self
    }

    pub fn with_failing_custom_sign_in(mut self) -> Self {
        self.custom_sign_in_fails = true;
        self
    }

    pub fn with_hanging_exchange(mut self) -> Self {
        self.hang_exchange = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn exchange_provider_token(
        &self,
        provider_name: &str,
        access_token: &Secret,
    ) -> Result<Secret, BackendError> {
        self.calls
            .lock()
            .push(Call::Exchange(format!("{}:{}", provider_name, access_token.expose())));
        if self.hang_exchange {
            hang_forever().await;
        }
        match &self.exchange {
            Some(Ok(token)) => Ok(Secret::new(token.clone())),
            Some(Err(status)) => Err(BackendError::Status {
                status: *status,
                message: "exchange rejected".to_string(),
            }),
            None => Err(BackendError::Network {
                message: "connection refused".to_string(),
            }),
        }
    }

    async fn sign_in_with_custom_token(&self, token: &Secret) -> Result<Identity, BackendError> {
        self.calls
            .lock()
            .push(Call::CustomTokenSignIn(token.expose().to_string()));
        if self.custom_sign_in_fails {
            return Err(BackendError::Status {
                status: 401,
                message: "custom token rejected".to_string(),
            });
        }
        Ok(Identity::new(format!("uid-{}", token.expose()), "github.com"))
    }
}

/// Email prompt that always gives the same answer.
pub struct ScriptedEmailPrompter {
    answer: Option<String>,
    asked: Mutex<usize>,
}

impl ScriptedEmailPrompter {
    pub fn answering(answer: Option<&str>) -> Self {
        Self {
            answer: answer.map(String::from),
            asked: Mutex::new(0),
        }
    }

    pub fn times_asked(&self) -> usize {
        *self.asked.lock()
    }
}

#[async_trait]
impl EmailPrompter for ScriptedEmailPrompter {
    async fn prompt_for_email(&self, _attempted: &ProviderId) -> Option<String> {
        *self.asked.lock() += 1;
        self.answer.clone()
    }
}

/// Password prompt that always gives the same answer.
///
/// Each prompt is also recorded in the identity provider's call log, so
/// tests can check it happened before any sign-in.
pub struct ScriptedPasswordPrompter {
    answer: Option<String>,
    asked: Mutex<usize>,
    journal: Option<Arc<FakeIdentityProvider>>,
}

impl ScriptedPasswordPrompter {
    pub fn answering(answer: Option<&str>) -> Self {
        Self {
            answer: answer.map(String::from),
            asked: Mutex::new(0),
            journal: None,
        }
    }

    pub fn recording_to(mut self, identity: Arc<FakeIdentityProvider>) -> Self {
        self.journal = Some(identity);
        self
    }

    pub fn times_asked(&self) -> usize {
        *self.asked.lock()
    }
}

#[async_trait]
impl PasswordPrompter for ScriptedPasswordPrompter {
    async fn prompt_for_password(&self, email: &str) -> Option<Secret> {
        *self.asked.lock() += 1;
        if let Some(identity) = &self.journal {
            identity.record(Call::PasswordPrompt(email.to_string()));
        }
        self.answer.as_deref().map(Secret::new)
    }
}

/// All fakes for one test, plus handles to inspect them afterwards.
pub struct Harness {
    pub identity: Arc<FakeIdentityProvider>,
    pub backend: Arc<FakeBackend>,
    pub email: Arc<ScriptedEmailPrompter>,
    pub password: Arc<ScriptedPasswordPrompter>,
    pub sessions: Arc<MemorySessionStore>,
}

impl Harness {
    /// Both prompts decline unless overridden.
    pub fn new(identity: FakeIdentityProvider, backend: FakeBackend) -> Self {
        let identity = Arc::new(identity);
        Self {
            password: Arc::new(ScriptedPasswordPrompter::answering(None).recording_to(identity.clone())),
            identity,
            backend: Arc::new(backend),
            email: Arc::new(ScriptedEmailPrompter::answering(None)),
            sessions: Arc::new(MemorySessionStore::new()),
        }
    }

    pub fn email_answer(mut self, answer: Option<&str>) -> Self {
        self.email = Arc::new(ScriptedEmailPrompter::answering(answer));
        self
    }

    pub fn password_answer(mut self, answer: Option<&str>) -> Self {
        self.password = Arc::new(
            ScriptedPasswordPrompter::answering(answer).recording_to(self.identity.clone()),
        );
        self
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            identity: self.identity.clone(),
            backend: self.backend.clone(),
            email_prompter: self.email.clone(),
            password_prompter: self.password.clone(),
            sessions: self.sessions.clone(),
        }
    }

    pub fn resolver(&self) -> ConflictResolver {
        self.resolver_with(ResolverConfig::default())
    }

    pub fn resolver_with(&self, config: ResolverConfig) -> ConflictResolver {
        ConflictResolver::new(self.collaborators(), ProviderRegistry::with_defaults(), config)
    }
}

/// The account-exists error an SDK raises for a second-provider sign-in.
pub fn conflict(email: Option<&str>, credential: Option<PendingCredential>) -> ProviderError {
    let mut error = ProviderError::account_exists(
        "An account already exists with the same email address but different sign-in credentials.",
    );
    if let Some(email) = email {
        error = error.with_email(email);
    }
    if let Some(credential) = credential {
        error = error.with_credential(credential);
    }
    error
}

pub fn github_credential(access_token: &str) -> PendingCredential {
    PendingCredential::new("github.com").with_access_token(access_token)
}

pub fn google_credential() -> PendingCredential {
    PendingCredential::new("google.com").with_id_token("google-id-token")
}

pub fn github() -> ProviderId {
    ProviderId::new("github.com")
}

pub fn google() -> ProviderId {
    ProviderId::new("google.com")
}
