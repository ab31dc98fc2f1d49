//! # Linkforge Core
//!
//! Federated credential-conflict resolution for the candidate portal.
//!
//! When a user signs in with a second identity provider but an account
//! already exists for their email under another provider or a password,
//! Linkforge decides whether and how to link the new credential to the
//! existing account, without creating a duplicate account and without
//! failing silently.
//!
//! This crate provides:
//! - Domain types for providers, pending credentials, sign-in methods and sessions
//! - Capability traits for the identity provider, backend and user prompts
//! - The five-stage [`ConflictResolver`]
//! - In-memory and (optionally) keyring-based session storage
//! - An optional REST [`HttpBackend`](backend::HttpBackend) (`http` feature)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use linkforge_core::{ConflictResolver, Outcome, ProviderId, ProviderRegistry, ResolverConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn sign_in_with_github(resolver: &ConflictResolver) {
//!     let cancel = CancellationToken::new();
//!     match resolver.sign_in(&ProviderId::new("github.com"), &cancel).await {
//!         Outcome::Success(session) => println!("signed in as {}", session.uid),
//!         other => if let Some(msg) = other.user_message() { eprintln!("{}", msg) },
//!     }
//! }
//! ```

pub mod collaborator;
pub mod config;
pub mod error;
pub mod model;
pub mod outcome;
pub mod provider;
pub mod resolver;
pub mod secret;
pub mod session;

#[cfg(feature = "http")]
pub mod backend;

// Re-export commonly used types at crate root
pub use model::{
    ConflictContext,
    Identity,
    PendingCredential,
    ProviderId,
    SessionSource,
    SessionToken,
    SignInMethod,
    SignInMethodSet,
};

pub use collaborator::{
    Backend,
    Collaborators,
    EmailPrompter,
    IdentityProvider,
    LinkStatus,
    PasswordPrompter,
};

pub use config::ResolverConfig;

pub use error::{
    BackendError,
    LinkforgeError,
    ProviderError,
    ProviderErrorCode,
    StoreError,
};

pub use outcome::{Outcome, OutcomeKind, Stage};

pub use provider::{ProviderConfig, ProviderRegistry};

pub use resolver::ConflictResolver;
pub use resolver::detect::{Classification, classify};

pub use secret::Secret;

pub use session::{MemorySessionStore, SessionStore, create_session_store};

#[cfg(feature = "keyring-store")]
pub use session::KeyringSessionStore;

#[cfg(feature = "http")]
pub use backend::HttpBackend;
