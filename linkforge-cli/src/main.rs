//! Linkforge CLI
//!
//! Command-line interface for replaying credential conflicts and inspecting
//! the persisted session.
//!
//! # Usage
//!
//! ```bash
//! # Replay a recorded conflict, prompting for email/password if needed
//! linkforge resolve scenarios/github-conflict.toml
//!
//! # Show or clear the persisted session
//! linkforge session show
//! linkforge session clear
//!
//! # List registered providers
//! linkforge providers
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use linkforge_core::{
    Backend, Collaborators, ConflictResolver, HttpBackend, Outcome, SessionStore,
    create_session_store,
};

mod config;
mod prompt;
mod scenario;

use config::LinkforgeConfig;
use prompt::TerminalPrompter;
use scenario::{Scenario, ScriptedBackend, ScriptedIdentityProvider};

#[derive(Parser)]
#[command(name = "linkforge")]
#[command(about = "Federated sign-in conflict resolution for the candidate portal")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded sign-in attempt through the resolver
    Resolve {
        /// Scenario file (TOML)
        scenario: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Inspect or clear the persisted session
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// List registered identity providers
    Providers,
}

#[derive(Subcommand)]
enum SessionAction {
    /// Show the persisted session (token redacted)
    Show,
    /// Remove the persisted session
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::load_config(cli.config.as_deref())?;
    init_logging(&config.log_level, cli.verbose);
    info!("Loaded configuration from {:?}", config.config_path);

    match cli.command {
        Commands::Resolve { scenario, format } => resolve(&config, &scenario, &format).await,
        Commands::Session { action } => match action {
            SessionAction::Show => session_show(&config).await,
            SessionAction::Clear => session_clear(&config).await,
        },
        Commands::Providers => list_providers(&config),
    }
}

fn init_logging(level: &str, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn session_store(config: &LinkforgeConfig) -> Arc<dyn SessionStore> {
    Arc::from(create_session_store(config.prefer_keyring, &config.profile))
}

fn backend_for(config: &LinkforgeConfig, scenario: &Scenario) -> Result<Arc<dyn Backend>> {
    if let Some(spec) = &scenario.backend {
        return Ok(Arc::new(ScriptedBackend::new(spec.clone())));
    }
    match &config.backend_url {
        Some(url) => {
            let backend = HttpBackend::new(url)
                .with_context(|| format!("Invalid backend_url {:?}", url))?;
            info!(base_url = %backend.base_url(), "Using HTTP backend");
            Ok(Arc::new(backend))
        }
        None => {
            warn!("No backend configured; server token exchange will fall through");
            Ok(Arc::new(ScriptedBackend::new(Default::default())))
        }
    }
}

async fn resolve(config: &LinkforgeConfig, path: &Path, format: &str) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let prompter = Arc::new(TerminalPrompter::new());

    let collaborators = Collaborators {
        identity: Arc::new(ScriptedIdentityProvider::new(scenario.identity.clone())),
        backend: backend_for(config, &scenario)?,
        email_prompter: prompter.clone(),
        password_prompter: prompter,
        sessions: session_store(config),
    };
    let resolver = ConflictResolver::new(
        collaborators,
        config.resolver.build_registry(),
        config.resolver.clone(),
    );

    let cancel = CancellationToken::new();
    let attempt = resolver.handle_attempt(&scenario.provider, scenario.attempt_result(), &cancel);
    tokio::pin!(attempt);

    let outcome = tokio::select! {
        outcome = &mut attempt => outcome,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Interrupted, cancelling sign-in...");
            cancel.cancel();
            attempt.await
        }
    };

    print_outcome(&outcome, format)
}

fn print_outcome(outcome: &Outcome, format: &str) -> Result<()> {
    match format {
        "json" => {
            let body = serde_json::json!({
                "outcome": outcome.kind(),
                "uid": outcome.session().map(|s| s.uid.clone()),
                "source": outcome.session().map(|s| s.source.to_string()),
                "message": outcome.user_message(),
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        _ => {
            println!("Outcome: {}", outcome.kind());
            if let Some(session) = outcome.session() {
                println!("  Signed in as {} via {}", session.uid, session.source);
            }
            if let Some(message) = outcome.user_message() {
                println!("  {}", message);
            }
        }
    }
    Ok(())
}

async fn session_show(config: &LinkforgeConfig) -> Result<()> {
    let store = session_store(config);
    match store.load().await.context("Failed to load session")? {
        Some(session) => {
            println!("Session ({})", config.profile);
            println!("  User:   {}", session.uid);
            if let Some(email) = &session.email {
                println!("  Email:  {}", email);
            }
            println!("  Source: {}", session.source);
            println!("  Issued: {}", session.issued_at.to_rfc3339());
            println!("  Token:  {}", session.value);
        }
        None => println!("No session stored for profile {}", config.profile),
    }
    Ok(())
}

async fn session_clear(config: &LinkforgeConfig) -> Result<()> {
    let store = session_store(config);
    store.clear().await.context("Failed to clear session")?;
    println!("Session cleared for profile {}", config.profile);
    Ok(())
}

fn list_providers(config: &LinkforgeConfig) -> Result<()> {
    let registry = config.resolver.build_registry();
    let recovery = registry.recovery_order();

    println!("Registered providers:");
    for id in registry.list_ids() {
        let exchange = registry
            .exchange_name(id)
            .map(|name| format!("exchange as {}", name))
            .unwrap_or_else(|| "no exchange".to_string());
        let position = recovery
            .iter()
            .position(|p| *p == id)
            .map(|i| format!("recovery #{}", i + 1))
            .unwrap_or_else(|| "no recovery helper".to_string());
        println!(
            "  {:<16} {:<10} {}, {}",
            id.as_str(),
            registry.display_name(id),
            exchange,
            position
        );
    }
    Ok(())
}
