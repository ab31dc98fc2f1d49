//! CLI configuration handling.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use linkforge_core::ResolverConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkforgeConfig {
    /// Path to the configuration file that was loaded.
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Base URL of the portal backend. Unset means no server exchange.
    #[serde(default)]
    pub backend_url: Option<String>,

    /// Store sessions in the OS keyring when available.
    #[serde(default = "default_prefer_keyring")]
    pub prefer_keyring: bool,

    /// Session profile name.
    #[serde(default = "default_profile")]
    pub profile: String,

    /// Logging level.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub resolver: ResolverConfig,
}

fn default_prefer_keyring() -> bool {
    true
}

fn default_profile() -> String {
    "default".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LinkforgeConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            backend_url: None,
            prefer_keyring: default_prefer_keyring(),
            profile: default_profile(),
            log_level: default_log_level(),
            resolver: ResolverConfig::default(),
        }
    }
}

/// Load configuration from `explicit`, or the default location, or defaults.
///
/// An explicit path must exist; the default location may be absent.
pub fn load_config(explicit: Option<&Path>) -> Result<LinkforgeConfig> {
    match explicit {
        Some(path) => {
            anyhow::ensure!(path.exists(), "Config file {:?} does not exist", path);
            load_from_path(path)
        }
        None => load_from_path(&default_config_path()),
    }
}

/// Load configuration from `path`, falling back to defaults if it is missing.
pub fn load_from_path(path: &Path) -> Result<LinkforgeConfig> {
    let mut config = if path.exists() {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", path))?
    } else {
        LinkforgeConfig::default()
    };

    config.config_path = path.to_path_buf();
    Ok(config)
}

fn default_config_path() -> PathBuf {
    project_dirs()
        .map(|d| d.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("linkforge.toml"))
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "raibid-labs", "linkforge")
}
