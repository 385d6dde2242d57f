//! Configuration for shelfsync.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (SHELFSYNC_HOME, SHELFSYNC_STORE_URL)
//! 2. Config file (.shelfsync/config.yaml)
//! 3. Defaults (~/.shelfsync)
//!
//! Config file discovery:
//! - Searches current directory and parents for .shelfsync/config.yaml
//! - A relative `home` is resolved against the .shelfsync/ directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::catalog::{DEFAULT_STORE_URL, DEFAULT_WORKERS};
use crate::reconcile::{MergeOptions, DEFAULT_COMMUNITY_URL};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const CONFIG_DIR: &str = ".shelfsync";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    /// State directory (relative to .shelfsync/)
    #[serde(default)]
    pub home: Option<String>,
    #[serde(default)]
    pub urls: UrlsConfig,
    #[serde(default)]
    pub merge: Option<MergeOptions>,
    #[serde(default)]
    pub scrape: Option<ScrapeConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UrlsConfig {
    /// Store detail page template with an `{id}` placeholder
    pub store: Option<String>,
    /// Community site base address
    pub community: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeConfig {
    pub workers: Option<usize>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// State directory (holds the catalog cache)
    pub home: PathBuf,
    /// Store detail page template
    pub store_url: String,
    /// Community site base address
    pub community_url: String,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Merge policy
    pub merge: MergeOptions,
    /// Scrape settings
    pub scrape: ScrapeSettings,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScrapeSettings {
    pub workers: usize,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
        }
    }
}

impl ResolvedConfig {
    /// Catalog cache location
    pub fn gamedb_path(&self) -> PathBuf {
        self.home.join("gamedb.json")
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(CONFIG_DIR).join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(CONFIG_DIR);

    let config_file = find_config_file();
    let file = config_file.as_deref().map(load_config_file).transpose()?;

    resolve(file, config_file, default_home)
}

/// Combine a parsed config file, environment overrides and defaults
fn resolve(
    file: Option<ConfigFile>,
    config_file: Option<PathBuf>,
    default_home: PathBuf,
) -> Result<ResolvedConfig> {
    let config_dir = config_file
        .as_deref()
        .and_then(Path::parent)
        .unwrap_or(Path::new("."));

    let home = if let Ok(env_home) = std::env::var("SHELFSYNC_HOME") {
        PathBuf::from(env_home)
    } else if let Some(home_path) = file.as_ref().and_then(|f| f.home.as_deref()) {
        resolve_path(config_dir, home_path)
    } else {
        default_home
    };

    let store_url = std::env::var("SHELFSYNC_STORE_URL")
        .ok()
        .or_else(|| file.as_ref().and_then(|f| f.urls.store.clone()))
        .unwrap_or_else(|| DEFAULT_STORE_URL.to_string());

    if !store_url.contains("{id}") {
        anyhow::bail!("Store URL must contain an {{id}} placeholder: {}", store_url);
    }

    let community_url = file
        .as_ref()
        .and_then(|f| f.urls.community.clone())
        .unwrap_or_else(|| DEFAULT_COMMUNITY_URL.to_string());

    let merge = file
        .as_ref()
        .and_then(|f| f.merge.clone())
        .unwrap_or_default();

    let scrape = ScrapeSettings {
        workers: file
            .as_ref()
            .and_then(|f| f.scrape.as_ref())
            .and_then(|s| s.workers)
            .unwrap_or(DEFAULT_WORKERS),
    };

    Ok(ResolvedConfig {
        home,
        store_url,
        community_url,
        config_file,
        merge,
        scrape,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
