//! Application configuration for logosync.
//!
//! User config lives at `~/.logosync/logosync.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LogoSyncError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "logosync.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".logosync";

/// Concurrency ceiling applied to both the scrape and the import phase.
pub const DEFAULT_CONCURRENCY: usize = 15;

// ---------------------------------------------------------------------------
// Config structs (matching logosync.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Logo resolution settings.
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Remote content store settings.
    #[serde(default)]
    pub store: StoreConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Working data directory holding `cache.json` and `log.json`.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Default CSV input file.
    #[serde(default = "default_input_file")]
    pub input_file: String,

    /// Maximum in-flight items per phase.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-request timeout for every outbound HTTP call.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            input_file: default_input_file(),
            concurrency: default_concurrency(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_data_dir() -> String {
    "data".into()
}
fn default_input_file() -> String {
    "data/in.csv".into()
}
fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}
fn default_request_timeout() -> u64 {
    30
}

/// `[resolver]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Still ask the favicon service when the home page cannot be fetched.
    #[serde(default = "default_true")]
    pub favicon_on_fetch_failure: bool,

    /// User-Agent sent when fetching sites.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            favicon_on_fetch_failure: true,
            user_agent: default_user_agent(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_user_agent() -> String {
    concat!("logosync/", env!("CARGO_PKG_VERSION")).into()
}

/// `[store]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the management API (OAuth-authenticated writes).
    #[serde(default = "default_management_api_url")]
    pub management_api_url: String,

    /// Base URL of the delivery API (space-token reads, `cdn/...` paths).
    #[serde(default = "default_delivery_api_url")]
    pub delivery_api_url: String,

    /// Requests per second allowed against the store.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_sec: u32,

    /// Component name written into each entry's content.
    #[serde(default = "default_component")]
    pub component: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            management_api_url: default_management_api_url(),
            delivery_api_url: default_delivery_api_url(),
            rate_limit_per_sec: default_rate_limit(),
            component: default_component(),
        }
    }
}

fn default_management_api_url() -> String {
    "https://mapi.storyblok.com/v1".into()
}
fn default_delivery_api_url() -> String {
    "https://api.storyblok.com/v2".into()
}
fn default_rate_limit() -> u32 {
    3
}
fn default_component() -> String {
    "website".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.logosync/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LogoSyncError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.logosync/logosync.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LogoSyncError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        LogoSyncError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LogoSyncError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LogoSyncError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LogoSyncError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject values that would stall the pipeline.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.defaults.concurrency == 0 {
        return Err(LogoSyncError::config("defaults.concurrency must be at least 1"));
    }
    if config.store.rate_limit_per_sec == 0 {
        return Err(LogoSyncError::config("store.rate_limit_per_sec must be at least 1"));
    }
    Ok(())
}
