//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from a single TOML file. Every field carries
//! a serde default, so a missing or partial file still yields a usable
//! configuration. Resolution priority for both the config file and the root
//! folder:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file / platform config directory
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable overriding the config file location
pub const CONFIG_ENV_VAR: &str = "GDLO_CONFIG";

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV_VAR: &str = "GDLO_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "gdlo.db";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Root folder holding the database (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Remote game server
    #[serde(default)]
    pub server: ServerConfig,

    /// Discovery loop (newly awarded levels)
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Update loop (windowed rescan of known levels)
    #[serde(default)]
    pub update: UpdateConfig,

    /// JSON file with level ids fetched on first setup
    #[serde(default)]
    pub initial_load: Option<PathBuf>,

    /// Digest delivery
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Query server bind address
    #[serde(default)]
    pub api: ApiConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_url")]
    pub url: String,
    #[serde(default = "default_secret")]
    pub secret: String,
    #[serde(default = "default_game_version")]
    pub game_version: u32,
    #[serde(default = "default_binary_version")]
    pub binary_version: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            secret: default_secret(),
            game_version: default_game_version(),
            binary_version: default_binary_version(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ServerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Base period with a bounded random offset, in seconds
///
/// Every call to [`JitterPeriod::sample`] draws a fresh offset, so the
/// request cadence is never fixed.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct JitterPeriod {
    pub period_secs: f64,
    #[serde(default)]
    pub random_secs: f64,
}

impl JitterPeriod {
    pub const fn new(period_secs: f64, random_secs: f64) -> Self {
        Self {
            period_secs,
            random_secs,
        }
    }

    /// Draw `period + U(-random, +random)`, clamped at zero
    pub fn sample(&self) -> Duration {
        let offset = if self.random_secs > 0.0 {
            rand::thread_rng().gen_range(-self.random_secs..=self.random_secs)
        } else {
            0.0
        };
        Duration::from_secs_f64((self.period_secs + offset).max(0.0))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscoveryConfig {
    #[serde(flatten)]
    pub interval: JitterPeriod,
    #[serde(default = "default_next_page")]
    pub next_page: JitterPeriod,
    /// Upper bound on pages per pass (unbounded when absent)
    #[serde(default)]
    pub max_pages: Option<u32>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            interval: JitterPeriod::new(600.0, 120.0),
            next_page: default_next_page(),
            max_pages: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpdateConfig {
    #[serde(flatten)]
    pub interval: JitterPeriod,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_next_page")]
    pub next_page: JitterPeriod,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            interval: JitterPeriod::new(300.0, 60.0),
            batch_size: default_batch_size(),
            next_page: default_next_page(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NotifyConfig {
    /// Webhook receiving `{"content": ...}` digests (optional)
    #[serde(default)]
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_server_url() -> String {
    "http://www.boomlings.com/database/getGJLevels21.php".to_string()
}

fn default_secret() -> String {
    "Wmfd2893gb7".to_string()
}

fn default_game_version() -> u32 {
    21
}

fn default_binary_version() -> u32 {
    35
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_next_page() -> JitterPeriod {
    JitterPeriod::new(5.0, 2.0)
}

fn default_batch_size() -> usize {
    100
}

fn default_api_host() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    5000
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load configuration from file
    ///
    /// A missing file is not an error: defaults are returned with a warning.
    /// A file that exists but does not parse is reported as `Error::Config`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Config file not found at {}, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Resolve the root folder: CLI → ENV → TOML → OS default
    pub fn resolve_root_folder(&self, cli_arg: Option<&Path>) -> PathBuf {
        if let Some(path) = cli_arg {
            return path.to_path_buf();
        }
        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV_VAR) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }
        if let Some(path) = &self.root_folder {
            return path.clone();
        }
        default_root_folder()
    }
}

/// Resolve config file path: CLI → ENV → platform config directory
pub fn resolve_config_path(cli_arg: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs::config_dir()
        .map(|d| d.join("gdlo").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("gdlo.toml"))
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("gdlo"))
        .unwrap_or_else(|| PathBuf::from("./gdlo_data"))
}

/// Create the root folder if missing and return the database path inside it
pub fn prepare_root_folder(root_folder: &Path) -> Result<PathBuf> {
    if !root_folder.exists() {
        std::fs::create_dir_all(root_folder)?;
        info!("Created root folder: {}", root_folder.display());
    }
    Ok(root_folder.join(DATABASE_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jitter_sample_within_bounds() {
        let jitter = JitterPeriod::new(10.0, 2.0);
        for _ in 0..200 {
            let secs = jitter.sample().as_secs_f64();
            assert!((8.0..=12.0).contains(&secs), "sample out of range: {}", secs);
        }
    }

    #[test]
    fn test_jitter_clamped_at_zero() {
        let jitter = JitterPeriod::new(0.5, 5.0);
        for _ in 0..200 {
            assert!(jitter.sample().as_secs_f64() >= 0.0);
        }
    }

    #[test]
    fn test_jitter_without_random_is_fixed() {
        let jitter = JitterPeriod::new(3.0, 0.0);
        assert_eq!(jitter.sample(), Duration::from_secs(3));
    }
}
