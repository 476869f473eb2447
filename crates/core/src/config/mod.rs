//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (WPBM_*)
//! 2. TOML config file (if WPBM_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// A configured remote site. The API key is looked up separately through
/// a [`SecretStore`](crate::site::SecretStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteEntry {
    pub name: String,
    pub url: String,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (WPBM_*)
/// 2. TOML config file (if WPBM_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Whether GET responses are cached.
    ///
    /// Set via WPBM_CACHE_ENABLED environment variable.
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// Age in seconds after which a cached response is ignored.
    ///
    /// Set via WPBM_CACHE_TTL_SECONDS environment variable.
    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,

    /// Retries after the first attempt for transient failures.
    ///
    /// Set via WPBM_MAX_RETRIES environment variable.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry; doubles on each further retry.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via WPBM_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Minimum pause between two requests to the same site.
    #[serde(default)]
    pub request_interval_ms: u64,

    /// Items requested per page when listing content and media.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Path to SQLite cache database.
    ///
    /// Set via WPBM_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Directory receiving content backups.
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,

    /// Directory receiving bulk operation reports.
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,

    /// Known sites.
    #[serde(default)]
    pub sites: Vec<SiteEntry>,
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl_seconds() -> u64 {
    300
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1_000
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_user_agent() -> String {
    "wpbm/0.1".into()
}

fn default_page_size() -> u32 {
    100
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./wpbm-cache.sqlite")
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("./backups")
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("./reports")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_ttl_seconds: default_cache_ttl_seconds(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
            request_interval_ms: 0,
            page_size: default_page_size(),
            db_path: default_db_path(),
            backup_dir: default_backup_dir(),
            report_dir: default_report_dir(),
            sites: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Cache TTL as Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `WPBM_`
    /// 2. TOML file from `WPBM_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be parsed or
    /// validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("WPBM_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("WPBM_")
                .ignore(&["CONFIG_FILE"])
                .filter(|key| !key.as_str().to_ascii_uppercase().starts_with("API_KEY_"))
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Look up a configured site by name.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if no site with that name is configured.
    pub fn require_site(&self, name: &str) -> Result<&SiteEntry, ConfigError> {
        self.sites.iter().find(|s| s.name == name).ok_or_else(|| ConfigError::Missing {
            field: format!("sites.{name}"),
            hint: "Add a [[sites]] entry with name and url to the config file".into(),
        })
    }
}
