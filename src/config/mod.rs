//! Configuration management
//!
//! This module provides YAML-based configuration management with support for:
//! - Environment variable overrides
//! - Multiple configuration file locations
//! - Default values for all settings
//! - Classification strategy selection
//! - Hierarchy definitions (loaded from separate file)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::services::classification::ClassificationStrategy;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub puppetdb: Option<PuppetDbConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub classification: ClassificationConfig,
    /// Path to the hierarchy definitions file
    #[serde(default)]
    pub hierarchy_path: Option<PathBuf>,
}

/// PuppetDB SSL configuration (nested format from Puppet module)
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct PuppetDbSslConfig {
    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,
    pub ca_path: Option<PathBuf>,
    #[serde(default = "default_ssl_verify")]
    pub verify: bool,
}

/// PuppetDB connection configuration
/// Supports both flat format (ssl_cert, ssl_key, ssl_ca) and nested format (ssl.cert_path, etc.)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PuppetDbConfig {
    pub url: String,
    /// Timeout in seconds (supports both timeout_secs and timeout field names)
    #[serde(default = "default_timeout", alias = "timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_ssl_verify")]
    pub ssl_verify: bool,
    pub ssl_cert: Option<PathBuf>,
    pub ssl_key: Option<PathBuf>,
    pub ssl_ca: Option<PathBuf>,
    #[serde(default)]
    pub ssl: Option<PuppetDbSslConfig>,
}

impl PuppetDbConfig {
    /// Plain HTTP configuration pointing at `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_secs: default_timeout(),
            ssl_verify: default_ssl_verify(),
            ssl_cert: None,
            ssl_key: None,
            ssl_ca: None,
            ssl: None,
        }
    }

    /// Get the effective SSL cert path (checks nested config first, then flat)
    pub fn effective_ssl_cert(&self) -> Option<&PathBuf> {
        self.ssl
            .as_ref()
            .and_then(|s| s.cert_path.as_ref())
            .or(self.ssl_cert.as_ref())
    }

    /// Get the effective SSL key path (checks nested config first, then flat)
    pub fn effective_ssl_key(&self) -> Option<&PathBuf> {
        self.ssl
            .as_ref()
            .and_then(|s| s.key_path.as_ref())
            .or(self.ssl_key.as_ref())
    }

    /// Get the effective SSL CA path (checks nested config first, then flat)
    pub fn effective_ssl_ca(&self) -> Option<&PathBuf> {
        self.ssl
            .as_ref()
            .and_then(|s| s.ca_path.as_ref())
            .or(self.ssl_ca.as_ref())
    }

    /// Get the effective SSL verify setting (checks nested config first, then flat)
    pub fn effective_ssl_verify(&self) -> bool {
        self.ssl.as_ref().map(|s| s.verify).unwrap_or(self.ssl_verify)
    }
}

fn default_timeout() -> u64 {
    10
}

fn default_ssl_verify() -> bool {
    true
}

/// Classification engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClassificationConfig {
    /// Which layers are consulted when resolving a node
    #[serde(default)]
    pub strategy: ClassificationStrategy,
    /// Deadline for each store or fact source call
    #[serde(default = "default_classification_timeout")]
    pub timeout_secs: u64,
    /// Emit the default classification instead of failing when the store is unreachable
    #[serde(default = "default_fail_open")]
    pub fail_open: bool,
}

fn default_classification_timeout() -> u64 {
    10
}

fn default_fail_open() -> bool {
    true
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            strategy: ClassificationStrategy::default(),
            timeout_secs: default_classification_timeout(),
            fail_open: default_fail_open(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    /// Log output target (console or file)
    #[serde(default = "default_log_target")]
    pub target: LogTarget,
    /// Directory for log files (used when target is "file")
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Log file name prefix (default: "openvox-enc")
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,
    /// Enable daily log rotation
    #[serde(default = "default_log_rotation")]
    pub daily_rotation: bool,
}

/// Log output target
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Log to stderr - stdout is reserved for the classification
    #[default]
    Console,
    /// Log to file with optional rotation
    File,
    /// Log to both stderr and file
    Both,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

fn default_log_target() -> LogTarget {
    LogTarget::Console
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/var/log/openvox/enc")
}

fn default_log_prefix() -> String {
    "openvox-enc".to_string()
}

fn default_log_rotation() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            target: default_log_target(),
            log_dir: default_log_dir(),
            log_prefix: default_log_prefix(),
            daily_rotation: default_log_rotation(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values
    /// 2. Configuration file (YAML)
    /// 3. Environment variables
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("OPENVOX_ENC_CONFIG")
            .map(PathBuf::from)
            .ok()
            .or_else(Self::find_config_file);
        Self::load_from(config_path)
    }

    /// Load configuration from an explicit path (or defaults when `None`)
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        let mut config = match config_path {
            Some(ref path) if path.exists() => Self::from_file(path)?,
            Some(ref path) => {
                anyhow::bail!("Configuration file not found: {:?}", path);
            }
            None => AppConfig::default(),
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parse a configuration file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_norway::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Find the configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            // Current directory
            PathBuf::from("config.yaml"),
            PathBuf::from("config/config.yaml"),
            // System config directory
            PathBuf::from("/etc/openvox-enc/config.yaml"),
            // User config directory
            dirs::config_dir()
                .map(|p| p.join("openvox-enc/config.yaml"))
                .unwrap_or_default(),
        ];

        paths.into_iter().find(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Logging overrides
        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("OPENVOX_LOG_FORMAT") {
            self.logging.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "compact" => LogFormat::Compact,
                _ => LogFormat::Pretty,
            };
        }

        // PuppetDB overrides
        if let Ok(url) = std::env::var("PUPPETDB_URL") {
            let puppetdb = self
                .puppetdb
                .get_or_insert_with(|| PuppetDbConfig::new(url.clone()));
            puppetdb.url = url;
        }
        if let Ok(cert) = std::env::var("PUPPETDB_SSL_CERT") {
            if let Some(ref mut puppetdb) = self.puppetdb {
                puppetdb.ssl_cert = Some(PathBuf::from(cert));
            }
        }
        if let Ok(key) = std::env::var("PUPPETDB_SSL_KEY") {
            if let Some(ref mut puppetdb) = self.puppetdb {
                puppetdb.ssl_key = Some(PathBuf::from(key));
            }
        }
        if let Ok(ca) = std::env::var("PUPPETDB_SSL_CA") {
            if let Some(ref mut puppetdb) = self.puppetdb {
                puppetdb.ssl_ca = Some(PathBuf::from(ca));
            }
        }

        // Classification overrides
        if let Ok(strategy) = std::env::var("OPENVOX_ENC_STRATEGY") {
            if let Some(s) = ClassificationStrategy::parse(&strategy) {
                self.classification.strategy = s;
            }
        }
        if let Ok(path) = std::env::var("OPENVOX_ENC_HIERARCHY") {
            self.hierarchy_path = Some(PathBuf::from(path));
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.classification.timeout_secs == 0 {
            anyhow::bail!("classification.timeout_secs must be greater than 0");
        }

        if let Some(ref puppetdb) = self.puppetdb {
            if puppetdb.url.is_empty() {
                anyhow::bail!("PuppetDB URL cannot be empty");
            }
            if !puppetdb.url.starts_with("http://") && !puppetdb.url.starts_with("https://") {
                anyhow::bail!("PuppetDB URL must start with http:// or https://");
            }
        }

        if let Some(ref path) = self.hierarchy_path {
            if !path.exists() {
                tracing::warn!(
                    "Hierarchy file does not exist: {:?}. Only the default classification will be served.",
                    path
                );
            }
        }

        Ok(())
    }
}
