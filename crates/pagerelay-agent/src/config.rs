//! Agent configuration
//!
//! All process-wide settings live in one [`Config`] value constructed at
//! startup and passed by reference into each component. Values come from
//! built-in defaults, then an optional TOML config file, then `PAGERELAY_*`
//! environment overrides.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path:?}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not parse config file {path:?}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Process-wide settings for one invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path of the persistent event queue snapshot. The lock sidecar lives
    /// next to it at `<queue_file>.lock`.
    #[serde(default = "default_queue_file")]
    pub queue_file: PathBuf,

    /// Incident API host.
    #[serde(default = "default_api_host")]
    pub api_host: String,

    /// Incident API version path segment.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_api_timeout")]
    pub api_timeout: u64,

    /// Route log output to the local syslog daemon instead of stderr.
    #[serde(default = "default_true")]
    pub log_to_syslog: bool,

    /// Default log filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_queue_file() -> PathBuf {
    ProjectDirs::from("io", "pagerelay", "pagerelay")
        .map(|dirs| dirs.data_dir().join("queue.json"))
        .unwrap_or_else(|| PathBuf::from("/tmp/pagerelay-queue.json"))
}

fn default_api_host() -> String {
    "api.pingdom.com".to_string()
}

fn default_api_version() -> String {
    "3.0".to_string()
}

fn default_api_timeout() -> u64 {
    15
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            queue_file: default_queue_file(),
            api_host: default_api_host(),
            api_version: default_api_version(),
            api_timeout: default_api_timeout(),
            log_to_syslog: default_true(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration for this invocation.
    ///
    /// An explicitly given config file must exist and parse; the default
    /// config file location is used only when present.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => match default_config_file() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = env::var("PAGERELAY_QUEUE_FILE") {
            self.queue_file = PathBuf::from(path);
        }
        if let Ok(host) = env::var("PAGERELAY_API_HOST") {
            self.api_host = host;
        }
        if let Ok(version) = env::var("PAGERELAY_API_VERSION") {
            self.api_version = version;
        }
        if let Ok(timeout) = env::var("PAGERELAY_API_TIMEOUT") {
            if let Ok(parsed) = timeout.parse() {
                self.api_timeout = parsed;
            }
        }
        if let Ok(value) = env::var("PAGERELAY_LOG_TO_SYSLOG") {
            if let Ok(parsed) = value.parse() {
                self.log_to_syslog = parsed;
            }
        }
        if let Ok(level) = env::var("PAGERELAY_LOG_LEVEL") {
            self.log_level = level;
        }
    }
}

fn default_config_file() -> Option<PathBuf> {
    ProjectDirs::from("io", "pagerelay", "pagerelay")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
