//! YAML configuration for the MedBridge engine.
//!
//! All engine knobs (matching, rate limiting, store backend) live in a
//! single YAML file loaded at startup.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! # MedBridge engine configuration
//! version: "1.0"
//!
//! matcher:
//!   top_k: 3
//!   noise_token_len: 3
//!
//! rate_limit:
//!   operation: "map-donation"
//!   max_requests: 10
//!   window_secs: 300
//!
//! store:
//!   backend: "redb"
//!   path: "/data/medbridge.redb"
//! ```

use std::fs;
use std::path::Path;

use matcher::MatchConfig;
use serde::{Deserialize, Serialize};
use store::BackendConfig;
use thiserror::Error;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    /// Configuration format version
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub matcher: MatchConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

impl EngineConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.matcher
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("matcher: {e}")))?;
        self.rate_limit.validate()?;
        self.store.validate()?;
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            name: None,
            matcher: MatchConfig::default(),
            rate_limit: RateLimitConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// Fixed-window throttle on the matching trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Operation name the window is keyed on.
    #[serde(default = "default_operation")]
    pub operation: String,

    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.window_secs).unwrap_or(i64::MAX))
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.operation.trim().is_empty() {
            return Err(ConfigLoadError::Validation(
                "rate_limit.operation must not be empty".to_string(),
            ));
        }
        if self.max_requests == 0 {
            return Err(ConfigLoadError::Validation(
                "rate_limit.max_requests must be at least 1".to_string(),
            ));
        }
        // Keep well inside chrono's representable range.
        if self.window_secs == 0 || self.window_secs > 31_536_000 {
            return Err(ConfigLoadError::Validation(
                "rate_limit.window_secs must be between 1 and 31536000".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            operation: default_operation(),
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

/// Store backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: String,

    #[serde(default)]
    pub path: Option<String>,
}

impl StoreConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        self.backend_config().map(|_| ())
    }

    pub fn backend_config(&self) -> Result<BackendConfig, ConfigLoadError> {
        match self.backend.as_str() {
            "in_memory" => Ok(BackendConfig::in_memory()),
            "redb" => match self.path.as_deref() {
                Some(path) if !path.trim().is_empty() => Ok(BackendConfig::redb(path)),
                _ => Err(ConfigLoadError::Validation(
                    "store.path is required when backend is 'redb'".to_string(),
                )),
            },
            other => Err(ConfigLoadError::Validation(format!(
                "store.backend must be one of [\"in_memory\", \"redb\"], got '{other}'"
            ))),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: None,
        }
    }
}

fn default_version() -> String {
    "1.0".to_string()
}
fn default_operation() -> String {
    "map-donation".to_string()
}
fn default_max_requests() -> u32 {
    10
}
fn default_window_secs() -> u64 {
    300
}
fn default_backend() -> String {
    "in_memory".to_string()
}
