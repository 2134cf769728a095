use medbridge::Caller;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    /// Path to the engine YAML config. Defaults apply when unset.
    #[serde(default)]
    pub engine_config: Option<String>,

    /// Bearer token -> caller identity. Stands in for the external auth
    /// provider.
    #[serde(default)]
    pub tokens: HashMap<String, Caller>,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Metrics endpoint enabled
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_mb: default_max_body_size_mb(),
            engine_config: None,
            tokens: HashMap::new(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            metrics_enabled: default_true(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables and config files
    pub fn load() -> anyhow::Result<Self> {
        let builder = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::with_name("server").required(false))
            // Override with environment variables
            .add_source(config::Environment::with_prefix("MEDBRIDGE_SERVER").separator("__"));

        let config: ServerConfig = builder.build()?.try_deserialize()?;

        if config.tokens.is_empty() {
            tracing::warn!("No bearer tokens configured, every request will be anonymous");
        }

        Ok(config)
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_body_size_mb() -> usize {
    2
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.timeout(), Duration::from_secs(30));
        assert_eq!(cfg.max_body_size(), 2 * 1024 * 1024);
        assert!(cfg.tokens.is_empty());
        assert!(cfg.engine_config.is_none());
        assert!(cfg.enable_cors);
        assert!(cfg.metrics_enabled);
    }

    #[test]
    fn test_socket_addr() {
        let cfg = ServerConfig::default();
        let addr = cfg.socket_addr().unwrap();
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_tokens_deserialize_to_callers() {
        let cfg: ServerConfig = serde_json::from_value(serde_json::json!({
            "tokens": {
                "tok-admin": { "user_id": "admin-1", "roles": ["admin"] },
                "tok-ngo": { "user_id": "ngo-1", "roles": ["ngo"], "organization_name": "Clinic" }
            }
        }))
        .unwrap();
        assert_eq!(cfg.tokens.len(), 2);
        assert!(cfg.tokens["tok-admin"].is_admin());
        assert_eq!(
            cfg.tokens["tok-ngo"].organization_name.as_deref(),
            Some("Clinic")
        );
    }
}
