use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use medbridge::{Engine, EngineConfig, Identity};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// The donation engine (shared across requests)
    pub engine: Arc<Engine>,

    /// Prometheus exporter, when metrics are enabled
    pub metrics: Option<PrometheusHandle>,

    pub started_at: Instant,
}

impl ServerState {
    /// Build the engine from `config.engine_config` (or defaults).
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let engine_config = match config.engine_config.as_deref() {
            Some(path) => EngineConfig::from_file(path)
                .map_err(|e| ServerError::Config(format!("{path}: {e}")))?,
            None => EngineConfig::default(),
        };
        let engine = Engine::from_config(&engine_config)?;
        tracing::info!(
            backend = %engine_config.store.backend,
            top_k = engine_config.matcher.top_k,
            max_requests = engine_config.rate_limit.max_requests,
            window_secs = engine_config.rate_limit.window_secs,
            "engine initialized"
        );
        Ok(Self::with_engine(config, Arc::new(engine)))
    }

    pub fn with_engine(config: ServerConfig, engine: Arc<Engine>) -> Self {
        Self {
            config: Arc::new(config),
            engine,
            metrics: None,
            started_at: Instant::now(),
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Resolve a bearer token to the identity it stands for.
    pub fn identity_for(&self, token: &str) -> Option<Identity> {
        self.config
            .tokens
            .get(token)
            .cloned()
            .map(Identity::Authenticated)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
