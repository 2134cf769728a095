//! Logging and Prometheus metrics wiring.

use std::sync::Arc;
use std::time::Duration;

use medbridge::{EngineError, EngineMetrics, set_engine_metrics};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Forwards engine observations to the `metrics` facade.
#[derive(Debug, Default)]
pub struct PrometheusEngineMetrics;

impl EngineMetrics for PrometheusEngineMetrics {
    fn record_matching(&self, latency: Duration, result: Result<usize, &EngineError>) {
        let outcome = match result {
            Ok(_) => "ok",
            Err(err) => err.code(),
        };
        metrics::counter!("medbridge_matching_runs_total", "outcome" => outcome).increment(1);
        metrics::histogram!("medbridge_matching_duration_seconds").record(latency.as_secs_f64());
        if let Ok(count) = result {
            metrics::histogram!("medbridge_matching_matches").record(count as f64);
        }
    }

    fn record_claim(&self, latency: Duration, result: Result<(), &EngineError>) {
        let outcome = match result {
            Ok(()) => "ok",
            Err(err) => err.code(),
        };
        metrics::counter!("medbridge_claim_attempts_total", "outcome" => outcome).increment(1);
        metrics::histogram!("medbridge_claim_duration_seconds").record(latency.as_secs_f64());
    }

    fn record_rate_limit(&self, operation: &str, allowed: bool) {
        let decision = if allowed { "allowed" } else { "denied" };
        metrics::counter!(
            "medbridge_rate_limit_decisions_total",
            "operation" => operation.to_string(),
            "decision" => decision
        )
        .increment(1);
    }
}

/// Install the process-wide Prometheus recorder and route engine metrics
/// into it.
pub fn install_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    set_engine_metrics(Some(Arc::new(PrometheusEngineMetrics)));
    Ok(handle)
}

/// Structured JSON logs filtered by `level` (an env-filter directive).
pub fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .json()
        .init();
}
