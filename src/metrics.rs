use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};

use crate::error::EngineError;

/// Metrics observer for engine operations.
pub trait EngineMetrics: Send + Sync {
    /// One matching run. `Ok` carries the number of persisted mappings.
    fn record_matching(&self, latency: Duration, result: Result<usize, &EngineError>);
    fn record_claim(&self, latency: Duration, result: Result<(), &EngineError>);
    fn record_rate_limit(&self, operation: &str, allowed: bool);
}

/// Install or clear the global engine metrics recorder.
pub fn set_engine_metrics(recorder: Option<Arc<dyn EngineMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn EngineMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn EngineMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

fn metrics_recorder() -> Option<Arc<dyn EngineMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

pub(crate) struct MetricsSpan {
    recorder: Arc<dyn EngineMetrics>,
    start: Instant,
}

impl MetricsSpan {
    pub(crate) fn start() -> Option<Self> {
        metrics_recorder().map(|recorder| Self {
            recorder,
            start: Instant::now(),
        })
    }

    pub(crate) fn record_matching(self, result: Result<usize, &EngineError>) {
        self.recorder.record_matching(self.start.elapsed(), result);
    }

    pub(crate) fn record_claim(self, result: Result<(), &EngineError>) {
        self.recorder.record_claim(self.start.elapsed(), result);
    }
}

pub(crate) fn record_rate_limit(operation: &str, allowed: bool) {
    if let Some(recorder) = metrics_recorder() {
        recorder.record_rate_limit(operation, allowed);
    }
}
